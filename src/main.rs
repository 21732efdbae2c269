//! bridgectl binary entry point.

use std::process::ExitCode;
use std::time::Duration;

use bridgectl::api::{ApiResponse, ControlPlane, SaveLogRequest};
use bridgectl::cli::{self, CliCommand};
use bridgectl::config::Config;
use bridgectl::logging;
use bridgectl::mirror::MirrorOptions;
use bridgectl::session::{StreamEvent, StreamOptions};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run 'bridgectl --help' for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_with_filter(config.log_filter()) {
        eprintln!("warning: logging already initialized: {}", e);
    }

    let Some(command) = args.command else {
        cli::print_help();
        return ExitCode::from(2);
    };

    info!("bridgectl v{}", env!("CARGO_PKG_VERSION"));
    let plane = ControlPlane::new(&config);

    let ok = match command {
        CliCommand::Devices => emit(&plane.list_devices().await),
        CliCommand::Exec(request) => emit(&plane.execute(&request).await),
        CliCommand::Settings(update) if update.is_empty() => emit(&plane.settings()),
        CliCommand::Settings(update) => emit(&plane.update_settings(update.into_patch())),
        CliCommand::Logcat { options, save } => run_logcat(&plane, options, save).await,
        CliCommand::Mirror(options) => run_mirror(&plane, options).await,
    };

    plane.shutdown().await;
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Print the response envelope as JSON; returns whether it succeeded.
fn emit<T: Serialize>(response: &ApiResponse<T>) -> bool {
    match serde_json::to_string_pretty(response) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("error: failed to encode response: {}", e),
    }
    if let Some(code) = response.error_code() {
        warn!("Request failed: {}", code);
    }
    response.ok
}

async fn run_logcat(plane: &ControlPlane, options: StreamOptions, save: bool) -> bool {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let started = plane.start_logs(tx, options).await;
    if !started.ok {
        return emit(&started);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(StreamEvent::Line(line)) => println!("{}", line),
                Some(StreamEvent::Started) => info!("Streaming logs, press Ctrl-C to stop"),
                Some(StreamEvent::Stopped) | None => break,
            },
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    let stopped = plane.stop_logs().await;
    if !stopped.ok {
        return emit(&stopped);
    }
    if save {
        return emit(&plane.save_logs(SaveLogRequest::default()).await);
    }
    true
}

async fn run_mirror(plane: &ControlPlane, options: MirrorOptions) -> bool {
    let started = plane.start_mirror(options).await;
    if !emit(&started) {
        return false;
    }

    let poll = plane
        .settings()
        .data
        .map(|s| Duration::from_millis(s.poll_interval_ms))
        .unwrap_or(Duration::from_secs(5));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = tokio::time::sleep(poll) => {
                let running = plane.mirror_status().data.map(|s| s.running).unwrap_or(false);
                if !running {
                    warn!("Mirroring tool is no longer running");
                    break;
                }
            }
        }
    }

    emit(&plane.stop_mirror().await)
}
