//! Long-lived log streaming session.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::history::{save_log, LogHistory};
use super::lines::LineSplitter;
use super::state::SessionState;
use crate::config::SettingsProvider;
use crate::error::{BridgeError, ResolutionError};
use crate::execution::{device_args, read_chunk, READ_BUFFER_SIZE};
use crate::platform::ToolLocator;
use crate::Result;

/// Prefix for lines read from the process's stderr.
pub const STDERR_PREFIX: &str = "[stderr] ";
/// Prefix for the synthetic line reporting a spawn failure.
pub const ERROR_PREFIX: &str = "[error] ";

/// Notification delivered to the registered sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Started,
    Line(String),
    Stopped,
}

/// Exclusive delivery target for a session.
pub type LogSink = mpsc::UnboundedSender<StreamEvent>;

/// Options for a streaming session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamOptions {
    pub device_id: Option<String>,
    /// Listing format passed to `-v`.
    pub format: String,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            device_id: None,
            format: "time".to_string(),
        }
    }
}

impl StreamOptions {
    /// Bridge arguments for this session.
    pub fn to_args(&self) -> Vec<String> {
        device_args(
            self.device_id.as_deref(),
            ["logcat", "-v", self.format.as_str()],
        )
    }
}

/// Snapshot of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    pub running: bool,
    pub line_count: usize,
}

struct Active {
    generation: u64,
    sink: LogSink,
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    generation: u64,
    active: Option<Active>,
    history: LogHistory,
}

impl Inner {
    /// Record and deliver lines if `generation` is still the live session.
    fn deliver(&mut self, generation: u64, lines: Vec<String>, prefix: &str) {
        let Some(active) = self.active.as_ref().filter(|a| a.generation == generation) else {
            return;
        };
        let sink = active.sink.clone();
        for line in lines {
            let line = format!("{}{}", prefix, line);
            self.history.push(line.clone());
            let _ = sink.send(StreamEvent::Line(line));
        }
    }
}

/// Owner of at most one streaming process.
///
/// `start` preempts any running session. Every session emits `Started`
/// once and `Stopped` exactly once, to the sink it was started with.
pub struct StreamingSession {
    bridge: Arc<ToolLocator>,
    settings: Option<Arc<dyn SettingsProvider>>,
    inner: Arc<Mutex<Inner>>,
    lifecycle: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession")
            .field("bridge", &self.bridge)
            .field("status", &self.status().ok())
            .finish()
    }
}

impl StreamingSession {
    pub fn new(bridge: Arc<ToolLocator>) -> Self {
        Self {
            bridge,
            settings: None,
            inner: Arc::new(Mutex::new(Inner::default())),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Read the log directory from `settings` when saving.
    pub fn with_settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = Some(settings);
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| BridgeError::LockPoisoned)
    }

    /// Stop any current session, then stream into `sink`.
    ///
    /// A spawn failure is reported through `sink` as an `[error]` line
    /// followed by `Stopped`; the call itself still succeeds.
    pub async fn start(&self, sink: LogSink, options: StreamOptions) -> Result<()> {
        let _gate = self.lifecycle.lock().await;
        self.stop_locked().await?;

        let program = self.bridge.locate();
        let args = options.to_args();
        let generation = {
            let mut inner = self.lock()?;
            inner.generation += 1;
            inner.generation
        };

        let _ = sink.send(StreamEvent::Started);
        debug!("Streaming {} {:?}", program.display(), args);

        let spawned = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let err = ResolutionError::from_spawn(&program, e);
                warn!("Log stream failed to start: {}", err);
                let line = format!("{}{}", ERROR_PREFIX, err);
                self.lock()?.history.push(line.clone());
                let _ = sink.send(StreamEvent::Line(line));
                let _ = sink.send(StreamEvent::Stopped);
                return Ok(());
            }
        };

        info!("Log stream started (pid {:?})", child.id());
        let (cancel, cancel_rx) = oneshot::channel();

        // The pump blocks on this lock until the session is registered.
        let mut inner = self.lock()?;
        let task = tokio::spawn(pump(self.inner.clone(), generation, child, cancel_rx));
        inner.state.transition_to(SessionState::Running);
        inner.active = Some(Active {
            generation,
            sink,
            cancel,
            task,
        });
        Ok(())
    }

    /// Stop the current session. No-op when idle.
    pub async fn stop(&self) -> Result<()> {
        let _gate = self.lifecycle.lock().await;
        self.stop_locked().await
    }

    async fn stop_locked(&self) -> Result<()> {
        let active = {
            let mut inner = self.lock()?;
            let active = inner.active.take();
            if active.is_some() {
                inner.state.transition_to(SessionState::Idle);
            }
            active
        };
        let Some(Active {
            sink, cancel, task, ..
        }) = active
        else {
            return Ok(());
        };

        let _ = cancel.send(());
        if let Err(e) = task.await {
            warn!("Log stream task failed: {}", e);
        }
        let _ = sink.send(StreamEvent::Stopped);
        info!("Log stream stopped");
        Ok(())
    }

    /// Write `content`, or the history when absent, to the log directory.
    ///
    /// Returns `None` when there is nothing to write.
    pub async fn save_current_buffer(
        &self,
        content: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<Option<PathBuf>> {
        let content = match content {
            Some(content) => content.to_string(),
            None => self.history_text()?,
        };
        let directory = self
            .settings
            .as_ref()
            .and_then(|s| s.get().log_directory)
            .filter(|d| !d.is_empty())
            .map(PathBuf::from);
        save_log(&content, directory.as_deref(), file_name).await
    }

    /// Drop the history. Works whether or not a session is running.
    pub fn clear_buffer(&self) -> Result<()> {
        self.lock()?.history.clear();
        Ok(())
    }

    pub fn history_text(&self) -> Result<String> {
        Ok(self.lock()?.history.text())
    }

    pub fn status(&self) -> Result<StreamStatus> {
        let inner = self.lock()?;
        Ok(StreamStatus {
            running: inner.state.is_running(),
            line_count: inner.history.len(),
        })
    }
}

impl Drop for StreamingSession {
    fn drop(&mut self) {
        let active = match self.inner.lock() {
            Ok(mut inner) => inner.active.take(),
            Err(poisoned) => poisoned.into_inner().active.take(),
        };
        if let Some(active) = active {
            debug!("Session dropped, stopping log stream");
            let _ = active.cancel.send(());
            let _ = active.sink.send(StreamEvent::Stopped);
        }
    }
}

/// Read both pipes until the process exits or a stop is requested.
async fn pump(
    inner: Arc<Mutex<Inner>>,
    generation: u64,
    mut child: Child,
    mut cancel: oneshot::Receiver<()>,
) {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_lines = LineSplitter::new();
    let mut err_lines = LineSplitter::new();
    let mut out_buf = [0u8; READ_BUFFER_SIZE];
    let mut err_buf = [0u8; READ_BUFFER_SIZE];

    let deliver = |lines: Vec<String>, prefix: &str| {
        if lines.is_empty() {
            return;
        }
        if let Ok(mut guard) = inner.lock() {
            guard.deliver(generation, lines, prefix);
        }
    };

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            _ = &mut cancel => {
                kill(&mut child).await;
                return;
            }
            read = read_chunk(&mut stdout, &mut out_buf) => match read {
                Some(n) => deliver(out_lines.push(&out_buf[..n]), ""),
                None => {
                    deliver(out_lines.finish().into_iter().collect(), "");
                    stdout = None;
                }
            },
            read = read_chunk(&mut stderr, &mut err_buf) => match read {
                Some(n) => deliver(err_lines.push(&err_buf[..n]), STDERR_PREFIX),
                None => {
                    deliver(err_lines.finish().into_iter().collect(), STDERR_PREFIX);
                    stderr = None;
                }
            },
        }
    }

    tokio::select! {
        _ = &mut cancel => {
            kill(&mut child).await;
            return;
        }
        status = child.wait() => {
            info!("Log stream exited: {:?}", status.map(|s| s.code()));
        }
    }

    let Ok(mut guard) = inner.lock() else {
        return;
    };
    if guard.active.as_ref().map(|a| a.generation) == Some(generation) {
        if let Some(active) = guard.active.take() {
            guard.state.transition_to(SessionState::Idle);
            let _ = active.sink.send(StreamEvent::Stopped);
        }
    }
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("Kill failed: {}", e);
    }
    let _ = child.wait().await;
}
