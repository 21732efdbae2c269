//! Singleton supervisor for the mirroring process.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::options::MirrorOptions;
use crate::device::DeviceSource;
use crate::error::{BridgeError, MirrorError, ResolutionError};
use crate::execution::{read_chunk, READ_BUFFER_SIZE};
use crate::platform::ToolLocator;
use crate::Result;

/// Early exits within this window fail `start`.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(1500);

/// Time allowed after the termination request before a forced kill.
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Diagnostic bytes kept per stream.
const DIAGNOSTIC_LIMIT: usize = 16 * 1024;
/// How long to keep reading output after the process has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

/// Snapshot of the tracked process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorStatus {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Tail of a stream, bounded to the last `limit` bytes.
#[derive(Debug)]
struct Diagnostics {
    bytes: VecDeque<u8>,
    limit: usize,
}

impl Diagnostics {
    fn new(limit: usize) -> Self {
        Self {
            bytes: VecDeque::new(),
            limit,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend(chunk);
        let excess = self.bytes.len().saturating_sub(self.limit);
        self.bytes.drain(..excess);
    }

    fn text(&self) -> String {
        let (head, tail) = self.bytes.as_slices();
        let mut raw = Vec::with_capacity(self.bytes.len());
        raw.extend_from_slice(head);
        raw.extend_from_slice(tail);
        String::from_utf8_lossy(&raw).trim().to_string()
    }
}

/// How the process ended, as seen by its monitor.
#[derive(Debug)]
struct ExitReport {
    exit_code: Option<i32>,
    signal: Option<i32>,
    stdout: String,
    stderr: String,
}

impl ExitReport {
    fn from_status(status: std::io::Result<ExitStatus>, stdout: String, stderr: String) -> Self {
        let (exit_code, signal) = match status {
            Ok(status) => (status.code(), exit_signal(&status)),
            Err(e) => {
                debug!("Waiting on mirroring tool failed: {}", e);
                (None, None)
            }
        };
        Self {
            exit_code,
            signal,
            stdout,
            stderr,
        }
    }

    fn diagnostic(&self) -> String {
        let mut message = match (self.exit_code, self.signal) {
            (Some(code), _) => format!("exited with code {}", code),
            (None, Some(signal)) => format!("terminated by signal {}", signal),
            (None, None) => "exited".to_string(),
        };
        for output in [&self.stderr, &self.stdout] {
            if !output.is_empty() {
                message.push_str(": ");
                message.push_str(output);
            }
        }
        message
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

struct Tracked {
    generation: u64,
    pid: Option<u32>,
    device_id: String,
    stop: oneshot::Sender<()>,
    monitor: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    generation: u64,
    tracked: Option<Tracked>,
}

/// Owner of at most one mirroring process.
///
/// A second `start` while a process is tracked fails with
/// [`MirrorError::AlreadyRunning`]; the process is tracked from the moment
/// it is spawned.
pub struct MirrorSupervisor {
    mirror: Arc<ToolLocator>,
    bridge: Arc<ToolLocator>,
    devices: Arc<dyn DeviceSource>,
    grace_period: Duration,
    kill_timeout: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for MirrorSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorSupervisor")
            .field("mirror", &self.mirror)
            .field("bridge", &self.bridge)
            .field("grace_period", &self.grace_period)
            .field("kill_timeout", &self.kill_timeout)
            .finish()
    }
}

impl MirrorSupervisor {
    pub fn new(
        mirror: Arc<ToolLocator>,
        bridge: Arc<ToolLocator>,
        devices: Arc<dyn DeviceSource>,
    ) -> Self {
        Self {
            mirror,
            bridge,
            devices,
            grace_period: DEFAULT_GRACE_PERIOD,
            kill_timeout: DEFAULT_KILL_TIMEOUT,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_kill_timeout(mut self, kill_timeout: Duration) -> Self {
        self.kill_timeout = kill_timeout;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| BridgeError::LockPoisoned)
    }

    fn already_running(tracked: &Tracked) -> BridgeError {
        MirrorError::AlreadyRunning {
            pid: tracked.pid,
            device_id: tracked.device_id.clone(),
        }
        .into()
    }

    /// Launch the mirroring tool for a listed, ready device.
    ///
    /// Succeeds once the grace period passes without the process exiting.
    pub async fn start(&self, options: MirrorOptions) -> Result<MirrorStatus> {
        if let Some(tracked) = self.lock()?.tracked.as_ref() {
            return Err(Self::already_running(tracked));
        }

        self.check_device(&options.device_id).await?;

        let mirror_path = self.mirror.locate();
        let bridge_path = self.bridge.locate();
        let mut command = self.build_command(&mirror_path, &bridge_path, &options)?;

        let (exit_tx, exit_rx) = oneshot::channel();
        let pid = {
            let mut inner = self.lock()?;
            if let Some(tracked) = inner.tracked.as_ref() {
                return Err(Self::already_running(tracked));
            }

            let child = command
                .spawn()
                .map_err(|e| ResolutionError::from_spawn(&mirror_path, e))?;
            let pid = child.id();

            inner.generation += 1;
            let generation = inner.generation;
            let (stop, stop_rx) = oneshot::channel();
            let monitor = tokio::spawn(monitor(
                self.inner.clone(),
                generation,
                child,
                stop_rx,
                exit_tx,
                self.kill_timeout,
            ));
            inner.tracked = Some(Tracked {
                generation,
                pid,
                device_id: options.device_id.clone(),
                stop,
                monitor,
            });
            pid
        };
        info!(
            "Mirroring tool started for {} (pid {:?})",
            options.device_id, pid
        );

        tokio::select! {
            report = exit_rx => {
                let err = match report {
                    Ok(report) => MirrorError::StartupFailed {
                        diagnostic: report.diagnostic(),
                        exit_code: report.exit_code,
                        signal: report.signal,
                    },
                    Err(_) => MirrorError::StartupFailed {
                        diagnostic: "stopped during startup".to_string(),
                        exit_code: None,
                        signal: None,
                    },
                };
                warn!("Mirroring tool failed to start: {}", err);
                Err(err.into())
            }
            _ = tokio::time::sleep(self.grace_period) => self.status(),
        }
    }

    async fn check_device(&self, device_id: &str) -> Result<()> {
        let devices = self.devices.list().await?;
        let device = devices
            .iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| MirrorError::DeviceNotFound {
                device_id: device_id.to_string(),
            })?;
        if !device.status.is_ready() {
            return Err(MirrorError::DeviceNotReady {
                device_id: device_id.to_string(),
                status: device.status.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn build_command(
        &self,
        mirror_path: &Path,
        bridge_path: &Path,
        options: &MirrorOptions,
    ) -> Result<Command> {
        let args = options.to_args();
        debug!("Mirroring command: {} {:?}", mirror_path.display(), args);

        let mut command = Command::new(mirror_path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("ADB", bridge_path);

        if let Some(bridge_dir) = parent_dir(bridge_path) {
            command.env("PATH", prepend_path(bridge_dir)?);
        }
        if let Some(mirror_dir) = parent_dir(mirror_path) {
            command.current_dir(mirror_dir);
        }
        Ok(command)
    }

    /// Stop the tracked process. No-op when idle.
    pub async fn stop(&self) -> Result<()> {
        let Some(tracked) = self.lock()?.tracked.take() else {
            return Ok(());
        };

        info!("Stopping mirroring tool (pid {:?})", tracked.pid);
        let _ = tracked.stop.send(());
        if let Err(e) = tracked.monitor.await {
            warn!("Mirroring monitor failed: {}", e);
        }
        Ok(())
    }

    /// Current tracked state.
    pub fn status(&self) -> Result<MirrorStatus> {
        let inner = self.lock()?;
        Ok(inner
            .tracked
            .as_ref()
            .map(|t| MirrorStatus {
                running: true,
                pid: t.pid,
                device_id: Some(t.device_id.clone()),
            })
            .unwrap_or_default())
    }
}

impl Drop for MirrorSupervisor {
    fn drop(&mut self) {
        let tracked = match self.inner.lock() {
            Ok(mut inner) => inner.tracked.take(),
            Err(poisoned) => poisoned.into_inner().tracked.take(),
        };
        if let Some(tracked) = tracked {
            debug!("Supervisor dropped, stopping mirroring tool (pid {:?})", tracked.pid);
            let _ = tracked.stop.send(());
        }
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// `PATH` with `dir` in front.
fn prepend_path(dir: &Path) -> Result<OsString> {
    let mut paths: Vec<PathBuf> = vec![dir.to_path_buf()];
    if let Some(current) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(paths).map_err(|e| {
        BridgeError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    })
}

/// Collect diagnostics until the process exits or a stop is requested.
async fn monitor(
    inner: Arc<Mutex<Inner>>,
    generation: u64,
    mut child: Child,
    mut stop_rx: oneshot::Receiver<()>,
    exit_tx: oneshot::Sender<ExitReport>,
    kill_timeout: Duration,
) {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_diag = Diagnostics::new(DIAGNOSTIC_LIMIT);
    let mut err_diag = Diagnostics::new(DIAGNOSTIC_LIMIT);
    let mut out_buf = [0u8; READ_BUFFER_SIZE];
    let mut err_buf = [0u8; READ_BUFFER_SIZE];

    let status = loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                shutdown(&mut child, kill_timeout).await;
                return;
            }
            read = read_chunk(&mut stdout, &mut out_buf) => match read {
                Some(n) => out_diag.push(&out_buf[..n]),
                None => stdout = None,
            },
            read = read_chunk(&mut stderr, &mut err_buf) => match read {
                Some(n) => err_diag.push(&err_buf[..n]),
                None => stderr = None,
            },
            status = child.wait() => break status,
        }
    };

    // Output written just before exit may still sit in the pipes. Grandchildren
    // can hold them open, so the drain is bounded.
    let drain = async {
        while stdout.is_some() || stderr.is_some() {
            tokio::select! {
                read = read_chunk(&mut stdout, &mut out_buf) => match read {
                    Some(n) => out_diag.push(&out_buf[..n]),
                    None => stdout = None,
                },
                read = read_chunk(&mut stderr, &mut err_buf) => match read {
                    Some(n) => err_diag.push(&err_buf[..n]),
                    None => stderr = None,
                },
            }
        }
    };
    if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
        debug!("Mirroring tool pipes still open after exit");
    }

    let report = ExitReport::from_status(status, out_diag.text(), err_diag.text());
    debug!(
        "Mirroring tool output: stdout={:?} stderr={:?}",
        report.stdout, report.stderr
    );

    if let Ok(mut guard) = inner.lock() {
        if guard.tracked.as_ref().map(|t| t.generation) == Some(generation) {
            guard.tracked = None;
            warn!("Mirroring tool exited: {}", report.diagnostic());
        }
    }
    let _ = exit_tx.send(report);
}

/// Ask the process to terminate, then force-kill it after `kill_timeout`.
async fn shutdown(child: &mut Child, kill_timeout: Duration) {
    request_termination(child);

    match tokio::time::timeout(kill_timeout, child.wait()).await {
        Ok(status) => debug!("Mirroring tool exited: {:?}", status),
        Err(_) => {
            warn!("Mirroring tool ignored termination, killing");
            if let Err(e) = child.start_kill() {
                debug!("Kill failed: {}", e);
            }
            let _ = child.wait().await;
        }
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: pid belongs to a child we have not yet reaped.
        let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if result != 0 {
            debug!("SIGTERM failed: {}", std::io::Error::last_os_error());
        }
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("Kill failed: {}", e);
    }
}
