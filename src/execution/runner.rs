//! One-shot process execution with timeout enforcement.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::result::CommandResult;
use crate::error::{ExecutionError, ResolutionError};
use crate::Result;

/// Buffer size for reading child output.
pub(crate) const READ_BUFFER_SIZE: usize = 4096;

/// Raw bytes collected from a finished process.
#[derive(Debug, Default)]
struct RawOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<i32>,
}

/// Spawns external processes and collects their output.
///
/// Stateless: concurrent calls each own their process and deadline.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    capture_dir: PathBuf,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    /// Create a runner writing captures to the system temp directory.
    pub fn new() -> Self {
        Self {
            capture_dir: std::env::temp_dir(),
        }
    }

    /// Write captures into `dir` instead.
    pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = dir.into();
        self
    }

    /// Run `program` to completion.
    ///
    /// A non-zero exit code is returned as data. Exceeding `timeout` kills
    /// the process and fails with [`ExecutionError::Timeout`] carrying the
    /// output captured so far.
    pub async fn execute(
        &self,
        program: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandResult> {
        let raw = run(program, args, timeout).await?;
        Ok(CommandResult::new(
            String::from_utf8_lossy(&raw.stdout).into_owned(),
            String::from_utf8_lossy(&raw.stderr).into_owned(),
            raw.exit_code,
        ))
    }

    /// Run `program` and write its stdout verbatim to a new PNG file.
    ///
    /// Any exit code other than zero fails with [`ExecutionError::CaptureFailed`].
    pub async fn capture(
        &self,
        program: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<PathBuf> {
        let raw = run(program, args, timeout).await?;
        if raw.exit_code != Some(0) {
            return Err(ExecutionError::CaptureFailed {
                exit_code: raw.exit_code,
                stderr: String::from_utf8_lossy(&raw.stderr).into_owned(),
            }
            .into());
        }

        let path = self.capture_dir.join(format!(
            "screenshot-{}.png",
            chrono::Utc::now().timestamp_millis()
        ));
        tokio::fs::write(&path, &raw.stdout)
            .await
            .map_err(|e| ExecutionError::CaptureSaveFailed {
                path: path.clone(),
                message: e.to_string(),
            })?;

        debug!("Saved {} byte capture to {}", raw.stdout.len(), path.display());
        Ok(path)
    }
}

async fn run(program: &Path, args: &[String], timeout: Duration) -> Result<RawOutput> {
    debug!("Running {} {:?} (timeout {:?})", program.display(), args, timeout);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ResolutionError::from_spawn(program, e))?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut output = RawOutput::default();
    let mut out_buf = [0u8; READ_BUFFER_SIZE];
    let mut err_buf = [0u8; READ_BUFFER_SIZE];

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut out_buf) => match read {
                Some(n) => output.stdout.extend_from_slice(&out_buf[..n]),
                None => stdout = None,
            },
            read = read_chunk(&mut stderr, &mut err_buf) => match read {
                Some(n) => output.stderr.extend_from_slice(&err_buf[..n]),
                None => stderr = None,
            },
            _ = &mut deadline => {
                return Err(terminate(child, output, timeout).await);
            }
        }
    }

    let status = tokio::select! {
        status = child.wait() => status?,
        _ = &mut deadline => {
            return Err(terminate(child, output, timeout).await);
        }
    };

    output.exit_code = status.code();
    debug!("{} exited with {:?}", program.display(), output.exit_code);
    Ok(output)
}

/// Read one chunk from an open pipe. `None` on EOF or error; never resolves once closed.
pub(crate) async fn read_chunk<R>(pipe: &mut Option<R>, buf: &mut [u8]) -> Option<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(reader) => match reader.read(buf).await {
            Ok(0) => None,
            Ok(n) => Some(n),
            Err(e) => {
                debug!("Pipe read failed: {}", e);
                None
            }
        },
        None => std::future::pending().await,
    }
}

/// Force-kill a timed-out child, keeping what it already wrote.
async fn terminate(
    mut child: Child,
    output: RawOutput,
    timeout: Duration,
) -> crate::error::BridgeError {
    warn!("Process {:?} exceeded {:?}, killing", child.id(), timeout);
    if let Err(e) = child.start_kill() {
        debug!("Kill failed: {}", e);
    }
    let _ = child.wait().await;

    ExecutionError::Timeout {
        timeout_ms: timeout.as_millis() as u64,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    #[tokio::test]
    async fn test_missing_executable_is_not_found() {
        let runner = ProcessRunner::new();
        let err = runner
            .execute(
                Path::new("/definitely/not/here/adb"),
                &["devices".into()],
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Resolution(ResolutionError::NotFound { .. })
        ));
        assert_eq!(err.code(), "EXECUTABLE_NOT_FOUND");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collects_both_streams_and_exit_code() {
        let runner = ProcessRunner::new();
        let args: Vec<String> = vec!["-c".into(), "echo out; echo err >&2; exit 3".into()];
        let result = runner
            .execute(Path::new("/bin/sh"), &args, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_keeps_partial_output() {
        let runner = ProcessRunner::new();
        let args: Vec<String> = vec!["-c".into(), "echo early; exec sleep 10".into()];
        let started = std::time::Instant::now();
        let err = runner
            .execute(Path::new("/bin/sh"), &args, Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(5));
        match err {
            BridgeError::Execution(ExecutionError::Timeout {
                timeout_ms, stdout, ..
            }) => {
                assert_eq!(timeout_ms, 300);
                assert_eq!(stdout, "early\n");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_writes_stdout_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new().with_capture_dir(dir.path());
        let args: Vec<String> = vec!["-c".into(), "printf 'PNGDATA'".into()];
        let path = runner
            .capture(Path::new("/bin/sh"), &args, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(path.starts_with(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("screenshot-") && name.ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PNGDATA");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_non_zero_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new().with_capture_dir(dir.path());
        let args: Vec<String> = vec!["-c".into(), "echo 'no device' >&2; exit 1".into()];
        let err = runner
            .capture(Path::new("/bin/sh"), &args, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CAPTURE_FAILED");
        assert!(err.to_string().contains("no device"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
