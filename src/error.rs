//! Error types for bridgectl.
//!
//! Errors are split into tiers that never mix: validation failures raised
//! before anything is spawned, resolution/spawn failures coming from the
//! operating environment, and execution outcomes such as timeouts. The
//! mirroring supervisor adds its own precondition and startup failures.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use thiserror::Error;

use crate::security::ValidationError;

/// Hint attached to [`ResolutionError::NotFound`].
const NOT_FOUND_HINT: &str =
    "check the PATH environment variable or the configured executable override";

/// Failures locating or spawning an external executable.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// The executable does not exist.
    #[error("executable not found: {program} ({hint})")]
    NotFound { program: String, hint: String },

    /// Any other spawn failure, carrying the platform error code.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        program: String,
        code: Option<i32>,
        message: String,
    },
}

impl ResolutionError {
    /// Classify a spawn failure for `program`.
    pub fn from_spawn(program: &Path, err: std::io::Error) -> Self {
        let program = program.display().to_string();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                program,
                hint: NOT_FOUND_HINT.to_string(),
            }
        } else {
            Self::Spawn {
                program,
                code: err.raw_os_error(),
                message: err.to_string(),
            }
        }
    }
}

/// Outcomes of a spawned process that are reported as failures.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The process exceeded its budget and was force-terminated.
    #[error("command timed out after {timeout_ms} ms")]
    Timeout {
        timeout_ms: u64,
        stdout: String,
        stderr: String,
    },

    /// Screen capture exited with a non-zero (or absent) exit code.
    #[error("screen capture failed with exit code {exit_code:?}: {stderr}")]
    CaptureFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The captured image could not be written to disk.
    #[error("failed to save capture to {}: {message}", path.display())]
    CaptureSaveFailed { path: PathBuf, message: String },
}

/// Failures of the mirroring-tool supervisor.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// A mirroring process is already tracked.
    #[error("mirroring tool is already running (pid {pid:?}, device {device_id})")]
    AlreadyRunning { pid: Option<u32>, device_id: String },

    /// The requested device is absent from the current enumeration.
    #[error("device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    /// The device is listed but not ready.
    #[error("device {device_id} is not ready (status: {status})")]
    DeviceNotReady { device_id: String, status: String },

    /// The process exited or errored inside the grace period.
    #[error("mirroring tool failed to start: {diagnostic}")]
    StartupFailed {
        diagnostic: String,
        exit_code: Option<i32>,
        signal: Option<i32>,
    },
}

/// Main error type for bridgectl operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Input rejected before any process was spawned.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Executable missing or spawn failure.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Timeout or command-specific failure.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Mirroring supervisor failure.
    #[error(transparent)]
    Mirror(#[from] MirrorError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings could not be loaded or saved.
    #[error("settings error: {0}")]
    Settings(String),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

impl BridgeError {
    /// Stable tag for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::Resolution(ResolutionError::NotFound { .. }) => "EXECUTABLE_NOT_FOUND",
            Self::Resolution(ResolutionError::Spawn { .. }) => "SPAWN_ERROR",
            Self::Execution(ExecutionError::Timeout { .. }) => "COMMAND_TIMEOUT",
            Self::Execution(ExecutionError::CaptureFailed { .. }) => "CAPTURE_FAILED",
            Self::Execution(ExecutionError::CaptureSaveFailed { .. }) => "CAPTURE_SAVE_FAILED",
            Self::Mirror(MirrorError::AlreadyRunning { .. }) => "MIRROR_ALREADY_RUNNING",
            Self::Mirror(MirrorError::DeviceNotFound { .. }) => "DEVICE_NOT_FOUND",
            Self::Mirror(MirrorError::DeviceNotReady { .. }) => "DEVICE_NOT_READY",
            Self::Mirror(MirrorError::StartupFailed { .. }) => "MIRROR_START_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Settings(_) => "SETTINGS_ERROR",
            Self::LockPoisoned => "INTERNAL_ERROR",
        }
    }

    /// Structured payload for the boundary, if the kind carries one.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Validation(e) => e.details(),
            Self::Resolution(ResolutionError::NotFound { program, hint }) => {
                Some(json!({ "program": program, "hint": hint }))
            }
            Self::Resolution(ResolutionError::Spawn { program, code, .. }) => {
                Some(json!({ "program": program, "code": code }))
            }
            Self::Execution(ExecutionError::Timeout {
                timeout_ms,
                stdout,
                stderr,
            }) => Some(json!({
                "timeoutMs": timeout_ms,
                "stdout": stdout,
                "stderr": stderr,
            })),
            Self::Execution(ExecutionError::CaptureFailed { exit_code, stderr }) => {
                Some(json!({ "exitCode": exit_code, "stderr": stderr }))
            }
            Self::Execution(ExecutionError::CaptureSaveFailed { path, .. }) => {
                Some(json!({ "path": path }))
            }
            Self::Mirror(MirrorError::AlreadyRunning { pid, device_id }) => {
                Some(json!({ "pid": pid, "deviceId": device_id }))
            }
            Self::Mirror(MirrorError::DeviceNotFound { device_id }) => {
                Some(json!({ "deviceId": device_id }))
            }
            Self::Mirror(MirrorError::DeviceNotReady { device_id, status }) => {
                Some(json!({ "deviceId": device_id, "status": status }))
            }
            Self::Mirror(MirrorError::StartupFailed {
                exit_code, signal, ..
            }) => Some(json!({ "exitCode": exit_code, "signal": signal })),
            Self::Io(e) => Some(json!({ "kind": format!("{:?}", e.kind()) })),
            Self::Settings(_) | Self::LockPoisoned => None,
        }
    }
}

/// Convenience Result type for bridgectl operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
