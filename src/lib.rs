//! # bridgectl
//!
//! Control plane for device-bridge and screen-mirroring executables.
//!
//! This crate drives external `adb`-style and `scrcpy`-style tools through
//! validated, structured operations. Every input is checked before anything
//! is spawned, and every failure surfaces as a tagged error.
//!
//! ## Features
//!
//! - **Command guard**: rejects shell operators, destructive tokens and control characters
//! - **Executable resolution**: bundled, vendored and system locations with a `PATH` fallback
//! - **One-shot execution**: timeouts with partial output, binary screen capture
//! - **Log streaming**: a single preemptible session delivering lines through a channel
//! - **Mirroring supervisor**: a single tracked process with readiness detection
//!
//! ## Quick Start
//!
//! ```no_run
//! use bridgectl::api::ControlPlane;
//! use bridgectl::config::Config;
//! use bridgectl::execution::CommandRequest;
//!
//! #[tokio::main]
//! async fn main() {
//!     bridgectl::logging::try_init().ok();
//!
//!     let plane = ControlPlane::new(&Config::default());
//!
//!     let devices = plane.list_devices().await;
//!     println!("{:?}", devices.data);
//!
//!     let response = plane
//!         .execute(&CommandRequest::new("keyevent").arg("home"))
//!         .await;
//!     println!("ok: {}", response.ok);
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod execution;
pub mod logging;
pub mod mirror;
pub mod platform;
pub mod security;
pub mod session;

// Re-export commonly used types
pub use api::{ApiError, ApiResponse, ControlPlane};
pub use config::{Config, Settings, SettingsProvider, SettingsStore};
pub use device::{Device, DeviceEnumerator, DeviceSource, DeviceStatus};
pub use error::{BridgeError, ExecutionError, MirrorError, ResolutionError, Result};
pub use execution::{CommandExecutor, CommandRequest, CommandResult, ProcessRunner};
pub use mirror::{MirrorOptions, MirrorStatus, MirrorSupervisor};
pub use platform::{ExecutableResolver, Platform, ToolLocator};
pub use security::{CommandGuard, ValidationError};
pub use session::{StreamEvent, StreamOptions, StreamingSession};
