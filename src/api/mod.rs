//! Boundary layer for bridgectl.
//!
//! The UI channel reaches the core through [`ControlPlane`]. Every
//! operation returns an [`ApiResponse`] envelope whose error side is the
//! normalized [`ApiError`] shape `{code, message, details?}`.
//!
//! ## Operations
//!
//! - Devices: `list_devices`
//! - Commands: `execute`
//! - Settings: `settings`, `update_settings`
//! - Logs: `start_logs`, `stop_logs`, `log_status`, `save_logs`, `clear_logs`
//! - Mirroring: `start_mirror`, `stop_mirror`, `mirror_status`

pub mod handlers;
pub mod types;

// Re-export commonly used types
pub use handlers::ControlPlane;
pub use types::{ApiError, ApiResponse, SaveLogRequest, SaveLogResponse};
