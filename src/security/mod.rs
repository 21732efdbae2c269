//! Security module for bridgectl.
//!
//! Every command headed for the bridge executable passes through
//! [`CommandGuard`] before any process is spawned. The guard looks for
//! known-dangerous tokens, shell operators and control characters; it does
//! not interpret shell syntax.
//!
//! ## Example
//!
//! ```rust
//! use bridgectl::security::{CommandGuard, ValidationError};
//!
//! let guard = CommandGuard::default();
//! assert!(guard.validate("shell", &["pm", "list", "packages"]).is_ok());
//! assert_eq!(
//!     guard.validate("reboot", &["bootloader"]),
//!     Err(ValidationError::DangerousRebootCombo)
//! );
//! ```

pub mod validation;

pub use validation::{
    default_blacklist, CommandGuard, GuardConfig, ValidationError,
    DEFAULT_MAX_ARG_LENGTH,
};
