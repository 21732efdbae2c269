//! Command execution engine.
//!
//! This module provides one-shot command execution:
//! - Mapping requests onto the logical command surface
//! - Timeout enforcement with partial output on failure
//! - Binary screen capture to a file
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bridgectl::execution::{CommandExecutor, CommandRequest};
//! use bridgectl::platform::{ToolLocator, BRIDGE_TOOL};
//!
//! # async fn run() -> bridgectl::Result<()> {
//! let executor = CommandExecutor::new(Arc::new(ToolLocator::fixed(BRIDGE_TOOL, "adb")));
//! let request = CommandRequest::new("keyevent")
//!     .device("emulator-5554")
//!     .arg("home")
//!     .timeout(Duration::from_secs(5));
//! let result = executor.execute(&request).await?;
//! println!("exit code: {:?}", result.exit_code);
//! # Ok(())
//! # }
//! ```

mod command;
mod executor;
mod result;
mod runner;

pub use command::{
    device_args, map_key_event, BridgeCommand, CommandOptions, CommandRequest, DEFAULT_TIMEOUT,
};
pub use executor::CommandExecutor;
pub use result::CommandResult;
pub use runner::ProcessRunner;

pub(crate) use runner::{read_chunk, READ_BUFFER_SIZE};
