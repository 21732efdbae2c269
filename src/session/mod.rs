//! Log streaming session management.
//!
//! This module provides the single long-lived log stream: lifecycle state,
//! chunk-to-line splitting, the cumulative history and saving it to disk.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bridgectl::platform::{ToolLocator, BRIDGE_TOOL};
//! use bridgectl::session::{StreamEvent, StreamOptions, StreamingSession};
//!
//! # async fn run() -> bridgectl::Result<()> {
//! let session = StreamingSession::new(Arc::new(ToolLocator::fixed(BRIDGE_TOOL, "adb")));
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! session.start(tx, StreamOptions::default()).await?;
//!
//! while let Some(event) = rx.recv().await {
//!     if let StreamEvent::Line(line) = event {
//!         println!("{}", line);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod history;
mod lines;
mod state;
mod streaming;

pub use history::{default_log_directory, default_log_file_name, save_log, LogHistory};
pub use lines::LineSplitter;
pub use state::SessionState;
pub use streaming::{
    LogSink, StreamEvent, StreamOptions, StreamStatus, StreamingSession, ERROR_PREFIX,
    STDERR_PREFIX,
};
