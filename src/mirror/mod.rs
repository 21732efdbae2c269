//! Screen-mirroring tool supervision.
//!
//! At most one mirroring process exists at a time. `start` checks the
//! device listing first, wires the bridge executable into the process
//! environment, and treats an exit inside the grace period as a startup
//! failure.

mod options;
mod supervisor;

pub use options::MirrorOptions;
pub use supervisor::{MirrorStatus, MirrorSupervisor, DEFAULT_GRACE_PERIOD, DEFAULT_KILL_TIMEOUT};
