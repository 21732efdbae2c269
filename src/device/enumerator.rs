//! Device enumeration through the bridge executable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::listing::{parse_device_list, Device};
use crate::execution::ProcessRunner;
use crate::platform::ToolLocator;
use crate::Result;

/// Timeout for the listing invocation.
pub const LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can list connected devices.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Current devices, in listing order.
    async fn list(&self) -> Result<Vec<Device>>;
}

/// Lists devices by running `devices -l`.
#[derive(Debug)]
pub struct DeviceEnumerator {
    bridge: Arc<ToolLocator>,
    runner: ProcessRunner,
}

impl DeviceEnumerator {
    pub fn new(bridge: Arc<ToolLocator>) -> Self {
        Self {
            bridge,
            runner: ProcessRunner::new(),
        }
    }
}

#[async_trait]
impl DeviceSource for DeviceEnumerator {
    async fn list(&self) -> Result<Vec<Device>> {
        let program = self.bridge.locate();
        let args = ["devices".to_string(), "-l".to_string()];
        let result = self.runner.execute(&program, &args, LIST_TIMEOUT).await?;
        let devices = parse_device_list(&result.stdout);
        debug!("Enumerated {} device(s)", devices.len());
        Ok(devices)
    }
}
