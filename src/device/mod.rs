//! Connected-device enumeration.

mod enumerator;
mod listing;

pub use enumerator::{DeviceEnumerator, DeviceSource, LIST_TIMEOUT};
pub use listing::{parse_device_list, Device, DeviceStatus};
