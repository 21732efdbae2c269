//! Parser for the bridge's verbose device listing.

use std::collections::HashMap;

use serde::Serialize;

/// Fixed header phrase of the listing.
const HEADER: &str = "list of devices";

/// Connection status reported for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Online and ready for commands.
    Device,
    Offline,
    /// Debugging not yet authorized on the device.
    Unauthorized,
    /// Anything the parser does not recognize.
    Unknown,
}

impl DeviceStatus {
    /// Normalize a raw status token; unrecognized values become `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "device" => Self::Device,
            "offline" => Self::Offline,
            "unauthorized" => Self::Unauthorized,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Offline => "offline",
            Self::Unauthorized => "unauthorized",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the device accepts commands.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Device)
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device as reported by one enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub status: DeviceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_id: Option<String>,
}

impl Device {
    /// Create a device with no properties.
    pub fn new(id: impl Into<String>, status: DeviceStatus) -> Self {
        Self {
            id: id.into(),
            status,
            model: None,
            product: None,
            transport_id: None,
        }
    }
}

/// Parse listing output into devices, preserving input order.
///
/// Empty output yields an empty list.
pub fn parse_device_list(output: &str) -> Vec<Device> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_header(line))
        .filter_map(parse_device_line)
        .collect()
}

fn is_header(line: &str) -> bool {
    line.get(..HEADER.len())
        .map(|prefix| prefix.eq_ignore_ascii_case(HEADER))
        .unwrap_or(false)
}

fn parse_device_line(line: &str) -> Option<Device> {
    let mut tokens = line.split_whitespace();
    let id = tokens.next()?;
    let status = DeviceStatus::parse(tokens.next().unwrap_or_default());

    let mut properties: HashMap<&str, &str> = HashMap::new();
    for token in tokens {
        if let Some((key, value)) = token.split_once(':') {
            if !key.is_empty() && !value.is_empty() {
                properties.insert(key, value);
            }
        }
    }

    let mut device = Device::new(id, status);
    device.model = properties.get("model").map(|v| v.to_string());
    device.product = properties.get("product").map(|v| v.to_string());
    device.transport_id = properties
        .get("transport_id")
        .or_else(|| properties.get("transportId"))
        .map(|v| v.to_string());
    Some(device)
}
