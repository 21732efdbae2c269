//! Mirroring-tool launch options.

use serde::Deserialize;

/// Structured options for one mirroring session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MirrorOptions {
    /// Device to mirror; must be listed and ready.
    pub device_id: String,
    pub window_title: Option<String>,
    /// Applied only together with `window_height`.
    pub window_width: Option<u32>,
    /// Applied only together with `window_width`.
    pub window_height: Option<u32>,
    pub always_on_top: bool,
    pub no_border: bool,
    pub stay_awake: bool,
}

impl MirrorOptions {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Self::default()
        }
    }

    /// Argument list for the mirroring tool.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-s".to_string(), self.device_id.clone()];

        if let Some(title) = self.window_title.as_deref().filter(|t| !t.is_empty()) {
            args.push("--window-title".into());
            args.push(title.to_string());
        }

        let width = self.window_width.filter(|w| *w > 0);
        let height = self.window_height.filter(|h| *h > 0);
        if let (Some(width), Some(height)) = (width, height) {
            args.push("--window-width".into());
            args.push(width.to_string());
            args.push("--window-height".into());
            args.push(height.to_string());
        }

        if self.always_on_top {
            args.push("--always-on-top".into());
        }
        if self.no_border {
            args.push("--window-borderless".into());
        }
        if self.stay_awake {
            args.push("--stay-awake".into());
        }
        args
    }
}
