//! Platform abstraction for locating external tools.
//!
//! Resolution is an ordered list of candidate sources tried in sequence
//! (see [`ExecutableResolver`]); the platform is passed in rather than
//! branched on inline, so every source can be tested with any platform.

mod permissions;
mod resolver;

pub use permissions::{ensure_executable, ensure_executable_on};
pub use resolver::{
    is_executable, BundledResources, CandidateSource, ExecutableResolver, FixedCandidates,
    SystemDirs, VendorTree,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SettingsProvider;

/// Operating system family relevant to path resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }

    /// Directory segment used for platform-specific bundles.
    pub fn segment(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
            Platform::Other => std::env::consts::OS,
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }

    /// File name of a binary on this platform.
    pub fn binary_name(&self, stem: &str) -> String {
        if self.is_windows() {
            format!("{}.exe", stem)
        } else {
            stem.to_string()
        }
    }
}

/// Static description of an external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    /// Folder name under the resources and vendor directories.
    pub resource_dir: &'static str,
    /// Binary name without extension.
    pub stem: &'static str,
    /// Well-known install directories (non-Windows only).
    pub system_dirs: &'static [&'static str],
}

/// The device-bridge tool.
pub const BRIDGE_TOOL: ToolSpec = ToolSpec {
    resource_dir: "platform-tools",
    stem: "adb",
    system_dirs: &["/usr/local/bin", "/usr/bin"],
};

/// The screen-mirroring tool.
pub const MIRROR_TOOL: ToolSpec = ToolSpec {
    resource_dir: "scrcpy",
    stem: "scrcpy",
    system_dirs: &["/usr/local/bin", "/usr/bin", "/opt/homebrew/bin"],
};

/// Where a tool's override path comes from.
#[derive(Clone, Default)]
pub enum OverrideSource {
    /// No override.
    #[default]
    None,
    /// Fixed path, e.g. from the command line.
    Fixed(String),
    /// Bridge override from the settings provider, read on every lookup.
    /// Ignored by locators for any other tool.
    BridgeSettings(Arc<dyn SettingsProvider>),
}

impl std::fmt::Debug for OverrideSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Fixed(path) => f.debug_tuple("Fixed").field(path).finish(),
            Self::BridgeSettings(_) => write!(f, "BridgeSettings"),
        }
    }
}

/// Resolver plus override lookup and permission repair.
#[derive(Debug)]
pub struct ToolLocator {
    resolver: ExecutableResolver,
    overrides: OverrideSource,
}

impl ToolLocator {
    /// Create a locator without an override.
    pub fn new(resolver: ExecutableResolver) -> Self {
        Self {
            resolver,
            overrides: OverrideSource::None,
        }
    }

    /// Set the override source.
    pub fn with_override(mut self, overrides: OverrideSource) -> Self {
        self.overrides = overrides;
        self
    }

    /// Locator that always yields `path`.
    pub fn fixed(tool: ToolSpec, path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self::new(ExecutableResolver::new(tool, Platform::current()))
            .with_override(OverrideSource::Fixed(path.display().to_string()))
    }

    fn override_path(&self) -> Option<String> {
        match &self.overrides {
            OverrideSource::None => None,
            OverrideSource::Fixed(path) => Some(path.clone()),
            OverrideSource::BridgeSettings(provider) if self.tool() == BRIDGE_TOOL => {
                provider.get().adb_path
            }
            OverrideSource::BridgeSettings(_) => None,
        }
    }

    /// Resolve the executable and make sure it is runnable.
    pub fn locate(&self) -> PathBuf {
        let path = self.resolver.resolve(self.override_path().as_deref());
        ensure_executable(&path);
        path
    }

    pub fn tool(&self) -> ToolSpec {
        self.resolver.tool()
    }
}

/// Directory holding bundled resources: `resources/` next to the binary.
pub fn default_resources_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("resources")))
}

/// Whether `path` names a file in a directory rather than a bare program name.
pub(crate) fn has_directory(path: &Path) -> bool {
    path.parent()
        .map(|p| !p.as_os_str().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_name() {
        assert_eq!(Platform::Windows.binary_name("adb"), "adb.exe");
        assert_eq!(Platform::Linux.binary_name("adb"), "adb");
        assert_eq!(Platform::MacOs.binary_name("scrcpy"), "scrcpy");
    }

    #[test]
    fn test_segment() {
        assert_eq!(Platform::Windows.segment(), "windows");
        assert_eq!(Platform::MacOs.segment(), "macos");
        assert_eq!(Platform::Linux.segment(), "linux");
    }

    #[test]
    fn test_has_directory() {
        assert!(!has_directory(Path::new("adb")));
        assert!(has_directory(Path::new("/usr/bin/adb")));
        assert!(has_directory(Path::new("tools/adb")));
    }

    #[test]
    fn test_fixed_locator_returns_override() {
        let locator = ToolLocator::fixed(BRIDGE_TOOL, "/nonexistent/custom/adb");
        assert_eq!(locator.locate(), PathBuf::from("/nonexistent/custom/adb"));
        assert_eq!(locator.tool(), BRIDGE_TOOL);
    }

    #[test]
    fn test_bridge_settings_only_apply_to_bridge() {
        use crate::config::{Settings, SettingsStore};

        let settings: Arc<dyn SettingsProvider> = Arc::new(SettingsStore::new(Settings {
            adb_path: Some("/opt/custom/adb".into()),
            ..Settings::default()
        }));

        let bridge = ToolLocator::new(ExecutableResolver::new(BRIDGE_TOOL, Platform::current()))
            .with_override(OverrideSource::BridgeSettings(settings.clone()));
        assert_eq!(bridge.locate(), PathBuf::from("/opt/custom/adb"));

        let mirror = ToolLocator::new(ExecutableResolver::new(MIRROR_TOOL, Platform::current()))
            .with_override(OverrideSource::BridgeSettings(settings));
        assert_ne!(mirror.locate(), PathBuf::from("/opt/custom/adb"));
    }
}
