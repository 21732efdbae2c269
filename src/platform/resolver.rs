//! Executable path resolution.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::{Platform, ToolSpec};

/// A source of candidate paths for a tool.
pub trait CandidateSource: Send + Sync + std::fmt::Debug {
    /// Candidate paths, in priority order.
    fn candidates(&self, tool: &ToolSpec, platform: Platform) -> Vec<PathBuf>;
}

/// Bundled resources: `<root>/<tool>/<platform>/<binary>`, then `<root>/<tool>/<binary>`.
#[derive(Debug, Clone)]
pub struct BundledResources {
    root: PathBuf,
}

impl BundledResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl CandidateSource for BundledResources {
    fn candidates(&self, tool: &ToolSpec, platform: Platform) -> Vec<PathBuf> {
        let binary = platform.binary_name(tool.stem);
        let base = self.root.join(tool.resource_dir);
        vec![base.join(platform.segment()).join(&binary), base.join(binary)]
    }
}

/// Development tree: `<app>/vendor/<tool>/<platform>/<binary>`, then the same one level up.
#[derive(Debug, Clone)]
pub struct VendorTree {
    app_dir: PathBuf,
}

impl VendorTree {
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
        }
    }
}

impl CandidateSource for VendorTree {
    fn candidates(&self, tool: &ToolSpec, platform: Platform) -> Vec<PathBuf> {
        let binary = platform.binary_name(tool.stem);
        let tail = Path::new("vendor")
            .join(tool.resource_dir)
            .join(platform.segment())
            .join(binary);
        vec![self.app_dir.join(&tail), self.app_dir.join("..").join(tail)]
    }
}

/// Well-known system install directories. Yields nothing on Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDirs;

impl CandidateSource for SystemDirs {
    fn candidates(&self, tool: &ToolSpec, platform: Platform) -> Vec<PathBuf> {
        if platform.is_windows() {
            return Vec::new();
        }
        let binary = platform.binary_name(tool.stem);
        tool.system_dirs
            .iter()
            .map(|dir| Path::new(dir).join(&binary))
            .collect()
    }
}

/// A fixed candidate list.
#[derive(Debug, Clone, Default)]
pub struct FixedCandidates(pub Vec<PathBuf>);

impl CandidateSource for FixedCandidates {
    fn candidates(&self, _tool: &ToolSpec, _platform: Platform) -> Vec<PathBuf> {
        self.0.clone()
    }
}

/// Resolves the path of an external tool.
///
/// Priority: caller override, then every candidate source in the order
/// added, then the bare binary name (left to the `PATH` search).
#[derive(Debug)]
pub struct ExecutableResolver {
    tool: ToolSpec,
    platform: Platform,
    sources: Vec<Box<dyn CandidateSource>>,
}

impl ExecutableResolver {
    /// Create a resolver with no candidate sources.
    pub fn new(tool: ToolSpec, platform: Platform) -> Self {
        Self {
            tool,
            platform,
            sources: Vec::new(),
        }
    }

    /// Standard chain: bundled resources, vendor tree, system directories.
    pub fn standard(tool: ToolSpec, resources_dir: Option<&Path>, app_dir: Option<&Path>) -> Self {
        let mut resolver = Self::new(tool, Platform::current());
        if let Some(dir) = resources_dir {
            resolver = resolver.with_source(BundledResources::new(dir));
        }
        if let Some(dir) = app_dir {
            resolver = resolver.with_source(VendorTree::new(dir));
        }
        resolver.with_source(SystemDirs)
    }

    /// Append a candidate source.
    pub fn with_source(mut self, source: impl CandidateSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// All candidates, in probe order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        self.sources
            .iter()
            .flat_map(|s| s.candidates(&self.tool, self.platform))
            .collect()
    }

    /// Resolve the executable path. Never fails.
    pub fn resolve(&self, override_path: Option<&str>) -> PathBuf {
        if let Some(path) = override_path.map(str::trim).filter(|p| !p.is_empty()) {
            debug!("Using {} override: {}", self.tool.stem, path);
            return PathBuf::from(path);
        }

        for candidate in self.candidates() {
            if is_executable(&candidate, self.platform) {
                debug!("Found {} at {}", self.tool.stem, candidate.display());
                return candidate;
            }
            trace!("Skipping {} candidate {}", self.tool.stem, candidate.display());
        }

        let bare = self.platform.binary_name(self.tool.stem);
        debug!("{} not found in known locations, deferring to PATH", bare);
        PathBuf::from(bare)
    }

    pub fn tool(&self) -> ToolSpec {
        self.tool
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

/// Check that `path` exists and is executable.
///
/// On Windows this degrades to an existence check.
pub fn is_executable(path: &Path, platform: Platform) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    if platform.is_windows() {
        return true;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{BRIDGE_TOOL, MIRROR_TOOL};

    #[test]
    fn test_override_wins_unverified() {
        let resolver = ExecutableResolver::new(BRIDGE_TOOL, Platform::Linux)
            .with_source(FixedCandidates(vec!["/usr/bin/adb".into()]));

        assert_eq!(
            resolver.resolve(Some("  /does/not/exist/adb  ")),
            PathBuf::from("/does/not/exist/adb")
        );
    }

    #[test]
    fn test_blank_override_ignored() {
        let resolver = ExecutableResolver::new(BRIDGE_TOOL, Platform::Linux);
        assert_eq!(resolver.resolve(Some("   ")), PathBuf::from("adb"));
    }

    #[test]
    fn test_fallback_bare_name() {
        let resolver = ExecutableResolver::new(BRIDGE_TOOL, Platform::Windows)
            .with_source(FixedCandidates(vec!["/nope/adb.exe".into()]));
        assert_eq!(resolver.resolve(None), PathBuf::from("adb.exe"));
    }

    #[test]
    fn test_bundled_candidates_order() {
        let source = BundledResources::new("/app/resources");
        let candidates = source.candidates(&BRIDGE_TOOL, Platform::Linux);
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/app/resources/platform-tools/linux/adb"),
                PathBuf::from("/app/resources/platform-tools/adb"),
            ]
        );
    }

    #[test]
    fn test_vendor_candidates() {
        let source = VendorTree::new("/src/app");
        let candidates = source.candidates(&MIRROR_TOOL, Platform::Windows);
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/src/app/vendor/scrcpy/windows/scrcpy.exe"),
                PathBuf::from("/src/app/../vendor/scrcpy/windows/scrcpy.exe"),
            ]
        );
    }

    #[test]
    fn test_system_dirs_skipped_on_windows() {
        assert!(SystemDirs
            .candidates(&BRIDGE_TOOL, Platform::Windows)
            .is_empty());
        assert_eq!(
            SystemDirs.candidates(&MIRROR_TOOL, Platform::MacOs).last(),
            Some(&PathBuf::from("/opt/homebrew/bin/scrcpy"))
        );
    }

    #[test]
    fn test_candidates_follow_source_order() {
        let resolver = ExecutableResolver::new(BRIDGE_TOOL, Platform::Linux)
            .with_source(FixedCandidates(vec!["/first".into()]))
            .with_source(FixedCandidates(vec!["/second".into()]));
        assert_eq!(
            resolver.candidates(),
            vec![PathBuf::from("/first"), PathBuf::from("/second")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_first_executable_candidate_wins() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain");
        let runnable = dir.path().join("runnable");
        std::fs::write(&plain, "").unwrap();
        std::fs::write(&runnable, "").unwrap();
        std::fs::set_permissions(&plain, std::fs::Permissions::from_mode(0o644)).unwrap();
        std::fs::set_permissions(&runnable, std::fs::Permissions::from_mode(0o755)).unwrap();

        let resolver = ExecutableResolver::new(BRIDGE_TOOL, Platform::Linux).with_source(
            FixedCandidates(vec![
                dir.path().join("missing"),
                plain.clone(),
                runnable.clone(),
            ]),
        );
        assert_eq!(resolver.resolve(None), runnable);

        // Windows semantics only need the file to exist.
        let resolver = ExecutableResolver::new(BRIDGE_TOOL, Platform::Windows)
            .with_source(FixedCandidates(vec![plain.clone(), runnable]));
        assert_eq!(resolver.resolve(None), plain);
    }

    #[test]
    fn test_directory_is_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_executable(dir.path(), Platform::Linux));
        assert!(!is_executable(dir.path(), Platform::Windows));
    }
}
