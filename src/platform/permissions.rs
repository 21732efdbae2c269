//! Best-effort execute-permission repair.

use std::path::Path;

use tracing::{debug, warn};

use super::{has_directory, Platform};

/// Set the owner-executable bit on `path` for the running platform.
///
/// Never fails; problems are logged.
pub fn ensure_executable(path: &Path) {
    ensure_executable_on(path, Platform::current());
}

/// Set the owner-executable bit on `path`, treating the host as `platform`.
///
/// No-op on Windows and for bare program names resolved through `PATH`.
pub fn ensure_executable_on(path: &Path, platform: Platform) {
    if platform.is_windows() || !has_directory(path) {
        return;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let result = std::fs::metadata(path).and_then(|metadata| {
            let mut permissions = metadata.permissions();
            let mode = permissions.mode();
            if mode & 0o100 != 0 {
                return Ok(());
            }
            permissions.set_mode(mode | 0o100);
            std::fs::set_permissions(path, permissions)?;
            debug!("Marked {} executable", path.display());
            Ok(())
        });

        if let Err(e) = result {
            warn!("Failed to set execute permission on {}: {}", path.display(), e);
        }
    }
}
