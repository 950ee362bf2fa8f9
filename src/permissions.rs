//! Owner-only file permission helpers.

use std::path::Path;

/// Restrict `path` to owner read/write (`0600`).
///
/// No-op on platforms without unix permission bits.
///
/// # Errors
///
/// Returns an error if the permissions cannot be updated.
pub fn enforce_private_file_permissions(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}

/// Returns `true` when neither group nor other has any access to `path`.
///
/// # Errors
///
/// Returns an error if the file metadata cannot be read.
#[cfg(unix)]
pub fn is_private(path: &Path) -> std::io::Result<bool> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode();
    Ok(mode & 0o077 == 0)
}

/// Returns `true`; permissions are not inspected on this platform.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub fn is_private(_path: &Path) -> std::io::Result<bool> {
    Ok(true)
}
