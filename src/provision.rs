//! Directory provisioning for log file paths.
//!
//! Sinks call [`ensure_parent_dir`] once, at construction, before the log file
//! is opened. The outcome is returned to the caller rather than printed, so
//! the application decides whether it is worth reporting.

use {
    crate::LogError,
    std::{fs, path::Path},
};

/// What [`ensure_dir`] found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// The directory was missing and has been created, parents included.
    Created,
    /// The directory was already there; nothing was touched.
    Existing,
}

/// Make sure the directory that will contain `file_path` exists.
///
/// A bare file name (no parent component) refers to the current directory and
/// is reported as [`Provisioned::Existing`].
///
/// # Errors
/// [`LogError::DirectoryCreation`] when the OS refuses to create the directory,
/// e.g. permission denied or a regular file sitting where a directory should be.
pub fn ensure_parent_dir(file_path: &Path) -> Result<Provisioned, LogError> {
    match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(Provisioned::Existing),
    }
}

/// Make sure `dir` exists as a directory, creating it recursively if needed.
///
/// Calling this twice on the same path creates the directory once and is a
/// no-op the second time.
///
/// # Errors
/// [`LogError::DirectoryCreation`] on a genuine OS-level failure.
pub fn ensure_dir(dir: &Path) -> Result<Provisioned, LogError> {
    if dir.is_dir() {
        return Ok(Provisioned::Existing);
    }
    fs::create_dir_all(dir).map_err(|source| LogError::DirectoryCreation {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(Provisioned::Created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisioning_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b").join("c");

        assert_eq!(ensure_dir(&dir).unwrap(), Provisioned::Created);
        assert!(dir.is_dir());
        assert_eq!(ensure_dir(&dir).unwrap(), Provisioned::Existing);
    }

    #[test]
    fn parent_of_file_path_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("logs").join("app.log");

        assert_eq!(ensure_parent_dir(&file).unwrap(), Provisioned::Created);
        assert!(tmp.path().join("logs").is_dir());
        assert!(!file.exists());
    }

    #[test]
    fn bare_file_name_needs_no_directory() {
        assert_eq!(ensure_parent_dir(Path::new("noName.log")).unwrap(), Provisioned::Existing);
    }

    #[test]
    fn collision_with_regular_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("logs");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = ensure_parent_dir(&blocker.join("app.log")).unwrap_err();
        match err {
            LogError::DirectoryCreation { path, .. } => assert_eq!(path, blocker),
            other => panic!("expected DirectoryCreation, got {other:?}"),
        }
    }
}
