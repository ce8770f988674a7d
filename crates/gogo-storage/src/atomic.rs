use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use gogo_core::GogoError;
use tempfile::NamedTempFile;

/// Who may read a newly created file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    /// Owner only (0600).
    Private,
    /// World readable (0644).
    Shared,
}

/// Replace `path` with `contents` via a temp file in the same directory.
///
/// Readers see either the old file or the new one, never a partial write. The mode of an
/// existing file is carried over. A symlink is followed and its target replaced, so the link
/// itself survives.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), GogoError> {
    let target = resolve(path)?;
    let tmp = stage(&target, contents)?;
    if let Ok(meta) = fs::metadata(&target) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| write_err(path, e))?;
    }
    tmp.persist(&target).map_err(|e| write_err(path, e.error))?;
    Ok(())
}

/// Create `path` with `contents` unless it already exists. Returns `false` when the file was
/// already there, in which case it is left untouched.
pub(crate) fn write_new(path: &Path, contents: &[u8], access: Access) -> Result<bool, GogoError> {
    let tmp = stage(path, contents)?;
    set_access(&tmp, access).map_err(|e| write_err(path, e))?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(err) if err.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(write_err(path, err.error)),
    }
}

fn resolve(path: &Path) -> Result<PathBuf, GogoError> {
    match fs::canonicalize(path) {
        Ok(real) => Ok(real),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(err) => Err(write_err(path, err)),
    }
}

// NamedTempFile is created 0600.
#[cfg(unix)]
fn set_access(tmp: &NamedTempFile, access: Access) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match access {
        Access::Private => Ok(()),
        Access::Shared => tmp
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o644)),
    }
}

#[cfg(not(unix))]
fn set_access(_tmp: &NamedTempFile, _access: Access) -> std::io::Result<()> {
    Ok(())
}

fn stage(path: &Path, contents: &[u8]) -> Result<NamedTempFile, GogoError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| write_err(path, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| write_err(path, e))?;
    tmp.write_all(contents).map_err(|e| write_err(path, e))?;
    tmp.flush().map_err(|e| write_err(path, e))?;
    tmp.as_file().sync_all().map_err(|e| write_err(path, e))?;
    Ok(tmp)
}

fn write_err(path: &Path, err: std::io::Error) -> GogoError {
    GogoError::io(format!("could not write {}", path.display()), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("file.yaml");
        write_atomic(&path, b"one").expect("first write");
        write_atomic(&path, b"two").expect("second write");
        assert_eq!(fs::read(&path).expect("read"), b"two");
        // only the target remains; the temp file was renamed over it
        assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("file.yaml");
        fs::write(&path, b"old").expect("seed");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");

        write_atomic(&path, b"new").expect("write");
        let mode = fs::metadata(&path).expect("meta").permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_follows_symlinks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let real = dir.path().join("dotfiles").join("gogo.yaml");
        fs::create_dir_all(real.parent().expect("parent")).expect("mkdir");
        fs::write(&real, b"old").expect("seed");
        let link = dir.path().join("link.yaml");
        std::os::unix::fs::symlink(&real, &link).expect("symlink");

        write_atomic(&link, b"new").expect("write");
        assert!(fs::symlink_metadata(&link)
            .expect("meta")
            .file_type()
            .is_symlink());
        assert_eq!(fs::read(&real).expect("read"), b"new");
    }

    #[test]
    fn write_new_never_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("once");
        assert!(write_new(&path, b"first", Access::Private).expect("create"));
        assert!(!write_new(&path, b"second", Access::Private).expect("no-op"));
        assert_eq!(fs::read(&path).expect("read"), b"first");
    }

    #[cfg(unix)]
    #[test]
    fn write_new_applies_requested_access() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        for (name, access, mode) in [
            ("private", Access::Private, 0o600),
            ("shared", Access::Shared, 0o644),
        ] {
            let path = dir.path().join(name);
            write_new(&path, b"x", access).expect("create");
            let actual = fs::metadata(&path).expect("meta").permissions().mode();
            assert_eq!(actual & 0o777, mode, "{name}");
        }
    }
}
