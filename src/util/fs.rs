use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub fn ensure_dir(path: &Path, mode: u32) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("create directory {}", path.display()))?;
    }
    set_permissions(path, mode)
}

pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(mode);
        fs::set_permissions(path, perm)
            .with_context(|| format!("set permissions {:o} on {}", mode, path.display()))?;
    }
    Ok(())
}

/// Write `contents` to a temp file next to `path`, then rename it into place.
///
/// A failure before the rename leaves the previous file untouched.
pub fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let tmp = stage(path, contents, mode)?;
    commit(tmp, path)
}

/// Write and sync `contents` into a temp file in `path`'s directory.
///
/// Nothing at `path` changes until [`commit`]; dropping the returned file
/// discards it.
pub fn stage(path: &Path, contents: &[u8], mode: u32) -> Result<NamedTempFile> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".credscope-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("write temp file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("sync temp file for {}", path.display()))?;

    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(mode);
        tmp.as_file()
            .set_permissions(perm)
            .with_context(|| format!("set permissions on temp file for {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(tmp)
}

/// Atomically rename a staged file over `path`.
pub fn commit(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path)
        .map_err(|err| anyhow::anyhow!("persist {}: {}", path.display(), err))?;
    Ok(())
}

/// Remove a file, returning whether it existed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.key");
        write_atomic(&path, b"first", 0o600).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");
        write_atomic(&path, b"second", 0o600).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        write_atomic(&dir.path().join("a"), b"x", 0o600).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_sets_mode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.enc");
        write_atomic(&path, b"x", 0o640).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn test_stage_does_not_touch_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.enc");
        fs::write(&path, b"old").unwrap();
        let tmp = stage(&path, b"new", 0o600).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"old");
        drop(tmp);
        assert_eq!(fs::read(&path).unwrap(), b"old");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_commit_replaces_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.enc");
        fs::write(&path, b"old").unwrap();
        let tmp = stage(&path, b"new", 0o600).unwrap();
        commit(tmp, &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone");
        assert!(!remove_if_exists(&path).unwrap());
        fs::write(&path, b"x").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_dir_sets_mode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hosts").join("box");
        ensure_dir(&path, 0o700).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }
}
