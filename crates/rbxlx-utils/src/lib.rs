//! Shared utilities for rbxlx-build crates.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::Builder;

/// Atomically write the provided string to `path`, ensuring readers never observe
/// a partially written place file. The write goes to a temporary file in the
/// same directory followed by an atomic rename, so a failed build leaves any
/// previous output untouched.
pub fn atomic_write(path: &Path, contents: &str) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Path::new(".").to_path_buf());
    fs::create_dir_all(&parent)?;

    let mut tmp = Builder::new().prefix(".rbxlx-build").tempfile_in(&parent)?;

    tmp.as_file_mut().write_all(contents.as_bytes())?;
    tmp.as_file_mut().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(path) {
            let perm = metadata.permissions().mode();
            let _ = fs::set_permissions(tmp.path(), fs::Permissions::from_mode(perm));
        }
    }

    tmp.persist(path).map(|_| ()).map_err(|err| err.error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Place.rbxlx");
        fs::write(&path, "old").unwrap();

        atomic_write(&path, "new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("build").join("out").join("Place.rbxlx");

        atomic_write(&path, "<roblox/>").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "<roblox/>");
    }

    #[test]
    fn leaves_no_temporary_files_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Place.rbxlx");

        atomic_write(&path, "content").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["Place.rbxlx".to_string()]);
    }
}
