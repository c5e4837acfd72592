//! Per-file atomic writes.

use std::io::Write;
use std::path::Path;

use crate::error::{StoreError, StoreResult, io_err};

/// Stored files are bind-mounted into containers that may not run as root.
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Write `contents` to `dir/file_name` through a temporary file in the same
/// directory and a rename, so readers see either the old or the new content.
///
/// Temporary files start with `.tmp` and never contain a kind separator, so
/// a leftover from a crash is ignored by directory scans.
pub(crate) fn write_atomic(dir: &Path, file_name: &str, contents: &[u8]) -> StoreResult<()> {
    let target = dir.join(file_name);
    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err!("unable to create temporary file for {}", target.display()))?;

    tmp.write_all(contents)
        .map_err(io_err!("unable to write {}", target.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(FILE_MODE))
            .map_err(io_err!("unable to set permissions on {}", target.display()))?;
    }

    tmp.as_file()
        .sync_all()
        .map_err(io_err!("unable to sync {}", target.display()))?;

    tmp.persist(&target).map_err(|e| StoreError::Io {
        context: format!("unable to move file into place at {}", target.display()),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        write_atomic(dir.path(), "f", b"one").unwrap();
        write_atomic(dir.path(), "f", b"two").unwrap();
        assert_eq!(std::fs::read(dir.path().join("f")).unwrap(), b"two");

        // No temporary files left behind.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("f")]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = write_atomic(&missing, "f", b"x").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        write_atomic(dir.path(), "f", b"x").unwrap();
        let mode = std::fs::metadata(dir.path().join("f")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
