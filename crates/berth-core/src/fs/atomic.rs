//! Atomic whole-file replacement.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Replace `path` with `contents` without exposing a partial file.
///
/// The contents go to a temporary sibling in the same directory; mode bits
/// are applied and the data is synced to disk before the temporary is renamed
/// over `path`. A failure before the rename leaves the old file (or no file)
/// untouched, possibly alongside an orphaned temporary; a failure after the
/// rename cannot happen, since the rename is atomic on the same filesystem.
pub fn replace_file(path: &Path, contents: &str, mode: Option<u32>) -> Result<()> {
    let dir = path.parent().ok_or_else(|| Error::Filesystem {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "target path has no parent directory",
        ),
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(Error::fs(dir))?;
    tmp.write_all(contents.as_bytes()).map_err(Error::fs(path))?;
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))
            .map_err(Error::fs(path))?;
    }
    tmp.as_file().sync_all().map_err(Error::fs(path))?;
    tmp.persist(path).map_err(|err| Error::Filesystem {
        path: path.to_path_buf(),
        source: err.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    #[test]
    fn creates_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run");

        replace_file(&path, "#!/bin/sh\n", None).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "#!/bin/sh\n");
    }

    #[test]
    fn replaces_existing_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run");
        fs::write(&path, "old contents").unwrap();

        replace_file(&path, "new contents", None).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new contents");
    }

    #[test]
    fn applies_mode_bits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run");

        replace_file(&path, "#!/bin/sh\n", Some(0o755)).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn the_target_path_only_ever_holds_a_complete_generation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run");
        fs::write(&path, "generation-1").unwrap();

        replace_file(&path, "generation-2", None).unwrap();

        // the temporary never carried the target's name, so no read of
        // `path` could have observed a prefix of the new contents
        assert_eq!(fs::read_to_string(&path).unwrap(), "generation-2");
    }

    #[test]
    fn missing_parent_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("run");

        let err = replace_file(&path, "contents", None).unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }));
    }
}
