use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::err::{CResult, CdcError};

fn day_file_io(path: &Path, source: std::io::Error) -> CdcError {
    CdcError::DayFileIo {
        path: path.to_path_buf(),
        source,
    }
}

/// Write-temp-then-rename, the atomic replace discipline day files rely on.
///
/// `write` receives a freshly created sibling temp file and fills it in;
/// once it returns successfully the temp file is fsync'd and renamed over
/// `target`. If `write` fails, or the fsync/rename fails, the temp file is
/// removed and `target` is left untouched.
pub fn atomic_replace<F>(target: &Path, write: F) -> CResult<()>
where
    F: FnOnce(&mut File) -> CResult<()>,
{
    let tmp_path = sibling_tmp_path(target);
    let mut tmp_file = File::create(&tmp_path).map_err(|e| day_file_io(&tmp_path, e))?;

    let result = write(&mut tmp_file).and_then(|_| {
        tmp_file.sync_all().map_err(|e| day_file_io(&tmp_path, e))?;
        drop(tmp_file);
        fs::rename(&tmp_path, target).map_err(|e| day_file_io(target, e))?;
        Ok(())
    });

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    result
}

/// Removes `path` if it exists; a missing file is not an error.
pub fn remove_if_exists(path: &Path) -> CResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(day_file_io(path, e)),
    }
}

fn sibling_tmp_path(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{file_name}.tmp"))
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    #[test]
    fn atomic_replace_leaves_the_old_file_untouched_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("2025-01-02.parquet");
        fs::write(&target, b"old").unwrap();

        let result = atomic_replace(&target, |_f| {
            Err(crate::err::CdcError::Other("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert!(!sibling_tmp_path(&target).exists());
    }

    #[test]
    fn atomic_replace_swaps_in_the_new_content_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("2025-01-02.parquet");
        fs::write(&target, b"old").unwrap();

        atomic_replace(&target, |f| {
            f.write_all(b"new")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(!sibling_tmp_path(&target).exists());
    }

    #[test]
    fn remove_if_exists_is_not_an_error_for_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.parquet");
        remove_if_exists(&missing).unwrap();
    }

    #[test]
    fn a_failed_create_names_the_offending_path_in_the_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        // A target under a directory that does not exist makes File::create fail.
        let missing_subdir = dir.path().join("missing-subdir");
        let target = missing_subdir.join("2025-01-02.parquet");

        let result = atomic_replace(&target, |f| {
            f.write_all(b"new")?;
            Ok(())
        });

        match result.unwrap_err() {
            CdcError::DayFileIo { path, .. } => assert_eq!(path.parent(), Some(missing_subdir.as_path())),
            other => panic!("expected DayFileIo, got {other:?}"),
        }
    }
}
