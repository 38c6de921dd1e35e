//! Filesystem scans used by the resolver.
//!
//! Walks do not follow symlinked directories. Results are sorted so the
//! outcome does not depend on directory iteration order.

use std::fs;
use std::path::{Path, PathBuf};

use cp_common::{Error, Result};
use tracing::{debug, trace};

use crate::catalog::CHECKPOINT_FILENAME;
use crate::resolved::CheckpointSet;

/// Find every checkpoint file at any depth under `dir`.
///
/// A missing directory and a directory with no checkpoints both yield
/// [`Error::NoCheckpointsFound`].
pub fn find_checkpoints(dir: &Path) -> Result<CheckpointSet> {
    let mut found = Vec::new();
    walk_files(dir, &mut |path| {
        if path.file_name().is_some_and(|name| name == CHECKPOINT_FILENAME) {
            found.push(path.to_path_buf());
        }
    })?;

    if found.is_empty() {
        return Err(Error::NoCheckpointsFound {
            dir: dir.to_path_buf(),
        });
    }

    found.sort();
    debug!(dir = %dir.display(), count = found.len(), "discovered checkpoints");
    Ok(CheckpointSet::new(found))
}

/// Pick the file used to probe the schema of a chunked dataset.
///
/// Returns the lexicographically first file path in the tree.
pub fn first_data_file(dir: &Path) -> Result<PathBuf> {
    let mut first: Option<PathBuf> = None;
    walk_files(dir, &mut |path| {
        if first.as_deref().is_none_or(|current| path < current) {
            first = Some(path.to_path_buf());
        }
    })?;

    first.ok_or_else(|| Error::EmptyDataDirectory {
        path: dir.to_path_buf(),
    })
}

/// Call `visit` for every regular file under `dir`, recursively.
///
/// Symlinks to files are visited; symlinks to directories and dangling
/// links are skipped.
fn walk_files(dir: &Path, visit: &mut dyn FnMut(&Path)) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;

        let is_file = if file_type.is_dir() {
            walk_files(&path, visit)?;
            false
        } else if file_type.is_symlink() {
            fs::metadata(&path).is_ok_and(|meta| meta.is_file())
        } else {
            file_type.is_file()
        };

        if is_file {
            trace!(path = %path.display(), "visit");
            visit(&path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_finds_nested_checkpoints_sorted() {
        let tmp = TempDir::new().unwrap();
        let b = touch(tmp.path(), "fold_1/model_0/model.pt");
        let a = touch(tmp.path(), "fold_0/model_0/model.pt");
        touch(tmp.path(), "fold_0/model_0/args.json");
        touch(tmp.path(), "fold_0/model.pth");

        let set = find_checkpoints(tmp.path()).unwrap();
        assert_eq!(set.paths(), &[a, b]);
    }

    #[test]
    fn test_no_checkpoints_is_an_error() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "notes.txt");
        let err = find_checkpoints(tmp.path()).unwrap_err();
        assert_eq!(err.code(), 31);
    }

    #[test]
    fn test_missing_checkpoint_dir_is_no_checkpoints() {
        let tmp = TempDir::new().unwrap();
        let err = find_checkpoints(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::NoCheckpointsFound { .. }));
    }

    #[test]
    fn test_first_data_file() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.csv");
        let a = touch(tmp.path(), "a.csv");
        assert_eq!(first_data_file(tmp.path()).unwrap(), a);
    }

    #[test]
    fn test_first_data_file_empty_tree() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("empty/nested")).unwrap();
        let err = first_data_file(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::EmptyDataDirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_first_data_file_skips_linked_directories() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("zz_real");
        touch(&real, "inner.csv");
        let chunks = tmp.path().join("chunks");
        fs::create_dir(&chunks).unwrap();
        std::os::unix::fs::symlink(&real, chunks.join("a_link")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone.csv"), chunks.join("a_dangling")).unwrap();
        let b = touch(&chunks, "b.csv");

        let probe = first_data_file(&chunks).unwrap();
        assert_eq!(probe, b);
        assert!(probe.is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_linked_file_is_visited() {
        let tmp = TempDir::new().unwrap();
        let target = touch(tmp.path(), "store/model.pt");
        let ckpts = tmp.path().join("ckpts");
        fs::create_dir(&ckpts).unwrap();
        std::os::unix::fs::symlink(&target, ckpts.join("model.pt")).unwrap();

        let set = find_checkpoints(&ckpts).unwrap();
        assert_eq!(set.paths(), &[ckpts.join("model.pt")]);
    }
}
