//! Filesystem side of the reconciliation: directory traversal, per-file
//! stat, and the key <-> path mapping shared by upload and sync.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use walkdir::WalkDir;

/// A regular file seen during traversal.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

#[derive(Debug)]
pub enum WalkEntry {
    File(LocalFile),
    /// An entry below the root that could not be read. The walk continues;
    /// the backup job records this as a per-file failure.
    Unreadable { path: PathBuf, error: String },
}

/// Upload key for a traversed path: the absolute path with the leading
/// separator stripped, since S3 keys do not start with `/`.
///
/// Returns `None` for paths that are not valid UTF-8. Object keys are
/// UTF-8 strings, so a lossy conversion would upload under a key that
/// [`path_for_key`] can never map back to the real file, and the next
/// sync would delete the object it just backed up. Such files are
/// refused instead and recorded as per-file failures.
pub fn key_for_path(path: &Path) -> Option<String> {
    path.to_str().map(|s| s.trim_start_matches('/').to_string())
}

/// Inverse of [`key_for_path`]: re-root the key at the filesystem root.
pub fn path_for_key(key: &str) -> PathBuf {
    Path::new("/").join(key)
}

pub fn stat(path: &Path) -> Result<DateTime<Utc>> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("cannot stat {}", path.display()))?;
    let modified = metadata
        .modified()
        .with_context(|| format!("no modification time for {}", path.display()))?;
    Ok(modified.into())
}

/// One full traversal of `root`, fresh state per call. Every regular file
/// under the root is visited exactly once, in lexicographic entry order.
/// An unreadable root aborts; anything unreadable below it is reported as
/// a [`WalkEntry::Unreadable`] and the walk continues.
pub fn walk(root: &Path) -> Result<Vec<WalkEntry>> {
    let root = root
        .canonicalize()
        .with_context(|| format!("cannot read backup root {}", root.display()))?;
    anyhow::ensure!(
        root.is_dir(),
        "backup root {} is not a directory",
        root.display()
    );

    let mut entries = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    continue;
                }
                match stat(entry.path()) {
                    Ok(modified) => entries.push(WalkEntry::File(LocalFile {
                        path: entry.path().to_path_buf(),
                        modified,
                    })),
                    Err(err) => entries.push(WalkEntry::Unreadable {
                        path: entry.path().to_path_buf(),
                        error: err.to_string(),
                    }),
                }
            }
            Err(err) => {
                if err.depth() == 0 {
                    return Err(err).with_context(|| {
                        format!("cannot walk backup root {}", root.display())
                    });
                }
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.clone());
                entries.push(WalkEntry::Unreadable {
                    path,
                    error: err.to_string(),
                });
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_visits_every_regular_file_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), b"b").unwrap();

        let entries = walk(dir.path()).unwrap();
        let mut names: Vec<String> = entries
            .iter()
            .map(|e| match e {
                WalkEntry::File(f) => f.path.file_name().unwrap().to_string_lossy().into_owned(),
                WalkEntry::Unreadable { path, .. } => panic!("unreadable: {}", path.display()),
            })
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn walk_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        assert!(walk(&gone).is_err());
    }

    #[test]
    fn key_mapping_round_trips() {
        let path = Path::new("/var/backups/a.txt");
        let key = key_for_path(path).unwrap();
        assert_eq!(key, "var/backups/a.txt");
        assert_eq!(path_for_key(&key), path);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_get_no_key() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let name = OsString::from_vec(b"caf\xe9.txt".to_vec());
        let path = Path::new("/var/backups").join(name);
        assert_eq!(key_for_path(&path), None);
    }

    #[test]
    fn stat_reports_a_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"x").unwrap();
        let modified = stat(&file).unwrap();
        assert!(modified > chrono::DateTime::UNIX_EPOCH);
    }
}
