//! One backup job per configured directory: walk the tree, query the
//! store for each file, decide by modification time, upload or skip.
//! Every decision re-queries the store; there is no local cache of remote
//! state, at the cost of one round trip per file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::decide::{self, Decision};
use crate::local::{self, LocalFile, WalkEntry};
use crate::retry;
use crate::store::{MetadataPolicy, RemoteStore};
use crate::upload::Uploader;

/// Per-file result of a backup decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Uploaded { bytes: u64 },
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BackupReport {
    pub uploaded: u64,
    pub skipped: u64,
    pub failures: Vec<FileFailure>,
}

impl BackupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn files_seen(&self) -> u64 {
        self.uploaded + self.skipped + self.failures.len() as u64
    }
}

pub struct BackupJob {
    store: Arc<dyn RemoteStore>,
    uploader: Uploader,
    root: PathBuf,
}

impl BackupJob {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        policy: MetadataPolicy,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            uploader: Uploader::new(store.clone(), policy),
            store,
            root: root.into(),
        }
    }

    /// Walk the directory and bring the bucket up to date with it.
    ///
    /// Per-file failures (unreadable entry, head error, upload error) are
    /// recorded in the report and the walk continues; one bad file never
    /// aborts the directory. `Err` means the traversal itself could not
    /// proceed and the job aborted.
    pub async fn run(&self) -> Result<BackupReport> {
        let entries = local::walk(&self.root)
            .with_context(|| format!("backup of {} aborted", self.root.display()))?;

        let mut report = BackupReport::default();
        for entry in entries {
            match entry {
                WalkEntry::Unreadable { path, error } => {
                    warn!(path = %path.display(), error, "unreadable entry, recording failure");
                    report.failures.push(FileFailure { path, error });
                }
                WalkEntry::File(file) => {
                    let Some(key) = local::key_for_path(&file.path) else {
                        // A lossy key could never be mapped back to the
                        // file, and sync would delete the object again.
                        let error = "file name is not valid UTF-8, refusing to upload".to_string();
                        warn!(path = %file.path.display(), "{error}");
                        report.failures.push(FileFailure {
                            path: file.path,
                            error,
                        });
                        continue;
                    };
                    match self.backup_file(&file, &key).await {
                        Outcome::Uploaded { bytes } => {
                            info!(key, bytes, "uploaded");
                            report.uploaded += 1;
                        }
                        Outcome::Skipped => {
                            debug!(key, "remote is same age or newer, skipping");
                            report.skipped += 1;
                        }
                        Outcome::Failed(error) => {
                            warn!(key, error, "file backup failed, continuing");
                            report.failures.push(FileFailure {
                                path: file.path,
                                error,
                            });
                        }
                    }
                }
            }
        }
        Ok(report)
    }

    /// Stat -> query -> decide -> upload or skip, for one file. A head
    /// error other than "not found" fails the file rather than uploading
    /// blind: treating an outage as upload-needed would mask it as normal
    /// operation.
    async fn backup_file(&self, file: &LocalFile, key: &str) -> Outcome {
        let store = &self.store;
        let remote = match retry::with_backoff(|| async move { store.head(key).await }).await {
            Ok(remote) => remote,
            Err(err) => return Outcome::Failed(err.to_string()),
        };

        match decide::decide(file.modified, remote) {
            Decision::Upload => match self.uploader.upload(&file.path, key).await {
                Ok(bytes) => Outcome::Uploaded { bytes },
                Err(err) => Outcome::Failed(format!("{err:#}")),
            },
            Decision::Skip => Outcome::Skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::Duration;

    fn job(store: &Arc<MemoryStore>, root: &std::path::Path) -> BackupJob {
        BackupJob::new(store.clone(), MetadataPolicy::default(), root)
    }

    fn key_of(path: &std::path::Path) -> String {
        local::key_for_path(&path.canonicalize().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn uploads_newer_and_missing_skips_current() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let c = dir.path().join("c.txt");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();
        std::fs::write(&c, b"c").unwrap();

        let store = Arc::new(MemoryStore::new());
        // a: remote one second older than local -> upload
        store.seed(&key_of(&a), local::stat(&a).unwrap() - Duration::seconds(1));
        // b: no remote counterpart -> upload
        // c: remote exactly as old as local -> skip
        store.seed(&key_of(&c), local::stat(&c).unwrap());

        let report = job(&store, dir.path()).run().await.unwrap();
        assert_eq!(report.uploaded, 2);
        assert_eq!(report.skipped, 1);
        assert!(report.is_clean());

        let put_keys: Vec<_> = store.puts().into_iter().map(|p| p.key).collect();
        assert_eq!(put_keys.len(), 2);
        assert!(put_keys.contains(&key_of(&a)));
        assert!(put_keys.contains(&key_of(&b)));
    }

    #[tokio::test]
    async fn second_run_against_unchanged_tree_uploads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("y.txt"), b"y").unwrap();

        let store = Arc::new(MemoryStore::new());
        let job = job(&store, dir.path());

        let first = job.run().await.unwrap();
        assert_eq!(first.uploaded, 2);

        let second = job.run().await.unwrap();
        assert_eq!(second.uploaded, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(store.puts().len(), 2);
    }

    #[tokio::test]
    async fn one_bad_file_does_not_stop_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.txt");
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(&bad, b"bad").unwrap();
        std::fs::write(dir.path().join("z.txt"), b"z").unwrap();

        let store = Arc::new(MemoryStore::new());
        store.poison_put(&key_of(&bad));

        let report = job(&store, dir.path()).run().await.unwrap();
        assert_eq!(report.uploaded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, bad.canonicalize().unwrap());
        assert_eq!(report.files_seen(), 3);
    }

    #[tokio::test]
    async fn head_failure_fails_the_file_without_uploading() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("f.txt");
        std::fs::write(&f, b"f").unwrap();

        let store = Arc::new(MemoryStore::new());
        store.fail_head(&key_of(&f));

        let report = job(&store, dir.path()).run().await.unwrap();
        assert_eq!(report.uploaded, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(store.puts().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_file_name_is_a_failure_not_an_upload() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join(OsString::from_vec(b"caf\xe9.txt".to_vec()));
        std::fs::write(&odd, b"x").unwrap();
        std::fs::write(dir.path().join("plain.txt"), b"y").unwrap();

        let store = Arc::new(MemoryStore::new());
        let report = job(&store, dir.path()).run().await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path.file_name(), odd.file_name());
        // Nothing was uploaded under a lossy key.
        assert!(store.keys().iter().all(|k| !k.contains('\u{fffd}')));
    }

    #[tokio::test]
    async fn missing_root_aborts_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let result = job(&store, &dir.path().join("absent")).run().await;
        assert!(result.is_err());
    }
}
