//! Reconciliation: delete remote objects that have no local counterpart.
//!
//! The scan covers the whole bucket, not just the configured backup
//! directories. Any object in the bucket, however it got there, is a
//! deletion candidate when no matching local path exists. That scope is
//! deliberate (it matches the tool's historical behavior) and makes this
//! a destructive pass; do not point it at a bucket shared with anything
//! else.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::local;
use crate::store::RemoteStore;

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub scanned: u64,
    pub deleted: Vec<String>,
    /// Keys whose deletion failed; reconciliation is best-effort per key.
    pub failures: Vec<(String, String)>,
}

pub struct Reconciler {
    store: Arc<dyn RemoteStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Page through the bucket and delete every key whose local path does
    /// not exist. A failed delete is recorded and the pass continues; a
    /// failed listing aborts the whole reconciliation with nothing
    /// further deleted.
    pub async fn run(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .store
                .list_page(token.as_deref())
                .await
                .context("listing bucket for reconciliation")?;

            for key in page.keys {
                report.scanned += 1;
                let path = local::path_for_key(&key);
                // Only a definite "not there" may trigger deletion. A stat
                // failure (permission denied, a file where a directory was
                // expected) says nothing about the file, and deleting on it
                // would turn an IO error into data loss.
                match path.try_exists() {
                    Ok(true) => continue,
                    Ok(false) => {}
                    Err(err) => {
                        warn!(key, error = %err, "cannot probe local path, keeping remote object");
                        report
                            .failures
                            .push((key, format!("cannot probe {}: {err}", path.display())));
                        continue;
                    }
                }
                info!(key, "no local counterpart, removing remote object");
                match self.store.delete(&key).await {
                    Ok(()) => report.deleted.push(key),
                    Err(err) => {
                        warn!(key, error = %err, "delete failed, continuing");
                        report.failures.push((key, err.to_string()));
                    }
                }
            }

            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(report)
    }
}
