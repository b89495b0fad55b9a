//! Single-file upload: whole-file read, content-type sniffing from the
//! leading bytes, one put carrying the configured metadata policy.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::retry;
use crate::store::{MetadataPolicy, RemoteStore};

/// How many leading bytes the sniffer looks at.
const SNIFF_LEN: usize = 512;

pub struct Uploader {
    store: Arc<dyn RemoteStore>,
    policy: MetadataPolicy,
}

impl Uploader {
    pub fn new(store: Arc<dyn RemoteStore>, policy: MetadataPolicy) -> Self {
        Self { store, policy }
    }

    /// Upload one file under `key`. The whole file is read into memory
    /// first; streaming very large files is out of scope for this tool.
    /// Transient put failures are retried with backoff, anything else
    /// propagates to the caller.
    pub async fn upload(&self, path: &Path, key: &str) -> Result<u64> {
        let body = tokio::fs::read(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        let size = body.len() as u64;
        let content_type = sniff_content_type(&body);

        let store = &self.store;
        let policy = &self.policy;
        retry::with_backoff(|| {
            let body = body.clone();
            async move { store.put(key, body, content_type, policy).await }
        })
        .await
        .with_context(|| format!("uploading {}", path.display()))?;
        Ok(size)
    }
}

/// Content type from the file's leading bytes; the extension is ignored.
/// Unknown binary content falls back to `application/octet-stream`,
/// valid UTF-8 to plain text.
pub fn sniff_content_type(body: &[u8]) -> &'static str {
    let head = &body[..body.len().min(SNIFF_LEN)];
    if let Some(kind) = infer::get(head) {
        return kind.mime_type();
    }
    if std::str::from_utf8(head).is_ok() {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}
