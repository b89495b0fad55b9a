pub mod memory;
pub mod s3;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One page of keys out of a bucket listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    /// Continuation token for the next page; `None` when the listing is exhausted.
    pub next: Option<String>,
}

/// Per-object metadata applied uniformly to every upload in a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataPolicy {
    #[serde(default)]
    pub acl: Option<String>,
    #[serde(default)]
    pub content_disposition: Option<String>,
    #[serde(default)]
    pub server_side_encryption: Option<String>,
    #[serde(default)]
    pub storage_class: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Network-level or throttling failure; safe to retry.
    #[error("transient store failure during {op}: {message}")]
    Transient { op: &'static str, message: String },
    /// Anything else: bad credentials, missing bucket, rejected request.
    #[error("store failure during {op}: {message}")]
    Permanent { op: &'static str, message: String },
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient { .. })
    }

    pub fn permanent(op: &'static str, message: impl Into<String>) -> Self {
        StoreError::Permanent {
            op,
            message: message.into(),
        }
    }
}

/// Capability boundary over the object store. One production adapter
/// ([`s3::S3Store`]) and one in-memory double ([`memory::MemoryStore`])
/// implement it.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Last-modified time of the object, or `None` when the key does not
    /// exist. "Not found" is the only benign outcome; every other failure
    /// surfaces as a [`StoreError`].
    async fn head(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Create or overwrite the object in one atomic put carrying the full
    /// configured metadata policy.
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        policy: &MetadataPolicy,
    ) -> Result<(), StoreError>;

    /// Bounded page of keys, ordered as the store returns them.
    async fn list_page(&self, token: Option<&str>) -> Result<ObjectPage, StoreError>;

    /// Delete one object. Deleting an absent key is success.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Delete a batch of objects in one request where the store supports it.
    async fn delete_batch(&self, keys: &[String]) -> Result<(), StoreError>;
}
