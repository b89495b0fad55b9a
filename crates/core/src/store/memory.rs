//! In-memory implementation of [`RemoteStore`] used by the engine tests.
//! Failures are programmable per key so every error path of the backup,
//! reconcile and wipe loops can be exercised without a live bucket.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{MetadataPolicy, ObjectPage, RemoteStore, StoreError};

/// One recorded call to `put`, in call order.
#[derive(Debug, Clone)]
pub struct PutRecord {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub policy: MetadataPolicy,
}

#[derive(Default)]
struct Inner {
    /// Key -> last-modified time; contents live in the put log.
    objects: BTreeMap<String, DateTime<Utc>>,
    puts: Vec<PutRecord>,
    transient_put_failures: HashMap<String, u32>,
    poisoned_puts: HashSet<String>,
    poisoned_deletes: HashSet<String>,
    failing_heads: HashSet<String>,
    fail_listing: bool,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            page_size,
        }
    }

    /// Seed an object with a fixed last-modified time.
    pub fn seed(&self, key: &str, modified: DateTime<Utc>) {
        self.inner
            .lock()
            .unwrap()
            .objects
            .insert(key.to_string(), modified);
    }

    /// Make the next `times` puts of `key` fail with a transient error.
    pub fn fail_puts_transiently(&self, key: &str, times: u32) {
        self.inner
            .lock()
            .unwrap()
            .transient_put_failures
            .insert(key.to_string(), times);
    }

    /// Make every put of `key` fail with a permanent error.
    pub fn poison_put(&self, key: &str) {
        self.inner
            .lock()
            .unwrap()
            .poisoned_puts
            .insert(key.to_string());
    }

    /// Make every delete touching `key` fail with a permanent error.
    pub fn poison_delete(&self, key: &str) {
        self.inner
            .lock()
            .unwrap()
            .poisoned_deletes
            .insert(key.to_string());
    }

    /// Make every head of `key` fail with a permanent error.
    pub fn fail_head(&self, key: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_heads
            .insert(key.to_string());
    }

    /// Make every listing call fail, as if the bucket did not exist.
    pub fn fail_listing(&self) {
        self.inner.lock().unwrap().fail_listing = true;
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().objects.keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().unwrap().objects.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.inner.lock().unwrap().puts.clone()
    }
}

#[async_trait::async_trait]
impl RemoteStore for MemoryStore {
    async fn head(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing_heads.contains(key) {
            return Err(StoreError::permanent("head", format!("injected: {key}")));
        }
        Ok(inner.objects.get(key).copied())
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        policy: &MetadataPolicy,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(remaining) = inner.transient_put_failures.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Transient {
                    op: "put",
                    message: format!("injected: {key}"),
                });
            }
        }
        if inner.poisoned_puts.contains(key) {
            return Err(StoreError::permanent("put", format!("injected: {key}")));
        }
        inner.puts.push(PutRecord {
            key: key.to_string(),
            body,
            content_type: content_type.to_string(),
            policy: policy.clone(),
        });
        inner.objects.insert(key.to_string(), Utc::now());
        Ok(())
    }

    async fn list_page(&self, token: Option<&str>) -> Result<ObjectPage, StoreError> {
        use std::ops::Bound::{Excluded, Unbounded};

        let inner = self.inner.lock().unwrap();
        if inner.fail_listing {
            return Err(StoreError::permanent("list", "injected: no such bucket"));
        }
        // The token is the last key of the previous page, like S3's
        // start-after semantics: keys deleted behind the cursor do not
        // shift the keys still ahead of it.
        let keys: Vec<String> = match token {
            None => inner.objects.keys().take(self.page_size).cloned().collect(),
            Some(last) => inner
                .objects
                .range::<String, _>((Excluded(last.to_string()), Unbounded))
                .map(|(k, _)| k.clone())
                .take(self.page_size)
                .collect(),
        };
        let next = keys.last().filter(|_| keys.len() == self.page_size).and_then(|last| {
            inner
                .objects
                .range::<String, _>((Excluded(last.clone()), Unbounded))
                .next()
                .map(|_| last.clone())
        });
        Ok(ObjectPage { keys, next })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.poisoned_deletes.contains(key) {
            return Err(StoreError::permanent("delete", format!("injected: {key}")));
        }
        // Absent keys delete successfully, matching S3.
        inner.objects.remove(key);
        Ok(())
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(bad) = keys.iter().find(|k| inner.poisoned_deletes.contains(*k)) {
            return Err(StoreError::permanent(
                "delete_batch",
                format!("injected: {bad}"),
            ));
        }
        for key in keys {
            inner.objects.remove(key);
        }
        Ok(())
    }
}
