//! Unconditional bucket wipe: list, batch-delete, repeat until empty.
//! Irreversible; the confirmation prompt lives at the CLI boundary.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::store::RemoteStore;

pub struct Wiper {
    store: Arc<dyn RemoteStore>,
}

impl Wiper {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Delete every object in the bucket, in listing-page batches, with no
    /// filtering by age, key or local presence. Returns the number of
    /// objects deleted. Any listing or batch-delete failure is fatal to
    /// the run and carries the underlying store error for the operator.
    pub async fn run(&self) -> Result<u64> {
        let mut deleted: u64 = 0;
        loop {
            // Re-list from the start each round: the previous page was
            // just deleted, so a continuation token would be stale.
            let page = self
                .store
                .list_page(None)
                .await
                .context("listing bucket for wipe")?;
            if page.keys.is_empty() {
                break;
            }

            let batch = page.keys.len() as u64;
            self.store
                .delete_batch(&page.keys)
                .await
                .context("batch delete failed while wiping bucket")?;
            deleted += batch;
            info!(batch, deleted, "wiped a batch of objects");

            if page.next.is_none() {
                break;
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::Utc;

    #[tokio::test]
    async fn wipe_empties_the_bucket() {
        let store = Arc::new(MemoryStore::with_page_size(2));
        for key in ["a", "b", "c", "d", "e"] {
            store.seed(key, Utc::now());
        }

        let deleted = Wiper::new(store.clone()).run().await.unwrap();
        assert_eq!(deleted, 5);
        assert!(store.is_empty());

        // A subsequent listing returns zero objects.
        let page = store.list_page(None).await.unwrap();
        assert!(page.keys.is_empty());
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn wiping_an_empty_bucket_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        assert_eq!(Wiper::new(store).run().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn batch_delete_failure_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        store.seed("a", Utc::now());
        store.seed("b", Utc::now());
        store.poison_delete("b");

        let result = Wiper::new(store.clone()).run().await;
        assert!(result.is_err());
        // The poisoned batch fails as a unit.
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn listing_failure_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        store.fail_listing();
        assert!(Wiper::new(store).run().await.is_err());
    }
}
