pub mod backup;
pub mod decide;
pub mod local;
pub mod reconcile;
pub mod retry;
pub mod store;
pub mod upload;
pub mod wipe;

pub use backup::{BackupJob, BackupReport};
pub use reconcile::Reconciler;
pub use store::{MetadataPolicy, RemoteStore, StoreError};
pub use wipe::Wiper;
