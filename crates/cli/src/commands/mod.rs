pub mod backup;
pub mod init;
pub mod sync;
pub mod wipe;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Write the configuration file
    Init(init::InitArgs),
    /// Back up every configured directory
    Backup(backup::BackupArgs),
    /// Delete remote objects that no longer exist locally
    Sync(sync::SyncArgs),
    /// Delete every object in the bucket
    Wipe(wipe::WipeArgs),
}
