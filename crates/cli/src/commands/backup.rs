use anyhow::Result;
use clap::Args;
use console::style;
use tracing::error;

use s3backup_core::{BackupJob, Reconciler};

use crate::config::AppConfig;
use crate::progress;

#[derive(Args)]
pub struct BackupArgs {
    /// After the backup, delete remote objects with no local counterpart
    #[arg(long)]
    sync: bool,
}

pub async fn run(args: BackupArgs) -> Result<()> {
    let config = AppConfig::load()?;
    if config.backup_directories.is_empty() {
        anyhow::bail!("no backup directories configured; run `s3backup init` with --directory");
    }
    let store = config.open_store().await;

    let mut uploaded = 0u64;
    let mut skipped = 0u64;
    let mut failed_files = 0u64;
    let mut aborted = 0u64;

    // One job per directory, in configured order. An aborted directory is
    // reported and the remaining directories still run.
    for dir in &config.backup_directories {
        let spinner = progress::create_spinner(&format!("Backing up {}...", dir.display()));
        let job = BackupJob::new(store.clone(), config.policy.clone(), dir);
        match job.run().await {
            Ok(report) => {
                spinner.finish_with_message(format!(
                    "{}: {} uploaded, {} skipped, {} failed",
                    dir.display(),
                    report.uploaded,
                    report.skipped,
                    report.failures.len()
                ));
                for failure in &report.failures {
                    println!(
                        "  {} {}: {}",
                        style("failed").red(),
                        failure.path.display(),
                        failure.error
                    );
                }
                uploaded += report.uploaded;
                skipped += report.skipped;
                failed_files += report.failures.len() as u64;
            }
            Err(err) => {
                spinner.finish_with_message(format!("{}: aborted", dir.display()));
                error!(directory = %dir.display(), error = %format!("{err:#}"), "backup aborted");
                aborted += 1;
            }
        }
    }

    println!(
        "Backup complete: {} uploaded, {} skipped, {} failed, {} directories aborted.",
        uploaded, skipped, failed_files, aborted
    );

    if args.sync {
        let spinner = progress::create_spinner("Reconciling bucket against local files...");
        let report = Reconciler::new(store).run().await?;
        spinner.finish_with_message(format!(
            "Sync: {} scanned, {} deleted, {} failed",
            report.scanned,
            report.deleted.len(),
            report.failures.len()
        ));
    }

    if aborted > 0 || failed_files > 0 {
        anyhow::bail!("{aborted} directories aborted, {failed_files} files failed");
    }
    Ok(())
}
