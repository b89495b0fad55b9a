use anyhow::Result;
use clap::Args;
use console::style;

use s3backup_core::Reconciler;

use crate::config::AppConfig;
use crate::progress;

#[derive(Args)]
pub struct SyncArgs;

pub async fn run(_args: SyncArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let store = config.open_store().await;

    let spinner = progress::create_spinner(&format!(
        "Reconciling bucket {} against local files...",
        config.aws.bucket
    ));
    let report = Reconciler::new(store).run().await?;
    spinner.finish_with_message("done");

    println!("Objects scanned: {}", report.scanned);
    println!("Objects deleted: {}", report.deleted.len());
    for key in &report.deleted {
        println!("  {} {}", style("deleted").yellow(), key);
    }
    if !report.failures.is_empty() {
        println!("Deletions failed ({}):", report.failures.len());
        for (key, error) in &report.failures {
            println!("  {} {}: {}", style("failed").red(), key, error);
        }
        anyhow::bail!("{} deletions failed", report.failures.len());
    }
    Ok(())
}
