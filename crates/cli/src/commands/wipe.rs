use anyhow::{Context, Result};
use clap::Args;
use dialoguer::Confirm;

use s3backup_core::Wiper;

use crate::config::AppConfig;
use crate::progress;

#[derive(Args)]
pub struct WipeArgs {
    /// Skip the confirmation prompt. Caution: the wipe is irreversible.
    #[arg(long)]
    force: bool,
}

pub async fn run(args: WipeArgs) -> Result<()> {
    let config = AppConfig::load()?;

    if !args.force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "This will delete EVERY object in bucket {} ({}). Continue?",
                config.aws.bucket, config.aws.region
            ))
            .default(false)
            .interact()
            .context("confirmation prompt failed")?;
        if !confirmed {
            println!("Wipe cancelled.");
            return Ok(());
        }
    }

    let store = config.open_store().await;
    let spinner = progress::create_spinner(&format!("Wiping bucket {}...", config.aws.bucket));
    let deleted = Wiper::new(store)
        .run()
        .await
        .with_context(|| format!("wipe of bucket {} failed", config.aws.bucket))?;
    spinner.finish_with_message(format!("Bucket {} wiped ({deleted} objects).", config.aws.bucket));
    Ok(())
}
