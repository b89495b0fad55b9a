use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use s3backup_core::MetadataPolicy;

use crate::config::{AppConfig, AwsConfig};

#[derive(Args)]
pub struct InitArgs {
    /// AWS region, e.g. us-east-1
    #[arg(long)]
    region: String,

    /// Custom endpoint URL for S3-compatible stores
    #[arg(long)]
    endpoint: Option<String>,

    /// Bucket name
    #[arg(long)]
    bucket: String,

    /// Access key id
    #[arg(long)]
    access_key: String,

    /// Secret access key
    #[arg(long)]
    secret_key: String,

    /// Directory to back up; repeat for multiple directories
    #[arg(long = "directory")]
    directories: Vec<PathBuf>,

    /// Canned ACL applied to every upload, e.g. private
    #[arg(long)]
    acl: Option<String>,

    /// Content-Disposition applied to every upload
    #[arg(long)]
    content_disposition: Option<String>,

    /// Server-side encryption algorithm, e.g. AES256
    #[arg(long)]
    server_side_encryption: Option<String>,

    /// Storage class, e.g. STANDARD_IA
    #[arg(long)]
    storage_class: Option<String>,
}

pub async fn run(args: InitArgs) -> Result<()> {
    let config = AppConfig {
        aws: AwsConfig {
            region: args.region,
            endpoint: args.endpoint,
            bucket: args.bucket,
            access_key: args.access_key,
            secret_key: args.secret_key,
        },
        backup_directories: args.directories,
        policy: MetadataPolicy {
            acl: args.acl,
            content_disposition: args.content_disposition,
            server_side_encryption: args.server_side_encryption,
            storage_class: args.storage_class,
        },
    };
    config.validate()?;
    config.save()?;

    println!("Config written: {}", AppConfig::config_path().display());
    if config.backup_directories.is_empty() {
        println!("No backup directories configured yet; add them with --directory.");
    }
    Ok(())
}
