use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use s3backup_core::store::s3::S3Store;
use s3backup_core::{MetadataPolicy, RemoteStore};

const CONFIG_FILE: &str = "s3backup.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub aws: AwsConfig,
    /// Directories to back up, in order, each an independent job.
    #[serde(default)]
    pub backup_directories: Vec<PathBuf>,
    /// Metadata applied to every uploaded object.
    #[serde(default)]
    pub policy: MetadataPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    /// Custom endpoint for S3-compatible stores; path-style addressing.
    #[serde(default)]
    pub endpoint: Option<String>,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("s3backup")
            .join(CONFIG_FILE)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("config not found at {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Duplicate or nested backup directories would traverse the same
    /// files twice and write the same keys twice; that is a configuration
    /// conflict, not something to resolve silently.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.aws.bucket.is_empty(), "bucket name is empty");
        anyhow::ensure!(!self.aws.region.is_empty(), "region is empty");

        let mut resolved: Vec<(PathBuf, &PathBuf)> = Vec::new();
        for dir in &self.backup_directories {
            let path = dir.canonicalize().unwrap_or_else(|_| dir.clone());
            for (seen, original) in &resolved {
                if path.starts_with(seen) || seen.starts_with(&path) {
                    anyhow::bail!(
                        "backup directories {} and {} overlap: the same upload keys \
                         would be written twice",
                        original.display(),
                        dir.display()
                    );
                }
            }
            resolved.push((path, dir));
        }
        Ok(())
    }

    pub async fn open_store(&self) -> Arc<dyn RemoteStore> {
        Arc::new(
            S3Store::new(
                &self.aws.bucket,
                &self.aws.region,
                self.aws.endpoint.as_deref(),
                &self.aws.access_key,
                &self.aws.secret_key,
            )
            .await,
        )
    }
}
