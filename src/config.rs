use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::PipelineOptions;
use crate::storage::GatewayOptions;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:///nmbrs.db";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NmbrsDbConfig {
    pub database_url: Option<String>,
    /// JSON snapshot used as the provider for `create`
    pub snapshot: Option<String>,
    pub workers: Option<usize>,
    pub pool_size: Option<u32>,
    pub busy_timeout_ms: Option<u64>,
}

impl NmbrsDbConfig {
    /// Config written by `nmbrs-db init`
    pub fn starter() -> Self {
        Self {
            database_url: Some(DEFAULT_DATABASE_URL.to_string()),
            snapshot: Some("nmbrs-snapshot.json".to_string()),
            ..Self::default()
        }
    }

    pub fn database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        match self.workers {
            Some(workers) => PipelineOptions::with_workers(workers),
            None => PipelineOptions::default(),
        }
    }

    /// Gateway tuning; the pool always has room for every worker
    pub fn gateway_options(&self) -> GatewayOptions {
        let mut options = GatewayOptions::default();
        let workers = u32::try_from(self.pipeline_options().workers.get()).unwrap_or(u32::MAX);
        options.pool_size = self
            .pool_size
            .unwrap_or(options.pool_size)
            .max(workers.saturating_add(1));
        if let Some(ms) = self.busy_timeout_ms {
            options.busy_timeout = Duration::from_millis(ms);
        }
        options
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("nmbrs-db.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<NmbrsDbConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: NmbrsDbConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &NmbrsDbConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nmbrs-db.toml");

        write_config(&path, &NmbrsDbConfig::starter(), false).unwrap();
        assert!(write_config(&path, &NmbrsDbConfig::starter(), false).is_err());
        write_config(&path, &NmbrsDbConfig::starter(), true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database_url(), DEFAULT_DATABASE_URL);
        assert_eq!(loaded.snapshot.as_deref(), Some("nmbrs-snapshot.json"));
    }

    #[test]
    fn test_pool_never_smaller_than_workers() {
        let config: NmbrsDbConfig = toml::from_str(
            r#"
            workers = 8
            pool_size = 2
            busy_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline_options().workers.get(), 8);
        let options = config.gateway_options();
        assert_eq!(options.pool_size, 9);
        assert_eq!(options.busy_timeout, Duration::from_millis(250));
    }
}
