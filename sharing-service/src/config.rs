use serde::Deserialize;
use std::fs;

use crate::ingest::DEFAULT_METER_CHUNK_SIZE;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Per-statement payload bound for the per-meter upsert, not a
    /// concurrency knob.
    #[serde(default = "default_meter_chunk_size")]
    pub meter_chunk_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            meter_chunk_size: default_meter_chunk_size(),
        }
    }
}

fn default_meter_chunk_size() -> usize {
    DEFAULT_METER_CHUNK_SIZE
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("SHARING_CONFIG").unwrap_or_else(|_| "sharing-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        let cfg: AppConfig = toml::from_str(&contents)?;
        Ok(cfg)
    }
}
