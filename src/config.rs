//! Application Configuration
//!
//! Loaded once at startup from an optional JSON file; every field has a default, so an empty
//! object (or no file at all) yields the stock single-process deployment.

use crate::error::ConfigError;
use crate::executor::types::PoolSettings;

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub log_filter: String,
    pub topics: TopicConfig,
    pub ingestion: IngestionConfig,
    pub deid: DeidConfig,
    pub indexer: IndexerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub ingestion_events: String,
    pub deid_jobs: String,
    pub partitions: u32,
}

/// A `consumer` object in the file must name its group; the service default only applies when
/// the whole object is omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub group_id: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_redelivery_backoff_ms")]
    pub redelivery_backoff_ms: u64,
}

fn default_concurrency() -> usize {
    1
}

fn default_redelivery_backoff_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub cpu_pool: PoolSettings,
    pub io_pool: PoolSettings,
    pub persist_latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeidConfig {
    pub cpu_pool: PoolSettings,
    pub io_pool: PoolSettings,
    pub consumer: ConsumerConfig,
    pub mask_latency_ms: u64,
    pub raw_location_prefix: String,
    pub output_location_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub io_pool: PoolSettings,
    pub consumer: ConsumerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_filter: "info".to_string(),
            topics: TopicConfig::default(),
            ingestion: IngestionConfig::default(),
            deid: DeidConfig::default(),
            indexer: IndexerConfig::default(),
        }
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            ingestion_events: "clinical.ingestion.events".to_string(),
            deid_jobs: "clinical.deid.jobs".to_string(),
            partitions: 12,
        }
    }
}

impl ConsumerConfig {
    fn with_group(group_id: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            concurrency: default_concurrency(),
            redelivery_backoff_ms: default_redelivery_backoff_ms(),
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.redelivery_backoff_ms)
    }

    fn validate(&self, label: &str) -> Result<(), ConfigError> {
        if self.group_id.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{}: group_id must not be blank",
                label
            )));
        }
        Ok(())
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            cpu_pool: PoolSettings::new(4, 4, 100),
            io_pool: PoolSettings::new(4, 8, 200),
            persist_latency_ms: 50,
        }
    }
}

impl Default for DeidConfig {
    fn default() -> Self {
        Self {
            cpu_pool: PoolSettings::new(4, 4, 200),
            io_pool: PoolSettings::new(6, 12, 400),
            consumer: ConsumerConfig::with_group("deid-service"),
            mask_latency_ms: 100,
            raw_location_prefix: "s3://raw".to_string(),
            output_location_prefix: "s3://deid".to_string(),
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            io_pool: PoolSettings::new(2, 4, 100),
            consumer: ConsumerConfig::with_group("research-service"),
        }
    }
}

impl AppConfig {
    /// Reads `path` when given, otherwise returns the defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => AppConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let topics = &self.topics;
        if topics.ingestion_events.trim().is_empty() || topics.deid_jobs.trim().is_empty() {
            return Err(ConfigError::Invalid("topic names must not be blank".to_string()));
        }
        if topics.ingestion_events == topics.deid_jobs {
            return Err(ConfigError::Invalid(format!(
                "ingestion and deid topics must differ (both `{}`)",
                topics.ingestion_events
            )));
        }
        if topics.partitions == 0 {
            return Err(ConfigError::Invalid(
                "topics.partitions must be at least 1".to_string(),
            ));
        }

        self.ingestion.cpu_pool.validate("ingestion.cpu_pool")?;
        self.ingestion.io_pool.validate("ingestion.io_pool")?;
        self.deid.cpu_pool.validate("deid.cpu_pool")?;
        self.deid.io_pool.validate("deid.io_pool")?;
        self.indexer.io_pool.validate("indexer.io_pool")?;

        self.deid.consumer.validate("deid.consumer")?;
        self.indexer.consumer.validate("indexer.consumer")?;
        if self.deid.consumer.group_id == self.indexer.consumer.group_id {
            tracing::warn!(
                group = %self.deid.consumer.group_id,
                "deid and indexer share a consumer group id"
            );
        }

        if self.deid.raw_location_prefix.trim().is_empty()
            || self.deid.output_location_prefix.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "deid location prefixes must not be blank".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::load(None).unwrap();

        assert_eq!(config.topics.partitions, 12);
        assert_eq!(config.deid.consumer.group_id, "deid-service");
        assert_eq!(config.indexer.consumer.group_id, "research-service");
        assert_eq!(config.deid.consumer.backoff(), Duration::from_secs(1));
        assert_eq!(config.deid.io_pool, PoolSettings::new(6, 12, 400));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bind": "0.0.0.0:9000", "deid": {{"consumer": {{"group_id": "deid-b", "concurrency": 4}}}}}}"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.deid.consumer.group_id, "deid-b");
        assert_eq!(config.deid.consumer.concurrency, 4);
        assert_eq!(config.deid.consumer.redelivery_backoff_ms, 1_000);
        assert_eq!(config.deid.mask_latency_ms, 100);
        assert_eq!(config.topics.deid_jobs, "clinical.deid.jobs");
    }

    #[test]
    fn test_consumer_without_group_id_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"indexer": {{"consumer": {{"concurrency": 2}}}}}}"#).unwrap();

        let result = AppConfig::load(Some(file.path()));

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_omitted_consumer_keeps_service_group() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"indexer": {{"io_pool": {{"core_workers": 3, "max_workers": 3}}}}}}"#)
            .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.indexer.consumer.group_id, "research-service");
        assert_eq!(config.deid.consumer.group_id, "deid-service");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load(Some(&dir.path().join("absent.json")));

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let result = AppConfig::load(Some(file.path()));

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validation_rejections() {
        let mut config = AppConfig::default();
        config.topics.deid_jobs = config.topics.ingestion_events.clone();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.topics.partitions = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.indexer.consumer.group_id = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.deid.io_pool.max_workers = 1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.deid.raw_location_prefix = String::new();
        assert!(config.validate().is_err());
    }
}
