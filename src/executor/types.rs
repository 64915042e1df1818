use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What a pool is sized for. Every job on a CPU pool runs on the blocking thread pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Cpu,
    Io,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKind::Cpu => f.write_str("cpu"),
            PoolKind::Io => f.write_str("io"),
        }
    }
}

/// Bounded pool sizing.
///
/// `core_workers` are always live. When the queue is full, extra workers are started up to
/// `max_workers`; an extra worker exits after `keep_alive_ms` without work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub core_workers: usize,
    pub max_workers: usize,
    pub queue_capacity: usize,
    pub keep_alive_ms: u64,
}

pub const DEFAULT_KEEP_ALIVE_MS: u64 = 60_000;

impl PoolSettings {
    pub const fn new(core_workers: usize, max_workers: usize, queue_capacity: usize) -> Self {
        Self {
            core_workers,
            max_workers,
            queue_capacity,
            keep_alive_ms: DEFAULT_KEEP_ALIVE_MS,
        }
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    pub fn validate(&self, label: &str) -> Result<(), ConfigError> {
        if self.core_workers == 0 {
            return Err(ConfigError::Invalid(format!(
                "{}: core_workers must be at least 1",
                label
            )));
        }
        if self.max_workers < self.core_workers {
            return Err(ConfigError::Invalid(format!(
                "{}: max_workers ({}) is below core_workers ({})",
                label, self.max_workers, self.core_workers
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(format!(
                "{}: queue_capacity must be at least 1",
                label
            )));
        }
        Ok(())
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::new(4, 4, 100)
    }
}
