//! Core configuration for vizij-tween-core.

use serde::{Deserialize, Serialize};

/// Configuration for engine sizing and the parallel evaluation pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial slot count of the entry table. Grows by doubling.
    pub initial_entry_capacity: usize,
    /// Initial row capacity of every typed storage.
    pub initial_storage_capacity: usize,

    /// Storages with at least this many rows evaluate on the rayon pool.
    pub parallel_threshold: usize,
    /// Minimum rows handed to a single rayon task.
    pub parallel_min_chunk: usize,

    /// Warn when a fluent setter hits a handle that is no longer idling.
    pub log_ignored_setters: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_entry_capacity: 256,
            initial_storage_capacity: 8,
            parallel_threshold: 32,
            parallel_min_chunk: 16,
            log_ignored_setters: false,
        }
    }
}

impl Config {
    /// Never use the rayon pool; every storage is evaluated on the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallel_threshold: usize::MAX,
            ..Self::default()
        }
    }

    /// Larger up-front allocations for hosts running thousands of tweens.
    pub fn high_throughput() -> Self {
        Self {
            initial_entry_capacity: 4096,
            initial_storage_capacity: 1024,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[inline]
    pub(crate) fn use_parallel(&self, rows: usize) -> bool {
        rows >= self.parallel_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_threshold() {
        let cfg = Config::default();
        assert_eq!(cfg.parallel_threshold, 32);
        assert!(cfg.use_parallel(32));
        assert!(!cfg.use_parallel(31));
        assert!(!Config::sequential().use_parallel(1_000_000));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg = Config::from_json_str(r#"{ "parallel_threshold": 4 }"#).expect("valid json");
        assert_eq!(cfg.parallel_threshold, 4);
        assert_eq!(cfg.initial_entry_capacity, 256);
    }
}
