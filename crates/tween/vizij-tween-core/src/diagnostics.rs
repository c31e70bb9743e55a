//! Serializable snapshots of engine occupancy.

use serde::{Deserialize, Serialize};

use crate::ids::UpdateTiming;

/// One typed storage in one update group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub storage_id: u32,
    pub timing: UpdateTiming,
    pub value_type: String,
    pub plugin_type: String,
    /// Rows currently resident, including finished rows awaiting compaction.
    pub len: usize,
    pub active: usize,
    pub capacity: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub live_entries: usize,
    pub entry_capacity: usize,
    /// Deferred buffers currently holding a tween.
    pub idling: usize,
    /// Dispose-list nodes checked out of the callback pool.
    pub pooled_callbacks: usize,
    pub storages: Vec<StorageStats>,
}

impl EngineStats {
    /// Rows across every storage.
    pub fn total_rows(&self) -> usize {
        self.storages.iter().map(|s| s.len).sum()
    }

    pub fn storages_in(&self, timing: UpdateTiming) -> impl Iterator<Item = &StorageStats> {
        self.storages.iter().filter(move |s| s.timing == timing)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
