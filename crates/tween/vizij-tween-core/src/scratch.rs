//! Scratch buffers and frame lifecycle.
//!
//! One `Scratch` per runner; buffers keep their capacity across ticks.

use crate::config::Config;
use crate::sampling::Sample;

#[derive(Debug)]
pub struct Scratch<T> {
    /// Output of the evaluation pass, indexed by dense row.
    pub samples: Vec<Option<Sample<T>>>,
    /// Dense indices queued for compaction.
    pub removals: Vec<usize>,
}

impl<T> Scratch<T> {
    pub fn new(cfg: &Config) -> Self {
        Self {
            samples: Vec::with_capacity(cfg.initial_storage_capacity),
            removals: Vec::new(),
        }
    }

    #[inline]
    pub fn begin_frame(&mut self) {
        self.samples.clear();
        self.removals.clear();
    }
}
