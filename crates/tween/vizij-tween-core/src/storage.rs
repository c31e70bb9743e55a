//! Typed dense storage for one `(T, P)` pair in one update group.
//!
//! Three parallel arrays of equal length: owning entry, row, callbacks.
//! Invariant: for every `d < len()`, the entry `entry_of_dense[d]` is located
//! at `(self.id, d)`. Removal swaps the last row into the hole and repoints
//! the moved row's entry in the same call.

use crate::callback::{CallbackPool, CallbackSet};
use crate::entry::EntryTable;
use crate::ids::TweenStatus;
use crate::plugin::TweenPlugin;
use crate::row::TweenRow;

#[derive(Debug)]
pub struct TweenStorage<T, P> {
    id: u32,
    entry_of_dense: Vec<u32>,
    rows: Vec<TweenRow<T, P>>,
    callbacks: Vec<CallbackSet<T>>,
}

impl<T, P: TweenPlugin<T>> TweenStorage<T, P> {
    pub fn new(id: u32, capacity: usize) -> Self {
        Self {
            id,
            entry_of_dense: Vec::with_capacity(capacity),
            rows: Vec::with_capacity(capacity),
            callbacks: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rows.capacity()
    }

    pub fn rows(&self) -> &[TweenRow<T, P>] {
        &self.rows
    }

    pub fn row(&self, dense: usize) -> Option<&TweenRow<T, P>> {
        self.rows.get(dense)
    }

    pub fn row_mut(&mut self, dense: usize) -> Option<&mut TweenRow<T, P>> {
        self.rows.get_mut(dense)
    }

    pub fn callbacks(&self, dense: usize) -> Option<&CallbackSet<T>> {
        self.callbacks.get(dense)
    }

    pub fn callbacks_mut(&mut self, dense: usize) -> Option<&mut CallbackSet<T>> {
        self.callbacks.get_mut(dense)
    }

    /// Entry index owning `dense`.
    pub fn entry_at(&self, dense: usize) -> Option<u32> {
        self.entry_of_dense.get(dense).copied()
    }

    pub fn status(&self, dense: usize) -> TweenStatus {
        self.rows.get(dense).map_or(TweenStatus::None, |r| r.status)
    }

    pub fn is_active(&self, dense: usize) -> bool {
        self.status(dense).is_active()
    }

    pub fn ensure_capacity(&mut self, capacity: usize) {
        let extra = capacity.saturating_sub(self.len());
        self.entry_of_dense.reserve(extra);
        self.rows.reserve(extra);
        self.callbacks.reserve(extra);
    }

    /// Write the row at the tail and point its entry at it. Returns the dense index.
    pub fn append(
        &mut self,
        entries: &mut EntryTable,
        entry_index: u32,
        row: TweenRow<T, P>,
        callbacks: CallbackSet<T>,
    ) -> usize {
        if self.rows.len() == self.rows.capacity() {
            // double all three together
            let grow = self.rows.capacity().max(1);
            self.entry_of_dense.reserve_exact(grow);
            self.rows.reserve_exact(grow);
            self.callbacks.reserve_exact(grow);
        }
        let dense = self.rows.len();
        self.entry_of_dense.push(entry_index);
        self.rows.push(row);
        self.callbacks.push(callbacks);
        entries.set_location(entry_index, self.id, dense);
        dense
    }

    /// Swap-remove one row and free its entry.
    pub fn remove_at(&mut self, entries: &mut EntryTable, pool: &mut CallbackPool, dense: usize) {
        if dense >= self.rows.len() {
            return;
        }
        let owner = self.entry_of_dense[dense];
        self.rows[dense].dispose_values();

        self.rows.swap_remove(dense);
        let mut removed = self.callbacks.swap_remove(dense);
        pool.release(&mut removed.dispose);
        self.entry_of_dense.swap_remove(dense);

        if let Some(&moved) = self.entry_of_dense.get(dense) {
            entries.set_dense_index(moved, dense);
        }
        entries.release(owner);
    }

    /// Remove a batch of rows given by dense index.
    ///
    /// Owners are resolved before anything moves; each removal then looks up
    /// the owner's current position.
    pub fn remove_all(&mut self, entries: &mut EntryTable, pool: &mut CallbackPool, dense: &[usize]) {
        let owners: Vec<u32> = dense.iter().filter_map(|&d| self.entry_at(d)).collect();
        for owner in owners {
            match entries.location_of(owner) {
                Some(loc) if loc.storage_id == self.id => self.remove_at(entries, pool, loc.dense_index),
                _ => log::warn!("entry {owner} is not resident in storage {}", self.id),
            }
        }
    }

    /// Dense indices of finished rows whose callbacks are not mid-invocation.
    pub fn collect_finished(&self, out: &mut Vec<usize>) {
        out.extend(
            self.rows
                .iter()
                .zip(&self.callbacks)
                .enumerate()
                .filter(|(_, (row, cb))| row.status.is_finished() && !cb.running)
                .map(|(d, _)| d),
        );
    }

    /// Checks the dense/entry invariant for every row.
    pub fn check_invariant(&self, entries: &EntryTable) -> bool {
        self.entry_of_dense.len() == self.rows.len()
            && self.callbacks.len() == self.rows.len()
            && self.entry_of_dense.iter().enumerate().all(|(d, &owner)| {
                entries
                    .location_of(owner)
                    .is_some_and(|loc| loc.storage_id == self.id && loc.dense_index == d)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::F32Plugin;
    use crate::row::TweenRow;

    fn row(v: f32) -> TweenRow<f32, F32Plugin> {
        let mut r = TweenRow::new(v, v + 1.0, 1.0, F32Plugin);
        r.status = TweenStatus::Scheduled;
        r
    }

    fn fill(
        storage: &mut TweenStorage<f32, F32Plugin>,
        entries: &mut EntryTable,
        n: usize,
    ) -> Vec<(u32, u32)> {
        (0..n)
            .map(|i| {
                let (index, generation) = entries.alloc();
                storage.append(entries, index, row(i as f32), CallbackSet::default());
                (index, generation)
            })
            .collect()
    }

    #[test]
    fn append_sets_location() {
        let mut entries = EntryTable::new(4);
        let mut storage = TweenStorage::new(3, 1);
        let handles = fill(&mut storage, &mut entries, 5);
        assert_eq!(storage.len(), 5);
        assert!(storage.capacity() >= 5);
        assert!(storage.check_invariant(&entries));
        let loc = entries.location_of(handles[4].0).expect("committed");
        assert_eq!((loc.storage_id, loc.dense_index), (3, 4));
    }

    #[test]
    fn remove_at_moves_last_row_and_frees_entry() {
        let mut entries = EntryTable::new(4);
        let mut pool = CallbackPool::new();
        let mut storage = TweenStorage::new(0, 4);
        let handles = fill(&mut storage, &mut entries, 4);

        storage.remove_at(&mut entries, &mut pool, 1);
        assert_eq!(storage.len(), 3);
        assert!(!entries.is_valid(handles[1].0, handles[1].1));
        // the former tail now sits at dense 1
        assert_eq!(storage.entry_at(1), Some(handles[3].0));
        assert_eq!(storage.row(1).map(|r| r.start_value), Some(3.0));
        assert!(storage.check_invariant(&entries));

        storage.remove_at(&mut entries, &mut pool, 2);
        assert_eq!(storage.len(), 2);
        assert!(storage.check_invariant(&entries));
    }

    #[test]
    fn remove_all_snapshots_owners() {
        let mut entries = EntryTable::new(8);
        let mut pool = CallbackPool::new();
        let mut storage = TweenStorage::new(0, 8);
        let handles = fill(&mut storage, &mut entries, 6);

        // removing 0 first would move 5 into 0; 5 must still be removed
        storage.remove_all(&mut entries, &mut pool, &[0, 5, 2]);
        assert_eq!(storage.len(), 3);
        for gone in [0, 2, 5] {
            assert!(!entries.is_valid(handles[gone].0, handles[gone].1));
        }
        for kept in [1, 3, 4] {
            assert!(entries.is_valid(handles[kept].0, handles[kept].1));
        }
        assert!(storage.check_invariant(&entries));
    }

    #[test]
    fn invariant_holds_under_churn() {
        let mut entries = EntryTable::new(1);
        let mut pool = CallbackPool::new();
        let mut storage: TweenStorage<f32, F32Plugin> = TweenStorage::new(0, 1);
        let mut seed: u64 = 7;
        for step in 0..1000 {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let r = (seed >> 33) as usize;
            if r % 3 == 0 && !storage.is_empty() {
                storage.remove_at(&mut entries, &mut pool, r % storage.len());
            } else if r % 7 == 0 && storage.len() > 2 {
                let batch = [r % storage.len(), (r / 3) % storage.len()];
                storage.remove_all(&mut entries, &mut pool, &batch);
            } else {
                let (index, _) = entries.alloc();
                storage.append(&mut entries, index, row(step as f32), CallbackSet::default());
            }
            assert!(storage.check_invariant(&entries), "broken at step {step}");
        }
        assert_eq!(entries.live_count(), storage.len());
    }

    #[test]
    fn collect_finished_skips_running_rows() {
        let mut entries = EntryTable::new(4);
        let mut storage = TweenStorage::new(0, 4);
        fill(&mut storage, &mut entries, 3);
        storage.row_mut(0).expect("row").status = TweenStatus::Completed;
        storage.row_mut(2).expect("row").status = TweenStatus::Canceled;
        storage.callbacks_mut(2).expect("cb").running = true;
        let mut out = Vec::new();
        storage.collect_finished(&mut out);
        assert_eq!(out, vec![0]);
    }
}
