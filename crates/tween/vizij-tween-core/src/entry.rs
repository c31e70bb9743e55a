//! Generation-checked entry table.
//!
//! Every tween owns one entry from creation until its row is compacted out of
//! storage. The entry records where the row currently lives; handles carry the
//! generation observed at allocation so stale handles can be detected after
//! the slot is recycled.

use crate::error::{Result, TweenError};
use crate::ids::TweenHandle;

/// Position of a committed row.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Location {
    pub storage_id: u32,
    pub dense_index: usize,
}

#[derive(Clone, Debug, Default)]
struct Entry {
    generation: u32,
    live: bool,
    /// `None` while the tween is idling in its deferred buffer.
    location: Option<Location>,
    next_free: Option<u32>,
}

#[derive(Debug)]
pub struct EntryTable {
    entries: Vec<Entry>,
    free_head: Option<u32>,
    live: usize,
}

#[inline]
fn bump(generation: u32) -> u32 {
    match generation.wrapping_add(1) {
        0 => 1,
        g => g,
    }
}

impl EntryTable {
    pub fn new(capacity: usize) -> Self {
        let mut table = Self {
            entries: Vec::new(),
            free_head: None,
            live: 0,
        };
        table.grow_to(capacity.max(1));
        table
    }

    fn grow_to(&mut self, new_len: usize) {
        let old_len = self.entries.len();
        if new_len <= old_len {
            return;
        }
        log::debug!("entry table grows {old_len} -> {new_len}");
        self.entries.reserve_exact(new_len - old_len);
        for i in old_len..new_len {
            let next = if i + 1 < new_len {
                Some((i + 1) as u32)
            } else {
                self.free_head
            };
            self.entries.push(Entry {
                next_free: next,
                ..Entry::default()
            });
        }
        self.free_head = Some(old_len as u32);
    }

    /// Pop a free slot, doubling the table when none is left.
    pub fn alloc(&mut self) -> (u32, u32) {
        let index = loop {
            if let Some(i) = self.free_head {
                break i;
            }
            let len = self.entries.len();
            self.grow_to((len * 2).max(1));
        };
        let entry = &mut self.entries[index as usize];
        self.free_head = entry.next_free.take();
        entry.generation = bump(entry.generation);
        entry.live = true;
        entry.location = None;
        self.live += 1;
        (index, entry.generation)
    }

    /// Return a slot to the free list.
    ///
    /// A generation mismatch (including a second free of the same handle) is
    /// a no-op unless `strict`, in which case it reports `StaleHandle`.
    pub fn free(&mut self, index: u32, generation: u32, strict: bool) -> Result<()> {
        if !self.is_valid(index, generation) {
            if strict {
                return Err(TweenError::StaleHandle { index, generation });
            }
            return Ok(());
        }
        self.release(index);
        Ok(())
    }

    /// Free a slot by index alone. Used by storages, which track entry indices
    /// rather than handles.
    pub(crate) fn release(&mut self, index: u32) {
        let free_head = self.free_head;
        let Some(entry) = self.entries.get_mut(index as usize) else {
            return;
        };
        if !entry.live {
            return;
        }
        entry.generation = bump(entry.generation);
        entry.live = false;
        entry.location = None;
        entry.next_free = free_head;
        self.free_head = Some(index);
        self.live -= 1;
    }

    pub fn set_location(&mut self, index: u32, storage_id: u32, dense_index: usize) {
        if let Some(entry) = self.entries.get_mut(index as usize) {
            entry.location = Some(Location {
                storage_id,
                dense_index,
            });
        }
    }

    pub fn set_dense_index(&mut self, index: u32, dense_index: usize) {
        if let Some(Location {
            dense_index: slot, ..
        }) = self
            .entries
            .get_mut(index as usize)
            .and_then(|e| e.location.as_mut())
        {
            *slot = dense_index;
        }
    }

    #[inline]
    pub fn is_valid(&self, index: u32, generation: u32) -> bool {
        generation >= 1
            && self
                .entries
                .get(index as usize)
                .is_some_and(|e| e.live && e.generation == generation)
    }

    #[inline]
    pub fn valid(&self, handle: TweenHandle) -> bool {
        self.is_valid(handle.index, handle.generation)
    }

    /// Storage location of a committed handle; `None` for stale or idling handles.
    pub fn valid_with_location(&self, handle: TweenHandle) -> Option<Location> {
        if !self.valid(handle) {
            return None;
        }
        self.entries[handle.index as usize].location
    }

    /// Location of a live entry regardless of generation.
    pub(crate) fn location_of(&self, index: u32) -> Option<Location> {
        self.entries
            .get(index as usize)
            .filter(|e| e.live)
            .and_then(|e| e.location)
    }

    pub(crate) fn generation_of(&self, index: u32) -> u32 {
        self.entries
            .get(index as usize)
            .map_or(0, |e| e.generation)
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }
}
