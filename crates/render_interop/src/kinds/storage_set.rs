//! Generic list of storages.

use std::sync::Arc;

use render_interop_core::{InteropMode, RenderStorage, StorageMapState, StorageType};

use crate::entity::{RenderEntityBackend, StorageEntry};

struct Slot {
    storage: Option<Arc<dyn RenderStorage>>,
    interop: InteropMode,
    state: StorageMapState,
}

/// Backend holding an ordered list of storage slots.
///
/// Slots may be reserved before their storage exists; unbound slots are
/// skipped by every entity operation.
#[derive(Default)]
pub struct StorageSet {
    slots: Vec<Slot>,
}

impl StorageSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with room for `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Appends a bound slot and returns its index.
    pub fn push(&mut self, storage: Arc<dyn RenderStorage>, interop: InteropMode) -> usize {
        let state = StorageMapState::for_storage(storage.as_ref());
        self.slots.push(Slot {
            storage: Some(storage),
            interop,
            state,
        });
        self.slots.len() - 1
    }

    /// Appends a slot with no storage yet and returns its index.
    pub fn push_unbound(&mut self, storage_type: StorageType, interop: InteropMode) -> usize {
        self.slots.push(Slot {
            storage: None,
            interop,
            state: StorageMapState::new(storage_type),
        });
        self.slots.len() - 1
    }

    /// Binds `storage` to slot `index`, returning the storage it replaces.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds. In debug builds, also panics if
    /// the slot is currently mapped.
    pub fn bind(
        &mut self,
        index: usize,
        storage: Arc<dyn RenderStorage>,
    ) -> Option<Arc<dyn RenderStorage>> {
        let slot = &mut self.slots[index];
        debug_assert!(!slot.state.is_mapped(), "rebinding a mapped slot");
        slot.state = StorageMapState::for_storage(storage.as_ref());
        slot.storage.replace(storage)
    }

    /// Map state of slot `index`.
    #[must_use]
    pub fn state(&self, index: usize) -> Option<&StorageMapState> {
        self.slots.get(index).map(|slot| &slot.state)
    }

    /// Mutable map state of slot `index`, e.g. to narrow the map range.
    #[must_use]
    pub fn state_mut(&mut self, index: usize) -> Option<&mut StorageMapState> {
        self.slots.get_mut(index).map(|slot| &mut slot.state)
    }

    /// Number of slots, bound or not.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if the set has no slots.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl RenderEntityBackend for StorageSet {
    fn storage_count(&self) -> usize {
        self.slots.len()
    }

    fn storage(&mut self, index: usize) -> Option<StorageEntry<'_>> {
        let slot = self.slots.get_mut(index)?;
        let storage = slot.storage.as_deref()?;
        Some(StorageEntry {
            storage,
            interop: slot.interop,
            state: &mut slot.state,
        })
    }
}
