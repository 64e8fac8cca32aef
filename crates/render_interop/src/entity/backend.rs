//! Storage access for one entity kind.

use render_interop_core::{InteropMode, RenderStorage, StorageMapState};

/// One storage slot as seen by the entity state machine.
pub struct StorageEntry<'a> {
    /// The backend storage. Not owned by the entity.
    pub storage: &'a dyn RenderStorage,
    /// Whether this storage takes part in the interop path.
    pub interop: InteropMode,
    /// Map state, exclusively owned by the entity.
    pub state: &'a mut StorageMapState,
}

/// The storages one kind of render entity manages.
///
/// Implemented per entity kind (particle sprites, cloth, destructible
/// chunks) and injected into [`super::RenderEntity`] by composition.
pub trait RenderEntityBackend: Send + 'static {
    /// Number of storage slots.
    fn storage_count(&self) -> usize;

    /// Slot `index`, or `None` when no storage is bound to it.
    fn storage(&mut self, index: usize) -> Option<StorageEntry<'_>>;

    /// Called right before slot `index` is mapped through the CPU path.
    fn on_map_storage(&mut self, _index: usize) {}
}
