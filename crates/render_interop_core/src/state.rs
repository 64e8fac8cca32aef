//! # Storage Map State
//!
//! Single source of truth for one storage's mapping status, for either
//! backend path:
//!
//! ```text
//!              map_cpu()                     note_interop_result(Map, ok)
//!  UNMAPPED ─────────────► CPU_MAPPED       UNMAPPED ──────────────────────► INTEROP_MAPPED
//!      ▲                       │                ▲                                  │
//!      └────── unmap_cpu() ────┘                └── note_interop_result(Unmap) ────┘
//!                                                   release_interop_mapping()
//! ```
//!
//! A storage is never mapped by both paths at once. The cached interop
//! handle is one-shot: acquired during collection, cleared when the batch
//! result is noted.

use crate::handle::InteropHandle;
use crate::storage::{
    DeviceAddress, MapRange, MappedPtr, MappedRegion, RenderMapType, RenderStorage, StorageType,
};

/// Direction of a batched interop call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InteropDirection {
    /// Batch map of the collected handles.
    Map,
    /// Batch unmap of the collected handles.
    Unmap,
}

/// Kind-specific mapping payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MappedView {
    Buffer {
        range: MapRange,
        host: Option<MappedPtr>,
        device: Option<u64>,
    },
    Surface {
        host: Option<MappedRegion>,
        device_array: Option<u64>,
    },
}

impl MappedView {
    const fn empty(storage_type: StorageType) -> Self {
        match storage_type {
            StorageType::Buffer => Self::Buffer {
                range: MapRange::FULL,
                host: None,
                device: None,
            },
            StorageType::Surface => Self::Surface {
                host: None,
                device_array: None,
            },
        }
    }

    fn clear_device(&mut self) {
        match self {
            Self::Buffer { device, .. } => *device = None,
            Self::Surface { device_array, .. } => *device_array = None,
        }
    }
}

/// Mapping state of one storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageMapState {
    /// Mapped through the CPU path.
    cpu_mapped: bool,
    /// Handle the storage is interop-mapped under. `Some` iff interop-mapped.
    mapped_handle: Option<InteropHandle>,
    /// Handle cached for the current pending cycle.
    interop_handle: Option<InteropHandle>,
    view: MappedView,
}

impl StorageMapState {
    /// Creates an unmapped state for a storage of the given kind.
    #[must_use]
    pub const fn new(storage_type: StorageType) -> Self {
        Self {
            cpu_mapped: false,
            mapped_handle: None,
            interop_handle: None,
            view: MappedView::empty(storage_type),
        }
    }

    /// Creates an unmapped state matching `storage`.
    #[must_use]
    pub fn for_storage(storage: &dyn RenderStorage) -> Self {
        Self::new(storage.storage_type())
    }

    /// Kind of storage this state tracks.
    #[inline]
    #[must_use]
    pub const fn storage_type(&self) -> StorageType {
        match self.view {
            MappedView::Buffer { .. } => StorageType::Buffer,
            MappedView::Surface { .. } => StorageType::Surface,
        }
    }

    /// Mapped through the CPU path.
    #[inline]
    #[must_use]
    pub const fn is_cpu_mapped(&self) -> bool {
        self.cpu_mapped
    }

    /// Mapped through the interop path.
    #[inline]
    #[must_use]
    pub const fn is_interop_mapped(&self) -> bool {
        self.mapped_handle.is_some()
    }

    /// Mapped through either path.
    #[inline]
    #[must_use]
    pub const fn is_mapped(&self) -> bool {
        self.cpu_mapped || self.mapped_handle.is_some()
    }

    /// Handle cached for the current pending cycle.
    #[inline]
    #[must_use]
    pub const fn cached_interop_handle(&self) -> Option<InteropHandle> {
        self.interop_handle
    }

    /// Byte range used by the next CPU map (buffers only).
    #[must_use]
    pub const fn map_range(&self) -> MapRange {
        match self.view {
            MappedView::Buffer { range, .. } => range,
            MappedView::Surface { .. } => MapRange::FULL,
        }
    }

    /// Sets the byte range used by the next CPU map. Ignored for surfaces.
    pub fn set_map_range(&mut self, map_range: MapRange) {
        match &mut self.view {
            MappedView::Buffer { range, .. } => *range = map_range,
            MappedView::Surface { .. } => {}
        }
    }

    /// Host pointer while CPU-mapped.
    #[must_use]
    pub fn mapped_ptr(&self) -> Option<MappedPtr> {
        match self.view {
            MappedView::Buffer { host, .. } => host,
            MappedView::Surface { host, .. } => host.map(|region| region.ptr),
        }
    }

    /// Host pointer and pitches while a surface is CPU-mapped.
    #[must_use]
    pub fn mapped_surface(&self) -> Option<MappedRegion> {
        match self.view {
            MappedView::Buffer { .. } => None,
            MappedView::Surface { host, .. } => host,
        }
    }

    /// Device address while interop-mapped.
    #[must_use]
    pub fn device_address(&self) -> Option<DeviceAddress> {
        match self.view {
            MappedView::Buffer { device, .. } => device.map(DeviceAddress::Pointer),
            MappedView::Surface { device_array, .. } => device_array.map(DeviceAddress::Array),
        }
    }

    /// Maps the storage through the CPU path.
    ///
    /// No-op when already CPU-mapped. Returns the final mapped status.
    pub fn map_cpu(&mut self, storage: &dyn RenderStorage, map_type: RenderMapType) -> bool {
        debug_assert_eq!(storage.storage_type(), self.storage_type());
        debug_assert!(
            !self.is_interop_mapped(),
            "CPU map of an interop-mapped storage"
        );
        if self.cpu_mapped {
            return true;
        }

        let region = storage.map(map_type, self.map_range());
        match &mut self.view {
            MappedView::Buffer { host, .. } => *host = region.map(|r| r.ptr),
            MappedView::Surface { host, .. } => *host = region,
        }
        self.cpu_mapped = region.is_some();
        if !self.cpu_mapped {
            tracing::trace!(?map_type, "storage returned no pointer");
        }
        self.cpu_mapped
    }

    /// Unmaps the CPU path. No-op when not CPU-mapped.
    ///
    /// Resets the buffer map range to the full buffer.
    pub fn unmap_cpu(&mut self, storage: &dyn RenderStorage) {
        if !self.cpu_mapped {
            return;
        }
        storage.unmap();
        self.cpu_mapped = false;
        match &mut self.view {
            MappedView::Buffer { range, host, .. } => {
                *host = None;
                *range = MapRange::FULL;
            }
            MappedView::Surface { host, .. } => *host = None,
        }
    }

    /// Returns the interop handle for this cycle, asking the storage only
    /// when none is cached yet.
    pub fn acquire_interop_handle(&mut self, storage: &dyn RenderStorage) -> Option<InteropHandle> {
        if self.interop_handle.is_none() {
            self.interop_handle = storage
                .as_interop()
                .and_then(|interop| interop.acquire_interop_handle());
        }
        self.interop_handle
    }

    /// Applies the outcome of a batched map or unmap to this storage.
    ///
    /// Only storages holding a cached handle took part in the batch; others
    /// are left untouched. The cached handle is always cleared.
    ///
    /// Returns `true` when the storage ended up where `direction` asked:
    /// interop-mapped with a resolved device address, or interop-unmapped.
    /// A `Map` that succeeded in the driver but produced no device address
    /// leaves the storage interop-mapped and returns `false`; the caller
    /// hands it back with [`Self::release_interop_mapping`].
    pub fn note_interop_result(
        &mut self,
        storage: &dyn RenderStorage,
        success: bool,
        direction: InteropDirection,
    ) -> bool {
        let Some(handle) = self.interop_handle.take() else {
            return match direction {
                InteropDirection::Map => false,
                InteropDirection::Unmap => !self.is_interop_mapped(),
            };
        };

        match direction {
            InteropDirection::Map => {
                if !success {
                    return false;
                }
                debug_assert!(!self.cpu_mapped, "interop map of a CPU-mapped storage");
                self.mapped_handle = Some(handle);
                let resolved = storage
                    .as_interop()
                    .and_then(|interop| interop.resolve_mapped_pointer(handle));
                match (&mut self.view, resolved) {
                    (MappedView::Buffer { device, .. }, Some(DeviceAddress::Pointer(ptr))) => {
                        *device = Some(ptr);
                        true
                    }
                    (MappedView::Surface { device_array, .. }, Some(DeviceAddress::Array(array))) => {
                        *device_array = Some(array);
                        true
                    }
                    _ => {
                        self.view.clear_device();
                        false
                    }
                }
            }
            InteropDirection::Unmap => {
                if success {
                    self.mapped_handle = None;
                    self.view.clear_device();
                }
                success
            }
        }
    }

    /// Drops the interop mapping on this side and returns the handle the
    /// driver still holds mapped, so it can be unmapped in the batch.
    pub fn release_interop_mapping(&mut self) -> Option<InteropHandle> {
        self.view.clear_device();
        self.mapped_handle.take()
    }

    /// Clears the cached handle without noting a result.
    pub fn reset_interop_handle(&mut self) {
        self.interop_handle = None;
    }
}
