//! # Render Storage Contract
//!
//! The backend objects (buffers and surfaces) that an entity writes into.
//! Allocation and the graphics API behind them belong to the backend; this
//! module only describes what the interop layer calls.
//!
//! ```text
//! RenderStorage ──map/unmap──► host pointer          (CPU path)
//!      │
//!      └─ as_interop() ──► InteropCapableStorage
//!                              ├─ acquire_interop_handle()   (per cycle)
//!                              └─ resolve_mapped_pointer()   (after batch map)
//! ```

use std::ptr::NonNull;

use serde::Deserialize;

use crate::handle::InteropHandle;

/// Kind of backend storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageType {
    /// Linear buffer (vertices, sprites, indices).
    Buffer,
    /// Surface/texture with row and depth pitch.
    Surface,
}

/// How a storage is mapped for CPU access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMapType {
    /// Read-only access.
    Read,
    /// Write access, previous contents preserved.
    Write,
    /// Read and write access.
    ReadWrite,
    /// Write access, previous contents discarded.
    #[default]
    WriteDiscard,
    /// Write access to regions the GPU is not using.
    WriteNoOverwrite,
}

/// Whether a storage (or an entity) takes part in the GPU interop path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteropMode {
    /// CPU map/unmap only.
    #[default]
    NoInterop,
    /// Zero-copy mapping through a shared interop handle.
    GpuInterop,
}

/// Byte range of a buffer to map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MapRange {
    /// Offset in bytes from the start of the buffer.
    pub offset: usize,
    /// Size in bytes. `usize::MAX` means "to the end".
    pub size: usize,
}

impl MapRange {
    /// The whole buffer.
    pub const FULL: Self = Self {
        offset: 0,
        size: usize::MAX,
    };

    /// Creates a range.
    #[inline]
    #[must_use]
    pub const fn new(offset: usize, size: usize) -> Self {
        Self { offset, size }
    }
}

impl Default for MapRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// Host pointer returned by a successful CPU map.
///
/// Only valid between `map` and `unmap` of the storage that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MappedPtr(NonNull<u8>);

// The pointer is an address into backend-owned mapped memory, never
// dereferenced by this crate.
#[allow(unsafe_code)]
unsafe impl Send for MappedPtr {}
#[allow(unsafe_code)]
unsafe impl Sync for MappedPtr {}

impl MappedPtr {
    /// Wraps a raw pointer. Returns `None` for null.
    #[inline]
    #[must_use]
    pub fn new(ptr: *mut u8) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Returns the raw pointer.
    #[inline]
    #[must_use]
    pub const fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }
}

/// Result of a CPU map: the pointer plus the pitches needed to address
/// surfaces. Buffers report zero pitches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MappedRegion {
    /// Start of the mapped region.
    pub ptr: MappedPtr,
    /// Bytes between rows (surfaces only).
    pub row_pitch: usize,
    /// Bytes between depth slices (surfaces only).
    pub depth_pitch: usize,
}

impl MappedRegion {
    /// A linear region without pitches.
    #[inline]
    #[must_use]
    pub const fn linear(ptr: MappedPtr) -> Self {
        Self {
            ptr,
            row_pitch: 0,
            depth_pitch: 0,
        }
    }
}

/// Device-side address resolved after a successful batch map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceAddress {
    /// Device pointer to a mapped buffer.
    Pointer(u64),
    /// Device array backing a mapped surface.
    Array(u64),
}

/// Backend storage as seen by the interop layer.
///
/// Methods take `&self`; backends use interior mutability the same way
/// graphics API objects do.
pub trait RenderStorage: Send + Sync {
    /// Kind of storage.
    fn storage_type(&self) -> StorageType;

    /// Maps the storage for CPU access. Surfaces ignore `range`.
    ///
    /// Returns `None` when the backend cannot provide a pointer.
    fn map(&self, map_type: RenderMapType, range: MapRange) -> Option<MappedRegion>;

    /// Unmaps a previously mapped storage.
    fn unmap(&self);

    /// Interop capability, when the backend registered this storage with the
    /// compute driver.
    fn as_interop(&self) -> Option<&dyn InteropCapableStorage> {
        None
    }
}

/// Optional capability of storages registered for zero-copy interop.
pub trait InteropCapableStorage: Send + Sync {
    /// Returns the registered interop handle, if any.
    fn acquire_interop_handle(&self) -> Option<InteropHandle>;

    /// Resolves the device address of `handle` once the driver mapped it.
    fn resolve_mapped_pointer(&self, handle: InteropHandle) -> Option<DeviceAddress>;
}
