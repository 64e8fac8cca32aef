//! # Handles
//!
//! Lightweight identifiers used across the interop layer:
//! - `InteropHandle` is the opaque resource shared between the compute
//!   context and the graphics context
//! - `EntityId` names a render entity (index + generation)

use std::fmt;
use std::num::NonZeroU64;

/// Opaque interop resource handle.
///
/// Registered once by the graphics backend and handed to the compute driver
/// so the same memory can be mapped into both contexts without a copy.
/// A handle is never null, so `Option<InteropHandle>` is the size of a `u64`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct InteropHandle(NonZeroU64);

impl InteropHandle {
    /// Wraps a raw driver handle value. Returns `None` for the null handle.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Returns the raw driver value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for InteropHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InteropHandle({:#x})", self.0.get())
    }
}

/// Identifier of a render entity.
///
/// - Lower 32 bits: index
/// - Upper 32 bits: generation counter for detecting stale references
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}
