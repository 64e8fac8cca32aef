//! # Interop Error Types
//!
//! Every fault the interop layer can run into. Map, unmap and batch faults
//! are recovered locally (fallback or rollback) and only recorded; they are
//! never returned to the simulation layer.

use thiserror::Error;

use crate::handle::EntityId;

/// Errors that can occur in the interop layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InteropError {
    /// A storage returned no pointer on the CPU path.
    #[error("CPU map failed for storage {storage} of entity {entity}")]
    MapFailed {
        /// Entity owning the storage.
        entity: EntityId,
        /// Slot index within the entity.
        storage: usize,
    },

    /// A storage had no usable interop handle or device address this cycle.
    #[error("interop unavailable for storage {storage} of entity {entity}")]
    InteropUnavailable {
        /// Entity owning the storage.
        entity: EntityId,
        /// Slot index within the entity.
        storage: usize,
    },

    /// The driver failed the aggregate map call.
    #[error("batch map of {handles} interop handles failed")]
    BatchMapFailed {
        /// Number of handles in the failed call.
        handles: usize,
    },

    /// The driver failed the aggregate unmap call.
    #[error("batch unmap of {handles} interop handles failed")]
    BatchUnmapFailed {
        /// Number of handles in the failed call.
        handles: usize,
    },

    /// A reference was requested from an entity that is already being destroyed.
    #[error("entity {0} has no references left")]
    RefCountMisuse(EntityId),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(String),
}

/// Result type for interop operations.
pub type InteropResult<T> = Result<T, InteropError>;
