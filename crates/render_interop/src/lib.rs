//! # Render Interop
//!
//! Render entities shared between simulation owners, mapped every frame
//! through the CPU path or the batched GPU interop path.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ONE FRAME                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Entity phase:  entity.map() / entity.unmap()   (any thread)│
//! │       ↓                                                     │
//! │  Batch phase:   coordinator.run_batch()                     │
//! │                   collect → driver map/unmap → distribute   │
//! │       ↓                                                     │
//! │  Simulation writes through mapped pointers                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - Each entity is `Mapped` only when every bound storage is mapped by
//!   exactly one path
//! - Nothing is thrown at the simulation layer; faults are recovered by
//!   fallback or rollback and recorded on the entity
//! - An entity is torn down exactly once, when its last reference goes

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod entity;
pub mod interop;
pub mod kinds;

pub use entity::{
    DestroyPolicy, DropBackend, EntityBuilder, EntityMapState, EntityRef, PooledReuse,
    RenderEntity, RenderEntityBackend, StorageEntry,
};
pub use interop::{
    BatchStats, CoordinatorStats, InteropBatchCoordinator, InteropDriver, InteropParticipant,
    NoInteropDriver, ReleaseQueue,
};
pub use kinds::{SpriteRenderBackend, StorageSet};

pub use render_interop_core::{
    DeviceAddress, EntityId, InteropCapableStorage, InteropConfig, InteropError, InteropHandle,
    InteropMode, InteropResult, MapRange, MappedPtr, MappedRegion, RenderMapType, RenderStorage,
    StorageMapState, StorageType,
};
