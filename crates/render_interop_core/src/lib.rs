//! # Render Interop Core
//!
//! Per-storage map state for the render interop layer. Simulation code
//! writes per-frame data into GPU-visible storage through one of two paths:
//!
//! - **CPU path**: `map` returns a host pointer, `unmap` publishes it
//! - **Interop path**: the storage's shared handle is mapped by the compute
//!   driver in a batch, and the storage resolves a device address
//!
//! ## Architecture Rules
//!
//! 1. **One owner per state** - a `StorageMapState` is only touched by the
//!    entity that owns it
//! 2. **Never mapped twice** - a storage is CPU-mapped, interop-mapped, or
//!    neither
//! 3. **No knowledge of entities** - this crate is the leaf of the stack
//!
//! ## Example
//!
//! ```rust,ignore
//! use render_interop_core::{RenderMapType, StorageMapState};
//!
//! let mut state = StorageMapState::for_storage(&buffer);
//! if state.map_cpu(&buffer, RenderMapType::WriteDiscard) {
//!     write_vertices(state.mapped_ptr().unwrap());
//!     state.unmap_cpu(&buffer);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod handle;
pub mod pool;
pub mod state;
pub mod storage;

pub use config::InteropConfig;
pub use error::{InteropError, InteropResult};
pub use handle::{EntityId, InteropHandle};
pub use pool::RecyclePool;
pub use state::{InteropDirection, StorageMapState};
pub use storage::{
    DeviceAddress, InteropCapableStorage, InteropMode, MapRange, MappedPtr, MappedRegion,
    RenderMapType, RenderStorage, StorageType,
};
