//! # Entity Kinds
//!
//! Concrete [`RenderEntityBackend`](crate::entity::RenderEntityBackend)
//! implementations:
//!
//! - [`StorageSet`]: a plain list of storages, for mesh-like entities such
//!   as cloth or destructible chunks
//! - [`SpriteRenderBackend`]: particle sprites, one sprite buffer plus
//!   optional surfaces, mapping only the live part of the sprite buffer

mod sprite;
mod storage_set;

pub use sprite::SpriteRenderBackend;
pub use storage_set::StorageSet;
