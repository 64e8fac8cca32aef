//! Particle sprite backend.
//!
//! ```text
//! slot 0        sprite buffer   [s0 s1 s2 .. s(live-1) | unused ......]
//!                               └── mapped range ──────┘
//! slot 1..      surfaces (optional, e.g. per-sprite textures)
//! ```

use std::sync::Arc;

use render_interop_core::{InteropMode, MapRange, RenderStorage, StorageMapState};

use super::StorageSet;
use crate::entity::{RenderEntityBackend, StorageEntry};

const SPRITE_BUFFER: usize = 0;

/// Backend for particle sprites.
///
/// Only the live prefix of the sprite buffer is mapped through the CPU
/// path; with no live sprites the whole buffer is mapped.
pub struct SpriteRenderBackend {
    storages: StorageSet,
    sprite_stride: usize,
    live_sprites: usize,
}

impl SpriteRenderBackend {
    /// Creates a backend around `sprite_buffer` holding sprites of
    /// `sprite_stride` bytes.
    #[must_use]
    pub fn new(sprite_buffer: Arc<dyn RenderStorage>, sprite_stride: usize, interop: InteropMode) -> Self {
        let mut storages = StorageSet::with_capacity(1);
        storages.push(sprite_buffer, interop);
        Self {
            storages,
            sprite_stride,
            live_sprites: 0,
        }
    }

    /// Adds a surface slot and returns its index.
    pub fn add_surface(&mut self, surface: Arc<dyn RenderStorage>, interop: InteropMode) -> usize {
        self.storages.push(surface, interop)
    }

    /// Number of sprites written this frame. Takes effect on the next map.
    pub fn set_live_sprites(&mut self, live_sprites: usize) {
        self.live_sprites = live_sprites;
    }

    /// Number of sprites written this frame.
    #[must_use]
    pub const fn live_sprites(&self) -> usize {
        self.live_sprites
    }

    /// Map state of the sprite buffer.
    #[must_use]
    pub fn sprite_buffer_state(&self) -> Option<&StorageMapState> {
        self.storages.state(SPRITE_BUFFER)
    }

    /// Map state of any slot.
    #[must_use]
    pub fn state(&self, index: usize) -> Option<&StorageMapState> {
        self.storages.state(index)
    }

    fn live_range(&self) -> MapRange {
        if self.live_sprites == 0 {
            return MapRange::FULL;
        }
        MapRange::new(0, self.live_sprites.saturating_mul(self.sprite_stride))
    }
}

impl RenderEntityBackend for SpriteRenderBackend {
    fn storage_count(&self) -> usize {
        self.storages.storage_count()
    }

    fn storage(&mut self, index: usize) -> Option<StorageEntry<'_>> {
        self.storages.storage(index)
    }

    fn on_map_storage(&mut self, index: usize) {
        if index != SPRITE_BUFFER {
            return;
        }
        let range = self.live_range();
        if let Some(state) = self.storages.state_mut(SPRITE_BUFFER) {
            state.set_map_range(range);
        }
    }
}
