//! Batch Coordinator - one driver round trip per frame for every entity
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       BATCH PHASE                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  0. driver.unmap_resources(handles of entities torn down     │
//! │     since the last batch)                                    │
//! │  1. Pin live entities (denied once their count hit zero)     │
//! │  2. collect_handles_for_interop  → to_map / to_unmap         │
//! │  3. driver.map_resources(to_map)                             │
//! │     driver.unmap_resources(to_unmap)                         │
//! │  4. distribute_interop_results   → Mapped / Unmapped         │
//! │  5. Unpin (may run teardown), drain released handles         │
//! │  6. driver.unmap_resources(released)                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Weak};
use std::time::Instant;

use render_interop_core::{InteropConfig, InteropError, InteropHandle};

use super::driver::InteropDriver;
use super::release::ReleaseQueue;
use super::stats::{BatchStats, CoordinatorStats};
use super::InteropParticipant;
use crate::entity::{EntityRef, RenderEntityBackend};

/// Drives the batched interop phase for every registered entity.
///
/// Owns the handle buffers; they are cleared and refilled each frame and
/// keep their capacity.
pub struct InteropBatchCoordinator<D: InteropDriver> {
    driver: D,
    participants: Vec<Weak<dyn InteropParticipant>>,
    /// Entities holding a reference for the duration of one batch.
    pinned: Vec<Arc<dyn InteropParticipant>>,
    to_map: Vec<InteropHandle>,
    to_unmap: Vec<InteropHandle>,
    released: Vec<InteropHandle>,
    /// Filled by entities torn down outside the pinned window.
    release_queue: ReleaseQueue,
    frame: u64,
    last_batch: BatchStats,
    totals: CoordinatorStats,
    last_fault: Option<InteropError>,
}

impl<D: InteropDriver> InteropBatchCoordinator<D> {
    /// Creates a coordinator with default buffer capacities.
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, &InteropConfig::default())
    }

    /// Creates a coordinator sized from `config`.
    #[must_use]
    pub fn with_config(driver: D, config: &InteropConfig) -> Self {
        let capacity = config.batch_capacity;
        Self {
            driver,
            participants: Vec::with_capacity(capacity),
            pinned: Vec::with_capacity(capacity),
            to_map: Vec::with_capacity(capacity),
            to_unmap: Vec::with_capacity(capacity),
            released: Vec::with_capacity(capacity),
            release_queue: ReleaseQueue::new(),
            frame: 0,
            last_batch: BatchStats::default(),
            totals: CoordinatorStats::default(),
            last_fault: None,
        }
    }

    /// Adds an entity to the enumeration. The coordinator does not hold a
    /// reference; the entity leaves the enumeration once destroyed, and the
    /// interop mappings it drops at teardown are unmapped by the next batch.
    ///
    /// Registering an entity that is already registered is a no-op.
    pub fn register<B: RenderEntityBackend>(&mut self, entity: &EntityRef<B>) {
        let shared: Arc<dyn InteropParticipant> = entity.shared().clone();
        let weak = Arc::downgrade(&shared);
        if self.participants.iter().any(|known| known.ptr_eq(&weak)) {
            return;
        }
        shared.attach_release_queue(self.release_queue.clone());
        self.participants.push(weak);
    }

    /// Number of entities in the enumeration, including destroyed ones not
    /// yet pruned.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.participants.len()
    }

    /// The driver.
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The driver, mutably.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Statistics of the last batch.
    #[must_use]
    pub const fn last_batch(&self) -> &BatchStats {
        &self.last_batch
    }

    /// Totals over all batches.
    #[must_use]
    pub const fn totals(&self) -> &CoordinatorStats {
        &self.totals
    }

    /// Last failed driver call.
    #[must_use]
    pub fn last_fault(&self) -> Option<&InteropError> {
        self.last_fault.as_ref()
    }

    /// Runs one batch phase. Must not overlap with `map`/`unmap` calls on the
    /// registered entities.
    pub fn run_batch(&mut self) -> BatchStats {
        let start = Instant::now();
        self.frame += 1;
        let mut stats = BatchStats {
            frame: self.frame,
            ..BatchStats::default()
        };

        // Mappings of entities torn down since the last batch go first, so
        // a reused storage can be mapped again in this batch.
        self.released.clear();
        self.release_queue.drain_into(&mut self.released);
        self.unmap_released(&mut stats);

        // Pin under each entity's own lock; destroyed entities drop out.
        let before = self.participants.len();
        let pinned = &mut self.pinned;
        self.participants.retain(|weak| {
            let Some(participant) = weak.upgrade() else {
                return false;
            };
            if !participant.try_retain() {
                return false;
            }
            pinned.push(participant);
            true
        });
        stats.entities = saturating_u32(self.pinned.len());
        stats.entities_pruned = saturating_u32(before - self.participants.len());

        self.to_map.clear();
        self.to_unmap.clear();
        for participant in &self.pinned {
            participant.collect_handles_for_interop(&mut self.to_map, &mut self.to_unmap);
        }
        stats.handles_mapped = saturating_u32(self.to_map.len());
        stats.handles_unmapped = saturating_u32(self.to_unmap.len());

        let map_succeeded = self.to_map.is_empty() || self.driver.map_resources(&self.to_map);
        if !map_succeeded {
            tracing::warn!(handles = self.to_map.len(), "batch interop map failed");
            self.last_fault = Some(InteropError::BatchMapFailed {
                handles: self.to_map.len(),
            });
        }
        let unmap_succeeded = self.to_unmap.is_empty() || self.driver.unmap_resources(&self.to_unmap);
        if !unmap_succeeded {
            tracing::warn!(handles = self.to_unmap.len(), "batch interop unmap failed");
            self.last_fault = Some(InteropError::BatchUnmapFailed {
                handles: self.to_unmap.len(),
            });
        }
        stats.map_failed = !map_succeeded;
        stats.unmap_failed = !unmap_succeeded;

        for participant in &self.pinned {
            participant.distribute_interop_results(map_succeeded, unmap_succeeded);
        }

        // Unpinning runs teardown of entities their owners released during
        // the batch; their mappings are drained afterwards.
        for participant in self.pinned.drain(..) {
            participant.release();
            participant.drain_released_handles(&mut self.released);
        }
        self.release_queue.drain_into(&mut self.released);
        self.unmap_released(&mut stats);

        stats.batch_time_us = u32::try_from(start.elapsed().as_micros()).unwrap_or(u32::MAX);
        self.last_batch = stats;
        self.totals.record(&stats);
        stats
    }

    /// Unmaps `released`, skipped when empty. On failure the handles are
    /// queued again for the next batch.
    fn unmap_released(&mut self, stats: &mut BatchStats) {
        if self.released.is_empty() {
            return;
        }
        stats.handles_released += saturating_u32(self.released.len());
        if self.driver.unmap_resources(&self.released) {
            self.released.clear();
            return;
        }
        tracing::warn!(handles = self.released.len(), "release of interop handles failed, retrying next batch");
        stats.release_failed = true;
        self.last_fault = Some(InteropError::BatchUnmapFailed {
            handles: self.released.len(),
        });
        self.release_queue.push_all(&mut self.released);
    }
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
