//! # Render Entities
//!
//! A render entity owns the map state of N storages and drives them through
//! one state machine for the whole entity:
//!
//! ```text
//!            map()                 distribute_interop_results()
//! UNMAPPED ────────► PENDING_MAP ───────────────────────────────► MAPPED
//!    ▲  │  (interop)                                  (all mapped)  │
//!    │  │                                                           │
//!    │  └──────────────────── map() (CPU, all mapped) ──────────────┤
//!    │                                                              │
//!    │      distribute_interop_results()             unmap()        │
//!    └────────────────────────────── PENDING_UNMAP ◄────────────────┘
//!    └─────────────── unmap() (CPU) ────────────────────────────────┘
//! ```
//!
//! Entities are shared between owners through [`EntityRef`], a counted
//! reference. The count and the map state live behind one per-entity lock;
//! teardown runs exactly once, after the lock is released.

mod backend;
mod lifecycle;

pub use backend::{RenderEntityBackend, StorageEntry};
pub use lifecycle::{DestroyPolicy, DropBackend, PooledReuse};

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use render_interop_core::{
    EntityId, InteropConfig, InteropDirection, InteropError, InteropHandle, InteropMode,
    InteropResult, RenderMapType,
};

use crate::interop::{InteropParticipant, ReleaseQueue};

/// Map state of a whole entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EntityMapState {
    /// Nothing mapped.
    #[default]
    Unmapped,
    /// Interop map requested, waiting for the batch phase.
    PendingMap,
    /// Every bound storage mapped through one of the two paths.
    Mapped,
    /// Interop unmap requested, waiting for the batch phase.
    PendingUnmap,
}

impl EntityMapState {
    /// Waiting for the batch phase.
    #[inline]
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::PendingMap | Self::PendingUnmap)
    }
}

/// State guarded by the per-entity lock.
struct EntityCore<B> {
    ref_count: i32,
    map_state: EntityMapState,
    /// `None` once the entity has been destroyed.
    backend: Option<B>,
    /// Handles the driver still has mapped but this entity gave up.
    released: Vec<InteropHandle>,
    /// Receives `released` at teardown, once the coordinator can no longer
    /// drain the entity.
    release_queue: Option<ReleaseQueue>,
    last_fault: Option<InteropError>,
}

impl<B> EntityCore<B> {
    fn transition(&mut self, id: EntityId, to: EntityMapState) {
        if self.map_state != to {
            tracing::debug!(entity = %id, from = ?self.map_state, to = ?to, "map state transition");
            self.map_state = to;
        }
    }
}

/// Reference-counted render entity.
///
/// Created through [`RenderEntity::builder`]; the creator receives the first
/// [`EntityRef`].
pub struct RenderEntity<B: RenderEntityBackend> {
    id: EntityId,
    interop_mode: InteropMode,
    map_type: RenderMapType,
    this: Weak<Self>,
    policy: Arc<dyn DestroyPolicy<B>>,
    core: Mutex<EntityCore<B>>,
}

impl<B: RenderEntityBackend> RenderEntity<B> {
    /// Starts building an entity around `backend`.
    #[must_use]
    pub fn builder(id: EntityId, backend: B) -> EntityBuilder<B> {
        EntityBuilder {
            id,
            backend,
            interop_mode: InteropMode::NoInterop,
            map_type: RenderMapType::WriteDiscard,
            policy: Arc::new(DropBackend),
        }
    }

    /// Creates an entity with the default map type and destroy policy.
    #[must_use]
    pub fn new(id: EntityId, interop_mode: InteropMode, backend: B) -> EntityRef<B> {
        Self::builder(id, backend).interop_mode(interop_mode).build()
    }

    /// Entity identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Interop mode, fixed at construction.
    #[inline]
    #[must_use]
    pub const fn interop_mode(&self) -> InteropMode {
        self.interop_mode
    }

    /// Current map state.
    #[must_use]
    pub fn map_state(&self) -> EntityMapState {
        self.core.lock().map_state
    }

    /// Current reference count.
    #[must_use]
    pub fn reference_count(&self) -> i32 {
        self.core.lock().ref_count
    }

    /// Last fault recovered by this entity.
    #[must_use]
    pub fn last_fault(&self) -> Option<InteropError> {
        self.core.lock().last_fault.clone()
    }

    /// Whether the backend has been torn down.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.core.lock().backend.is_none()
    }

    /// Runs `f` on the backend under the entity lock, e.g. to read mapped
    /// pointers while `Mapped`. Returns `None` once destroyed.
    ///
    /// The lock is not reentrant: `f` must not call back into this entity
    /// (`map_state`, `release`, dropping its last `EntityRef`, ...), or it
    /// deadlocks.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> Option<R> {
        self.core.lock().backend.as_mut().map(f)
    }

    /// Maps every storage.
    ///
    /// - `NoInterop`: maps synchronously; on any failure the storages
    ///   already mapped are unmapped and the entity stays `Unmapped`
    /// - `GpuInterop`: moves to `PendingMap`; the batch phase maps
    ///
    /// No-op unless `Unmapped`.
    pub fn map(&self) {
        let mut core = self.core.lock();
        if core.map_state != EntityMapState::Unmapped {
            return;
        }
        if self.interop_mode == InteropMode::GpuInterop {
            core.transition(self.id, EntityMapState::PendingMap);
            return;
        }

        let Some(backend) = core.backend.as_mut() else {
            return;
        };
        let failed = (0..backend.storage_count())
            .find(|&index| !map_slot_cpu(backend, index, self.map_type));
        match failed {
            None => core.transition(self.id, EntityMapState::Mapped),
            Some(storage) => {
                unmap_all_cpu(backend);
                tracing::warn!(entity = %self.id, storage, "CPU map failed, rolled back");
                core.last_fault = Some(InteropError::MapFailed {
                    entity: self.id,
                    storage,
                });
            }
        }
    }

    /// Unmaps every storage.
    ///
    /// - `NoInterop`: unmaps synchronously and moves to `Unmapped`
    /// - `GpuInterop`: moves to `PendingUnmap`; the batch phase unmaps
    ///
    /// No-op unless `Mapped`.
    pub fn unmap(&self) {
        let mut core = self.core.lock();
        if core.map_state != EntityMapState::Mapped {
            return;
        }
        if self.interop_mode == InteropMode::GpuInterop {
            core.transition(self.id, EntityMapState::PendingUnmap);
            return;
        }

        if let Some(backend) = core.backend.as_mut() {
            unmap_all_cpu(backend);
        }
        core.transition(self.id, EntityMapState::Unmapped);
    }

    /// Appends the interop handles this entity needs mapped or unmapped in
    /// the current batch. Only acts while pending; never changes map state.
    pub fn collect_handles_for_interop(
        &self,
        to_map: &mut Vec<InteropHandle>,
        to_unmap: &mut Vec<InteropHandle>,
    ) {
        let mut core = self.core.lock();
        let map_state = core.map_state;
        if !map_state.is_pending() {
            return;
        }
        let Some(backend) = core.backend.as_mut() else {
            return;
        };

        for index in 0..backend.storage_count() {
            let Some(entry) = backend.storage(index) else {
                continue;
            };
            if entry.interop != InteropMode::GpuInterop {
                continue;
            }
            let Some(handle) = entry.state.acquire_interop_handle(entry.storage) else {
                tracing::trace!(entity = %self.id, storage = index, "no interop handle this cycle");
                continue;
            };
            let interop_mapped = entry.state.is_interop_mapped();
            match map_state {
                EntityMapState::PendingMap if !interop_mapped => to_map.push(handle),
                EntityMapState::PendingUnmap if interop_mapped => to_unmap.push(handle),
                _ => {}
            }
        }
    }

    /// Applies the batch outcome and closes the pending window: a
    /// `PendingMap` entity ends `Mapped` or `Unmapped`, a `PendingUnmap`
    /// entity ends `Unmapped`.
    ///
    /// Storages the interop path could not map fall back to the CPU path one
    /// by one. Only acts while pending.
    pub fn distribute_interop_results(&self, map_succeeded: bool, unmap_succeeded: bool) {
        let mut core = self.core.lock();
        let map_state = core.map_state;
        match map_state {
            EntityMapState::PendingMap => self.finish_pending_map(&mut core, map_succeeded),
            EntityMapState::PendingUnmap => self.finish_pending_unmap(&mut core, unmap_succeeded),
            EntityMapState::Unmapped | EntityMapState::Mapped => {}
        }
    }

    fn finish_pending_map(&self, core: &mut EntityCore<B>, map_succeeded: bool) {
        let EntityCore {
            backend,
            released,
            last_fault,
            ..
        } = &mut *core;
        let Some(backend) = backend.as_mut() else {
            core.transition(self.id, EntityMapState::Unmapped);
            return;
        };

        let mut all_mapped = true;
        for index in 0..backend.storage_count() {
            let wants_interop = {
                let Some(entry) = backend.storage(index) else {
                    continue;
                };
                if entry
                    .state
                    .note_interop_result(entry.storage, map_succeeded, InteropDirection::Map)
                {
                    continue;
                }
                // Mapped by the driver but no usable device address.
                if let Some(handle) = entry.state.release_interop_mapping() {
                    released.push(handle);
                }
                entry.interop == InteropMode::GpuInterop
            };

            if wants_interop {
                tracing::debug!(entity = %self.id, storage = index, "interop map unavailable, falling back to CPU");
                *last_fault = Some(InteropError::InteropUnavailable {
                    entity: self.id,
                    storage: index,
                });
            }
            if all_mapped && !map_slot_cpu(backend, index, self.map_type) {
                all_mapped = false;
                *last_fault = Some(InteropError::MapFailed {
                    entity: self.id,
                    storage: index,
                });
            }
        }

        if all_mapped {
            core.transition(self.id, EntityMapState::Mapped);
        } else {
            tracing::warn!(entity = %self.id, "CPU fallback failed, rolled back");
            unmap_all(backend, released);
            core.transition(self.id, EntityMapState::Unmapped);
        }
    }

    fn finish_pending_unmap(&self, core: &mut EntityCore<B>, unmap_succeeded: bool) {
        let EntityCore {
            backend,
            released,
            last_fault,
            ..
        } = &mut *core;
        let before = released.len();
        if let Some(backend) = backend.as_mut() {
            for index in 0..backend.storage_count() {
                if let Some(entry) = backend.storage(index) {
                    entry
                        .state
                        .note_interop_result(entry.storage, unmap_succeeded, InteropDirection::Unmap);
                }
            }
            // Whatever the driver did not unmap is handed back for retry.
            unmap_all(backend, released);
        }
        let retried = released.len() - before;
        if retried > 0 {
            tracing::warn!(entity = %self.id, retried, "interop unmap incomplete, forced unmapped");
            *last_fault = Some(InteropError::BatchUnmapFailed { handles: retried });
        }
        core.transition(self.id, EntityMapState::Unmapped);
    }

    /// Hands over the interop handles this entity gave up while the driver
    /// still had them mapped.
    pub fn drain_released_handles(&self, out: &mut Vec<InteropHandle>) {
        out.append(&mut self.core.lock().released);
    }

    /// Force-unmaps every storage and resets to `Unmapped`, bypassing the
    /// pending choreography. Used during teardown.
    ///
    /// Interop mappings are handed back to the driver by the next batch.
    pub fn free(&self) {
        let mut core = self.core.lock();
        self.free_locked(&mut core);
    }

    fn free_locked(&self, core: &mut EntityCore<B>) {
        let EntityCore {
            backend, released, ..
        } = &mut *core;
        if let Some(backend) = backend.as_mut() {
            for index in 0..backend.storage_count() {
                if let Some(entry) = backend.storage(index) {
                    entry.state.reset_interop_handle();
                }
            }
            unmap_all(backend, released);
        }
        core.transition(self.id, EntityMapState::Unmapped);
    }

    /// Takes another reference. Returns `None` once the count reached zero,
    /// so an entity being destroyed is never resurrected.
    #[must_use]
    pub fn increment_reference_count(&self) -> Option<EntityRef<B>> {
        let entity = self.this.upgrade()?;
        if !self.try_retain() {
            return None;
        }
        Some(EntityRef {
            entity,
            armed: true,
        })
    }

    /// Like [`Self::increment_reference_count`], reporting the failure.
    ///
    /// # Errors
    ///
    /// Returns `RefCountMisuse` when the count already reached zero.
    pub fn try_increment_reference_count(&self) -> InteropResult<EntityRef<B>> {
        self.increment_reference_count()
            .ok_or(InteropError::RefCountMisuse(self.id))
    }

    fn try_retain(&self) -> bool {
        let mut core = self.core.lock();
        if core.ref_count > 0 {
            core.ref_count += 1;
            true
        } else {
            false
        }
    }

    /// Drops one reference. The call that takes the count to zero destroys
    /// the entity after the lock is released; further calls are no-ops.
    pub fn release(&self) {
        let trigger_destroy = {
            let mut core = self.core.lock();
            if core.ref_count > 0 {
                core.ref_count -= 1;
                core.ref_count == 0
            } else {
                false
            }
        };
        if trigger_destroy {
            self.destroy();
        }
    }

    fn destroy(&self) {
        let (backend, mut released, release_queue) = {
            let mut core = self.core.lock();
            debug_assert_eq!(core.ref_count, 0);
            self.free_locked(&mut core);
            (
                core.backend.take(),
                std::mem::take(&mut core.released),
                core.release_queue.take(),
            )
        };
        if !released.is_empty() {
            match release_queue {
                Some(queue) => queue.push_all(&mut released),
                None => tracing::warn!(
                    entity = %self.id,
                    dropped = released.len(),
                    "interop mappings dropped at teardown, entity was never registered"
                ),
            }
        }
        if let Some(backend) = backend {
            self.policy.destroy(self.id, backend);
            tracing::debug!(entity = %self.id, "entity destroyed");
        }
    }
}

impl<B: RenderEntityBackend> fmt::Debug for RenderEntity<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.lock();
        f.debug_struct("RenderEntity")
            .field("id", &self.id)
            .field("interop_mode", &self.interop_mode)
            .field("map_state", &core.map_state)
            .field("ref_count", &core.ref_count)
            .finish_non_exhaustive()
    }
}

impl<B: RenderEntityBackend> InteropParticipant for RenderEntity<B> {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn is_pending(&self) -> bool {
        self.map_state().is_pending()
    }

    fn try_retain(&self) -> bool {
        RenderEntity::try_retain(self)
    }

    fn release(&self) {
        RenderEntity::release(self);
    }

    fn collect_handles_for_interop(
        &self,
        to_map: &mut Vec<InteropHandle>,
        to_unmap: &mut Vec<InteropHandle>,
    ) {
        RenderEntity::collect_handles_for_interop(self, to_map, to_unmap);
    }

    fn distribute_interop_results(&self, map_succeeded: bool, unmap_succeeded: bool) {
        RenderEntity::distribute_interop_results(self, map_succeeded, unmap_succeeded);
    }

    fn drain_released_handles(&self, out: &mut Vec<InteropHandle>) {
        RenderEntity::drain_released_handles(self, out);
    }

    fn attach_release_queue(&self, queue: ReleaseQueue) {
        let mut core = self.core.lock();
        if core
            .release_queue
            .as_ref()
            .is_some_and(|attached| !attached.same_queue(&queue))
        {
            tracing::debug!(entity = %self.id, "entity moved to another coordinator");
        }
        core.release_queue = Some(queue);
    }
}

/// Maps slot `index` through the CPU path. Unbound slots count as mapped.
fn map_slot_cpu<B: RenderEntityBackend>(backend: &mut B, index: usize, map_type: RenderMapType) -> bool {
    if backend.storage(index).is_none() {
        return true;
    }
    backend.on_map_storage(index);
    backend
        .storage(index)
        .map_or(true, |entry| entry.state.map_cpu(entry.storage, map_type))
}

fn unmap_all_cpu<B: RenderEntityBackend>(backend: &mut B) {
    for index in 0..backend.storage_count() {
        if let Some(entry) = backend.storage(index) {
            entry.state.unmap_cpu(entry.storage);
        }
    }
}

/// CPU-unmaps every storage and gives up every interop mapping.
fn unmap_all<B: RenderEntityBackend>(backend: &mut B, released: &mut Vec<InteropHandle>) {
    for index in 0..backend.storage_count() {
        if let Some(entry) = backend.storage(index) {
            entry.state.unmap_cpu(entry.storage);
            if let Some(handle) = entry.state.release_interop_mapping() {
                released.push(handle);
            }
        }
    }
}

/// Builder for [`RenderEntity`].
pub struct EntityBuilder<B: RenderEntityBackend> {
    id: EntityId,
    backend: B,
    interop_mode: InteropMode,
    map_type: RenderMapType,
    policy: Arc<dyn DestroyPolicy<B>>,
}

impl<B: RenderEntityBackend> EntityBuilder<B> {
    /// Interop mode for the whole entity.
    #[must_use]
    pub fn interop_mode(mut self, interop_mode: InteropMode) -> Self {
        self.interop_mode = interop_mode;
        self
    }

    /// Map type used for CPU mapping.
    #[must_use]
    pub fn map_type(mut self, map_type: RenderMapType) -> Self {
        self.map_type = map_type;
        self
    }

    /// Teardown policy run once the last reference is released.
    #[must_use]
    pub fn destroy_policy(mut self, policy: Arc<dyn DestroyPolicy<B>>) -> Self {
        self.policy = policy;
        self
    }

    /// Applies the map type and the interop availability from `config`.
    /// Call after [`Self::interop_mode`].
    #[must_use]
    pub fn config(mut self, config: &InteropConfig) -> Self {
        self.interop_mode = config.resolve_mode(self.interop_mode);
        self.map_type = config.map_type;
        self
    }

    /// Creates the entity. The returned reference is the creator's.
    #[must_use]
    pub fn build(self) -> EntityRef<B> {
        let entity = Arc::new_cyclic(|this| RenderEntity {
            id: self.id,
            interop_mode: self.interop_mode,
            map_type: self.map_type,
            this: this.clone(),
            policy: self.policy,
            core: Mutex::new(EntityCore {
                ref_count: 1,
                map_state: EntityMapState::Unmapped,
                backend: Some(self.backend),
                released: Vec::new(),
                release_queue: None,
                last_fault: None,
            }),
        });
        tracing::debug!(entity = %self.id, interop_mode = ?self.interop_mode, "entity created");
        EntityRef {
            entity,
            armed: true,
        }
    }
}

/// Counted reference to a render entity. Dropping it releases the reference.
pub struct EntityRef<B: RenderEntityBackend> {
    entity: Arc<RenderEntity<B>>,
    armed: bool,
}

impl<B: RenderEntityBackend> EntityRef<B> {
    /// Releases this reference now.
    pub fn release(self) {
        drop(self);
    }

    /// Gives up automatic release. The caller now owns this reference and
    /// must call [`RenderEntity::release`] exactly once for it.
    #[must_use]
    pub fn detach(mut self) -> Arc<RenderEntity<B>> {
        self.armed = false;
        Arc::clone(&self.entity)
    }

    /// The shared entity, without taking a reference.
    #[must_use]
    pub fn shared(&self) -> &Arc<RenderEntity<B>> {
        &self.entity
    }
}

impl<B: RenderEntityBackend> Deref for EntityRef<B> {
    type Target = RenderEntity<B>;

    fn deref(&self) -> &Self::Target {
        &self.entity
    }
}

impl<B: RenderEntityBackend> Clone for EntityRef<B> {
    fn clone(&self) -> Self {
        let retained = self.entity.try_retain();
        debug_assert!(retained, "live reference to a destroyed entity");
        Self {
            entity: Arc::clone(&self.entity),
            armed: retained,
        }
    }
}

impl<B: RenderEntityBackend> Drop for EntityRef<B> {
    fn drop(&mut self) {
        if self.armed {
            self.entity.release();
        }
    }
}

impl<B: RenderEntityBackend> fmt::Debug for EntityRef<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.entity, f)
    }
}
