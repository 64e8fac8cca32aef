//! # Batched GPU Interop
//!
//! Interop map/unmap requests of every entity are gathered once per frame
//! and handed to the compute driver in one map call and one unmap call:
//!
//! ```text
//! Entity phase (any thread)        Batch phase (one thread)
//! ┌───────────────────────┐        ┌──────────────────────────────┐
//! │ entity.map()   ──► PendingMap  │ collect ──► [h0 h1 h2 ...]   │
//! │ entity.unmap() ──► PendingUnmap│ driver.map / driver.unmap    │
//! └───────────────────────┘        │ distribute ──► Mapped/Unmapped│
//!                                  └──────────────────────────────┘
//! ```

mod coordinator;
mod driver;
mod release;
mod stats;

pub use coordinator::InteropBatchCoordinator;
pub use driver::{InteropDriver, NoInteropDriver};
pub use release::ReleaseQueue;
pub use stats::{BatchStats, CoordinatorStats};

use render_interop_core::{EntityId, InteropHandle};

/// An entity as seen by the batch coordinator.
///
/// The coordinator pins a participant with [`try_retain`](Self::try_retain)
/// before touching it and unpins it with [`release`](Self::release)
/// afterwards, so destroyed entities never take part in a batch.
pub trait InteropParticipant: Send + Sync {
    /// Identifier for diagnostics.
    fn entity_id(&self) -> EntityId;

    /// Waiting for the batch phase.
    fn is_pending(&self) -> bool;

    /// Takes a reference unless the count already reached zero.
    fn try_retain(&self) -> bool;

    /// Drops a reference taken with [`try_retain`](Self::try_retain).
    fn release(&self);

    /// Appends handles to map and to unmap this frame.
    fn collect_handles_for_interop(
        &self,
        to_map: &mut Vec<InteropHandle>,
        to_unmap: &mut Vec<InteropHandle>,
    );

    /// Applies the outcome of the batch driver calls.
    fn distribute_interop_results(&self, map_succeeded: bool, unmap_succeeded: bool);

    /// Moves handles the entity gave up while still driver-mapped into `out`.
    fn drain_released_handles(&self, out: &mut Vec<InteropHandle>);

    /// Where teardown puts the handles it gives up. Replaces any queue
    /// attached before.
    fn attach_release_queue(&self, queue: ReleaseQueue);
}
