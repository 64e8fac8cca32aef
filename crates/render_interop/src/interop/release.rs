//! Handles given up by torn-down entities.

use std::sync::Arc;

use parking_lot::Mutex;
use render_interop_core::InteropHandle;

/// Shared queue of interop handles the driver still holds mapped but whose
/// entity no longer exists.
///
/// Owned by the coordinator and handed to every entity it registers, so a
/// teardown outside the batch phase can still return its mappings.
#[derive(Clone, Default)]
pub struct ReleaseQueue {
    handles: Arc<Mutex<Vec<InteropHandle>>>,
}

impl ReleaseQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `handles` into the queue.
    pub fn push_all(&self, handles: &mut Vec<InteropHandle>) {
        if handles.is_empty() {
            return;
        }
        self.handles.lock().append(handles);
    }

    /// Moves every queued handle into `out`.
    pub fn drain_into(&self, out: &mut Vec<InteropHandle>) {
        out.append(&mut self.handles.lock());
    }

    /// Number of queued handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    /// True if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }

    /// True if both refer to the same queue.
    #[must_use]
    pub fn same_queue(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handles, &other.handles)
    }
}

impl std::fmt::Debug for ReleaseQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseQueue")
            .field("len", &self.len())
            .finish()
    }
}
