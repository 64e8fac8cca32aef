//! Compute driver batch API.

use render_interop_core::InteropHandle;

/// Batched map/unmap of interop handles in the compute driver.
///
/// Each call carries a high fixed cost in the driver, so the coordinator
/// issues at most one map and one unmap call per frame. Both calls are
/// all-or-nothing as far as the interop layer is concerned.
pub trait InteropDriver {
    /// Maps every handle in `handles`. Returns `false` if the call failed.
    fn map_resources(&mut self, handles: &[InteropHandle]) -> bool;

    /// Unmaps every handle in `handles`. Returns `false` if the call failed.
    fn unmap_resources(&mut self, handles: &[InteropHandle]) -> bool;
}

/// Driver for CPU-only backends: any non-empty request fails, which sends
/// every storage down the CPU fallback path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInteropDriver;

impl InteropDriver for NoInteropDriver {
    fn map_resources(&mut self, handles: &[InteropHandle]) -> bool {
        handles.is_empty()
    }

    fn unmap_resources(&mut self, handles: &[InteropHandle]) -> bool {
        handles.is_empty()
    }
}

impl<D: InteropDriver + ?Sized> InteropDriver for Box<D> {
    fn map_resources(&mut self, handles: &[InteropHandle]) -> bool {
        (**self).map_resources(handles)
    }

    fn unmap_resources(&mut self, handles: &[InteropHandle]) -> bool {
        (**self).unmap_resources(handles)
    }
}
