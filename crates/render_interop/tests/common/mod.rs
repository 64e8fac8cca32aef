//! Mock storages, a scripted driver and a counting destroy policy.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use render_interop::{
    DestroyPolicy, DeviceAddress, EntityId, InteropCapableStorage, InteropDriver, InteropHandle,
    MapRange, MappedPtr, MappedRegion, RenderEntityBackend, RenderMapType, RenderStorage,
    StorageType,
};

/// Storage whose behaviour is switched at runtime.
pub struct MockStorage {
    kind: StorageType,
    handle: Option<InteropHandle>,
    fail_map: AtomicBool,
    resolves: AtomicBool,
    cpu_mapped: AtomicBool,
    maps: AtomicU32,
    unmaps: AtomicU32,
    ranges: Mutex<Vec<MapRange>>,
    bytes: Mutex<Vec<u8>>,
}

impl MockStorage {
    fn with(kind: StorageType, handle: Option<InteropHandle>) -> Self {
        Self {
            kind,
            handle,
            fail_map: AtomicBool::new(false),
            resolves: AtomicBool::new(true),
            cpu_mapped: AtomicBool::new(false),
            maps: AtomicU32::new(0),
            unmaps: AtomicU32::new(0),
            ranges: Mutex::new(Vec::new()),
            bytes: Mutex::new(vec![0; 1024]),
        }
    }

    /// CPU-only buffer.
    pub fn buffer() -> Arc<Self> {
        Arc::new(Self::with(StorageType::Buffer, None))
    }

    /// Interop-capable buffer shared under handle `raw`.
    pub fn interop_buffer(raw: u64) -> Arc<Self> {
        Arc::new(Self::with(StorageType::Buffer, InteropHandle::from_raw(raw)))
    }

    /// Interop-capable surface shared under handle `raw`.
    pub fn interop_surface(raw: u64) -> Arc<Self> {
        Arc::new(Self::with(StorageType::Surface, InteropHandle::from_raw(raw)))
    }

    pub fn set_fail_map(&self, fail: bool) {
        self.fail_map.store(fail, Ordering::SeqCst);
    }

    pub fn set_resolves(&self, resolves: bool) {
        self.resolves.store(resolves, Ordering::SeqCst);
    }

    pub fn handle(&self) -> InteropHandle {
        self.handle.expect("storage is not interop-capable")
    }

    pub fn is_cpu_mapped(&self) -> bool {
        self.cpu_mapped.load(Ordering::SeqCst)
    }

    pub fn maps(&self) -> u32 {
        self.maps.load(Ordering::SeqCst)
    }

    pub fn unmaps(&self) -> u32 {
        self.unmaps.load(Ordering::SeqCst)
    }

    pub fn ranges(&self) -> Vec<MapRange> {
        self.ranges.lock().unwrap().clone()
    }
}

impl RenderStorage for MockStorage {
    fn storage_type(&self) -> StorageType {
        self.kind
    }

    fn map(&self, _map_type: RenderMapType, range: MapRange) -> Option<MappedRegion> {
        self.maps.fetch_add(1, Ordering::SeqCst);
        self.ranges.lock().unwrap().push(range);
        if self.fail_map.load(Ordering::SeqCst) {
            return None;
        }
        assert!(
            !self.cpu_mapped.swap(true, Ordering::SeqCst),
            "storage mapped twice"
        );
        let ptr = MappedPtr::new(self.bytes.lock().unwrap().as_mut_ptr())?;
        Some(match self.kind {
            StorageType::Buffer => MappedRegion::linear(ptr),
            StorageType::Surface => MappedRegion {
                ptr,
                row_pitch: 64,
                depth_pitch: 1024,
            },
        })
    }

    fn unmap(&self) {
        self.unmaps.fetch_add(1, Ordering::SeqCst);
        assert!(
            self.cpu_mapped.swap(false, Ordering::SeqCst),
            "storage unmapped twice"
        );
    }

    fn as_interop(&self) -> Option<&dyn InteropCapableStorage> {
        self.handle.is_some().then_some(self as &dyn InteropCapableStorage)
    }
}

impl InteropCapableStorage for MockStorage {
    fn acquire_interop_handle(&self) -> Option<InteropHandle> {
        self.handle
    }

    fn resolve_mapped_pointer(&self, handle: InteropHandle) -> Option<DeviceAddress> {
        if !self.resolves.load(Ordering::SeqCst) {
            return None;
        }
        Some(match self.kind {
            StorageType::Buffer => DeviceAddress::Pointer(0x1000_0000 + handle.raw()),
            StorageType::Surface => DeviceAddress::Array(handle.raw()),
        })
    }
}

/// One driver call as seen by [`ScriptedDriver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverCall {
    Map(Vec<InteropHandle>),
    Unmap(Vec<InteropHandle>),
}

/// Driver answering from a script, tracking what it holds mapped.
///
/// Calls beyond the script succeed.
#[derive(Default)]
pub struct ScriptedDriver {
    pub map_results: VecDeque<bool>,
    pub unmap_results: VecDeque<bool>,
    pub calls: Vec<DriverCall>,
    pub mapped: HashSet<InteropHandle>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_map(&mut self) {
        self.map_results.push_back(false);
    }

    pub fn fail_next_unmap(&mut self) {
        self.unmap_results.push_back(false);
    }
}

impl InteropDriver for ScriptedDriver {
    fn map_resources(&mut self, handles: &[InteropHandle]) -> bool {
        self.calls.push(DriverCall::Map(handles.to_vec()));
        let ok = self.map_results.pop_front().unwrap_or(true);
        if ok {
            for handle in handles {
                assert!(self.mapped.insert(*handle), "handle mapped twice");
            }
        }
        ok
    }

    fn unmap_resources(&mut self, handles: &[InteropHandle]) -> bool {
        self.calls.push(DriverCall::Unmap(handles.to_vec()));
        let ok = self.unmap_results.pop_front().unwrap_or(true);
        if ok {
            for handle in handles {
                self.mapped.remove(handle);
            }
        }
        ok
    }
}

/// Counts teardowns per entity.
#[derive(Default)]
pub struct CountingPolicy {
    destroyed: Mutex<Vec<EntityId>>,
}

impl CountingPolicy {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn destroyed(&self) -> Vec<EntityId> {
        self.destroyed.lock().unwrap().clone()
    }
}

impl<B: RenderEntityBackend> DestroyPolicy<B> for CountingPolicy {
    fn destroy(&self, id: EntityId, backend: B) {
        drop(backend);
        self.destroyed.lock().unwrap().push(id);
    }
}
