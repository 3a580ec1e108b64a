/// Mock backend for unit tests (no GPU required)
///
/// Buffers keep their storage in host memory and report every reserve, map,
/// unmap and discard to a shared ledger, so tests can observe that mappings
/// are released on every path. Failures are injected through the ledger.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::FxHashMap;

use crate::backend::{BufferId, IndexBuffer, IndexBufferFactory, Serial};
use crate::bridge_bail;
use crate::error::Result;
use crate::format::IndexType;
use crate::source::SourceBuffer;
use crate::static_cache::StaticIndexCache;

const SOURCE: &str = "index_bridge::mock_backend";

// ============================================================================
// Ledger
// ============================================================================

/// Shared record of backend activity plus failure switches
#[derive(Debug, Default)]
pub struct MockLedger {
    pub creates: u32,
    pub reserves: u32,
    pub maps: u32,
    pub unmaps: u32,
    pub discards: u32,

    pub fail_create: bool,
    pub fail_reserve: bool,
    pub fail_map: bool,
    pub fail_unmap: bool,
    pub map_returns_none: bool,

    /// Buffer contents as of their last unmap
    pub contents: FxHashMap<BufferId, Vec<u8>>,
}

impl MockLedger {
    /// Mappings not yet released
    pub fn open_mappings(&self) -> u32 {
        self.maps - self.unmaps
    }

    /// `count` elements of `T` at byte `offset` of the buffer's last unmapped contents
    pub fn read<T: bytemuck::Pod>(&self, buffer: BufferId, offset: u32, count: u32) -> Vec<T> {
        let bytes = &self.contents[&buffer];
        let start = offset as usize;
        let width = std::mem::size_of::<T>();
        let end = start + count as usize * width;
        bytes[start..end].chunks_exact(width).map(bytemuck::pod_read_unaligned).collect()
    }
}

// ============================================================================
// Mock Index Buffer
// ============================================================================

pub struct MockIndexBuffer {
    id: BufferId,
    serial: Serial,
    index_type: Option<IndexType>,
    storage: Vec<u8>,
    mapped: Option<(usize, usize)>,
    ledger: Arc<Mutex<MockLedger>>,
}

impl MockIndexBuffer {
    pub fn new(ledger: Arc<Mutex<MockLedger>>) -> Self {
        Self {
            id: BufferId::allocate(),
            serial: Serial::issue(),
            index_type: None,
            storage: Vec::new(),
            mapped: None,
            ledger,
        }
    }

    fn ledger(&self) -> MutexGuard<'_, MockLedger> {
        self.ledger.lock().unwrap()
    }
}

impl IndexBuffer for MockIndexBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn serial(&self) -> Serial {
        self.serial
    }

    fn size(&self) -> u32 {
        self.storage.len() as u32
    }

    fn index_type(&self) -> Option<IndexType> {
        self.index_type
    }

    fn reserve(&mut self, size: u32, index_type: IndexType) -> Result<()> {
        let fail = {
            let mut ledger = self.ledger();
            ledger.reserves += 1;
            ledger.fail_reserve
        };
        if fail {
            bridge_bail!(SOURCE, OutOfMemory, "Mock allocation of {} bytes refused", size);
        }

        if size as usize > self.storage.len() || self.index_type != Some(index_type) {
            self.storage = vec![0; size as usize];
            self.index_type = Some(index_type);
            self.serial = Serial::issue();
        }
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        self.ledger().discards += 1;
        self.serial = Serial::issue();
        Ok(())
    }

    fn map(&mut self, offset: u32, size: u32) -> Result<()> {
        if self.ledger().fail_map {
            bridge_bail!(SOURCE, MappingFailure, "Mock map of {} bytes refused", size);
        }
        let start = offset as usize;
        let end = start + size as usize;
        if end > self.storage.len() {
            bridge_bail!(SOURCE, MappingFailure,
                "Mock map [{}, {}) outside {} bytes", start, end, self.storage.len());
        }
        self.mapped = Some((start, end));
        self.ledger().maps += 1;
        Ok(())
    }

    fn mapped_bytes(&mut self) -> Option<&mut [u8]> {
        if self.ledger().map_returns_none {
            return None;
        }
        let (start, end) = self.mapped?;
        Some(&mut self.storage[start..end])
    }

    fn unmap(&mut self) -> Result<()> {
        if self.mapped.take().is_none() {
            bridge_bail!(SOURCE, BackendError, "Mock buffer {:?} is not mapped", self.id);
        }
        let fail = {
            let mut ledger = self.ledger();
            ledger.unmaps += 1;
            ledger.contents.insert(self.id, self.storage.clone());
            ledger.fail_unmap
        };
        if fail {
            bridge_bail!(SOURCE, BackendError, "Mock unmap refused");
        }
        Ok(())
    }
}

// ============================================================================
// Mock Buffer Factory
// ============================================================================

pub struct MockBufferFactory {
    ledger: Arc<Mutex<MockLedger>>,
}

impl MockBufferFactory {
    pub fn new() -> Self {
        Self { ledger: Arc::new(Mutex::new(MockLedger::default())) }
    }

    /// Handle on the ledger shared by every buffer this factory created
    pub fn shared_ledger(&self) -> Arc<Mutex<MockLedger>> {
        self.ledger.clone()
    }

    pub fn ledger(&self) -> MutexGuard<'_, MockLedger> {
        self.ledger.lock().unwrap()
    }
}

impl IndexBufferFactory for MockBufferFactory {
    fn create_index_buffer(&self) -> Result<Box<dyn IndexBuffer>> {
        let fail = {
            let mut ledger = self.ledger();
            ledger.creates += 1;
            ledger.fail_create
        };
        if fail {
            bridge_bail!(SOURCE, OutOfMemory, "Mock buffer creation refused");
        }
        Ok(Box::new(MockIndexBuffer::new(self.ledger.clone())))
    }
}

// ============================================================================
// Mock Source Buffer
// ============================================================================

pub struct MockSourceBuffer {
    id: BufferId,
    serial: Serial,
    data: Vec<u8>,
    direct_binding: bool,
    cache: Option<StaticIndexCache>,
    pub fail_read_back: bool,
    pub read_backs: AtomicU32,
    pub streaming_hints: Vec<u32>,
}

impl MockSourceBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            id: BufferId::allocate(),
            serial: Serial::issue(),
            data,
            direct_binding: false,
            cache: None,
            fail_read_back: false,
            read_backs: AtomicU32::new(0),
            streaming_hints: Vec::new(),
        }
    }

    pub fn from_indices<T: bytemuck::Pod>(indices: &[T]) -> Self {
        Self::new(bytemuck::cast_slice(indices).to_vec())
    }

    pub fn with_direct_binding(mut self) -> Self {
        self.direct_binding = true;
        self
    }

    pub fn with_static_cache(mut self) -> Self {
        self.cache = Some(StaticIndexCache::new());
        self
    }

    /// Overwrite bytes at `offset`, starting a new contents generation
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.serial = Serial::issue();
        self.invalidate_static_cache();
    }

    pub fn read_back_count(&self) -> u32 {
        self.read_backs.load(Ordering::Relaxed)
    }

    fn read_back_checked(&self) -> Result<()> {
        self.read_backs.fetch_add(1, Ordering::Relaxed);
        if self.fail_read_back {
            bridge_bail!(SOURCE, ReadBackFailure, "Mock buffer {:?} refused read-back", self.id);
        }
        Ok(())
    }
}

impl SourceBuffer for MockSourceBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn serial(&self) -> Serial {
        self.serial
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn supports_direct_binding(&self) -> bool {
        self.direct_binding
    }

    fn read_back(&self) -> Result<&[u8]> {
        self.read_back_checked()?;
        Ok(&self.data)
    }

    fn static_cache(&self) -> Option<&StaticIndexCache> {
        self.cache.as_ref()
    }

    fn read_back_with_static_cache(&mut self) -> Result<(&[u8], Option<&mut StaticIndexCache>)> {
        self.read_back_checked()?;
        Ok((&self.data, self.cache.as_mut()))
    }

    fn attach_static_cache(&mut self, cache: StaticIndexCache) {
        self.cache = Some(cache);
    }

    fn invalidate_static_cache(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.invalidate();
        }
    }

    fn notify_repeated_streaming_use(&mut self, size_hint: u32) {
        self.streaming_hints.push(size_hint);
    }
}
