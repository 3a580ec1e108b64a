/// Host heap - backend-visible storage of the host backend
///
/// Plays the role of device memory: every bindable buffer (translated index
/// buffers and directly bindable source buffers) publishes its contents here,
/// and draws read from here. Contents written through a mapping become
/// visible on unmap.

use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use index_bridge::bridge::{BufferId, Result};
use index_bridge::{bridge_bail, bridge_err};

const SOURCE: &str = "index_bridge_host::heap";

/// Shared map of buffer id to published contents
#[derive(Clone, Default)]
pub struct HostHeap {
    allocations: Arc<Mutex<FxHashMap<BufferId, Vec<u8>>>>,
}

impl HostHeap {
    fn lock(&self) -> Result<MutexGuard<'_, FxHashMap<BufferId, Vec<u8>>>> {
        self.allocations
            .lock()
            .map_err(|_| bridge_err!(SOURCE, BackendError, "Host heap lock poisoned"))
    }

    /// (Re)allocate `size` zeroed bytes for `buffer`
    pub fn allocate(&self, buffer: BufferId, size: usize) -> Result<()> {
        let mut storage = Vec::new();
        if storage.try_reserve_exact(size).is_err() {
            bridge_bail!(SOURCE, OutOfMemory, "Host heap cannot allocate {} bytes", size);
        }
        storage.resize(size, 0);
        self.lock()?.insert(buffer, storage);
        Ok(())
    }

    /// Replace the whole contents of `buffer`
    pub fn publish(&self, buffer: BufferId, contents: &[u8]) -> Result<()> {
        self.lock()?.insert(buffer, contents.to_vec());
        Ok(())
    }

    /// Copy `bytes` into `buffer` at `offset`
    pub fn write(&self, buffer: BufferId, offset: usize, bytes: &[u8]) -> Result<()> {
        let mut allocations = self.lock()?;
        let Some(storage) = allocations.get_mut(&buffer) else {
            bridge_bail!(SOURCE, InvalidResource, "Buffer {:?} has no host allocation", buffer);
        };
        let Some(target) = storage.get_mut(offset..offset + bytes.len()) else {
            bridge_bail!(SOURCE, InvalidResource,
                "Write of {} bytes at offset {} exceeds buffer {:?}", bytes.len(), offset, buffer);
        };
        target.copy_from_slice(bytes);
        Ok(())
    }

    /// Copy `len` bytes of `buffer` starting at `offset`
    pub fn read(&self, buffer: BufferId, offset: usize, len: usize) -> Result<Vec<u8>> {
        let allocations = self.lock()?;
        let Some(storage) = allocations.get(&buffer) else {
            bridge_bail!(SOURCE, InvalidResource, "Buffer {:?} has no host allocation", buffer);
        };
        match storage.get(offset..offset + len) {
            Some(bytes) => Ok(bytes.to_vec()),
            None => Err(bridge_err!(SOURCE, InvalidResource,
                "Read of {} bytes at offset {} exceeds buffer {:?} ({} bytes)",
                len, offset, buffer, storage.len())),
        }
    }

    /// Drop the allocation of `buffer`
    pub fn release(&self, buffer: BufferId) {
        // Don't fail on a poisoned lock, the allocation just stays behind
        if let Ok(mut allocations) = self.allocations.lock() {
            allocations.remove(&buffer);
        }
    }

    /// Number of live allocations
    pub fn allocation_count(&self) -> usize {
        self.allocations.lock().map_or(0, |allocations| allocations.len())
    }
}
