/// SourceBuffer - host memory backing buffer with static cache promotion

use index_bridge::bridge::{BufferId, Result, Serial, SourceBuffer, StaticIndexCache};
use index_bridge::{bridge_bail, bridge_debug, bridge_info};

use crate::host_heap::HostHeap;

const SOURCE: &str = "index_bridge_host::source_buffer";

/// Number of buffer sizes that must be streamed out of an unmodified buffer
/// before it gets a static cache
pub const PROMOTION_FACTOR: u64 = 3;

/// Expected update frequency of a source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    /// Written once, drawn many times: gets a static cache up front
    Static,
    /// Updated often: streamed until repeated unmodified use promotes it
    #[default]
    Dynamic,
}

/// Host memory backing buffer
pub struct HostSourceBuffer {
    id: BufferId,
    serial: Serial,
    data: Vec<u8>,
    direct_binding: bool,
    cache: Option<StaticIndexCache>,
    /// Bytes streamed out of this buffer since its last modification
    unmodified_use: u64,
    heap: HostHeap,
}

impl HostSourceBuffer {
    pub(crate) fn new(heap: HostHeap, data: Vec<u8>, usage: BufferUsage, direct_binding: bool) -> Result<Self> {
        let id = BufferId::allocate();
        if direct_binding {
            heap.publish(id, &data)?;
        }
        Ok(Self {
            id,
            serial: Serial::issue(),
            data,
            direct_binding,
            cache: match usage {
                BufferUsage::Static => Some(StaticIndexCache::new()),
                BufferUsage::Dynamic => None,
            },
            unmodified_use: 0,
            heap,
        })
    }

    /// Bytes streamed since the last modification
    pub fn unmodified_use(&self) -> u64 {
        self.unmodified_use
    }

    /// Overwrite `bytes.len()` bytes at `offset`
    ///
    /// # Errors
    ///
    /// `InvalidResource` if the write runs past the end of the buffer.
    pub fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        let start = offset as usize;
        let Some(target) = self.data.get_mut(start..start + bytes.len()) else {
            bridge_bail!(SOURCE, InvalidResource,
                "Write of {} bytes at offset {} exceeds buffer {:?} ({} bytes)",
                bytes.len(), offset, self.id, self.data.len());
        };
        target.copy_from_slice(bytes);
        if self.direct_binding {
            self.heap.write(self.id, start, bytes)?;
        }
        self.contents_changed();
        Ok(())
    }

    /// Replace the whole contents (the size may change)
    pub fn set_data(&mut self, data: Vec<u8>) -> Result<()> {
        if self.direct_binding {
            self.heap.publish(self.id, &data)?;
        }
        self.data = data;
        self.contents_changed();
        Ok(())
    }

    fn contents_changed(&mut self) {
        self.serial = Serial::issue();
        self.unmodified_use = 0;
        self.invalidate_static_cache();
    }
}

impl SourceBuffer for HostSourceBuffer {
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
        Ok(&self.data)
    }

    fn static_cache(&self) -> Option<&StaticIndexCache> {
        self.cache.as_ref()
    }

    fn read_back_with_static_cache(&mut self) -> Result<(&[u8], Option<&mut StaticIndexCache>)> {
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
        self.unmodified_use += u64::from(size_hint);
        if self.cache.is_some() {
            return;
        }

        let threshold = PROMOTION_FACTOR * self.data.len() as u64;
        if self.unmodified_use > threshold {
            bridge_info!(SOURCE, "Promoting buffer {:?} to static caching after {} streamed bytes",
                self.id, self.unmodified_use);
            self.cache = Some(StaticIndexCache::new());
        } else {
            bridge_debug!(SOURCE, "Buffer {:?} streamed {} of {} bytes before promotion",
                self.id, self.unmodified_use, threshold);
        }
    }
}

impl Drop for HostSourceBuffer {
    fn drop(&mut self) {
        if self.direct_binding {
            self.heap.release(self.id);
        }
    }
}
