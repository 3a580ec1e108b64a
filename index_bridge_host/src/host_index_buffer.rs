/// IndexBuffer - host memory implementation of the IndexBuffer trait

use std::ops::Range;
use index_bridge::bridge::{BufferId, IndexBuffer, IndexType, Result, Serial};
use index_bridge::{bridge_bail, bridge_trace};

use crate::host_heap::HostHeap;

const SOURCE: &str = "index_bridge_host::index_buffer";

/// Host memory index buffer
///
/// Writes go to a private staging copy while mapped and are published to the
/// heap on unmap.
pub struct HostIndexBuffer {
    id: BufferId,
    serial: Serial,
    index_type: Option<IndexType>,
    staging: Vec<u8>,
    mapped: Option<Range<usize>>,
    heap: HostHeap,
}

impl HostIndexBuffer {
    pub(crate) fn new(heap: HostHeap) -> Self {
        Self {
            id: BufferId::allocate(),
            serial: Serial::issue(),
            index_type: None,
            staging: Vec::new(),
            mapped: None,
            heap,
        }
    }
}

impl IndexBuffer for HostIndexBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn serial(&self) -> Serial {
        self.serial
    }

    fn size(&self) -> u32 {
        self.staging.len() as u32
    }

    fn index_type(&self) -> Option<IndexType> {
        self.index_type
    }

    fn reserve(&mut self, size: u32, index_type: IndexType) -> Result<()> {
        if self.mapped.is_some() {
            bridge_bail!(SOURCE, BackendError, "Cannot reallocate mapped buffer {:?}", self.id);
        }
        if size as usize <= self.staging.len() && self.index_type == Some(index_type) {
            return Ok(());
        }

        self.heap.allocate(self.id, size as usize)?;
        self.staging = vec![0; size as usize];
        self.index_type = Some(index_type);
        self.serial = Serial::issue();
        bridge_trace!(SOURCE, "Allocated {} bytes of {:?} indices for buffer {:?}", size, index_type, self.id);
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        if self.mapped.is_some() {
            bridge_bail!(SOURCE, BackendError, "Cannot discard mapped buffer {:?}", self.id);
        }
        self.serial = Serial::issue();
        Ok(())
    }

    fn map(&mut self, offset: u32, size: u32) -> Result<()> {
        if self.mapped.is_some() {
            bridge_bail!(SOURCE, MappingFailure, "Buffer {:?} is already mapped", self.id);
        }
        let start = offset as usize;
        let end = start + size as usize;
        if end > self.staging.len() {
            bridge_bail!(SOURCE, MappingFailure,
                "Mapping [{}, {}) exceeds buffer {:?} ({} bytes)", start, end, self.id, self.staging.len());
        }
        self.mapped = Some(start..end);
        Ok(())
    }

    fn mapped_bytes(&mut self) -> Option<&mut [u8]> {
        let range = self.mapped.clone()?;
        self.staging.get_mut(range)
    }

    fn unmap(&mut self) -> Result<()> {
        let Some(range) = self.mapped.take() else {
            bridge_bail!(SOURCE, BackendError, "Buffer {:?} is not mapped", self.id);
        };
        let start = range.start;
        self.heap.write(self.id, start, &self.staging[range])
    }
}

impl Drop for HostIndexBuffer {
    fn drop(&mut self) {
        self.heap.release(self.id);
    }
}
