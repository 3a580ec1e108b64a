/// Host backend factory and draw-side readers

use index_bridge::bridge::{
    IndexBuffer, IndexBufferFactory, IndexType, Result, TranslatedIndexData, BufferId,
};
use index_bridge::bridge_bail;

use crate::host_heap::HostHeap;
use crate::host_index_buffer::HostIndexBuffer;
use crate::host_source_buffer::{BufferUsage, HostSourceBuffer};

const SOURCE: &str = "index_bridge_host::factory";

/// Factory for host memory buffers
///
/// Clones share one heap, so a clone kept next to the translator can read
/// back what a draw would consume.
#[derive(Clone, Default)]
pub struct HostBufferFactory {
    heap: HostHeap,
    direct_binding: bool,
}

impl HostBufferFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let source buffers created by this factory be bound directly
    pub fn with_direct_binding(mut self, direct_binding: bool) -> Self {
        self.direct_binding = direct_binding;
        self
    }

    /// Create a backing buffer holding `data`
    pub fn create_source_buffer(&self, data: Vec<u8>, usage: BufferUsage) -> Result<HostSourceBuffer> {
        HostSourceBuffer::new(self.heap.clone(), data, usage, self.direct_binding)
    }

    /// Create a backing buffer from typed indices
    pub fn create_source_buffer_from<T: bytemuck::Pod>(&self, indices: &[T], usage: BufferUsage) -> Result<HostSourceBuffer> {
        self.create_source_buffer(bytemuck::cast_slice(indices).to_vec(), usage)
    }

    /// Number of live bindable buffers
    pub fn live_buffer_count(&self) -> usize {
        self.heap.allocation_count()
    }

    /// Backend-visible bytes of `buffer`
    pub fn read_buffer(&self, buffer: BufferId, offset: u32, len: u32) -> Result<Vec<u8>> {
        self.heap.read(buffer, offset as usize, len as usize)
    }

    /// Indices a draw using `translated` would fetch, widened to `u32`
    pub fn resolve_indices(&self, translated: &TranslatedIndexData) -> Result<Vec<u32>> {
        let bytes = self.read_buffer(translated.buffer, translated.start_offset, translated.byte_len())?;
        let indices = match translated.index_type {
            IndexType::U16 => bytes
                .chunks_exact(2)
                .map(|chunk| u32::from(bytemuck::pod_read_unaligned::<u16>(chunk)))
                .collect(),
            IndexType::U32 => bytes
                .chunks_exact(4)
                .map(bytemuck::pod_read_unaligned::<u32>)
                .collect(),
            IndexType::U8 => bridge_bail!(SOURCE, Unsupported,
                "Host backend cannot bind {:?} indices", translated.index_type),
        };
        Ok(indices)
    }
}

impl IndexBufferFactory for HostBufferFactory {
    fn create_index_buffer(&self) -> Result<Box<dyn IndexBuffer>> {
        Ok(Box::new(HostIndexBuffer::new(self.heap.clone())))
    }
}
