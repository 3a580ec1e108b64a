//! Streaming index pool
//!
//! Append-only scratch buffer for per-call translations. One pool exists per
//! destination element type. Regions are never freed individually: when a
//! request no longer fits behind the write cursor the buffer is discarded
//! (orphaned) and writing restarts at offset 0; when a request exceeds the
//! whole buffer it is regrown to `max(cursor + size, 2 * current)`.

use crate::backend::{BufferId, IndexBuffer, IndexBufferFactory, MappedIndexRange, Serial};
use crate::error::Result;
use crate::format::IndexType;
use crate::{bridge_bail, bridge_debug};

const SOURCE: &str = "index_bridge::streaming";

/// Default initial size of a streaming buffer (4096 32-bit indices)
pub const INITIAL_STREAMING_BUFFER_SIZE: u32 = 4096 * 4;

/// Region written by [`StreamingIndexPool::reserve_and_write`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamedRange {
    /// Backend buffer holding the region
    pub buffer: BufferId,
    /// Contents generation of that buffer
    pub serial: Serial,
    /// Byte offset of the region
    pub offset: u32,
}

/// Growable append-only scratch buffer for one destination element type
pub struct StreamingIndexPool {
    index_type: IndexType,
    initial_size: u32,
    buffer: Option<Box<dyn IndexBuffer>>,
    write_position: u32,
}

impl StreamingIndexPool {
    /// Create a pool; the backend buffer is created on first use
    pub fn new(index_type: IndexType, initial_size: u32) -> Self {
        debug_assert!(index_type.is_bindable(), "streaming pools hold bindable index types only");
        Self {
            index_type,
            initial_size,
            buffer: None,
            write_position: 0,
        }
    }

    /// Element type written to this pool
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Byte offset the next region will be written at (before any wrap)
    pub fn write_position(&self) -> u32 {
        self.write_position
    }

    /// Allocated size of the backend buffer, 0 before first use
    pub fn buffer_size(&self) -> u32 {
        self.buffer.as_ref().map_or(0, |buffer| buffer.size())
    }

    /// Reserve room for `count` elements and let `producer` fill it
    ///
    /// `producer` receives the mapped region (exactly `count` elements) and
    /// runs while the region is mapped. The mapping is released on every
    /// exit path.
    ///
    /// # Errors
    ///
    /// - `OutOfMemory` when `count` elements do not fit a `u32` byte size
    ///   (checked before the pool is touched) or growing the buffer fails
    /// - backend mapping errors, and whatever `producer` returns
    pub fn reserve_and_write<F>(
        &mut self,
        factory: &dyn IndexBufferFactory,
        count: u32,
        producer: F,
    ) -> Result<StreamedRange>
    where
        F: FnOnce(&mut [u8]) -> Result<()>,
    {
        let Some(size) = self.index_type.byte_size(count) else {
            bridge_bail!(SOURCE, OutOfMemory,
                "Reserving {} indices of {} bytes each exceeds the maximum buffer size",
                count, self.index_type.size_bytes());
        };

        let mut buffer = match self.buffer.take() {
            Some(buffer) => buffer,
            None => self.create_buffer(factory, size)?,
        };
        let written = self.write_region(buffer.as_mut(), size, producer);
        self.buffer = Some(buffer);
        written
    }

    /// Restart writing at offset 0 (e.g. once per frame)
    ///
    /// The buffer is discarded first so regions handed out earlier are not
    /// overwritten under in-flight draws.
    pub fn rewind(&mut self) -> Result<()> {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.discard()?;
        }
        self.write_position = 0;
        Ok(())
    }

    fn create_buffer(&mut self, factory: &dyn IndexBufferFactory, size: u32) -> Result<Box<dyn IndexBuffer>> {
        let mut buffer = factory.create_index_buffer()?;
        let initial = self.initial_size.max(size);
        buffer.reserve(initial, self.index_type)?;
        self.write_position = 0;
        bridge_debug!(SOURCE, "Created {:?} streaming buffer of {} bytes", self.index_type, initial);
        Ok(buffer)
    }

    fn write_region<F>(&mut self, buffer: &mut dyn IndexBuffer, size: u32, producer: F) -> Result<StreamedRange>
    where
        F: FnOnce(&mut [u8]) -> Result<()>,
    {
        let offset = self.make_room(buffer, size)?;
        let range = StreamedRange {
            buffer: buffer.id(),
            serial: buffer.serial(),
            offset,
        };

        if size > 0 {
            let mut region = MappedIndexRange::map(buffer, offset, size)?;
            producer(region.bytes_mut()?)?;
            region.unmap()?;
        }

        self.write_position = offset + size;
        Ok(range)
    }

    /// Make `size` bytes available behind the cursor, returning their offset
    fn make_room(&mut self, buffer: &mut dyn IndexBuffer, size: u32) -> Result<u32> {
        let current = buffer.size();
        let Some(write_end) = self.write_position.checked_add(size) else {
            bridge_bail!(SOURCE, OutOfMemory,
                "Streaming write of {} bytes at offset {} overflows", size, self.write_position);
        };

        if size > current {
            let grown = write_end.max(current.saturating_mul(2));
            buffer.reserve(grown, self.index_type)?;
            bridge_debug!(SOURCE, "Grew {:?} streaming buffer from {} to {} bytes",
                self.index_type, current, grown);
            self.write_position = 0;
        } else if write_end > current {
            buffer.discard()?;
            self.write_position = 0;
        }

        Ok(self.write_position)
    }
}

#[cfg(test)]
#[path = "streaming_tests.rs"]
mod tests;
