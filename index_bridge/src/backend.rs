/// Backend index buffer traits and scoped mapping
///
/// Backends (D3D-style, Vulkan-style, host memory, ...) implement
/// `IndexBuffer` and `IndexBufferFactory`. The translation code only ever
/// talks to these traits.

use std::sync::atomic::{AtomicU64, Ordering};
use crate::error::Result;
use crate::format::IndexType;
use crate::{bridge_err, bridge_warn};

const SOURCE: &str = "index_bridge::backend";

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

// ===== IDENTIFIERS =====

/// Version stamp of a buffer's contents
///
/// A new serial is issued whenever a buffer's storage is reallocated or
/// discarded. Two equal serials always denote the same contents generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Serial(u64);

impl Serial {
    /// Issue a process-unique serial
    pub fn issue() -> Self {
        Self(NEXT_SERIAL.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Stable identity of a buffer object
///
/// Unlike `Serial`, the id survives reallocation and discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    /// Allocate a process-unique buffer id
    pub fn allocate() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value
    pub fn value(self) -> u64 {
        self.0
    }
}

// ===== BACKEND QUIRKS =====

bitflags::bitflags! {
    /// Backend behaviors that affect index translation (none by default)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BackendQuirks: u32 {
        /// 16-bit `0xFFFF` always cuts strips, even with restart disabled
        const SHORT_RESTART_INDEX_CONFLICT = 1 << 0;
    }
}

// ===== INDEX BUFFER =====

/// Backend index buffer primitive
///
/// Implemented by backend-specific buffer types. The buffer is destroyed
/// when dropped.
pub trait IndexBuffer: Send {
    /// Stable identity of this buffer
    fn id(&self) -> BufferId;

    /// Current contents generation
    fn serial(&self) -> Serial;

    /// Allocated size in bytes
    fn size(&self) -> u32;

    /// Element type the storage was allocated for, None before the first reserve
    fn index_type(&self) -> Option<IndexType>;

    /// Ensure storage for `size` bytes of `index_type` elements
    ///
    /// Reallocates (and issues a new serial) when `size` exceeds the current
    /// size or the element type differs. Contents are undefined after a
    /// reallocation.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` when the allocation fails.
    fn reserve(&mut self, size: u32, index_type: IndexType) -> Result<()>;

    /// Orphan the current contents and issue a new serial
    ///
    /// Regions handed out earlier stay readable by in-flight GPU work.
    fn discard(&mut self) -> Result<()>;

    /// Map `size` bytes starting at `offset` for writing
    ///
    /// # Errors
    ///
    /// `MappingFailure` when the backend cannot provide the region.
    fn map(&mut self, offset: u32, size: u32) -> Result<()>;

    /// Currently mapped region, None when unmapped
    fn mapped_bytes(&mut self) -> Option<&mut [u8]>;

    /// Release the current mapping
    fn unmap(&mut self) -> Result<()>;
}

/// Factory for backend index buffers
pub trait IndexBufferFactory: Send {
    /// Create an empty, unallocated index buffer
    fn create_index_buffer(&self) -> Result<Box<dyn IndexBuffer>>;
}

// ===== SCOPED MAPPING =====

/// Exclusive write access to a mapped index buffer region
///
/// The region is unmapped when the guard is dropped, so early returns and
/// `?` never leak a mapping. Use [`MappedIndexRange::unmap`] on the success
/// path to observe unmap errors.
pub struct MappedIndexRange<'a> {
    buffer: &'a mut dyn IndexBuffer,
    offset: u32,
    size: u32,
    mapped: bool,
}

impl<'a> MappedIndexRange<'a> {
    /// Map `size` bytes of `buffer` at `offset`
    pub fn map(buffer: &'a mut dyn IndexBuffer, offset: u32, size: u32) -> Result<Self> {
        buffer.map(offset, size)?;
        Ok(Self { buffer, offset, size, mapped: true })
    }

    /// Byte offset of the region within the buffer
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Writable bytes of the region
    ///
    /// # Errors
    ///
    /// `MappingFailure` if the backend exposes no region or a shorter one.
    pub fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        let size = self.size as usize;
        let id = self.buffer.id();
        match self.buffer.mapped_bytes() {
            Some(bytes) if bytes.len() >= size => Ok(&mut bytes[..size]),
            Some(bytes) => Err(bridge_err!(SOURCE, MappingFailure,
                "Mapped region holds {} bytes, {} requested", bytes.len(), size)),
            None => Err(bridge_err!(SOURCE, MappingFailure,
                "Buffer {:?} reported no mapped region", id)),
        }
    }

    /// Unmap explicitly, propagating backend errors
    pub fn unmap(mut self) -> Result<()> {
        self.mapped = false;
        self.buffer.unmap()
    }
}

impl Drop for MappedIndexRange<'_> {
    fn drop(&mut self) {
        if self.mapped {
            if let Err(error) = self.buffer.unmap() {
                bridge_warn!(SOURCE, "Unmap while unwinding failed: {}", error);
            }
        }
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
