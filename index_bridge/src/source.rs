/// Source index data as handed over by the API front-end

use crate::backend::{BufferId, Serial};
use crate::error::Result;
use crate::format::{IndexRange, IndexType};
use crate::static_cache::StaticIndexCache;

// ===== SOURCE BUFFER =====

/// Backing buffer object that index data may live in
///
/// Implemented by the front-end's buffer type. The buffer owns its static
/// translation cache; this crate only borrows it for the duration of a call.
/// Any content-mutating write must invalidate the cache before the buffer is
/// used for another draw.
pub trait SourceBuffer: Send {
    /// Stable identity (used as the bound buffer on the direct path)
    fn id(&self) -> BufferId;

    /// Current contents generation
    fn serial(&self) -> Serial;

    /// Size in bytes
    fn size(&self) -> u32;

    /// Whether the backend can bind this buffer's storage as an index buffer
    fn supports_direct_binding(&self) -> bool;

    /// Full current contents
    ///
    /// # Errors
    ///
    /// `ReadBackFailure` when the contents cannot be provided.
    fn read_back(&self) -> Result<&[u8]>;

    /// Attached static cache, if the owner has attached one
    fn static_cache(&self) -> Option<&StaticIndexCache>;

    /// Full current contents together with the attached static cache
    ///
    /// Borrowed together so a cache rebuild can read the contents while
    /// writing the cache.
    fn read_back_with_static_cache(&mut self) -> Result<(&[u8], Option<&mut StaticIndexCache>)>;

    /// Attach (or replace) the static cache
    fn attach_static_cache(&mut self, cache: StaticIndexCache);

    /// Mark the attached static cache stale
    fn invalidate_static_cache(&mut self);

    /// Hook for the owner's promotion policy, called after data was streamed
    /// out of this buffer
    ///
    /// # Arguments
    ///
    /// * `size_hint` - Number of source bytes that were streamed
    fn notify_repeated_streaming_use(&mut self, size_hint: u32);
}

// ===== SOURCE DESCRIPTOR =====

/// Where the source indices live
pub enum IndexSource<'a> {
    /// Client memory, starting at the first index
    Memory(&'a [u8]),
    /// A backing buffer, starting `offset` bytes into it
    Buffer {
        buffer: &'a mut dyn SourceBuffer,
        offset: u32,
    },
}

/// Whether a call may use or build the static translation cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Use the cache the owner attached; rebuild it when stale
    #[default]
    Auto,
    /// Build a cache even when the owner has not attached one yet
    Build,
    /// Never touch the cache
    StreamOnly,
}

/// Index data of one indexed draw call
pub struct SourceIndexData<'a> {
    /// Element type of the source indices
    pub index_type: IndexType,
    /// Number of indices drawn
    pub count: u32,
    /// Where the indices live
    pub source: IndexSource<'a>,
    /// Referenced index range, when the front-end computed it
    pub index_range: Option<IndexRange>,
    /// Static cache usage for this call
    pub cache_policy: CachePolicy,
}

impl<'a> SourceIndexData<'a> {
    /// Indices read from client memory
    pub fn from_memory(index_type: IndexType, count: u32, data: &'a [u8]) -> Self {
        Self {
            index_type,
            count,
            source: IndexSource::Memory(data),
            index_range: None,
            cache_policy: CachePolicy::Auto,
        }
    }

    /// Indices read from a backing buffer at `offset` bytes
    pub fn from_buffer(
        index_type: IndexType,
        count: u32,
        buffer: &'a mut dyn SourceBuffer,
        offset: u32,
    ) -> Self {
        Self {
            index_type,
            count,
            source: IndexSource::Buffer { buffer, offset },
            index_range: None,
            cache_policy: CachePolicy::Auto,
        }
    }

    /// Attach the referenced index range
    pub fn with_index_range(mut self, range: IndexRange) -> Self {
        self.index_range = Some(range);
        self
    }

    /// Override the static cache policy
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    /// Copy of the descriptor that outlives the call
    pub fn info(&self) -> SourceIndexInfo {
        let (buffer, offset) = match &self.source {
            IndexSource::Memory(_) => (None, 0),
            IndexSource::Buffer { buffer, offset } => (Some(buffer.id()), *offset),
        };
        SourceIndexInfo {
            index_type: self.index_type,
            count: self.count,
            buffer,
            offset,
        }
    }
}

/// Retained description of the source of a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceIndexInfo {
    /// Element type of the source indices
    pub index_type: IndexType,
    /// Number of indices
    pub count: u32,
    /// Backing buffer, None for client memory
    pub buffer: Option<BufferId>,
    /// Byte offset into the backing buffer (0 for client memory)
    pub offset: u32,
}
