//! Static translation cache
//!
//! A translated copy of a whole backing buffer, built once and reused by
//! every draw that reads the buffer at the same destination width. The cache
//! is owned by the backing buffer (see [`SourceBuffer`](crate::source::SourceBuffer)).
//! An entry only serves draws with the same restart sentinel handling it was
//! built with.
//!
//! Lifecycle:
//! - `build` converts the entire buffer and marks the entry valid only after
//!   the full pass succeeded
//! - `invalidate` clears validity but keeps the allocation for the next build
//! - a build at another width or size replaces the backend buffer; a build at
//!   unchanged width and size discards it so the new contents get a new serial

use crate::backend::{BufferId, IndexBuffer, IndexBufferFactory, MappedIndexRange, Serial};
use crate::converter::convert_indices;
use crate::error::Result;
use crate::format::IndexType;
use crate::{bridge_bail, bridge_debug};

const SOURCE: &str = "index_bridge::static_cache";

/// Handle to a valid cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedIndexBuffer {
    /// Backend buffer holding the translation
    pub buffer: BufferId,
    /// Contents generation of that buffer
    pub serial: Serial,
    /// Element type of the translation
    pub index_type: IndexType,
}

/// Cache state as seen by the path classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// The owner has not attached a cache
    Detached,
    /// A cache is attached but holds no valid entry
    Invalid,
    /// A valid entry of the given element type, built with or without
    /// restart sentinel remapping
    Valid(IndexType, bool),
}

impl CacheState {
    /// Classifier view of an optional attached cache
    pub fn of(cache: Option<&StaticIndexCache>) -> Self {
        match cache {
            None => CacheState::Detached,
            Some(cache) => match cache.valid_entry() {
                Some((index_type, remap_restart)) => CacheState::Valid(index_type, remap_restart),
                None => CacheState::Invalid,
            },
        }
    }
}

/// Per-buffer static translation cache
pub struct StaticIndexCache {
    buffer: Option<Box<dyn IndexBuffer>>,
    index_type: Option<IndexType>,
    remap_restart: bool,
    valid: bool,
}

impl StaticIndexCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            buffer: None,
            index_type: None,
            remap_restart: false,
            valid: false,
        }
    }

    /// Whether the cache holds a valid entry
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Element type of the valid entry
    pub fn valid_type(&self) -> Option<IndexType> {
        self.valid_entry().map(|(index_type, _)| index_type)
    }

    /// Element type and sentinel remapping of the valid entry
    pub fn valid_entry(&self) -> Option<(IndexType, bool)> {
        match self.index_type {
            Some(index_type) if self.valid => Some((index_type, self.remap_restart)),
            _ => None,
        }
    }

    /// Whether a backend buffer is allocated (valid or not)
    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    /// Valid entry at `index_type` built with the same `remap_restart`
    ///
    /// None if absent, invalidated, of another type or built with the other
    /// sentinel handling.
    pub fn get(&self, index_type: IndexType, remap_restart: bool) -> Option<CachedIndexBuffer> {
        if self.valid_entry() != Some((index_type, remap_restart)) {
            return None;
        }
        self.buffer.as_ref().map(|buffer| CachedIndexBuffer {
            buffer: buffer.id(),
            serial: buffer.serial(),
            index_type,
        })
    }

    /// Mark the entry stale without releasing its storage
    pub fn invalidate(&mut self) {
        if self.valid {
            bridge_debug!(SOURCE, "Invalidated static {:?} translation", self.index_type);
        }
        self.valid = false;
    }

    /// Translate the whole of `data` and store it as the new entry
    ///
    /// # Arguments
    ///
    /// * `factory` - Creates the backend buffer when none can be reused
    /// * `source` - Element type of `data`
    /// * `destination` - Element type to translate to
    /// * `data` - Full contents of the backing buffer (trailing partial element ignored)
    /// * `remap_restart` - Rewrite restart sentinels to the destination sentinel
    ///
    /// # Errors
    ///
    /// Any converter or backend error. The entry stays invalid on failure.
    pub fn build(
        &mut self,
        factory: &dyn IndexBufferFactory,
        source: IndexType,
        destination: IndexType,
        data: &[u8],
        remap_restart: bool,
    ) -> Result<CachedIndexBuffer> {
        let Ok(count) = u32::try_from(data.len() >> source.bytes_shift()) else {
            bridge_bail!(SOURCE, OutOfMemory,
                "Backing buffer of {} bytes is too large to translate", data.len());
        };
        let Some(size) = destination.byte_size(count) else {
            bridge_bail!(SOURCE, OutOfMemory,
                "Translating {} indices to {} bytes each exceeds the maximum buffer size",
                count, destination.size_bytes());
        };

        self.valid = false;
        self.index_type = None;

        let mut buffer = match self.buffer.take() {
            Some(mut existing) if existing.index_type() == Some(destination) && existing.size() == size => {
                existing.discard()?;
                existing
            }
            _ => {
                let mut fresh = factory.create_index_buffer()?;
                fresh.reserve(size, destination)?;
                fresh
            }
        };

        let filled = Self::fill(buffer.as_mut(), source, destination, data, count, size, remap_restart);
        let cached = CachedIndexBuffer {
            buffer: buffer.id(),
            serial: buffer.serial(),
            index_type: destination,
        };
        self.buffer = Some(buffer);
        filled?;

        self.index_type = Some(destination);
        self.remap_restart = remap_restart;
        self.valid = true;
        bridge_debug!(SOURCE, "Built static {:?} -> {:?} translation of {} indices ({} bytes, remap {})",
            source, destination, count, size, remap_restart);

        Ok(cached)
    }

    fn fill(
        buffer: &mut dyn IndexBuffer,
        source: IndexType,
        destination: IndexType,
        data: &[u8],
        count: u32,
        size: u32,
        remap_restart: bool,
    ) -> Result<()> {
        if size == 0 {
            return Ok(());
        }
        let mut region = MappedIndexRange::map(buffer, 0, size)?;
        convert_indices(source, destination, data, count, remap_restart, region.bytes_mut()?)?;
        region.unmap()
    }
}

impl Default for StaticIndexCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "static_cache_tests.rs"]
mod tests;
