//! Index element types and index range metadata

/// Unsigned index element type
///
/// Source data may use any of the three widths. Backends only bind
/// `U16` and `U32`, so `U8` data always goes through translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexType {
    /// 8-bit indices (source only)
    U8,
    /// 16-bit indices
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(self) -> u32 {
        1 << self.bytes_shift()
    }

    /// log2 of the element size
    pub fn bytes_shift(self) -> u32 {
        match self {
            IndexType::U8 => 0,
            IndexType::U16 => 1,
            IndexType::U32 => 2,
        }
    }

    /// Primitive restart sentinel (all ones at this width)
    pub fn restart_index(self) -> u32 {
        match self {
            IndexType::U8 => 0xFF,
            IndexType::U16 => 0xFFFF,
            IndexType::U32 => 0xFFFF_FFFF,
        }
    }

    /// Largest element count whose byte size fits in a `u32`
    pub fn max_count(self) -> u32 {
        u32::MAX >> self.bytes_shift()
    }

    /// Byte size of `count` elements, or None on overflow
    pub fn byte_size(self, count: u32) -> Option<u32> {
        if count > self.max_count() {
            None
        } else {
            Some(count << self.bytes_shift())
        }
    }

    /// Whether `offset` is a multiple of the element size
    pub fn is_aligned(self, offset: u32) -> bool {
        offset & (self.size_bytes() - 1) == 0
    }

    /// Whether a backend can bind indices of this type
    pub fn is_bindable(self) -> bool {
        self != IndexType::U8
    }
}

/// Range of vertex indices referenced by a draw call
///
/// Computed by the front-end while validating the draw. `vertex_index_count`
/// counts the indices that are not the restart sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    /// Smallest index referenced
    pub start: u32,
    /// Largest index referenced
    pub end: u32,
    /// Number of non-restart indices
    pub vertex_index_count: u32,
}

impl IndexRange {
    /// Whether the indexed data may contain the restart sentinel of `index_type`
    pub fn has_restart_index(&self, index_type: IndexType, count: u32) -> bool {
        self.vertex_index_count < count || self.end == index_type.restart_index()
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
