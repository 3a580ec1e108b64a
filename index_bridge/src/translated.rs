/// Translated index data handed to the backend's draw call

use crate::backend::{BufferId, Serial};
use crate::classifier::TranslationPath;
use crate::format::IndexType;
use crate::source::SourceIndexInfo;

/// Backend-ready description of the indices of one draw call
///
/// `start_offset` is always a multiple of `index_type.size_bytes()` and
/// `start_index == start_offset / index_type.size_bytes()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatedIndexData {
    /// Element type the backend reads
    pub index_type: IndexType,
    /// Path the call took
    pub path: TranslationPath,
    /// Buffer to bind
    pub buffer: BufferId,
    /// Contents generation of `buffer` at translation time
    pub serial: Serial,
    /// First element to draw, in `index_type` elements
    pub start_index: u32,
    /// Byte offset of the first element in `buffer`
    pub start_offset: u32,
    /// Description of the source the data was translated from
    pub source: SourceIndexInfo,
}

impl TranslatedIndexData {
    /// Bytes the draw reads from `buffer`
    pub fn byte_len(&self) -> u32 {
        self.source.count << self.index_type.bytes_shift()
    }
}
