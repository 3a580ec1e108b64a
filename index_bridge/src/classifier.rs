/// Path classification for index translation
///
/// Decides, from a snapshot of the draw call and the backing buffer, which
/// of the four translation paths a call takes. Everything here is a pure
/// function of its inputs so every branch is testable without a backend.

use crate::backend::BackendQuirks;
use crate::format::{IndexRange, IndexType};
use crate::source::CachePolicy;
use crate::static_cache::CacheState;

/// Translation path of one draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslationPath {
    /// Bind the backing buffer as-is
    Direct,
    /// Reuse the valid static translation of the backing buffer
    CachedStatic,
    /// Translate the whole backing buffer into its static cache, then reuse it
    BuildCache,
    /// Translate only the drawn range into a streaming buffer
    Stream,
}

/// Backing buffer facts the classifier looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSnapshot {
    /// Byte offset of the first index
    pub offset: u32,
    /// Whether the backend can bind the buffer directly
    pub supports_direct_binding: bool,
    /// State of the buffer's static cache
    pub cache: CacheState,
}

/// Everything a classification depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathQuery {
    /// Element type of the source indices
    pub source_type: IndexType,
    /// Number of indices drawn
    pub count: u32,
    /// Referenced index range, if known
    pub index_range: Option<IndexRange>,
    /// Backing buffer, None for client memory
    pub buffer: Option<BufferSnapshot>,
    /// Whether the API's fixed-index primitive restart is enabled
    pub restart_fixed_enabled: bool,
    /// Backend behaviors
    pub quirks: BackendQuirks,
    /// Static cache policy of the call
    pub cache_policy: CachePolicy,
}

/// Outcome of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathDecision {
    /// Selected path
    pub path: TranslationPath,
    /// Element type the backend will read
    pub destination: IndexType,
    /// Whether restart sentinels are rewritten during conversion
    pub remap_restart: bool,
}

/// Whether the 16-bit restart sentinel must be moved out of the backend's way
///
/// True when restart is not enabled by the API, the source is 16-bit, and the
/// backend cuts strips at `0xFFFF` regardless.
pub fn use_primitive_restart_workaround(
    restart_fixed_enabled: bool,
    source_type: IndexType,
    quirks: BackendQuirks,
) -> bool {
    !restart_fixed_enabled
        && source_type == IndexType::U16
        && quirks.contains(BackendQuirks::SHORT_RESTART_INDEX_CONFLICT)
}

/// Element type the backend reads for `source_type`
pub fn destination_type(source_type: IndexType, restart_workaround: bool) -> IndexType {
    if source_type == IndexType::U32 || restart_workaround {
        IndexType::U32
    } else {
        IndexType::U16
    }
}

/// Classify one draw call
pub fn classify(query: &PathQuery) -> PathDecision {
    // An index range that proves the sentinel absent makes the workaround moot
    let restart_workaround = use_primitive_restart_workaround(
        query.restart_fixed_enabled,
        query.source_type,
        query.quirks,
    ) && query
        .index_range
        .map_or(true, |range| range.has_restart_index(query.source_type, query.count));

    let destination = destination_type(query.source_type, restart_workaround);
    let remap_restart = query.restart_fixed_enabled || restart_workaround;
    let path = match query.buffer {
        None => TranslationPath::Stream,
        Some(buffer) => classify_buffer(query, &buffer, destination, remap_restart),
    };

    PathDecision {
        path,
        destination,
        remap_restart,
    }
}

fn classify_buffer(
    query: &PathQuery,
    buffer: &BufferSnapshot,
    destination: IndexType,
    remap_restart: bool,
) -> TranslationPath {
    if !query.source_type.is_aligned(buffer.offset) {
        return TranslationPath::Stream;
    }
    if buffer.supports_direct_binding && destination == query.source_type {
        return TranslationPath::Direct;
    }

    match (query.cache_policy, buffer.cache) {
        (CachePolicy::StreamOnly, _) => TranslationPath::Stream,
        (_, CacheState::Valid(index_type, remapped))
            if index_type == destination && remapped == remap_restart => TranslationPath::CachedStatic,
        (CachePolicy::Auto, CacheState::Detached) => TranslationPath::Stream,
        _ => TranslationPath::BuildCache,
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
