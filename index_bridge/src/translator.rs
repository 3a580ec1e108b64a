//! Index translation dispatcher
//!
//! `IndexTranslator` is the entry point of the crate: for each indexed draw
//! it classifies the source data, executes the selected path and returns a
//! [`TranslatedIndexData`] the backend can bind.
//!
//! The translator owns the two streaming pools (one per destination element
//! type). Static caches are owned by the source buffers and only borrowed
//! for the duration of a call.

use crate::backend::{BackendQuirks, IndexBufferFactory};
use crate::classifier::{classify, BufferSnapshot, PathDecision, PathQuery, TranslationPath};
use crate::converter::convert_indices;
use crate::error::Result;
use crate::format::IndexType;
use crate::source::{CachePolicy, IndexSource, SourceBuffer, SourceIndexData, SourceIndexInfo};
use crate::static_cache::{CacheState, CachedIndexBuffer, StaticIndexCache};
use crate::streaming::{StreamedRange, StreamingIndexPool, INITIAL_STREAMING_BUFFER_SIZE};
use crate::translated::TranslatedIndexData;
use crate::{bridge_bail, bridge_debug, bridge_trace};

const SOURCE: &str = "index_bridge::translator";

// ===== CONFIGURATION =====

/// Translator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatorConfig {
    /// Size in bytes of a streaming buffer when first created
    pub initial_streaming_size: u32,
    /// Behaviors of the backend the indices are translated for
    pub backend_quirks: BackendQuirks,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            initial_streaming_size: INITIAL_STREAMING_BUFFER_SIZE,
            backend_quirks: BackendQuirks::empty(),
        }
    }
}

/// Number of successful translations per path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationStats {
    pub direct: u64,
    pub cached: u64,
    pub built: u64,
    pub streamed: u64,
}

impl TranslationStats {
    /// Total number of successful translations
    pub fn total(&self) -> u64 {
        self.direct + self.cached + self.built + self.streamed
    }

    fn record(&mut self, path: TranslationPath) {
        match path {
            TranslationPath::Direct => self.direct += 1,
            TranslationPath::CachedStatic => self.cached += 1,
            TranslationPath::BuildCache => self.built += 1,
            TranslationPath::Stream => self.streamed += 1,
        }
    }
}

// ===== TRANSLATOR =====

/// Per-context index translator
///
/// Not shareable across threads; all operations take `&mut self`.
pub struct IndexTranslator {
    factory: Box<dyn IndexBufferFactory>,
    config: TranslatorConfig,
    streaming_short: Option<StreamingIndexPool>,
    streaming_int: Option<StreamingIndexPool>,
    stats: TranslationStats,
}

impl IndexTranslator {
    /// Create a translator allocating its buffers through `factory`
    pub fn new(factory: Box<dyn IndexBufferFactory>, config: TranslatorConfig) -> Self {
        bridge_debug!(SOURCE, "Created index translator (initial streaming size {} bytes, quirks {:?})",
            config.initial_streaming_size, config.backend_quirks);
        Self {
            factory,
            config,
            streaming_short: None,
            streaming_int: None,
            stats: TranslationStats::default(),
        }
    }

    pub fn stats(&self) -> TranslationStats {
        self.stats
    }

    /// Translate the indices of one draw call
    ///
    /// # Arguments
    ///
    /// * `data` - Source indices of the draw
    /// * `restart_fixed_enabled` - Whether fixed-index primitive restart is enabled
    ///
    /// # Errors
    ///
    /// - `OutOfMemory` when `count` indices do not fit a `u32` byte size at the
    ///   destination width, or a backend allocation fails
    /// - `InvalidResource` when the drawn range runs past the end of the source
    /// - `ReadBackFailure` when the source buffer cannot supply its contents
    /// - `MappingFailure` / `BackendError` from the backend
    ///
    /// On error no mapping is left open and a valid static cache entry of the
    /// requested width is never invalidated.
    pub fn prepare(&mut self, data: SourceIndexData<'_>, restart_fixed_enabled: bool) -> Result<TranslatedIndexData> {
        let decision = self.classify_request(&data, restart_fixed_enabled);
        let info = data.info();

        let Some(source_len) = decision.destination.byte_size(data.count).and(data.index_type.byte_size(data.count)) else {
            bridge_bail!(SOURCE, OutOfMemory,
                "Drawing {} indices as {:?} exceeds the maximum buffer size", data.count, decision.destination);
        };

        bridge_trace!(SOURCE, "{:?} -> {:?} via {:?} ({} indices, remap {})",
            data.index_type, decision.destination, decision.path, data.count, decision.remap_restart);

        let translated = match data.source {
            IndexSource::Memory(bytes) => {
                let Some(input) = bytes.get(..source_len as usize) else {
                    bridge_bail!(SOURCE, InvalidResource,
                        "{} {:?} indices need {} bytes, client data holds {}",
                        data.count, data.index_type, source_len, bytes.len());
                };
                self.stream(&decision, info, input)?
            }
            IndexSource::Buffer { buffer, offset } => {
                let end = offset.checked_add(source_len).filter(|&end| end <= buffer.size());
                if end.is_none() {
                    bridge_bail!(SOURCE, InvalidResource,
                        "{} bytes of indices at offset {} run past the end of buffer {:?} ({} bytes)",
                        source_len, offset, buffer.id(), buffer.size());
                }
                self.prepare_from_buffer(&decision, info, buffer, offset, source_len, data.cache_policy)?
            }
        };

        self.stats.record(translated.path);
        Ok(translated)
    }

    /// Path decision `prepare` would take for `data`, without side effects
    pub fn classify_request(&self, data: &SourceIndexData<'_>, restart_fixed_enabled: bool) -> PathDecision {
        let buffer = match &data.source {
            IndexSource::Memory(_) => None,
            IndexSource::Buffer { buffer, offset } => Some(BufferSnapshot {
                offset: *offset,
                supports_direct_binding: buffer.supports_direct_binding(),
                cache: CacheState::of(buffer.static_cache()),
            }),
        };

        classify(&PathQuery {
            source_type: data.index_type,
            count: data.count,
            index_range: data.index_range,
            buffer,
            restart_fixed_enabled,
            quirks: self.config.backend_quirks,
            cache_policy: data.cache_policy,
        })
    }

    /// Whether indices of `source_type` read from `buffer` (None for client
    /// memory) at an aligned offset would be streamed
    pub fn is_streaming_index_data(
        &self,
        source_type: IndexType,
        buffer: Option<&dyn SourceBuffer>,
        restart_fixed_enabled: bool,
    ) -> bool {
        let decision = classify(&PathQuery {
            source_type,
            count: 0,
            index_range: None,
            buffer: buffer.map(|buffer| BufferSnapshot {
                offset: 0,
                supports_direct_binding: buffer.supports_direct_binding(),
                cache: CacheState::of(buffer.static_cache()),
            }),
            restart_fixed_enabled,
            quirks: self.config.backend_quirks,
            cache_policy: CachePolicy::Auto,
        });
        decision.path == TranslationPath::Stream
    }

    /// Rewind both streaming pools (e.g. at the start of a frame)
    pub fn begin_frame(&mut self) -> Result<()> {
        for pool in [&mut self.streaming_short, &mut self.streaming_int].into_iter().flatten() {
            pool.rewind()?;
        }
        Ok(())
    }

    /// Release both streaming pools; they are recreated on next use
    pub fn reset_streaming(&mut self) {
        self.streaming_short = None;
        self.streaming_int = None;
        bridge_debug!(SOURCE, "Released streaming buffers");
    }

    // ===== PATHS =====

    fn prepare_from_buffer(
        &mut self,
        decision: &PathDecision,
        info: SourceIndexInfo,
        buffer: &mut dyn SourceBuffer,
        offset: u32,
        source_len: u32,
        cache_policy: CachePolicy,
    ) -> Result<TranslatedIndexData> {
        let source_type = info.index_type;

        match decision.path {
            TranslationPath::Direct => Ok(TranslatedIndexData {
                index_type: source_type,
                path: TranslationPath::Direct,
                buffer: buffer.id(),
                serial: buffer.serial(),
                start_index: offset >> source_type.bytes_shift(),
                start_offset: offset,
                source: info,
            }),
            TranslationPath::CachedStatic => {
                let Some(cached) = buffer.static_cache().and_then(|cache| cache.get(decision.destination, decision.remap_restart)) else {
                    bridge_bail!(SOURCE, InvalidResource,
                        "Buffer {:?} holds no {:?} translation", buffer.id(), decision.destination);
                };
                Ok(Self::cached_output(TranslationPath::CachedStatic, &cached, offset, info))
            }
            TranslationPath::BuildCache => {
                let cached = self.build_static_cache(decision, buffer, source_type, cache_policy)?;
                Ok(Self::cached_output(TranslationPath::BuildCache, &cached, offset, info))
            }
            TranslationPath::Stream => {
                let translated = {
                    let contents = buffer.read_back()?;
                    let start = offset as usize;
                    let Some(input) = contents.get(start..start + source_len as usize) else {
                        bridge_bail!(SOURCE, ReadBackFailure,
                            "Buffer {:?} supplied {} bytes, {} needed at offset {}",
                            info.buffer, contents.len(), source_len, offset);
                    };
                    self.stream(decision, info, input)?
                };
                buffer.notify_repeated_streaming_use(source_len);
                Ok(translated)
            }
        }
    }

    fn build_static_cache(
        &self,
        decision: &PathDecision,
        buffer: &mut dyn SourceBuffer,
        source_type: IndexType,
        cache_policy: CachePolicy,
    ) -> Result<CachedIndexBuffer> {
        let factory = self.factory.as_ref();
        let (cached, detached) = {
            let (contents, cache) = buffer.read_back_with_static_cache()?;
            match cache {
                Some(cache) => {
                    let cached = cache.build(factory, source_type, decision.destination,
                        contents, decision.remap_restart)?;
                    (cached, None)
                }
                None => {
                    let mut cache = StaticIndexCache::new();
                    let cached = cache.build(factory, source_type, decision.destination,
                        contents, decision.remap_restart)?;
                    (cached, Some(cache))
                }
            }
        };

        if let Some(cache) = detached {
            bridge_debug!(SOURCE, "Attached static cache to buffer {:?} ({:?} policy)",
                buffer.id(), cache_policy);
            buffer.attach_static_cache(cache);
        }
        Ok(cached)
    }

    fn cached_output(
        path: TranslationPath,
        cached: &CachedIndexBuffer,
        offset: u32,
        info: SourceIndexInfo,
    ) -> TranslatedIndexData {
        let start_index = offset >> info.index_type.bytes_shift();
        TranslatedIndexData {
            index_type: cached.index_type,
            path,
            buffer: cached.buffer,
            serial: cached.serial,
            start_index,
            start_offset: start_index << cached.index_type.bytes_shift(),
            source: info,
        }
    }

    fn stream(&mut self, decision: &PathDecision, info: SourceIndexInfo, input: &[u8]) -> Result<TranslatedIndexData> {
        let destination = decision.destination;
        let initial_size = self.config.initial_streaming_size;
        let pool = match destination {
            IndexType::U32 => &mut self.streaming_int,
            _ => &mut self.streaming_short,
        };
        let pool = pool.get_or_insert_with(|| StreamingIndexPool::new(destination, initial_size));

        let StreamedRange { buffer, serial, offset } = pool.reserve_and_write(
            self.factory.as_ref(),
            info.count,
            |output| convert_indices(info.index_type, destination, input, info.count,
                decision.remap_restart, output),
        )?;

        Ok(TranslatedIndexData {
            index_type: destination,
            path: TranslationPath::Stream,
            buffer,
            serial,
            start_index: offset >> destination.bytes_shift(),
            start_offset: offset,
            source: info,
        })
    }
}

#[cfg(test)]
#[path = "translator_tests.rs"]
mod tests;
