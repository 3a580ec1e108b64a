/*!
# Index Bridge

Index buffer translation between a graphics API front-end and a rendering
backend.

Front-ends accept 8, 16 and 32-bit index data, either from client memory or
from a backing buffer object. Backends bind only 16 and 32-bit indices and
may mishandle the 16-bit primitive restart sentinel. For every indexed draw
this crate decides how to hand the indices over and produces a descriptor of
backend-bindable index data.

## Architecture

- **IndexTranslator**: Per-context entry point (`prepare`)
- **Path classifier**: Pure decision between the four translation paths
  (Direct, CachedStatic, BuildCache, Stream)
- **Converter**: Widening and sentinel remapping of index arrays
- **StreamingIndexPool**: Append-only scratch buffers for per-call data
- **StaticIndexCache**: Whole-buffer translations owned by backing buffers
- **IndexBuffer / IndexBufferFactory / SourceBuffer**: Traits implemented by
  backends and front-ends

Backend implementations provide concrete types that implement these traits.
*/

// Internal modules
mod error;
pub mod log;
pub mod format;
pub mod converter;
pub mod backend;
pub mod source;
pub mod static_cache;
pub mod streaming;
pub mod classifier;
pub mod translated;
pub mod translator;

#[cfg(test)]
mod mock_backend;

// Main bridge namespace module
pub mod bridge {
    // Error types
    pub use crate::error::{Error, Result};

    // Entry point
    pub use crate::translator::{IndexTranslator, TranslatorConfig, TranslationStats};

    // Index formats and data descriptors
    pub use crate::format::{IndexType, IndexRange};
    pub use crate::source::{SourceBuffer, IndexSource, SourceIndexData, SourceIndexInfo, CachePolicy};
    pub use crate::translated::TranslatedIndexData;
    pub use crate::classifier::TranslationPath;

    // Backend traits
    pub use crate::backend::{
        IndexBuffer, IndexBufferFactory, MappedIndexRange, BackendQuirks, BufferId, Serial,
    };
    pub use crate::static_cache::StaticIndexCache;

    // Logging sub-module (types and registry, macros stay at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, Location, DefaultLogger, set_logger, reset_logger};
    }
}
