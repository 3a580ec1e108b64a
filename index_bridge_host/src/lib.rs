/*!
# Index Bridge - Host Memory Backend

Host memory implementation of the index_bridge backend traits.

Index buffers live in a shared host heap that stands in for device memory.
Backing buffers track their own modifications, invalidate their static
translation cache on every write, and promote themselves to static caching
once they are streamed from repeatedly without being modified.
*/

mod host_heap;
mod host_index_buffer;
mod host_source_buffer;
mod host_factory;

pub use host_heap::HostHeap;
pub use host_index_buffer::HostIndexBuffer;
pub use host_source_buffer::{HostSourceBuffer, BufferUsage, PROMOTION_FACTOR};
pub use host_factory::HostBufferFactory;
