//! Element-wise index conversion
//!
//! Widens index data to a width the backend can bind and optionally rewrites
//! the primitive restart sentinel so it stays a sentinel at the new width.
//!
//! Supported conversions:
//! - identity (`w -> w`): raw byte copy
//! - `U8 -> U16`
//! - `U16 -> U32`
//!
//! Data is read and written in native byte order, the layout backends
//! consume index buffers in.

use bytemuck::Pod;
use crate::error::Result;
use crate::format::IndexType;
use crate::bridge_bail;

const SOURCE: &str = "index_bridge::converter";

/// Index element with a restart sentinel
trait IndexElement: Pod + PartialEq {
    const RESTART: Self;
}

impl IndexElement for u8 {
    const RESTART: Self = u8::MAX;
}

impl IndexElement for u16 {
    const RESTART: Self = u16::MAX;
}

impl IndexElement for u32 {
    const RESTART: Self = u32::MAX;
}

fn convert_index_array<In, Out>(input: &[u8], output: &mut [u8], remap_restart: bool)
where
    In: IndexElement + Into<Out>,
    Out: IndexElement,
{
    let sources = input.chunks_exact(std::mem::size_of::<In>());
    let destinations = output.chunks_exact_mut(std::mem::size_of::<Out>());

    for (src, dst) in sources.zip(destinations) {
        let value: In = bytemuck::pod_read_unaligned(src);
        let converted: Out = if remap_restart && value == In::RESTART {
            Out::RESTART
        } else {
            value.into()
        };
        dst.copy_from_slice(bytemuck::bytes_of(&converted));
    }
}

/// Convert `count` indices from `input` into `output`
///
/// `output` is typically a mapped backend region. Only the first
/// `count * destination.size_bytes()` bytes of it are written.
///
/// # Arguments
///
/// * `source` - Element type of `input`
/// * `destination` - Element type to write
/// * `input` - Source bytes (at least `count` source elements)
/// * `count` - Number of indices to convert
/// * `remap_restart` - Rewrite the source sentinel to the destination sentinel
/// * `output` - Destination bytes (at least `count` destination elements)
///
/// # Errors
///
/// - `Unsupported` for any pair other than identity, `U8 -> U16`, `U16 -> U32`
/// - `OutOfMemory` when `count` elements do not fit a `u32` byte size
/// - `InvalidResource` when `input` or `output` is too short
pub fn convert_indices(
    source: IndexType,
    destination: IndexType,
    input: &[u8],
    count: u32,
    remap_restart: bool,
    output: &mut [u8],
) -> Result<()> {
    let convert: fn(&[u8], &mut [u8], bool) = match (source, destination) {
        // Sentinel maps to itself at equal widths, so remapping is a no-op
        (s, d) if s == d => |input: &[u8], output: &mut [u8], _: bool| output.copy_from_slice(input),
        (IndexType::U8, IndexType::U16) => convert_index_array::<u8, u16>,
        (IndexType::U16, IndexType::U32) => convert_index_array::<u16, u32>,
        _ => bridge_bail!(SOURCE, Unsupported,
            "Cannot convert {:?} indices to {:?}", source, destination),
    };

    let (Some(input_len), Some(output_len)) = (source.byte_size(count), destination.byte_size(count)) else {
        bridge_bail!(SOURCE, OutOfMemory,
            "Converting {} indices of {} bytes each exceeds the maximum buffer size",
            count, destination.size_bytes());
    };
    let (input_len, output_len) = (input_len as usize, output_len as usize);

    if input.len() < input_len {
        bridge_bail!(SOURCE, InvalidResource,
            "Source holds {} bytes, {} {:?} indices need {}", input.len(), count, source, input_len);
    }
    if output.len() < output_len {
        bridge_bail!(SOURCE, InvalidResource,
            "Destination holds {} bytes, {} {:?} indices need {}", output.len(), count, destination, output_len);
    }

    convert(&input[..input_len], &mut output[..output_len], remap_restart);
    Ok(())
}

#[cfg(test)]
#[path = "converter_tests.rs"]
mod tests;
