//! Stream and meta-block headers (RFC 7932, sections 9.1 and 9.2).

use alloc::vec::Vec;

use crate::bit_reader::BitReader;
use crate::block::{BlockTracker, read_count};
use crate::context::{
    ContextMode, DISTANCE_CONTEXTS, LITERAL_CONTEXTS, read_context_map,
};
use crate::error::{HeaderError, Result, bail};
use crate::huffman::HuffmanTable;
use crate::log::ldebug;
use crate::prefix_code::read_prefix_code;
use crate::trace::{Trace, read_field};

const LITERAL_ALPHABET: usize = 256;
pub(crate) const INSERT_COPY_ALPHABET: usize = 704;
/// The number of distance codes that reuse recent distances.
pub(crate) const SHORT_DISTANCE_CODES: u32 = 16;

/// Read the window size exponent from the start of the stream.
pub(crate) fn read_window_bits(reader: &mut BitReader<'_>, trace: &mut impl Trace) -> Result<u8> {
    let start = reader.position();

    let window_bits = if !reader.read_bit()? {
        16
    } else {
        match reader.read(3)? {
            0 => match reader.read(3)? {
                0 => 17,
                1 => bail!(HeaderError::LargeWindow),
                n => 8 + n as u8,
            },
            n => 17 + n as u8,
        }
    };

    trace.field("wbits", (reader.position() - start) as u8, window_bits as u32);
    ldebug!("window size: {} bits", window_bits);

    Ok(window_bits)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MetaBlockHeader {
    pub(crate) is_last: bool,
    pub(crate) kind: MetaBlockKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MetaBlockKind {
    /// The empty meta-block that terminates the stream.
    LastEmpty,
    /// `skip` bytes of metadata follow, starting at a byte boundary.
    Metadata { skip: usize },
    /// `len` raw bytes follow, starting at a byte boundary.
    Uncompressed { len: usize },
    /// A compressed header and `len` bytes worth of commands follow.
    Compressed { len: usize },
}

/// Read a meta-block header up to the point where its kind is known.
///
/// For metadata and uncompressed meta-blocks, the reader is left at the
/// byte boundary where their data starts.
pub(crate) fn read_meta_block_header(
    reader: &mut BitReader<'_>,
    trace: &mut impl Trace,
) -> Result<MetaBlockHeader> {
    let is_last = read_field(reader, trace, "islast", 1)? == 1;

    if is_last && read_field(reader, trace, "islastempty", 1)? == 1 {
        return Ok(MetaBlockHeader {
            is_last,
            kind: MetaBlockKind::LastEmpty,
        });
    }

    let kind = match read_field(reader, trace, "mnibbles", 2)? {
        3 => MetaBlockKind::Metadata {
            skip: read_metadata_length(reader, trace)?,
        },
        nibbles => {
            let len = read_length(reader, trace, nibbles as u8 + 4)?;

            if !is_last && read_field(reader, trace, "isuncompressed", 1)? == 1 {
                if reader.align()? != 0 {
                    bail!(HeaderError::NonZeroPadding);
                }

                MetaBlockKind::Uncompressed { len }
            } else {
                MetaBlockKind::Compressed { len }
            }
        }
    };

    ldebug!("meta-block: {:?}, last: {}", kind, is_last);

    Ok(MetaBlockHeader { is_last, kind })
}

fn read_length(reader: &mut BitReader<'_>, trace: &mut impl Trace, nibbles: u8) -> Result<usize> {
    let mut len = 0;

    for i in 0..nibbles {
        let nibble = reader.read(4)? as usize;

        if i + 1 == nibbles && nibbles > 4 && nibble == 0 {
            bail!(HeaderError::ExuberantNibble);
        }

        len |= nibble << (4 * i);
    }

    trace.field("mlen", 4 * nibbles, len as u32 + 1);

    Ok(len + 1)
}

fn read_metadata_length(reader: &mut BitReader<'_>, trace: &mut impl Trace) -> Result<usize> {
    if read_field(reader, trace, "reserved", 1)? != 0 {
        bail!(HeaderError::ReservedBit);
    }

    let num_bytes = read_field(reader, trace, "mskipbytes", 2)? as u8;
    let mut len = 0;

    for i in 0..num_bytes {
        let byte = reader.read(8)? as usize;

        if i + 1 == num_bytes && num_bytes > 1 && byte == 0 {
            bail!(HeaderError::ExuberantMetadataLength);
        }

        len |= byte << (8 * i);
    }

    let skip = if num_bytes == 0 { 0 } else { len + 1 };
    trace.field("mskiplen", 8 * num_bytes, skip as u32);

    if reader.align()? != 0 {
        bail!(HeaderError::NonZeroPadding);
    }

    Ok(skip)
}

/// Everything a compressed meta-block declares before its commands.
#[derive(Debug, Clone)]
pub(crate) struct CompressedHeader {
    pub(crate) literal_blocks: BlockTracker,
    pub(crate) insert_copy_blocks: BlockTracker,
    pub(crate) distance_blocks: BlockTracker,
    pub(crate) postfix_bits: u8,
    pub(crate) direct_codes: u32,
    /// The context mode of each literal block type.
    pub(crate) context_modes: Vec<ContextMode>,
    pub(crate) literal_map: Vec<u8>,
    pub(crate) distance_map: Vec<u8>,
    pub(crate) literal_trees: Vec<HuffmanTable>,
    /// One tree per insert-and-copy block type.
    pub(crate) insert_copy_trees: Vec<HuffmanTable>,
    pub(crate) distance_trees: Vec<HuffmanTable>,
}

/// A compressed header that is read in parts.
///
/// The block and context map layout is one part and every prefix code is
/// another. Parts that were complete when the input ran out are kept, so
/// resuming continues with the first missing one.
#[derive(Debug, Default)]
pub(crate) struct PartialHeader {
    layout: Option<Layout>,
    literal_trees: Vec<HuffmanTable>,
    insert_copy_trees: Vec<HuffmanTable>,
    distance_trees: Vec<HuffmanTable>,
}

#[derive(Debug)]
struct Layout {
    literal_blocks: BlockTracker,
    insert_copy_blocks: BlockTracker,
    distance_blocks: BlockTracker,
    postfix_bits: u8,
    direct_codes: u32,
    context_modes: Vec<ContextMode>,
    literal_map: Vec<u8>,
    distance_map: Vec<u8>,
    num_literal_trees: usize,
    num_distance_trees: usize,
}

impl PartialHeader {
    /// Continue reading the header.
    ///
    /// The reader is left after the last complete part when this fails.
    pub(crate) fn read(
        &mut self,
        reader: &mut BitReader<'_>,
        trace: &mut impl Trace,
    ) -> Result<CompressedHeader> {
        let layout = match self.layout.take() {
            Some(layout) => layout,
            None => reader.atomically(|r| Layout::read(r, &mut *trace))?,
        };

        if let Err(e) = self.read_trees(&layout, reader, trace) {
            self.layout = Some(layout);
            return Err(e);
        }

        Ok(CompressedHeader {
            literal_blocks: layout.literal_blocks,
            insert_copy_blocks: layout.insert_copy_blocks,
            distance_blocks: layout.distance_blocks,
            postfix_bits: layout.postfix_bits,
            direct_codes: layout.direct_codes,
            context_modes: layout.context_modes,
            literal_map: layout.literal_map,
            distance_map: layout.distance_map,
            literal_trees: core::mem::take(&mut self.literal_trees),
            insert_copy_trees: core::mem::take(&mut self.insert_copy_trees),
            distance_trees: core::mem::take(&mut self.distance_trees),
        })
    }

    fn read_trees(
        &mut self,
        layout: &Layout,
        reader: &mut BitReader<'_>,
        trace: &mut impl Trace,
    ) -> Result<()> {
        let distance_alphabet =
            (SHORT_DISTANCE_CODES + layout.direct_codes + (48 << layout.postfix_bits)) as usize;

        for (trees, count, alphabet_size) in [
            (&mut self.literal_trees, layout.num_literal_trees, LITERAL_ALPHABET),
            (
                &mut self.insert_copy_trees,
                layout.insert_copy_blocks.num_types(),
                INSERT_COPY_ALPHABET,
            ),
            (&mut self.distance_trees, layout.num_distance_trees, distance_alphabet),
        ] {
            while trees.len() < count {
                let tree = reader.atomically(|r| read_prefix_code(r, alphabet_size, &mut *trace))?;
                trees.push(tree);
            }
        }

        Ok(())
    }
}

impl Layout {
    fn read(reader: &mut BitReader<'_>, trace: &mut impl Trace) -> Result<Self> {
        let literal_blocks = BlockTracker::read(reader, trace, "nbltypesl")?;
        let insert_copy_blocks = BlockTracker::read(reader, trace, "nbltypesi")?;
        let distance_blocks = BlockTracker::read(reader, trace, "nbltypesd")?;

        let postfix_bits = read_field(reader, trace, "npostfix", 2)? as u8;
        let direct_codes = read_field(reader, trace, "ndirect", 4)? << postfix_bits;

        let context_modes = (0..literal_blocks.num_types())
            .map(|_| Ok(ContextMode::from_bits(read_field(reader, trace, "context_mode", 2)?)))
            .collect::<Result<Vec<_>>>()?;

        let num_literal_trees = read_count(reader, trace, "ntreesl")?;
        let literal_map = read_context_map(
            reader,
            literal_blocks.num_types() * LITERAL_CONTEXTS,
            num_literal_trees,
            trace,
        )?;

        let num_distance_trees = read_count(reader, trace, "ntreesd")?;
        let distance_map = read_context_map(
            reader,
            distance_blocks.num_types() * DISTANCE_CONTEXTS,
            num_distance_trees,
            trace,
        )?;

        ldebug!(
            "block types: {}/{}/{}, trees: {} literal, {} distance, postfix bits: {}, direct codes: {}",
            literal_blocks.num_types(),
            insert_copy_blocks.num_types(),
            distance_blocks.num_types(),
            num_literal_trees,
            num_distance_trees,
            postfix_bits,
            direct_codes
        );

        Ok(Self {
            literal_blocks,
            insert_copy_blocks,
            distance_blocks,
            postfix_bits,
            direct_codes,
            context_modes,
            literal_map,
            distance_map,
            num_literal_trees,
            num_distance_trees,
        })
    }
}
