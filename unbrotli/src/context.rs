//! Context modelling: context modes and context maps (RFC 7932, section 7).

use alloc::vec;
use alloc::vec::Vec;

use crate::bit_reader::BitReader;
use crate::error::{HeaderError, Result, bail};
use crate::log::ltrace;
use crate::prefix_code::read_prefix_code;
use crate::trace::{Trace, read_field};

/// The number of literal contexts per literal block type.
pub(crate) const LITERAL_CONTEXTS: usize = 64;
/// The number of distance contexts per distance block type.
pub(crate) const DISTANCE_CONTEXTS: usize = 4;

/// How the last two output bytes select a literal context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContextMode {
    Lsb6,
    Msb6,
    Utf8,
    Signed,
}

impl ContextMode {
    pub(crate) fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Lsb6,
            1 => Self::Msb6,
            2 => Self::Utf8,
            _ => Self::Signed,
        }
    }

    /// Compute the context id from the last byte `p1` and the one before it, `p2`.
    #[inline(always)]
    pub(crate) fn context_id(self, p1: u8, p2: u8) -> usize {
        let id = match self {
            Self::Lsb6 => p1 & 0x3f,
            Self::Msb6 => p1 >> 2,
            Self::Utf8 => UTF8_FIRST[p1 as usize] | UTF8_SECOND[p2 as usize],
            Self::Signed => (SIGNED[p1 as usize] << 3) | SIGNED[p2 as usize],
        };

        id as usize
    }
}

/// Read a context map with `size` entries selecting among `num_trees` trees.
pub(crate) fn read_context_map(
    reader: &mut BitReader<'_>,
    size: usize,
    num_trees: usize,
    trace: &mut impl Trace,
) -> Result<Vec<u8>> {
    let mut map = vec![0_u8; size];

    if num_trees < 2 {
        return Ok(map);
    }

    let max_run_prefix = if read_field(reader, trace, "rlemax_present", 1)? == 1 {
        read_field(reader, trace, "rlemax", 4)? as usize + 1
    } else {
        0
    };

    ltrace!(
        "context map: {} entries, {} trees, run length prefix {}",
        size,
        num_trees,
        max_run_prefix
    );

    let table = read_prefix_code(reader, num_trees + max_run_prefix, trace)?;
    let mut i = 0;

    while i < size {
        let symbol = table.read_symbol(reader)? as usize;

        if symbol == 0 {
            i += 1;
        } else if symbol <= max_run_prefix {
            let run = (1 << symbol) + reader.read(symbol as u8)? as usize;

            if i + run > size {
                bail!(HeaderError::ContextMapOverflow);
            }

            // The map is zero-initialized.
            i += run;
        } else {
            map[i] = (symbol - max_run_prefix) as u8;
            i += 1;
        }
    }

    if read_field(reader, trace, "imtf", 1)? == 1 {
        inverse_move_to_front(&mut map);
    }

    Ok(map)
}

/// Replace every index by the value at that rank of a move-to-front list.
pub(crate) fn inverse_move_to_front(values: &mut [u8]) {
    let mut mtf: [u8; 256] = core::array::from_fn(|i| i as u8);

    for value in values {
        let index = *value as usize;
        let decoded = mtf[index];
        *value = decoded;

        mtf.copy_within(..index, 1);
        mtf[0] = decoded;
    }
}

#[rustfmt::skip]
static UTF8_FIRST: [u8; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 4, 4, 0, 0, 4, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    8, 12, 16, 12, 12, 20, 12, 16, 24, 28, 12, 12, 32, 12, 36, 12,
    44, 44, 44, 44, 44, 44, 44, 44, 44, 44, 32, 32, 24, 40, 28, 12,
    12, 48, 52, 52, 52, 48, 52, 52, 52, 48, 52, 52, 52, 52, 52, 48,
    52, 52, 52, 52, 52, 48, 52, 52, 52, 52, 52, 24, 12, 28, 12, 12,
    12, 56, 60, 60, 60, 56, 60, 60, 60, 56, 60, 60, 60, 60, 60, 56,
    60, 60, 60, 60, 60, 56, 60, 60, 60, 60, 60, 24, 12, 28, 12, 0,
    0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1,
    0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1,
    0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1,
    0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1,
    2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3,
    2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3,
    2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3,
    2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3,
];

#[rustfmt::skip]
static UTF8_SECOND: [u8; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1,
    1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1,
    1, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 1, 1, 1, 1, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
];

#[rustfmt::skip]
static SIGNED: [u8; 256] = [
    0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 7,
];
