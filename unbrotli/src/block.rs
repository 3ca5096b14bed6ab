//! Block types and block switching (RFC 7932, section 6).

use alloc::boxed::Box;

use crate::bit_reader::BitReader;
use crate::error::Result;
use crate::huffman::HuffmanTable;
use crate::log::ltrace;
use crate::prefix_code::read_prefix_code;
use crate::trace::Trace;

/// The size of the block count alphabet.
const BLOCK_COUNT_CODES: usize = 26;

/// Base value and number of extra bits of each block count code.
const BLOCK_COUNTS: [(u32, u8); BLOCK_COUNT_CODES] = [
    (1, 2),
    (5, 2),
    (9, 2),
    (13, 2),
    (17, 3),
    (25, 3),
    (33, 3),
    (41, 3),
    (49, 4),
    (65, 4),
    (81, 4),
    (97, 4),
    (113, 5),
    (145, 5),
    (177, 5),
    (209, 5),
    (241, 6),
    (305, 6),
    (369, 7),
    (497, 8),
    (753, 9),
    (1265, 10),
    (2289, 11),
    (4337, 12),
    (8433, 13),
    (16625, 24),
];

/// Read a value in 1..=256 stored with the variable-length encoding used by
/// block type and tree counts.
pub(crate) fn read_count(
    reader: &mut BitReader<'_>,
    trace: &mut impl Trace,
    name: &'static str,
) -> Result<usize> {
    let start = reader.position();

    let value = if !reader.read_bit()? {
        1
    } else {
        match reader.read(3)? {
            0 => 2,
            n => (1 << n) + reader.read(n as u8)? as usize + 1,
        }
    };

    trace.field(name, (reader.position() - start) as u8, value as u32);

    Ok(value)
}

/// Tracks the active block type of one category (literals, insert-and-copy
/// commands or distances) while a meta-block is decoded.
#[derive(Debug, Clone)]
pub(crate) enum BlockTracker {
    /// Only one block type exists, so the category never switches.
    FixedSingleType,
    Switching(Box<BlockSwitch>),
}

#[derive(Debug, Clone)]
pub(crate) struct BlockSwitch {
    num_types: usize,
    type_table: HuffmanTable,
    count_table: HuffmanTable,
    state: SwitchState,
}

/// The mutable part of a switching tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SwitchState {
    current: usize,
    /// The type that was active before `current`.
    previous: usize,
    /// Symbols left in the current block.
    remaining: u32,
}

impl BlockTracker {
    /// Read the block type count of a category and, if there is more than one
    /// type, the codes needed to switch between them.
    pub(crate) fn read(
        reader: &mut BitReader<'_>,
        trace: &mut impl Trace,
        name: &'static str,
    ) -> Result<Self> {
        let num_types = read_count(reader, trace, name)?;

        if num_types == 1 {
            return Ok(Self::FixedSingleType);
        }

        let type_table = read_prefix_code(reader, num_types + 2, trace)?;
        let count_table = read_prefix_code(reader, BLOCK_COUNT_CODES, trace)?;
        let remaining = read_block_count(reader, &count_table)?;

        ltrace!("{}: {} block types, first block of {}", name, num_types, remaining);

        Ok(Self::Switching(Box::new(BlockSwitch {
            num_types,
            type_table,
            count_table,
            state: SwitchState {
                current: 0,
                previous: 1,
                remaining,
            },
        })))
    }

    pub(crate) fn num_types(&self) -> usize {
        match self {
            Self::FixedSingleType => 1,
            Self::Switching(switch) => switch.num_types,
        }
    }

    /// Account for one more symbol of this category and return its block type.
    ///
    /// When the current block is exhausted, the next block type and count are
    /// read first. On error neither the reader nor the tracker is changed.
    #[inline(always)]
    pub(crate) fn advance(&mut self, reader: &mut BitReader<'_>) -> Result<usize> {
        match self {
            Self::FixedSingleType => Ok(0),
            Self::Switching(switch) => switch.advance(reader),
        }
    }

    pub(crate) fn snapshot(&self) -> Option<SwitchState> {
        match self {
            Self::FixedSingleType => None,
            Self::Switching(switch) => Some(switch.state),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: Option<SwitchState>) {
        if let (Self::Switching(switch), Some(state)) = (self, snapshot) {
            switch.state = state;
        }
    }
}

impl BlockSwitch {
    #[inline(always)]
    fn advance(&mut self, reader: &mut BitReader<'_>) -> Result<usize> {
        if self.state.remaining == 0 {
            self.switch(reader)?;
        }

        self.state.remaining -= 1;

        Ok(self.state.current)
    }

    fn switch(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let mut r = reader.clone();

        let next = match self.type_table.read_symbol(&mut r)? as usize {
            0 => self.state.previous,
            1 => (self.state.current + 1) % self.num_types,
            code => code - 2,
        };
        let remaining = read_block_count(&mut r, &self.count_table)?;

        ltrace!("switching to block type {} for {} symbols", next, remaining);

        self.state = SwitchState {
            current: next,
            previous: self.state.current,
            remaining,
        };
        *reader = r;

        Ok(())
    }
}

fn read_block_count(reader: &mut BitReader<'_>, table: &HuffmanTable) -> Result<u32> {
    let (base, extra_bits) = BLOCK_COUNTS[table.read_symbol(reader)? as usize];

    Ok(base + reader.read(extra_bits)?)
}
