//! Canonical Huffman tables.
//!
//! Codes are stored in the stream starting with their most significant bit,
//! while the bit reader hands out bits least significant first. A peeked bit
//! window therefore holds every code bit-reversed, and the lookup table is
//! indexed accordingly.

use alloc::vec;
use alloc::vec::Vec;

use crate::bit_reader::BitReader;
use crate::error::{DecodeError, HuffmanError, Result, bail};

/// The longest code length the format allows.
pub(crate) const MAX_CODE_LENGTH: u8 = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Entry {
    bits: u8,
    symbol: u16,
}

/// A canonical prefix code with a single-lookup decode table.
#[derive(Debug, Clone)]
pub(crate) struct HuffmanTable {
    /// Width of the lookup window, equal to the longest code length.
    table_bits: u8,
    entries: Vec<Entry>,
}

impl HuffmanTable {
    /// A code with a single symbol, which occupies zero bits.
    pub(crate) fn single(symbol: u16) -> Self {
        Self {
            table_bits: 0,
            entries: vec![Entry { bits: 0, symbol }],
        }
    }

    /// Build a table where symbol `i` has code length `lengths[i]`.
    pub(crate) fn from_lengths(lengths: &[u8]) -> Result<Self> {
        let symbols = (0..lengths.len() as u16).collect::<Vec<_>>();

        Self::build(lengths, &symbols)
    }

    /// Build a table from pairs of code lengths and symbols.
    ///
    /// Symbols with a code length of zero are not part of the code. A code
    /// with exactly one symbol is valid and consumes no bits; otherwise the
    /// lengths must describe a complete prefix code.
    pub(crate) fn build(lengths: &[u8], symbols: &[u16]) -> Result<Self> {
        debug_assert_eq!(lengths.len(), symbols.len());

        let mut codes = lengths
            .iter()
            .zip(symbols)
            .filter(|(len, _)| **len != 0)
            .map(|(&len, &symbol)| (len, symbol))
            .collect::<Vec<_>>();

        match codes.as_slice() {
            [] => bail!(HuffmanError::EmptyCode),
            [(_, symbol)] => return Ok(Self::single(*symbol)),
            _ => {}
        }

        let mut space = 0_u32;

        for &(len, _) in &codes {
            if len > MAX_CODE_LENGTH {
                bail!(HuffmanError::InvalidLengths);
            }

            space += 1 << (MAX_CODE_LENGTH - len);
        }

        if space != 1 << MAX_CODE_LENGTH {
            bail!(HuffmanError::InvalidLengths);
        }

        codes.sort_unstable();

        let table_bits = codes[codes.len() - 1].0;
        let mut entries = vec![Entry::default(); 1 << table_bits];

        let mut code = 0_u32;
        let mut prev_len = codes[0].0;

        for (i, &(len, symbol)) in codes.iter().enumerate() {
            if i > 0 {
                code = (code + 1) << (len - prev_len);
            }

            prev_len = len;

            let entry = Entry { bits: len, symbol };
            let start = reverse_bits(code, len) as usize;

            for slot in entries.iter_mut().skip(start).step_by(1 << len) {
                *slot = entry;
            }
        }

        Ok(Self {
            table_bits,
            entries,
        })
    }

    /// Look up a window of peeked bits, returning the code length and symbol.
    #[inline(always)]
    pub(crate) fn decode(&self, bits: u32) -> (u8, u16) {
        let entry = self.entries[(bits & ((1 << self.table_bits) - 1)) as usize];

        (entry.bits, entry.symbol)
    }

    /// Decode the next symbol from the reader.
    #[inline(always)]
    pub(crate) fn read_symbol(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        let (bits, symbol) = self.decode(reader.peek_padded(self.table_bits));

        if bits as usize > reader.remaining_bits() {
            bail!(DecodeError::NeedMoreInput);
        }

        reader.consume(bits);

        Ok(symbol)
    }
}

#[inline(always)]
fn reverse_bits(code: u32, len: u8) -> u32 {
    code.reverse_bits() >> (32 - len as u32)
}
