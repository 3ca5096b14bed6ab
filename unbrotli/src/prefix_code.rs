//! Reading prefix code descriptions (RFC 7932, section 3).

use alloc::vec;

use crate::bit_reader::BitReader;
use crate::error::{HeaderError, HuffmanError, Result, bail};
use crate::huffman::{HuffmanTable, MAX_CODE_LENGTH};
use crate::log::ltrace;
use crate::trace::{Trace, read_field};

const CODE_LENGTH_CODES: usize = 18;

/// The order in which code length code lengths are stored.
const CODE_LENGTH_CODE_ORDER: [usize; CODE_LENGTH_CODES] =
    [1, 2, 3, 4, 0, 5, 17, 6, 16, 7, 8, 9, 10, 11, 12, 13, 14, 15];

/// The fixed prefix code for code length code lengths, indexed by the next
/// four bits: `(bits used, length)`.
const CODE_LENGTH_CODE_LENGTHS: [(u8, u8); 16] = [
    (2, 0),
    (2, 4),
    (2, 3),
    (3, 2),
    (2, 0),
    (2, 4),
    (2, 3),
    (4, 1),
    (2, 0),
    (2, 4),
    (2, 3),
    (3, 2),
    (2, 0),
    (2, 4),
    (2, 3),
    (4, 5),
];

const REPEAT_PREVIOUS: u8 = 16;
const REPEAT_ZERO: u8 = 17;
/// The length repeated by code 16 before any nonzero length was read.
const INITIAL_REPEAT_LENGTH: u8 = 8;

/// Read a prefix code over an alphabet of `alphabet_size` symbols.
pub(crate) fn read_prefix_code(
    reader: &mut BitReader<'_>,
    alphabet_size: usize,
    trace: &mut impl Trace,
) -> Result<HuffmanTable> {
    let hskip = read_field(reader, trace, "hskip", 2)?;

    if hskip == 1 {
        read_simple(reader, alphabet_size, trace)
    } else {
        read_complex(reader, hskip as usize, alphabet_size, trace)
    }
}

fn read_simple(
    reader: &mut BitReader<'_>,
    alphabet_size: usize,
    trace: &mut impl Trace,
) -> Result<HuffmanTable> {
    let num_symbols = read_field(reader, trace, "nsym", 2)? as usize + 1;
    let alphabet_bits = (usize::BITS - (alphabet_size - 1).leading_zeros()) as u8;

    let mut symbols = [0_u16; 4];

    for slot in &mut symbols[..num_symbols] {
        let symbol = read_field(reader, trace, "symbol", alphabet_bits)?;

        if symbol as usize >= alphabet_size {
            bail!(HeaderError::SymbolOutOfRange);
        }

        *slot = symbol as u16;
    }

    let symbols = &symbols[..num_symbols];

    if symbols.iter().enumerate().any(|(i, s)| symbols[..i].contains(s)) {
        bail!(HeaderError::DuplicateSymbol);
    }

    let lengths: &[u8] = match num_symbols {
        1 => return Ok(HuffmanTable::single(symbols[0])),
        2 => &[1, 1],
        3 => &[1, 2, 2],
        _ => {
            if read_field(reader, trace, "tree_select", 1)? == 1 {
                &[1, 2, 3, 3]
            } else {
                &[2, 2, 2, 2]
            }
        }
    };

    ltrace!("simple prefix code with {} symbols", num_symbols);

    HuffmanTable::build(lengths, symbols)
}

fn read_complex(
    reader: &mut BitReader<'_>,
    hskip: usize,
    alphabet_size: usize,
    trace: &mut impl Trace,
) -> Result<HuffmanTable> {
    let code_length_table = read_code_length_code(reader, hskip, trace)?;

    let mut lengths = vec![0_u8; alphabet_size];
    let mut symbol = 0;
    let mut prev_len = INITIAL_REPEAT_LENGTH;
    let mut repeat = 0_usize;
    let mut repeat_len = 0;
    let mut space = 1_i32 << MAX_CODE_LENGTH;

    while symbol < alphabet_size && space > 0 {
        let code = code_length_table.read_symbol(reader)? as u8;

        if code < REPEAT_PREVIOUS {
            repeat = 0;
            lengths[symbol] = code;
            symbol += 1;

            if code != 0 {
                prev_len = code;
                space -= 1 << (MAX_CODE_LENGTH - code);
            }

            continue;
        }

        let (extra_bits, new_len) = if code == REPEAT_PREVIOUS {
            (2, prev_len)
        } else {
            debug_assert_eq!(code, REPEAT_ZERO);
            (3, 0)
        };

        if repeat_len != new_len {
            repeat = 0;
            repeat_len = new_len;
        }

        let old_repeat = repeat;

        if repeat > 0 {
            repeat = (repeat - 2) << extra_bits;
        }

        repeat += reader.read(extra_bits)? as usize + 3;
        let delta = repeat - old_repeat;

        if symbol + delta > alphabet_size {
            bail!(HuffmanError::CodeLengthOverflow);
        }

        lengths[symbol..symbol + delta].fill(new_len);
        symbol += delta;

        if new_len != 0 {
            space -= (delta as i32) << (MAX_CODE_LENGTH - new_len);
        }
    }

    if space != 0 {
        bail!(HuffmanError::InvalidLengths);
    }

    ltrace!(
        "complex prefix code over {} symbols, {} used",
        alphabet_size,
        symbol
    );

    HuffmanTable::from_lengths(&lengths)
}

/// Read the code that the symbol code lengths are encoded with.
fn read_code_length_code(
    reader: &mut BitReader<'_>,
    hskip: usize,
    trace: &mut impl Trace,
) -> Result<HuffmanTable> {
    let mut lengths = [0_u8; CODE_LENGTH_CODES];
    let mut space = 32_i32;
    let mut num_codes = 0;

    for &symbol in &CODE_LENGTH_CODE_ORDER[hskip..] {
        let (bits, len) = CODE_LENGTH_CODE_LENGTHS[reader.peek_padded(4) as usize];
        // Fails without consuming if the code is incomplete.
        reader.read(bits)?;
        trace.field("code_length_code_length", bits, len as u32);

        lengths[symbol] = len;

        if len != 0 {
            num_codes += 1;
            space -= 32 >> len;

            if space <= 0 {
                break;
            }
        }
    }

    if num_codes != 1 && space != 0 {
        bail!(HuffmanError::InvalidCodeLengthCode);
    }

    HuffmanTable::from_lengths(&lengths).map_err(|_| HuffmanError::InvalidCodeLengthCode.into())
}
