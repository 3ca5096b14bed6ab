//! Replaying the commands of a compressed meta-block (RFC 7932, sections 4, 5
//! and 9.3).
//!
//! Decoding proceeds in steps: a command header, a single literal or a copy.
//! Every step either completes or leaves the reader and the block trackers
//! where they were, so running out of input can be resumed from the exact bit
//! at which the interrupted step started.

use crate::bit_reader::BitReader;
use crate::block::SwitchState;
use crate::context::{DISTANCE_CONTEXTS, LITERAL_CONTEXTS};
use crate::dictionary;
use crate::error::{Result, StreamError, bail, err};
use crate::header::{CompressedHeader, SHORT_DISTANCE_CODES};
use crate::log::ltrace;
use crate::trace::Trace;
use crate::window::OutputWindow;

/// Insert and copy length code bases of the 64-symbol cells of the
/// insert-and-copy alphabet. Cells 0 and 1 reuse the last distance.
const COMMAND_CELLS: [(u8, u8); 11] = [
    (0, 0),
    (0, 8),
    (0, 0),
    (0, 8),
    (8, 0),
    (8, 8),
    (0, 16),
    (16, 0),
    (8, 16),
    (16, 8),
    (16, 16),
];

/// `(base, extra bits)` of each insert length code.
const INSERT_LENGTHS: [(u32, u8); 24] = [
    (0, 0),
    (1, 0),
    (2, 0),
    (3, 0),
    (4, 0),
    (5, 0),
    (6, 1),
    (8, 1),
    (10, 2),
    (14, 2),
    (18, 3),
    (26, 3),
    (34, 4),
    (50, 4),
    (66, 5),
    (98, 5),
    (130, 6),
    (194, 7),
    (322, 8),
    (578, 9),
    (1090, 10),
    (2114, 12),
    (6210, 14),
    (22594, 24),
];

/// `(base, extra bits)` of each copy length code.
const COPY_LENGTHS: [(u32, u8); 24] = [
    (2, 0),
    (3, 0),
    (4, 0),
    (5, 0),
    (6, 0),
    (7, 0),
    (8, 0),
    (9, 0),
    (10, 1),
    (12, 1),
    (14, 2),
    (18, 2),
    (22, 3),
    (30, 3),
    (38, 4),
    (54, 4),
    (70, 5),
    (102, 5),
    (134, 6),
    (198, 7),
    (326, 8),
    (582, 9),
    (1094, 10),
    (2118, 24),
];

/// Which recent distance each short distance code starts from, counted
/// backwards from the last one.
const SHORT_CODE_INDEX: [usize; 16] = [0, 1, 2, 3, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1];
const SHORT_CODE_DELTA: [isize; 16] = [0, 0, 0, 0, -1, 1, -2, 2, -3, 3, -1, 1, -2, 2, -3, 3];

/// The four most recent distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DistanceRing {
    distances: [usize; 4],
    /// Index of the most recent distance.
    last: usize,
}

impl Default for DistanceRing {
    fn default() -> Self {
        Self {
            distances: [16, 15, 11, 4],
            last: 3,
        }
    }
}

impl DistanceRing {
    /// The `n`-th most recent distance, where 0 is the last one.
    #[inline(always)]
    pub(crate) fn nth_last(&self, n: usize) -> usize {
        self.distances[(self.last + 4 - n) % 4]
    }

    pub(crate) fn push(&mut self, distance: usize) {
        self.last = (self.last + 1) % 4;
        self.distances[self.last] = distance;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// The next symbol is an insert-and-copy command.
    Command,
    Literals {
        insert: u32,
        copy: u32,
        implicit_distance: bool,
    },
    Copy {
        copy: u32,
        implicit_distance: bool,
    },
}

/// A compressed meta-block in the middle of being decoded.
#[derive(Debug, Clone)]
pub(crate) struct MetaBlock {
    header: CompressedHeader,
    /// Bytes left to produce.
    remaining: usize,
    phase: Phase,
}

type Snapshot = [Option<SwitchState>; 3];

impl MetaBlock {
    pub(crate) fn new(header: CompressedHeader, len: usize) -> Self {
        Self {
            header,
            remaining: len,
            phase: Phase::Command,
        }
    }

    /// Decode commands until the meta-block is complete.
    ///
    /// With `strict`, a command whose literals run past the end of the
    /// meta-block is rejected instead of being cut short.
    pub(crate) fn decode(
        &mut self,
        reader: &mut BitReader<'_>,
        window: &mut OutputWindow,
        ring: &mut DistanceRing,
        strict: bool,
        trace: &mut impl Trace,
    ) -> Result<()> {
        while self.remaining > 0 {
            let snapshot = self.snapshot();
            let mut r = reader.clone();

            if let Err(e) = self.step(&mut r, window, ring, strict, trace) {
                self.restore(snapshot);

                return Err(e);
            }

            *reader = r;
        }

        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        [
            self.header.literal_blocks.snapshot(),
            self.header.insert_copy_blocks.snapshot(),
            self.header.distance_blocks.snapshot(),
        ]
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let [literal, insert_copy, distance] = snapshot;

        self.header.literal_blocks.restore(literal);
        self.header.insert_copy_blocks.restore(insert_copy);
        self.header.distance_blocks.restore(distance);
    }

    fn step(
        &mut self,
        reader: &mut BitReader<'_>,
        window: &mut OutputWindow,
        ring: &mut DistanceRing,
        strict: bool,
        trace: &mut impl Trace,
    ) -> Result<()> {
        match self.phase {
            Phase::Command => {
                let (insert, copy, implicit_distance) = self.read_command(reader, trace)?;

                if strict && insert as usize > self.remaining {
                    bail!(StreamError::LiteralOverflow);
                }

                self.phase = if insert > 0 {
                    Phase::Literals {
                        insert,
                        copy,
                        implicit_distance,
                    }
                } else {
                    Phase::Copy {
                        copy,
                        implicit_distance,
                    }
                };
            }
            Phase::Literals {
                insert,
                copy,
                implicit_distance,
            } => {
                let literal = self.read_literal(reader, window)?;

                window.push(literal)?;
                self.remaining -= 1;

                self.phase = if self.remaining == 0 {
                    // The meta-block ended within the literals, the copy is dropped.
                    Phase::Command
                } else if insert > 1 {
                    Phase::Literals {
                        insert: insert - 1,
                        copy,
                        implicit_distance,
                    }
                } else {
                    Phase::Copy {
                        copy,
                        implicit_distance,
                    }
                };
            }
            Phase::Copy {
                copy,
                implicit_distance,
            } => {
                self.copy(reader, window, ring, copy as usize, implicit_distance, trace)?;
                self.phase = Phase::Command;
            }
        }

        Ok(())
    }

    /// Read an insert-and-copy command and return the insert length, the copy
    /// length and whether the last distance is reused.
    fn read_command(
        &mut self,
        reader: &mut BitReader<'_>,
        trace: &mut impl Trace,
    ) -> Result<(u32, u32, bool)> {
        let block_type = self.header.insert_copy_blocks.advance(reader)?;
        let start = reader.position();
        let symbol = self.header.insert_copy_trees[block_type].read_symbol(reader)?;
        trace.field("command", (reader.position() - start) as u8, symbol as u32);

        let cell = (symbol >> 6) as usize;
        let (insert_base, copy_base) = COMMAND_CELLS[cell];
        let insert_code = insert_base + ((symbol >> 3) & 7) as u8;
        let copy_code = copy_base + (symbol & 7) as u8;

        let (base, extra_bits) = INSERT_LENGTHS[insert_code as usize];
        let insert = base + reader.read(extra_bits)?;
        trace.field("insert_length", extra_bits, insert);

        let (base, extra_bits) = COPY_LENGTHS[copy_code as usize];
        let copy = base + reader.read(extra_bits)?;
        trace.field("copy_length", extra_bits, copy);

        Ok((insert, copy, cell < 2))
    }

    #[inline(always)]
    fn read_literal(&mut self, reader: &mut BitReader<'_>, window: &OutputWindow) -> Result<u8> {
        let header = &mut self.header;
        let block_type = header.literal_blocks.advance(reader)?;

        let (p1, p2) = window.last_two();
        let context = header.context_modes[block_type].context_id(p1, p2);
        let tree = header.literal_map[block_type * LITERAL_CONTEXTS + context];

        Ok(header.literal_trees[tree as usize].read_symbol(reader)? as u8)
    }

    fn copy(
        &mut self,
        reader: &mut BitReader<'_>,
        window: &mut OutputWindow,
        ring: &mut DistanceRing,
        len: usize,
        implicit_distance: bool,
        trace: &mut impl Trace,
    ) -> Result<()> {
        let (distance, code) = if implicit_distance {
            (ring.nth_last(0), 0)
        } else {
            let header = &mut self.header;
            let block_type = header.distance_blocks.advance(reader)?;
            let context = if len > 4 { 3 } else { len - 2 };
            let tree = header.distance_map[block_type * DISTANCE_CONTEXTS + context];

            let start = reader.position();
            let code = header.distance_trees[tree as usize].read_symbol(reader)? as u32;
            let distance = read_distance(
                reader,
                code,
                header.postfix_bits,
                header.direct_codes,
                ring,
            )?;
            trace.field("distance", (reader.position() - start) as u8, distance as u32);

            (distance, code)
        };

        let max_distance = window.max_distance();

        if distance > max_distance {
            let word_id = distance - max_distance - 1;
            let word = dictionary::lookup(len, word_id)?;

            ltrace!("dictionary reference {} of length {}", word_id, len);

            if word.len() > self.remaining {
                bail!(StreamError::CopyOverflow);
            }

            window.extend(&word)?;
            self.remaining -= word.len();
        } else {
            if code != 0 {
                ring.push(distance);
            }

            if len > self.remaining {
                bail!(StreamError::CopyOverflow);
            }

            window.copy(distance, len)?;
            self.remaining -= len;
        }

        Ok(())
    }
}

/// Resolve a distance code to a distance, reading its extra bits.
fn read_distance(
    reader: &mut BitReader<'_>,
    code: u32,
    postfix_bits: u8,
    direct_codes: u32,
    ring: &DistanceRing,
) -> Result<usize> {
    if code < SHORT_DISTANCE_CODES {
        let code = code as usize;
        let distance = ring.nth_last(SHORT_CODE_INDEX[code]) as isize + SHORT_CODE_DELTA[code];

        return match distance {
            1.. => Ok(distance as usize),
            _ => err!(StreamError::InvalidDistance),
        };
    }

    if code < SHORT_DISTANCE_CODES + direct_codes {
        return Ok((code - SHORT_DISTANCE_CODES + 1) as usize);
    }

    let x = code - direct_codes - SHORT_DISTANCE_CODES;
    let extra_bits = 1 + (x >> (postfix_bits + 1)) as u8;
    let high = (x >> postfix_bits) & 1;
    let low = x & ((1 << postfix_bits) - 1);
    let offset = ((2 + high) << extra_bits) - 4;
    let extra = reader.read(extra_bits)?;

    Ok((((offset + extra) << postfix_bits) + low + direct_codes + 1) as usize)
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::bit_writer::BitWriter;
    use crate::error::DecodeError;
    use crate::header::PartialHeader;
    use crate::trace::NoTrace;

    /// Insert two literals, copy four bytes with an explicit distance.
    const INSERT_2_COPY_4: u16 = 146;
    /// Insert one literal, copy three bytes from the last distance.
    const INSERT_1_COPY_3_LAST: u16 = 9;
    /// Copy four bytes with an explicit distance.
    const COPY_4: u16 = 130;

    /// Write a header with a single block type per category and the given
    /// insert-and-copy symbols. Literals `a` and `b` get the codes `0` and `1`,
    /// and the only distance code is 16, which is followed by one extra bit.
    fn write_header(writer: &mut BitWriter, commands: &[u16]) {
        writer.write(0, 1).write(0, 1).write(0, 1);
        writer.write(0, 2).write(0, 4);
        writer.write(0, 2);
        writer.write(0, 1).write(0, 1);
        writer.write_simple_code(8, &[b'a' as u16, b'b' as u16]);
        writer.write_simple_code(10, commands);
        writer.write_simple_code(6, &[16]);
    }

    fn decode(writer: &BitWriter, len: usize, strict: bool) -> (Result<()>, Vec<u8>, DistanceRing) {
        let data = writer.finish();
        let mut reader = BitReader::new(&data);
        let header = PartialHeader::default().read(&mut reader, &mut NoTrace).unwrap();

        let mut block = MetaBlock::new(header, len);
        let mut window = OutputWindow::new(None);
        window.set_window_bits(16);
        let mut ring = DistanceRing::default();

        let result = block.decode(&mut reader, &mut window, &mut ring, strict, &mut NoTrace);

        (result, window.into_pending(), ring)
    }

    fn two_commands() -> BitWriter {
        let mut writer = BitWriter::new();
        write_header(&mut writer, &[INSERT_2_COPY_4, INSERT_1_COPY_3_LAST]);
        // `ab`, then four bytes from distance 2.
        writer.write_code(1, 1).write_code(0, 1).write_code(1, 1).write(1, 1);
        // `a`, then three bytes from the last distance.
        writer.write_code(0, 1).write_code(0, 1);

        writer
    }

    #[test]
    fn literals_and_copies() {
        let (result, output, ring) = decode(&two_commands(), 10, false);

        assert_eq!(result, Ok(()));
        assert_eq!(output, b"ababababab");
        assert_eq!(ring.nth_last(0), 2);
        assert_eq!(ring.nth_last(1), 4);
    }

    #[test]
    fn resumes_after_every_byte() {
        let writer = two_commands();
        let data = writer.finish();
        let mut reader = BitReader::new(&data);
        let header = PartialHeader::default().read(&mut reader, &mut NoTrace).unwrap();
        let mut position = reader.position();

        let mut block = MetaBlock::new(header, 10);
        let mut window = OutputWindow::new(None);
        window.set_window_bits(16);
        let mut ring = DistanceRing::default();

        for end in position.div_ceil(8)..=data.len() {
            let mut reader = BitReader::at(&data[..end], position);
            let result = block.decode(&mut reader, &mut window, &mut ring, false, &mut NoTrace);
            position = reader.position();

            if end < data.len() {
                assert_eq!(result, Err(DecodeError::NeedMoreInput));
            } else {
                assert_eq!(result, Ok(()));
            }
        }

        assert_eq!(window.into_pending(), b"ababababab");
    }

    #[test]
    fn dictionary_reference() {
        let mut writer = BitWriter::new();
        write_header(&mut writer, &[COPY_4]);
        // Distance 1 is past the start of the output.
        writer.write(0, 1);

        let (result, output, ring) = decode(&writer, 4, false);

        assert_eq!(result, Ok(()));
        assert_eq!(output, b"time");
        assert_eq!(ring, DistanceRing::default());
    }

    #[test]
    fn copy_past_end_of_meta_block() {
        let mut writer = BitWriter::new();
        write_header(&mut writer, &[INSERT_2_COPY_4]);
        writer.write_code(0, 1).write_code(1, 1).write(1, 1);

        let (result, output, _) = decode(&writer, 3, false);

        assert_eq!(result, Err(StreamError::CopyOverflow.into()));
        assert_eq!(output, b"ab");
    }

    #[test]
    fn literals_past_end_of_meta_block() {
        let mut writer = BitWriter::new();
        write_header(&mut writer, &[INSERT_2_COPY_4]);
        writer.write_code(1, 1);

        let (result, output, _) = decode(&writer, 1, false);
        assert_eq!(result, Ok(()));
        assert_eq!(output, b"b");

        let (result, output, _) = decode(&writer, 1, true);
        assert_eq!(result, Err(StreamError::LiteralOverflow.into()));
        assert_eq!(output, b"");
    }

    #[test]
    fn short_distance_codes() {
        let ring = DistanceRing::default();
        let reader = BitReader::new(&[]);
        let expected = [4, 11, 15, 16, 3, 5, 2, 6, 1, 7, 10, 12, 9, 13, 8, 14];

        for (code, expected) in expected.into_iter().enumerate() {
            let mut reader = reader.clone();
            assert_eq!(read_distance(&mut reader, code as u32, 0, 0, &ring), Ok(expected));
        }

        let mut ring = DistanceRing::default();
        ring.push(1);

        let mut reader = reader.clone();
        assert_eq!(
            read_distance(&mut reader, 4, 0, 0, &ring),
            Err(StreamError::InvalidDistance.into())
        );
        assert_eq!(read_distance(&mut reader, 5, 0, 0, &ring), Ok(2));
    }

    #[test]
    fn direct_and_long_distance_codes() {
        let read = |data: &[u8], code, postfix_bits, direct_codes| {
            let mut reader = BitReader::new(data);
            read_distance(&mut reader, code, postfix_bits, direct_codes, &DistanceRing::default())
        };

        assert_eq!(read(&[0], 16, 0, 0), Ok(1));
        assert_eq!(read(&[1], 16, 0, 0), Ok(2));
        assert_eq!(read(&[0], 17, 0, 0), Ok(3));
        assert_eq!(read(&[1], 17, 0, 0), Ok(4));
        assert_eq!(read(&[0], 18, 0, 0), Ok(5));
        assert_eq!(read(&[3], 18, 0, 0), Ok(8));
        assert_eq!(read(&[0], 19, 0, 0), Ok(9));

        assert_eq!(read(&[], 16, 1, 4), Ok(1));
        assert_eq!(read(&[], 19, 1, 4), Ok(4));
        assert_eq!(read(&[0], 20, 1, 4), Ok(5));
        assert_eq!(read(&[1], 20, 1, 4), Ok(7));
        assert_eq!(read(&[0], 21, 1, 4), Ok(6));
        assert_eq!(read(&[1], 21, 1, 4), Ok(8));
        assert_eq!(read(&[], 20, 1, 4), Err(DecodeError::NeedMoreInput));
    }
}
