//! Bit-level reader for Brotli streams.
//!
//! Brotli packs fields starting at the least significant bit of each byte,
//! and multi-bit values are stored least significant bit first.

use crate::error::{DecodeError, Result, bail};

/// The widest field a single read may request.
pub(crate) const MAX_READ_BITS: u8 = 24;

#[derive(Debug, Clone)]
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    bit_offset: usize,
}

impl<'a> BitReader<'a> {
    #[inline(always)]
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Create a reader positioned at `bit_offset`.
    #[inline(always)]
    pub(crate) fn at(data: &'a [u8], bit_offset: usize) -> Self {
        debug_assert!(bit_offset <= data.len() * 8);

        Self { data, bit_offset }
    }

    /// The number of bits left before the end of the input.
    #[inline(always)]
    pub(crate) fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.bit_offset
    }

    /// Return the next `num_bits` bits, treating bits past the end of the
    /// input as zero.
    #[inline(always)]
    pub(crate) fn peek_padded(&self, num_bits: u8) -> u32 {
        debug_assert!(num_bits <= MAX_READ_BITS);

        let byte_pos = self.byte_pos();
        let mut window = 0_u64;

        // 24 bits starting at any bit position fit into four bytes.
        for i in 0..4 {
            if let Some(&byte) = self.data.get(byte_pos + i) {
                window |= (byte as u64) << (8 * i);
            }
        }

        ((window >> self.bit_pos()) as u32) & ((1 << num_bits) - 1)
    }

    #[inline(always)]
    pub(crate) fn peek(&self, num_bits: u8) -> Result<u32> {
        if num_bits as usize > self.remaining_bits() {
            bail!(DecodeError::NeedMoreInput);
        }

        Ok(self.peek_padded(num_bits))
    }

    /// Advance past bits that were already validated by a peek.
    #[inline(always)]
    pub(crate) fn consume(&mut self, num_bits: u8) {
        debug_assert!(num_bits as usize <= self.remaining_bits());

        self.bit_offset += num_bits as usize;
    }

    #[inline(always)]
    pub(crate) fn read(&mut self, num_bits: u8) -> Result<u32> {
        let value = self.peek(num_bits)?;
        self.consume(num_bits);

        Ok(value)
    }

    #[inline(always)]
    pub(crate) fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read(1)? == 1)
    }

    /// Skip to the next byte boundary and return the skipped bits.
    #[inline(always)]
    pub(crate) fn align(&mut self) -> Result<u32> {
        let padding = (8 - self.bit_pos()) & 7;

        self.read(padding as u8)
    }

    /// Take up to `max_len` whole bytes. The reader must be byte-aligned.
    pub(crate) fn take_bytes(&mut self, max_len: usize) -> &'a [u8] {
        debug_assert_eq!(self.bit_pos(), 0, "take_bytes called at non-byte boundary");

        let start = self.byte_pos().min(self.data.len());
        let end = start + max_len.min(self.data.len() - start);
        self.bit_offset = end * 8;

        &self.data[start..end]
    }

    /// Run `f` on a copy of the reader and only advance if it succeeds.
    pub(crate) fn atomically<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let mut reader = self.clone();
        let value = f(&mut reader)?;
        *self = reader;

        Ok(value)
    }

    /// The absolute position of the reader, in bits.
    #[inline(always)]
    pub(crate) fn position(&self) -> usize {
        self.bit_offset
    }

    #[inline(always)]
    pub(crate) fn byte_pos(&self) -> usize {
        self.bit_offset >> 3
    }

    #[inline(always)]
    fn bit_pos(&self) -> usize {
        self.bit_offset & 7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lsb_first() {
        let data = [0b1010_0110, 0b0000_0001];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read(1), Ok(0));
        assert_eq!(reader.read(2), Ok(0b11));
        assert_eq!(reader.read(5), Ok(0b10100));
        assert_eq!(reader.read(1), Ok(1));
        assert_eq!(reader.position(), 9);
    }

    #[test]
    fn split_reads_match_combined_read() {
        let data = [0x5a, 0xc3, 0x96, 0x3c, 0xe1];

        for start in 0..8 {
            for n in 0..=MAX_READ_BITS {
                for m in 0..=(MAX_READ_BITS - n) {
                    let mut combined = BitReader::at(&data, start);
                    let whole = combined.read(n + m).unwrap();

                    let mut split = BitReader::at(&data, start);
                    let low = split.read(n).unwrap();
                    let high = split.read(m).unwrap();

                    assert_eq!(whole, low | (high << n), "start {start}, n {n}, m {m}");
                    assert_eq!(combined.position(), split.position());
                }
            }
        }
    }

    #[test]
    fn atomically_rolls_back() {
        let data = [0b1011_0110];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.atomically(|r| r.read(3)), Ok(0b110));
        assert_eq!(reader.position(), 3);

        assert_eq!(
            reader.atomically(|r| {
                r.read(4)?;
                r.read(4)
            }),
            Err(DecodeError::NeedMoreInput)
        );
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn peek_does_not_advance() {
        let data = [0xff, 0x00];
        let reader = BitReader::at(&data, 4);

        assert_eq!(reader.peek(8), Ok(0x0f));
        assert_eq!(reader.peek(8), Ok(0x0f));
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn over_long_read_has_no_side_effects() {
        let data = [0xab, 0xcd];
        let mut reader = BitReader::at(&data, 3);

        assert_eq!(reader.read(14), Err(DecodeError::NeedMoreInput));
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.read(13), Ok(0xcdab >> 3));
        assert_eq!(reader.read(1), Err(DecodeError::NeedMoreInput));
        assert_eq!(reader.read(0), Ok(0));
    }

    #[test]
    fn padded_peek_past_end() {
        let data = [0b1000_0000];
        let reader = BitReader::at(&data, 7);

        assert_eq!(reader.peek_padded(15), 1);
        assert_eq!(reader.peek(2), Err(DecodeError::NeedMoreInput));
    }

    #[test]
    fn align_and_take_bytes() {
        let data = [0b0000_0101, 1, 2, 3];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read(3), Ok(0b101));
        assert_eq!(reader.align(), Ok(0));
        assert_eq!(reader.align(), Ok(0));
        assert_eq!(reader.take_bytes(2), &[1, 2]);
        assert_eq!(reader.take_bytes(5), &[3]);
        assert_eq!(reader.take_bytes(5), &[] as &[u8]);
        assert_eq!(reader.remaining_bits(), 0);
    }
}
