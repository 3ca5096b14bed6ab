//! A bit writer for assembling streams in unit tests.

use alloc::vec::Vec;

#[derive(Debug, Default)]
pub(crate) struct BitWriter {
    data: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append the low `num_bits` bits of `value`, least significant first.
    pub(crate) fn write(&mut self, value: u32, num_bits: u8) -> &mut Self {
        for i in 0..num_bits {
            if self.bit_len % 8 == 0 {
                self.data.push(0);
            }

            let bit = ((value >> i) & 1) as u8;
            *self.data.last_mut().unwrap() |= bit << (self.bit_len % 8);
            self.bit_len += 1;
        }

        self
    }

    /// Append a prefix code word, most significant bit first.
    pub(crate) fn write_code(&mut self, code: u32, len: u8) -> &mut Self {
        for i in (0..len).rev() {
            self.write((code >> i) & 1, 1);
        }

        self
    }

    /// Append a simple prefix code with the given symbols.
    pub(crate) fn write_simple_code(&mut self, alphabet_bits: u8, symbols: &[u16]) -> &mut Self {
        self.write(1, 2).write(symbols.len() as u32 - 1, 2);

        for &symbol in symbols {
            self.write(symbol as u32, alphabet_bits);
        }

        if symbols.len() == 4 {
            self.write(0, 1);
        }

        self
    }

    pub(crate) fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub(crate) fn finish(&self) -> Vec<u8> {
        self.data.clone()
    }
}
