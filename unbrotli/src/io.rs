//! Decompressing from a [`std::io::Read`] source.

use std::io::{self, Read};

use crate::decoder::{DecodeSettings, Decompressor, Status};
use crate::error::DecodeError;

const INPUT_BUFFER_SIZE: usize = 32 * 1024;

/// A reader that yields the decompressed contents of a Brotli stream read
/// from `R`.
///
/// Format violations surface as [`io::ErrorKind::InvalidData`] and a stream
/// that ends early as [`io::ErrorKind::UnexpectedEof`], both wrapping the
/// [`DecodeError`].
#[derive(Debug)]
pub struct DecompressorReader<R> {
    inner: R,
    decompressor: Decompressor,
    input: Vec<u8>,
    output: Vec<u8>,
    /// How much of `output` was already read.
    pos: usize,
    status: Status,
}

impl<R: Read> DecompressorReader<R> {
    /// Wrap `inner` with the default settings.
    pub fn new(inner: R) -> Self {
        Self::with_settings(inner, DecodeSettings::default())
    }

    /// Wrap `inner` with the given settings.
    pub fn with_settings(inner: R, settings: DecodeSettings) -> Self {
        Self {
            inner,
            decompressor: Decompressor::with_settings(settings),
            input: vec![0; INPUT_BUFFER_SIZE],
            output: Vec::new(),
            pos: 0,
            status: Status::NeedMoreInput,
        }
    }

    /// The underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the underlying reader.
    ///
    /// Input that was read from it but not decoded yet is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for DecompressorReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.output.len() {
                let len = buf.len().min(self.output.len() - self.pos);
                buf[..len].copy_from_slice(&self.output[self.pos..self.pos + len]);
                self.pos += len;

                return Ok(len);
            }

            if self.status.is_done() || buf.is_empty() {
                return Ok(0);
            }

            let read = match self.inner.read(&mut self.input) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    DecodeError::NeedMoreInput,
                ));
            }

            self.status = self
                .decompressor
                .decompress_chunk(&self.input[..read])
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            self.output = self.decompressor.take_output();
            self.pos = 0;
        }
    }
}
