/*!
A memory-safe, pure-Rust streaming Brotli decoder.

`unbrotli` decompresses streams in the Brotli format as specified in RFC 7932,
including uncompressed and metadata meta-blocks and references into the
built-in static dictionary. Input can be supplied all at once or in chunks of
any size, and decoding resumes at the exact bit where it ran out of input.

# Example
```rust
// "hello" compressed with the reference encoder.
let compressed = [0x0b, 0x02, 0x80, 0x68, 0x65, 0x6c, 0x6c, 0x6f, 0x03];
let output = unbrotli::decompress(&compressed).unwrap();

assert_eq!(output, b"hello");
```

For streaming input, see [`Decompressor`], and with the `std` feature,
[`DecompressorReader`].

# Features
- `std` (default): Implements [`std::io::Read`] for a decompressing reader.
  Without it, the crate only depends on `alloc`.
- `logging`: Forwards diagnostics to the `log` crate.

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod bit_reader;
#[cfg(test)]
mod bit_writer;
mod block;
mod context;
mod decoder;
mod dictionary;
mod engine;
mod error;
mod header;
mod huffman;
#[cfg(feature = "std")]
mod io;
mod log;
mod prefix_code;
mod trace;
mod transform;
mod window;

use alloc::vec::Vec;

pub use decoder::{DecodeSettings, Decompressor, Status};
pub use error::{DecodeError, ErrorCode, HeaderError, HuffmanError, Result, StreamError};
#[cfg(feature = "std")]
pub use io::DecompressorReader;
pub use trace::{NoTrace, Trace, TraceRecord};

/// Decompress a complete Brotli stream.
///
/// A stream that ends early fails with [`DecodeError::NeedMoreInput`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    decompress_with_settings(data, DecodeSettings::default())
}

/// Decompress a complete Brotli stream with the given settings.
pub fn decompress_with_settings(data: &[u8], settings: DecodeSettings) -> Result<Vec<u8>> {
    let mut decompressor = Decompressor::with_settings(settings);

    match decompressor.decompress_chunk(data)? {
        Status::NeedMoreInput => Err(DecodeError::NeedMoreInput),
        Status::Finished | Status::End => Ok(decompressor.into_output()),
    }
}
