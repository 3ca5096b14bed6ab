//! The resumable stream decoder.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::bit_reader::BitReader;
use crate::engine::{DistanceRing, MetaBlock};
use crate::error::{DecodeError, ErrorCode, HeaderError, Result, bail};
use crate::header::{MetaBlockKind, PartialHeader, read_meta_block_header, read_window_bits};
use crate::log::{ldebug, lwarn};
use crate::trace::{NoTrace, Trace};
use crate::window::OutputWindow;

/// Settings that apply when decoding a stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodeSettings {
    /// Reject a command whose literals run past the end of their meta-block,
    /// and data following the end of the stream.
    ///
    /// By default, the literals are cut off at the end of the meta-block and
    /// the data after the stream is ignored.
    pub strict: bool,
    /// The maximum number of bytes to produce. Decoding fails with
    /// [`DecodeError::OutputLimit`] instead of exceeding it.
    pub output_limit: Option<usize>,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            strict: false,
            output_limit: None,
        }
    }
}

/// The outcome of a successful call to [`Decompressor::decompress_chunk`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// All input was consumed and the stream is not complete yet.
    NeedMoreInput,
    /// The stream ended with a last meta-block that is not empty.
    Finished,
    /// The stream ended with an empty last meta-block.
    End,
}

impl Status {
    /// Return the status code for this status.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NeedMoreInput => ErrorCode::NeedMoreInput,
            Self::Finished => ErrorCode::Ok,
            Self::End => ErrorCode::End,
        }
    }

    /// Whether the stream is complete.
    pub fn is_done(&self) -> bool {
        !matches!(self, Self::NeedMoreInput)
    }
}

#[derive(Debug)]
enum Stage {
    StreamHeader,
    MetaBlockHeader,
    CompressedHeader {
        header: Box<PartialHeader>,
        len: usize,
        is_last: bool,
    },
    Compressed { block: Box<MetaBlock>, is_last: bool },
    Uncompressed { remaining: usize },
    Metadata { remaining: usize, is_last: bool },
    Done(Status),
    Failed(DecodeError),
}

/// A streaming Brotli decompressor.
///
/// Input can be supplied in chunks of any size. Bytes that cannot be decoded
/// yet are kept internally, so every byte is passed in exactly once.
///
/// # Example
/// ```
/// use unbrotli::{Decompressor, Status};
///
/// // "hello" compressed with the reference encoder.
/// let compressed = [0x0b, 0x02, 0x80, 0x68, 0x65, 0x6c, 0x6c, 0x6f, 0x03];
/// let mut decompressor = Decompressor::new();
///
/// assert_eq!(decompressor.decompress_chunk(&compressed[..4]), Ok(Status::NeedMoreInput));
/// assert_eq!(decompressor.decompress_chunk(&compressed[4..]), Ok(Status::End));
/// assert_eq!(decompressor.output(), b"hello");
/// ```
#[derive(Debug)]
pub struct Decompressor<T: Trace = NoTrace> {
    settings: DecodeSettings,
    /// Input that was supplied but not consumed yet.
    input: Vec<u8>,
    /// Position of the next unread bit within the first byte of `input`.
    bit_offset: usize,
    stage: Stage,
    window: OutputWindow,
    ring: DistanceRing,
    window_bits: Option<u8>,
    trace: T,
}

impl Decompressor {
    /// Create a decompressor with the default settings.
    pub fn new() -> Self {
        Self::with_settings(DecodeSettings::default())
    }

    /// Create a decompressor with the given settings.
    pub fn with_settings(settings: DecodeSettings) -> Self {
        Self::with_trace(settings, NoTrace)
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Trace> Decompressor<T> {
    /// Create a decompressor that reports every decoded field to `trace`.
    pub fn with_trace(settings: DecodeSettings, trace: T) -> Self {
        Self {
            settings,
            input: Vec::new(),
            bit_offset: 0,
            stage: Stage::StreamHeader,
            window: OutputWindow::new(settings.output_limit),
            ring: DistanceRing::default(),
            window_bits: None,
            trace,
        }
    }

    /// Decode as much of the stream as `chunk` and the retained input allow.
    ///
    /// After an error, the decompressor stays failed and returns the same
    /// error for every later call. Running out of input is not an error but
    /// [`Status::NeedMoreInput`].
    pub fn decompress_chunk(&mut self, chunk: &[u8]) -> Result<Status> {
        match self.stage {
            Stage::Failed(e) => return Err(e),
            Stage::Done(status) => {
                if !chunk.is_empty() {
                    self.trailing_data(chunk.len())?;
                }

                return Ok(status);
            }
            _ => {}
        }

        let mut input = core::mem::take(&mut self.input);
        let retained = !input.is_empty();

        if retained {
            input.extend_from_slice(chunk);
        }

        let (result, position) = {
            let data = if retained { input.as_slice() } else { chunk };
            let mut reader = BitReader::at(data, self.bit_offset);
            let result = self.run(&mut reader);

            (result, reader.position())
        };

        let consumed = position / 8;
        self.bit_offset = position % 8;

        if retained {
            input.drain(..consumed);
            self.input = input;
        } else {
            self.input = chunk[consumed..].to_vec();
        }

        match result {
            Ok(status) => Ok(status),
            Err(DecodeError::NeedMoreInput) => Ok(Status::NeedMoreInput),
            Err(e) => {
                lwarn!("rejecting stream after {} bytes: {}", self.window.len(), e);
                self.stage = Stage::Failed(e);

                Err(e)
            }
        }
    }

    fn run(&mut self, reader: &mut BitReader<'_>) -> Result<Status> {
        loop {
            let next = match &mut self.stage {
                Stage::StreamHeader => {
                    let window_bits = reader.atomically(|r| read_window_bits(r, &mut self.trace))?;

                    self.window.set_window_bits(window_bits);
                    self.window_bits = Some(window_bits);

                    Stage::MetaBlockHeader
                }
                Stage::MetaBlockHeader => {
                    let header =
                        reader.atomically(|r| read_meta_block_header(r, &mut self.trace))?;
                    let is_last = header.is_last;

                    match header.kind {
                        MetaBlockKind::LastEmpty => {
                            finish_stream(reader, self.settings.strict)?;
                            Stage::Done(Status::End)
                        }
                        MetaBlockKind::Metadata { skip } => Stage::Metadata {
                            remaining: skip,
                            is_last,
                        },
                        MetaBlockKind::Uncompressed { len } => {
                            Stage::Uncompressed { remaining: len }
                        }
                        MetaBlockKind::Compressed { len } => {
                            Stage::CompressedHeader {
                                header: Box::default(),
                                len,
                                is_last,
                            }
                        }
                    }
                }
                Stage::CompressedHeader {
                    header,
                    len,
                    is_last,
                } => {
                    let header = header.read(reader, &mut self.trace)?;

                    Stage::Compressed {
                        block: Box::new(MetaBlock::new(header, *len)),
                        is_last: *is_last,
                    }
                }
                Stage::Compressed { block, is_last } => {
                    block.decode(
                        reader,
                        &mut self.window,
                        &mut self.ring,
                        self.settings.strict,
                        &mut self.trace,
                    )?;

                    if *is_last {
                        finish_stream(reader, self.settings.strict)?;
                        Stage::Done(Status::Finished)
                    } else {
                        Stage::MetaBlockHeader
                    }
                }
                Stage::Uncompressed { remaining } => {
                    let bytes = reader.take_bytes(*remaining);
                    self.window.extend(bytes)?;
                    *remaining -= bytes.len();

                    if *remaining > 0 {
                        bail!(DecodeError::NeedMoreInput);
                    }

                    Stage::MetaBlockHeader
                }
                Stage::Metadata { remaining, is_last } => {
                    *remaining -= reader.take_bytes(*remaining).len();

                    if *remaining > 0 {
                        bail!(DecodeError::NeedMoreInput);
                    }

                    if *is_last {
                        finish_stream(reader, self.settings.strict)?;
                        Stage::Done(Status::Finished)
                    } else {
                        Stage::MetaBlockHeader
                    }
                }
                Stage::Done(status) => return Ok(*status),
                Stage::Failed(e) => return Err(*e),
            };

            self.stage = next;

            if let Stage::Done(status) = self.stage {
                ldebug!("stream complete, {} bytes", self.window.len());

                return Ok(status);
            }
        }
    }

    fn trailing_data(&mut self, len: usize) -> Result<()> {
        if self.settings.strict {
            self.stage = Stage::Failed(HeaderError::TrailingData.into());
            bail!(HeaderError::TrailingData);
        }

        lwarn!("ignoring {} bytes after the end of the stream", len);

        Ok(())
    }

    /// The decoded bytes that were not taken yet.
    pub fn output(&self) -> &[u8] {
        self.window.pending()
    }

    /// Take the decoded bytes produced so far.
    ///
    /// Only the part of the output that later back references can reach is
    /// kept, so draining regularly bounds the memory used for long streams.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.window.take()
    }

    /// Consume the decompressor and return the decoded bytes that were not
    /// taken yet.
    pub fn into_output(self) -> Vec<u8> {
        self.window.into_pending()
    }

    /// The total number of bytes decoded, including bytes already taken.
    pub fn bytes_written(&self) -> usize {
        self.window.len()
    }

    /// The window size exponent, once the stream header was read.
    pub fn window_bits(&self) -> Option<u8> {
        self.window_bits
    }

    /// Whether the end of the stream was reached.
    pub fn is_finished(&self) -> bool {
        matches!(self.stage, Stage::Done(_))
    }

    /// The trace sink.
    pub fn trace(&self) -> &T {
        &self.trace
    }
}

/// Check the padding after the last meta-block and skip what follows it.
fn finish_stream(reader: &mut BitReader<'_>, strict: bool) -> Result<()> {
    if reader.align()? != 0 {
        bail!(HeaderError::NonZeroPadding);
    }

    let trailing = reader.remaining_bits() / 8;

    if trailing > 0 {
        if strict {
            bail!(HeaderError::TrailingData);
        }

        lwarn!("ignoring {} bytes after the end of the stream", trailing);
        reader.take_bytes(trailing);
    }

    Ok(())
}
