//! Error types for Brotli decoding.

use core::fmt;

/// The main error type for Brotli decoding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended before the stream was complete.
    ///
    /// This is the only recoverable error: supplying more input to the same
    /// [`Decompressor`](crate::Decompressor) resumes decoding at the exact bit
    /// where it stopped.
    NeedMoreInput,
    /// Errors related to stream and meta-block headers.
    Header(HeaderError),
    /// Errors related to prefix code construction.
    Huffman(HuffmanError),
    /// Errors related to the decoded command stream.
    Stream(StreamError),
    /// Decoding would exceed the configured output limit.
    OutputLimit,
}

/// Errors related to stream and meta-block headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// The window size field uses the reserved large-window encoding.
    LargeWindow,
    /// A reserved bit is set.
    ReservedBit,
    /// The meta-block length has a superfluous zero nibble.
    ExuberantNibble,
    /// The metadata length has a superfluous zero byte.
    ExuberantMetadataLength,
    /// Padding bits before a byte boundary are not zero.
    NonZeroPadding,
    /// A simple prefix code lists a symbol outside its alphabet.
    SymbolOutOfRange,
    /// A simple prefix code lists the same symbol twice.
    DuplicateSymbol,
    /// A zero run extends past the end of a context map.
    ContextMapOverflow,
    /// Data follows the end of the stream.
    TrailingData,
}

/// Errors related to prefix code construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanError {
    /// The code contains no symbols.
    EmptyCode,
    /// The code lengths over- or under-subscribe the code space.
    InvalidLengths,
    /// The code length code lengths over- or under-subscribe the code space.
    InvalidCodeLengthCode,
    /// A repeated code length runs past the end of the alphabet.
    CodeLengthOverflow,
}

/// Errors related to the decoded command stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// A distance code resolved to a distance of zero or less.
    InvalidDistance,
    /// A dictionary reference uses a copy length without dictionary words.
    InvalidDictionaryLength,
    /// A dictionary reference uses a nonexistent transform.
    InvalidTransform,
    /// A copy extends past the end of its meta-block.
    CopyOverflow,
    /// A literal run extends past the end of its meta-block.
    LiteralOverflow,
}

/// The status codes a decode call can end with.
///
/// Both [`Status`](crate::Status) and [`DecodeError`] map onto this flat
/// taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The stream ended with a meta-block carrying data.
    Ok,
    /// More input is required.
    NeedMoreInput,
    /// The stream violates the format.
    SyntaxError,
    /// The stream ended with an empty last meta-block.
    End,
    /// A prefix code has an invalid set of code lengths.
    HuffmanLengthError,
}

impl DecodeError {
    /// Return the status code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NeedMoreInput => ErrorCode::NeedMoreInput,
            Self::Huffman(_) => ErrorCode::HuffmanLengthError,
            Self::Header(_) | Self::Stream(_) | Self::OutputLimit => ErrorCode::SyntaxError,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeedMoreInput => write!(f, "unexpected end of input"),
            Self::Header(e) => write!(f, "{e}"),
            Self::Huffman(e) => write!(f, "{e}"),
            Self::Stream(e) => write!(f, "{e}"),
            Self::OutputLimit => write!(f, "output limit exceeded"),
        }
    }
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LargeWindow => write!(f, "large window streams are not supported"),
            Self::ReservedBit => write!(f, "reserved bit must be zero"),
            Self::ExuberantNibble => write!(f, "meta-block length has a superfluous nibble"),
            Self::ExuberantMetadataLength => write!(f, "metadata length has a superfluous byte"),
            Self::NonZeroPadding => write!(f, "padding bits must be zero"),
            Self::SymbolOutOfRange => write!(f, "prefix code symbol out of range"),
            Self::DuplicateSymbol => write!(f, "duplicate symbol in simple prefix code"),
            Self::ContextMapOverflow => write!(f, "context map run exceeds map size"),
            Self::TrailingData => write!(f, "data after end of stream"),
        }
    }
}

impl fmt::Display for HuffmanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCode => write!(f, "prefix code has no symbols"),
            Self::InvalidLengths => write!(f, "invalid prefix code lengths"),
            Self::InvalidCodeLengthCode => write!(f, "invalid code length code lengths"),
            Self::CodeLengthOverflow => write!(f, "code length repeat exceeds alphabet size"),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDistance => write!(f, "invalid backward distance"),
            Self::InvalidDictionaryLength => write!(f, "invalid dictionary word length"),
            Self::InvalidTransform => write!(f, "invalid dictionary transform"),
            Self::CopyOverflow => write!(f, "copy exceeds meta-block length"),
            Self::LiteralOverflow => write!(f, "literals exceed meta-block length"),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::NeedMoreInput => "need more input",
            Self::SyntaxError => "syntax error",
            Self::End => "end",
            Self::HuffmanLengthError => "huffman length error",
        };

        f.write_str(name)
    }
}

impl core::error::Error for DecodeError {}
impl core::error::Error for HeaderError {}
impl core::error::Error for HuffmanError {}
impl core::error::Error for StreamError {}

impl From<HeaderError> for DecodeError {
    fn from(e: HeaderError) -> Self {
        Self::Header(e)
    }
}

impl From<HuffmanError> for DecodeError {
    fn from(e: HuffmanError) -> Self {
        Self::Huffman(e)
    }
}

impl From<StreamError> for DecodeError {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

/// Result type for Brotli decoding operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

macro_rules! err {
    ($err:expr) => {
        Err($err.into())
    };
}

pub(crate) use bail;
pub(crate) use err;
