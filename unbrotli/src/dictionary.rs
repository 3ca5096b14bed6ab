//! The static dictionary (RFC 7932, appendix A).

use crate::error::{Result, StreamError, bail};
use crate::transform::{self, TransformedWord};

static DICTIONARY: &[u8; 122784] = include_bytes!("../assets/dictionary.bin");

pub(crate) const MIN_WORD_LENGTH: usize = 4;
pub(crate) const MAX_WORD_LENGTH: usize = 24;

/// The base-2 logarithm of the number of words of each length.
const SIZE_BITS_BY_LENGTH: [u8; MAX_WORD_LENGTH + 1] = [
    0, 0, 0, 0, 10, 10, 11, 11, 10, 10, 10, 10, 10, 9, 9, 8, 7, 7, 8, 7, 7, 6, 6, 5, 5,
];

/// The position of the first word of each length.
const OFFSETS_BY_LENGTH: [usize; MAX_WORD_LENGTH + 1] = {
    let mut offsets = [0; MAX_WORD_LENGTH + 1];
    let mut len = MIN_WORD_LENGTH;

    while len < MAX_WORD_LENGTH {
        offsets[len + 1] = offsets[len] + (len << SIZE_BITS_BY_LENGTH[len]);
        len += 1;
    }

    offsets
};

/// Resolve a dictionary reference of length `len` to its transformed word.
///
/// The low bits of `word_id` select a word of that length, the remaining
/// bits select the transform.
pub(crate) fn lookup(len: usize, word_id: usize) -> Result<TransformedWord> {
    if !(MIN_WORD_LENGTH..=MAX_WORD_LENGTH).contains(&len) {
        bail!(StreamError::InvalidDictionaryLength);
    }

    let size_bits = SIZE_BITS_BY_LENGTH[len];
    let index = word_id & ((1 << size_bits) - 1);
    let start = OFFSETS_BY_LENGTH[len] + index * len;

    transform::apply(&DICTIONARY[start..start + len], word_id >> size_bits)
}
