//! Word transforms applied to static dictionary references (RFC 7932, appendix B).

use smallvec::SmallVec;

use crate::error::{Result, StreamError, bail};

/// The number of transforms a dictionary reference can select.
pub(crate) const NUM_TRANSFORMS: usize = 121;

/// A transformed dictionary word. The longest one is a 24-byte word with a
/// 5-byte prefix and an 8-byte suffix, so none of them spill to the heap.
pub(crate) type TransformedWord = SmallVec<[u8; 64]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransformKind {
    Identity,
    OmitLast(u8),
    UppercaseFirst,
    UppercaseAll,
    OmitFirst(u8),
}

#[derive(Debug, Clone, Copy)]
struct Transform {
    prefix: &'static [u8],
    kind: TransformKind,
    suffix: &'static [u8],
}

/// Apply transform `id` to a dictionary word.
pub(crate) fn apply(word: &[u8], id: usize) -> Result<TransformedWord> {
    let Some(transform) = TRANSFORMS.get(id) else {
        bail!(StreamError::InvalidTransform);
    };

    let mut out = TransformedWord::new();
    out.extend_from_slice(transform.prefix);

    let start = out.len();

    match transform.kind {
        TransformKind::Identity => out.extend_from_slice(word),
        TransformKind::OmitLast(n) => {
            out.extend_from_slice(&word[..word.len().saturating_sub(n as usize)]);
        }
        TransformKind::OmitFirst(n) => {
            out.extend_from_slice(&word[(n as usize).min(word.len())..]);
        }
        TransformKind::UppercaseFirst => {
            out.extend_from_slice(word);

            if out.len() > start {
                uppercase(&mut out[start..], 0);
            }
        }
        TransformKind::UppercaseAll => {
            out.extend_from_slice(word);

            let body = &mut out[start..];
            let mut i = 0;

            while i < body.len() {
                i += uppercase(body, i);
            }
        }
    }

    out.extend_from_slice(transform.suffix);

    Ok(out)
}

/// Uppercase the character starting at `word[i]` and return its length in
/// bytes.
///
/// This is not real Unicode case mapping, only the approximation the format
/// defines: ASCII letters are flipped, and for multi-byte sequences a fixed
/// bit of a following byte is toggled.
fn uppercase(word: &mut [u8], i: usize) -> usize {
    match word[i] {
        b @ 0..0xc0 => {
            if b.is_ascii_lowercase() {
                word[i] ^= 0x20;
            }

            1
        }
        0xc0..0xe0 => {
            if let Some(b) = word.get_mut(i + 1) {
                *b ^= 0x20;
            }

            2
        }
        _ => {
            if let Some(b) = word.get_mut(i + 2) {
                *b ^= 0x05;
            }

            3
        }
    }
}

const fn t(prefix: &'static [u8], kind: TransformKind, suffix: &'static [u8]) -> Transform {
    Transform {
        prefix,
        kind,
        suffix,
    }
}

static TRANSFORMS: [Transform; NUM_TRANSFORMS] = {
    use TransformKind::*;

    [
        t(b"", Identity, b""),
        t(b"", Identity, b" "),
        t(b" ", Identity, b" "),
        t(b"", OmitFirst(1), b""),
        t(b"", UppercaseFirst, b" "),
        t(b"", Identity, b" the "),
        t(b" ", Identity, b""),
        t(b"s ", Identity, b" "),
        t(b"", Identity, b" of "),
        t(b"", UppercaseFirst, b""),
        t(b"", Identity, b" and "),
        t(b"", OmitFirst(2), b""),
        t(b"", OmitLast(1), b""),
        t(b", ", Identity, b" "),
        t(b"", Identity, b", "),
        t(b" ", UppercaseFirst, b" "),
        t(b"", Identity, b" in "),
        t(b"", Identity, b" to "),
        t(b"e ", Identity, b" "),
        t(b"", Identity, b"\""),
        t(b"", Identity, b"."),
        t(b"", Identity, b"\">"),
        t(b"", Identity, b"\n"),
        t(b"", OmitLast(3), b""),
        t(b"", Identity, b"]"),
        t(b"", Identity, b" for "),
        t(b"", OmitFirst(3), b""),
        t(b"", OmitLast(2), b""),
        t(b"", Identity, b" a "),
        t(b"", Identity, b" that "),
        t(b" ", UppercaseFirst, b""),
        t(b"", Identity, b". "),
        t(b".", Identity, b""),
        t(b" ", Identity, b", "),
        t(b"", OmitFirst(4), b""),
        t(b"", Identity, b" with "),
        t(b"", Identity, b"'"),
        t(b"", Identity, b" from "),
        t(b"", Identity, b" by "),
        t(b"", OmitFirst(5), b""),
        t(b"", OmitFirst(6), b""),
        t(b" the ", Identity, b""),
        t(b"", OmitLast(4), b""),
        t(b"", Identity, b". The "),
        t(b"", UppercaseAll, b""),
        t(b"", Identity, b" on "),
        t(b"", Identity, b" as "),
        t(b"", Identity, b" is "),
        t(b"", OmitLast(7), b""),
        t(b"", OmitLast(1), b"ing "),
        t(b"", Identity, b"\n\t"),
        t(b"", Identity, b":"),
        t(b" ", Identity, b". "),
        t(b"", Identity, b"ed "),
        t(b"", OmitFirst(9), b""),
        t(b"", OmitFirst(7), b""),
        t(b"", OmitLast(6), b""),
        t(b"", Identity, b"("),
        t(b"", UppercaseFirst, b", "),
        t(b"", OmitLast(8), b""),
        t(b"", Identity, b" at "),
        t(b"", Identity, b"ly "),
        t(b" the ", Identity, b" of "),
        t(b"", OmitLast(5), b""),
        t(b"", OmitLast(9), b""),
        t(b" ", UppercaseFirst, b", "),
        t(b"", UppercaseFirst, b"\""),
        t(b".", Identity, b"("),
        t(b"", UppercaseAll, b" "),
        t(b"", UppercaseFirst, b"\">"),
        t(b"", Identity, b"=\""),
        t(b" ", Identity, b"."),
        t(b".com/", Identity, b""),
        t(b" the ", Identity, b" of the "),
        t(b"", UppercaseFirst, b"'"),
        t(b"", Identity, b". This "),
        t(b"", Identity, b","),
        t(b".", Identity, b" "),
        t(b"", UppercaseFirst, b"("),
        t(b"", UppercaseFirst, b"."),
        t(b"", Identity, b" not "),
        t(b" ", Identity, b"=\""),
        t(b"", Identity, b"er "),
        t(b" ", UppercaseAll, b" "),
        t(b"", Identity, b"al "),
        t(b" ", UppercaseAll, b""),
        t(b"", Identity, b"='"),
        t(b"", UppercaseAll, b"\""),
        t(b"", UppercaseFirst, b". "),
        t(b" ", Identity, b"("),
        t(b"", Identity, b"ful "),
        t(b" ", UppercaseFirst, b". "),
        t(b"", Identity, b"ive "),
        t(b"", Identity, b"less "),
        t(b"", UppercaseAll, b"'"),
        t(b"", Identity, b"est "),
        t(b" ", UppercaseFirst, b"."),
        t(b"", UppercaseAll, b"\">"),
        t(b" ", Identity, b"='"),
        t(b"", UppercaseFirst, b","),
        t(b"", Identity, b"ize "),
        t(b"", UppercaseAll, b"."),
        t(b"\xc2\xa0", Identity, b""),
        t(b" ", Identity, b","),
        t(b"", UppercaseFirst, b"=\""),
        t(b"", UppercaseAll, b"=\""),
        t(b"", Identity, b"ous "),
        t(b"", UppercaseAll, b", "),
        t(b"", UppercaseFirst, b"='"),
        t(b" ", UppercaseFirst, b","),
        t(b" ", UppercaseAll, b"=\""),
        t(b" ", UppercaseAll, b", "),
        t(b"", UppercaseAll, b","),
        t(b"", UppercaseAll, b"("),
        t(b"", UppercaseAll, b". "),
        t(b" ", UppercaseAll, b"."),
        t(b"", UppercaseAll, b"='"),
        t(b" ", UppercaseAll, b". "),
        t(b" ", UppercaseFirst, b"=\""),
        t(b" ", UppercaseAll, b"='"),
        t(b" ", UppercaseFirst, b"='"),
    ]
};
