//! Per-field diagnostics for conformance debugging.

use alloc::vec::Vec;

use crate::bit_reader::BitReader;
use crate::error::Result;

/// A sink for the header fields and command values read from a stream.
///
/// Every record names the field, the number of bits it occupied and the
/// decoded value. A read that runs out of input is retried once more input
/// arrives, so the records of an interrupted step are reported again.
pub trait Trace {
    /// Record a decoded field.
    fn field(&mut self, name: &'static str, bits: u8, value: u32);
}

/// A trace sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl Trace for NoTrace {
    #[inline(always)]
    fn field(&mut self, _: &'static str, _: u8, _: u32) {}
}

/// A single recorded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    /// The name of the field.
    pub name: &'static str,
    /// The number of bits the field occupied in the stream.
    pub bits: u8,
    /// The decoded value.
    pub value: u32,
}

impl Trace for Vec<TraceRecord> {
    fn field(&mut self, name: &'static str, bits: u8, value: u32) {
        self.push(TraceRecord { name, bits, value });
    }
}

impl<T: Trace + ?Sized> Trace for &mut T {
    #[inline(always)]
    fn field(&mut self, name: &'static str, bits: u8, value: u32) {
        (**self).field(name, bits, value);
    }
}

/// Read a fixed-width field and report it.
#[inline(always)]
pub(crate) fn read_field(
    reader: &mut BitReader<'_>,
    trace: &mut impl Trace,
    name: &'static str,
    bits: u8,
) -> Result<u32> {
    let value = reader.read(bits)?;
    trace.field(name, bits, value);

    Ok(value)
}
