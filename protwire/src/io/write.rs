//! Defines the `CodedWriter`, an append-only buffer for writing protobuf encoded values.

use crate::io::{varint, FieldNumber, Tag};
use crate::raw::Value;
use alloc::vec::Vec;
use thiserror::Error;

/// The error type for [`CodedWriter`](struct.CodedWriter.html)
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// A length delimited region was joined without a matching fork
    #[error("ldelim was called without a matching fork")]
    UnbalancedFork,
    /// The output was finished while length delimited regions were still open
    #[error("the output was finished with {0} forks left unjoined")]
    UnjoinedForks(usize),
    /// A value was provided that was too large to write to an output.
    #[error("the value was too large to write to the output")]
    ValueTooLarge,
}

/// A result for a fallible [`CodedWriter`](struct.CodedWriter.html) operation
pub type Result<T> = core::result::Result<T, Error>;

/// A coded output writer that appends to an owned, growable buffer.
///
/// Nested values whose length isn't known until they're written are wrapped in a
/// [`fork`](#method.fork) and [`ldelim`](#method.ldelim) pair. Forks are joined in LIFO order.
#[derive(Debug, Default, Clone)]
pub struct CodedWriter {
    buf: Vec<u8>,
    forks: Vec<usize>,
}

impl CodedWriter {
    /// Creates a new empty writer
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new writer with space for at least `cap` bytes
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        Self { buf: Vec::with_capacity(cap), forks: Vec::new() }
    }

    /// The number of bytes written so far, including the bytes of open forks
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns if nothing has been written
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The number of forks waiting to be joined
    #[inline]
    pub fn depth(&self) -> usize {
        self.forks.len()
    }

    /// Writes a 32-bit varint to the output.
    #[inline]
    pub fn write_varint32(&mut self, value: u32) -> &mut Self {
        varint::encode_varint(u64::from(value), &mut self.buf);
        self
    }

    /// Writes a 64-bit varint to the output.
    #[inline]
    pub fn write_varint64(&mut self, value: u64) -> &mut Self {
        varint::encode_varint(value, &mut self.buf);
        self
    }

    /// Writes a 32-bit little endian integer to the output.
    #[inline]
    pub fn write_bit32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Writes a 64-bit little endian integer to the output.
    #[inline]
    pub fn write_bit64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Writes raw bytes to the output. This should be used carefully as to not corrupt the coded output.
    #[inline]
    pub fn write_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(value);
        self
    }

    /// Writes a length delimited set of bytes to the output.
    #[inline]
    pub fn write_length_delimited(&mut self, value: &[u8]) -> &mut Self {
        self.write_varint64(value.len() as u64).write_bytes(value)
    }

    /// Writes a tag to the output
    #[inline]
    pub fn write_tag(&mut self, tag: Tag) -> &mut Self {
        self.write_varint32(tag.get())
    }

    /// Writes a generic value to the output.
    #[inline]
    pub fn write_value<V: Value>(&mut self, value: &V::Inner) -> &mut Self {
        V::write(value, self);
        self
    }

    /// Writes a generic value with a tag to the output based on the provided field number.
    #[inline]
    pub fn write_field<V: Value>(&mut self, num: FieldNumber, value: &V::Inner) -> &mut Self {
        self.write_tag(Tag::new(num, V::WIRE_TYPE)).write_value::<V>(value)
    }

    /// Starts a new length delimited region. Everything written until the matching
    /// [`ldelim`](#method.ldelim) is prefixed with its length.
    #[inline]
    pub fn fork(&mut self) -> &mut Self {
        self.forks.push(self.buf.len());
        self
    }

    /// Ends the most recently started length delimited region, inserting its length as a varint before its contents.
    pub fn ldelim(&mut self) -> Result<&mut Self> {
        let start = self.forks.pop().ok_or(Error::UnbalancedFork)?;
        let len = self.buf.len() - start;
        let mut prefix = Vec::with_capacity(varint::MAX_VARINT_LEN);
        varint::encode_varint(len as u64, &mut prefix);
        self.buf.splice(start..start, prefix);
        Ok(self)
    }

    /// Consumes the writer, returning the bytes written. Fails if any fork hasn't been joined.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.forks.is_empty() {
            Ok(self.buf)
        } else {
            Err(Error::UnjoinedForks(self.forks.len()))
        }
    }
}
