//! Defines the `CodedReader`, a bounds-checked cursor for reading values from a protobuf encoded buffer.

use crate::io::{varint, Tag, WireType};
use crate::raw::Value;
use alloc::string::{FromUtf8Error, String};
use core::convert::TryFrom;
use thiserror::Error;

/// The error type for [`CodedReader`](struct.CodedReader.html)
#[derive(Debug, Error)]
pub enum Error {
    /// The input contained a malformed variable length integer
    #[error("the input contained an invalid variable length integer")]
    MalformedVarint,
    /// A value or length delimited region would read past the end of the current limit
    #[error("the input ended early: {needed} bytes were needed but only {remaining} remained")]
    TruncatedBuffer {
        /// The number of bytes the value required
        needed: usize,
        /// The number of bytes left before the current limit
        remaining: usize,
    },
    /// The input contained an invalid tag (zero, an invalid wire type, or an unexpected end group)
    #[error("the input contained a tag that was either invalid or was unexpected at this point in the input: {0}")]
    InvalidTag(u32),
    /// The input contained an invalid UTF8 string
    #[error("the input contained an invalid UTF8 string")]
    InvalidString(#[from] FromUtf8Error),
    /// The input nested messages or groups deeper than the reader's recursion limit
    #[error("the input nested values deeper than the recursion limit of {0}")]
    RecursionLimitExceeded(u32),
    /// A nested value stopped reading before reaching the end of its declared length
    #[error("a nested value stopped {0} bytes before the end of its declared length")]
    UnbalancedLimit(usize),
}

/// A result for a [`CodedReader`](struct.CodedReader.html) read operation
pub type Result<T> = core::result::Result<T, Error>;

/// A set of options that can be used to modify the behavior of [`CodedReader`](struct.CodedReader.html)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Indicates if unknown fields should be kept in a message's unknown field set instead of being discarded
    pub retain_unknown_fields: bool,
    /// The maximum depth of nested messages and groups
    pub recursion_limit: u32,
}

impl ReaderOptions {
    /// The default recursion limit, matching other protobuf runtimes
    pub const DEFAULT_RECURSION_LIMIT: u32 = 100;

    /// Sets whether unknown fields are retained
    pub fn with_retain_unknown_fields(mut self, retain: bool) -> Self {
        self.retain_unknown_fields = retain;
        self
    }

    /// Sets the recursion limit
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            retain_unknown_fields: false,
            recursion_limit: Self::DEFAULT_RECURSION_LIMIT,
        }
    }
}

/// A coded input reader that reads from a borrowed slice.
///
/// The reader maintains `pos <= end <= buf.len()`. Nested values narrow `end` to the
/// nested region with [`push_limit`](#method.push_limit) and restore it with
/// [`pop_limit`](#method.pop_limit) once the region has been read to completion.
#[derive(Debug)]
pub struct CodedReader<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
    depth: u32,
    last_tag: Option<Tag>,
    options: ReaderOptions,
}

impl<'a> CodedReader<'a> {
    /// Creates a new [`CodedReader`](struct.CodedReader.html) over the borrowed slice.
    #[inline]
    pub fn with_slice(inner: &'a [u8]) -> Self {
        Self {
            buf: inner,
            pos: 0,
            end: inner.len(),
            depth: 0,
            last_tag: None,
            options: Default::default(),
        }
    }

    /// Sets options in use by the reader
    pub fn with_options(mut self, options: ReaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Gets the options in use by the reader
    #[inline]
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Gets the position of the reader in the input
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Gets the number of bytes left before the current limit
    #[inline]
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Returns if the reader has reached the current limit (or the end of the input if no limit has been pushed)
    #[inline]
    pub fn reached_limit(&self) -> bool {
        self.pos == self.end
    }

    /// Gets the last tag read from the input.
    #[inline]
    pub fn last_tag(&self) -> Option<Tag> {
        self.last_tag
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(Error::TruncatedBuffer { needed: len, remaining });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.buf[start..self.pos])
    }

    /// Reads a tag from the input, returning none if the reader has reached its limit.
    ///
    /// A zero tag or a tag with wire type 6 or 7 is an [`InvalidTag`](enum.Error.html#variant.InvalidTag) error.
    #[inline]
    pub fn read_tag(&mut self) -> Result<Option<Tag>> {
        if self.reached_limit() {
            return Ok(None);
        }
        let raw = self.read_varint64()?;
        let raw = u32::try_from(raw).map_err(|_| Error::InvalidTag(raw as u32))?;
        let tag = Tag::try_from(raw).map_err(|e| Error::InvalidTag(e.0))?;
        self.last_tag = Some(tag);
        Ok(Some(tag))
    }

    /// Reads a 32-bit varint from the input. Values written as 64-bit varints have their top 32 bits discarded.
    #[inline]
    pub fn read_varint32(&mut self) -> Result<u32> {
        self.read_varint64().map(|v| v as u32)
    }

    /// Reads a 64-bit varint from the input.
    #[inline]
    pub fn read_varint64(&mut self) -> Result<u64> {
        let (value, len) = varint::decode_varint(&self.buf[self.pos..self.end])?;
        self.pos += len;
        Ok(value)
    }

    /// Reads a 32-bit little endian value from the input
    #[inline]
    pub fn read_bit32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads a 64-bit little endian value from the input
    #[inline]
    pub fn read_bit64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a length delimited value's length from the input, checking it fits in the current limit.
    #[inline]
    pub fn read_length(&mut self) -> Result<usize> {
        let len = self.read_varint64()?;
        let remaining = self.remaining();
        match usize::try_from(len) {
            Ok(len) if len <= remaining => Ok(len),
            _ => Err(Error::TruncatedBuffer { needed: usize::try_from(len).unwrap_or(usize::MAX), remaining }),
        }
    }

    /// Reads a length delimited value from the input prefixed by a length, borrowing it from the input
    #[inline]
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8]> {
        let len = self.read_length()?;
        self.take(len)
    }

    /// Reads a length delimited UTF8 string from the input
    #[inline]
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_length_delimited()?;
        String::from_utf8(bytes.to_vec()).map_err(Error::from)
    }

    /// Reads a generic value from the input.
    #[inline]
    pub fn read_value<V: Value>(&mut self) -> Result<V::Inner> {
        V::read(self)
    }

    /// Pushes a new limit to the reader, limiting reads to the next `len` bytes.
    /// Returns the old limit to give back to [`pop_limit`](#method.pop_limit).
    #[inline]
    pub fn push_limit(&mut self, len: usize) -> Result<usize> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(Error::TruncatedBuffer { needed: len, remaining });
        }
        let old = self.end;
        self.end = self.pos + len;
        Ok(old)
    }

    /// Returns an old limit to the reader.
    ///
    /// The current limit must have been read to completion.
    #[inline]
    pub fn pop_limit(&mut self, old: usize) -> Result<()> {
        if !self.reached_limit() {
            return Err(Error::UnbalancedLimit(self.remaining()));
        }
        self.end = old;
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.options.recursion_limit {
            return Err(Error::RecursionLimitExceeded(self.options.recursion_limit));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Reads a length from the input and runs the function over the length delimited region it describes.
    /// Counts toward the recursion limit.
    pub fn read_nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.enter()?;
        let len = self.read_length()?;
        let old = self.push_limit(len)?;
        let value = f(self)?;
        self.pop_limit(old)?;
        self.leave();
        Ok(value)
    }

    /// Reads a length from the input and runs the function over each value in the length delimited region,
    /// the layout of a packed repeated field.
    pub fn read_packed(&mut self, mut f: impl FnMut(&mut Self) -> Result<()>) -> Result<()> {
        let len = self.read_length()?;
        let old = self.push_limit(len)?;
        while !self.reached_limit() {
            f(self)?;
        }
        self.pop_limit(old)
    }

    /// Runs the function over each field of the group started by `start`, consuming the matching end group tag.
    /// Counts toward the recursion limit.
    pub fn read_group(&mut self, start: Tag, mut f: impl FnMut(&mut Self, Tag) -> Result<()>) -> Result<()> {
        self.enter()?;
        loop {
            match self.read_tag()? {
                None => return Err(Error::TruncatedBuffer { needed: 1, remaining: 0 }),
                Some(inner) if inner.wire_type() == WireType::EndGroup => {
                    if inner.field() != start.field() {
                        return Err(Error::InvalidTag(inner.get()));
                    }
                    break;
                }
                Some(inner) => f(self, inner)?,
            }
        }
        self.leave();
        Ok(())
    }

    /// Skips the last value based on the tag read from the input. If no tag has been read, this does nothing
    #[inline]
    pub fn skip(&mut self) -> Result<()> {
        match self.last_tag {
            Some(tag) => self.skip_field(tag),
            None => Ok(()),
        }
    }

    /// Skips one value of the wire type in the specified tag without interpreting it.
    /// Groups are skipped through their matching end group tag.
    pub fn skip_field(&mut self, tag: Tag) -> Result<()> {
        match tag.wire_type() {
            WireType::Varint => {
                self.read_varint64()?;
            }
            WireType::Bit64 => {
                self.take(8)?;
            }
            WireType::LengthDelimited => {
                self.read_length_delimited()?;
            }
            WireType::Bit32 => {
                self.take(4)?;
            }
            WireType::StartGroup => self.read_group(tag, |input, inner| input.skip_field(inner))?,
            WireType::EndGroup => return Err(Error::InvalidTag(tag.get())),
        }
        Ok(())
    }
}
