//! Contains types for reading and writing protobuf coded data.

pub mod read;
pub mod varint;
pub mod write;

pub use read::{CodedReader, ReaderOptions};
pub use write::CodedWriter;

use core::convert::TryFrom;
use core::fmt::{self, Display, Formatter};
use core::num::NonZeroU32;
use thiserror::Error;

/// The wire type of a protobuf value.
///
/// A wire type is paired with a field number between 1 and 536,870,911 to create a tag,
/// a unique identifier for a field on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum WireType {
    /// A value read as a variable length integer.
    ///
    /// See the protobuf docs for more information on this encoding: https://developers.google.com/protocol-buffers/docs/encoding#varints
    Varint = 0,
    /// A 64-bit value encoded as 8 little endian bytes
    Bit64 = 1,
    /// A length delimited value. The length is encoded as a varint
    LengthDelimited = 2,
    /// A start group tag, deprecated in proto3. Readers skip groups but writers never emit them.
    StartGroup = 3,
    /// An end group tag, deprecated in proto3.
    EndGroup = 4,
    /// A 32-bit value encoded as 4 little endian bytes
    Bit32 = 5,
}

/// The error returned when trying to convert a byte with an invalid wire type (6 or 7) into a [`WireType`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid wire type {0}")]
pub struct InvalidWireType(pub u8);

impl WireType {
    /// Gets whether a wire type is eligible for repeated field packing.
    /// The valid packable wire types are Bit32, Bit64, and Varint.
    pub const fn is_packable(self) -> bool {
        matches!(self, WireType::Varint | WireType::Bit64 | WireType::Bit32)
    }
}

impl TryFrom<u8> for WireType {
    type Error = InvalidWireType;

    fn try_from(value: u8) -> Result<WireType, InvalidWireType> {
        match value & 0b111 {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Bit64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Bit32),
            n => Err(InvalidWireType(n)),
        }
    }
}

/// A protobuf field number. Its value is known to be less than or equal to 536870911 and not 0.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldNumber(NonZeroU32);

impl FieldNumber {
    /// The max value of a field number as a u32
    pub const MAX_VALUE: u32 = 536_870_911;

    /// The max value of a field number
    pub const MAX: FieldNumber = unsafe { FieldNumber::new_unchecked(FieldNumber::MAX_VALUE) };

    /// Create a field number without checking the value.
    ///
    /// # Safety
    ///
    /// The value must be a valid field number
    #[inline]
    pub const unsafe fn new_unchecked(n: u32) -> FieldNumber {
        FieldNumber(NonZeroU32::new_unchecked(n))
    }

    /// Creates a field number if the given value is not zero or more than 536870911
    ///
    /// # Examples
    ///
    /// ```
    /// use protwire::io::FieldNumber;
    ///
    /// assert_eq!(FieldNumber::new(0), None);
    /// assert_eq!(FieldNumber::new(1).map(FieldNumber::get), Some(1));
    /// assert_eq!(FieldNumber::new(FieldNumber::MAX_VALUE), Some(FieldNumber::MAX));
    /// assert_eq!(FieldNumber::new(FieldNumber::MAX_VALUE + 1), None);
    /// ```
    #[inline]
    pub const fn new(n: u32) -> Option<FieldNumber> {
        if n > Self::MAX_VALUE {
            return None;
        }
        match NonZeroU32::new(n) {
            Some(n) => Some(FieldNumber(n)),
            None => None,
        }
    }

    /// Returns the value as a [`u32`]
    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Display for FieldNumber {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<FieldNumber> for u32 {
    fn from(x: FieldNumber) -> u32 {
        x.get()
    }
}

/// A tag containing a wire type and field number. Its value is known to not be 0, and both field number and wire type are valid values
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(NonZeroU32);

impl Tag {
    /// Creates a new tag value
    ///
    /// # Examples
    ///
    /// ```
    /// use protwire::io::{FieldNumber, Tag, WireType};
    ///
    /// let field = FieldNumber::new(1).unwrap();
    /// assert_eq!(Tag::new(field, WireType::LengthDelimited).get(), 10);
    /// ```
    #[inline]
    pub const fn new(f: FieldNumber, wt: WireType) -> Tag {
        // a field number is never 0, so the shifted value is never 0 either
        unsafe { Tag(NonZeroU32::new_unchecked((f.get() << 3) | wt as u32)) }
    }

    /// Gets the wire type from this tag
    ///
    /// # Examples
    ///
    /// ```
    /// use protwire::io::{Tag, WireType};
    /// # use std::convert::TryFrom;
    ///
    /// assert_eq!(Tag::try_from(8).unwrap().wire_type(), WireType::Varint);
    /// assert_eq!(Tag::try_from(17).unwrap().wire_type(), WireType::Bit64);
    /// ```
    #[inline]
    pub fn wire_type(self) -> WireType {
        match WireType::try_from((self.get() & 0b0111) as u8) {
            Ok(wt) => wt,
            // we can only reach this through unsafe code
            Err(_) => unsafe { core::hint::unreachable_unchecked() },
        }
    }

    /// Gets the field number from this tag
    ///
    /// # Examples
    ///
    /// ```
    /// use protwire::io::Tag;
    /// # use std::convert::TryFrom;
    ///
    /// assert_eq!(Tag::try_from(8).unwrap().field().get(), 1);
    /// assert_eq!(Tag::try_from(17).unwrap().field().get(), 2);
    /// ```
    #[inline]
    pub fn field(self) -> FieldNumber {
        unsafe { FieldNumber::new_unchecked(self.get() >> 3) }
    }

    /// Splits the tag into its field number and wire type
    #[inline]
    pub fn split(self) -> (FieldNumber, WireType) {
        (self.field(), self.wire_type())
    }

    /// Returns the value as a [`u32`]
    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Tag> for u32 {
    fn from(x: Tag) -> u32 {
        x.get()
    }
}

/// The error returned when an attempt to convert a 32-bit value to a tag fails due to an invalid field number or wire type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid tag {0}; this could be caused by an invalid wire type or a 0 field number")]
pub struct TryTagFromRawError(pub u32);

impl TryFrom<u32> for Tag {
    type Error = TryTagFromRawError;

    /// Creates a new tag if the value is not zero and has a valid field number and wire type
    ///
    /// # Examples
    ///
    /// ```
    /// use protwire::io::Tag;
    /// # use std::convert::TryFrom;
    ///
    /// assert!(Tag::try_from(1).is_err());
    /// assert!(Tag::try_from(8).is_ok());
    /// assert!(Tag::try_from(16).is_ok());
    /// assert!(Tag::try_from(14).is_err());
    /// ```
    #[inline]
    fn try_from(n: u32) -> Result<Tag, TryTagFromRawError> {
        match (n & 0b111, n >> 3) {
            // (wire type, field number)
            (6, _) | (7, _) | (_, 0) => Err(TryTagFromRawError(n)),
            _ => unsafe { Ok(Tag(NonZeroU32::new_unchecked(n))) },
        }
    }
}
