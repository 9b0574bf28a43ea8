//! Defines the `UnknownFieldSet`, a struct used to contain unknown fields as they were read from coded readers.
//!
//! As APIs are updated, certain fields may be removed or added from proto file definitions. If an old version of a message
//! encounters fields it doesn't recognize it can still read them to be written again via unknown fields.
//!
//! Fields are kept in the order they were read, so a message written back out reproduces them as they arrived.
//! Groups are the exception: they are skipped rather than kept, since group wire types are never written.

use crate::io::{read, CodedReader, CodedWriter, FieldNumber, Tag, WireType};
use alloc::vec::Vec;
use core::slice;

/// An unknown field in an [`UnknownFieldSet`](struct.UnknownFieldSet.html).
#[derive(Clone, Debug, PartialEq)]
pub enum UnknownField {
    /// A varint field value
    Varint(u64),
    /// A 64-bit field value
    Bit64(u64),
    /// A length delimited series of bytes
    LengthDelimited(Vec<u8>),
    /// A 32-bit field value
    Bit32(u32),
}

impl UnknownField {
    /// The wire type the field was read with
    pub fn wire_type(&self) -> WireType {
        match self {
            UnknownField::Varint(_) => WireType::Varint,
            UnknownField::Bit64(_) => WireType::Bit64,
            UnknownField::LengthDelimited(_) => WireType::LengthDelimited,
            UnknownField::Bit32(_) => WireType::Bit32,
        }
    }
}

/// A set of unknown fields encountered while parsing
#[derive(Default, Clone, Debug, PartialEq)]
pub struct UnknownFieldSet {
    inner: Vec<(FieldNumber, UnknownField)>,
}

impl UnknownFieldSet {
    /// Creates a new empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns if the set has no fields
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Gets the number of values in this set
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator of the values for a field
    pub fn values(&self, num: FieldNumber) -> impl Iterator<Item = &UnknownField> + '_ {
        self.inner.iter().filter(move |(n, _)| *n == num).map(|(_, v)| v)
    }

    /// Pushes a new value to the field
    pub fn push_value(&mut self, num: FieldNumber, value: UnknownField) {
        self.inner.push((num, value))
    }

    /// Returns an iterator of all of the fields in the set in the order they were added
    pub fn fields(&self) -> slice::Iter<'_, (FieldNumber, UnknownField)> {
        self.inner.iter()
    }

    /// Clears the set, removing all fields
    pub fn clear(&mut self) {
        self.inner.clear()
    }

    /// Clears the field, removing all values
    pub fn clear_field(&mut self, num: FieldNumber) {
        self.inner.retain(|(n, _)| *n != num)
    }

    /// Appends the fields of another set to this one
    pub fn merge(&mut self, other: &Self) {
        self.inner.extend(other.inner.iter().cloned())
    }

    /// Reads the value of the field with the specified tag from the input into the set.
    /// Groups are skipped without being added. End group tags aren't fields and are rejected with
    /// [`InvalidTag`](../../io/read/enum.Error.html#variant.InvalidTag).
    pub fn read_field(&mut self, input: &mut CodedReader<'_>, tag: Tag) -> read::Result<()> {
        let num = tag.field();
        let value = match tag.wire_type() {
            WireType::Varint => UnknownField::Varint(input.read_varint64()?),
            WireType::Bit64 => UnknownField::Bit64(input.read_bit64()?),
            WireType::LengthDelimited => UnknownField::LengthDelimited(input.read_length_delimited()?.to_vec()),
            WireType::Bit32 => UnknownField::Bit32(input.read_bit32()?),
            WireType::StartGroup => return input.skip_field(tag),
            WireType::EndGroup => return Err(read::Error::InvalidTag(tag.get())),
        };
        self.push_value(num, value);
        Ok(())
    }

    /// Writes the fields in this set to the writer
    pub fn write_to(&self, output: &mut CodedWriter) {
        for (num, value) in &self.inner {
            let num = *num;
            output.write_tag(Tag::new(num, value.wire_type()));
            match value {
                UnknownField::Varint(v) => {
                    output.write_varint64(*v);
                }
                UnknownField::Bit64(v) => {
                    output.write_bit64(*v);
                }
                UnknownField::LengthDelimited(v) => {
                    output.write_length_delimited(v);
                }
                UnknownField::Bit32(v) => {
                    output.write_bit32(*v);
                }
            }
        }
    }
}

impl<'a> IntoIterator for &'a UnknownFieldSet {
    type Item = &'a (FieldNumber, UnknownField);
    type IntoIter = slice::Iter<'a, (FieldNumber, UnknownField)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields()
    }
}

#[cfg(test)]
mod test {
    use super::{UnknownField, UnknownFieldSet};
    use crate::io::{read, CodedReader, CodedWriter, FieldNumber};
    use assert_matches::assert_matches;

    fn read_all(input: &[u8]) -> read::Result<UnknownFieldSet> {
        let mut reader = CodedReader::with_slice(input);
        let mut set = UnknownFieldSet::new();
        while let Some(tag) = reader.read_tag()? {
            set.read_field(&mut reader, tag)?;
        }
        Ok(set)
    }

    #[test]
    fn keeps_wire_order() {
        let input = [
            0x10, 0x01, // field 2 varint
            0x09, 1, 0, 0, 0, 0, 0, 0, 0, // field 1 bit64
            0x12, 0x01, b'x', // field 2 length delimited
            0x1D, 1, 0, 0, 0, // field 3 bit32
        ];
        let set = read_all(&input).unwrap();
        assert_eq!(set.len(), 4);

        let two = FieldNumber::new(2).unwrap();
        let values: Vec<_> = set.values(two).cloned().collect();
        assert_eq!(values, [UnknownField::Varint(1), UnknownField::LengthDelimited(vec![b'x'])]);

        let mut writer = CodedWriter::new();
        set.write_to(&mut writer);
        assert_eq!(writer.finish().unwrap(), input);
    }

    #[test]
    fn groups_are_skipped() {
        let input = [
            0x10, 0x01, // field 2 varint
            0x23, 0x08, 0x05, 0x2B, 0x2C, 0x24, // group 4 holding field 1 and an empty group 5
            0x1D, 1, 0, 0, 0, // field 3 bit32
        ];
        let set = read_all(&input).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.values(FieldNumber::new(4).unwrap()).count(), 0);

        let mut writer = CodedWriter::new();
        set.write_to(&mut writer);
        assert_eq!(writer.finish().unwrap(), [0x10, 0x01, 0x1D, 1, 0, 0, 0]);
    }

    #[test]
    fn rejects_unterminated_group() {
        assert_matches!(read_all(&[0x23, 0x08, 0x05]), Err(read::Error::TruncatedBuffer { .. }));
    }

    #[test]
    fn rejects_end_group() {
        assert_matches!(read_all(&[0x0C]), Err(read::Error::InvalidTag(0x0C)));
    }

    #[test]
    fn clear_field() {
        let one = FieldNumber::new(1).unwrap();
        let two = FieldNumber::new(2).unwrap();
        let mut set = UnknownFieldSet::new();
        set.push_value(one, UnknownField::Varint(1));
        set.push_value(two, UnknownField::Bit32(2));
        set.push_value(one, UnknownField::Varint(3));

        set.clear_field(one);
        assert_eq!(set.len(), 1);
        assert_eq!(set.values(one).count(), 0);

        let mut other = UnknownFieldSet::new();
        other.merge(&set);
        assert_eq!(other, set);
        other.clear();
        assert!(other.is_empty());
    }
}
