//! Binary encoding and decoding of [`DynamicMessage`](../value/struct.DynamicMessage.html)s.
//!
//! # Encoding
//!
//! Fields are written in descriptor order, followed by any retained unknown fields.
//!
//! * Plain singular fields are left off the wire when they hold their default value.
//! * Fields with presence (`optional`, messages, oneof members) are written whenever they're set, even if
//!   the value is a default.
//! * Empty repeated and map fields are left off the wire.
//! * Repeated scalar fields are written as one packed length delimited region unless the field is marked
//!   [`unpacked`](../schema/struct.FieldDescriptor.html#method.unpacked).
//! * Map entries are written as nested `{ key = 1, value = 2 }` messages, sorted by key.
//!
//! # Decoding
//!
//! Decoding starts from a [complete](../value/struct.DynamicMessage.html#method.from_partial) message and
//! merges each field read into it.
//!
//! * Fields with unknown numbers, or whose wire type doesn't match their descriptor, are skipped (or retained
//!   if [`ReaderOptions::retain_unknown_fields`](../io/read/struct.ReaderOptions.html) is set).
//! * Repeated scalar fields accept both the packed and unpacked layouts, in any mix.
//! * Later values win: for singular scalars, for members of the same oneof, and for duplicate map keys.
//!   A singular message field read twice merges the second into the first.
//! * Enum numbers the enum doesn't declare are kept as [`EnumValue::Unrecognized`](../value/enum.EnumValue.html).
//! * A zero tag or an end group tag outside of a group fails with [`InvalidTag`](../io/read/enum.Error.html#variant.InvalidTag).

use crate::collections::{sorted_entries, MapField, RepeatedField};
use crate::io::{read, write, CodedReader, CodedWriter, FieldNumber, ReaderOptions, Tag, WireType};
use crate::raw;
use crate::schema::{Cardinality, FieldDescriptor, KeyKind, Kind, MessageDescriptor};
use crate::value::{DynamicMessage, EnumValue, FieldValue, MapKey, Value};
use crate::wkt::{Duration, Timestamp};
use alloc::vec::Vec;
use thiserror::Error;
use tracing::{debug, trace};

const KEY_NUMBER: FieldNumber = unsafe { FieldNumber::new_unchecked(1) };
const VALUE_NUMBER: FieldNumber = unsafe { FieldNumber::new_unchecked(2) };

/// The error type for encoding a message
#[derive(Debug, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A field held a value that doesn't fit its descriptor
    #[error("field `{field}` holds a value that isn't a {expected}")]
    TypeMismatch {
        /// The name of the field
        field: &'static str,
        /// What the field's descriptor expects
        expected: &'static str,
    },
    /// The writer was left unbalanced
    #[error(transparent)]
    Write(#[from] write::Error),
}

fn mismatch(field: &FieldDescriptor, expected: &'static str) -> EncodeError {
    EncodeError::TypeMismatch { field: field.name(), expected }
}

impl DynamicMessage {
    /// Encodes the message to a new buffer
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut output = CodedWriter::new();
        self.encode_to(&mut output)?;
        Ok(output.finish()?)
    }

    /// Writes the message's fields to the writer, without a length prefix
    pub fn encode_to(&self, output: &mut CodedWriter) -> Result<(), EncodeError> {
        for field in self.descriptor().fields() {
            if let Some(value) = self.fields.get(&field.number().get()) {
                write_field(field, value, output)?;
            }
        }
        self.unknown_fields.write_to(output);
        Ok(())
    }

    /// Decodes a message of the specified type
    ///
    /// ```
    /// use protwire::schema::{FieldDescriptor, Kind, MessageDescriptor};
    /// use protwire::value::{DynamicMessage, Value};
    ///
    /// static REMOTE: MessageDescriptor = MessageDescriptor::new("git.Remote", &[
    ///     FieldDescriptor::new(1, "name", Kind::String),
    ///     FieldDescriptor::new(2, "url", Kind::String),
    /// ]);
    ///
    /// let remote = DynamicMessage::decode(&REMOTE, &[0x0A, 0x02, b'h', b'q']).unwrap();
    /// assert_eq!(remote.get("name").unwrap().as_single(), Some(&Value::from("hq")));
    /// assert_eq!(remote.get("url").unwrap().as_single(), Some(&Value::from("")));
    /// ```
    pub fn decode(descriptor: &'static MessageDescriptor, input: &[u8]) -> read::Result<DynamicMessage> {
        DynamicMessage::decode_with_options(descriptor, input, ReaderOptions::default())
    }

    /// Decodes a message of the specified type with the specified reader options
    pub fn decode_with_options(
        descriptor: &'static MessageDescriptor,
        input: &[u8],
        options: ReaderOptions,
    ) -> read::Result<DynamicMessage> {
        let mut reader = CodedReader::with_slice(input).with_options(options);
        let mut message = DynamicMessage::new(descriptor);
        message.merge_from(&mut reader)?;
        Ok(message)
    }

    /// Merges fields from the reader into this message until the reader reaches its limit
    pub fn merge_from(&mut self, input: &mut CodedReader<'_>) -> read::Result<()> {
        while let Some(tag) = input.read_tag()? {
            let (number, wire_type) = tag.split();
            match self.descriptor().field_by_number(number.get()) {
                Some(field) if accepts(field, wire_type) => self.read_field(field, wire_type, input)?,
                Some(field) => {
                    trace!(
                        message_type = self.descriptor().full_name(),
                        field = number.get(),
                        ?wire_type,
                        expected = ?field.kind().wire_type(),
                        "skipping field with mismatched wire type"
                    );
                    self.read_unknown(tag, input)?;
                }
                None => {
                    trace!(message_type = self.descriptor().full_name(), field = number.get(), ?wire_type, "skipping unknown field");
                    self.read_unknown(tag, input)?;
                }
            }
        }
        Ok(())
    }

    fn read_unknown(&mut self, tag: Tag, input: &mut CodedReader<'_>) -> read::Result<()> {
        if input.options().retain_unknown_fields {
            self.unknown_fields.read_field(input, tag)
        } else {
            input.skip_field(tag)
        }
    }

    fn read_field(&mut self, field: &FieldDescriptor, wire_type: WireType, input: &mut CodedReader<'_>) -> read::Result<()> {
        let number = field.number().get();
        match field.cardinality() {
            Cardinality::Singular | Cardinality::Optional => {
                if let (Kind::Message(_), Some(FieldValue::Single(Value::Message(existing)))) =
                    (field.kind(), self.fields.get_mut(&number))
                {
                    return input.read_nested(|input| existing.merge_from(input));
                }
                let value = read_value(field.kind(), input)?;
                if let Some(oneof) = field.oneof() {
                    if let Some(previous) = self.which_oneof(oneof).filter(|f| f.number() != field.number()) {
                        debug!(
                            message_type = self.descriptor().full_name(),
                            oneof,
                            previous = previous.name(),
                            current = field.name(),
                            "oneof member replaced"
                        );
                    }
                }
                self.set_field(field, FieldValue::Single(value));
            }
            Cardinality::Repeated => {
                let kind = field.kind();
                let mut values = RepeatedField::new();
                if wire_type == WireType::LengthDelimited && kind.is_packable() {
                    input.read_packed(|input| {
                        values.push(read_value(kind, input)?);
                        Ok(())
                    })?;
                } else {
                    values.push(read_value(kind, input)?);
                }
                match self.fields.get_mut(&number) {
                    Some(FieldValue::List(list)) => list.extend(values),
                    _ => {
                        self.fields.insert(number, FieldValue::List(values));
                    }
                }
            }
            Cardinality::Map(key_kind) => {
                let (key, value) = input.read_nested(|input| read_map_entry(key_kind, field.kind(), input))?;
                match self.fields.get_mut(&number) {
                    Some(FieldValue::Map(map)) => {
                        map.insert(key, value);
                    }
                    _ => {
                        let mut map = MapField::new();
                        map.insert(key, value);
                        self.fields.insert(number, FieldValue::Map(map));
                    }
                }
            }
        }
        Ok(())
    }
}

fn accepts(field: &FieldDescriptor, wire_type: WireType) -> bool {
    let kind = field.kind();
    match field.cardinality() {
        Cardinality::Map(_) => wire_type == WireType::LengthDelimited,
        Cardinality::Repeated if kind.is_packable() => {
            wire_type == kind.wire_type() || wire_type == WireType::LengthDelimited
        }
        _ => wire_type == kind.wire_type(),
    }
}

fn read_value(kind: Kind, input: &mut CodedReader<'_>) -> read::Result<Value> {
    Ok(match kind {
        Kind::Int32 => Value::I32(input.read_value::<raw::Int32>()?),
        Kind::Sint32 => Value::I32(input.read_value::<raw::Sint32>()?),
        Kind::Sfixed32 => Value::I32(input.read_value::<raw::Sfixed32>()?),
        Kind::Int64 => Value::I64(input.read_value::<raw::Int64>()?),
        Kind::Sint64 => Value::I64(input.read_value::<raw::Sint64>()?),
        Kind::Sfixed64 => Value::I64(input.read_value::<raw::Sfixed64>()?),
        Kind::Uint32 => Value::U32(input.read_value::<raw::Uint32>()?),
        Kind::Fixed32 => Value::U32(input.read_value::<raw::Fixed32>()?),
        Kind::Uint64 => Value::U64(input.read_value::<raw::Uint64>()?),
        Kind::Fixed64 => Value::U64(input.read_value::<raw::Fixed64>()?),
        Kind::Float => Value::F32(input.read_value::<raw::Float>()?),
        Kind::Double => Value::F64(input.read_value::<raw::Double>()?),
        Kind::Bool => Value::Bool(input.read_value::<raw::Bool>()?),
        Kind::String => Value::String(input.read_value::<raw::String>()?),
        Kind::Bytes => Value::Bytes(input.read_value::<raw::Bytes>()?),
        Kind::Enum(descriptor) => {
            let number = input.read_value::<raw::Enum>()?;
            let value = EnumValue::from_number(descriptor, number);
            if value.is_unrecognized() {
                debug!(enum_type = descriptor.full_name(), number, "unrecognized enum value");
            }
            Value::Enum(value)
        }
        Kind::Message(descriptor) => {
            let mut message = DynamicMessage::new(descriptor);
            input.read_nested(|input| message.merge_from(input))?;
            Value::Message(message)
        }
        Kind::Timestamp => Value::Timestamp(input.read_nested(|input| Timestamp::read_from(input))?),
        Kind::Duration => Value::Duration(input.read_nested(|input| Duration::read_from(input))?),
    })
}

fn read_map_entry(key_kind: KeyKind, value_kind: Kind, input: &mut CodedReader<'_>) -> read::Result<(MapKey, Value)> {
    let mut key = None;
    let mut value = None;
    while let Some(tag) = input.read_tag()? {
        let (number, wire_type) = tag.split();
        if number == KEY_NUMBER && wire_type == key_kind.as_kind().wire_type() {
            key = MapKey::from_value(read_value(key_kind.as_kind(), input)?);
        } else if number == VALUE_NUMBER && wire_type == value_kind.wire_type() {
            value = Some(read_value(value_kind, input)?);
        } else {
            input.skip_field(tag)?;
        }
    }
    Ok((
        key.unwrap_or_else(|| MapKey::default_for(key_kind)),
        value.unwrap_or_else(|| Value::default_for(value_kind)),
    ))
}

fn write_field(field: &FieldDescriptor, value: &FieldValue, output: &mut CodedWriter) -> Result<(), EncodeError> {
    let number = field.number();
    let kind = field.kind();
    match (field.cardinality(), value) {
        (Cardinality::Singular, FieldValue::Single(value)) if !field.has_presence() && value.is_default() => {
            // still checked so a mistyped default isn't silently accepted
            check_kind(field, kind, value)
        }
        (Cardinality::Singular | Cardinality::Optional, FieldValue::Single(value)) => {
            write_tagged(field, number, kind, value, output)
        }
        (Cardinality::Repeated, FieldValue::List(values)) if values.is_empty() => Ok(()),
        (Cardinality::Repeated, FieldValue::List(values)) if field.is_packed() => {
            output.write_tag(Tag::new(number, WireType::LengthDelimited)).fork();
            for value in values {
                write_value(field, kind, value, output)?;
            }
            output.ldelim()?;
            Ok(())
        }
        (Cardinality::Repeated, FieldValue::List(values)) => {
            for value in values {
                write_tagged(field, number, kind, value, output)?;
            }
            Ok(())
        }
        (Cardinality::Map(key_kind), FieldValue::Map(entries)) => {
            for (key, value) in sorted_entries(entries) {
                if !key.matches_kind(key_kind) {
                    return Err(mismatch(field, key_kind.as_kind().name()));
                }
                output.write_tag(Tag::new(number, WireType::LengthDelimited)).fork();
                let key = key.to_value();
                if !key.is_default() {
                    write_tagged(field, KEY_NUMBER, key_kind.as_kind(), &key, output)?;
                }
                if value.is_default() {
                    check_kind(field, kind, value)?;
                } else {
                    write_tagged(field, VALUE_NUMBER, kind, value, output)?;
                }
                output.ldelim()?;
            }
            Ok(())
        }
        (Cardinality::Singular | Cardinality::Optional, _) => Err(mismatch(field, "single value")),
        (Cardinality::Repeated, _) => Err(mismatch(field, "list")),
        (Cardinality::Map(_), _) => Err(mismatch(field, "map")),
    }
}

fn check_kind(field: &FieldDescriptor, kind: Kind, value: &Value) -> Result<(), EncodeError> {
    if value.matches_kind(kind) {
        Ok(())
    } else {
        Err(mismatch(field, kind.name()))
    }
}

fn write_tagged(
    field: &FieldDescriptor,
    number: FieldNumber,
    kind: Kind,
    value: &Value,
    output: &mut CodedWriter,
) -> Result<(), EncodeError> {
    check_kind(field, kind, value)?;
    output.write_tag(Tag::new(number, kind.wire_type()));
    write_value(field, kind, value, output)
}

fn write_value(field: &FieldDescriptor, kind: Kind, value: &Value, output: &mut CodedWriter) -> Result<(), EncodeError> {
    match (kind, value) {
        (Kind::Int32, Value::I32(v)) => output.write_value::<raw::Int32>(v),
        (Kind::Sint32, Value::I32(v)) => output.write_value::<raw::Sint32>(v),
        (Kind::Sfixed32, Value::I32(v)) => output.write_value::<raw::Sfixed32>(v),
        (Kind::Int64, Value::I64(v)) => output.write_value::<raw::Int64>(v),
        (Kind::Sint64, Value::I64(v)) => output.write_value::<raw::Sint64>(v),
        (Kind::Sfixed64, Value::I64(v)) => output.write_value::<raw::Sfixed64>(v),
        (Kind::Uint32, Value::U32(v)) => output.write_value::<raw::Uint32>(v),
        (Kind::Fixed32, Value::U32(v)) => output.write_value::<raw::Fixed32>(v),
        (Kind::Uint64, Value::U64(v)) => output.write_value::<raw::Uint64>(v),
        (Kind::Fixed64, Value::U64(v)) => output.write_value::<raw::Fixed64>(v),
        (Kind::Float, Value::F32(v)) => output.write_value::<raw::Float>(v),
        (Kind::Double, Value::F64(v)) => output.write_value::<raw::Double>(v),
        (Kind::Bool, Value::Bool(v)) => output.write_value::<raw::Bool>(v),
        (Kind::String, Value::String(v)) => output.write_value::<raw::String>(v),
        (Kind::Bytes, Value::Bytes(v)) => output.write_value::<raw::Bytes>(v),
        (Kind::Enum(_), Value::Enum(v)) => output.write_value::<raw::Enum>(&v.number()),
        (Kind::Message(descriptor), Value::Message(message)) if message.descriptor() == descriptor => {
            output.fork();
            message.encode_to(output)?;
            output.ldelim()?
        }
        (Kind::Timestamp, Value::Timestamp(v)) => {
            v.write_to(output.fork());
            output.ldelim()?
        }
        (Kind::Duration, Value::Duration(v)) => {
            v.write_to(output.fork());
            output.ldelim()?
        }
        _ => return Err(mismatch(field, kind.name())),
    };
    Ok(())
}

#[cfg(test)]
mod test {
    use super::EncodeError;
    use crate::collections::{MapField, UnknownField};
    use crate::io::{read, FieldNumber, ReaderOptions};
    use crate::schema::test::{COMMIT, EVERYTHING, REMOTE};
    use crate::schema::{FieldDescriptor, Kind, MessageDescriptor};
    use crate::testing::{everything, remote};
    use crate::value::{DynamicMessage, EnumValue, FieldValue, MapKey, Value};
    use crate::wkt::{Duration, Timestamp};
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    static NARROW: MessageDescriptor = MessageDescriptor::new("test.Narrow", &[
        FieldDescriptor::new(1, "int32_value", Kind::Int32),
        FieldDescriptor::new(14, "string_value", Kind::String),
    ]);

    fn single<'a>(msg: &'a DynamicMessage, name: &str) -> &'a Value {
        msg.get(name).and_then(FieldValue::as_single).unwrap()
    }

    fn list<'a>(msg: &'a DynamicMessage, name: &str) -> &'a [Value] {
        msg.get(name).and_then(FieldValue::as_list).unwrap()
    }

    #[test]
    fn commit_layout() {
        let mut commit = DynamicMessage::new(&COMMIT);
        commit.set("hash", Value::from("abc")).unwrap();
        commit.set("author_email", Value::from("a@b")).unwrap();
        commit.set("remotes", vec![remote("origin", "u")]).unwrap();

        let bytes = commit.encode().unwrap();
        assert_eq!(bytes, [
            0x0A, 0x03, b'a', b'b', b'c',
            0x12, 0x03, b'a', b'@', b'b',
            0x1A, 0x0B, 0x0A, 0x06, b'o', b'r', b'i', b'g', b'i', b'n', 0x12, 0x01, b'u',
        ]);
        assert_eq!(DynamicMessage::decode(&COMMIT, &bytes).unwrap(), commit);
    }

    #[test]
    fn defaults_are_elided() {
        let commit = DynamicMessage::new(&COMMIT);
        assert!(commit.encode().unwrap().is_empty());
        assert!(DynamicMessage::partial(&COMMIT).encode().unwrap().is_empty());

        let decoded = DynamicMessage::decode(&COMMIT, &[]).unwrap();
        assert_eq!(decoded, commit);
        assert_eq!(list(&decoded, "remotes"), []);
    }

    #[test]
    fn presence_fields_write_defaults() {
        let mut msg = DynamicMessage::new(&EVERYTHING);
        msg.set("maybe_count", Value::I32(0)).unwrap();
        msg.set("text", Value::from("")).unwrap();
        assert_eq!(msg.encode().unwrap(), [0xC8, 0x01, 0x00, 0xD2, 0x01, 0x00]);

        let mut msg = DynamicMessage::new(&EVERYTHING);
        msg.set("double_value", Value::F64(-0.0)).unwrap();
        assert_eq!(msg.encode().unwrap(), [0x61, 0, 0, 0, 0, 0, 0, 0, 0x80]);

        let mut msg = DynamicMessage::new(&EVERYTHING);
        msg.set("created_at", Value::Timestamp(Timestamp::default())).unwrap();
        assert_eq!(msg.encode().unwrap(), [0x92, 0x01, 0x00]);
    }

    #[test]
    fn packed_layout() {
        let mut msg = DynamicMessage::new(&EVERYTHING);
        msg.set("numbers", vec![Value::I32(1), Value::I32(150), Value::I32(-1)]).unwrap();
        msg.set("legacy_numbers", vec![Value::I64(1), Value::I64(-2)]).unwrap();
        assert_eq!(msg.encode().unwrap(), [
            0xA2, 0x01, 0x0D, 0x01, 0x96, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01,
            0xA8, 0x01, 0x02, 0xA8, 0x01, 0x03,
        ]);
    }

    #[test]
    fn packed_unpacked_interop() {
        // numbers unpacked twice, then packed; legacy_numbers packed
        let input = [
            0xA0, 0x01, 0x05,
            0xA0, 0x01, 0x06,
            0xA2, 0x01, 0x01, 0x07,
            0xAA, 0x01, 0x02, 0x02, 0x03,
        ];
        let msg = DynamicMessage::decode(&EVERYTHING, &input).unwrap();
        assert_eq!(list(&msg, "numbers"), [Value::I32(5), Value::I32(6), Value::I32(7)]);
        assert_eq!(list(&msg, "legacy_numbers"), [Value::I64(1), Value::I64(-2)]);
    }

    #[test]
    fn map_duplicate_key_last_wins() {
        let input = [
            0xBA, 0x01, 0x06, 0x0A, 0x01, b'a', 0x12, 0x01, b'x',
            0xBA, 0x01, 0x06, 0x0A, 0x01, b'a', 0x12, 0x01, b'y',
        ];
        let msg = DynamicMessage::decode(&EVERYTHING, &input).unwrap();
        let labels = msg.get("labels").and_then(FieldValue::as_map).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get(&MapKey::from("a")), Some(&Value::from("y")));
    }

    #[test]
    fn map_entries_missing_parts() {
        // {5: <missing>} and {<missing>: 7}
        let input = [0xC2, 0x01, 0x02, 0x08, 0x05, 0xC2, 0x01, 0x02, 0x10, 0x07];
        let msg = DynamicMessage::decode(&EVERYTHING, &input).unwrap();
        let counts = msg.get("counts").and_then(FieldValue::as_map).unwrap();
        assert_eq!(counts.get(&MapKey::I32(5)), Some(&Value::I64(0)));
        assert_eq!(counts.get(&MapKey::I32(0)), Some(&Value::I64(7)));
    }

    #[test]
    fn maps_are_sorted() {
        let mut labels = MapField::new();
        labels.insert(MapKey::from("b"), Value::from("2"));
        labels.insert(MapKey::from("a"), Value::from("1"));
        let mut msg = DynamicMessage::new(&EVERYTHING);
        msg.set("labels", labels).unwrap();
        assert_eq!(msg.encode().unwrap(), [
            0xBA, 0x01, 0x06, 0x0A, 0x01, b'a', 0x12, 0x01, b'1',
            0xBA, 0x01, 0x06, 0x0A, 0x01, b'b', 0x12, 0x01, b'2',
        ]);
    }

    #[test]
    fn oneof_last_wins() {
        let msg = DynamicMessage::decode(&EVERYTHING, &[0xD2, 0x01, 0x01, b'a', 0xD8, 0x01, 0x05]).unwrap();
        assert_eq!(msg.which_oneof("choice").map(FieldDescriptor::name), Some("number"));
        assert!(!msg.has("text"));

        let msg = DynamicMessage::decode(&EVERYTHING, &[0xD8, 0x01, 0x05, 0xD2, 0x01, 0x01, b'a']).unwrap();
        assert_eq!(msg.which_oneof("choice").map(FieldDescriptor::name), Some("text"));
        assert_eq!(single(&msg, "text"), &Value::from("a"));
    }

    #[test]
    fn unrecognized_enum_survives() {
        let msg = DynamicMessage::decode(&EVERYTHING, &[0x80, 0x01, 0x07]).unwrap();
        assert_eq!(single(&msg, "status"), &Value::Enum(EnumValue::Unrecognized(7)));
        assert_eq!(msg.encode().unwrap(), [0x80, 0x01, 0x07]);
    }

    #[test]
    fn mismatched_wire_type_is_skipped() {
        let msg = DynamicMessage::decode(&EVERYTHING, &[0x0A, 0x01, b'a', 0x08, 0x05]).unwrap();
        assert_eq!(single(&msg, "int32_value"), &Value::I32(5));
    }

    #[test]
    fn singular_messages_merge() {
        let input = [0x8A, 0x01, 0x03, 0x0A, 0x01, b'a', 0x8A, 0x01, 0x03, 0x12, 0x01, b'b'];
        let msg = DynamicMessage::decode(&EVERYTHING, &input).unwrap();
        let commit = single(&msg, "commit").as_message().unwrap();
        assert_eq!(single(commit, "hash"), &Value::from("a"));
        assert_eq!(single(commit, "author_email"), &Value::from("b"));
    }

    #[test]
    fn well_known_types() {
        let input = [0x92, 0x01, 0x04, 0x08, 0x01, 0x10, 0x02, 0x9A, 0x01, 0x02, 0x08, 0x7F];
        let msg = DynamicMessage::decode(&EVERYTHING, &input).unwrap();
        assert_eq!(single(&msg, "created_at"), &Value::Timestamp(Timestamp { seconds: 1, nanos: 2 }));
        assert_eq!(single(&msg, "timeout"), &Value::Duration(Duration { seconds: 127, nanos: 0 }));
        assert_eq!(msg.encode().unwrap(), input);
    }

    #[test]
    fn invalid_input() {
        assert_matches!(DynamicMessage::decode(&EVERYTHING, &[0x00]), Err(read::Error::InvalidTag(0)));
        assert_matches!(DynamicMessage::decode(&EVERYTHING, &[0x0C]), Err(read::Error::InvalidTag(0x0C)));
        assert_matches!(DynamicMessage::decode(&EVERYTHING, &[0x08]), Err(read::Error::MalformedVarint) | Err(read::Error::TruncatedBuffer { .. }));
        assert_matches!(DynamicMessage::decode(&COMMIT, &[0x0A, 0x05, b'a']), Err(read::Error::TruncatedBuffer { needed: 5, remaining: 1 }));
        assert_matches!(DynamicMessage::decode(&COMMIT, &[0x0A, 0x01, 0xFF]), Err(read::Error::InvalidString(_)));
    }

    #[test]
    fn recursion_limit() {
        let mut msg = DynamicMessage::new(&EVERYTHING);
        for _ in 0..5 {
            let mut parent = DynamicMessage::new(&EVERYTHING);
            parent.set("child", Value::Message(msg)).unwrap();
            msg = parent;
        }
        let bytes = msg.encode().unwrap();

        let options = ReaderOptions::default().with_recursion_limit(3);
        assert_matches!(
            DynamicMessage::decode_with_options(&EVERYTHING, &bytes, options),
            Err(read::Error::RecursionLimitExceeded(3))
        );
        assert_eq!(DynamicMessage::decode(&EVERYTHING, &bytes).unwrap(), msg);
    }

    #[test]
    fn unknown_fields() {
        let input = [0x0A, 0x01, b'a', 0x18, 0x05, 0x12, 0x01, b'b'];

        let msg = DynamicMessage::decode(&REMOTE, &input).unwrap();
        assert!(msg.unknown_fields().is_empty());
        assert_eq!(msg.encode().unwrap(), [0x0A, 0x01, b'a', 0x12, 0x01, b'b']);

        let options = ReaderOptions::default().with_retain_unknown_fields(true);
        let msg = DynamicMessage::decode_with_options(&REMOTE, &input, options).unwrap();
        let three = FieldNumber::new(3).unwrap();
        assert_eq!(msg.unknown_fields().values(three).next(), Some(&UnknownField::Varint(5)));
        assert_eq!(msg.encode().unwrap(), [0x0A, 0x01, b'a', 0x12, 0x01, b'b', 0x18, 0x05]);
    }

    #[test]
    fn retained_groups_are_dropped() {
        let input = [0x0A, 0x01, b'a', 0x23, 0x08, 0x05, 0x24, 0x18, 0x05];
        let options = ReaderOptions::default().with_retain_unknown_fields(true);
        let msg = DynamicMessage::decode_with_options(&REMOTE, &input, options).unwrap();
        assert_eq!(msg.unknown_fields().len(), 1);
        assert_eq!(msg.encode().unwrap(), [0x0A, 0x01, b'a', 0x18, 0x05]);
    }

    #[test]
    fn type_mismatch() {
        let mut msg = DynamicMessage::new(&EVERYTHING);
        msg.set("int32_value", Value::from("one")).unwrap();
        assert_eq!(msg.encode(), Err(EncodeError::TypeMismatch { field: "int32_value", expected: "int32" }));

        let mut msg = DynamicMessage::new(&EVERYTHING);
        msg.set("numbers", Value::I32(1)).unwrap();
        assert_eq!(msg.encode(), Err(EncodeError::TypeMismatch { field: "numbers", expected: "list" }));

        let mut msg = DynamicMessage::new(&EVERYTHING);
        msg.set("commit", Value::Message(DynamicMessage::new(&REMOTE))).unwrap();
        assert_eq!(msg.encode(), Err(EncodeError::TypeMismatch { field: "commit", expected: "test.Commit" }));
    }

    proptest! {
        #[test]
        fn round_trip(msg in everything()) {
            let bytes = msg.encode().unwrap();
            let decoded = DynamicMessage::decode(&EVERYTHING, &bytes).unwrap();
            prop_assert_eq!(&decoded, &msg);
            prop_assert_eq!(decoded.encode().unwrap(), bytes);
        }

        #[test]
        fn unknown_field_tolerance(msg in everything()) {
            let bytes = msg.encode().unwrap();

            let narrow = DynamicMessage::decode(&NARROW, &bytes).unwrap();
            prop_assert_eq!(narrow.get("int32_value"), msg.get("int32_value"));
            prop_assert_eq!(narrow.get("string_value"), msg.get("string_value"));

            let options = ReaderOptions::default().with_retain_unknown_fields(true);
            let narrow = DynamicMessage::decode_with_options(&NARROW, &bytes, options).unwrap();
            let widened = DynamicMessage::decode(&EVERYTHING, &narrow.encode().unwrap()).unwrap();
            prop_assert_eq!(widened, msg);
        }
    }
}
