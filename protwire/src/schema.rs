//! Static descriptions of message types: which fields exist, their numbers, and how they're laid out.
//!
//! Descriptors are plain data, usually emitted by a code generator as `static` items, and are
//! read-only once built. Every codec operation in this crate is driven by them.
//!
//! ```
//! use protwire::schema::{FieldDescriptor, Kind, MessageDescriptor};
//!
//! static REMOTE: MessageDescriptor = MessageDescriptor::new("git.Remote", &[
//!     FieldDescriptor::new(1, "name", Kind::String),
//!     FieldDescriptor::new(2, "url", Kind::String),
//! ]);
//!
//! static COMMIT: MessageDescriptor = MessageDescriptor::new("git.Commit", &[
//!     FieldDescriptor::new(1, "hash", Kind::String),
//!     FieldDescriptor::new(2, "author_email", Kind::String),
//!     FieldDescriptor::new(3, "remotes", Kind::Message(&REMOTE)).repeated(),
//! ]);
//!
//! assert_eq!(COMMIT.name(), "Commit");
//! assert_eq!(COMMIT.field_by_json_name("authorEmail").map(|f| f.number().get()), Some(2));
//! ```

use crate::io::{FieldNumber, WireType};
use alloc::borrow::Cow;
use alloc::string::String;
use core::fmt::{self, Debug, Formatter};
use core::ptr;

/// The kind of a field's values: its protobuf scalar type, or the type it refers to.
#[derive(Clone, Copy)]
pub enum Kind {
    /// `double`
    Double,
    /// `float`
    Float,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `sint32`
    Sint32,
    /// `sint64`
    Sint64,
    /// `fixed32`
    Fixed32,
    /// `fixed64`
    Fixed64,
    /// `sfixed32`
    Sfixed32,
    /// `sfixed64`
    Sfixed64,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// An enum type
    Enum(&'static EnumDescriptor),
    /// A message type
    Message(&'static MessageDescriptor),
    /// `google.protobuf.Timestamp`
    Timestamp,
    /// `google.protobuf.Duration`
    Duration,
}

impl Kind {
    /// The wire type of a single value of this kind
    pub const fn wire_type(self) -> WireType {
        match self {
            Kind::Int32 | Kind::Int64 | Kind::Uint32 | Kind::Uint64 |
            Kind::Sint32 | Kind::Sint64 | Kind::Bool | Kind::Enum(_) => WireType::Varint,
            Kind::Double | Kind::Fixed64 | Kind::Sfixed64 => WireType::Bit64,
            Kind::Float | Kind::Fixed32 | Kind::Sfixed32 => WireType::Bit32,
            Kind::String | Kind::Bytes | Kind::Message(_) | Kind::Timestamp | Kind::Duration => WireType::LengthDelimited,
        }
    }

    /// Returns if repeated values of this kind can be packed
    pub const fn is_packable(self) -> bool {
        self.wire_type().is_packable()
    }

    /// Returns if values of this kind are always encoded as nested messages
    pub const fn is_message(self) -> bool {
        matches!(self, Kind::Message(_) | Kind::Timestamp | Kind::Duration)
    }

    /// The name of the kind as written in a .proto file
    pub fn name(self) -> &'static str {
        match self {
            Kind::Double => "double",
            Kind::Float => "float",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Sint32 => "sint32",
            Kind::Sint64 => "sint64",
            Kind::Fixed32 => "fixed32",
            Kind::Fixed64 => "fixed64",
            Kind::Sfixed32 => "sfixed32",
            Kind::Sfixed64 => "sfixed64",
            Kind::Bool => "bool",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Enum(e) => e.full_name(),
            Kind::Message(m) => m.full_name(),
            Kind::Timestamp => "google.protobuf.Timestamp",
            Kind::Duration => "google.protobuf.Duration",
        }
    }
}

impl Debug for Kind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Kind) -> bool {
        match (self, other) {
            (Kind::Enum(a), Kind::Enum(b)) => a == b,
            (Kind::Message(a), Kind::Message(b)) => a == b,
            (a, b) => core::mem::discriminant(a) == core::mem::discriminant(b),
        }
    }
}

/// The kinds allowed as map keys: any integral or string scalar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `sint32`
    Sint32,
    /// `sint64`
    Sint64,
    /// `fixed32`
    Fixed32,
    /// `fixed64`
    Fixed64,
    /// `sfixed32`
    Sfixed32,
    /// `sfixed64`
    Sfixed64,
    /// `bool`
    Bool,
    /// `string`
    String,
}

impl KeyKind {
    /// The key kind as a general value kind
    pub const fn as_kind(self) -> Kind {
        match self {
            KeyKind::Int32 => Kind::Int32,
            KeyKind::Int64 => Kind::Int64,
            KeyKind::Uint32 => Kind::Uint32,
            KeyKind::Uint64 => Kind::Uint64,
            KeyKind::Sint32 => Kind::Sint32,
            KeyKind::Sint64 => Kind::Sint64,
            KeyKind::Fixed32 => Kind::Fixed32,
            KeyKind::Fixed64 => Kind::Fixed64,
            KeyKind::Sfixed32 => Kind::Sfixed32,
            KeyKind::Sfixed64 => Kind::Sfixed64,
            KeyKind::Bool => Kind::Bool,
            KeyKind::String => Kind::String,
        }
    }
}

/// How many values a field holds and how its presence is tracked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cardinality {
    /// A plain proto3 field. Default values aren't written to the wire.
    Singular,
    /// An `optional` field. Presence is tracked, so a set default value is still written.
    Optional,
    /// A `repeated` field
    Repeated,
    /// A `map` field with the specified key kind. The field's kind is the value kind.
    Map(KeyKind),
}

/// The description of a single field in a message.
#[derive(Clone, Copy, Debug)]
pub struct FieldDescriptor {
    number: FieldNumber,
    name: &'static str,
    json_name: Option<&'static str>,
    kind: Kind,
    cardinality: Cardinality,
    oneof: Option<&'static str>,
    packed: bool,
}

impl FieldDescriptor {
    /// Creates a new plain singular field.
    ///
    /// # Panics
    ///
    /// Panics if `number` isn't a valid field number. In a `static` this is a compile time error.
    pub const fn new(number: u32, name: &'static str, kind: Kind) -> FieldDescriptor {
        let number = match FieldNumber::new(number) {
            Some(number) => number,
            None => panic!("invalid field number"),
        };
        FieldDescriptor {
            number,
            name,
            json_name: None,
            kind,
            cardinality: Cardinality::Singular,
            oneof: None,
            packed: true,
        }
    }

    /// Marks the field `optional`
    pub const fn optional(mut self) -> Self {
        self.cardinality = Cardinality::Optional;
        self
    }

    /// Marks the field `repeated`
    pub const fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    /// Marks the field as a map with the specified key kind. The field's kind becomes the value kind.
    pub const fn map(mut self, key: KeyKind) -> Self {
        self.cardinality = Cardinality::Map(key);
        self
    }

    /// Makes the field a member of the named oneof
    pub const fn in_oneof(mut self, oneof: &'static str) -> Self {
        self.oneof = Some(oneof);
        self
    }

    /// Writes a repeated scalar field as one tagged value per element instead of a packed region
    pub const fn unpacked(mut self) -> Self {
        self.packed = false;
        self
    }

    /// Overrides the name used for the field in JSON
    pub const fn with_json_name(mut self, json_name: &'static str) -> Self {
        self.json_name = Some(json_name);
        self
    }

    /// The field number
    #[inline]
    pub const fn number(&self) -> FieldNumber {
        self.number
    }

    /// The field name as declared in the schema
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The name of the field in JSON, the declared name in lowerCamelCase unless overridden
    pub fn json_name(&self) -> Cow<'static, str> {
        match self.json_name {
            Some(name) => Cow::Borrowed(name),
            None => to_lower_camel_case(self.name),
        }
    }

    /// The kind of the field's values
    #[inline]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// The cardinality of the field
    #[inline]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// The name of the oneof the field belongs to
    #[inline]
    pub const fn oneof(&self) -> Option<&'static str> {
        self.oneof
    }

    /// Returns if the field holds a list of values
    #[inline]
    pub const fn is_repeated(&self) -> bool {
        matches!(self.cardinality, Cardinality::Repeated)
    }

    /// Returns if the field is a map
    #[inline]
    pub const fn is_map(&self) -> bool {
        matches!(self.cardinality, Cardinality::Map(_))
    }

    /// Returns if the field distinguishes "set to the default value" from "not set"
    pub const fn has_presence(&self) -> bool {
        self.oneof.is_some() || self.kind.is_message() ||
            matches!(self.cardinality, Cardinality::Optional)
    }

    /// Returns if the field is written as a packed region
    pub const fn is_packed(&self) -> bool {
        self.packed && self.is_repeated() && self.kind.is_packable()
    }

    /// Returns if the JSON key names this field, by JSON name or declared name
    pub fn matches_json_key(&self, key: &str) -> bool {
        key == self.name || self.json_name() == key
    }
}

/// Converts a declared `snake_case` field name to lowerCamelCase, the way protoc derives JSON names.
pub fn to_lower_camel_case(name: &str) -> Cow<'_, str> {
    if !name.contains('_') {
        return Cow::Borrowed(name);
    }
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// The description of a message type: its name and an ordered table of fields.
pub struct MessageDescriptor {
    full_name: &'static str,
    fields: &'static [FieldDescriptor],
}

impl MessageDescriptor {
    /// Creates a new message descriptor. Fields are encoded in the order given.
    pub const fn new(full_name: &'static str, fields: &'static [FieldDescriptor]) -> MessageDescriptor {
        MessageDescriptor { full_name, fields }
    }

    /// The full name of the message without a preceding dot.
    #[inline]
    pub const fn full_name(&self) -> &'static str {
        self.full_name
    }

    /// The name of the message type.
    pub fn name(&self) -> &'static str {
        match self.full_name.rfind('.') {
            Some(i) => &self.full_name[i + 1..],
            None => self.full_name,
        }
    }

    /// The fields of the message in declaration order
    #[inline]
    pub const fn fields(&self) -> &'static [FieldDescriptor] {
        self.fields
    }

    /// Finds a field by number
    pub fn field_by_number(&self, number: u32) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.number.get() == number)
    }

    /// Finds a field by declared name
    pub fn field_by_name(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Finds a field by JSON key, accepting either the JSON name or the declared name
    pub fn field_by_json_name(&self, key: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.matches_json_key(key))
    }

    /// The fields belonging to the named oneof
    pub fn oneof_members<'a>(&self, oneof: &'a str) -> impl Iterator<Item = &'static FieldDescriptor> + 'a {
        self.fields.iter().filter(move |f| f.oneof == Some(oneof))
    }
}

impl PartialEq for MessageDescriptor {
    fn eq(&self, other: &MessageDescriptor) -> bool {
        ptr::eq(self, other) || self.full_name == other.full_name
    }
}

impl Debug for MessageDescriptor {
    // message types can refer to themselves, so only the name is printed
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("MessageDescriptor").field(&self.full_name).finish()
    }
}

/// A named value of an enum type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnumValueDescriptor {
    /// The symbolic name of the value
    pub name: &'static str,
    /// The number of the value on the wire
    pub number: i32,
}

impl EnumValueDescriptor {
    /// Creates a new enum value descriptor
    pub const fn new(name: &'static str, number: i32) -> EnumValueDescriptor {
        EnumValueDescriptor { name, number }
    }
}

/// The description of an enum type
#[derive(Debug)]
pub struct EnumDescriptor {
    full_name: &'static str,
    values: &'static [EnumValueDescriptor],
}

impl EnumDescriptor {
    /// Creates a new enum descriptor. In proto3 the first value is the default and should be 0.
    pub const fn new(full_name: &'static str, values: &'static [EnumValueDescriptor]) -> EnumDescriptor {
        EnumDescriptor { full_name, values }
    }

    /// The full name of the enum without a preceding dot.
    #[inline]
    pub const fn full_name(&self) -> &'static str {
        self.full_name
    }

    /// The values of the enum
    #[inline]
    pub const fn values(&self) -> &'static [EnumValueDescriptor] {
        self.values
    }

    /// The number of the first declared value, the default for fields of this enum
    pub fn default_number(&self) -> i32 {
        self.values.first().map_or(0, |v| v.number)
    }

    /// Finds the symbolic name of a number
    pub fn name_of(&self, number: i32) -> Option<&'static str> {
        self.values.iter().find(|v| v.number == number).map(|v| v.name)
    }

    /// Finds the number of a symbolic name
    pub fn number_of(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|v| v.name == name).map(|v| v.number)
    }
}

impl PartialEq for EnumDescriptor {
    fn eq(&self, other: &EnumDescriptor) -> bool {
        ptr::eq(self, other) || self.full_name == other.full_name
    }
}
