//! Dynamic message values: a message is a descriptor plus a table of field values keyed by field number.
//!
//! Field presence follows proto3. A plain singular field always has a value, its default if nothing
//! was set. Repeated and map fields are always present, possibly empty. `optional`, message, and
//! oneof fields are absent until set.
//!
//! A message built with [`DynamicMessage::partial`] may leave any field absent; [`DynamicMessage::from_partial`]
//! fills in what a complete message always has.

use crate::collections::{MapField, RepeatedField, UnknownFieldSet};
use crate::schema::{Cardinality, EnumDescriptor, FieldDescriptor, KeyKind, Kind, MessageDescriptor};
use crate::wkt::{Duration, Timestamp};
use alloc::collections::btree_map::{self, BTreeMap};
use alloc::string::String;
use alloc::vec::Vec;
use either::Either;
use thiserror::Error;

/// The value of an enum field. Numbers the enum's descriptor doesn't declare are kept as they were read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnumValue {
    /// A number declared by the enum
    Known(i32),
    /// A number the enum doesn't declare, typically from a newer version of the schema
    Unrecognized(i32),
}

impl EnumValue {
    /// The number used in place of a symbolic name that couldn't be resolved
    pub const UNRECOGNIZED: i32 = -1;

    /// Resolves a number against an enum
    pub fn from_number(descriptor: &EnumDescriptor, number: i32) -> EnumValue {
        match descriptor.name_of(number) {
            Some(_) => EnumValue::Known(number),
            None => EnumValue::Unrecognized(number),
        }
    }

    /// Resolves a symbolic name against an enum.
    /// Unknown names are [`Unrecognized`](#variant.Unrecognized) with the number [`UNRECOGNIZED`](#associatedconstant.UNRECOGNIZED).
    pub fn from_name(descriptor: &EnumDescriptor, name: &str) -> EnumValue {
        match descriptor.number_of(name) {
            Some(number) => EnumValue::Known(number),
            None => EnumValue::Unrecognized(Self::UNRECOGNIZED),
        }
    }

    /// The number of the value, as written to the wire
    pub fn number(self) -> i32 {
        match self {
            EnumValue::Known(n) | EnumValue::Unrecognized(n) => n,
        }
    }

    /// Returns if the enum doesn't declare this value
    pub fn is_unrecognized(self) -> bool {
        matches!(self, EnumValue::Unrecognized(_))
    }

    /// The symbolic name of the value
    pub fn name(self, descriptor: &EnumDescriptor) -> Option<&'static str> {
        match self {
            EnumValue::Known(n) => descriptor.name_of(n),
            EnumValue::Unrecognized(_) => None,
        }
    }
}

/// A single value of a field
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// `bool`
    Bool(bool),
    /// `int32`, `sint32` or `sfixed32`
    I32(i32),
    /// `int64`, `sint64` or `sfixed64`
    I64(i64),
    /// `uint32` or `fixed32`
    U32(u32),
    /// `uint64` or `fixed64`
    U64(u64),
    /// `float`
    F32(f32),
    /// `double`
    F64(f64),
    /// `string`
    String(String),
    /// `bytes`
    Bytes(Vec<u8>),
    /// An enum value
    Enum(EnumValue),
    /// A nested message
    Message(DynamicMessage),
    /// `google.protobuf.Timestamp`
    Timestamp(Timestamp),
    /// `google.protobuf.Duration`
    Duration(Duration),
}

impl Value {
    /// The default value of a kind: zero, empty, the first enum value, or an empty message.
    pub fn default_for(kind: Kind) -> Value {
        match kind {
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(0),
            Kind::Uint32 | Kind::Fixed32 => Value::U32(0),
            Kind::Uint64 | Kind::Fixed64 => Value::U64(0),
            Kind::Float => Value::F32(0.0),
            Kind::Double => Value::F64(0.0),
            Kind::Bool => Value::Bool(false),
            Kind::String => Value::String(String::new()),
            Kind::Bytes => Value::Bytes(Vec::new()),
            Kind::Enum(e) => Value::Enum(EnumValue::from_number(e, e.default_number())),
            Kind::Message(m) => Value::Message(DynamicMessage::new(m)),
            Kind::Timestamp => Value::Timestamp(Timestamp::default()),
            Kind::Duration => Value::Duration(Duration::default()),
        }
    }

    /// Returns if a plain field holding this value is left off the wire.
    /// Floats are compared by bits so `-0.0` is still written.
    pub fn is_default(&self) -> bool {
        match self {
            Value::Bool(v) => !*v,
            Value::I32(v) => *v == 0,
            Value::I64(v) => *v == 0,
            Value::U32(v) => *v == 0,
            Value::U64(v) => *v == 0,
            Value::F32(v) => v.to_bits() == 0,
            Value::F64(v) => v.to_bits() == 0,
            Value::String(v) => v.is_empty(),
            Value::Bytes(v) => v.is_empty(),
            Value::Enum(v) => v.number() == 0,
            Value::Message(_) | Value::Timestamp(_) | Value::Duration(_) => false,
        }
    }

    /// Returns if the value can be held by a field of the specified kind
    pub fn matches_kind(&self, kind: Kind) -> bool {
        match (self, kind) {
            (Value::Bool(_), Kind::Bool) => true,
            (Value::I32(_), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32) => true,
            (Value::I64(_), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64) => true,
            (Value::U32(_), Kind::Uint32 | Kind::Fixed32) => true,
            (Value::U64(_), Kind::Uint64 | Kind::Fixed64) => true,
            (Value::F32(_), Kind::Float) => true,
            (Value::F64(_), Kind::Double) => true,
            (Value::String(_), Kind::String) => true,
            (Value::Bytes(_), Kind::Bytes) => true,
            (Value::Enum(_), Kind::Enum(_)) => true,
            (Value::Message(m), Kind::Message(d)) => m.descriptor() == d,
            (Value::Timestamp(_), Kind::Timestamp) => true,
            (Value::Duration(_), Kind::Duration) => true,
            _ => false,
        }
    }

    /// Gets the value as a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the value as a signed 32-bit integer
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the value as a signed 64-bit integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the value as an unsigned 32-bit integer
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the value as an unsigned 64-bit integer
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the value as a `float`
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the value as a `double`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the value as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the value as bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the value as an enum value
    pub fn as_enum(&self) -> Option<EnumValue> {
        match self {
            Value::Enum(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the value as a nested message
    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the value as a mutable nested message
    pub fn as_message_mut(&mut self) -> Option<&mut DynamicMessage> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the value as a timestamp
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the value as a duration
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(v) => Some(*v),
            _ => None,
        }
    }
}

macro_rules! from_impls {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Value {
                    Value::$variant(v)
                }
            }
        )*
    };
}

from_impls! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Bytes,
    EnumValue => Enum,
    DynamicMessage => Message,
    Timestamp => Timestamp,
    Duration => Duration,
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::String(v.into())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Value {
        Value::Bytes(v.to_vec())
    }
}

/// A key of a map field
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    /// A `bool` key
    Bool(bool),
    /// An `int32`, `sint32` or `sfixed32` key
    I32(i32),
    /// An `int64`, `sint64` or `sfixed64` key
    I64(i64),
    /// A `uint32` or `fixed32` key
    U32(u32),
    /// A `uint64` or `fixed64` key
    U64(u64),
    /// A `string` key
    String(String),
}

impl MapKey {
    /// The default key of a kind, used when an entry on the wire leaves its key out
    pub fn default_for(kind: KeyKind) -> MapKey {
        match kind {
            KeyKind::Int32 | KeyKind::Sint32 | KeyKind::Sfixed32 => MapKey::I32(0),
            KeyKind::Int64 | KeyKind::Sint64 | KeyKind::Sfixed64 => MapKey::I64(0),
            KeyKind::Uint32 | KeyKind::Fixed32 => MapKey::U32(0),
            KeyKind::Uint64 | KeyKind::Fixed64 => MapKey::U64(0),
            KeyKind::Bool => MapKey::Bool(false),
            KeyKind::String => MapKey::String(String::new()),
        }
    }

    /// Returns if the key can be held by a map with the specified key kind
    pub fn matches_kind(&self, kind: KeyKind) -> bool {
        self.to_value().matches_kind(kind.as_kind())
    }

    /// Converts the key to a general value
    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(v) => Value::Bool(*v),
            MapKey::I32(v) => Value::I32(*v),
            MapKey::I64(v) => Value::I64(*v),
            MapKey::U32(v) => Value::U32(*v),
            MapKey::U64(v) => Value::U64(*v),
            MapKey::String(v) => Value::String(v.clone()),
        }
    }

    /// Converts a general value to a key, if it's a kind of value that can be a key
    pub fn from_value(value: Value) -> Option<MapKey> {
        match value {
            Value::Bool(v) => Some(MapKey::Bool(v)),
            Value::I32(v) => Some(MapKey::I32(v)),
            Value::I64(v) => Some(MapKey::I64(v)),
            Value::U32(v) => Some(MapKey::U32(v)),
            Value::U64(v) => Some(MapKey::U64(v)),
            Value::String(v) => Some(MapKey::String(v)),
            _ => None,
        }
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> MapKey {
        MapKey::String(v.into())
    }
}

impl From<String> for MapKey {
    fn from(v: String) -> MapKey {
        MapKey::String(v)
    }
}

impl From<i32> for MapKey {
    fn from(v: i32) -> MapKey {
        MapKey::I32(v)
    }
}

impl From<i64> for MapKey {
    fn from(v: i64) -> MapKey {
        MapKey::I64(v)
    }
}

impl From<bool> for MapKey {
    fn from(v: bool) -> MapKey {
        MapKey::Bool(v)
    }
}

/// The contents of a field in a message
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// The value of a singular field
    Single(Value),
    /// The elements of a repeated field
    List(RepeatedField<Value>),
    /// The entries of a map field
    Map(MapField<MapKey, Value>),
}

impl FieldValue {
    /// The empty value for a field: an empty list or map for repeated and map fields, or the
    /// kind's default for singular fields
    pub fn default_for(field: &FieldDescriptor) -> FieldValue {
        match field.cardinality() {
            Cardinality::Repeated => FieldValue::List(RepeatedField::new()),
            Cardinality::Map(_) => FieldValue::Map(MapField::new()),
            Cardinality::Singular | Cardinality::Optional => FieldValue::Single(Value::default_for(field.kind())),
        }
    }

    /// Gets the value of a singular field
    pub fn as_single(&self) -> Option<&Value> {
        match self {
            FieldValue::Single(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the elements of a repeated field
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            FieldValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the entries of a map field
    pub fn as_map(&self) -> Option<&MapField<MapKey, Value>> {
        match self {
            FieldValue::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Iterates every value held: the single value, each element, or each map value
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        match self {
            FieldValue::Single(v) => Either::Left(core::iter::once(v)),
            FieldValue::List(v) => Either::Right(Either::Left(v.iter())),
            FieldValue::Map(v) => Either::Right(Either::Right(v.values())),
        }
    }

    /// Iterates every value held mutably
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        match self {
            FieldValue::Single(v) => Either::Left(core::iter::once(v)),
            FieldValue::List(v) => Either::Right(Either::Left(v.iter_mut())),
            FieldValue::Map(v) => Either::Right(Either::Right(v.values_mut())),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> FieldValue {
        FieldValue::Single(v)
    }
}

impl From<Vec<Value>> for FieldValue {
    fn from(v: Vec<Value>) -> FieldValue {
        FieldValue::List(v)
    }
}

impl From<MapField<MapKey, Value>> for FieldValue {
    fn from(v: MapField<MapKey, Value>) -> FieldValue {
        FieldValue::Map(v)
    }
}

/// The error returned when a message is asked for a field its descriptor doesn't declare
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("message `{message}` has no field `{field}`")]
pub struct NoSuchField {
    /// The full name of the message type
    pub message: &'static str,
    /// The name or number that was looked up
    pub field: String,
}

/// A message of any type, described at runtime by its [`MessageDescriptor`](../schema/struct.MessageDescriptor.html).
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicMessage {
    descriptor: &'static MessageDescriptor,
    pub(crate) fields: BTreeMap<u32, FieldValue>,
    pub(crate) unknown_fields: UnknownFieldSet,
}

impl DynamicMessage {
    /// Creates a message with every field absent, including the ones a complete message always has.
    pub fn partial(descriptor: &'static MessageDescriptor) -> DynamicMessage {
        DynamicMessage { descriptor, fields: BTreeMap::new(), unknown_fields: UnknownFieldSet::new() }
    }

    /// Creates a complete message with every field at its default
    pub fn new(descriptor: &'static MessageDescriptor) -> DynamicMessage {
        DynamicMessage::from_partial(DynamicMessage::partial(descriptor))
    }

    /// Completes a partial message: absent plain fields take their defaults, absent repeated and map
    /// fields become empty, and nested messages are completed the same way. Fields with presence stay absent.
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
    /// let mut partial = DynamicMessage::partial(&REMOTE);
    /// partial.set("name", Value::from("origin")).unwrap();
    ///
    /// let remote = DynamicMessage::from_partial(partial);
    /// assert_eq!(remote.get("url").unwrap().as_single().and_then(Value::as_str), Some(""));
    /// ```
    pub fn from_partial(mut partial: DynamicMessage) -> DynamicMessage {
        partial.fill_defaults();
        partial
    }

    fn fill_defaults(&mut self) {
        for field in self.descriptor.fields() {
            let fills = match field.cardinality() {
                Cardinality::Repeated | Cardinality::Map(_) => true,
                Cardinality::Singular => !field.has_presence(),
                Cardinality::Optional => false,
            };
            if fills {
                self.fields.entry(field.number().get()).or_insert_with(|| FieldValue::default_for(field));
            }
        }
        for value in self.fields.values_mut().flat_map(FieldValue::values_mut) {
            if let Value::Message(nested) = value {
                nested.fill_defaults();
            }
        }
    }

    /// The descriptor of the message's type
    #[inline]
    pub fn descriptor(&self) -> &'static MessageDescriptor {
        self.descriptor
    }

    fn field(&self, name: &str) -> Result<&'static FieldDescriptor, NoSuchField> {
        self.descriptor.field_by_name(name).ok_or_else(|| NoSuchField {
            message: self.descriptor.full_name(),
            field: name.into(),
        })
    }

    /// Gets the contents of a field by name, or none if the field is absent
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let field = self.descriptor.field_by_name(name)?;
        self.fields.get(&field.number().get())
    }

    /// Gets the mutable contents of a field by name, or none if the field is absent
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        let field = self.descriptor.field_by_name(name)?;
        self.fields.get_mut(&field.number().get())
    }

    /// Gets the contents of a field by number, or none if the field is absent
    pub fn get_by_number(&self, number: u32) -> Option<&FieldValue> {
        self.fields.get(&number)
    }

    /// Returns if a field has a value
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets a field by name. Setting a member of a oneof clears the other members.
    ///
    /// Values aren't checked against the field's kind here; a mismatched value fails when the message is encoded.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<&mut Self, NoSuchField> {
        let field = self.field(name)?;
        self.set_field(field, value.into());
        Ok(self)
    }

    /// Sets a field by number. Setting a member of a oneof clears the other members.
    pub fn set_by_number(&mut self, number: u32, value: impl Into<FieldValue>) -> Result<&mut Self, NoSuchField> {
        let field = self.descriptor.field_by_number(number).ok_or_else(|| NoSuchField {
            message: self.descriptor.full_name(),
            field: alloc::format!("#{}", number),
        })?;
        self.set_field(field, value.into());
        Ok(self)
    }

    pub(crate) fn set_field(&mut self, field: &FieldDescriptor, value: FieldValue) {
        if let Some(oneof) = field.oneof() {
            for member in self.descriptor.oneof_members(oneof) {
                self.fields.remove(&member.number().get());
            }
        }
        self.fields.insert(field.number().get(), value);
    }

    /// Clears a field by name, making it absent. A complete message resets it to its default instead.
    pub fn clear(&mut self, name: &str) -> Result<(), NoSuchField> {
        let field = self.field(name)?;
        self.fields.remove(&field.number().get());
        Ok(())
    }

    /// Gets the member of a oneof that is set
    pub fn which_oneof(&self, oneof: &str) -> Option<&'static FieldDescriptor> {
        self.descriptor.oneof_members(oneof).find(|f| self.fields.contains_key(&f.number().get()))
    }

    /// Iterates the fields that have values, in field number order
    pub fn fields(&self) -> Fields<'_> {
        Fields { descriptor: self.descriptor, inner: self.fields.iter() }
    }

    /// The fields that were read from the wire without a matching field descriptor
    #[inline]
    pub fn unknown_fields(&self) -> &UnknownFieldSet {
        &self.unknown_fields
    }

    /// The mutable set of unknown fields
    #[inline]
    pub fn unknown_fields_mut(&mut self) -> &mut UnknownFieldSet {
        &mut self.unknown_fields
    }
}

/// An iterator over the present fields of a [`DynamicMessage`](struct.DynamicMessage.html)
#[derive(Clone, Debug)]
pub struct Fields<'a> {
    descriptor: &'static MessageDescriptor,
    inner: btree_map::Iter<'a, u32, FieldValue>,
}

impl<'a> Iterator for Fields<'a> {
    type Item = (&'static FieldDescriptor, &'a FieldValue);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (number, value) = self.inner.next()?;
            if let Some(field) = self.descriptor.field_by_number(*number) {
                return Some((field, value));
            }
        }
    }
}
