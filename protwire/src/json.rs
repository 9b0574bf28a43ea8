//! The JSON form of messages, built on `serde_json` values.
//!
//! Field names are written in lowerCamelCase (or the field's custom JSON name) and read in either that
//! form or the declared form.
//!
//! | Kind | JSON |
//! |---|---|
//! | 32-bit integers | number |
//! | 64-bit integers | number or string, per [`Int64Repr`](enum.Int64Repr.html) |
//! | `float`, `double` | number, or `"NaN"`, `"Infinity"`, `"-Infinity"` |
//! | `bool` | `true` or `false` |
//! | `string` | string |
//! | `bytes` | standard base64 string (URL-safe base64 is accepted when reading) |
//! | enums | the value's name, or its number if the enum doesn't declare it |
//! | messages | object |
//! | `Timestamp` | RFC 3339 string in UTC |
//! | `Duration` | seconds with an `s` suffix, like `"1.5s"` |
//! | repeated | array |
//! | map | object with stringified keys |
//!
//! When reading, numeric fields accept numbers or numeric strings and `null` leaves a field unset.
//! Members of a oneof are applied in document order, so the last one present wins.

use crate::collections::{sorted_entries, MapField, RepeatedField};
use crate::io::varint::{self, PrecisionLoss};
use crate::schema::{Cardinality, FieldDescriptor, KeyKind, Kind, MessageDescriptor};
use crate::value::{DynamicMessage, EnumValue, FieldValue, MapKey, Value};
use crate::wkt::{self, Duration, Timestamp, TimestampPrecision};
use alloc::string::{String, ToString};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use core::fmt::Write;
use serde_json::{Map, Number, Value as Json};
use thiserror::Error;
use tracing::debug;

/// How 64-bit integers are written to JSON. Doubles can only hold integers up to 2^53 - 1 exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Int64Repr {
    /// Numbers within the safe range are written as numbers, larger ones as strings
    Auto,
    /// Always write strings
    String,
    /// Always write numbers, failing with [`PrecisionLoss`](enum.ErrorKind.html#variant.PrecisionLoss) outside the safe range
    Number,
}

impl Default for Int64Repr {
    fn default() -> Self {
        Int64Repr::Auto
    }
}

/// A set of options that can be used to modify the JSON mapping
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonOptions {
    /// How 64-bit integers are written
    pub int64: Int64Repr,
    /// Whether plain fields holding their default value and empty repeated and map fields are written
    pub emit_defaults: bool,
    /// Whether keys that don't name a field are skipped when reading instead of failing
    pub ignore_unknown_fields: bool,
    /// How many fractional digits timestamps are written with. Only the default,
    /// [`Nanos`](../wkt/enum.TimestampPrecision.html#variant.Nanos), reads back exactly.
    pub timestamp_precision: TimestampPrecision,
}

impl JsonOptions {
    /// Sets how 64-bit integers are written
    pub fn with_int64(mut self, int64: Int64Repr) -> Self {
        self.int64 = int64;
        self
    }

    /// Sets whether default values are written
    pub fn with_emit_defaults(mut self, emit: bool) -> Self {
        self.emit_defaults = emit;
        self
    }

    /// Sets whether unknown keys are skipped when reading
    pub fn with_ignore_unknown_fields(mut self, ignore: bool) -> Self {
        self.ignore_unknown_fields = ignore;
        self
    }

    /// Sets the precision timestamps are written with
    pub fn with_timestamp_precision(mut self, precision: TimestampPrecision) -> Self {
        self.timestamp_precision = precision;
        self
    }
}

impl Default for JsonOptions {
    fn default() -> Self {
        JsonOptions {
            int64: Int64Repr::Auto,
            emit_defaults: true,
            ignore_unknown_fields: true,
            timestamp_precision: TimestampPrecision::Nanos,
        }
    }
}

/// What went wrong converting to or from JSON
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ErrorKind {
    /// The JSON value had the wrong type
    #[error("expected {0}")]
    ExpectedType(&'static str),
    /// A 64-bit integer couldn't be carried exactly by a double
    #[error(transparent)]
    PrecisionLoss(#[from] PrecisionLoss),
    /// A number didn't fit the field's kind
    #[error("value is out of range for {0}")]
    OutOfRange(&'static str),
    /// A bytes field held a string that isn't base64
    #[error("invalid base64: {0}")]
    InvalidBase64(String),
    /// A timestamp couldn't be parsed or formatted
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(wkt::Error),
    /// A duration couldn't be parsed or formatted
    #[error("invalid duration: {0}")]
    InvalidDuration(wkt::Error),
    /// An enum number didn't fit in 32 bits
    #[error("invalid value for enum {0}")]
    InvalidEnum(&'static str),
    /// A map key couldn't be parsed as the map's key kind
    #[error("`{0}` is not a valid {1} map key")]
    InvalidMapKey(String, &'static str),
    /// A key didn't name a field and unknown fields aren't ignored
    #[error("unknown field `{0}`")]
    UnknownField(String),
}

/// The error type for the JSON mapping, locating the problem by its path from the root message
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{}: {}", display_path(.path), .kind)]
pub struct Error {
    /// The path to the offending value, like `remotes[0].url`. Empty for the root message.
    pub path: String,
    /// What went wrong
    pub kind: ErrorKind,
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

/// A result for a JSON conversion
pub type Result<T> = core::result::Result<T, Error>;

// the path is built up as the tree is walked and truncated on the way back out
struct Path(String);

impl Path {
    fn field(&mut self, name: &str) -> usize {
        let mark = self.0.len();
        if !self.0.is_empty() {
            self.0.push('.');
        }
        self.0.push_str(name);
        mark
    }

    fn index(&mut self, i: usize) -> usize {
        let mark = self.0.len();
        let _ = write!(self.0, "[{}]", i);
        mark
    }

    fn key(&mut self, key: &str) -> usize {
        let mark = self.0.len();
        let _ = write!(self.0, "[{:?}]", key);
        mark
    }

    fn restore(&mut self, mark: usize) {
        self.0.truncate(mark);
    }

    fn error(&self, kind: impl Into<ErrorKind>) -> Error {
        Error { path: self.0.clone(), kind: kind.into() }
    }
}

impl DynamicMessage {
    /// Converts the message to JSON with the default options
    pub fn to_json(&self) -> Result<Json> {
        self.to_json_with(&JsonOptions::default())
    }

    /// Converts the message to JSON
    pub fn to_json_with(&self, options: &JsonOptions) -> Result<Json> {
        message_to_json(self, options, &mut Path(String::new()))
    }

    /// Reads a message of the specified type from JSON with the default options
    pub fn from_json(descriptor: &'static MessageDescriptor, json: &Json) -> Result<DynamicMessage> {
        DynamicMessage::from_json_with(descriptor, json, &JsonOptions::default())
    }

    /// Reads a message of the specified type from JSON. Fields missing from the JSON take their defaults.
    pub fn from_json_with(descriptor: &'static MessageDescriptor, json: &Json, options: &JsonOptions) -> Result<DynamicMessage> {
        message_from_json(descriptor, json, options, &mut Path(String::new()))
    }
}

fn message_to_json(message: &DynamicMessage, options: &JsonOptions, path: &mut Path) -> Result<Json> {
    let mut object = Map::new();
    for field in message.descriptor().fields() {
        let value = match message.get_by_number(field.number().get()) {
            Some(value) => value,
            None => continue,
        };
        let name = field.json_name();
        let mark = path.field(&name);
        let json = match (field.cardinality(), value) {
            (Cardinality::Singular | Cardinality::Optional, FieldValue::Single(value)) => {
                if !options.emit_defaults && !field.has_presence() && value.is_default() {
                    None
                } else {
                    Some(value_to_json(field.kind(), value, options, path)?)
                }
            }
            (Cardinality::Repeated, FieldValue::List(values)) => {
                if !options.emit_defaults && values.is_empty() {
                    None
                } else {
                    let mut array = Vec::with_capacity(values.len());
                    for (i, value) in values.iter().enumerate() {
                        let mark = path.index(i);
                        array.push(value_to_json(field.kind(), value, options, path)?);
                        path.restore(mark);
                    }
                    Some(Json::Array(array))
                }
            }
            (Cardinality::Map(_), FieldValue::Map(entries)) => {
                if !options.emit_defaults && entries.is_empty() {
                    None
                } else {
                    let mut map = Map::new();
                    for (key, value) in sorted_entries(entries) {
                        let key = key_to_string(key);
                        let mark = path.key(&key);
                        let value = value_to_json(field.kind(), value, options, path)?;
                        path.restore(mark);
                        map.insert(key, value);
                    }
                    Some(Json::Object(map))
                }
            }
            (Cardinality::Repeated, _) => return Err(path.error(ErrorKind::ExpectedType("list"))),
            (Cardinality::Map(_), _) => return Err(path.error(ErrorKind::ExpectedType("map"))),
            (_, _) => return Err(path.error(ErrorKind::ExpectedType("single value"))),
        };
        path.restore(mark);
        if let Some(json) = json {
            object.insert(name.into_owned(), json);
        }
    }
    Ok(Json::Object(object))
}

fn int64_to_json(value: i64, repr: Int64Repr) -> core::result::Result<Json, PrecisionLoss> {
    match (repr, varint::i64_to_f64(value)) {
        (Int64Repr::String, _) | (Int64Repr::Auto, Err(_)) => Ok(Json::String(value.to_string())),
        (Int64Repr::Auto, Ok(_)) | (Int64Repr::Number, Ok(_)) => Ok(Json::from(value)),
        (Int64Repr::Number, Err(e)) => Err(e),
    }
}

fn uint64_to_json(value: u64, repr: Int64Repr) -> core::result::Result<Json, PrecisionLoss> {
    match (repr, varint::u64_to_f64(value)) {
        (Int64Repr::String, _) | (Int64Repr::Auto, Err(_)) => Ok(Json::String(value.to_string())),
        (Int64Repr::Auto, Ok(_)) | (Int64Repr::Number, Ok(_)) => Ok(Json::from(value)),
        (Int64Repr::Number, Err(e)) => Err(e),
    }
}

fn float_to_json(value: f64) -> Json {
    match Number::from_f64(value) {
        Some(n) => Json::Number(n),
        None if value.is_nan() => Json::String("NaN".into()),
        None if value > 0.0 => Json::String("Infinity".into()),
        None => Json::String("-Infinity".into()),
    }
}

fn key_to_string(key: &MapKey) -> String {
    match key {
        MapKey::Bool(v) => v.to_string(),
        MapKey::I32(v) => v.to_string(),
        MapKey::I64(v) => v.to_string(),
        MapKey::U32(v) => v.to_string(),
        MapKey::U64(v) => v.to_string(),
        MapKey::String(v) => v.clone(),
    }
}

fn value_to_json(kind: Kind, value: &Value, options: &JsonOptions, path: &mut Path) -> Result<Json> {
    if !value.matches_kind(kind) {
        return Err(path.error(ErrorKind::ExpectedType(kind.name())));
    }
    let json = match value {
        Value::Bool(v) => Json::Bool(*v),
        Value::I32(v) => Json::from(*v),
        Value::U32(v) => Json::from(*v),
        Value::I64(v) => int64_to_json(*v, options.int64).map_err(|e| path.error(e))?,
        Value::U64(v) => uint64_to_json(*v, options.int64).map_err(|e| path.error(e))?,
        Value::F32(v) => float_to_json(f64::from(*v)),
        Value::F64(v) => float_to_json(*v),
        Value::String(v) => Json::String(v.clone()),
        Value::Bytes(v) => Json::String(STANDARD.encode(v)),
        Value::Enum(v) => match (kind, v) {
            (Kind::Enum(descriptor), EnumValue::Known(n)) => match descriptor.name_of(*n) {
                Some(name) => Json::String(name.into()),
                None => Json::from(*n),
            },
            (_, v) => Json::from(v.number()),
        },
        Value::Message(m) => message_to_json(m, options, path)?,
        Value::Timestamp(v) => v
            .to_rfc3339(options.timestamp_precision)
            .map(Json::String)
            .map_err(|e| path.error(ErrorKind::InvalidTimestamp(e)))?,
        Value::Duration(v) => v
            .to_json_string()
            .map(Json::String)
            .map_err(|e| path.error(ErrorKind::InvalidDuration(e)))?,
    };
    Ok(json)
}

fn message_from_json(
    descriptor: &'static MessageDescriptor,
    json: &Json,
    options: &JsonOptions,
    path: &mut Path,
) -> Result<DynamicMessage> {
    let object = match json {
        Json::Object(object) => object,
        _ => return Err(path.error(ErrorKind::ExpectedType("object"))),
    };
    let mut message = DynamicMessage::new(descriptor);
    for (key, json) in object {
        let field = match descriptor.field_by_json_name(key) {
            Some(field) => field,
            None if options.ignore_unknown_fields => {
                debug!(message_type = descriptor.full_name(), key = key.as_str(), "ignoring unknown JSON key");
                continue;
            }
            None => {
                let mark = path.field(key);
                let error = path.error(ErrorKind::UnknownField(key.clone()));
                path.restore(mark);
                return Err(error);
            }
        };
        let mark = path.field(&field.json_name());
        if json.is_null() {
            if field.has_presence() {
                message.fields.remove(&field.number().get());
            } else {
                message.fields.insert(field.number().get(), FieldValue::default_for(field));
            }
        } else {
            let value = field_from_json(field, json, options, path)?;
            message.set_field(field, value);
        }
        path.restore(mark);
    }
    Ok(message)
}

fn field_from_json(field: &FieldDescriptor, json: &Json, options: &JsonOptions, path: &mut Path) -> Result<FieldValue> {
    let kind = field.kind();
    match field.cardinality() {
        Cardinality::Singular | Cardinality::Optional => Ok(FieldValue::Single(value_from_json(kind, json, options, path)?)),
        Cardinality::Repeated => {
            let array = json.as_array().ok_or_else(|| path.error(ErrorKind::ExpectedType("array")))?;
            let mut values = RepeatedField::with_capacity(array.len());
            for (i, json) in array.iter().enumerate() {
                let mark = path.index(i);
                values.push(value_from_json(kind, json, options, path)?);
                path.restore(mark);
            }
            Ok(FieldValue::List(values))
        }
        Cardinality::Map(key_kind) => {
            let object = json.as_object().ok_or_else(|| path.error(ErrorKind::ExpectedType("object")))?;
            let mut map = MapField::with_capacity(object.len());
            for (key, json) in object {
                let mark = path.key(key);
                let parsed = key_from_string(key_kind, key).ok_or_else(|| {
                    path.error(ErrorKind::InvalidMapKey(key.clone(), key_kind.as_kind().name()))
                })?;
                map.insert(parsed, value_from_json(kind, json, options, path)?);
                path.restore(mark);
            }
            Ok(FieldValue::Map(map))
        }
    }
}

fn key_from_string(kind: KeyKind, key: &str) -> Option<MapKey> {
    Some(match kind {
        KeyKind::Bool => match key {
            "true" => MapKey::Bool(true),
            "false" => MapKey::Bool(false),
            _ => return None,
        },
        KeyKind::Int32 | KeyKind::Sint32 | KeyKind::Sfixed32 => MapKey::I32(key.parse().ok()?),
        KeyKind::Int64 | KeyKind::Sint64 | KeyKind::Sfixed64 => MapKey::I64(key.parse().ok()?),
        KeyKind::Uint32 | KeyKind::Fixed32 => MapKey::U32(key.parse().ok()?),
        KeyKind::Uint64 | KeyKind::Fixed64 => MapKey::U64(key.parse().ok()?),
        KeyKind::String => MapKey::String(key.into()),
    })
}

fn float_to_integer(value: f64) -> core::result::Result<i128, ErrorKind> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(ErrorKind::ExpectedType("integer"));
    }
    Ok(i128::from(varint::f64_to_i64(value)?))
}

fn integer<T: TryFrom<i128>>(kind: Kind, json: &Json) -> core::result::Result<T, ErrorKind> {
    let wide = match json {
        Json::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(v), _, _) => i128::from(v),
            (_, Some(v), _) => i128::from(v),
            (_, _, Some(v)) => float_to_integer(v)?,
            _ => return Err(ErrorKind::ExpectedType("integer")),
        },
        Json::String(s) => match s.parse::<i128>() {
            Ok(v) => v,
            Err(_) => float_to_integer(s.parse().map_err(|_| ErrorKind::ExpectedType("integer"))?)?,
        },
        _ => return Err(ErrorKind::ExpectedType("integer")),
    };
    T::try_from(wide).map_err(|_| ErrorKind::OutOfRange(kind.name()))
}

fn float(json: &Json) -> core::result::Result<f64, ErrorKind> {
    match json {
        Json::Number(n) => n.as_f64().ok_or(ErrorKind::ExpectedType("number")),
        Json::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            s => match s.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(ErrorKind::ExpectedType("number")),
            },
        },
        _ => Err(ErrorKind::ExpectedType("number")),
    }
}

fn bytes(s: &str) -> core::result::Result<alloc::vec::Vec<u8>, ErrorKind> {
    STANDARD
        .decode(s)
        .or_else(|_| URL_SAFE.decode(s))
        .or_else(|_| STANDARD_NO_PAD.decode(s))
        .or_else(|_| URL_SAFE_NO_PAD.decode(s))
        .map_err(|e| ErrorKind::InvalidBase64(e.to_string()))
}

fn value_from_json(kind: Kind, json: &Json, options: &JsonOptions, path: &mut Path) -> Result<Value> {
    let value = match kind {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => integer(kind, json).map(Value::I32),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => integer(kind, json).map(Value::I64),
        Kind::Uint32 | Kind::Fixed32 => integer(kind, json).map(Value::U32),
        Kind::Uint64 | Kind::Fixed64 => integer(kind, json).map(Value::U64),
        Kind::Double => float(json).map(Value::F64),
        Kind::Float => float(json).and_then(|v| {
            if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                Err(ErrorKind::OutOfRange("float"))
            } else {
                Ok(Value::F32(v as f32))
            }
        }),
        Kind::Bool => json.as_bool().map(Value::Bool).ok_or(ErrorKind::ExpectedType("bool")),
        Kind::String => json.as_str().map(Value::from).ok_or(ErrorKind::ExpectedType("string")),
        Kind::Bytes => match json.as_str() {
            Some(s) => bytes(s).map(Value::Bytes),
            None => Err(ErrorKind::ExpectedType("base64 string")),
        },
        Kind::Enum(descriptor) => match json {
            Json::String(name) => match name.parse::<i32>() {
                Ok(n) => Ok(Value::Enum(EnumValue::from_number(descriptor, n))),
                Err(_) => Ok(Value::Enum(EnumValue::from_name(descriptor, name))),
            },
            Json::Number(_) => integer::<i32>(kind, json)
                .map(|n| Value::Enum(EnumValue::from_number(descriptor, n)))
                .map_err(|_| ErrorKind::InvalidEnum(descriptor.full_name())),
            _ => Err(ErrorKind::ExpectedType("enum name or number")),
        },
        Kind::Message(descriptor) => return message_from_json(descriptor, json, options, path).map(Value::Message),
        Kind::Timestamp => match json.as_str() {
            Some(s) => Timestamp::parse_rfc3339(s).map(Value::Timestamp).map_err(ErrorKind::InvalidTimestamp),
            None => Err(ErrorKind::ExpectedType("timestamp string")),
        },
        Kind::Duration => match json.as_str() {
            Some(s) => Duration::parse_json_string(s).map(Value::Duration).map_err(ErrorKind::InvalidDuration),
            None => Err(ErrorKind::ExpectedType("duration string")),
        },
    };
    value.map_err(|kind| path.error(kind))
}
