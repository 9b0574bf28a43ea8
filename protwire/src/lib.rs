//! A schema driven protobuf codec for the proto3 binary wire format and its canonical JSON mapping.
//!
//! Message types are described at runtime by [`MessageDescriptor`](schema/struct.MessageDescriptor.html)s,
//! and values of any type are held by [`DynamicMessage`](value/struct.DynamicMessage.html). Typed structs
//! take part by implementing [`Message`](trait.Message.html), converting to and from the dynamic form.
//!
//! ```
//! use protwire::schema::{FieldDescriptor, Kind, MessageDescriptor};
//! use protwire::value::{DynamicMessage, Value};
//!
//! static REMOTE: MessageDescriptor = MessageDescriptor::new("git.Remote", &[
//!     FieldDescriptor::new(1, "name", Kind::String),
//!     FieldDescriptor::new(2, "url", Kind::String),
//! ]);
//!
//! let mut remote = DynamicMessage::new(&REMOTE);
//! remote.set("name", Value::from("origin")).unwrap();
//!
//! let bytes = remote.encode().unwrap();
//! assert_eq!(bytes, b"\x0a\x06origin");
//! assert_eq!(DynamicMessage::decode(&REMOTE, &bytes).unwrap(), remote);
//! assert_eq!(remote.to_json().unwrap(), serde_json::json!({ "name": "origin", "url": "" }));
//! ```

#![warn(missing_docs)]

extern crate alloc;

mod internal {
    pub trait Sealed { }
}

pub mod codec;
pub mod collections;
pub mod io;
pub mod json;
pub mod raw;
pub mod schema;
pub mod value;
pub mod wkt;

#[cfg(test)]
mod testing;

use crate::io::read;
use crate::schema::MessageDescriptor;
use alloc::vec::Vec;
use thiserror::Error;

pub use codec::EncodeError;
pub use collections::UnknownFieldSet;
pub use json::JsonOptions;
pub use value::{DynamicMessage, EnumValue, FieldValue, MapKey, Value};

/// The error type for converting typed messages
#[derive(Debug, Error)]
pub enum Error {
    /// The binary input was malformed
    #[error(transparent)]
    Decode(#[from] read::Error),
    /// The message couldn't be encoded
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The JSON input was malformed or the message couldn't be written as JSON
    #[error(transparent)]
    Json(#[from] json::Error),
    /// A dynamic message of one type was converted into a typed message of another
    #[error("expected a message of type `{expected}`, found `{found}`")]
    DescriptorMismatch {
        /// The type the conversion expected
        expected: &'static str,
        /// The type of the dynamic message
        found: &'static str,
    },
    /// A field of the dynamic message held a value the typed message can't represent
    #[error("field `{field}` holds a value that isn't a {expected}")]
    InvalidField {
        /// The name of the field
        field: &'static str,
        /// What the typed message expected
        expected: &'static str,
    },
}

/// A result for a typed message conversion
pub type Result<T> = core::result::Result<T, Error>;

/// A typed message with a static descriptor.
///
/// Implementations only convert to and from [`DynamicMessage`](value/struct.DynamicMessage.html);
/// the binary and JSON forms are provided on top of that.
pub trait Message: Sized {
    /// The descriptor of the message type
    fn descriptor() -> &'static MessageDescriptor;

    /// Converts the message into its dynamic form
    fn to_dynamic(&self) -> DynamicMessage;

    /// Converts a dynamic message of this type into a typed message
    fn from_dynamic(message: &DynamicMessage) -> Result<Self>;

    /// Encodes the message to the binary wire format
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_dynamic().encode()?)
    }

    /// Decodes a message from the binary wire format
    fn decode(input: &[u8]) -> Result<Self> {
        let message = DynamicMessage::decode(Self::descriptor(), input)?;
        Self::from_dynamic(&message)
    }

    /// Converts the message to JSON with the specified options
    fn to_json(&self, options: &JsonOptions) -> Result<serde_json::Value> {
        Ok(self.to_dynamic().to_json_with(options)?)
    }

    /// Reads a message from JSON with the specified options
    fn from_json(json: &serde_json::Value, options: &JsonOptions) -> Result<Self> {
        let message = DynamicMessage::from_json_with(Self::descriptor(), json, options)?;
        Self::from_dynamic(&message)
    }
}

impl DynamicMessage {
    /// Checks that the message is of the specified type, for use by [`Message::from_dynamic`](trait.Message.html#tymethod.from_dynamic)
    pub fn expect_type(&self, descriptor: &'static MessageDescriptor) -> Result<()> {
        if self.descriptor() == descriptor {
            Ok(())
        } else {
            Err(Error::DescriptorMismatch { expected: descriptor.full_name(), found: self.descriptor().full_name() })
        }
    }
}
