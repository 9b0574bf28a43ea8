//! Contains types for protobuf values and traits for value operations.
//!
//! Each type here is a marker naming one way a value is laid out on the wire. The same Rust type
//! can be written several ways (an `i32` can be an `Int32`, a `Sint32` or a `Sfixed32`), so values are
//! read and written through the marker rather than through the Rust type itself.

use crate::internal::Sealed;
use crate::io::{read, varint, CodedReader, CodedWriter, WireType};
use alloc::vec::Vec;

/// A value capable of reading itself from an input, writing itself and writing itself to an output.
pub trait Value: Sealed {
    /// The Rust type the value is read into
    type Inner;

    /// A value indicating the wire type of the value without packing.
    /// This can be used to indicate if a value is eligible for repeated field packing.
    const WIRE_TYPE: WireType;

    /// Reads a new instance of the value from the [`CodedReader`](../io/read/struct.CodedReader.html)
    fn read(input: &mut CodedReader<'_>) -> read::Result<Self::Inner>;

    /// Writes the value to the [`CodedWriter`](../io/write/struct.CodedWriter.html)
    fn write(value: &Self::Inner, output: &mut CodedWriter);
}

macro_rules! marker {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Clone, Copy, Debug)]
        pub enum $name { }

        impl Sealed for $name { }
    };
}

marker! {
    /// A varint encoded 32-bit value. Negative values are encoded as 10-byte varints.
    Int32
}

impl Value for Int32 {
    type Inner = i32;
    const WIRE_TYPE: WireType = WireType::Varint;

    fn read(input: &mut CodedReader<'_>) -> read::Result<i32> {
        input.read_varint32().map(|v| v as i32)
    }
    fn write(value: &i32, output: &mut CodedWriter) {
        // sign extended so other runtimes reading an int64 see the same value
        output.write_varint64(i64::from(*value) as u64);
    }
}

marker! {
    /// A varint encoded 32-bit value. Can be at most 5 bytes.
    Uint32
}

impl Value for Uint32 {
    type Inner = u32;
    const WIRE_TYPE: WireType = WireType::Varint;

    fn read(input: &mut CodedReader<'_>) -> read::Result<u32> {
        input.read_varint32()
    }
    fn write(value: &u32, output: &mut CodedWriter) {
        output.write_varint32(*value);
    }
}

marker! {
    /// A varint encoded 64-bit value. Can be at most 10 bytes.
    Int64
}

impl Value for Int64 {
    type Inner = i64;
    const WIRE_TYPE: WireType = WireType::Varint;

    fn read(input: &mut CodedReader<'_>) -> read::Result<i64> {
        input.read_varint64().map(|v| v as i64)
    }
    fn write(value: &i64, output: &mut CodedWriter) {
        output.write_varint64(*value as u64);
    }
}

marker! {
    /// A varint encoded 64-bit value. Can be at most 10 bytes.
    Uint64
}

impl Value for Uint64 {
    type Inner = u64;
    const WIRE_TYPE: WireType = WireType::Varint;

    fn read(input: &mut CodedReader<'_>) -> read::Result<u64> {
        input.read_varint64()
    }
    fn write(value: &u64, output: &mut CodedWriter) {
        output.write_varint64(*value);
    }
}

marker! {
    /// A varint encoded 32-bit value. This is encoded using zig-zag encoding,
    /// which makes it more efficient at encoding negative values.
    Sint32
}

impl Value for Sint32 {
    type Inner = i32;
    const WIRE_TYPE: WireType = WireType::Varint;

    fn read(input: &mut CodedReader<'_>) -> read::Result<i32> {
        input.read_varint32().map(varint::zigzag_decode32)
    }
    fn write(value: &i32, output: &mut CodedWriter) {
        output.write_varint32(varint::zigzag_encode32(*value));
    }
}

marker! {
    /// A varint encoded 64-bit value. This is encoded using zig-zag encoding,
    /// which makes it more efficient at encoding negative values.
    Sint64
}

impl Value for Sint64 {
    type Inner = i64;
    const WIRE_TYPE: WireType = WireType::Varint;

    fn read(input: &mut CodedReader<'_>) -> read::Result<i64> {
        input.read_varint64().map(varint::zigzag_decode64)
    }
    fn write(value: &i64, output: &mut CodedWriter) {
        output.write_varint64(varint::zigzag_encode64(*value));
    }
}

marker! {
    /// A fixed size 32-bit value. This is encoded as 4 little endian bytes.
    Fixed32
}

impl Value for Fixed32 {
    type Inner = u32;
    const WIRE_TYPE: WireType = WireType::Bit32;

    fn read(input: &mut CodedReader<'_>) -> read::Result<u32> {
        input.read_bit32()
    }
    fn write(value: &u32, output: &mut CodedWriter) {
        output.write_bit32(*value);
    }
}

marker! {
    /// A fixed size 64-bit value. This is encoded as 8 little endian bytes.
    Fixed64
}

impl Value for Fixed64 {
    type Inner = u64;
    const WIRE_TYPE: WireType = WireType::Bit64;

    fn read(input: &mut CodedReader<'_>) -> read::Result<u64> {
        input.read_bit64()
    }
    fn write(value: &u64, output: &mut CodedWriter) {
        output.write_bit64(*value);
    }
}

marker! {
    /// A signed, fixed size 32-bit value. This is encoded as 4 little endian bytes.
    Sfixed32
}

impl Value for Sfixed32 {
    type Inner = i32;
    const WIRE_TYPE: WireType = WireType::Bit32;

    fn read(input: &mut CodedReader<'_>) -> read::Result<i32> {
        input.read_bit32().map(|v| v as i32)
    }
    fn write(value: &i32, output: &mut CodedWriter) {
        output.write_bit32(*value as u32);
    }
}

marker! {
    /// A signed, fixed size 64-bit value. This is encoded as 8 little endian bytes.
    Sfixed64
}

impl Value for Sfixed64 {
    type Inner = i64;
    const WIRE_TYPE: WireType = WireType::Bit64;

    fn read(input: &mut CodedReader<'_>) -> read::Result<i64> {
        input.read_bit64().map(|v| v as i64)
    }
    fn write(value: &i64, output: &mut CodedWriter) {
        output.write_bit64(*value as u64);
    }
}

marker! {
    /// A 32-bit floating point value. This is encoded as 4 little endian bytes.
    Float
}

impl Value for Float {
    type Inner = f32;
    const WIRE_TYPE: WireType = WireType::Bit32;

    fn read(input: &mut CodedReader<'_>) -> read::Result<f32> {
        input.read_bit32().map(f32::from_bits)
    }
    fn write(value: &f32, output: &mut CodedWriter) {
        output.write_bit32(value.to_bits());
    }
}

marker! {
    /// A 64-bit floating point value. This is encoded as 8 little endian bytes.
    Double
}

impl Value for Double {
    type Inner = f64;
    const WIRE_TYPE: WireType = WireType::Bit64;

    fn read(input: &mut CodedReader<'_>) -> read::Result<f64> {
        input.read_bit64().map(f64::from_bits)
    }
    fn write(value: &f64, output: &mut CodedWriter) {
        output.write_bit64(value.to_bits());
    }
}

marker! {
    /// A bool value. This is encoded as a varint value
    Bool
}

impl Value for Bool {
    type Inner = bool;
    const WIRE_TYPE: WireType = WireType::Varint;

    fn read(input: &mut CodedReader<'_>) -> read::Result<bool> {
        input.read_varint64().map(|v| v != 0)
    }
    fn write(value: &bool, output: &mut CodedWriter) {
        output.write_varint32(u32::from(*value));
    }
}

marker! {
    /// An enum value. This is encoded as a 32-bit varint value, the same as [`Int32`](enum.Int32.html).
    Enum
}

impl Value for Enum {
    type Inner = i32;
    const WIRE_TYPE: WireType = WireType::Varint;

    fn read(input: &mut CodedReader<'_>) -> read::Result<i32> {
        Int32::read(input)
    }
    fn write(value: &i32, output: &mut CodedWriter) {
        Int32::write(value, output)
    }
}

marker! {
    /// A string value. This is encoded as a length-delimited series of UTF8 bytes.
    String
}

impl Value for String {
    type Inner = alloc::string::String;
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn read(input: &mut CodedReader<'_>) -> read::Result<Self::Inner> {
        input.read_string()
    }
    fn write(value: &Self::Inner, output: &mut CodedWriter) {
        output.write_length_delimited(value.as_bytes());
    }
}

marker! {
    /// A bytes value. This is encoded as a length-delimited series of bytes.
    Bytes
}

impl Value for Bytes {
    type Inner = Vec<u8>;
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn read(input: &mut CodedReader<'_>) -> read::Result<Vec<u8>> {
        input.read_length_delimited().map(<[u8]>::to_vec)
    }
    fn write(value: &Vec<u8>, output: &mut CodedWriter) {
        output.write_length_delimited(value);
    }
}
