//! Wire primitives: header read/write, size-compacted integers, and
//! length-prefixed strings. Schema-agnostic — nothing in this module knows
//! about field tables, structs, or the value tree.

use byteorder::{BigEndian, ByteOrder};

use crate::cursor::Cursor;
use crate::error::{Error, Result};

/// Longest string payload this codec will write.
pub const MAX_STR_LEN: usize = 100 * 1024 * 1024;

/// On-wire payload discriminator. Distinct from the schema-level
/// `Kind` — a schema `i32` field might still hit the wire as `Char` if its
/// value happens to fit in one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Char = 0,
    Short = 1,
    Int32 = 2,
    Int64 = 3,
    Float = 4,
    Double = 5,
    String1 = 6,
    String4 = 7,
    Map = 8,
    List = 9,
    StructBegin = 10,
    StructEnd = 11,
    ZeroTag = 12,
    SimpleList = 13,
}

impl WireType {
    pub fn from_nibble(n: u8) -> Result<Self> {
        use WireType::*;
        Ok(match n {
            0 => Char,
            1 => Short,
            2 => Int32,
            3 => Int64,
            4 => Float,
            5 => Double,
            6 => String1,
            7 => String4,
            8 => Map,
            9 => List,
            10 => StructBegin,
            11 => StructEnd,
            12 => ZeroTag,
            13 => SimpleList,
            other => {
                return Err(Error::schema_error(format!(
                    "invalid wire type nibble {other}"
                )));
            }
        })
    }

    pub fn name(self) -> &'static str {
        use WireType::*;
        match self {
            Char => "Char",
            Short => "Short",
            Int32 => "Int32",
            Int64 => "Int64",
            Float => "Float",
            Double => "Double",
            String1 => "String1",
            String4 => "String4",
            Map => "Map",
            List => "List",
            StructBegin => "StructBegin",
            StructEnd => "StructEnd",
            ZeroTag => "ZeroTag",
            SimpleList => "SimpleList",
        }
    }
}

/// Result of reading a header: either a real `(tag, wire_type)` pair or the
/// end-of-buffer signal the dispatcher uses to detect "no more fields in
/// this struct" without that being an error.
pub enum HeaderRead {
    Header { tag: u8, wire_type: WireType },
    EndOfBuffer,
}

pub fn write_header(buf: &mut Vec<u8>, tag: u8, wire_type: WireType) {
    if tag < 15 {
        buf.push((tag << 4) | (wire_type as u8));
    } else {
        buf.push(0xF0 | (wire_type as u8));
        buf.push(tag);
    }
}

pub fn read_header(cursor: &mut Cursor) -> Result<HeaderRead> {
    let Some(b0) = cursor.peek_u8() else {
        return Ok(HeaderRead::EndOfBuffer);
    };
    if (b0 & 0xF0) == 0xF0 {
        // Extended header: need byte0 (already peeked) and byte1.
        if cursor.remaining() < 2 {
            return Err(Error::truncated(b0 >> 4, 2, cursor.remaining()));
        }
        let bytes = cursor.read_exact(0, 2)?;
        let wire_type = WireType::from_nibble(bytes[0] & 0x0F)?;
        let tag = bytes[1];
        Ok(HeaderRead::Header { tag, wire_type })
    } else {
        let b = cursor.read_exact(0, 1)?[0];
        let wire_type = WireType::from_nibble(b & 0x0F)?;
        let tag = b >> 4;
        Ok(HeaderRead::Header { tag, wire_type })
    }
}

/// Downcast chain: `write_i64` tries `write_i32` if the value fits in an
/// `i32`, which tries `write_i16`, which tries `write_i8`, which emits
/// `ZeroTag` for 0 or a one-byte `Char` otherwise. All multi-byte payloads
/// are big-endian.
pub fn write_i8(buf: &mut Vec<u8>, tag: u8, n: i8) {
    if n == 0 {
        write_header(buf, tag, WireType::ZeroTag);
    } else {
        write_header(buf, tag, WireType::Char);
        buf.push(n as u8);
    }
}

pub fn write_i16(buf: &mut Vec<u8>, tag: u8, n: i16) {
    if n >= i8::MIN as i16 && n <= i8::MAX as i16 {
        write_i8(buf, tag, n as i8);
    } else {
        write_header(buf, tag, WireType::Short);
        let mut b = [0u8; 2];
        BigEndian::write_i16(&mut b, n);
        buf.extend_from_slice(&b);
    }
}

pub fn write_i32(buf: &mut Vec<u8>, tag: u8, n: i32) {
    if n >= i16::MIN as i32 && n <= i16::MAX as i32 {
        write_i16(buf, tag, n as i16);
    } else {
        write_header(buf, tag, WireType::Int32);
        let mut b = [0u8; 4];
        BigEndian::write_i32(&mut b, n);
        buf.extend_from_slice(&b);
    }
}

pub fn write_i64(buf: &mut Vec<u8>, tag: u8, n: i64) {
    if n >= i32::MIN as i64 && n <= i32::MAX as i64 {
        write_i32(buf, tag, n as i32);
    } else {
        write_header(buf, tag, WireType::Int64);
        let mut b = [0u8; 8];
        BigEndian::write_i64(&mut b, n);
        buf.extend_from_slice(&b);
    }
}

/// Length-prefixed string write with short (1-byte len) and long (4-byte
/// len) forms.
pub fn write_string(buf: &mut Vec<u8>, tag: u8, bytes: &[u8]) -> Result<()> {
    if bytes.len() <= 255 {
        write_header(buf, tag, WireType::String1);
        buf.push(bytes.len() as u8);
    } else if bytes.len() <= MAX_STR_LEN {
        write_header(buf, tag, WireType::String4);
        let mut b = [0u8; 4];
        BigEndian::write_u32(&mut b, bytes.len() as u32);
        buf.extend_from_slice(&b);
    } else {
        return Err(Error::invalid_value(
            tag,
            format!("string length {} exceeds MAX_STR_LEN ({MAX_STR_LEN})", bytes.len()),
        ));
    }
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Widens any of the integer wire types into a signed 64-bit value,
/// sign-extending as it goes. Any non-integer wire type is a
/// `TypeMismatch`.
pub fn read_i64(cursor: &mut Cursor, tag: u8, wire_type: WireType) -> Result<i64> {
    match wire_type {
        WireType::ZeroTag => Ok(0),
        WireType::Char => Ok(cursor.read_exact(tag, 1)?[0] as i8 as i64),
        WireType::Short => {
            let b = cursor.read_exact(tag, 2)?;
            Ok(BigEndian::read_i16(b) as i64)
        }
        WireType::Int32 => {
            let b = cursor.read_exact(tag, 4)?;
            Ok(BigEndian::read_i32(b) as i64)
        }
        WireType::Int64 => {
            let b = cursor.read_exact(tag, 8)?;
            Ok(BigEndian::read_i64(b))
        }
        other => Err(Error::type_mismatch(tag, "integer", other.name())),
    }
}

/// Reads a length-prefixed string payload for either wire form. The header
/// must already have been consumed by the caller.
pub fn read_string_payload(cursor: &mut Cursor, tag: u8, wire_type: WireType) -> Result<Vec<u8>> {
    let len = match wire_type {
        WireType::String1 => cursor.read_exact(tag, 1)?[0] as usize,
        WireType::String4 => {
            let b = cursor.read_exact(tag, 4)?;
            BigEndian::read_u32(b) as usize
        }
        other => return Err(Error::type_mismatch(tag, "string", other.name())),
    };
    Ok(cursor.read_exact(tag, len)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_a_single_byte() {
        let mut buf = Vec::new();
        write_i64(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x0C]); // tag 0, ZeroTag
    }

    #[test]
    fn size_compaction_at_tag_3() {
        let mut buf = Vec::new();
        write_i64(&mut buf, 3, 127);
        assert_eq!(buf, vec![0x30, 0x7F]);

        let mut buf = Vec::new();
        write_i64(&mut buf, 3, 128);
        assert_eq!(buf, vec![0x31, 0x00, 0x80]);

        let mut buf = Vec::new();
        write_i64(&mut buf, 3, 65536);
        assert_eq!(buf, vec![0x32, 0x00, 0x01, 0x00, 0x00]);

        let mut buf = Vec::new();
        write_i64(&mut buf, 3, 1i64 << 40);
        assert_eq!(
            buf,
            vec![0x33, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn extended_tag_header() {
        let mut buf = Vec::new();
        write_header(&mut buf, 15, WireType::Char);
        assert_eq!(buf, vec![0xF0, 0x0F]);
    }

    #[test]
    fn string_length_forms() {
        let mut buf = Vec::new();
        write_string(&mut buf, 0, &[b'x'; 255]).unwrap();
        assert_eq!(&buf[0..2], &[0x06, 0xFF]);

        let mut buf = Vec::new();
        write_string(&mut buf, 0, &[b'x'; 256]).unwrap();
        assert_eq!(&buf[0..5], &[0x07, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn round_trip_integers() {
        for v in [0i64, 1, -1, 127, 128, -128, -129, 65536, -65537, 1i64 << 40] {
            let mut buf = Vec::new();
            write_i64(&mut buf, 5, v);
            let mut cursor = Cursor::new(&buf);
            let HeaderRead::Header { tag, wire_type } = read_header(&mut cursor).unwrap() else {
                panic!("expected header");
            };
            assert_eq!(tag, 5);
            assert_eq!(read_i64(&mut cursor, tag, wire_type).unwrap(), v);
        }
    }

    #[test]
    fn end_of_buffer_is_not_an_error() {
        let buf: Vec<u8> = vec![];
        let mut cursor = Cursor::new(&buf);
        assert!(matches!(
            read_header(&mut cursor).unwrap(),
            HeaderRead::EndOfBuffer
        ));
    }
}
