//! Field skipper: advances a cursor past unknown fields without decoding
//! them into the value tree. Schema-agnostic — driven entirely by wire
//! types. Grounded on `skipField` in `libtars.c`.

use byteorder::{BigEndian, ByteOrder};

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::wire::{self, HeaderRead, WireType};

pub(crate) fn read_length(cursor: &mut Cursor) -> Result<i64> {
    match wire::read_header(cursor)? {
        HeaderRead::Header { tag, wire_type } => wire::read_i64(cursor, tag, wire_type),
        HeaderRead::EndOfBuffer => Err(Error::truncated(0, 1, 0)),
    }
}

/// Skips up to `n` top-level fields starting at the cursor's current
/// position. Stops early (without error) at a `StructEnd` header or at
/// end-of-buffer. Used both to drain an unknown trailing tail
/// (`n = 255`) and to skip an entire nested struct we don't
/// care about (`n = 256`).
pub fn skip_fields(cursor: &mut Cursor, n: u32) -> Result<()> {
    let mut remaining = n;
    while remaining > 0 {
        let (tag, wire_type) = match wire::read_header(cursor)? {
            HeaderRead::EndOfBuffer => return Ok(()),
            HeaderRead::Header { tag, wire_type } => (tag, wire_type),
        };
        if wire_type == WireType::StructEnd {
            return Ok(());
        }
        skip_body(cursor, tag, wire_type)?;
        remaining -= 1;
    }
    Ok(())
}

/// Skips the payload of one field whose header (`tag`, `wire_type`) has
/// already been consumed from `cursor`. Shared by [`skip_fields`] and by
/// the dispatcher, which sometimes peeks a header for tag reconciliation
/// and then needs to discard that field's body without re-reading it.
pub(crate) fn skip_body(cursor: &mut Cursor, tag: u8, wire_type: WireType) -> Result<()> {
    match wire_type {
        WireType::ZeroTag => Ok(()),
        WireType::Char => cursor.skip(tag, 1),
        WireType::Short => cursor.skip(tag, 2),
        WireType::Int32 => cursor.skip(tag, 4),
        WireType::Int64 => cursor.skip(tag, 8),
        WireType::Float => cursor.skip(tag, 4),
        WireType::Double => cursor.skip(tag, 8),
        WireType::String1 => {
            let len = cursor.read_u8(tag)? as usize;
            cursor.skip(tag, len)
        }
        WireType::String4 => {
            let b = cursor.read_exact(tag, 4)?;
            let len = BigEndian::read_u32(b) as usize;
            cursor.skip(tag, len)
        }
        WireType::Map => {
            let len = read_length(cursor)?;
            for _ in 0..len {
                skip_fields(cursor, 1)?;
                skip_fields(cursor, 1)?;
            }
            Ok(())
        }
        WireType::List => {
            let len = read_length(cursor)?;
            for _ in 0..len {
                skip_fields(cursor, 1)?;
            }
            Ok(())
        }
        WireType::StructBegin => skip_fields(cursor, 256),
        WireType::SimpleList => Err(Error::unsupported(tag, "SimpleList decode/skip is not supported")),
        WireType::StructEnd => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::write_header;

    #[test]
    fn skips_scalar_and_stops_at_struct_end() {
        let mut buf = Vec::new();
        write_header(&mut buf, 1, WireType::Char);
        buf.push(7);
        write_header(&mut buf, 0, WireType::StructEnd);
        buf.push(0xAA); // should not be touched

        let mut cursor = Cursor::new(&buf);
        skip_fields(&mut cursor, 255).unwrap();
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn skips_nested_struct() {
        let mut buf = Vec::new();
        write_header(&mut buf, 5, WireType::StructBegin);
        write_header(&mut buf, 0, WireType::Char);
        buf.push(1);
        write_header(&mut buf, 0, WireType::StructEnd);

        let mut cursor = Cursor::new(&buf);
        skip_fields(&mut cursor, 1).unwrap();
        assert!(cursor.is_empty());
    }

    #[test]
    fn skips_list_and_map() {
        let mut buf = Vec::new();
        write_header(&mut buf, 1, WireType::List);
        write_header(&mut buf, 0, WireType::Char);
        buf.push(2); // length 2
        write_header(&mut buf, 0, WireType::Char);
        buf.push(10);
        write_header(&mut buf, 0, WireType::Char);
        buf.push(20);

        let mut cursor = Cursor::new(&buf);
        skip_fields(&mut cursor, 1).unwrap();
        assert!(cursor.is_empty());
    }

    #[test]
    fn simple_list_is_unsupported() {
        let mut buf = Vec::new();
        write_header(&mut buf, 1, WireType::SimpleList);
        let mut cursor = Cursor::new(&buf);
        let err = skip_fields(&mut cursor, 1).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn truncation_mid_skip_fails() {
        let mut buf = Vec::new();
        write_header(&mut buf, 1, WireType::Int32);
        buf.push(0); // only one of four payload bytes
        let mut cursor = Cursor::new(&buf);
        assert!(skip_fields(&mut cursor, 1).is_err());
    }
}
