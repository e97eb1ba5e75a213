//! Scalar codec: for each logical scalar kind, a write path that applies
//! range validation and default-elision, and a read path that applies
//! range validation after widening.
//!
//! Grounded on `write_basic`/`read_basic` dispatch in
//! `libtars.c` (the per-kind `switch` over `LUATARS_*`), reworked as an
//! explicit match over `kind::*` codes instead of a Lua stack.

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::schema::{kind, FieldDescriptor, Schema};
use crate::value::Value;
use crate::wire::{self, HeaderRead, WireType};

/// Header already consumed by the dispatcher: `(wire tag, wire type)`.
/// `None` when the field is missing (the dispatcher never reads a header
/// for a field it already knows is absent).
pub type Header = Option<(u8, WireType)>;

fn int_range(kind: i64) -> (i64, i64) {
    use kind::*;
    match kind {
        BOOL => (0, 1),
        I8 => (i8::MIN as i64, i8::MAX as i64),
        U8 => (0, u8::MAX as i64),
        I16 => (i16::MIN as i64, i16::MAX as i64),
        U16 => (0, u16::MAX as i64),
        I32 => (i32::MIN as i64, i32::MAX as i64),
        U32 => (0, u32::MAX as i64),
        I64 => (i64::MIN, i64::MAX),
        other => unreachable!("int_range called with non-integer kind {other}"),
    }
}

fn validate_int_range(tag: u8, kind: i64, n: i64) -> Result<()> {
    let (lo, hi) = int_range(kind);
    if n < lo || n > hi {
        return Err(Error::range_overflow(tag, crate::schema::kind_name(kind), n as i128));
    }
    Ok(())
}

/// Writes `n` using the downcast chain for `kind`, promoting unsigned
/// kinds to the next-larger signed width first so the chain can still
/// compact a small unsigned value down to `ZeroTag`/`Char` (see
/// SPEC_FULL supplement #1).
fn write_kind_value(buf: &mut Vec<u8>, tag: u8, kind: i64, n: i64) {
    use kind::*;
    match kind {
        BOOL | I8 => wire::write_i8(buf, tag, n as i8),
        I16 => wire::write_i16(buf, tag, n as i16),
        U8 => wire::write_i16(buf, tag, n as i16),
        I32 => wire::write_i32(buf, tag, n as i32),
        U16 => wire::write_i32(buf, tag, n as i32),
        I64 | U32 => wire::write_i64(buf, tag, n),
        other => unreachable!("write_kind_value called with non-integer kind {other}"),
    }
}

fn is_integer_kind(kind: i64) -> bool {
    (kind::BOOL..=kind::I64).contains(&kind)
}

/// Encodes one scalar field. See the module doc for the absent/forced/default
/// decision table.
pub fn encode_scalar(
    buf: &mut Vec<u8>,
    schema: &Schema,
    descr: &FieldDescriptor,
    value: Option<&Value>,
) -> Result<()> {
    let tag = descr.tag;
    match descr.type1 {
        kind::F32 | kind::F64 => {
            if value.is_none() && !descr.forced {
                return Ok(());
            }
            Err(Error::unsupported(tag, "floating point encode is not supported"))
        }
        k if is_integer_kind(k) => encode_int(buf, descr, value),
        kind::STRING => encode_string(buf, schema, descr, value),
        other => Err(Error::schema_error(format!("unknown primary kind {other}"))),
    }
}

fn encode_int(buf: &mut Vec<u8>, descr: &FieldDescriptor, value: Option<&Value>) -> Result<()> {
    let tag = descr.tag;
    let kind = descr.type1;
    let n = match value {
        None => {
            if !descr.forced {
                return Ok(());
            }
            descr.default
        }
        Some(v) => {
            let n = if kind == crate::schema::kind::BOOL {
                match v {
                    Value::Bool(b) => *b as i64,
                    _ => return Err(Error::invalid_value(tag, "expected bool")),
                }
            } else {
                match v {
                    Value::Int(n) => *n,
                    _ => return Err(Error::invalid_value(tag, "expected integer")),
                }
            };
            validate_int_range(tag, kind, n)?;
            if n == descr.default && !descr.forced {
                return Ok(());
            }
            n
        }
    };
    write_kind_value(buf, tag, kind, n);
    Ok(())
}

fn string_default<'a>(schema: &'a Schema, descr: &FieldDescriptor) -> &'a [u8] {
    if descr.default == 0 {
        &[]
    } else {
        schema.string_default(descr.default)
    }
}

fn encode_string(
    buf: &mut Vec<u8>,
    schema: &Schema,
    descr: &FieldDescriptor,
    value: Option<&Value>,
) -> Result<()> {
    let tag = descr.tag;
    let bytes: &[u8] = match value {
        None => {
            if !descr.forced {
                return Ok(());
            }
            string_default(schema, descr)
        }
        Some(Value::String(bytes)) => {
            if bytes.as_slice() == string_default(schema, descr) && !descr.forced {
                return Ok(());
            }
            bytes
        }
        Some(_) => return Err(Error::invalid_value(tag, "expected string")),
    };
    wire::write_string(buf, tag, bytes)
}

/// Decodes one scalar field. `field_missing` and `header` come from the
/// dispatcher's tag-reconciliation logic.
pub fn decode_scalar(
    cursor: &mut Cursor,
    schema: &Schema,
    descr: &FieldDescriptor,
    field_missing: bool,
    header: Header,
) -> Result<Value> {
    match descr.type1 {
        kind::F32 | kind::F64 => Err(Error::unsupported(
            descr.tag,
            "floating point decode is not supported",
        )),
        kind::BOOL => {
            let n = read_int(cursor, descr, field_missing, header)?;
            if !(0..=1).contains(&n) {
                return Err(Error::invalid_value(descr.tag, format!("bool out of range: {n}")));
            }
            Ok(Value::Bool(n != 0))
        }
        k if is_integer_kind(k) => {
            let n = read_int(cursor, descr, field_missing, header)?;
            validate_int_range(descr.tag, k, n)?;
            Ok(Value::Int(n))
        }
        kind::STRING => decode_string(cursor, schema, descr, field_missing, header),
        other => Err(Error::schema_error(format!("unknown primary kind {other}"))),
    }
}

fn read_int(cursor: &mut Cursor, descr: &FieldDescriptor, field_missing: bool, header: Header) -> Result<i64> {
    if field_missing {
        return Ok(descr.default);
    }
    let (tag, wire_type) = header.expect("header required when field is present");
    wire::read_i64(cursor, tag, wire_type)
}

fn decode_string(
    cursor: &mut Cursor,
    schema: &Schema,
    descr: &FieldDescriptor,
    field_missing: bool,
    header: Header,
) -> Result<Value> {
    if field_missing {
        return Ok(Value::String(string_default(schema, descr).to_vec()));
    }
    let (tag, wire_type) = header.expect("header required when field is present");
    match wire_type {
        WireType::String1 | WireType::String4 => {
            Ok(Value::String(wire::read_string_payload(cursor, tag, wire_type)?))
        }
        other => Err(Error::type_mismatch(tag, "string", other.name())),
    }
}

/// Reads one header, translating "no bytes left" into `HeaderRead::EndOfBuffer`
/// the same way the dispatcher's `readHeader` equivalent does, re-exported
/// here since both `basic` callers (none currently) and `dispatch` need it.
pub fn read_header(cursor: &mut Cursor) -> Result<HeaderRead> {
    wire::read_header(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;
    use crate::schema::compile_schema;
    use std::collections::HashMap;

    fn schema_for(type1: i64, forced: bool, default: i64) -> Schema {
        compile_schema(
            vec![FieldDescriptor::new(1, forced, type1, 0, 0, default)],
            vec!["x".into()],
            HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn default_elision_then_forced() {
        let schema = schema_for(kind::I32, false, 0);
        let descr = &schema.fields()[0];
        let mut buf = Vec::new();
        encode_scalar(&mut buf, &schema, descr, Some(&Value::Int(0))).unwrap();
        assert!(buf.is_empty());

        let schema = schema_for(kind::I32, true, 0);
        let descr = &schema.fields()[0];
        let mut buf = Vec::new();
        encode_scalar(&mut buf, &schema, descr, Some(&Value::Int(0))).unwrap();
        assert!(!buf.is_empty());
    }

    #[test]
    fn range_rejection() {
        let schema = schema_for(kind::U8, true, 0);
        let descr = &schema.fields()[0];
        let mut buf = Vec::new();
        let err = encode_scalar(&mut buf, &schema, descr, Some(&Value::Int(256))).unwrap_err();
        assert!(matches!(err, Error::RangeOverflow { .. }));

        let schema = schema_for(kind::I8, true, 0);
        let descr = &schema.fields()[0];
        let mut buf = Vec::new();
        let err = encode_scalar(&mut buf, &schema, descr, Some(&Value::Int(-129))).unwrap_err();
        assert!(matches!(err, Error::RangeOverflow { .. }));
    }

    #[test]
    fn decode_widened_int32_rejects_i16_target() {
        let schema = schema_for(kind::I16, true, 0);
        let descr = &schema.fields()[0];
        let mut buf = Vec::new();
        wire::write_header(&mut buf, 1, WireType::Int32);
        buf.extend_from_slice(&70000i32.to_be_bytes());
        let mut cursor = Cursor::new(&buf);
        let HeaderRead::Header { tag, wire_type } = wire::read_header(&mut cursor).unwrap() else {
            panic!()
        };
        let err = decode_scalar(&mut cursor, &schema, descr, false, Some((tag, wire_type))).unwrap_err();
        assert!(matches!(err, Error::RangeOverflow { .. }));
    }

    #[test]
    fn float_kinds_are_unsupported() {
        let schema = schema_for(kind::F64, true, 0);
        let descr = &schema.fields()[0];
        let mut buf = Vec::new();
        let err = encode_scalar(&mut buf, &schema, descr, Some(&Value::Int(0))).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
