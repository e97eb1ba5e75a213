//! List and map codecs. Both containers share the same shape:
//! a size-compacted length at tag 0, then that many inner fields with
//! fixed inner tags (`0` for list elements and map keys, `1` for map
//! values). Struct-kind elements/values wrap in their own
//! `StructBegin`/`StructEnd` frame; scalar elements/values are always
//! `forced` with a zero default, since a container has no per-element
//! default to elide against.
//!
//! Grounded on `encodeList`/`decodeList`/`encodeMap`/`decodeMap` in
//! `libtars.c`, with a forced-empty-list fix resolving an open
//! question: the source's `if (n < 1 || !forced) return 0` guard also
//! skips a forced empty list, which contradicts "forced always emits";
//! this implementation emits the header and a zero length instead.

use crate::basic;
use crate::cursor::Cursor;
use crate::dispatch;
use crate::error::{Error, Result};
use crate::schema::{is_struct_kind, kind, FieldDescriptor, Schema};
use crate::skip::read_length;
use crate::value::Value;
use crate::wire::{self, HeaderRead, WireType};

type Header = Option<(u8, WireType)>;

fn scalar_descriptor(tag: u8, kind_code: i64) -> FieldDescriptor {
    FieldDescriptor::new(tag, true, kind_code, 0, 0, 0)
}

pub fn encode_list(
    buf: &mut Vec<u8>,
    schema: &Schema,
    element_kind: i64,
    value: Option<&Value>,
    outer_tag: u8,
    forced: bool,
    no_wrap: bool,
) -> Result<()> {
    let list = match value {
        None => None,
        Some(Value::List(items)) => Some(items.as_slice()),
        Some(_) => return Err(Error::invalid_value(outer_tag, "expected list")),
    };
    if list.is_none() && !forced {
        return Ok(());
    }
    let items = list.unwrap_or(&[]);
    if items.is_empty() && !forced {
        return Ok(());
    }
    if !no_wrap {
        wire::write_header(buf, outer_tag, WireType::List);
    }
    wire::write_i64(buf, 0, items.len() as i64);
    for item in items {
        encode_element(buf, schema, element_kind, item)?;
    }
    Ok(())
}

fn encode_element(buf: &mut Vec<u8>, schema: &Schema, element_kind: i64, item: &Value) -> Result<()> {
    if is_struct_kind(element_kind) {
        let struct_row = schema.struct_start_row(element_kind)?;
        dispatch::encode_struct(buf, schema, struct_row, Some(item), 0, true, false)
    } else {
        basic::encode_scalar(buf, schema, &scalar_descriptor(0, element_kind), Some(item))
    }
}

pub fn encode_map(
    buf: &mut Vec<u8>,
    schema: &Schema,
    key_kind: i64,
    value_kind: i64,
    value: Option<&Value>,
    outer_tag: u8,
    forced: bool,
    no_wrap: bool,
) -> Result<()> {
    if key_kind > kind::STRING {
        return Err(Error::schema_error(format!("map key kind {key_kind} is not scalar")));
    }
    let map = match value {
        None => None,
        Some(Value::Map(entries)) => Some(entries.as_slice()),
        Some(_) => return Err(Error::invalid_value(outer_tag, "expected map")),
    };
    if map.is_none() && !forced {
        return Ok(());
    }
    let entries = map.unwrap_or(&[]);
    if entries.is_empty() && !forced {
        return Ok(());
    }
    if !no_wrap {
        wire::write_header(buf, outer_tag, WireType::Map);
    }
    wire::write_i64(buf, 0, entries.len() as i64);
    for (k, v) in entries {
        basic::encode_scalar(buf, schema, &scalar_descriptor(0, key_kind), Some(k))?;
        encode_map_value(buf, schema, value_kind, v)?;
    }
    Ok(())
}

fn encode_map_value(buf: &mut Vec<u8>, schema: &Schema, value_kind: i64, value: &Value) -> Result<()> {
    if is_struct_kind(value_kind) {
        let struct_row = schema.struct_start_row(value_kind)?;
        dispatch::encode_struct(buf, schema, struct_row, Some(value), 1, true, false)
    } else {
        basic::encode_scalar(buf, schema, &scalar_descriptor(1, value_kind), Some(value))
    }
}

pub fn decode_list(
    cursor: &mut Cursor,
    schema: &Schema,
    element_kind: i64,
    field_missing: bool,
    header: Header,
) -> Result<Value> {
    if field_missing {
        return Ok(Value::List(Vec::new()));
    }
    let (tag, wire_type) = header.expect("header required when field is present");
    if wire_type != WireType::List {
        return Err(Error::type_mismatch(tag, "list", wire_type.name()));
    }
    decode_list_body(cursor, schema, element_kind)
}

/// Decodes the length-prefixed element sequence with no outer `List`
/// header expected — used both after [`decode_list`] has validated that
/// header and directly by the no-wrap top-level entry point, whose byte
/// stream never carried one.
pub(crate) fn decode_list_body(cursor: &mut Cursor, schema: &Schema, element_kind: i64) -> Result<Value> {
    let length = read_length(cursor)?;
    let mut items = Vec::with_capacity(length.max(0) as usize);
    for _ in 0..length {
        items.push(decode_element(cursor, schema, element_kind)?);
    }
    Ok(Value::List(items))
}

fn next_header(cursor: &mut Cursor) -> Result<(u8, WireType)> {
    match wire::read_header(cursor)? {
        HeaderRead::Header { tag, wire_type } => Ok((tag, wire_type)),
        HeaderRead::EndOfBuffer => Err(Error::truncated(0, 1, 0)),
    }
}

fn decode_element(cursor: &mut Cursor, schema: &Schema, element_kind: i64) -> Result<Value> {
    let (tag, wire_type) = next_header(cursor)?;
    if is_struct_kind(element_kind) {
        if wire_type != WireType::StructBegin {
            return Err(Error::type_mismatch(tag, "struct", wire_type.name()));
        }
        let struct_row = schema.struct_start_row(element_kind)?;
        dispatch::decode_struct(cursor, schema, struct_row, false)
    } else {
        basic::decode_scalar(cursor, schema, &scalar_descriptor(tag, element_kind), false, Some((tag, wire_type)))
    }
}

pub fn decode_map(
    cursor: &mut Cursor,
    schema: &Schema,
    key_kind: i64,
    value_kind: i64,
    field_missing: bool,
    header: Header,
) -> Result<Value> {
    if field_missing {
        return Ok(Value::Map(Vec::new()));
    }
    let (tag, wire_type) = header.expect("header required when field is present");
    if wire_type != WireType::Map {
        return Err(Error::type_mismatch(tag, "map", wire_type.name()));
    }
    decode_map_body(cursor, schema, key_kind, value_kind)
}

/// Decodes the length-prefixed key/value sequence with no outer `Map`
/// header expected — the map counterpart to [`decode_list_body`].
pub(crate) fn decode_map_body(cursor: &mut Cursor, schema: &Schema, key_kind: i64, value_kind: i64) -> Result<Value> {
    if key_kind > kind::STRING {
        return Err(Error::schema_error(format!("map key kind {key_kind} is not scalar")));
    }
    let length = read_length(cursor)?;
    let mut entries = Vec::with_capacity(length.max(0) as usize);
    for _ in 0..length {
        let (ktag, kwire) = next_header(cursor)?;
        let key = basic::decode_scalar(cursor, schema, &scalar_descriptor(ktag, key_kind), false, Some((ktag, kwire)))?;
        let value = decode_map_value(cursor, schema, value_kind)?;
        entries.push((key, value));
    }
    Ok(Value::Map(entries))
}

fn decode_map_value(cursor: &mut Cursor, schema: &Schema, value_kind: i64) -> Result<Value> {
    let (tag, wire_type) = next_header(cursor)?;
    if is_struct_kind(value_kind) {
        if wire_type != WireType::StructBegin {
            return Err(Error::type_mismatch(tag, "struct", wire_type.name()));
        }
        let struct_row = schema.struct_start_row(value_kind)?;
        dispatch::decode_struct(cursor, schema, struct_row, false)
    } else {
        basic::decode_scalar(cursor, schema, &scalar_descriptor(tag, value_kind), false, Some((tag, wire_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn empty_schema() -> Schema {
        crate::schema::compile_schema(Vec::new(), Vec::new(), HashMap::new()).unwrap()
    }

    #[test]
    fn forced_empty_list_still_emits_header() {
        let schema = empty_schema();
        let mut buf = Vec::new();
        encode_list(&mut buf, &schema, kind::I32, Some(&Value::List(vec![])), 1, true, false).unwrap();
        assert!(!buf.is_empty(), "forced empty list must emit a header + zero length");
    }

    #[test]
    fn non_forced_empty_list_emits_nothing() {
        let schema = empty_schema();
        let mut buf = Vec::new();
        encode_list(&mut buf, &schema, kind::I32, Some(&Value::List(vec![])), 1, false, false).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn list_round_trip() {
        let schema = empty_schema();
        let mut buf = Vec::new();
        let items = Value::List(vec![Value::Int(1), Value::Int(256)]);
        encode_list(&mut buf, &schema, kind::I32, Some(&items), 0, false, true).unwrap();

        let mut cursor = Cursor::new(&buf);
        let (tag, wire_type) = next_header(&mut cursor).unwrap();
        let decoded = decode_list(&mut cursor, &schema, kind::I32, false, Some((tag, wire_type))).unwrap();
        assert_eq!(decoded, items);
        assert!(cursor.is_empty());
    }

    #[test]
    fn map_round_trip() {
        let schema = empty_schema();
        let mut buf = Vec::new();
        let map = Value::Map(vec![(Value::string("a"), Value::Int(7))]);
        encode_map(&mut buf, &schema, kind::STRING, kind::I32, Some(&map), 0, false, true).unwrap();

        let mut cursor = Cursor::new(&buf);
        let (tag, wire_type) = next_header(&mut cursor).unwrap();
        let decoded = decode_map(&mut cursor, &schema, kind::STRING, kind::I32, false, Some((tag, wire_type))).unwrap();
        assert_eq!(decoded, map);
        assert!(cursor.is_empty());
    }

    #[test]
    fn non_scalar_map_key_is_schema_error() {
        let schema = empty_schema();
        let mut buf = Vec::new();
        let err = encode_map(&mut buf, &schema, kind::LIST, kind::I32, None, 0, true, false).unwrap_err();
        assert!(matches!(err, Error::SchemaError { .. }));
    }
}
