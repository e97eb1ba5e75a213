//! Schema dispatcher: the central walker. Given a schema and a
//! starting struct row, encodes a struct by iterating consecutive rows
//! until the next struct boundary and delegating each row to the matching
//! sub-codec; decodes the same way, reconciling wire tag against schema
//! tag to drive missing-field defaulting.
//!
//! Grounded on a `gobx::decode::Decoder::decodeStruct`-style
//! message-draining loop, reworked around this format's row-table schema
//! instead of gob's self-describing wire types.

use crate::basic;
use crate::container;
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::schema::{is_struct_kind, kind, FieldDescriptor, Schema};
use crate::skip;
use crate::value::{StructValue, Value};
use crate::wire::{self, HeaderRead, WireType};

type Header = Option<(u8, WireType)>;

/// Encodes the struct starting at schema row `row`. `outer_tag` carries
/// the field's own tag in its enclosing frame; ignored when `no_wrap` is
/// set, since the caller supplies that framing itself (the
/// top-level entry points).
pub fn encode_struct(
    buf: &mut Vec<u8>,
    schema: &Schema,
    row: usize,
    value: Option<&Value>,
    outer_tag: u8,
    forced: bool,
    no_wrap: bool,
) -> Result<()> {
    let struct_map = match value {
        None => None,
        Some(Value::Struct(m)) => Some(m),
        Some(_) => return Err(Error::invalid_value(outer_tag, "expected struct")),
    };
    if struct_map.is_none() && !forced {
        return Ok(());
    }
    let span = schema.struct_span(row)?;
    if !no_wrap {
        wire::write_header(buf, outer_tag, WireType::StructBegin);
    }
    let empty = StructValue::new();
    let fields = struct_map.unwrap_or(&empty);
    for field_row in (row + 1)..span.end {
        let descr = schema.field(field_row).expect("row within validated span");
        let name = schema
            .name(field_row)
            .ok_or_else(|| Error::schema_error(format!("row {field_row} has no name")))?;
        encode_field(buf, schema, descr, fields.get(name))?;
    }
    if !no_wrap {
        wire::write_header(buf, 0, WireType::StructEnd);
    }
    Ok(())
}

fn encode_field(buf: &mut Vec<u8>, schema: &Schema, descr: &FieldDescriptor, value: Option<&Value>) -> Result<()> {
    match descr.type1 {
        kind::LIST => container::encode_list(buf, schema, descr.type2, value, descr.tag, descr.forced, false),
        kind::MAP => container::encode_map(
            buf,
            schema,
            descr.type2,
            descr.type3,
            value,
            descr.tag,
            descr.forced,
            false,
        ),
        t if is_struct_kind(t) => {
            let struct_row = schema.struct_start_row(t)?;
            encode_struct(buf, schema, struct_row, value, descr.tag, descr.forced, false)
        }
        _ => basic::encode_scalar(buf, schema, descr, value),
    }
}

/// Decodes the struct starting at schema row `row`. `missing` is the
/// latched state inherited from the caller: when true, every field of
/// this struct (and any nested struct it contains) is materialized from
/// its default without consuming any bytes — this is how a struct-typed
/// field that the wire never sent gets fully defaulted (struct decode step
/// 3a, extended recursively).
pub fn decode_struct(cursor: &mut Cursor, schema: &Schema, row: usize, missing: bool) -> Result<Value> {
    let span = schema.struct_span(row)?;
    let mut result = StructValue::new();
    let mut missing_latched = missing;
    let mut pending: Header = None;

    for field_row in (row + 1)..span.end {
        let descr = schema.field(field_row).expect("row within validated span");
        let name = schema
            .name(field_row)
            .ok_or_else(|| Error::schema_error(format!("row {field_row} has no name")))?
            .to_string();
        let (field_missing, header) = resolve_field(cursor, descr, &mut missing_latched, &mut pending)?;
        let value = decode_field(cursor, schema, descr, field_missing, header)?;
        result.insert(name, value);
    }

    // If this struct was already known missing when we were called, the
    // loop above never touched the cursor (every row short-circuited on
    // `missing_latched`), and there is nothing of ours left on the wire to
    // drain — the cursor sits wherever the enclosing frame left it.
    if !missing {
        // A `StructEnd` left in `pending` was already read off the cursor
        // while reconciling the last row's tag; it terminates this struct,
        // so there is nothing left to skip and skipping further would read
        // into the enclosing frame. Anything else left pending is a real
        // field header whose payload still needs skipping before draining
        // the rest of the unknown tail.
        match pending.take() {
            Some((_, WireType::StructEnd)) => {}
            Some((tag, wire_type)) => {
                skip::skip_body(cursor, tag, wire_type)?;
                skip::skip_fields(cursor, 255)?;
            }
            None => skip::skip_fields(cursor, 255)?,
        }
    }
    Ok(Value::Struct(result))
}

/// Reconciles the wire tag against `descr.tag`.
/// A header read for a field whose tag turns out to belong to a later
/// row is held in `pending` rather than discarded, so the next row's
/// comparison sees it without re-reading the stream. A `StructEnd` header
/// is likewise left in `pending` instead of being dropped: it has already
/// been consumed from the cursor, and the caller needs to see it to avoid
/// reading past the struct's real end.
fn resolve_field(
    cursor: &mut Cursor,
    descr: &FieldDescriptor,
    missing_latched: &mut bool,
    pending: &mut Header,
) -> Result<(bool, Header)> {
    if *missing_latched {
        return Ok((true, None));
    }
    if pending.is_none() {
        *pending = match wire::read_header(cursor)? {
            HeaderRead::EndOfBuffer => None,
            HeaderRead::Header { tag, wire_type } => Some((tag, wire_type)),
        };
        if pending.is_none() {
            *missing_latched = true;
            return Ok((true, None));
        }
    }
    let (tag, wire_type) = pending.expect("checked above");
    if wire_type == WireType::StructEnd {
        *missing_latched = true;
        return Ok((true, None));
    }
    if tag > descr.tag {
        return Ok((true, None));
    }
    if tag < descr.tag {
        return Err(Error::disordered(descr.tag, tag));
    }
    *pending = None;
    Ok((false, Some((tag, wire_type))))
}

fn decode_field(
    cursor: &mut Cursor,
    schema: &Schema,
    descr: &FieldDescriptor,
    field_missing: bool,
    header: Header,
) -> Result<Value> {
    match descr.type1 {
        kind::LIST => container::decode_list(cursor, schema, descr.type2, field_missing, header),
        kind::MAP => container::decode_map(cursor, schema, descr.type2, descr.type3, field_missing, header),
        t if is_struct_kind(t) => {
            let struct_row = schema.struct_start_row(t)?;
            if field_missing {
                decode_struct(cursor, schema, struct_row, true)
            } else {
                let (tag, wire_type) = header.expect("header required when field is present");
                if wire_type != WireType::StructBegin {
                    return Err(Error::type_mismatch(tag, "struct", wire_type.name()));
                }
                decode_struct(cursor, schema, struct_row, false)
            }
        }
        _ => basic::decode_scalar(cursor, schema, descr, field_missing, header),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{compile_schema, FieldDescriptor, TYPE_MAX};
    use std::collections::HashMap;

    // struct A { x: i32 = 0 (optional, tag 1) }
    fn schema_a() -> Schema {
        let fields = vec![
            FieldDescriptor::new(0, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(1, false, kind::I32, 0, 0, 0),
        ];
        compile_schema(fields, vec!["A".into(), "x".into()], HashMap::new()).unwrap()
    }

    // struct B { x: i32 = 0 (forced, tag 1) }
    fn schema_b_forced() -> Schema {
        let fields = vec![
            FieldDescriptor::new(0, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(1, true, kind::I32, 0, 0, 0),
        ];
        compile_schema(fields, vec!["B".into(), "x".into()], HashMap::new()).unwrap()
    }

    fn struct_value(pairs: &[(&str, Value)]) -> Value {
        let mut m = StructValue::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        Value::Struct(m)
    }

    #[test]
    fn e1_default_optional_field_encodes_to_nothing() {
        let schema = schema_a();
        let value = struct_value(&[("x", Value::Int(0))]);
        let mut buf = Vec::new();
        encode_struct(&mut buf, &schema, 0, Some(&value), 0, false, true).unwrap();
        assert!(buf.is_empty());

        let mut cursor = Cursor::new(&buf);
        let decoded = decode_struct(&mut cursor, &schema, 0, false).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn e2_forced_zero_field_round_trips() {
        let schema = schema_b_forced();
        let value = struct_value(&[("x", Value::Int(0))]);
        let mut buf = Vec::new();
        encode_struct(&mut buf, &schema, 0, Some(&value), 0, false, true).unwrap();
        assert_eq!(buf, vec![0x1C]); // tag 1, ZeroTag

        let mut cursor = Cursor::new(&buf);
        let decoded = decode_struct(&mut cursor, &schema, 0, false).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn e5_struct_end_latches_defaults_for_remaining_rows() {
        // struct C { x: i32 default=0, y: i32 default=0 }, both optional.
        let fields = vec![
            FieldDescriptor::new(0, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(1, false, kind::I32, 0, 0, 5),
            FieldDescriptor::new(2, false, kind::I32, 0, 0, 9),
        ];
        let schema = compile_schema(fields, vec!["C".into(), "x".into(), "y".into()], HashMap::new()).unwrap();

        let mut buf = Vec::new();
        wire::write_header(&mut buf, 0, WireType::StructEnd);
        let mut cursor = Cursor::new(&buf);
        let decoded = decode_struct(&mut cursor, &schema, 0, false).unwrap();
        assert_eq!(decoded, struct_value(&[("x", Value::Int(5)), ("y", Value::Int(9))]));
        assert!(cursor.is_empty());
    }

    #[test]
    fn e6_unknown_trailing_field_is_skipped() {
        let schema = schema_a();
        let mut buf = Vec::new();
        wire::write_header(&mut buf, 1, WireType::Char);
        buf.push(3);
        wire::write_header(&mut buf, 9, WireType::String4);
        buf.extend_from_slice(&3u32.to_be_bytes());
        buf.extend_from_slice(b"xyz");

        let mut cursor = Cursor::new(&buf);
        let decoded = decode_struct(&mut cursor, &schema, 0, false).unwrap();
        assert_eq!(decoded, struct_value(&[("x", Value::Int(3))]));
        assert!(cursor.is_empty());
    }

    #[test]
    fn monotonic_tag_violation_is_disordered_field() {
        let fields = vec![
            FieldDescriptor::new(0, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(2, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(3, false, kind::I32, 0, 0, 0),
        ];
        let schema = compile_schema(fields, vec!["D".into(), "x".into(), "y".into()], HashMap::new()).unwrap();

        let mut buf = Vec::new();
        wire::write_header(&mut buf, 3, WireType::Char);
        buf.push(1);
        wire::write_header(&mut buf, 2, WireType::Char);
        buf.push(2);

        let mut cursor = Cursor::new(&buf);
        let err = decode_struct(&mut cursor, &schema, 0, false).unwrap_err();
        assert!(matches!(err, Error::DisorderedField { .. }));
    }

    #[test]
    fn nested_struct_field_round_trips() {
        // struct Outer { inner: Inner (tag 1, forced) }, Inner { v: i32 (tag 1) }
        // row 0: Outer marker, row 1: inner field -> struct id TYPE_MAX+2, row 2: Inner marker, row 3: v
        let inner_id = TYPE_MAX + 2;
        let fields = vec![
            FieldDescriptor::new(0, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(1, true, inner_id, 0, 0, 0),
            FieldDescriptor::new(0, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(1, false, kind::I32, 0, 0, 0),
        ];
        let schema = compile_schema(
            fields,
            vec!["Outer".into(), "inner".into(), "Inner".into(), "v".into()],
            HashMap::new(),
        )
        .unwrap();

        let inner = struct_value(&[("v", Value::Int(42))]);
        let outer = struct_value(&[("inner", inner.clone())]);

        let mut buf = Vec::new();
        encode_struct(&mut buf, &schema, 0, Some(&outer), 0, false, true).unwrap();

        let mut cursor = Cursor::new(&buf);
        let decoded = decode_struct(&mut cursor, &schema, 0, false).unwrap();
        assert_eq!(decoded, outer);
    }

    #[test]
    fn elided_nested_struct_fields_do_not_consume_enclosing_tail() {
        // struct Outer { inner: Inner (tag 1, forced), z: i32 = 0 (tag 2) }
        // struct Inner { a: i32 = 5 (tag 1), b: i32 = 9 (tag 2) }
        let inner_id = TYPE_MAX + 2;
        let fields = vec![
            FieldDescriptor::new(0, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(1, true, inner_id, 0, 0, 0),
            FieldDescriptor::new(2, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(0, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(1, false, kind::I32, 0, 0, 5),
            FieldDescriptor::new(2, false, kind::I32, 0, 0, 9),
        ];
        let schema = compile_schema(
            fields,
            vec!["Outer".into(), "inner".into(), "z".into(), "Inner".into(), "a".into(), "b".into()],
            HashMap::new(),
        )
        .unwrap();

        // a and b both equal their defaults so they're elided; inner's
        // StructBegin/StructEnd frame is therefore empty. z is non-zero so
        // it is written after inner's closing StructEnd.
        let inner = struct_value(&[("a", Value::Int(5)), ("b", Value::Int(9))]);
        let outer = struct_value(&[("inner", inner), ("z", Value::Int(7))]);

        let mut buf = Vec::new();
        encode_struct(&mut buf, &schema, 0, Some(&outer), 0, false, true).unwrap();

        let mut cursor = Cursor::new(&buf);
        let decoded = decode_struct(&mut cursor, &schema, 0, false).unwrap();
        assert_eq!(decoded, outer);
    }

    #[test]
    fn entirely_absent_nested_struct_does_not_misread_next_field() {
        // struct Outer { inner: Inner (tag 1, optional), z: i32 (tag 2) }
        let inner_id = TYPE_MAX + 2;
        let fields = vec![
            FieldDescriptor::new(0, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(1, false, inner_id, 0, 0, 0),
            FieldDescriptor::new(2, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(0, false, kind::I32, 0, 0, 0),
            FieldDescriptor::new(1, false, kind::I32, 0, 0, 0),
        ];
        let schema = compile_schema(
            fields,
            vec!["Outer".into(), "inner".into(), "z".into(), "Inner".into(), "v".into()],
            HashMap::new(),
        )
        .unwrap();

        // Wire never mentions tag 1 (inner) at all, jumps straight to z.
        let mut buf = Vec::new();
        wire::write_header(&mut buf, 2, WireType::Char);
        buf.push(7);

        let mut cursor = Cursor::new(&buf);
        let decoded = decode_struct(&mut cursor, &schema, 0, false).unwrap();
        let inner_default = struct_value(&[("v", Value::Int(0))]);
        assert_eq!(decoded, struct_value(&[("inner", inner_default), ("z", Value::Int(7))]));
        assert!(cursor.is_empty());
    }
}
