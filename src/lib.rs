//! A schema-directed codec for the TARS tagged binary wire format.
//!
//! The eight functions below are the entire surface a host binding needs:
//! [`compile_schema`] turns a flat field table into a read-only [`Schema`],
//! the three `encode_*` / `decode_*` pairs move a [`Value`] to and from
//! bytes for top-level structs, maps, and lists, and [`dump`] renders a
//! schema for diagnostics. Everything else in this crate is an
//! implementation detail reached through these entry points.

mod basic;
mod container;
mod cursor;
mod dispatch;
pub mod error;
mod schema;
mod skip;
pub mod value;
mod wire;

use std::collections::HashMap;

pub use error::{Error, Result};
pub use schema::{kind, FieldDescriptor, Schema};
pub use value::Value;

use cursor::Cursor;

/// Builds a read-only [`Schema`] from a flat field table and its name /
/// string-default side tables.
pub fn compile_schema(
    fields: Vec<FieldDescriptor>,
    names: Vec<String>,
    string_defaults: HashMap<i64, Vec<u8>>,
) -> Result<Schema> {
    schema::compile_schema(fields, names, string_defaults)
}

/// Encodes `value` as the body of the struct identified by `struct_id`,
/// without an outer `StructBegin`/`StructEnd` frame.
pub fn encode_struct(schema: &Schema, struct_id: i64, value: &Value) -> Result<Vec<u8>> {
    let row = schema.struct_start_row(struct_id)?;
    let mut buf = Vec::new();
    dispatch::encode_struct(&mut buf, schema, row, Some(value), 0, true, true)?;
    Ok(buf)
}

/// Encodes `value` as a bare map body: length prefix plus alternating
/// key/value fields, without an outer `Map` header.
pub fn encode_map(schema: &Schema, key_kind: i64, value_kind: i64, value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    container::encode_map(&mut buf, schema, key_kind, value_kind, Some(value), 0, true, true)?;
    Ok(buf)
}

/// Encodes `value` as a bare list body: length prefix plus elements,
/// without an outer `List` header.
pub fn encode_list(schema: &Schema, element_kind: i64, value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    container::encode_list(&mut buf, schema, element_kind, Some(value), 0, true, true)?;
    Ok(buf)
}

/// Decodes `bytes` as the body of the struct identified by `struct_id`.
pub fn decode_struct(schema: &Schema, struct_id: i64, bytes: &[u8]) -> Result<Value> {
    let row = schema.struct_start_row(struct_id)?;
    let mut cursor = Cursor::new(bytes);
    dispatch::decode_struct(&mut cursor, schema, row, false)
}

/// Decodes `bytes` as a bare map body.
pub fn decode_map(schema: &Schema, key_kind: i64, value_kind: i64, bytes: &[u8]) -> Result<Value> {
    let mut cursor = Cursor::new(bytes);
    container::decode_map_body(&mut cursor, schema, key_kind, value_kind)
}

/// Decodes `bytes` as a bare list body.
pub fn decode_list(schema: &Schema, element_kind: i64, bytes: &[u8]) -> Result<Value> {
    let mut cursor = Cursor::new(bytes);
    container::decode_list_body(&mut cursor, schema, element_kind)
}

/// Tab-separated diagnostic dump of every schema row.
pub fn dump(schema: &Schema) -> String {
    schema.dump()
}
