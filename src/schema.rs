//! The compiled schema: a flat field table plus the name/string-default
//! side tables, produced once by the external schema compiler (out of
//! scope) and consumed read-only by the dispatcher.
//!
//! Layout follows a `gobx::decode::TypeSchema`-style idea of keeping
//! one contiguous table rather than a tree of per-struct objects, though
//! that table was built incrementally off the wire; here it is built
//! once, up front, from data the host binding already has, since the
//! layout alone already makes the dispatcher a tight index walk.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::{Error, Result};

/// Numeric kind codes used in `FieldDescriptor::type1/type2/type3`. Struct
/// kinds are any code `>= TYPE_MAX`; the row they point to is
/// `code - TYPE_MAX`.
pub mod kind {
    pub const BOOL: i64 = 1;
    pub const I8: i64 = 2;
    pub const U8: i64 = 3;
    pub const I16: i64 = 4;
    pub const U16: i64 = 5;
    pub const I32: i64 = 6;
    pub const U32: i64 = 7;
    pub const I64: i64 = 8;
    pub const F32: i64 = 9;
    pub const F64: i64 = 10;
    pub const STRING: i64 = 11;
    pub const MAP: i64 = 12;
    pub const LIST: i64 = 13;
    pub const TYPE_MAX: i64 = 14;
}

pub use kind::TYPE_MAX;

pub fn is_struct_kind(code: i64) -> bool {
    code >= TYPE_MAX
}

pub fn kind_name(code: i64) -> &'static str {
    use kind::*;
    match code {
        BOOL => "bool",
        I8 => "i8",
        U8 => "u8",
        I16 => "i16",
        U16 => "u16",
        I32 => "i32",
        U32 => "u32",
        I64 => "i64",
        F32 => "f32",
        F64 => "f64",
        STRING => "string",
        MAP => "map",
        LIST => "list",
        _ => "struct",
    }
}

/// One row of the compiled field table.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub tag: u8,
    pub forced: bool,
    /// Primary kind: a `kind::*` scalar/container code, or a struct id
    /// (`>= TYPE_MAX`).
    pub type1: i64,
    /// List element kind, or map key kind. Unused (0) for scalars/structs.
    pub type2: i64,
    /// Map value kind. Unused (0) for scalars/lists/structs.
    pub type3: i64,
    /// Bit-pattern default for numeric kinds; a handle into the
    /// string-default table for strings; 0 (unused) otherwise.
    pub default: i64,
}

impl FieldDescriptor {
    pub fn new(tag: u8, forced: bool, type1: i64, type2: i64, type3: i64, default: i64) -> Self {
        Self {
            tag,
            forced,
            type1,
            type2,
            type3,
            default,
        }
    }
}

/// A compiled, read-only schema. Immutable after construction and safe to
/// share across threads for concurrent encode/decode calls.
pub struct Schema {
    fields: Vec<FieldDescriptor>,
    names: Vec<String>,
    string_defaults: HashMap<i64, Vec<u8>>,
}

impl Schema {
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, row: usize) -> Option<&FieldDescriptor> {
        self.fields.get(row)
    }

    pub fn name(&self, row: usize) -> Option<&str> {
        self.names.get(row).map(String::as_str)
    }

    pub fn string_default(&self, handle: i64) -> &[u8] {
        self.string_defaults
            .get(&handle)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolves a struct id (`>= TYPE_MAX`) to the row starting that
    /// struct, validating that the row exists and its `tag == 0`.
    pub fn struct_start_row(&self, struct_id: i64) -> Result<usize> {
        let idx = struct_id - TYPE_MAX;
        if idx < 0 || idx as usize >= self.fields.len() {
            return Err(Error::schema_error(format!(
                "struct id {struct_id} is out of range (schema has {} rows)",
                self.fields.len()
            )));
        }
        let row = idx as usize;
        if self.fields[row].tag != 0 {
            return Err(Error::schema_error(format!(
                "struct id {struct_id} points at row {row} with tag {} (expected 0)",
                self.fields[row].tag
            )));
        }
        Ok(row)
    }

    /// The contiguous span of rows belonging to the struct starting at
    /// `start`: from `start` up to (but not including) the next row whose
    /// `tag == 0`, or the end of the table.
    pub fn struct_span(&self, start: usize) -> Result<Range<usize>> {
        if start >= self.fields.len() || self.fields[start].tag != 0 {
            return Err(Error::schema_error(format!(
                "row {start} is not a valid struct start"
            )));
        }
        let mut end = start + 1;
        while end < self.fields.len() && self.fields[end].tag != 0 {
            end += 1;
        }
        Ok(start..end)
    }

    /// Diagnostic dump: tab-separated `[tag]:name  require|optional  type1  type2  type3`
    /// per row.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (row, field) in self.fields.iter().enumerate() {
            let name = self.name(row).unwrap_or("?");
            out.push_str(&format!(
                "[{}]:{}\t{}\t{}\t{}\t{}\n",
                field.tag,
                name,
                if field.forced { "require" } else { "optional" },
                field.type1,
                field.type2,
                field.type3,
            ));
        }
        out
    }
}

/// Builds a read-only `Schema` from the flat field list and the name/
/// string-default side tables.
///
/// The source this format was distilled from overloads a single keyed
/// container as both the name table (indexed by row) and the interned
/// string-default pool (indexed by row-count-offset handles). This
/// function avoids that handle-arithmetic coupling: `names` and
/// `string_defaults` are separate arguments rather than one combined table
/// the codec would have to pick apart by index range.
pub fn compile_schema(
    fields: Vec<FieldDescriptor>,
    names: Vec<String>,
    string_defaults: HashMap<i64, Vec<u8>>,
) -> Result<Schema> {
    if names.len() != fields.len() {
        return Err(Error::schema_error(format!(
            "name table has {} entries, schema has {} rows",
            names.len(),
            fields.len()
        )));
    }
    if let Some(first) = fields.first() {
        if first.tag != 0 {
            return Err(Error::schema_error(
                "schema must start with a tag-0 row".to_string(),
            ));
        }
    }
    for (type1, type2, type3) in fields.iter().map(|f| (f.type1, f.type2, f.type3)) {
        if type1 == kind::MAP && type2 > kind::STRING {
            return Err(Error::schema_error(format!(
                "map key kind {type2} is not scalar"
            )));
        }
        let _ = type3;
    }
    Ok(Schema {
        fields,
        names,
        string_defaults,
    })
}
