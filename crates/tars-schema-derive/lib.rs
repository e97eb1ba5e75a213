//! Derives a compiled-schema row table from a plain
//! Rust struct, so tests and small host bindings can describe a schema as
//! struct fields with `#[tars(...)]` attributes instead of building a
//! `Vec<FieldDescriptor>` by hand.
//!
//! This does not generate encode/decode code: the codec dispatches on a
//! `Schema` + `Value` tree at runtime (see the `tars` crate's `dispatch`
//! module), and a per-type codec would duplicate that walk. The derive
//! only emits the data the schema compiler would otherwise require the
//! host binding to assemble manually.

use darling::FromAttributes;
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

#[derive(Debug, FromAttributes)]
#[darling(attributes(tars))]
struct TarsFieldArgs {
    tag: u8,
    #[darling(default)]
    forced: bool,
    kind: String,
    #[darling(default)]
    type2: i64,
    #[darling(default)]
    type3: i64,
    #[darling(default)]
    default: i64,
}

fn kind_path(name: &str) -> proc_macro2::TokenStream {
    let ident = match name {
        "bool" => "BOOL",
        "i8" => "I8",
        "u8" => "U8",
        "i16" => "I16",
        "u16" => "U16",
        "i32" => "I32",
        "u32" => "U32",
        "i64" => "I64",
        "f32" => "F32",
        "f64" => "F64",
        "string" => "STRING",
        "map" => "MAP",
        "list" => "LIST",
        other => {
            return syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unknown tars kind \"{other}\" (expected bool/i8/u8/i16/u16/i32/u32/i64/f32/f64/string/map/list)"),
            )
            .to_compile_error();
        }
    };
    let ident = syn::Ident::new(ident, proc_macro2::Span::call_site());
    quote! { ::tars::kind::#ident }
}

#[proc_macro_derive(TarsSchema, attributes(tars))]
pub fn derive_tars_schema(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as DeriveInput);
    let struct_name = &item.ident;

    let Data::Struct(data) = &item.data else {
        return syn::Error::new_spanned(&item, "TarsSchema can only be derived for structs")
            .to_compile_error()
            .into();
    };
    let Fields::Named(fields) = &data.fields else {
        return syn::Error::new_spanned(&item, "TarsSchema requires named fields")
            .to_compile_error()
            .into();
    };

    let mut rows = Vec::new();
    for field in &fields.named {
        let args = match TarsFieldArgs::from_attributes(&field.attrs) {
            Ok(args) => args,
            Err(e) => return TokenStream::from(e.write_errors()),
        };
        let field_ident = field.ident.as_ref().unwrap();
        let field_name = field_ident.to_string();
        let tag = args.tag;
        let forced = args.forced;
        let type1 = kind_path(&args.kind);
        let type2 = args.type2;
        let type3 = args.type3;
        let default = args.default;
        rows.push(quote! {
            (
                ::tars::FieldDescriptor::new(#tag, #forced, #type1, #type2, #type3, #default),
                #field_name.to_string(),
            )
        });
    }

    let expanded = quote! {
        impl #struct_name {
            /// Builds this struct's schema rows: a leading tag-0 marker row
            /// named `struct_name`, followed by one row per `#[tars(...)]`
            /// field, in declaration order.
            pub fn tars_schema_rows(struct_name: &str) -> (Vec<::tars::FieldDescriptor>, Vec<String>) {
                let mut fields = vec![::tars::FieldDescriptor::new(0, false, 0, 0, 0, 0)];
                let mut names = vec![struct_name.to_string()];
                let rows: Vec<(::tars::FieldDescriptor, String)> = vec![#(#rows),*];
                for (descriptor, name) in rows {
                    fields.push(descriptor);
                    names.push(name);
                }
                (fields, names)
            }
        }
    };

    TokenStream::from(expanded)
}
