#![deny(missing_docs)]

//! # Type Mapping
//!
//! Converts Rust field types into a JSON shape description, used to produce fixture data
//! for generated tests. Handles primitives, collections (Vec, maps), smart pointers and
//! optional values (Option).

use crate::error::{AppError, AppResult};
use ra_ap_edition::Edition;
use ra_ap_syntax::ast::{self, HasGenericArgs};
use ra_ap_syntax::{AstNode, SourceFile};
use std::fmt::Display;

/// Represents the simplified JSON types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonType {
    /// A string type.
    String,
    /// An integer type.
    Integer,
    /// A floating point number.
    Number,
    /// A boolean type.
    Boolean,
    /// An array containing items of a specific schema.
    Array(Box<JsonSchema>),
    /// An object keyed by strings with values of a specific schema.
    Map(Box<JsonSchema>),
    /// Arbitrary JSON (`serde_json::Value`, `bson::Document`).
    Any,
    /// A reference to another named type (e.g., a Struct).
    Ref(String),
}

impl Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonType::String => write!(f, "string"),
            JsonType::Integer => write!(f, "integer"),
            JsonType::Number => write!(f, "number"),
            JsonType::Boolean => write!(f, "boolean"),
            JsonType::Array(inner) => write!(f, "array<{}>", inner.type_),
            JsonType::Map(inner) => write!(f, "map<{}>", inner.type_),
            JsonType::Any => write!(f, "any"),
            JsonType::Ref(s) => write!(f, "$ref:{}", s),
        }
    }
}

/// Represents the schema definition for a mapped type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonSchema {
    /// The primary JSON type.
    pub type_: JsonType,
    /// Optional format specifier (e.g., "uuid", "date-time", "uint8").
    pub format: Option<String>,
}

/// Trait for converting Rust type strings to JSON Schemas.
pub trait TypeMapper {
    /// Maps a Rust type string (e.g., `Option<i32>`) to a JSON Schema.
    fn map(&self, rust_type: &str) -> AppResult<JsonSchema>;
}

/// A standard implementation of `TypeMapper`.
pub struct RustToJsonMapper;

impl TypeMapper for RustToJsonMapper {
    fn map(&self, rust_type: &str) -> AppResult<JsonSchema> {
        // Wrap in a type alias so the string parses as a type
        let code = format!("type _Wrapper = {};", rust_type);
        let parse = SourceFile::parse(&code, Edition::Edition2021);
        let file = parse.tree();

        let type_alias = file
            .syntax()
            .descendants()
            .find_map(ast::TypeAlias::cast)
            .ok_or_else(|| {
                AppError::General(format!("Failed to parse type string: {}", rust_type))
            })?;

        let root_type = type_alias
            .ty()
            .ok_or_else(|| AppError::General(format!("Invalid type syntax: {}", rust_type)))?;

        map_ast_type(&root_type)
    }
}

/// Recursively maps an AST Type node to JsonSchema.
fn map_ast_type(ty: &ast::Type) -> AppResult<JsonSchema> {
    match ty {
        ast::Type::PathType(path_type) => {
            let path = path_type
                .path()
                .ok_or_else(|| AppError::General("Empty path".into()))?;
            let segment = path
                .segment()
                .ok_or_else(|| AppError::General("Empty segment".into()))?;
            let name_ref = segment
                .name_ref()
                .ok_or_else(|| AppError::General("No type name".into()))?;
            let name = name_ref.text();

            match name.as_str() {
                "String" | "str" => Ok(simple(JsonType::String)),
                "char" => Ok(formatted(JsonType::String, "char")),
                "bool" => Ok(simple(JsonType::Boolean)),
                "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
                | "u128" | "usize" => {
                    Ok(formatted(JsonType::Integer, integer_format(name.as_str())))
                }
                "f32" | "f64" => Ok(simple(JsonType::Number)),

                "Uuid" => Ok(formatted(JsonType::String, "uuid")),
                "ObjectId" => Ok(formatted(JsonType::String, "objectid")),
                "NaiveDateTime" | "DateTime" => Ok(formatted(JsonType::String, "date-time")),
                "NaiveDate" => Ok(formatted(JsonType::String, "date")),
                "Value" | "Document" | "Bson" => Ok(simple(JsonType::Any)),

                "Option" => map_ast_type(&type_arg(&segment, Some(0))?),
                "Box" | "Arc" | "Rc" | "Cow" => map_ast_type(&type_arg(&segment, None)?),
                "Vec" | "VecDeque" | "HashSet" | "BTreeSet" => {
                    let inner = map_ast_type(&type_arg(&segment, Some(0))?)?;
                    Ok(simple(JsonType::Array(Box::new(inner))))
                }
                "HashMap" | "BTreeMap" | "IndexMap" => {
                    let inner = map_ast_type(&type_arg(&segment, Some(1))?)?;
                    Ok(simple(JsonType::Map(Box::new(inner))))
                }

                other => Ok(simple(JsonType::Ref(other.to_string()))),
            }
        }
        ast::Type::RefType(ref_type) => {
            let inner = ref_type
                .ty()
                .ok_or_else(|| AppError::General("Invalid reference".into()))?;
            map_ast_type(&inner)
        }
        ast::Type::ArrayType(array) => {
            let inner = array
                .ty()
                .ok_or_else(|| AppError::General("Invalid array element".into()))?;
            Ok(simple(JsonType::Array(Box::new(map_ast_type(&inner)?))))
        }
        ast::Type::SliceType(slice) => {
            let inner = slice
                .ty()
                .ok_or_else(|| AppError::General("Invalid slice element".into()))?;
            Ok(simple(JsonType::Array(Box::new(map_ast_type(&inner)?))))
        }
        _ => Err(AppError::General(format!(
            "Unsupported type structure: {}",
            ty.syntax().text()
        ))),
    }
}

/// Returns the generic type argument of a container segment such as `Option<T>` or
/// `HashMap<K, V>`. `None` picks the last type argument (`Cow<'a, T>`).
fn type_arg(segment: &ast::PathSegment, index: Option<usize>) -> AppResult<ast::Type> {
    let generic_args = segment
        .generic_arg_list()
        .ok_or_else(|| AppError::General("Missing generic arguments for container type".into()))?;

    let types: Vec<ast::Type> = generic_args
        .generic_args()
        .filter_map(|arg| match arg {
            ast::GenericArg::TypeArg(type_arg) => type_arg.ty(),
            _ => None,
        })
        .collect();

    let picked = match index {
        Some(i) => types.get(i),
        None => types.last(),
    };

    picked
        .cloned()
        .ok_or_else(|| AppError::General("Generic list too short".into()))
}

/// Width format of an integer primitive: `i8` is `int8`, `u16` is `uint16`.
/// Pointer sized integers count as 64 bit.
fn integer_format(name: &str) -> String {
    let (prefix, bits) = match name.split_at(1) {
        ("u", bits) => ("uint", bits),
        (_, bits) => ("int", bits),
    };
    let bits = if bits == "size" { "64" } else { bits };
    format!("{}{}", prefix, bits)
}

fn simple(t: JsonType) -> JsonSchema {
    JsonSchema {
        type_: t,
        format: None,
    }
}

fn formatted(t: JsonType, fmt: impl Into<String>) -> JsonSchema {
    JsonSchema {
        type_: t,
        format: Some(fmt.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_mapping() {
        let mapper = RustToJsonMapper;

        let cases = vec![
            ("i32", JsonType::Integer),
            ("u64", JsonType::Integer),
            ("f32", JsonType::Number),
            ("bool", JsonType::Boolean),
            ("String", JsonType::String),
            ("serde_json::Value", JsonType::Any),
        ];

        for (input, expected) in cases {
            let res = mapper.map(input).expect(input);
            assert_eq!(res.type_, expected);
        }
    }

    #[test]
    fn test_references() {
        let mapper = RustToJsonMapper;
        let res = mapper.map("&str").expect("should map ref");
        assert_eq!(res.type_, JsonType::String);
    }

    #[test]
    fn test_options_map_inner_type() {
        let mapper = RustToJsonMapper;
        let res = mapper.map("Option<i32>").unwrap();
        assert_eq!(res.type_, JsonType::Integer);
        assert_eq!(res.format.as_deref(), Some("int32"));
    }

    #[test]
    fn test_integer_width_is_kept() {
        let mapper = RustToJsonMapper;
        let cases = [
            ("i8", "int8"),
            ("u8", "uint8"),
            ("i16", "int16"),
            ("u64", "uint64"),
            ("usize", "uint64"),
            ("isize", "int64"),
        ];
        for (input, format) in cases {
            assert_eq!(mapper.map(input).unwrap().format.as_deref(), Some(format), "{}", input);
        }
    }

    #[test]
    fn test_char_is_formatted_string() {
        let res = RustToJsonMapper.map("char").unwrap();
        assert_eq!(res.type_, JsonType::String);
        assert_eq!(res.format.as_deref(), Some("char"));
    }

    #[test]
    fn test_smart_pointers_are_transparent() {
        let mapper = RustToJsonMapper;
        assert_eq!(mapper.map("Box<bool>").unwrap().type_, JsonType::Boolean);
        assert_eq!(
            mapper.map("std::sync::Arc<String>").unwrap().type_,
            JsonType::String
        );
        assert_eq!(
            mapper.map("Cow<'static, str>").unwrap().type_,
            JsonType::String
        );
    }

    #[test]
    fn test_maps_use_value_type() {
        let mapper = RustToJsonMapper;
        let res = mapper.map("HashMap<String, f64>").unwrap();
        match res.type_ {
            JsonType::Map(inner) => assert_eq!(inner.type_, JsonType::Number),
            other => panic!("Expected map, got {}", other),
        }
    }

    #[test]
    fn test_arrays_and_slices() {
        let mapper = RustToJsonMapper;
        let res = mapper.map("[u8; 4]").unwrap();
        assert_eq!(res.type_.to_string(), "array<integer>");
    }

    #[test]
    fn test_nested_complex() {
        let mapper = RustToJsonMapper;
        let res = mapper.map("Option<Vec<Uuid>>").unwrap();

        if let JsonType::Array(inner) = res.type_ {
            assert_eq!(inner.type_, JsonType::String);
            assert_eq!(inner.format.as_deref(), Some("uuid"));
        } else {
            panic!("Expected array");
        }
    }

    #[test]
    fn test_user_types_are_refs() {
        let mapper = RustToJsonMapper;
        let res = mapper.map("crate::api::Address").unwrap();
        assert_eq!(res.type_, JsonType::Ref("Address".into()));
    }

    #[test]
    fn test_tuple_unsupported() {
        let mapper = RustToJsonMapper;
        assert!(mapper.map("(i32, String)").is_err());
    }
}
