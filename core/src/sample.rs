//! # Sample Data
//!
//! Deterministic fake values for generated JSON fixtures. Every value is seeded from the
//! annotated struct and the field name, so regenerating yields the same fixtures and the
//! same field shares its value across the record, create and update shapes.

use crate::parser::{ParsedField, ParsedStruct};
use crate::type_mapping::{JsonSchema, JsonType, RustToJsonMapper, TypeMapper};
use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const FIRST_NAMES: &[&str] = &[
    "Diane", "Frank", "Alice", "Marcus", "Ruth", "Kenji", "Amara", "Tomas", "Ingrid", "Samuel",
];
const LAST_NAMES: &[&str] = &[
    "Clark", "Hart", "Moreno", "Okafor", "Lindqvist", "Tanaka", "Novak", "Reyes", "Walsh", "Idris",
];
const WORDS: &[&str] = &[
    "amber", "harbor", "quiet", "lantern", "meadow", "copper", "orbit", "willow", "summit", "ember",
];

/// Length of generated public identifiers.
pub const PUBLIC_ID_LEN: usize = 30;

/// Upper bound of integer samples that fit every integer width from 16 bits up.
const INTEGER_CEILING: u64 = 999;

/// Generator seeded from a string, e.g. `User.public_id`.
fn seeded(seed: &str) -> StdRng {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

fn pick(rng: &mut StdRng, items: &[&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

/// Lowercase letters and digits.
fn alphanumeric(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect()
}

fn hex(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .map(|_| char::from_digit(rng.random_range(0..16), 16).unwrap_or('0'))
        .collect()
}

/// Largest sample for an integer of the given format, so 8 bit fields still decode.
fn integer_ceiling(format: Option<&str>) -> u64 {
    match format {
        Some("int8") => i8::MAX as u64,
        Some("uint8") => u8::MAX as u64,
        _ => INTEGER_CEILING,
    }
}

/// Builds the fixture object for `shape`, seeding values with `seed` (the annotated
/// struct's name). Skipped fields are left out; keys follow serde renames.
pub fn sample_document(seed: &str, shape: &ParsedStruct) -> Value {
    let mut object = Map::new();
    for field in shape.stored_fields() {
        object.insert(field.key().to_string(), sample_field(seed, field));
    }
    Value::Object(object)
}

/// A sample value for one field.
pub fn sample_field(seed: &str, field: &ParsedField) -> Value {
    let mut rng = seeded(&format!("{}.{}", seed, field.name));
    match RustToJsonMapper.map(&field.ty) {
        Ok(schema) => sample_for_schema(&mut rng, &field.name, &schema),
        Err(err) => {
            tracing::debug!(field = %field.name, ty = %field.ty, error = %err, "no sample for type");
            Value::Null
        }
    }
}

fn sample_for_schema(rng: &mut StdRng, field_name: &str, schema: &JsonSchema) -> Value {
    match &schema.type_ {
        JsonType::String => Value::String(sample_string(rng, field_name, schema.format.as_deref())),
        JsonType::Integer => json!(rng.random_range(1..=integer_ceiling(schema.format.as_deref()))),
        JsonType::Number => json!(f64::from(rng.random_range(0..100_000u32)) / 100.0),
        JsonType::Boolean => Value::Bool(rng.random_bool(0.5)),
        JsonType::Array(inner) => Value::Array(vec![sample_for_schema(rng, field_name, inner)]),
        JsonType::Map(inner) => {
            let mut object = Map::new();
            object.insert(pick(rng, WORDS).to_string(), sample_for_schema(rng, field_name, inner));
            Value::Object(object)
        }
        JsonType::Any | JsonType::Ref(_) => Value::Object(Map::new()),
    }
}

fn sample_string(rng: &mut StdRng, field_name: &str, format: Option<&str>) -> String {
    match format {
        Some("char") => char::from(rng.random_range(b'a'..=b'z')).to_string(),
        Some("uuid") => {
            let raw = hex(rng, 32);
            format!(
                "{}-{}-4{}-8{}-{}",
                &raw[0..8],
                &raw[8..12],
                &raw[13..16],
                &raw[17..20],
                &raw[20..32]
            )
        }
        Some("objectid") => hex(rng, 24),
        Some("date-time") => format!(
            "20{:02}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            rng.random_range(18..26),
            rng.random_range(1..=12),
            rng.random_range(1..=28),
            rng.random_range(0..24),
            rng.random_range(0..60),
            rng.random_range(0..60)
        ),
        Some("date") => format!(
            "20{:02}-{:02}-{:02}",
            rng.random_range(18..26),
            rng.random_range(1..=12),
            rng.random_range(1..=28)
        ),
        _ => sample_named_string(rng, field_name),
    }
}

fn sample_named_string(rng: &mut StdRng, field_name: &str) -> String {
    let name = field_name.trim_start_matches("r#").to_lowercase();

    if name == "public_id" || name == "id" || name.ends_with("_id") {
        return alphanumeric(rng, PUBLIC_ID_LEN);
    }
    if name.contains("email") {
        return format!(
            "{}.{}@example.com",
            pick(rng, FIRST_NAMES).to_lowercase(),
            pick(rng, LAST_NAMES).to_lowercase()
        );
    }
    if name.contains("first") {
        return pick(rng, FIRST_NAMES).to_string();
    }
    if name.contains("last") || name.contains("surname") {
        return pick(rng, LAST_NAMES).to_string();
    }
    if name.contains("name") {
        return format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES));
    }
    if name.contains("url") || name.contains("link") {
        return format!("https://example.com/{}", pick(rng, WORDS));
    }
    if name.contains("phone") {
        return format!("+1555{:07}", rng.random_range(0..10_000_000u32));
    }

    format!("{} {}", pick(rng, WORDS), pick(rng, WORDS))
}
