//! Values returned by preload hooks.
//!
//! # Responsibilities
//! - Represent every shape a preload may hand to a page
//! - Encode/decode those shapes for the server → client handoff
//! - Degrade unknown object types to an opaque placeholder
//!
//! # Wire format
//! ```text
//! undefined        → {"$undefined": true}
//! null/bool/string → JSON as-is
//! number           → JSON number, or {"$number": "NaN" | "Infinity" | "-Infinity"}
//! array            → JSON array
//! object           → JSON object ({"$object": {...}} when a key starts with `$`)
//! set              → {"$set": [...]}
//! opaque           → {"$opaque": "TypeName", "fields": {...}}
//! ```
//!
//! # Design Decisions
//! - Closed variant: no reflection over arbitrary types
//! - Opaque values keep only their primitive fields, so pages can still
//!   read e.g. `value.bar` after the round trip
//! - Sets keep insertion order and reject duplicates on construction

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// A value produced by a preload hook.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PreloadValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<PreloadValue>),
    Object(BTreeMap<String, PreloadValue>),
    Set(Vec<PreloadValue>),
    /// Placeholder for an object type the serializer does not know.
    Opaque {
        type_name: String,
        fields: BTreeMap<String, PreloadValue>,
    },
}

impl PreloadValue {
    /// Build a set, dropping duplicates while keeping first occurrences.
    pub fn set<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PreloadValue>,
    {
        let mut unique: Vec<PreloadValue> = Vec::new();
        for item in items {
            let item = item.into();
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        PreloadValue::Set(unique)
    }

    /// Build an object from key/value pairs.
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PreloadValue>,
    {
        PreloadValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Opaque fallback for a value of an unrecognised type. Only primitive
    /// fields are kept.
    pub fn opaque<I, K>(type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, PreloadValue)>,
        K: Into<String>,
    {
        PreloadValue::Opaque {
            type_name: type_name.into(),
            fields: fields
                .into_iter()
                .filter(|(_, v)| v.is_primitive())
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }

    /// Degrade any serializable custom type to the opaque fallback, keeping
    /// the primitive fields it serializes to.
    pub fn from_custom<T: Serialize>(value: &T) -> Self {
        let type_name = short_type_name(std::any::type_name::<T>());
        let fields = match serde_json::to_value(value) {
            Ok(Value::Object(map)) => map
                .into_iter()
                .map(|(k, v)| (k, PreloadValue::from_plain_json(v)))
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        PreloadValue::opaque(type_name, fields)
    }

    /// Convert a plain JSON value (no wire tags) into a preload value.
    pub fn from_plain_json(value: Value) -> Self {
        match value {
            Value::Null => PreloadValue::Null,
            Value::Bool(b) => PreloadValue::Bool(b),
            Value::Number(n) => PreloadValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => PreloadValue::String(s),
            Value::Array(items) => {
                PreloadValue::Array(items.into_iter().map(Self::from_plain_json).collect())
            }
            Value::Object(map) => PreloadValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_plain_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            PreloadValue::Undefined
                | PreloadValue::Null
                | PreloadValue::Bool(_)
                | PreloadValue::Number(_)
                | PreloadValue::String(_)
        )
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, PreloadValue::Undefined)
    }

    /// Field lookup on objects and opaque values.
    pub fn get(&self, key: &str) -> Option<&PreloadValue> {
        match self {
            PreloadValue::Object(map) => map.get(key),
            PreloadValue::Opaque { fields, .. } => fields.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PreloadValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PreloadValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PreloadValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PreloadValue]> {
        match self {
            PreloadValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&[PreloadValue]> {
        match self {
            PreloadValue::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Encode to the tagged wire representation.
    pub fn to_json(&self) -> Value {
        match self {
            PreloadValue::Undefined => tagged("$undefined", Value::Bool(true)),
            PreloadValue::Null => Value::Null,
            PreloadValue::Bool(b) => Value::Bool(*b),
            PreloadValue::Number(n) => encode_number(*n),
            PreloadValue::String(s) => Value::String(s.clone()),
            PreloadValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            PreloadValue::Object(map) => {
                let encoded = encode_map(map);
                if map.keys().any(|k| k.starts_with('$')) {
                    tagged("$object", Value::Object(encoded))
                } else {
                    Value::Object(encoded)
                }
            }
            PreloadValue::Set(items) => {
                tagged("$set", Value::Array(items.iter().map(Self::to_json).collect()))
            }
            PreloadValue::Opaque { type_name, fields } => {
                let mut map = Map::new();
                map.insert("$opaque".into(), Value::String(type_name.clone()));
                map.insert("fields".into(), Value::Object(encode_map(fields)));
                Value::Object(map)
            }
        }
    }

    /// Decode from the tagged wire representation.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(items) => PreloadValue::Array(items.into_iter().map(Self::from_json).collect()),
            Value::Object(mut map) => {
                if map.len() == 1 {
                    if map.contains_key("$undefined") {
                        return PreloadValue::Undefined;
                    }
                    if let Some(Value::Array(items)) = map.remove("$set") {
                        return PreloadValue::Set(items.into_iter().map(Self::from_json).collect());
                    }
                    if let Some(Value::Object(inner)) = map.remove("$object") {
                        return PreloadValue::Object(decode_map(inner));
                    }
                    if let Some(Value::String(special)) = map.remove("$number") {
                        return PreloadValue::Number(decode_number(&special));
                    }
                }
                if map.len() == 2 && map.contains_key("$opaque") {
                    if let (Some(Value::String(type_name)), Some(Value::Object(fields))) =
                        (map.remove("$opaque"), map.remove("fields"))
                    {
                        return PreloadValue::Opaque {
                            type_name,
                            fields: decode_map(fields),
                        };
                    }
                }
                PreloadValue::Object(decode_map(map))
            }
            other => Self::from_plain_json(other),
        }
    }
}

fn tagged(tag: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(tag.to_string(), value);
    Value::Object(map)
}

fn encode_map(map: &BTreeMap<String, PreloadValue>) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

fn decode_map(map: Map<String, Value>) -> BTreeMap<String, PreloadValue> {
    map.into_iter()
        .map(|(k, v)| (k, PreloadValue::from_json(v)))
        .collect()
}

fn encode_number(n: f64) -> Value {
    if n.is_nan() {
        tagged("$number", Value::String("NaN".into()))
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        tagged("$number", Value::String(text.into()))
    } else if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn decode_number(text: &str) -> f64 {
    match text {
        "Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => f64::NAN,
    }
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

impl Serialize for PreloadValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PreloadValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(PreloadValue::from_json)
    }
}

/// Renders the way a template would interpolate the value.
impl fmt::Display for PreloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreloadValue::Undefined => f.write_str("undefined"),
            PreloadValue::Null => f.write_str("null"),
            PreloadValue::Bool(b) => write!(f, "{}", b),
            PreloadValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            PreloadValue::String(s) => f.write_str(s),
            PreloadValue::Array(items) | PreloadValue::Set(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(","))
            }
            PreloadValue::Object(_) => f.write_str("[object Object]"),
            PreloadValue::Opaque { type_name, .. } => write!(f, "[object {}]", type_name),
        }
    }
}

impl From<bool> for PreloadValue {
    fn from(value: bool) -> Self {
        PreloadValue::Bool(value)
    }
}

impl From<f64> for PreloadValue {
    fn from(value: f64) -> Self {
        PreloadValue::Number(value)
    }
}

impl From<i64> for PreloadValue {
    fn from(value: i64) -> Self {
        PreloadValue::Number(value as f64)
    }
}

impl From<i32> for PreloadValue {
    fn from(value: i32) -> Self {
        PreloadValue::Number(f64::from(value))
    }
}

impl From<u32> for PreloadValue {
    fn from(value: u32) -> Self {
        PreloadValue::Number(f64::from(value))
    }
}

impl From<&str> for PreloadValue {
    fn from(value: &str) -> Self {
        PreloadValue::String(value.to_string())
    }
}

impl From<String> for PreloadValue {
    fn from(value: String) -> Self {
        PreloadValue::String(value)
    }
}

impl<T: Into<PreloadValue>> From<Option<T>> for PreloadValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PreloadValue::Null)
    }
}

impl<T: Into<PreloadValue>> From<Vec<T>> for PreloadValue {
    fn from(value: Vec<T>) -> Self {
        PreloadValue::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PreloadValue>> From<BTreeSet<T>> for PreloadValue {
    fn from(value: BTreeSet<T>) -> Self {
        PreloadValue::set(value)
    }
}

impl<T: Into<PreloadValue>, S> From<HashSet<T, S>> for PreloadValue {
    fn from(value: HashSet<T, S>) -> Self {
        PreloadValue::set(value)
    }
}

impl<V: Into<PreloadValue>> From<BTreeMap<String, V>> for PreloadValue {
    fn from(value: BTreeMap<String, V>) -> Self {
        PreloadValue::object(value)
    }
}

impl<V: Into<PreloadValue>, S> From<HashMap<String, V, S>> for PreloadValue {
    fn from(value: HashMap<String, V, S>) -> Self {
        PreloadValue::object(value)
    }
}

impl From<Value> for PreloadValue {
    fn from(value: Value) -> Self {
        PreloadValue::from_plain_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize as _;

    fn round_trip(value: &PreloadValue) -> PreloadValue {
        let text = serde_json::to_string(value).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_set_survives_round_trip() {
        let set = PreloadValue::set(["x", "y", "x"]);
        assert_eq!(set.as_set().unwrap().len(), 2);

        let decoded = round_trip(&set);
        assert_eq!(decoded, set);
        assert!(decoded.as_set().unwrap().contains(&PreloadValue::from("y")));
    }

    #[test]
    fn test_undefined_is_distinct_from_null() {
        let value = PreloadValue::object([
            ("a", PreloadValue::Undefined),
            ("b", PreloadValue::Null),
        ]);
        let decoded = round_trip(&value);
        assert!(decoded.get("a").unwrap().is_undefined());
        assert_eq!(decoded.get("b"), Some(&PreloadValue::Null));
    }

    #[test]
    fn test_dollar_keys_are_escaped() {
        let value = PreloadValue::object([("$set", PreloadValue::from(1))]);
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn test_special_numbers() {
        let value = PreloadValue::Array(vec![
            PreloadValue::Number(f64::INFINITY),
            PreloadValue::Number(1.5),
            PreloadValue::Number(42.0),
        ]);
        let decoded = round_trip(&value);
        assert_eq!(decoded, value);
        assert_eq!(value.to_json()[2], serde_json::json!(42));
    }

    #[derive(serde::Serialize)]
    struct Foo {
        bar: u32,
        nested: Vec<u32>,
    }

    #[test]
    fn test_custom_type_degrades_to_opaque() {
        let value = PreloadValue::from_custom(&Foo { bar: 42, nested: vec![1] });
        match &value {
            PreloadValue::Opaque { type_name, fields } => {
                assert_eq!(type_name, "Foo");
                assert!(fields.get("nested").is_none());
            }
            other => panic!("expected opaque, got {:?}", other),
        }
        assert_eq!(value.get("bar").unwrap().to_string(), "42");

        let decoded = round_trip(&value);
        assert_eq!(decoded, value);
        assert_eq!(decoded.get("bar").unwrap().to_string(), "42");
    }

    #[test]
    fn test_display() {
        assert_eq!(PreloadValue::Bool(true).to_string(), "true");
        assert_eq!(PreloadValue::Number(42.0).to_string(), "42");
        assert_eq!(PreloadValue::Undefined.to_string(), "undefined");
        assert_eq!(PreloadValue::from(vec![1, 2]).to_string(), "1,2");
    }

    #[test]
    fn test_plain_json_has_no_tags() {
        let value = PreloadValue::from(serde_json::json!({"title": "What is Sapper?"}));
        let mut buf = Vec::new();
        value.serialize(&mut serde_json::Serializer::new(&mut buf)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), r#"{"title":"What is Sapper?"}"#);
    }
}
