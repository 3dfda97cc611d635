//! # Value Module
//!
//! Defines the structured value type stored inside named caches. The global
//! store (the one backing `SET`/`GET`/`LPUSH`/...) carries only raw strings
//! and never touches this type; it exists for the named-cache path, where
//! values can be JSON objects, lists, numbers, or booleans and need to
//! support JSON-path and value-template search.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// A recursive value stored in a named cache entry.
///
/// Serializes to/from `serde_json::Value` one-to-one, so persistence and the
/// `CACHEGETALL` wire format can reuse `serde_json` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the nested value reached by following `key` one level down, if
    /// this value is a map and contains it.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(key),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Best-effort string form, used when rendering a value inline in a text
    /// protocol reply (`CACHEGET`, `INSPECT`-style dumps).
    pub fn render(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Map(_) => {
                serde_json::to_string(self).unwrap_or_else(|_| "NULL".to_string())
            }
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Boolean(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for Json {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Json::Null,
            Value::Boolean(b) => Json::Bool(b),
            Value::Integer(i) => Json::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s),
            Value::List(items) => Json::Array(items.into_iter().map(Json::from).collect()),
            Value::Map(map) => {
                Json::Object(map.into_iter().map(|(k, v)| (k, Json::from(v))).collect())
            }
        }
    }
}

/// Parses a value that arrived as a raw protocol token/joined-string. JSON
/// object/array/number/bool literals are decoded structurally; anything else
/// is kept as a plain string, matching how the original command handler lets
/// a value through to the store untouched.
pub fn parse_wire_value(raw: &str) -> Value {
    serde_json::from_str::<Json>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_string_stays_a_string() {
        assert_eq!(parse_wire_value("alice"), Value::String("alice".into()));
    }

    #[test]
    fn json_object_parses_structurally() {
        let v = parse_wire_value(r#"{"theme":"dark","count":3}"#);
        let map = v.as_map().expect("expected a map");
        assert_eq!(map.get("theme"), Some(&Value::String("dark".into())));
        assert_eq!(map.get("count"), Some(&Value::Integer(3)));
    }

    #[test]
    fn json_path_get_one_level() {
        let v = parse_wire_value(r#"{"a":{"b":1}}"#);
        let inner = v.get("a").expect("a present");
        assert_eq!(inner.get("b"), Some(&Value::Integer(1)));
    }
}
