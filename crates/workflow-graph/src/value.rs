// value.rs
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};

/// Valor JSON opaco (parámetros de nodo, `typeData`, `settings`...).
///
/// Las conversiones desde y hacia `serde_json::Value` son totales, por lo
/// que serializar y volver a leer un documento nunca pierde información.
/// Los objetos conservan el orden de inserción de sus claves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum OpaqueValue {
  #[default]
  Null,
  Bool(bool),
  Number(Number),
  String(String),
  Array(Vec<OpaqueValue>),
  Object(IndexMap<String, OpaqueValue>),
}

impl OpaqueValue {
  pub fn is_null(&self) -> bool {
    matches!(self, Self::Null)
  }

  pub fn is_number(&self) -> bool {
    matches!(self, Self::Number(_))
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&[OpaqueValue]> {
    match self {
      Self::Array(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_object(&self) -> Option<&IndexMap<String, OpaqueValue>> {
    match self {
      Self::Object(map) => Some(map),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Number(n) => n.as_f64(),
      _ => None,
    }
  }
}

impl From<JsonValue> for OpaqueValue {
  fn from(value: JsonValue) -> Self {
    match value {
      JsonValue::Null => Self::Null,
      JsonValue::Bool(b) => Self::Bool(b),
      JsonValue::Number(n) => Self::Number(n),
      JsonValue::String(s) => Self::String(s),
      JsonValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
      JsonValue::Object(map) => Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
    }
  }
}

impl From<OpaqueValue> for JsonValue {
  fn from(value: OpaqueValue) -> Self {
    match value {
      OpaqueValue::Null => JsonValue::Null,
      OpaqueValue::Bool(b) => JsonValue::Bool(b),
      OpaqueValue::Number(n) => JsonValue::Number(n),
      OpaqueValue::String(s) => JsonValue::String(s),
      OpaqueValue::Array(items) => JsonValue::Array(items.into_iter().map(JsonValue::from).collect()),
      OpaqueValue::Object(map) => {
        JsonValue::Object(map.into_iter().map(|(k, v)| (k, JsonValue::from(v))).collect::<Map<String, JsonValue>>())
      }
    }
  }
}

impl From<&str> for OpaqueValue {
  fn from(value: &str) -> Self {
    Self::String(value.to_string())
  }
}

impl From<f64> for OpaqueValue {
  fn from(value: f64) -> Self {
    Number::from_f64(value).map(Self::Number).unwrap_or(Self::Null)
  }
}

impl From<i64> for OpaqueValue {
  fn from(value: i64) -> Self {
    Self::Number(Number::from(value))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn object_keys_keep_insertion_order() {
    let raw = json!({"zeta": 1, "alpha": [true, null, "x"], "mid": {"b": 2, "a": 1}});
    let opaque = OpaqueValue::from(raw.clone());
    let keys: Vec<&str> = opaque.as_object().unwrap().keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    assert_eq!(JsonValue::from(opaque), raw);
  }

  #[test]
  fn serde_goes_through_json_value() {
    let opaque: OpaqueValue = serde_json::from_str(r#"{"n": 1.5, "s": "t"}"#).unwrap();
    assert_eq!(opaque.as_object().unwrap()["n"].as_f64(), Some(1.5));
    assert_eq!(serde_json::to_string(&opaque).unwrap(), r#"{"n":1.5,"s":"t"}"#);
  }

  #[test]
  fn non_finite_floats_become_null() {
    assert!(OpaqueValue::from(f64::NAN).is_null());
    assert!(OpaqueValue::from(2.0).is_number());
  }
}
