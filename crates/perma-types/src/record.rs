use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TypeError, TypeResult};

/// A normalized post payload.
///
/// The shape is platform-specific; the core treats it as an opaque JSON
/// document and only reads a handful of fields through JSON pointers
/// (`/id`, `/user/screen_name`, ...). Serialization is transparent, so the
/// on-disk cache file is exactly the wrapped document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostRecord(Value);

impl PostRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Look up a value by JSON pointer (`/author/handle`).
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.0.pointer(pointer).filter(|v| !v.is_null())
    }

    /// String at `pointer`; numbers are rendered in decimal.
    ///
    /// Platforms disagree on whether ids are strings or numbers, so both are
    /// accepted here.
    pub fn string_at(&self, pointer: &str) -> Option<String> {
        match self.get(pointer)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Like [`Self::string_at`] but a missing field is an error.
    pub fn require_string(&self, pointer: &str) -> TypeResult<String> {
        self.string_at(pointer)
            .ok_or_else(|| TypeError::MissingField(pointer.to_string()))
    }

    /// Array at `pointer`, or an empty slice.
    pub fn array_at(&self, pointer: &str) -> &[Value] {
        self.get(pointer)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Set a top-level field, if the record is an object.
    pub fn set_field(&mut self, key: &str, value: Value) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(key.to_string(), value);
        }
    }

    /// Pretty-printed JSON as written to the cache.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.0)
    }
}

impl From<Value> for PostRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> PostRecord {
        PostRecord::new(json!({
            "id": 42,
            "id_str": "42",
            "author": {"handle": "alice"},
            "text": "hello",
            "quoted": null,
            "replies": ["43", "44"],
        }))
    }

    #[test]
    fn string_at_accepts_numbers_and_strings() {
        let r = sample();
        assert_eq!(r.string_at("/id").as_deref(), Some("42"));
        assert_eq!(r.string_at("/id_str").as_deref(), Some("42"));
        assert_eq!(r.string_at("/author/handle").as_deref(), Some("alice"));
    }

    #[test]
    fn null_reads_as_absent() {
        let r = sample();
        assert!(r.get("/quoted").is_none());
        assert!(r.string_at("/quoted").is_none());
    }

    #[test]
    fn require_string_reports_pointer() {
        let err = sample().require_string("/user/screen_name").unwrap_err();
        assert_eq!(err, TypeError::MissingField("/user/screen_name".into()));
    }

    #[test]
    fn array_at_defaults_empty() {
        let r = sample();
        assert_eq!(r.array_at("/replies").len(), 2);
        assert!(r.array_at("/media").is_empty());
    }

    #[test]
    fn set_field_on_object() {
        let mut r = sample();
        r.set_field("id", json!("42"));
        assert_eq!(r.get("/id"), Some(&json!("42")));
    }

    #[test]
    fn serializes_transparently() {
        let r = sample();
        let text = r.to_pretty_json().unwrap();
        let back: PostRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, r);
        assert!(text.starts_with("{\n  \""));
    }
}
