//! Structured log fields.
//!
//! A [`Fields`] value is the named field mapping attached to a structured log
//! event. Insertion order is kept so text output reads the same way on every
//! request; rendering to JSON produces a single object.

use std::fmt::{self, Write as _};

use serde_json::{Map, Value};

use crate::config::LogFormat;

/// Ordered field name → value mapping for one structured event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, replacing the value of an existing field with the
    /// same name in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Chaining form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Convenience for string-valued fields.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// The fields as a JSON object, keys in insertion order.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self.0.iter().cloned().collect();
        Value::Object(map)
    }

    /// Renders the fields in the given output format.
    pub fn render(&self, format: LogFormat) -> String {
        match format {
            LogFormat::Text => self.to_string(),
            LogFormat::Json => self.to_json().to_string(),
        }
    }
}

/// `key=value` pairs separated by spaces. String values containing
/// whitespace, quotes or `=` are quoted; empty strings render as `""`.
impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{key}=")?;
            match value {
                Value::String(s) if needs_quoting(s) => write!(f, "{s:?}")?,
                Value::String(s) => f.write_str(s)?,
                other => write!(f, "{other}")?,
            }
        }
        Ok(())
    }
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '"' || c == '=')
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_order_and_replaces_duplicates() {
        let mut fields = Fields::new().with("method", "GET").with("status", 200);
        fields.insert("method", "POST");

        assert_eq!(fields.keys().collect::<Vec<_>>(), ["method", "status"]);
        assert_eq!(fields.get_str("method"), Some("POST"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn text_rendering_quotes_only_when_needed() {
        let fields = Fields::new()
            .with("status", 500)
            .with("text_status", "Internal Server Error")
            .with("request", "/broken")
            .with("X-Trace-Id", "");

        assert_eq!(
            fields.render(LogFormat::Text),
            r#"status=500 text_status="Internal Server Error" request=/broken X-Trace-Id="""#,
        );
    }

    #[test]
    fn json_rendering_is_one_object() {
        let fields = Fields::new()
            .with("status", 200)
            .with("measure#web.latency", 5_000_000u64);

        let parsed: Value = serde_json::from_str(&fields.render(LogFormat::Json)).unwrap();
        assert_eq!(parsed["status"], 200);
        assert_eq!(parsed["measure#web.latency"], 5_000_000u64);
        let keys: Vec<_> = parsed.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["status", "measure#web.latency"]);
    }

    #[test]
    fn collects_from_pairs() {
        let fields: Fields = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(fields.to_string(), "a=1 b=2");
    }
}
