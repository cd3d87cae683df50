//! Variable mapping handed to the renderer

use std::collections::HashMap;

use serde_json::Value;

/// A single named variable
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    /// Stringified and escaped on output
    Value(Value),
    /// Caller-marked pre-escaped text, emitted verbatim
    Raw(String),
}

/// Named variables for a render call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    values: HashMap<String, Variable>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value that will be escaped on output
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values
            .insert(name.into(), Variable::Value(value.into()));
    }

    /// Insert pre-escaped text that is emitted as-is
    pub fn insert_raw(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), Variable::Raw(value.into()));
    }

    /// Builder form of [`Variables::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder form of [`Variables::insert_raw`]
    pub fn with_raw(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_raw(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build from escaped and raw maps. Raw entries win on name clashes.
    pub fn from_maps(
        values: serde_json::Map<String, Value>,
        raw: HashMap<String, String>,
    ) -> Self {
        let mut variables = Self::from(values);
        for (name, value) in raw {
            variables.insert_raw(name, value);
        }
        variables
    }
}

impl From<serde_json::Map<String, Value>> for Variables {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl FromIterator<(String, Value)> for Variables {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name, Variable::Value(value)))
                .collect(),
        }
    }
}

/// String form of a JSON value as it appears in rendered output
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        // Arrays and objects use their JSON representation
        _ => value.to_string(),
    }
}

/// Append `input` to `out` with HTML special characters escaped
pub(crate) fn escape_into(out: &mut String, input: &str) {
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(&json!("text")), "text");
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!(1.5)), "1.5");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!(null)), "");
        assert_eq!(stringify(&json!([1, "a"])), r#"[1,"a"]"#);
    }

    #[test]
    fn test_escape() {
        let mut out = String::new();
        escape_into(&mut out, r#"<a href="x">Tom & 'Jerry'</a>"#);
        assert_eq!(
            out,
            "&lt;a href=&#34;x&#34;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_escape_leaves_urls_alone() {
        let mut out = String::new();
        escape_into(&mut out, "https://example.com/verify?id=42");
        assert_eq!(out, "https://example.com/verify?id=42");
    }

    #[test]
    fn test_from_maps_raw_wins() {
        let mut values = serde_json::Map::new();
        values.insert("banner".to_string(), json!("plain"));
        values.insert("name".to_string(), json!("Ada"));
        let raw = HashMap::from([("banner".to_string(), "<b>hi</b>".to_string())]);

        let variables = Variables::from_maps(values, raw);

        assert_eq!(variables.len(), 2);
        assert_eq!(
            variables.get("banner"),
            Some(&Variable::Raw("<b>hi</b>".to_string()))
        );
        assert_eq!(variables.get("name"), Some(&Variable::Value(json!("Ada"))));
    }
}
