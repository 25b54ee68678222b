//! `{{placeholder}}` resolution against a flat variable table
//!
//! Placeholders are identifiers made of ASCII letters, `_` and `-`. A
//! placeholder with no matching variable resolves to the empty string.
//! Nested values are resolved leaf by leaf and always returned as a new tree.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([a-zA-Z_\-]*)\}\}").expect("Invalid placeholder pattern")
});

/// Name to scalar mapping used to resolve placeholders.
///
/// Built once when a client is constructed; later sources override earlier
/// ones. The client only ever reads it afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    values: BTreeMap<String, Value>,
}

impl Variables {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or override one variable.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or override one variable in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Merge every top-level entry of a JSON object. Non-objects are ignored.
    pub fn merge_object(&mut self, source: &Value) {
        if let Value::Object(map) = source {
            for (key, value) in map {
                self.values.insert(key.clone(), value.clone());
            }
        }
    }

    /// Merge another table, its entries taking precedence.
    pub fn merge(&mut self, other: &Variables) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Text form of a variable, empty when unknown.
    pub fn text(&self, name: &str) -> String {
        self.values.get(name).map(value_to_text).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Variables::new();
        for (key, value) in iter {
            vars.insert(key, value);
        }
        vars
    }
}

/// Coerce a JSON value to the text substituted into templates.
///
/// Strings are used verbatim, `null` becomes empty and containers are
/// rendered as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Replace every `{{name}}` in `template` with its variable value.
pub fn format_template(template: &str, vars: &Variables) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| vars.text(&caps[1]))
        .into_owned()
}

/// Resolve every string leaf of a nested value.
pub fn template_value(value: &Value, vars: &Variables) -> Value {
    match value {
        Value::String(s) => Value::String(format_template(s, vars)),
        Value::Array(items) => Value::Array(items.iter().map(|v| template_value(v, vars)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), template_value(v, vars)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Resolve every value of a flat string-keyed map.
pub fn template_map(map: &BTreeMap<String, Value>, vars: &Variables) -> BTreeMap<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), template_value(v, vars)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> Variables {
        Variables::new()
            .with("a", "x")
            .with("b", "y")
            .with("page_size", 50)
            .with("api-key", "k-123")
    }

    #[test]
    fn test_format_concatenated_placeholders() {
        assert_eq!(format_template("{{a}}{{b}}", &vars()), "xy");
    }

    #[test]
    fn test_format_unknown_placeholder_is_empty() {
        assert_eq!(format_template("before-{{missing}}-after", &vars()), "before--after");
    }

    #[test]
    fn test_format_without_placeholders_is_identity() {
        let text = "https://api.example.com/items?q=1";
        let once = format_template(text, &vars());
        assert_eq!(once, text);
        assert_eq!(format_template(&once, &vars()), text);
    }

    #[test]
    fn test_format_numbers_and_dashes() {
        assert_eq!(
            format_template("limit={{page_size}}&key={{api-key}}", &vars()),
            "limit=50&key=k-123"
        );
    }

    #[test]
    fn test_format_ignores_non_identifier_braces() {
        assert_eq!(format_template("{{a b}} {{1}}", &vars()), "{{a b}} {{1}}");
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!("s")), "s");
        assert_eq!(value_to_text(&json!(3)), "3");
        assert_eq!(value_to_text(&json!(true)), "true");
        assert_eq!(value_to_text(&Value::Null), "");
        assert_eq!(value_to_text(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_template_value_processes_every_key() {
        let input = json!({
            "first": {"inner": "{{a}}"},
            "second": "{{b}}",
            "third": {"deep": {"deeper": "{{a}}-{{b}}"}},
            "count": 3
        });

        let output = template_value(&input, &vars());

        assert_eq!(
            output,
            json!({
                "first": {"inner": "x"},
                "second": "y",
                "third": {"deep": {"deeper": "x-y"}},
                "count": 3
            })
        );
    }

    #[test]
    fn test_template_value_does_not_mutate_input() {
        let input = json!({"k": ["{{a}}", 1, null]});
        let snapshot = input.clone();

        let output = template_value(&input, &vars());

        assert_eq!(input, snapshot);
        assert_eq!(output, json!({"k": ["x", 1, null]}));
    }

    #[test]
    fn test_template_map() {
        let mut map = BTreeMap::new();
        map.insert("skip".to_string(), json!(10));
        map.insert("q".to_string(), json!("{{a}}"));

        let out = template_map(&map, &vars());
        assert_eq!(out["skip"], json!(10));
        assert_eq!(out["q"], json!("x"));
    }

    #[test]
    fn test_variables_later_sources_override() {
        let mut table = Variables::new().with("token", "old");
        table.merge_object(&json!({"token": "new", "user": "bob"}));
        table.merge(&Variables::new().with("user", "alice"));

        assert_eq!(table.text("token"), "new");
        assert_eq!(table.text("user"), "alice");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_variables_from_iter() {
        let table: Variables = vec![("page", "1"), ("sort", "asc")].into_iter().collect();
        assert_eq!(table.text("page"), "1");
        assert_eq!(table.get("sort"), Some(&json!("asc")));
        assert!(!table.is_empty());
    }
}
