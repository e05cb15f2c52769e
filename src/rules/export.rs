//! Module export shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// What a module exported, resolved once into a tagged shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Export {
    /// Raw data, not yet classified.
    Value(Value),
    /// A registered handler, by name.
    Callable(String),
    /// One explicit rule.
    Rule(RuleObject),
    /// Several rules from one module.
    Rules(Vec<Export>),
}

/// Keys that turn a plain object into a rule object.
const RULE_KEYS: [&str; 3] = ["handler", "response", "url"];

fn is_rule_object(map: &Map<String, Value>) -> bool {
    RULE_KEYS.iter().any(|k| map.contains_key(*k))
}

/// Outcome of classifying raw data.
#[derive(Debug)]
pub enum Shape {
    Bare(Value),
    Rule(Value),
    Rules(Vec<Value>),
}

/// Classify a data export.
///
/// An object is a rule iff it carries `handler`, `response` or `url`; an array
/// is a rule list iff it is non-empty and every element is a rule object.
/// Anything else is served as-is.
pub fn classify(value: Value) -> Shape {
    match value {
        Value::Object(map) if is_rule_object(&map) => Shape::Rule(Value::Object(map)),
        Value::Array(items)
            if !items.is_empty()
                && items
                    .iter()
                    .all(|item| item.as_object().is_some_and(is_rule_object)) =>
        {
            Shape::Rules(items)
        }
        other => Shape::Bare(other),
    }
}

/// An explicit rule as written in a module.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleObject {
    /// Overrides the file-derived template.
    pub url: Option<String>,
    /// Overrides the file-name method suffix.
    pub method: Option<String>,
    pub status: Option<u16>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub delay: Option<u64>,
    pub enabled: Option<bool>,
    /// Registered handler name.
    pub handler: Option<String>,
    /// Static response body. An explicit `null` is an empty body.
    #[serde(default, deserialize_with = "present")]
    pub response: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_shapes() {
        assert!(matches!(classify(json!({"id": 1})), Shape::Bare(_)));
        assert!(matches!(classify(json!([1, 2])), Shape::Bare(_)));
        assert!(matches!(classify(json!([])), Shape::Bare(_)));
        assert!(matches!(classify(json!("text")), Shape::Bare(_)));
        assert!(matches!(classify(json!({"response": 1})), Shape::Rule(_)));
        assert!(matches!(
            classify(json!([{"response": 1}, {"handler": "echo"}])),
            Shape::Rules(items) if items.len() == 2
        ));
        assert!(matches!(
            classify(json!([{"response": 1}, {"id": 2}])),
            Shape::Bare(_)
        ));
    }

    #[test]
    fn test_null_response_is_present() {
        let rule: RuleObject = serde_json::from_value(json!({"response": null})).unwrap();
        assert_eq!(rule.response, Some(Value::Null));
        let rule: RuleObject = serde_json::from_value(json!({"handler": "echo"})).unwrap();
        assert_eq!(rule.response, None);
    }

    #[test]
    fn test_rule_object_rejects_unknown_fields() {
        let parsed: Result<RuleObject, _> =
            serde_json::from_value(json!({"response": 1, "stauts": 404}));
        assert!(parsed.is_err());
    }
}
