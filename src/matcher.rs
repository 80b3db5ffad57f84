//! Conditions deciding whether a request template applies to an entry.

use crate::config::JsonCondition;
use crate::path::{JsonPath, PathError};
use regex::Regex;
use serde_json::Value as JsonValue;

/// Compiled `when` conditions of one request template. All must hold.
pub struct EntryMatcher {
    conditions: Vec<CompiledCondition>,
}

struct CompiledCondition {
    path: JsonPath,
    check: Check,
}

enum Check {
    Equals(JsonValue),
    Contains(String),
    Matches(Regex),
    Exists,
    NotExists,
}

impl EntryMatcher {
    /// Compile conditions from a definition.
    pub fn compile(conditions: &[JsonCondition]) -> Result<Self, MatcherError> {
        let conditions = conditions
            .iter()
            .map(compile_condition)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { conditions })
    }

    /// Check the conditions against an entry document.
    pub fn matches(&self, entry: &JsonValue) -> bool {
        self.conditions
            .iter()
            .all(|condition| check_condition(entry, condition))
    }
}

fn compile_condition(config: &JsonCondition) -> Result<CompiledCondition, MatcherError> {
    let check = if let Some(ref value) = config.equals {
        Check::Equals(value.clone())
    } else if let Some(ref substr) = config.contains {
        Check::Contains(substr.clone())
    } else if let Some(ref pattern) = config.matches {
        Check::Matches(Regex::new(pattern)?)
    } else if config.exists == Some(false) {
        Check::NotExists
    } else {
        Check::Exists
    };

    Ok(CompiledCondition {
        path: JsonPath::parse(&config.path)?,
        check,
    })
}

fn check_condition(entry: &JsonValue, condition: &CompiledCondition) -> bool {
    let value = condition.path.get(entry).filter(|v| !v.is_null());

    match &condition.check {
        // Wufoo sends every field as a string, so compare scalars by text too
        Check::Equals(expected) => value.is_some_and(|v| {
            v == expected || (v.is_string() && !expected.is_string() && text(v) == text(expected))
        }),
        Check::Contains(substr) => value.is_some_and(|v| text(v).contains(substr.as_str())),
        Check::Matches(regex) => value.is_some_and(|v| regex.is_match(&text(v))),
        Check::Exists => value.is_some(),
        Check::NotExists => value.is_none(),
    }
}

fn text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Errors that can occur while compiling conditions.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("Invalid JSON path: {0}")]
    InvalidJsonPath(#[from] PathError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(path: &str) -> JsonCondition {
        JsonCondition {
            path: path.to_string(),
            equals: None,
            contains: None,
            matches: None,
            exists: None,
        }
    }

    #[test]
    fn test_equals() {
        let matcher = EntryMatcher::compile(&[JsonCondition {
            equals: Some(json!("Hardware")),
            ..condition("$.Field4")
        }])
        .unwrap();

        assert!(matcher.matches(&json!({ "Field4": "Hardware" })));
        assert!(!matcher.matches(&json!({ "Field4": "Software" })));
        assert!(!matcher.matches(&json!({})));
    }

    #[test]
    fn test_equals_number_against_form_text() {
        let matcher = EntryMatcher::compile(&[JsonCondition {
            equals: Some(json!(3)),
            ..condition("$.Field7")
        }])
        .unwrap();

        assert!(matcher.matches(&json!({ "Field7": "3" })));
        assert!(matcher.matches(&json!({ "Field7": 3 })));
        assert!(!matcher.matches(&json!({ "Field7": "4" })));
    }

    #[test]
    fn test_contains() {
        let matcher = EntryMatcher::compile(&[JsonCondition {
            contains: Some("printer".to_string()),
            ..condition("$.Field1")
        }])
        .unwrap();

        assert!(matcher.matches(&json!({ "Field1": "The printer is jammed" })));
        assert!(!matcher.matches(&json!({ "Field1": "Wifi is down" })));
    }

    #[test]
    fn test_matches_regex() {
        let matcher = EntryMatcher::compile(&[JsonCondition {
            matches: Some(r"@umd\.edu$".to_string()),
            ..condition("$.Field3")
        }])
        .unwrap();

        assert!(matcher.matches(&json!({ "Field3": "jane@umd.edu" })));
        assert!(!matcher.matches(&json!({ "Field3": "jane@example.edu" })));
    }

    #[test]
    fn test_invalid_regex() {
        let result = EntryMatcher::compile(&[JsonCondition {
            matches: Some("(unclosed".to_string()),
            ..condition("$.Field3")
        }]);
        assert!(matches!(result, Err(MatcherError::InvalidRegex(_))));
    }

    #[test]
    fn test_exists_and_not_exists() {
        let exists = EntryMatcher::compile(&[condition("$.Field9")]).unwrap();
        let absent = EntryMatcher::compile(&[JsonCondition {
            exists: Some(false),
            ..condition("$.Field9")
        }])
        .unwrap();

        let with = json!({ "Field9": "College Park" });
        let null = json!({ "Field9": null });
        assert!(exists.matches(&with));
        assert!(!absent.matches(&with));
        assert!(!exists.matches(&null));
        assert!(absent.matches(&null));
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let matcher = EntryMatcher::compile(&[
            JsonCondition {
                equals: Some(json!("Hardware")),
                ..condition("$.Field4")
            },
            condition("$.Field9"),
        ])
        .unwrap();

        assert!(matcher.matches(&json!({ "Field4": "Hardware", "Field9": "x" })));
        assert!(!matcher.matches(&json!({ "Field4": "Hardware" })));
    }

    #[test]
    fn test_no_conditions_always_matches() {
        let matcher = EntryMatcher::compile(&[]).unwrap();
        assert!(matcher.matches(&json!({})));
    }
}
