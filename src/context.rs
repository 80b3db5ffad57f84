//! Transform context for variable resolution and interpolation.

use crate::path::{value_text, JsonPath};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::LazyLock;

/// Regex for matching variable expressions like ${...}
static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// Context available while transforming one entry.
#[derive(Debug, Clone)]
pub struct TransformContext {
    /// Form hash the entry was submitted to
    pub form: String,
    /// Entry identifier (Wufoo `EntryId`, or generated)
    pub entry_id: String,
    /// Entry document
    pub entry: JsonValue,
    /// Current item while expanding a `for_each` template
    pub item: Option<JsonValue>,
    /// Submission timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl TransformContext {
    /// Create a new transform context.
    pub fn new(form: impl Into<String>, entry_id: impl Into<String>, entry: JsonValue) -> Self {
        Self {
            form: form.into(),
            entry_id: entry_id.into(),
            entry,
            item: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create a context for an entry, taking the id from its `EntryId` field
    /// or generating one.
    pub fn for_entry(form: impl Into<String>, entry: JsonValue) -> Self {
        let entry_id = entry
            .get("EntryId")
            .and_then(value_text)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        Self::new(form, entry_id, entry)
    }

    /// Pin the submission timestamp.
    pub fn at(mut self, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Replace the entry document.
    pub fn with_entry(mut self, entry: JsonValue) -> Self {
        self.entry = entry;
        self
    }

    /// Set the current `for_each` item.
    pub fn with_item(mut self, item: JsonValue) -> Self {
        self.item = Some(item);
        self
    }

    /// Resolve a variable expression.
    ///
    /// Supports:
    /// - `${entry.Field1}` or `${Field1}` - Entry value
    /// - `${entry.items[0].name}` - Nested entry value
    /// - `${item.name}` - Current `for_each` item (`${item}` for scalars)
    /// - `${form}` - Form hash
    /// - `${entry_id}` - Entry identifier
    /// - `${now}` - Submission timestamp (RFC 3339)
    pub fn resolve(&self, expr: &str) -> Option<String> {
        let expr = expr.trim();
        let (head, rest) = match expr.split_once('.') {
            Some((head, rest)) => (head, rest),
            None => (expr, ""),
        };

        match head {
            "entry" => resolve_json_path(&self.entry, rest),
            "item" => resolve_json_path(self.item.as_ref()?, rest),
            "form" if rest.is_empty() => Some(self.form.clone()),
            "entry_id" if rest.is_empty() => Some(self.entry_id.clone()),
            "now" if rest.is_empty() => Some(self.timestamp.to_rfc3339()),
            _ => resolve_json_path(&self.entry, expr),
        }
    }

    /// Interpolate all ${...} variables in a string. Unresolved variables
    /// become empty.
    pub fn interpolate(&self, template: &str) -> String {
        VAR_REGEX
            .replace_all(template, |caps: &regex::Captures| {
                let var_name = &caps[1];
                self.resolve(var_name).unwrap_or_default()
            })
            .to_string()
    }

    /// Interpolate all ${...} variables, failing on the first one that does
    /// not resolve.
    pub fn interpolate_strict(&self, template: &str) -> Result<String, String> {
        let mut output = String::with_capacity(template.len());
        let mut last = 0;

        for caps in VAR_REGEX.captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let var_name = &caps[1];
            let value = self.resolve(var_name).ok_or_else(|| var_name.to_string())?;
            output.push_str(&template[last..whole.start()]);
            output.push_str(&value);
            last = whole.end();
        }
        output.push_str(&template[last..]);

        Ok(output)
    }
}

fn resolve_json_path(json: &JsonValue, path: &str) -> Option<String> {
    let path = JsonPath::parse(path).ok()?;
    path.get(json).and_then(value_text)
}
