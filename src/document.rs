//! The request document produced by a transform.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered list of Request elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDocument {
    pub requests: Vec<RequestElement>,
}

/// One Request element: named text children in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestElement {
    fields: IndexMap<String, String>,
}

impl RequestDocument {
    pub fn new(requests: Vec<RequestElement>) -> Self {
        Self { requests }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Pretty JSON rendering, used for logs and `--dry-run`.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl RequestElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a child; a repeated name keeps its first position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestElement {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut element = Self::new();
        for (name, value) in iter {
            element.insert(name, value);
        }
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_keeps_order() {
        let element = RequestElement::new()
            .with("Title", "Printer jam")
            .with("Description", "Broken printer")
            .with("Title", "Paper jam");

        let names: Vec<_> = element.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["Title", "Description"]);
        assert_eq!(element.get("Title"), Some("Paper jam"));
        assert_eq!(element.get("Email"), None);
    }

    #[test]
    fn test_document_json_shape() {
        let document = RequestDocument::new(vec![[("Title", "Printer jam")]
            .into_iter()
            .collect()]);

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "requests": [ { "Title": "Printer jam" } ] })
        );
        assert_eq!(document.len(), 1);
        assert!(!document.is_empty());
    }
}
