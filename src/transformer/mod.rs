//! Transform engine: entry document in, request document out.

mod json;
mod request;

pub use json::JsonTransformer;
pub use request::RequestRenderer;

use crate::config::TransformDefinition;
use crate::context::TransformContext;
use crate::document::RequestDocument;
use crate::loader::{DefinitionSource, LoadError};
use crate::matcher::MatcherError;
use crate::path::PathError;
use std::sync::Arc;
use tracing::{debug, error};

/// A loaded transform definition bound to its form hash.
#[derive(Debug, Clone)]
pub struct TransformEngine {
    form: String,
    definition: Arc<TransformDefinition>,
}

impl TransformEngine {
    /// Locate and parse the definition for `form`.
    pub fn load(source: &DefinitionSource, form: &str) -> Result<Self, LoadError> {
        let definition = source.load(form)?;
        Ok(Self::new(form, definition))
    }

    /// Wrap an already parsed definition.
    pub fn new(form: impl Into<String>, definition: Arc<TransformDefinition>) -> Self {
        Self {
            form: form.into(),
            definition,
        }
    }

    pub fn form(&self) -> &str {
        &self.form
    }

    pub fn definition(&self) -> &TransformDefinition {
        &self.definition
    }

    /// Transform an entry, logging and swallowing execution errors.
    ///
    /// `None` means the entry must not be dispatched. A document is either
    /// complete or not produced at all.
    pub fn transform(&self, ctx: &TransformContext) -> Option<RequestDocument> {
        match self.try_transform(ctx) {
            Ok(document) => {
                debug!(
                    form = %self.form,
                    entry_id = %ctx.entry_id,
                    requests = document.len(),
                    document = %document.to_pretty_json(),
                    "Built request document"
                );
                Some(document)
            }
            Err(e) => {
                error!(
                    form = %self.form,
                    entry_id = %ctx.entry_id,
                    error = %e,
                    "Transform failed, entry will not be dispatched"
                );
                None
            }
        }
    }

    /// Transform an entry, returning the first execution error.
    pub fn try_transform(&self, ctx: &TransformContext) -> Result<RequestDocument, TransformError> {
        let prepared = JsonTransformer::new(&self.definition.prepare).apply(ctx)?;
        let ctx = ctx.clone().with_entry(prepared);

        let mut requests = Vec::new();
        for (index, template) in self.definition.requests.iter().enumerate() {
            let renderer = RequestRenderer::new(template, index);
            let elements = renderer.render(&ctx)?;
            debug!(
                form = %self.form,
                template = %renderer.name(),
                emitted = elements.len(),
                "Rendered request template"
            );
            requests.extend(elements);
        }

        Ok(RequestDocument::new(requests))
    }
}

/// Errors raised while executing a transform definition.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("JSON path error: {0}")]
    JsonPath(#[from] PathError),

    #[error("Condition error: {0}")]
    Matcher(#[from] MatcherError),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Template '{template}' field '{field}': variable '{variable}' did not resolve")]
    UnresolvedVariable {
        template: String,
        field: String,
        variable: String,
    },

    #[error("Template '{template}': for_each path {path} is not an array")]
    NotAnArray { template: String, path: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEFINITION: &str = r#"
prepare:
  - delete: ["$.HandshakeKey"]
  - rename: { from: "$.Field8", to: "$.campus" }
requests:
  - name: "ticket"
    fields:
      Description: "${Field1}"
      Category: "${Field4}"
      Subcategory: "${Field5}"
      Title: "${Field2}"
      FirstName: "${Field6}"
      LastName: "${Field7}"
      Email: "${Field3}"
      USMAICampus: { value: "${campus}", optional: true }
"#;

    fn engine(yaml: &str) -> TransformEngine {
        TransformEngine::new("q1x2y3", Arc::new(serde_yaml::from_str(yaml).unwrap()))
    }

    fn entry() -> serde_json::Value {
        json!({
            "EntryId": "17",
            "Field1": "Broken printer",
            "Field2": "Printer jam",
            "Field3": "jane@example.edu",
            "Field4": "Hardware",
            "Field5": "Printer",
            "Field6": "Jane",
            "Field7": "Doe",
            "HandshakeKey": "secret"
        })
    }

    #[test]
    fn test_transform_builds_request() {
        let engine = engine(DEFINITION);
        let ctx = TransformContext::for_entry("q1x2y3", entry());

        let document = engine.transform(&ctx).unwrap();
        assert_eq!(document.len(), 1);
        let request = &document.requests[0];
        assert_eq!(request.get("Description"), Some("Broken printer"));
        assert_eq!(request.get("Email"), Some("jane@example.edu"));
        assert_eq!(request.get("USMAICampus"), None);
        assert_eq!(request.len(), 7);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let engine = engine(DEFINITION);
        let mut entry = entry();
        entry["Field8"] = json!("College Park");
        let ctx = TransformContext::for_entry("q1x2y3", entry);

        let first = serde_json::to_vec(&engine.transform(&ctx).unwrap()).unwrap();
        let second = serde_json::to_vec(&engine.transform(&ctx).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_transform_does_not_mutate_entry() {
        let engine = engine(DEFINITION);
        let ctx = TransformContext::for_entry("q1x2y3", entry());
        engine.transform(&ctx).unwrap();
        assert_eq!(ctx.entry["HandshakeKey"], "secret");
    }

    #[test]
    fn test_transform_failure_is_absent() {
        let engine = engine(DEFINITION);
        let mut entry = entry();
        entry.as_object_mut().unwrap().remove("Field1");
        let ctx = TransformContext::for_entry("q1x2y3", entry);

        assert!(engine.transform(&ctx).is_none());
        assert!(matches!(
            engine.try_transform(&ctx),
            Err(TransformError::UnresolvedVariable { .. })
        ));
    }

    #[test]
    fn test_no_partial_documents() {
        let engine = engine(
            r#"
requests:
  - fields: { Title: "first" }
  - for_each: "$.Field1"
    fields: { Title: "${item}" }
"#,
        );
        let ctx = TransformContext::for_entry("q1x2y3", entry());
        assert!(engine.transform(&ctx).is_none());
    }

    #[test]
    fn test_malformed_definition_fails_at_apply_time() {
        let engine = engine(
            r#"
requests:
  - when: [{ path: "$.Field4", matches: "(unclosed" }]
    fields: { Title: "x" }
"#,
        );
        let ctx = TransformContext::for_entry("q1x2y3", entry());
        assert!(matches!(
            engine.try_transform(&ctx),
            Err(TransformError::Matcher(_))
        ));
    }

    #[test]
    fn test_out_of_range_set_is_absent() {
        for path in ["$.x[18446744073709551615]", "$.x[10000000000]"] {
            let definition = json!({
                "prepare": [{ "set": { "path": path, "value": "v" } }],
                "requests": [{ "fields": { "Title": "x" } }]
            });
            let engine = TransformEngine::new(
                "q1x2y3",
                Arc::new(serde_json::from_value(definition).unwrap()),
            );
            let mut entry = entry();
            entry["x"] = json!([]);
            let ctx = TransformContext::for_entry("q1x2y3", entry);

            assert!(engine.transform(&ctx).is_none(), "{path}");
            assert!(matches!(
                engine.try_transform(&ctx),
                Err(TransformError::JsonPath(_))
            ));
        }
    }

    #[test]
    fn test_empty_definition_yields_empty_document() {
        let engine = engine("requests: []");
        let ctx = TransformContext::for_entry("q1x2y3", entry());
        assert!(engine.transform(&ctx).unwrap().is_empty());
    }
}
