//! Rendering request templates into Request elements.

use super::TransformError;
use crate::config::RequestTemplate;
use crate::context::TransformContext;
use crate::document::RequestElement;
use crate::matcher::EntryMatcher;
use crate::path::JsonPath;
use serde_json::Value as JsonValue;

/// Renders one request template against a prepared entry.
pub struct RequestRenderer<'a> {
    template: &'a RequestTemplate,
    index: usize,
}

impl<'a> RequestRenderer<'a> {
    pub fn new(template: &'a RequestTemplate, index: usize) -> Self {
        Self { template, index }
    }

    /// Name for logs.
    pub fn name(&self) -> String {
        self.template
            .name
            .clone()
            .unwrap_or_else(|| format!("requests[{}]", self.index))
    }

    /// Produce zero or more Request elements.
    pub fn render(&self, ctx: &TransformContext) -> Result<Vec<RequestElement>, TransformError> {
        let matcher = EntryMatcher::compile(&self.template.when)?;
        if !matcher.matches(&ctx.entry) {
            return Ok(vec![]);
        }

        let Some(for_each) = &self.template.for_each else {
            return Ok(vec![self.render_one(ctx)?]);
        };

        let path = JsonPath::parse(for_each)?;
        match path.get(&ctx.entry) {
            None | Some(JsonValue::Null) => Ok(vec![]),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| self.render_one(&ctx.clone().with_item(item.clone())))
                .collect(),
            Some(_) => Err(TransformError::NotAnArray {
                template: self.name(),
                path: path.to_string(),
            }),
        }
    }

    fn render_one(&self, ctx: &TransformContext) -> Result<RequestElement, TransformError> {
        let mut element = RequestElement::new();

        for (name, field) in &self.template.fields {
            let rendered = ctx.interpolate_strict(field.template());
            match rendered {
                Ok(value) if field.is_optional() && value.is_empty() => {}
                Ok(value) => element.insert(name.clone(), value),
                Err(_) if field.is_optional() => {}
                Err(variable) => {
                    return Err(TransformError::UnresolvedVariable {
                        template: self.name(),
                        field: name.clone(),
                        variable,
                    })
                }
            }
        }

        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldTemplate, JsonCondition};
    use indexmap::IndexMap;
    use serde_json::json;

    fn template(fields: &[(&str, FieldTemplate)]) -> RequestTemplate {
        RequestTemplate {
            name: Some("ticket".to_string()),
            when: vec![],
            for_each: None,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<IndexMap<_, _>>(),
        }
    }

    fn required(value: &str) -> FieldTemplate {
        FieldTemplate::Required(value.to_string())
    }

    fn optional(value: &str) -> FieldTemplate {
        FieldTemplate::Detailed {
            value: value.to_string(),
            optional: true,
        }
    }

    fn make_context(entry: JsonValue) -> TransformContext {
        TransformContext::new("q1x2y3", "17", entry)
    }

    #[test]
    fn test_render_fields() {
        let template = template(&[
            ("Title", required("${Field1}")),
            ("Category", required("Hardware")),
            ("Description", required("${Field2} (entry ${entry_id})")),
        ]);
        let ctx = make_context(json!({"Field1": "Printer jam", "Field2": "Broken printer"}));

        let elements = RequestRenderer::new(&template, 0).render(&ctx).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].get("Title"), Some("Printer jam"));
        assert_eq!(elements[0].get("Category"), Some("Hardware"));
        assert_eq!(elements[0].get("Description"), Some("Broken printer (entry 17)"));
    }

    #[test]
    fn test_unresolved_required_field_fails() {
        let template = template(&[("Title", required("${Field1}"))]);
        let err = RequestRenderer::new(&template, 0)
            .render(&make_context(json!({})))
            .unwrap_err();
        match err {
            TransformError::UnresolvedVariable {
                template,
                field,
                variable,
            } => {
                assert_eq!(template, "ticket");
                assert_eq!(field, "Title");
                assert_eq!(variable, "Field1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_optional_field_omitted() {
        let template = template(&[
            ("Title", required("${Field1}")),
            ("USMAICampus", optional("${Field9}")),
        ]);

        let elements = RequestRenderer::new(&template, 0)
            .render(&make_context(json!({"Field1": "x", "Field9": ""})))
            .unwrap();
        assert_eq!(elements[0].get("USMAICampus"), None);

        let elements = RequestRenderer::new(&template, 0)
            .render(&make_context(json!({"Field1": "x"})))
            .unwrap();
        assert_eq!(elements[0].get("USMAICampus"), None);

        let elements = RequestRenderer::new(&template, 0)
            .render(&make_context(json!({"Field1": "x", "Field9": "College Park"})))
            .unwrap();
        assert_eq!(elements[0].get("USMAICampus"), Some("College Park"));
    }

    #[test]
    fn test_when_filters_template() {
        let mut template = template(&[("Title", required("${Field1}"))]);
        template.when = vec![JsonCondition {
            path: "$.Field4".to_string(),
            equals: Some(json!("Hardware")),
            contains: None,
            matches: None,
            exists: None,
        }];
        let renderer = RequestRenderer::new(&template, 0);

        let hit = make_context(json!({"Field1": "x", "Field4": "Hardware"}));
        let miss = make_context(json!({"Field1": "x", "Field4": "Software"}));
        assert_eq!(renderer.render(&hit).unwrap().len(), 1);
        assert!(renderer.render(&miss).unwrap().is_empty());
    }

    #[test]
    fn test_for_each() {
        let mut template = template(&[
            ("Title", required("${item.name}")),
            ("Description", required("${Field1}")),
        ]);
        template.for_each = Some("$.devices".to_string());
        let renderer = RequestRenderer::new(&template, 0);

        let ctx = make_context(json!({
            "Field1": "Lab refresh",
            "devices": [{"name": "Printer"}, {"name": "Scanner"}]
        }));
        let elements = renderer.render(&ctx).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].get("Title"), Some("Printer"));
        assert_eq!(elements[1].get("Title"), Some("Scanner"));
        assert_eq!(elements[1].get("Description"), Some("Lab refresh"));

        assert!(renderer.render(&make_context(json!({"Field1": "x"}))).unwrap().is_empty());
    }

    #[test]
    fn test_for_each_requires_array() {
        let mut template = template(&[("Title", required("${item}"))]);
        template.for_each = Some("$.devices".to_string());
        template.name = None;

        let err = RequestRenderer::new(&template, 3)
            .render(&make_context(json!({"devices": "Printer"})))
            .unwrap_err();
        assert!(matches!(
            err,
            TransformError::NotAnArray { ref template, .. } if template == "requests[3]"
        ));
    }
}
