//! Entry preparation: JSON operations applied before templating.

use super::TransformError;
use crate::config::JsonOperation;
use crate::context::TransformContext;
use crate::path::JsonPath;
use serde_json::Value as JsonValue;

/// Applies a definition's `prepare` operations to an entry document.
pub struct JsonTransformer<'a> {
    /// Operations to apply in order
    operations: &'a [JsonOperation],
}

impl<'a> JsonTransformer<'a> {
    pub fn new(operations: &'a [JsonOperation]) -> Self {
        Self { operations }
    }

    /// Apply all operations to a copy of the context's entry.
    pub fn apply(&self, ctx: &TransformContext) -> Result<JsonValue, TransformError> {
        let mut json = ctx.entry.clone();
        for operation in self.operations {
            self.apply_operation(&mut json, operation, ctx)?;
        }
        Ok(json)
    }

    fn apply_operation(
        &self,
        json: &mut JsonValue,
        operation: &JsonOperation,
        ctx: &TransformContext,
    ) -> Result<(), TransformError> {
        match operation {
            JsonOperation::Set { path, value } => {
                JsonPath::parse(path)?.set(json, interpolate_json_value(value, ctx))?;
            }
            JsonOperation::Delete(paths) => {
                for path in paths {
                    JsonPath::parse(path)?.remove(json);
                }
            }
            JsonOperation::Rename { from, to } | JsonOperation::Move { from, to } => {
                let (from, to) = (JsonPath::parse(from)?, JsonPath::parse(to)?);
                if let Some(value) = from.remove(json) {
                    to.set(json, value)?;
                }
            }
            JsonOperation::Copy { from, to } => {
                let (from, to) = (JsonPath::parse(from)?, JsonPath::parse(to)?);
                if let Some(value) = from.get(json).cloned() {
                    to.set(json, value)?;
                }
            }
            JsonOperation::Wrap { path, key } => {
                let path = JsonPath::parse(path)?;
                if let Some(value) = path.get(json).cloned() {
                    path.set(json, serde_json::json!({ key: value }))?;
                }
            }
            JsonOperation::Merge { path, with } => {
                let path = JsonPath::parse(path)?;
                let JsonValue::Object(merge_map) = with else {
                    return Err(TransformError::InvalidOperation(format!(
                        "merge into {} needs an object",
                        path
                    )));
                };
                match path.get_mut(json) {
                    Some(JsonValue::Object(target)) => {
                        for (k, v) in merge_map {
                            target.insert(k.clone(), interpolate_json_value(v, ctx));
                        }
                    }
                    Some(_) => {
                        return Err(TransformError::InvalidOperation(format!(
                            "merge target {} is not an object",
                            path
                        )))
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }
}

/// Interpolate variables in JSON string values.
fn interpolate_json_value(value: &JsonValue, ctx: &TransformContext) -> JsonValue {
    match value {
        JsonValue::String(s) => JsonValue::String(ctx.interpolate(s)),
        JsonValue::Array(arr) => {
            JsonValue::Array(arr.iter().map(|v| interpolate_json_value(v, ctx)).collect())
        }
        JsonValue::Object(obj) => JsonValue::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), interpolate_json_value(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}
