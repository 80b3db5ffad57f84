//! Minimal JSON path expressions used by definitions.
//!
//! Supported forms: `$`, `$.field`, `$.field.subfield`, `$.array[0]`,
//! `$.field[0].subfield`. The leading `$` is optional, so `Field1` and
//! `items.0` are accepted as well.

use serde_json::Value as JsonValue;
use std::fmt;

/// A parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

/// Path syntax or navigation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (path '{path}')")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

impl PathError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl JsonPath {
    /// Parse a path expression.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let body = path.trim();
        let body = body.strip_prefix('$').unwrap_or(body);
        let body = body.strip_prefix('.').unwrap_or(body);

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = body.chars();

        while let Some(c) = chars.next() {
            match c {
                '.' => push_key(&mut segments, &mut current),
                '[' => {
                    push_key(&mut segments, &mut current);
                    let mut idx = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        idx.push(c);
                    }
                    if !closed {
                        return Err(PathError::new(path, "unterminated '['"));
                    }
                    let idx = idx
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| PathError::new(path, format!("invalid index '{}'", idx)))?;
                    segments.push(PathSegment::Index(idx));
                }
                ']' => return Err(PathError::new(path, "unexpected ']'")),
                c => current.push(c),
            }
        }
        push_key(&mut segments, &mut current);

        Ok(Self { segments })
    }

    /// True for `$`.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Borrow the value at this path.
    pub fn get<'a>(&self, json: &'a JsonValue) -> Option<&'a JsonValue> {
        self.segments
            .iter()
            .try_fold(json, |current, segment| match segment {
                PathSegment::Key(key) => match current {
                    JsonValue::Array(_) => key.parse::<usize>().ok().and_then(|i| current.get(i)),
                    _ => current.get(key),
                },
                PathSegment::Index(idx) => current.get(*idx),
            })
    }

    /// Mutably borrow the value at this path.
    pub fn get_mut<'a>(&self, json: &'a mut JsonValue) -> Option<&'a mut JsonValue> {
        let mut current = json;
        for segment in &self.segments {
            current = match segment {
                PathSegment::Key(key) => {
                    if current.is_array() {
                        current.get_mut(key.parse::<usize>().ok()?)?
                    } else {
                        current.get_mut(key)?
                    }
                }
                PathSegment::Index(idx) => current.get_mut(*idx)?,
            };
        }
        Some(current)
    }

    /// Set the value at this path, creating intermediate containers.
    pub fn set(&self, json: &mut JsonValue, value: JsonValue) -> Result<(), PathError> {
        let Some((last, parents)) = self.segments.split_last() else {
            *json = value;
            return Ok(());
        };

        let mut current = json;
        for (i, segment) in parents.iter().enumerate() {
            let next = &self.segments[i + 1];
            current = match segment {
                PathSegment::Key(key) => {
                    let map = current.as_object_mut().ok_or_else(|| {
                        PathError::new(&self.to_string(), format!("'{}' is not inside an object", key))
                    })?;
                    map.entry(key.clone()).or_insert_with(|| match next {
                        PathSegment::Index(_) => JsonValue::Array(vec![]),
                        PathSegment::Key(_) => JsonValue::Object(serde_json::Map::new()),
                    })
                }
                PathSegment::Index(idx) => current.get_mut(*idx).ok_or_else(|| {
                    PathError::new(&self.to_string(), format!("index {} out of bounds", idx))
                })?,
            };
        }

        match last {
            PathSegment::Key(key) => match current {
                JsonValue::Object(map) => {
                    map.insert(key.clone(), value);
                    Ok(())
                }
                _ => Err(PathError::new(
                    &self.to_string(),
                    format!("cannot set key '{}' on non-object", key),
                )),
            },
            PathSegment::Index(idx) => match current {
                // Replace in place or append; never pad
                JsonValue::Array(arr) if *idx < arr.len() => {
                    arr[*idx] = value;
                    Ok(())
                }
                JsonValue::Array(arr) if *idx == arr.len() => {
                    arr.push(value);
                    Ok(())
                }
                JsonValue::Array(arr) => Err(PathError::new(
                    &self.to_string(),
                    format!("index {} out of bounds for array of length {}", idx, arr.len()),
                )),
                _ => Err(PathError::new(
                    &self.to_string(),
                    format!("cannot set index {} on non-array", idx),
                )),
            },
        }
    }

    /// Remove and return the value at this path. Missing paths are a no-op.
    pub fn remove(&self, json: &mut JsonValue) -> Option<JsonValue> {
        let (last, parents) = self.segments.split_last()?;
        let parent = Self {
            segments: parents.to_vec(),
        };
        match (last, parent.get_mut(json)?) {
            (PathSegment::Key(key), JsonValue::Object(map)) => map.remove(key),
            (PathSegment::Index(idx), JsonValue::Array(arr)) if *idx < arr.len() => {
                Some(arr.remove(*idx))
            }
            _ => None,
        }
    }
}

fn push_key(segments: &mut Vec<PathSegment>, current: &mut String) {
    if !current.is_empty() {
        segments.push(PathSegment::Key(std::mem::take(current)));
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Render a scalar JSON value as form text. `null` renders as absent.
pub fn value_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_forms() {
        assert!(JsonPath::parse("$").unwrap().is_root());
        assert_eq!(JsonPath::parse("$.user.name").unwrap().to_string(), "$.user.name");
        assert_eq!(JsonPath::parse("items[0].name").unwrap().to_string(), "$.items[0].name");
        assert_eq!(JsonPath::parse("Field1").unwrap().to_string(), "$.Field1");
    }

    #[test]
    fn test_parse_errors() {
        assert!(JsonPath::parse("$.items[0").is_err());
        assert!(JsonPath::parse("$.items[x]").is_err());
        assert!(JsonPath::parse("$.items]").is_err());
    }

    #[test]
    fn test_get() {
        let json = json!({"user": {"name": "Jane"}, "items": ["a", "b"]});
        let get = |p: &str| JsonPath::parse(p).unwrap().get(&json).cloned();
        assert_eq!(get("$.user.name"), Some(json!("Jane")));
        assert_eq!(get("$.items[1]"), Some(json!("b")));
        assert_eq!(get("items.0"), Some(json!("a")));
        assert_eq!(get("$.missing"), None);
    }

    #[test]
    fn test_set_creates_intermediates() {
        let mut json = json!({});
        JsonPath::parse("$.meta.tags[0]").unwrap().set(&mut json, json!("x")).unwrap();
        JsonPath::parse("$.meta.tags[1]").unwrap().set(&mut json, json!("y")).unwrap();
        JsonPath::parse("$.meta.tags[0]").unwrap().set(&mut json, json!("z")).unwrap();
        assert_eq!(json, json!({"meta": {"tags": ["z", "y"]}}));
    }

    #[test]
    fn test_set_index_past_end_fails() {
        let mut json = json!({"tags": ["a"]});
        for path in ["$.tags[2]", "$.tags[10000000000]", "$.tags[18446744073709551615]"] {
            let err = JsonPath::parse(path)
                .unwrap()
                .set(&mut json, json!("x"))
                .unwrap_err();
            assert!(err.message.contains("out of bounds"), "{path}: {err}");
        }
        assert_eq!(json, json!({"tags": ["a"]}));
    }

    #[test]
    fn test_set_on_scalar_fails() {
        let mut json = json!({"name": "Jane"});
        let err = JsonPath::parse("$.name.first")
            .unwrap()
            .set(&mut json, json!("x"))
            .unwrap_err();
        assert!(err.message.contains("non-object"));
    }

    #[test]
    fn test_remove() {
        let mut json = json!({"a": 1, "b": [1, 2, 3]});
        assert_eq!(JsonPath::parse("$.a").unwrap().remove(&mut json), Some(json!(1)));
        assert_eq!(JsonPath::parse("$.b[1]").unwrap().remove(&mut json), Some(json!(2)));
        assert_eq!(JsonPath::parse("$.c.d").unwrap().remove(&mut json), None);
        assert_eq!(json, json!({"b": [1, 3]}));
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!("x")), Some("x".to_string()));
        assert_eq!(value_text(&json!(42)), Some("42".to_string()));
        assert_eq!(value_text(&json!(null)), None);
    }
}
