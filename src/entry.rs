//! Parsing incoming webhook payloads into entry documents.

use crate::config::EntryFormat;
use serde_json::{Map, Value as JsonValue};
use std::str::FromStr;

/// Parse a raw payload into a JSON entry document.
pub fn parse_entry(body: &[u8], format: EntryFormat) -> Result<JsonValue, EntryError> {
    match format {
        EntryFormat::Json => Ok(serde_json::from_slice(body)?),
        EntryFormat::Form => parse_form(body),
        EntryFormat::Auto => {
            let first = body.iter().find(|b| !b.is_ascii_whitespace());
            if matches!(first, Some(b'{') | Some(b'[')) {
                parse_entry(body, EntryFormat::Json)
            } else {
                parse_entry(body, EntryFormat::Form)
            }
        }
    }
}

/// Parse an `application/x-www-form-urlencoded` body. Repeated keys collect
/// into an array.
fn parse_form(body: &[u8]) -> Result<JsonValue, EntryError> {
    let body = std::str::from_utf8(body).map_err(|_| EntryError::NotUtf8)?;
    let mut fields = Map::new();

    for part in body.trim().split('&') {
        if part.is_empty() {
            continue;
        }
        let (key, value) = part.split_once('=').unwrap_or((part, ""));
        let key = decode_component(key)?;
        let value = JsonValue::String(decode_component(value)?);

        match fields.get_mut(&key) {
            Some(JsonValue::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = JsonValue::Array(vec![first, value]);
            }
            None => {
                fields.insert(key, value);
            }
        }
    }

    Ok(JsonValue::Object(fields))
}

fn decode_component(raw: &str) -> Result<String, EntryError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| EntryError::NotUtf8)
}

impl FromStr for EntryFormat {
    type Err = EntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "json" => Ok(Self::Json),
            "form" | "form_urlencoded" | "application/x-www-form-urlencoded" => Ok(Self::Form),
            other => Err(EntryError::UnknownFormat(other.to_string())),
        }
    }
}

/// Entry payload errors.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Form payload is not valid UTF-8")]
    NotUtf8,

    #[error("Unknown entry format '{0}' (expected auto, json or form)")]
    UnknownFormat(String),
}
