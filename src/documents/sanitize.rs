//! Helpers for normalizing document metadata.

use serde_json::{Map, Value};

/// Sanitize arbitrary string input by trimming whitespace and dropping empties.
pub(crate) fn sanitize_string(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Trim metadata keys and string values, dropping nulls, blank keys, and blank strings.
pub fn sanitize_metadata(metadata: Map<String, Value>) -> Map<String, Value> {
    metadata
        .into_iter()
        .filter_map(|(key, value)| {
            let key = sanitize_string(Some(key))?;
            let value = match value {
                Value::Null => return None,
                Value::String(text) => Value::String(sanitize_string(Some(text))?),
                other => other,
            };
            Some((key, value))
        })
        .collect()
}

/// Reduce a client-supplied upload name to its final path component.
pub fn sanitize_filename(value: Option<String>) -> Option<String> {
    sanitize_string(value).and_then(|name| {
        let base = name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        if base.is_empty() { None } else { Some(base) }
    })
}
