//! Field mappings and dotted-path flattening.

use std::collections::BTreeMap;

use serde_json::Value;

/// Field name to value mapping decoded from a document.
pub type Fields = serde_json::Map<String, Value>;

/// Flattened view of a [`Fields`] mapping keyed by dotted leaf paths.
pub type FlatFields = BTreeMap<String, Value>;

/// Flatten nested mappings into dotted leaf keys.
///
/// A non-empty object contributes one key per leaf (`seo.title`). Scalars,
/// arrays, null and empty objects are leaves themselves.
pub fn flatten(fields: &Fields) -> FlatFields {
    let mut out = FlatFields::new();
    for (key, value) in fields {
        flatten_into(key.clone(), value, &mut out);
    }
    out
}

fn flatten_into(prefix: String, value: &Value, out: &mut FlatFields) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, nested) in map {
                flatten_into(format!("{prefix}.{key}"), nested, out);
            }
        }
        leaf => {
            out.insert(prefix, leaf.clone());
        }
    }
}

/// Look up a dotted path inside nested fields.
pub fn get_path<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
