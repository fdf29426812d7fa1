//! Front-matter document codec.
//!
//! ```text
//! ---
//! title: Hello
//! tags: [a, b]
//! ---
//! Body text goes here.
//! ```
//!
//! The YAML header becomes the field mapping; the body is stored under the
//! [`BODY_FIELD`] key.

use folio_types::{Fields, Value};

use crate::error::{StoreError, StoreResult};

/// Field that carries the document body.
pub const BODY_FIELD: &str = "content";

const DELIMITER: &str = "---";

/// Converts field mappings to and from their on-disk text form.
pub trait DocumentCodec: Send + Sync {
    /// Render fields as document text.
    fn encode(&self, fields: &Fields) -> StoreResult<String>;

    /// Parse document text into fields.
    ///
    /// Returns [`StoreError::Decode`] on malformed input.
    fn decode(&self, text: &str) -> StoreResult<Fields>;
}

/// YAML front matter followed by a free-form body.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrontmatterCodec;

impl FrontmatterCodec {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentCodec for FrontmatterCodec {
    fn encode(&self, fields: &Fields) -> StoreResult<String> {
        let mut header = fields.clone();
        let body = match header.remove(BODY_FIELD) {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        let yaml = if header.is_empty() {
            String::new()
        } else {
            serde_yaml_ng::to_string(&header).map_err(|e| StoreError::Encode(e.to_string()))?
        };

        Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{body}"))
    }

    fn decode(&self, text: &str) -> StoreResult<Fields> {
        let Some((yaml, body)) = split_frontmatter(text) else {
            let mut fields = Fields::new();
            fields.insert(BODY_FIELD.into(), Value::String(text.to_string()));
            return Ok(fields);
        };

        let mut fields = if yaml.trim().is_empty() {
            Fields::new()
        } else {
            match serde_yaml_ng::from_str::<Value>(yaml)
                .map_err(|e| StoreError::Decode(format!("invalid YAML front matter: {e}")))?
            {
                Value::Object(map) => map,
                Value::Null => Fields::new(),
                other => {
                    return Err(StoreError::Decode(format!(
                        "front matter must be a mapping, found {}",
                        kind_name(&other)
                    )))
                }
            }
        };

        fields.insert(BODY_FIELD.into(), Value::String(body.to_string()));
        Ok(fields)
    }
}

/// Split text into `(yaml, body)` if it opens with a front-matter block.
fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text
        .strip_prefix("---\r\n")
        .or_else(|| text.strip_prefix("---\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn decode_header_and_body() {
        let text = "---\ntitle: Hello\nseo:\n  robots: noindex\n---\nBody here.\n";
        let f = FrontmatterCodec.decode(text).unwrap();
        assert_eq!(f["title"], json!("Hello"));
        assert_eq!(f["seo"]["robots"], json!("noindex"));
        assert_eq!(f[BODY_FIELD], json!("Body here.\n"));
    }

    #[test]
    fn encode_then_decode_preserves_fields() {
        let original = fields(json!({
            "title": "Foo",
            "count": 3,
            "draft": false,
            "tags": ["a", "b"],
            "content": "Some body",
        }));
        let text = FrontmatterCodec.encode(&original).unwrap();
        assert!(text.starts_with("---\n"));
        assert!(text.ends_with("---\nSome body"));
        assert_eq!(FrontmatterCodec.decode(&text).unwrap(), original);
    }

    #[test]
    fn empty_fields_encode_to_empty_header() {
        let text = FrontmatterCodec.encode(&Fields::new()).unwrap();
        assert_eq!(text, "---\n---\n");
        let decoded = FrontmatterCodec.decode(&text).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[BODY_FIELD], json!(""));
    }

    #[test]
    fn text_without_header_is_all_body() {
        let decoded = FrontmatterCodec.decode("just text").unwrap();
        assert_eq!(decoded[BODY_FIELD], json!("just text"));
    }

    #[test]
    fn crlf_delimiters() {
        let decoded = FrontmatterCodec.decode("---\r\ntitle: A\r\n---\r\nbody").unwrap();
        assert_eq!(decoded["title"], json!("A"));
        assert_eq!(decoded[BODY_FIELD], json!("body"));
    }

    #[test]
    fn malformed_yaml_is_a_decode_error() {
        let err = FrontmatterCodec.decode("---\ntitle: [unclosed\n---\n").unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn non_mapping_header_is_a_decode_error() {
        let err = FrontmatterCodec.decode("---\n- a\n- b\n---\n").unwrap_err();
        assert!(matches!(err, StoreError::Decode(msg) if msg.contains("sequence")));
    }
}
