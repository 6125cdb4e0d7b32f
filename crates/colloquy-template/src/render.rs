//! Placeholder rendering.
//!
//! Templates are plain strings containing `{name}` placeholders. `{{` and
//! `}}` escape literal braces. Placeholder names are `[A-Za-z0-9_]+`.
//! Resolution is mandatory: a placeholder absent from the context is a
//! [`TemplateError::MissingValue`], never an empty substitution.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{Result, TemplateError};

/// Render a template against a string-to-string context.
pub fn render(template: &str, values: &HashMap<String, String>) -> Result<String> {
    render_with(template, |name| values.get(name).cloned())
}

/// Render a template against a JSON object, stringifying leaf values the
/// way a chat reply needs them: strings bare, scalars via `to_string`,
/// nested structures as compact JSON.
pub fn render_object(template: &str, object: &Map<String, Value>) -> Result<String> {
    render_with(template, |name| object.get(name).map(display_value))
}

/// Render every string leaf of a JSON payload mapping against the
/// collected values. Objects and arrays are walked recursively; numbers,
/// booleans and nulls pass through untouched.
pub fn render_payload(
    payload: &Map<String, Value>,
    values: &HashMap<String, String>,
) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for (key, value) in payload {
        out.insert(key.clone(), render_value(value, values)?);
    }
    Ok(out)
}

fn render_value(value: &Value, values: &HashMap<String, String>) -> Result<Value> {
    match value {
        Value::String(template) => Ok(Value::String(render(template, values)?)),
        Value::Object(map) => Ok(Value::Object(render_payload(map, values)?)),
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|v| render_value(v, values))
                .collect::<Result<_>>()?,
        )),
        other => Ok(other.clone()),
    }
}

/// Turn a JSON value into display text.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Core scanner shared by all render entry points.
fn render_with(template: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                out.push('{');
                i += 2;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                out.push('}');
                i += 2;
            }
            b'{' => {
                let start = i + 1;
                let end = template[start..]
                    .find('}')
                    .map(|off| start + off)
                    .ok_or_else(|| TemplateError::Malformed {
                        offset: i,
                        reason: "unclosed placeholder".to_string(),
                    })?;
                let name = &template[start..end];
                if name.is_empty()
                    || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
                {
                    return Err(TemplateError::Malformed {
                        offset: i,
                        reason: format!("invalid placeholder name `{name}`"),
                    });
                }
                let value = lookup(name).ok_or_else(|| TemplateError::MissingValue {
                    name: name.to_string(),
                })?;
                out.push_str(&value);
                i = end + 1;
            }
            b'}' => {
                return Err(TemplateError::Malformed {
                    offset: i,
                    reason: "unmatched `}`".to_string(),
                });
            }
            _ => {
                // Copy one whole UTF-8 character.
                let ch_len = template[i..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&template[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
