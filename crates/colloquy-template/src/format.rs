//! API response formatting.
//!
//! Turns a raw JSON API result into chat text by applying the step's
//! [`ResponseFormat`]: each named format rule produces one part, and the
//! success message template is rendered against those parts.
//!
//! Result shapes handled per rule:
//! - an object with a `data` key is unwrapped to that value first;
//! - arrays render the rule's template per item, joined with `join_with`;
//! - an empty array falls back to the result's `message` field, or the
//!   format's `error_message`;
//! - objects render the template directly;
//! - anything else uses the result's `message` field or stringifies.

use std::collections::HashMap;

use colloquy_catalog::ResponseFormat;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::render::{render, render_object};

/// Render `format.success_message` from the API result.
pub fn format_response(data: &Value, format: &ResponseFormat) -> Result<String> {
    let mut parts: HashMap<String, String> = HashMap::new();

    for (name, rule) in &format.format_rules {
        // Unwrap a conventional `{"data": ...}` envelope when present.
        let items = match data {
            Value::Object(map) if map.contains_key("data") => &map["data"],
            other => other,
        };

        let part = match items {
            Value::Array(rows) if rows.is_empty() => fallback_message(data, format),
            Value::Array(rows) => {
                let mut rendered = Vec::with_capacity(rows.len());
                for row in rows {
                    match row {
                        Value::Object(fields) => rendered.push(render_object(&rule.template, fields)?),
                        other => rendered.push(display_scalar(other)),
                    }
                }
                rendered.join(&rule.join_with)
            }
            Value::Object(fields) => render_object(&rule.template, fields)?,
            other => message_field(data).unwrap_or_else(|| display_scalar(other)),
        };

        debug!(rule = %name, "response part formatted");
        parts.insert(name.clone(), part);
    }

    render(&format.success_message, &parts)
}

/// The `message` field of a result object, if it carries one.
fn message_field(data: &Value) -> Option<String> {
    data.as_object()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Fallback text for an empty collection.
fn fallback_message(data: &Value, format: &ResponseFormat) -> String {
    message_field(data).unwrap_or_else(|| format.error_message.clone())
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
