use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("model response is empty")]
    Empty,
    #[error("model response is not valid JSON: {0}")]
    Syntax(String),
    #[error("model response is JSON {0}, expected an object")]
    NotAnObject(&'static str),
}

/// Parse raw model text into a JSON object.
///
/// A single surrounding markdown code fence (```json ... ```) is tolerated;
/// nothing else is repaired.
pub fn parse_response(text: &str) -> Result<Map<String, Value>, ParseError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(ParseError::Empty);
    }
    let value: Value = serde_json::from_str(body).map_err(|e| ParseError::Syntax(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ParseError::NotAnObject(json_kind(&other))),
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return s;
    };
    // drop the info string ("json") on the opening line
    match inner.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with('{') => body.trim(),
        _ => inner.trim(),
    }
}

pub fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
