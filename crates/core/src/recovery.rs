//! Structured-output recovery.
//!
//! Models do not reliably emit the requested JSON. [`parse_response`] first
//! validates the raw answer strictly; when that fails it locates a JSON
//! object inside the text, rewrites it with a fixed chain of shape rules,
//! and validates again.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::schema::ExtractedTable;
use crate::{Result, TabexError};

/// Maximum characters of a response quoted in a schema error.
pub const EXCERPT_CHARS: usize = 500;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").expect("valid regex"));

type Rule = fn(Map<String, Value>) -> Map<String, Value>;

/// Shape rules, applied in order.
const REPAIR_RULES: &[(&str, Rule)] = &[
    ("columns_from_mapping", columns_from_mapping),
    ("stringify_columns", stringify_columns),
    ("columns_from_first_row", columns_from_first_row),
    ("wrap_bare_rows", wrap_bare_rows),
];

/// Parses a model response into an [`ExtractedTable`], repairing it if needed.
///
/// # Errors
///
/// Returns [`TabexError::Schema`] with both failure messages and a bounded
/// excerpt of the response when neither path yields a valid table.
///
/// # Example
///
/// ```rust
/// use tabex_core::parse_response;
///
/// let raw = "Here you go:\n```json\n{\"columns\": {\"data\": [\"X\"]}, \"rows\": [{\"X\": 1}]}\n```";
/// let table = parse_response(raw).unwrap();
/// assert_eq!(table.columns, vec!["X"]);
/// assert_eq!(table.rows[0].data["X"], 1);
/// ```
pub fn parse_response(raw: &str) -> Result<ExtractedTable> {
    parse_response_with_excerpt(raw, EXCERPT_CHARS)
}

/// [`parse_response`] with a custom excerpt bound for schema errors.
pub fn parse_response_with_excerpt(raw: &str, excerpt_chars: usize) -> Result<ExtractedTable> {
    let original = match serde_json::from_str::<ExtractedTable>(raw.trim()) {
        Ok(table) => return Ok(table),
        Err(e) => e.to_string(),
    };

    warn!(error = %original, "strict parse failed, attempting repair");

    repair(raw).map_err(|repair| TabexError::Schema { original, repair, excerpt: excerpt(raw, excerpt_chars) })
}

/// Locates, normalizes, and validates the JSON object inside `raw`.
pub fn repair(raw: &str) -> std::result::Result<ExtractedTable, String> {
    let span = locate_json(raw);
    let value: Value = serde_json::from_str(span).map_err(|e| e.to_string())?;

    let Value::Object(object) = value else {
        return Err(format!("expected a JSON object, found {}", kind_of(&value)));
    };

    let normalized = normalize(object);
    serde_json::from_value(Value::Object(normalized)).map_err(|e| e.to_string())
}

/// Applies every repair rule in order.
pub fn normalize(object: Map<String, Value>) -> Map<String, Value> {
    REPAIR_RULES.iter().fold(object, |object, (name, rule)| {
        debug!(rule = name, "applying repair rule");
        rule(object)
    })
}

/// Picks the JSON candidate: a fenced block, else the outermost brace span,
/// else the whole text.
fn locate_json(raw: &str) -> &str {
    if let Some(fenced) = FENCED_JSON.captures(raw).and_then(|caps| caps.get(1)) {
        return fenced.as_str();
    }

    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => raw,
    }
}

/// `columns` given as a mapping becomes its `data` value, else its keys.
fn columns_from_mapping(mut object: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Object(columns)) = object.get_mut("columns") {
        let replacement = match columns.remove("data") {
            Some(data) => data,
            None => Value::Array(columns.keys().cloned().map(Value::String).collect()),
        };
        object.insert("columns".to_string(), replacement);
    }
    object
}

/// Scalar column names become strings; anything else is dropped.
fn stringify_columns(mut object: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Array(columns)) = object.get_mut("columns") {
        let names = columns
            .drain(..)
            .filter_map(|column| match column {
                Value::String(name) => Some(Value::String(name)),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                _ => None,
            })
            .collect();
        *columns = names;
    }
    object
}

/// Missing or malformed `columns` are derived from the first row's keys.
fn columns_from_first_row(mut object: Map<String, Value>) -> Map<String, Value> {
    if matches!(object.get("columns"), Some(Value::Array(_))) {
        return object;
    }

    let keys: Option<Vec<String>> = match object.get("rows") {
        Some(Value::Array(rows)) => rows.first().and_then(row_values).map(|data| data.keys().cloned().collect()),
        _ => None,
    };

    let columns = keys.unwrap_or_default().into_iter().map(Value::String).collect();
    object.insert("columns".to_string(), Value::Array(columns));
    object
}

/// Bare row mappings are wrapped as `{"data": row}`; non-objects are dropped.
fn wrap_bare_rows(mut object: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Array(rows)) = object.get_mut("rows") {
        let wrapped = rows
            .drain(..)
            .filter_map(|row| match row {
                Value::Object(map) if map.contains_key("data") => Some(Value::Object(map)),
                Value::Object(map) => {
                    let mut wrapper = Map::new();
                    wrapper.insert("data".to_string(), Value::Object(map));
                    Some(Value::Object(wrapper))
                }
                _ => None,
            })
            .collect();
        *rows = wrapped;
    }
    object
}

/// The value mapping of a row, wrapped or bare.
fn row_values(row: &Value) -> Option<&Map<String, Value>> {
    let row = row.as_object()?;
    match row.get("data") {
        Some(data) => data.as_object(),
        None => Some(row),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// First `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
