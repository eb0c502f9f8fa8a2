//! Prompt construction for table extraction.

use crate::llm::{ChatRequest, Message};
use crate::schema::table_schema_json;

/// Prepended to content that reached the model as plain text.
pub const TEXT_CONTENT_PREFIX: &str = "[Text content extracted from HTML for efficiency]\n\n";

const SYSTEM_RULES: &str = r#"You are a data extraction assistant. Extract information from the content and return it in the EXACT JSON format specified below.

CRITICAL: Follow this format EXACTLY:
- "columns" must be a list of strings (e.g., ["Name", "Price", "Description"])
- "rows" must be a list of objects, each with a "data" key containing a dictionary
- Each row's "data" dictionary should have keys matching the column names
- "description" is optional and should be a string

Example format:
{
  "columns": ["Product", "Price", "Stock"],
  "rows": [
    {"data": {"Product": "Widget A", "Price": "$10", "Stock": "50"}},
    {"data": {"Product": "Widget B", "Price": "$20", "Stock": "30"}}
  ],
  "description": "Extracted product information"
}"#;

/// System instruction: output rules, worked example and the JSON Schema.
pub fn system_prompt() -> String {
    format!(
        "{}\n\nThe output should be formatted as a JSON instance that conforms to the JSON schema below.\n\n```json\n{}\n```",
        SYSTEM_RULES,
        table_schema_json()
    )
}

/// User turn carrying the reduced content and the query.
pub fn user_prompt(content: &str, query: &str) -> String {
    format!(
        "Content:\n{}\n\nQuery: {}\n\nExtract the information matching the query and return it in the EXACT JSON format specified above.",
        content, query
    )
}

/// Full chat request for one extraction.
pub fn build_request(model_id: &str, content: &str, query: &str, temperature: f32) -> ChatRequest {
    ChatRequest::new(model_id)
        .message(Message::system(system_prompt()))
        .message(Message::user(user_prompt(content, query)))
        .temperature(temperature)
}
