//! The table shape the model is asked to produce.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A table as emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedTable {
    /// List of column names for the table
    pub columns: Vec<String>,
    /// List of rows, each containing data dictionary
    pub rows: Vec<TableRow>,
    /// Description of what was extracted
    #[serde(default)]
    pub description: Option<String>,
}

/// One row of an [`ExtractedTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TableRow {
    /// Dictionary of column names and their values
    pub data: Map<String, Value>,
}

/// JSON Schema of [`ExtractedTable`], pretty-printed for prompts.
pub fn table_schema_json() -> String {
    let schema = schemars::schema_for!(ExtractedTable);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lists_fields() {
        let schema = table_schema_json();
        assert!(schema.contains("\"columns\""));
        assert!(schema.contains("\"rows\""));
        assert!(schema.contains("\"description\""));
        assert!(schema.contains("Dictionary of column names and their values"));
    }

    #[test]
    fn test_description_is_optional() {
        let table: ExtractedTable = serde_json::from_str(r#"{"columns":["A"],"rows":[]}"#).unwrap();
        assert_eq!(table.description, None);
    }

    #[test]
    fn test_rows_require_data() {
        let result = serde_json::from_str::<ExtractedTable>(r#"{"columns":["A"],"rows":[{"A":1}]}"#);
        assert!(result.is_err());
    }
}
