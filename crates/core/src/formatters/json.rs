use crate::table::DataTable;
use crate::{Result, TabexError};
use serde_json::Value;

/// Convert a table to a JSON array of records
///
/// Every record carries every column, `null` where the row had no value.
/// Pretty output uses two-space indentation.
pub fn to_json(table: &DataTable, pretty: bool) -> Result<String> {
    let records: Vec<Value> = table.records().map(Value::Object).collect();

    let output = if pretty { serde_json::to_string_pretty(&records) } else { serde_json::to_string(&records) };
    output.map_err(|e| TabexError::Export(e.to_string()))
}

/// JSON formatter with configurable options
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn convert(&self, table: &DataTable) -> Result<String> {
        to_json(table, self.pretty)
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> DataTable {
        DataTable {
            columns: vec!["Product".into(), "Price".into()],
            rows: vec![vec![json!("Widget"), json!("10")], vec![json!("Gadget"), Value::Null]],
        }
    }

    #[test]
    fn test_records_orientation() {
        let output = to_json(&sample(), false).unwrap();
        assert_eq!(
            output,
            r#"[{"Product":"Widget","Price":"10"},{"Product":"Gadget","Price":null}]"#
        );
    }

    #[test]
    fn test_pretty_uses_two_spaces() {
        let output = JsonFormatter::default().convert(&sample()).unwrap();
        assert!(output.starts_with("[\n  {\n    \"Product\": \"Widget\""));
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(to_json(&DataTable::default(), true).unwrap(), "[]");
    }
}
