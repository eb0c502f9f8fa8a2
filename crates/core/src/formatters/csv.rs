use crate::table::{DataTable, cell_text};
use crate::{Result, TabexError};

/// Convert a table to UTF-8 CSV
///
/// The header row is the final column order; nulls become empty fields.
/// A table without columns has no header and no records.
pub fn to_csv(table: &DataTable) -> Result<String> {
    if table.columns.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(cell_text))?;
    }

    let bytes = writer.into_inner().map_err(|e| TabexError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| TabexError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_header_and_rows() {
        let table = DataTable {
            columns: vec!["Product".into(), "Price".into()],
            rows: vec![vec![json!("Widget"), json!(10)], vec![json!("Gadget"), Value::Null]],
        };

        assert_eq!(to_csv(&table).unwrap(), "Product,Price\nWidget,10\nGadget,\n");
    }

    #[test]
    fn test_quotes_special_characters() {
        let table = DataTable {
            columns: vec!["Name".into()],
            rows: vec![vec![json!("Smith, \"Jr\"")]],
        };

        assert_eq!(to_csv(&table).unwrap(), "Name\n\"Smith, \"\"Jr\"\"\"\n");
    }

    #[test]
    fn test_no_columns_writes_nothing() {
        let table = DataTable { columns: vec![], rows: vec![] };
        assert_eq!(to_csv(&table).unwrap(), "");
    }

    #[test]
    fn test_unicode_preserved() {
        let table = DataTable { columns: vec!["Città".into()], rows: vec![vec![json!("Zürich")]] };
        assert_eq!(to_csv(&table).unwrap(), "Città\nZürich\n");
    }
}
