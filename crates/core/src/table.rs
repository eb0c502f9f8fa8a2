//! Tabular materialization of extracted rows.
//!
//! A [`DataTable`] is the display/export form of an
//! [`ExtractedTable`](crate::ExtractedTable): every row is aligned to one
//! final column order, and missing cells are `null`.

use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::Result;
use crate::formatters::{TextTableConfig, to_csv, to_json, to_text_table};
use crate::schema::ExtractedTable;

/// Export formats for a [`DataTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// Pretty-printed array of records.
    Json,
    /// Aligned plain-text table for terminals.
    Text,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "text" | "txt" | "table" => Ok(Self::Text),
            _ => Err(format!("Invalid format: {}. Valid options: csv, json, text", s)),
        }
    }
}

/// Rows aligned to a single column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataTable {
    /// Final column order.
    pub columns: Vec<String>,
    /// One entry per record, one value per column.
    pub rows: Vec<Vec<Value>>,
}

impl DataTable {
    /// Materializes an extracted table.
    ///
    /// The columns present in the data are the union of row keys in order of
    /// first appearance. When the declared columns name any of them, the
    /// declared order filtered to present columns wins and other keys are
    /// dropped; otherwise the data order stands. A table without rows keeps
    /// its declared columns.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tabex_core::{DataTable, ExtractedTable};
    ///
    /// let extracted: ExtractedTable = serde_json::from_str(
    ///     r#"{"columns":["A","B","C"],"rows":[{"data":{"B":2,"A":1}},{"data":{"A":3}}]}"#,
    /// ).unwrap();
    /// let table = DataTable::from_extracted(&extracted);
    /// assert_eq!(table.columns, vec!["A", "B"]);
    /// assert_eq!(table.rows[1], vec![serde_json::json!(3), serde_json::Value::Null]);
    /// ```
    pub fn from_extracted(extracted: &ExtractedTable) -> Self {
        if extracted.rows.is_empty() {
            return Self { columns: dedup(extracted.columns.iter().cloned()), rows: Vec::new() };
        }

        let present = dedup(extracted.rows.iter().flat_map(|row| row.data.keys().cloned()));
        let declared = dedup(
            extracted
                .columns
                .iter()
                .filter(|column| present.contains(column))
                .cloned(),
        );
        let columns = if declared.is_empty() { present } else { declared };

        let rows = extracted
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.data.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Records as ordered column → value mappings.
    pub fn records(&self) -> impl Iterator<Item = Map<String, Value>> + '_ {
        self.rows.iter().map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
    }

    /// Values of one column, if it exists.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Serializes the table in the given format.
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => to_csv(self),
            ExportFormat::Json => to_json(self, true),
            ExportFormat::Text => Ok(to_text_table(self, &TextTableConfig::default())),
        }
    }
}

/// Renders a cell as plain text: strings verbatim, null as empty, other
/// values as JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn dedup(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}
