//! Tabular query results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rows returned by the store, column order preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True for a single row holding a single column.
    pub fn is_scalar(&self) -> bool {
        self.rows.len() == 1 && self.columns.len() == 1
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, index: usize) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// First `limit` rows.
    pub fn head(&self, limit: usize) -> ResultSet {
        ResultSet {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }

    /// Pipe-separated table: header, dash underline, at most `limit` rows
    /// and a `... +N more` line when truncated.
    pub fn render_table(&self, limit: usize) -> String {
        let header = self.columns.join(" | ");
        let mut out = format!("{}\n{}", header, "-".repeat(header.chars().count()));

        for row in self.rows.iter().take(limit) {
            let cells: Vec<String> = row.iter().map(display_value).collect();
            out.push('\n');
            out.push_str(&cells.join(" | "));
        }

        if self.rows.len() > limit {
            out.push_str(&format!("\n... +{} more", self.rows.len() - limit));
        }
        out
    }
}

/// Cell text without JSON quoting.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
