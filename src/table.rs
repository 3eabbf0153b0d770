use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single cell from a source export. Exports carry free-form text; numeric
/// coercion happens during normalization, not at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Num(f64),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text view of the cell, if it has one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric coercion: numbers pass through, text is parsed as a plain
    /// decimal literal, anything else is None.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            Value::Null => None,
        }
    }
}

/// One row of a raw batch: field name to cell value.
pub type Row = HashMap<String, Value>;

/// An in-memory tabular batch with a stable column order. Column sets are
/// consistent within a file but may differ across files.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_num_coercion() {
        assert_eq!(Value::Num(12.5).as_num(), Some(12.5));
        assert_eq!(Value::Str(" -45.50 ".to_string()).as_num(), Some(-45.5));
        assert_eq!(Value::Str("12 GBP".to_string()).as_num(), None);
        assert_eq!(Value::Null.as_num(), None);
    }

    #[test]
    fn test_has_column() {
        let table = Table::new(vec!["ROOM".to_string(), "RECEIPT_NO".to_string()]);
        assert!(table.has_column("ROOM"));
        assert!(!table.has_column("BUSINESS_DATE"));
    }
}
