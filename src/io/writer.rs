use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::pipeline::assemble::ConsolidatedTable;
use crate::table::Value;

/// Derived columns appended after the passthrough columns on export
const DERIVED_COLUMNS: [&str; 5] = [
    "site",
    "file_month",
    "transaction_date",
    "refund_amount",
    "refund_category",
];

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Persist the consolidated table as CSV: passthrough columns first, then
/// the derived fields. The target directory is created if absent.
pub fn write_consolidated(path: &Path, table: &ConsolidatedTable) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    header.extend(DERIVED_COLUMNS);
    writer.write_record(&header)?;

    for record in &table.records {
        let mut cells: Vec<String> = Vec::with_capacity(header.len());
        for column in &table.columns {
            let cell = match record.fields.get(column) {
                Some(Value::Str(s)) => s.clone(),
                Some(Value::Num(n)) => n.to_string(),
                Some(Value::Null) | None => String::new(),
            };
            cells.push(cell);
        }
        cells.push(record.site.clone());
        cells.push(record.file_month.clone());
        cells.push(
            record
                .transaction_date
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        );
        cells.push(record.refund_amount.to_string());
        cells.push(record.refund_category.to_string());
        writer.write_record(&cells)?;
    }

    writer.flush()?;
    Ok(())
}

/// Persist a metrics/aggregate table (any serializable row type) as CSV.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleaningConfig;
    use crate::pipeline::{assemble, normalize};
    use crate::table::Table;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_write_consolidated_creates_missing_directories() {
        let mut row = HashMap::new();
        row.insert(
            "BUSINESS_FORMAT_DATE".to_string(),
            Value::Str("Refund Accommodation".to_string()),
        );
        row.insert("ROOM".to_string(), Value::Str("-45.50".to_string()));
        let batch = Table {
            columns: vec!["BUSINESS_FORMAT_DATE".to_string(), "ROOM".to_string()],
            rows: vec![row],
        };
        let outcome = normalize::normalize(
            &batch,
            "Brighton_November_refund.csv",
            &CleaningConfig::default(),
        )
        .unwrap();
        let table = assemble::consolidate(vec![outcome]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("processed").join("refunds.csv");
        write_consolidated(&path, &table).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next().unwrap(),
            "BUSINESS_FORMAT_DATE,ROOM,site,file_month,transaction_date,refund_amount,refund_category"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Refund Accommodation,-45.50,Brighton,Nov-2025,,45.5,Accommodation"
        );
    }
}
