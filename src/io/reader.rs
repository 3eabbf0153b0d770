use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::table::{Table, Value};

/// Read one CSV export into an in-memory batch. Cells come back as text;
/// empty cells are Null. Nothing is coerced here, that is the normalizer's
/// job.
pub fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: HashMap<String, Value> = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            let cell = record.get(i).unwrap_or("");
            let value = if cell.trim().is_empty() {
                Value::Null
            } else {
                Value::Str(cell.to_string())
            };
            row.insert(name.clone(), value);
        }
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

/// Enumerate `*.csv` files directly under a directory, sorted by file name
/// so runs are deterministic.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e == "csv")
                    .unwrap_or(false)
        })
        .collect();
    paths.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_csv_maps_empty_cells_to_null() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Brighton_Nov.csv");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "BUSINESS_DATE,ROOM").unwrap();
        writeln!(file, "01/11/2025,-45.50").unwrap();
        writeln!(file, ",").unwrap();

        let table = read_csv(&path).unwrap();
        assert_eq!(table.columns, vec!["BUSINESS_DATE", "ROOM"]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows[0].get("ROOM"),
            Some(&Value::Str("-45.50".to_string()))
        );
        assert_eq!(table.rows[1].get("ROOM"), Some(&Value::Null));
    }

    #[test]
    fn test_list_csv_files_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        for name in ["b.csv", "a.csv", "notes.txt"] {
            fs::File::create(dir.path().join(name)).unwrap();
        }

        let paths = list_csv_files(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
    }
}
