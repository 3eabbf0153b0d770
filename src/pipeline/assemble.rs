use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::CleaningConfig;
use crate::error::{PipelineError, Result};
use crate::io::reader;
use crate::pipeline::normalize::{self, NormalizeOutcome, RefundRecord};

/// The consolidated analysis table: every refund record from every input
/// file, in sorted-file-name order then original row order. Duplicates are
/// a validation concern and are not removed here.
#[derive(Debug, Default)]
pub struct ConsolidatedTable {
    pub records: Vec<RefundRecord>,
    /// First-seen-ordered union of passthrough columns across files
    pub columns: Vec<String>,
    /// Raw input rows across all files
    pub raw_rows: usize,
    /// Rows that survived the refund filter across all files
    pub refund_rows: usize,
}

impl ConsolidatedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

/// Concatenate per-file normalization outcomes, preserving input order.
pub fn consolidate(outcomes: Vec<NormalizeOutcome>) -> ConsolidatedTable {
    let mut table = ConsolidatedTable::default();
    for outcome in outcomes {
        for column in outcome.columns {
            if !table.has_column(&column) {
                table.columns.push(column);
            }
        }
        table.raw_rows += outcome.raw_rows;
        table.refund_rows += outcome.refund_rows;
        table.records.extend(outcome.records);
    }
    table
}

/// Normalize every input file and consolidate the results. Requires at
/// least one file; ordering is by file name regardless of how the caller
/// enumerated them, so reruns are deterministic.
pub fn assemble_files(paths: &[PathBuf], config: &CleaningConfig) -> Result<ConsolidatedTable> {
    if paths.is_empty() {
        return Err(PipelineError::NoInput {
            dir: "<no files supplied>".to_string(),
        });
    }

    let mut ordered: Vec<&PathBuf> = paths.iter().collect();
    ordered.sort_by_key(|p| file_name_of(p.as_path()));

    let mut outcomes = Vec::with_capacity(ordered.len());
    for path in ordered {
        let batch = reader::read_csv(path)?;
        let outcome = normalize::normalize(&batch, &file_name_of(path), config)?;
        info!(
            file = %path.display(),
            raw = outcome.raw_rows,
            retained = outcome.records.len(),
            "cleaned input file"
        );
        outcomes.push(outcome);
    }

    Ok(consolidate(outcomes))
}

/// Enumerate and assemble every `*.csv` under a directory.
pub fn assemble_dir(dir: &Path, config: &CleaningConfig) -> Result<ConsolidatedTable> {
    let paths = reader::list_csv_files(dir)?;
    if paths.is_empty() {
        return Err(PipelineError::NoInput {
            dir: dir.display().to_string(),
        });
    }
    assemble_files(&paths, config)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
