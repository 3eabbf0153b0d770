use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::config::CleaningConfig;
use crate::error::Result;
use crate::pipeline::naming;
use crate::table::{Table, Value};

/// Export padding columns carry this prefix and are dropped outright
const PADDING_PREFIX: &str = "Unnamed:";

/// The field whose text marks a row as a refund and carries the category
const REFUND_FLAG_FIELD: &str = "BUSINESS_FORMAT_DATE";

/// The field the refund amount is derived from
const AMOUNT_FIELD: &str = "ROOM";

/// Transaction date fallback chain, highest priority first. Each field is
/// parsed independently per row; a lower-priority field only fills rows the
/// higher-priority fields left null.
pub const DATE_FALLBACK_FIELDS: [&str; 3] =
    ["BUSINESS_DATE", "BUSINESS_TIME", REFUND_FLAG_FIELD];

/// Canonical refund category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RefundCategory {
    Accommodation,
    #[serde(rename = "F&B")]
    FoodAndBeverage,
    Other,
}

impl fmt::Display for RefundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RefundCategory::Accommodation => "Accommodation",
            RefundCategory::FoodAndBeverage => "F&B",
            RefundCategory::Other => "Other",
        };
        write!(f, "{label}")
    }
}

/// One analysis-ready refund row. `refund_amount` is always present; rows
/// that fail amount resolution never become records.
#[derive(Debug, Clone, Serialize)]
pub struct RefundRecord {
    pub site: String,
    pub file_month: String,
    pub transaction_date: Option<NaiveDateTime>,
    pub refund_amount: f64,
    pub refund_category: RefundCategory,
    /// Source fields carried through unchanged, padding columns removed
    pub fields: HashMap<String, Value>,
}

/// Result of normalizing one raw batch, with the row counts downstream
/// reconciliation needs.
#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub records: Vec<RefundRecord>,
    /// Passthrough column order for this file (padding columns removed)
    pub columns: Vec<String>,
    /// Rows in the raw batch
    pub raw_rows: usize,
    /// Rows that survived the refund filter
    pub refund_rows: usize,
}

/// Normalize one raw batch into analysis-ready refund records.
///
/// Row-level problems (unparsable dates, unparsable or oversized amounts,
/// missing optional columns) degrade to null/drop and never abort the batch.
/// Only a bad filename is an error.
pub fn normalize(
    batch: &Table,
    filename: &str,
    config: &CleaningConfig,
) -> Result<NormalizeOutcome> {
    let (site, file_month) = naming::resolve(filename)?;

    let columns: Vec<String> = batch
        .columns
        .iter()
        .filter(|c| !c.starts_with(PADDING_PREFIX))
        .cloned()
        .collect();

    let keyword = config.refund_keyword.to_lowercase();
    let has_flag_field = batch.has_column(REFUND_FLAG_FIELD);
    let has_amount_field = batch.has_column(AMOUNT_FIELD);

    let mut records = Vec::new();
    let mut refund_rows = 0usize;

    for row in &batch.rows {
        // Refund filter: flag field must exist and contain the keyword
        if !has_flag_field || !contains_keyword(row.get(REFUND_FLAG_FIELD), &keyword) {
            continue;
        }
        refund_rows += 1;

        let transaction_date = resolve_transaction_date(batch, row);

        // Amount gate: no usable amount, no record
        let refund_amount = match resolve_refund_amount(row, has_amount_field, config) {
            Some(amount) => amount,
            None => continue,
        };

        // Absent flag value degrades to Other
        let refund_category = categorize(row.get(REFUND_FLAG_FIELD));

        let fields: HashMap<String, Value> = row
            .iter()
            .filter(|(name, _)| !name.starts_with(PADDING_PREFIX))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        records.push(RefundRecord {
            site: site.clone(),
            file_month: file_month.clone(),
            transaction_date,
            refund_amount,
            refund_category,
            fields,
        });
    }

    debug!(
        file = filename,
        raw = batch.len(),
        refunds = refund_rows,
        retained = records.len(),
        "normalized batch"
    );

    Ok(NormalizeOutcome {
        records,
        columns,
        raw_rows: batch.len(),
        refund_rows,
    })
}

fn contains_keyword(value: Option<&Value>, keyword: &str) -> bool {
    value
        .and_then(Value::as_str)
        .map(|s| s.to_lowercase().contains(keyword))
        .unwrap_or(false)
}

/// First-successful-wins coalesce over the fallback chain
fn resolve_transaction_date(batch: &Table, row: &HashMap<String, Value>) -> Option<NaiveDateTime> {
    DATE_FALLBACK_FIELDS
        .iter()
        .filter(|field| batch.has_column(field))
        .find_map(|field| row.get(*field).and_then(Value::as_str).and_then(parse_datetime))
}

/// Day-first date parsing: 03/04/2025 is 3 April 2025
fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%d/%m/%y", "%Y-%m-%d"];
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Amount: numeric coerce, absolute value, outlier ceiling. Anything
/// unusable is None and the row is dropped by the caller.
fn resolve_refund_amount(
    row: &HashMap<String, Value>,
    has_amount_field: bool,
    config: &CleaningConfig,
) -> Option<f64> {
    if !has_amount_field {
        return None;
    }
    row.get(AMOUNT_FIELD)
        .and_then(Value::as_num)
        .map(f64::abs)
        .filter(|amount| *amount <= config.max_refund_amount)
}

/// Category precedence: accommodation match wins over F&B keywords
fn categorize(value: Option<&Value>) -> RefundCategory {
    let text = match value.and_then(Value::as_str) {
        Some(s) => s.to_lowercase(),
        None => return RefundCategory::Other,
    };

    if text.contains("accomm") {
        RefundCategory::Accommodation
    } else if text.contains("f&b") || text.contains("food") || text.contains("bar") {
        RefundCategory::FoodAndBeverage
    } else {
        RefundCategory::Other
    }
}
