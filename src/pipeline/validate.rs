use std::collections::HashMap;

use serde::Serialize;

use crate::pipeline::assemble::ConsolidatedTable;
use crate::pipeline::normalize::RefundRecord;

/// Fields tracked by the null audit
pub const TRACKED_NULL_FIELDS: [&str; 3] = ["transaction_date", "refund_amount", "site"];

/// Key tuple used for duplicate detection
pub const DUPLICATE_KEY_FIELDS: [&str; 4] =
    ["site", "transaction_date", "RECEIPT_NO", "refund_amount"];

/// Audit record of row counts at each pipeline stage. Transparency only;
/// there is no pass/fail semantic here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowCounts {
    pub raw_rows: usize,
    pub refund_rows: usize,
    pub analysis_rows: usize,
}

/// Distribution summary of refund_amount. All NaN when the table is empty,
/// as an "undefined" sentinel rather than an error.
#[derive(Debug, Clone, Serialize)]
pub struct AmountSummary {
    pub min: f64,
    pub p50: f64,
    pub p90: f64,
    pub max: f64,
}

/// Fraction-null per tracked field. `site` and `refund_amount` are
/// structurally non-null after normalization, so anything other than 0.0
/// there points at a pipeline defect.
#[derive(Debug, Clone, Serialize)]
pub struct NullRates {
    pub transaction_date: f64,
    pub refund_amount: f64,
    pub site: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    /// Rows that are members of any duplicate group (every member counts)
    pub duplicate_rows: usize,
    /// Number of distinct key tuples shared by two or more rows
    pub distinct_duplicate_keys: usize,
    /// Key columns absent from the table; when non-zero the check degrades
    /// to reporting zero duplicates instead of failing
    pub missing_key_columns: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub counts: RowCounts,
    pub amount_summary: AmountSummary,
    pub null_rates: NullRates,
    pub duplicates: DuplicateReport,
}

/// Pass the three stage counts through unchanged.
pub fn row_count_reconciliation(
    raw_rows: usize,
    refund_rows: usize,
    analysis_rows: usize,
) -> RowCounts {
    RowCounts {
        raw_rows,
        refund_rows,
        analysis_rows,
    }
}

/// Min/median/p90/max of refund_amount, with pandas-style linear
/// interpolation for the percentiles.
pub fn amount_sanity_checks(table: &ConsolidatedTable) -> AmountSummary {
    let mut amounts: Vec<f64> = table.records.iter().map(|r| r.refund_amount).collect();
    if amounts.is_empty() {
        return AmountSummary {
            min: f64::NAN,
            p50: f64::NAN,
            p90: f64::NAN,
            max: f64::NAN,
        };
    }
    amounts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    AmountSummary {
        min: amounts[0],
        p50: quantile(&amounts, 0.50),
        p90: quantile(&amounts, 0.90),
        max: amounts[amounts.len() - 1],
    }
}

/// Linear-interpolated quantile over an already-sorted slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = rank - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Fraction-null for the tracked fields. Empty table reports 0.0 rates.
pub fn null_audit(table: &ConsolidatedTable) -> NullRates {
    if table.is_empty() {
        return NullRates {
            transaction_date: 0.0,
            refund_amount: 0.0,
            site: 0.0,
        };
    }
    let total = table.len() as f64;
    let null_dates = table
        .records
        .iter()
        .filter(|r| r.transaction_date.is_none())
        .count() as f64;

    NullRates {
        transaction_date: null_dates / total,
        // Both fields are structurally present on every record
        refund_amount: 0.0,
        site: 0.0,
    }
}

/// Duplicate detection over (site, transaction_date, RECEIPT_NO,
/// refund_amount). Two null transaction dates compare equal for keying
/// purposes. A missing key column degrades the check to a zero report.
pub fn duplicate_check(table: &ConsolidatedTable) -> DuplicateReport {
    // site/transaction_date/refund_amount are derived and always present;
    // RECEIPT_NO is a passthrough column that may be absent
    let missing_key_columns = usize::from(!table.has_column("RECEIPT_NO"));
    if missing_key_columns > 0 {
        return DuplicateReport {
            duplicate_rows: 0,
            distinct_duplicate_keys: 0,
            missing_key_columns,
        };
    }

    let mut groups: HashMap<(String, String, String, u64), usize> = HashMap::new();
    for record in &table.records {
        *groups.entry(duplicate_key(record)).or_insert(0) += 1;
    }

    let mut duplicate_rows = 0;
    let mut distinct_duplicate_keys = 0;
    for size in groups.values() {
        if *size >= 2 {
            duplicate_rows += size;
            distinct_duplicate_keys += 1;
        }
    }

    DuplicateReport {
        duplicate_rows,
        distinct_duplicate_keys,
        missing_key_columns: 0,
    }
}

fn duplicate_key(record: &RefundRecord) -> (String, String, String, u64) {
    let date = record
        .transaction_date
        .map(|d| d.to_string())
        .unwrap_or_default();
    let receipt = match record.fields.get("RECEIPT_NO") {
        Some(value) => match value.as_str() {
            Some(s) => s.to_string(),
            None => value.as_num().map(|n| n.to_string()).unwrap_or_default(),
        },
        None => String::new(),
    };
    (
        record.site.clone(),
        date,
        receipt,
        record.refund_amount.to_bits(),
    )
}

/// Run every check and assemble the report. Never fails; findings are for
/// a human or a downstream gate to act on.
pub fn validate_dataset(table: &ConsolidatedTable) -> ValidationReport {
    ValidationReport {
        counts: row_count_reconciliation(table.raw_rows, table.refund_rows, table.len()),
        amount_summary: amount_sanity_checks(table),
        null_rates: null_audit(table),
        duplicates: duplicate_check(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::{RefundCategory, RefundRecord};
    use crate::table::Value;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn record(site: &str, day: Option<u32>, receipt: &str, amount: f64) -> RefundRecord {
        let mut fields = HashMap::new();
        if !receipt.is_empty() {
            fields.insert("RECEIPT_NO".to_string(), Value::Str(receipt.to_string()));
        }
        RefundRecord {
            site: site.to_string(),
            file_month: "Nov-2025".to_string(),
            transaction_date: day.and_then(|d| {
                NaiveDate::from_ymd_opt(2025, 11, d).unwrap().and_hms_opt(0, 0, 0)
            }),
            refund_amount: amount,
            refund_category: RefundCategory::Other,
            fields,
        }
    }

    fn table_with(records: Vec<RefundRecord>, columns: &[&str]) -> ConsolidatedTable {
        let analysis = records.len();
        ConsolidatedTable {
            records,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            raw_rows: analysis + 3,
            refund_rows: analysis + 1,
        }
    }

    #[test]
    fn test_row_counts_pass_through() {
        let counts = row_count_reconciliation(100, 12, 10);
        assert_eq!(
            counts,
            RowCounts {
                raw_rows: 100,
                refund_rows: 12,
                analysis_rows: 10,
            }
        );
    }

    #[test]
    fn test_amount_summary_empty_table_is_nan() {
        let summary = amount_sanity_checks(&table_with(vec![], &[]));
        assert!(summary.min.is_nan());
        assert!(summary.p50.is_nan());
        assert!(summary.p90.is_nan());
        assert!(summary.max.is_nan());
    }

    #[test]
    fn test_amount_summary_interpolates_percentiles() {
        let records = (1..=5)
            .map(|i| record("Brighton", Some(i), "", i as f64 * 10.0))
            .collect();
        let summary = amount_sanity_checks(&table_with(records, &[]));
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.p50, 30.0);
        // rank 0.9 * 4 = 3.6 between 40 and 50
        assert!((summary.p90 - 46.0).abs() < 1e-9);
        assert_eq!(summary.max, 50.0);
    }

    #[test]
    fn test_null_audit_counts_missing_dates_only() {
        let records = vec![
            record("Brighton", Some(1), "", 10.0),
            record("Brighton", None, "", 20.0),
        ];
        let rates = null_audit(&table_with(records, &[]));
        assert_eq!(rates.transaction_date, 0.5);
        assert_eq!(rates.refund_amount, 0.0);
        assert_eq!(rates.site, 0.0);
    }

    #[test]
    fn test_duplicate_pair_counts_both_members() {
        let records = vec![
            record("Brighton", Some(1), "R-100", 45.5),
            record("Brighton", Some(1), "R-100", 45.5),
            // Shares site and date only
            record("Brighton", Some(1), "R-200", 45.5),
        ];
        let report = duplicate_check(&table_with(records, &["RECEIPT_NO"]));
        assert_eq!(report.duplicate_rows, 2);
        assert_eq!(report.distinct_duplicate_keys, 1);
        assert_eq!(report.missing_key_columns, 0);
    }

    #[test]
    fn test_duplicate_check_null_dates_compare_equal() {
        let records = vec![
            record("Brighton", None, "R-100", 45.5),
            record("Brighton", None, "R-100", 45.5),
        ];
        let report = duplicate_check(&table_with(records, &["RECEIPT_NO"]));
        assert_eq!(report.duplicate_rows, 2);
        assert_eq!(report.distinct_duplicate_keys, 1);
    }

    #[test]
    fn test_duplicate_check_degrades_without_receipt_column() {
        let records = vec![
            record("Brighton", Some(1), "", 45.5),
            record("Brighton", Some(1), "", 45.5),
        ];
        let report = duplicate_check(&table_with(records, &[]));
        assert_eq!(
            report,
            DuplicateReport {
                duplicate_rows: 0,
                distinct_duplicate_keys: 0,
                missing_key_columns: 1,
            }
        );
    }

    #[test]
    fn test_validate_dataset_assembles_all_checks() {
        let records = vec![record("Brighton", Some(1), "R-1", 45.5)];
        let report = validate_dataset(&table_with(records, &["RECEIPT_NO"]));
        assert_eq!(report.counts.raw_rows, 4);
        assert_eq!(report.counts.refund_rows, 2);
        assert_eq!(report.counts.analysis_rows, 1);
        assert_eq!(report.amount_summary.min, 45.5);
        assert_eq!(report.duplicates.duplicate_rows, 0);
    }
}
