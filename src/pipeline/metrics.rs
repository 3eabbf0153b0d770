use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::SqriWeights;
use crate::pipeline::assemble::ConsolidatedTable;
use crate::pipeline::normalize::RefundCategory;

/// Headline figures over the whole consolidated table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub refund_count: u64,
    pub total_refund_value: f64,
    pub avg_refund_value: f64,
}

/// Count/sum/mean of refund_amount per (site, file_month)
#[derive(Debug, Clone, Serialize)]
pub struct SiteMonthRow {
    pub site: String,
    pub file_month: String,
    pub refund_count: u64,
    pub total_refund_value: f64,
    pub avg_refund_value: f64,
}

/// Count/sum/mean of refund_amount per (site, refund_category)
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRow {
    pub site: String,
    pub refund_category: RefundCategory,
    pub refund_count: u64,
    pub total_refund_value: f64,
    pub avg_refund_value: f64,
}

/// Daily refund totals per site, ranked by value
#[derive(Debug, Clone, Serialize)]
pub struct PeakDayRow {
    pub site: String,
    pub transaction_date: NaiveDate,
    pub daily_refund_value: f64,
    pub daily_refund_count: u64,
}

/// Sleep Quality Risk Index components and composite score, per site
#[derive(Debug, Clone, Serialize)]
pub struct SqriRow {
    pub site: String,
    pub total_value: f64,
    pub accommodation_value: f64,
    pub accommodation_share_value: f64,
    pub accommodation_avg: f64,
    pub high_value_share: f64,
    pub sqri_score: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Agg {
    count: u64,
    sum: f64,
}

impl Agg {
    fn push(&mut self, amount: f64) {
        self.count += 1;
        self.sum += amount;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Whole-table KPIs. An empty table is defined as zero count/sum/mean,
/// never NaN.
pub fn kpis(table: &ConsolidatedTable) -> Kpis {
    let mut agg = Agg::default();
    for record in &table.records {
        agg.push(record.refund_amount);
    }
    Kpis {
        refund_count: agg.count,
        total_refund_value: agg.sum,
        avg_refund_value: agg.mean(),
    }
}

/// Aggregation keyed by (site, file_month), in key order.
pub fn by_site_month(table: &ConsolidatedTable) -> Vec<SiteMonthRow> {
    let mut groups: BTreeMap<(String, String), Agg> = BTreeMap::new();
    for record in &table.records {
        groups
            .entry((record.site.clone(), record.file_month.clone()))
            .or_default()
            .push(record.refund_amount);
    }

    groups
        .into_iter()
        .map(|((site, file_month), agg)| SiteMonthRow {
            site,
            file_month,
            refund_count: agg.count,
            total_refund_value: agg.sum,
            avg_refund_value: agg.mean(),
        })
        .collect()
}

/// Aggregation keyed by (site, refund_category), in key order.
pub fn category_split(table: &ConsolidatedTable) -> Vec<CategoryRow> {
    let mut groups: BTreeMap<(String, String), (RefundCategory, Agg)> = BTreeMap::new();
    for record in &table.records {
        groups
            .entry((record.site.clone(), record.refund_category.to_string()))
            .or_insert((record.refund_category, Agg::default()))
            .1
            .push(record.refund_amount);
    }

    groups
        .into_iter()
        .map(|((site, _), (refund_category, agg))| CategoryRow {
            site,
            refund_category,
            refund_count: agg.count,
            total_refund_value: agg.sum,
            avg_refund_value: agg.mean(),
        })
        .collect()
}

/// Daily totals per (site, calendar date), descending by value, truncated
/// to the top `top_n`. Rows without a parsable transaction date carry no
/// calendar date and are excluded.
pub fn peak_days(table: &ConsolidatedTable, top_n: usize) -> Vec<PeakDayRow> {
    let mut groups: BTreeMap<(String, NaiveDate), Agg> = BTreeMap::new();
    for record in &table.records {
        if let Some(dt) = record.transaction_date {
            groups
                .entry((record.site.clone(), dt.date()))
                .or_default()
                .push(record.refund_amount);
        }
    }

    let mut rows: Vec<PeakDayRow> = groups
        .into_iter()
        .map(|((site, transaction_date), agg)| PeakDayRow {
            site,
            transaction_date,
            daily_refund_value: agg.sum,
            daily_refund_count: agg.count,
        })
        .collect();

    // Descending by value; the BTreeMap key order already breaks ties
    rows.sort_by(|a, b| {
        b.daily_refund_value
            .partial_cmp(&a.daily_refund_value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(top_n);
    rows
}

#[derive(Debug, Default)]
struct SiteAcc {
    all: Agg,
    accommodation: Agg,
    high_value: u64,
}

/// Sleep Quality Risk Index per site.
///
/// Components: accommodation value share, accommodation average (divided by
/// 100 so its scale is comparable to the two share terms), and the fraction
/// of refunds at or above the high-value threshold. Weighted sum, sorted
/// descending by score.
pub fn sqri(
    table: &ConsolidatedTable,
    weights: &SqriWeights,
    high_value_threshold: f64,
) -> Vec<SqriRow> {
    let mut sites: BTreeMap<String, SiteAcc> = BTreeMap::new();
    for record in &table.records {
        let acc = sites.entry(record.site.clone()).or_default();
        acc.all.push(record.refund_amount);
        if record.refund_category == RefundCategory::Accommodation {
            acc.accommodation.push(record.refund_amount);
        }
        if record.refund_amount >= high_value_threshold {
            acc.high_value += 1;
        }
    }

    let mut rows: Vec<SqriRow> = sites
        .into_iter()
        .map(|(site, acc)| {
            let total_value = acc.all.sum;
            let accommodation_value = acc.accommodation.sum;
            // Guard: an all-zero site scores 0 instead of dividing by zero
            let accommodation_share_value = if total_value != 0.0 {
                accommodation_value / total_value
            } else {
                0.0
            };
            let accommodation_avg = acc.accommodation.mean();
            let high_value_share = acc.high_value as f64 / acc.all.count as f64;

            let sqri_score = accommodation_share_value * weights.accommodation_share_weight
                + (accommodation_avg / 100.0) * weights.accommodation_avg_weight
                + high_value_share * weights.high_value_share_weight;

            SqriRow {
                site,
                total_value,
                accommodation_value,
                accommodation_share_value,
                accommodation_avg,
                high_value_share,
                sqri_score,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.sqri_score
            .partial_cmp(&a.sqri_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}
