use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;

use crate::error::{PipelineError, Result};

/// Canonical site spellings, keyed by lowercased filename token.
/// Unmapped tokens are passed through with their original casing.
static SITE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("brighton", "Brighton"),
        ("newheaven", "Newhaven"),
        ("newhaven", "Newhaven"),
    ])
});

/// Month tokens mapped to their canonical period label. The calendar year is
/// a deployment constant (November + December = 2025, January = 2026), not
/// derived from the file.
static MONTH_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("november", "Nov-2025"),
        ("nov", "Nov-2025"),
        ("december", "Dec-2025"),
        ("dec", "Dec-2025"),
        ("january", "Jan-2026"),
        ("jan", "Jan-2026"),
    ])
});

/// Parse a source file name into its (site, period) tags.
///
/// Expected pattern examples:
///   Brighton_November_refund.csv
///   Newheaven_January_refund.csv
pub fn resolve(filename: &str) -> Result<(String, String)> {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());

    let stem = name.strip_suffix(".csv").unwrap_or(&name);
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 2 {
        return Err(PipelineError::format(
            filename,
            "expected at least <site>_<month>",
        ));
    }

    let raw_site = parts[0].trim();
    let raw_month = parts[1].trim().to_lowercase();

    let site = SITE_ALIASES
        .get(raw_site.to_lowercase().as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| raw_site.to_string());

    let file_month = MONTH_LABELS
        .get(raw_month.as_str())
        .map(|m| m.to_string())
        .ok_or_else(|| {
            PipelineError::format(filename, format!("unrecognized month token '{raw_month}'"))
        })?;

    Ok((site, file_month))
}
