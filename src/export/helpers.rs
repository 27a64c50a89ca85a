//! Helper functions for the workbook export

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

pub const MAX_SHEET_NAME_LEN: usize = 31;

static SHEET_NAME_FORBIDDEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\[\]:*?/\\]").expect("valid sheet name pattern"));
static FILENAME_FORBIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("valid filename pattern"));

/// Local submission time as `YYYY-MM-DD HH:mm:ss`
pub fn format_timestamp(timestamp: DateTime<Utc>, timezone: Tz) -> String {
    timestamp.with_timezone(&timezone).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// First `max` characters of `name` without leading or trailing apostrophes.
/// Trimmed after the cut, since truncation can leave one at the end.
fn fit_sheet_name(name: &str, max: usize) -> String {
    let capped: String = name.chars().take(max).collect();
    capped.trim_matches('\'').to_string()
}

/// Replace characters Excel rejects in sheet names and cap the length
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned = SHEET_NAME_FORBIDDEN.replace_all(name.trim(), "_");
    let fitted = fit_sheet_name(cleaned.trim_matches('\''), MAX_SHEET_NAME_LEN);
    if fitted.is_empty() { "_".to_string() } else { fitted }
}

/// Sanitized name not yet in `used`; Excel compares sheet names
/// case-insensitively
pub fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_sheet_name(name);
    let mut candidate = base.clone();
    let mut n = 2;

    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!("_{}", n);
        let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
        candidate = format!("{}{}", fit_sheet_name(&base, keep), suffix);
        n += 1;
    }

    used.insert(candidate.to_lowercase());
    candidate
}

/// Download file name for a survey export
pub fn export_filename(survey_title: &str, from: Option<NaiveDate>, to: Option<NaiveDate>, today: NaiveDate) -> String {
    let title = FILENAME_FORBIDDEN.replace_all(survey_title.trim(), "_");
    let title = if title.is_empty() { "survey".into() } else { title };

    let period = match (from, to) {
        (None, None) => today.format("%Y%m%d").to_string(),
        (from, to) => format!(
            "{}-{}",
            from.map(|d| d.format("%Y%m%d").to_string()).unwrap_or_default(),
            to.map(|d| d.format("%Y%m%d").to_string()).unwrap_or_default()
        ),
    };

    format!("{}_responses_{}.xlsx", title, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("ward[3]/a:b*c?d\\e"), "ward_3__a_b_c_d_e");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).chars().count(), 31);
        assert_eq!(sanitize_sheet_name("'quoted'"), "quoted");
        assert_eq!(sanitize_sheet_name("''"), "_");
    }

    #[test]
    fn test_sheet_name_never_ends_with_apostrophe_after_cap() {
        let name = format!("{}'bbbb", "a".repeat(30));
        assert_eq!(sanitize_sheet_name(&name), "a".repeat(30));

        // Room for the `_2` suffix cuts right after the apostrophe
        let mut used = HashSet::new();
        let name = format!("{}'cccccc", "d".repeat(28));
        let first = unique_sheet_name(&name, &mut used);
        let second = unique_sheet_name(&name, &mut used);
        assert_eq!(first, format!("{}'cc", "d".repeat(28)));
        assert_eq!(second, format!("{}_2", "d".repeat(28)));
    }

    #[test]
    fn test_unique_sheet_name() {
        let mut used = HashSet::new();
        assert_eq!(unique_sheet_name("ward/3", &mut used), "ward_3");
        assert_eq!(unique_sheet_name("ward:3", &mut used), "ward_3_2");
        assert_eq!(unique_sheet_name("WARD_3", &mut used), "WARD_3_3");

        let long = "y".repeat(40);
        let first = unique_sheet_name(&long, &mut used);
        let second = unique_sheet_name(&long, &mut used);
        assert_eq!(first.chars().count(), 31);
        assert_eq!(second.chars().count(), 31);
        assert!(second.ends_with("_2"));
    }

    #[test]
    fn test_format_timestamp_in_timezone() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 23, 30, 5).unwrap();
        assert_eq!(format_timestamp(ts, chrono_tz::Asia::Seoul), "2024-01-16 08:30:05");
        assert_eq!(format_timestamp(ts, chrono_tz::UTC), "2024-01-15 23:30:05");
    }

    #[test]
    fn test_export_filename() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let from = NaiveDate::from_ymd_opt(2024, 1, 10);
        assert_eq!(export_filename("만족도 / 외래", None, None, today), "만족도 _ 외래_responses_20240301.xlsx");
        assert_eq!(export_filename("Visit", from, None, today), "Visit_responses_20240110-.xlsx");
    }
}
