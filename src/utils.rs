//! Normalization helpers shared by the extractors, the enricher and the
//! feed assembler.
//!
//! - URL resolution against a source's base URL
//! - Free-text and attribute date parsing into UTC instants
//! - Reading-time estimation
//! - String truncation and whitespace cleanup
//! - Data directory validation

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Average adult silent-reading speed used for reading-time estimates.
pub const WORDS_PER_MINUTE: f64 = 238.0;

static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b",
    )
    .unwrap()
});

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+(\d{4})\b",
    )
    .unwrap()
});

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

/// Resolve a possibly-relative href against `base_url`.
///
/// Absolute URLs are returned unchanged, empty or missing input yields `None`,
/// and anything that cannot be joined onto the base also yields `None`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     resolve_url(Some("/blog/post"), "https://claude.com/blog"),
///     Some("https://claude.com/blog/post".to_string())
/// );
/// assert_eq!(resolve_url(None, "https://claude.com"), None);
/// ```
pub fn resolve_url(href: Option<&str>, base_url: &str) -> Option<String> {
    let href = href?;
    if href.is_empty() {
        return None;
    }
    if Url::parse(href).is_ok() {
        return Some(href.to_string());
    }
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// Parse a date from a `datetime` attribute or visible text.
///
/// Accepts RFC 3339, RFC 2822, ISO dates and datetimes, and English
/// month-name dates such as `Feb 05, 2026` or `12 January 2026`, including
/// when they are embedded in a longer metadata string. Dates without a time
/// are taken as midnight UTC. Anything else is `None`.
pub fn parse_date(text: Option<&str>) -> Option<DateTime<Utc>> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return midnight_utc(date);
        }
    }

    if let Some(caps) = MONTH_DAY_YEAR.captures(text) {
        let date = date_from_parts(&caps[1], &caps[2], &caps[3]);
        if date.is_some() {
            return date;
        }
    }
    if let Some(caps) = DAY_MONTH_YEAR.captures(text) {
        let date = date_from_parts(&caps[2], &caps[1], &caps[3]);
        if date.is_some() {
            return date;
        }
    }
    if let Some(caps) = ISO_DATE.captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).and_then(midnight_utc);
    }

    None
}

fn date_from_parts(month: &str, day: &str, year: &str) -> Option<DateTime<Utc>> {
    let month = month_number(month)?;
    let day: u32 = day.parse().ok()?;
    let year: i32 = year.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).and_then(midnight_utc)
}

fn midnight_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

fn month_number(prefix: &str) -> Option<u32> {
    let month = match prefix.to_ascii_lowercase().get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Estimate reading time in whole minutes, never less than one.
///
/// `max(1, round(words / 238))`, so empty text also reports one minute.
pub fn estimate_reading_time(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    let minutes = (words as f64 / WORDS_PER_MINUTE).round() as u32;
    minutes.max(1)
}

/// Keep at most `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let kept = truncate_chars(s, max);
    if kept.len() == s.len() {
        kept
    } else {
        format!("{}…(+{} bytes)", kept, s.len() - kept.len())
    }
}

/// Capitalize the first character of a string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(upcase("seattletimes"), "Seattletimes");
/// assert_eq!(upcase(""), "");
/// ```
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Data directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_resolve_url_relative() {
        assert_eq!(
            resolve_url(Some("/engineering/post"), "https://www.anthropic.com"),
            Some("https://www.anthropic.com/engineering/post".to_string())
        );
        assert_eq!(
            resolve_url(Some("trade-deadline/"), "https://www.seattletimes.com/sports/mariners/"),
            Some("https://www.seattletimes.com/sports/mariners/trade-deadline/".to_string())
        );
    }

    #[test]
    fn test_resolve_url_absolute_is_unchanged() {
        let abs = "https://cdn.example.com/Images/A.PNG?x=1";
        assert_eq!(resolve_url(Some(abs), "https://other.org"), Some(abs.to_string()));
        let resolved = resolve_url(Some("/a/b"), "https://example.com").unwrap();
        assert_eq!(resolve_url(Some(&resolved), "https://x.org"), Some(resolved));
    }

    #[test]
    fn test_resolve_url_empty_or_missing() {
        assert_eq!(resolve_url(None, "https://example.com"), None);
        assert_eq!(resolve_url(Some(""), "https://example.com"), None);
        assert_eq!(resolve_url(Some("/x"), "not a base"), None);
    }

    #[test]
    fn test_parse_date_rfc3339() {
        let dt = parse_date(Some("2025-06-15T10:00:00-07:00")).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-06-15T17:00:00+00:00");
    }

    #[test]
    fn test_parse_date_iso_date_only() {
        let dt = parse_date(Some("2026-01-21")).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2026, 1, 21));
    }

    #[test]
    fn test_parse_date_month_names() {
        let dt = parse_date(Some("Feb 05, 2026")).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2026, 2, 5));
        let dt = parse_date(Some("January 12, 2026")).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2026, 1, 12));
        let dt = parse_date(Some("12 Sept. 2025")).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 9, 12));
    }

    #[test]
    fn test_parse_date_embedded_in_metadata() {
        let dt = parse_date(Some("Research · Published Jan 28, 2026 · 5 min")).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2026, 1, 28));
    }

    #[test]
    fn test_parse_date_rfc2822() {
        let dt = parse_date(Some("Sun, 15 Jun 2025 10:00:00 GMT")).unwrap();
        assert_eq!(dt.month(), 6);
    }

    #[test]
    fn test_parse_date_unknown() {
        assert_eq!(parse_date(None), None);
        assert_eq!(parse_date(Some("   ")), None);
        assert_eq!(parse_date(Some("yesterday-ish")), None);
        assert_eq!(parse_date(Some("Feb 31, 2026")), None);
    }

    #[test]
    fn test_estimate_reading_time_reference_points() {
        assert_eq!(estimate_reading_time(&vec!["word"; 238].join(" ")), 1);
        assert_eq!(estimate_reading_time(&vec!["word"; 476].join(" ")), 2);
        assert_eq!(estimate_reading_time(&vec!["word"; 1000].join(" ")), 4);
        assert_eq!(estimate_reading_time(""), 1);
        assert_eq!(estimate_reading_time("Short article."), 1);
    }

    #[test]
    fn test_estimate_reading_time_monotonic() {
        let mut last = 0;
        for n in (0..3000).step_by(37) {
            let minutes = estimate_reading_time(&vec!["w"; n].join(" "));
            assert!(minutes >= last);
            assert!(minutes >= 1);
            last = minutes;
        }
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars(&"é".repeat(300), 200).chars().count(), 200);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("\n   Some  Long\tTitle \n"), "Some Long Title");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_upcase() {
        assert_eq!(upcase("seattletimes"), "Seattletimes");
        assert_eq!(upcase("a"), "A");
        assert_eq!(upcase(""), "");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 0);
    }
}
