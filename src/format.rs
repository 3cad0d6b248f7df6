//! Text-safety and date helpers shared by the list pane and the editor.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use unicode_width::UnicodeWidthChar;

/// The server encodes "no date" as the zero `time.Time`, `0001-01-01T00:00:00Z`.
pub fn is_unset(date: &DateTime<Utc>) -> bool {
    date.year() <= 1
}

/// Treat zero-sentinel dates the same as absent ones.
pub fn effective_date(date: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    date.filter(|d| !is_unset(d))
}

pub fn format_date(date: Option<DateTime<Utc>>, unset: &str) -> String {
    effective_date(date)
        .map(|d| d.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| unset.to_string())
}

pub fn format_timestamp(date: Option<DateTime<Utc>>) -> Option<String> {
    effective_date(date).map(|d| d.format("%b %d, %Y %H:%M").to_string())
}

/// `YYYY-MM-DD` for seeding a date input; empty when unset.
pub fn date_input_value(date: Option<DateTime<Utc>>) -> String {
    effective_date(date)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Validate a date input. Empty input means "omit the field".
pub fn parse_date_input(input: &str) -> Result<Option<String>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|d| Some(d.format("%Y-%m-%d").to_string()))
        .map_err(|_| format!("Invalid date '{trimmed}'. Use YYYY-MM-DD."))
}

/// Strip control characters so server text cannot drive the terminal.
/// Newlines survive; tabs become spaces.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter_map(|ch| match ch {
            '\n' => Some('\n'),
            '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// `sanitize` plus newline folding, for one-line cells.
pub fn single_line(input: &str) -> String {
    sanitize(input).replace('\n', " ")
}

/// Cut `input` to at most `width` display columns, marking the cut with `…`.
pub fn truncate(input: &str, width: usize) -> String {
    let total: usize = input.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= width {
        return input.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in input.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn zero_sentinel_date_is_unset() {
        let zero: DateTime<Utc> = "0001-01-01T00:00:00Z".parse().unwrap();
        assert!(is_unset(&zero));
        assert_eq!(format_date(Some(zero), "N/A"), "N/A");
        assert_eq!(format_date(None, "Never"), "Never");
        assert_eq!(date_input_value(Some(zero)), "");
        assert_eq!(format_timestamp(Some(zero)), None);
    }

    #[test]
    fn real_dates_format() {
        let d = Utc.with_ymd_and_hms(2026, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(format_date(Some(d), "N/A"), "Mar 09, 2026");
        assert_eq!(format_timestamp(Some(d)).as_deref(), Some("Mar 09, 2026 14:05"));
        assert_eq!(date_input_value(Some(d)), "2026-03-09");
    }

    #[test]
    fn date_input_validation() {
        assert_eq!(parse_date_input("  "), Ok(None));
        assert_eq!(parse_date_input(" 2026-01-05 "), Ok(Some("2026-01-05".into())));
        assert!(parse_date_input("05/01/2026").is_err());
        assert!(parse_date_input("2026-02-30").is_err());
    }

    #[test]
    fn sanitize_drops_escape_sequences() {
        assert_eq!(sanitize("a\x1b[31mred\x07\tb\nc"), "a[31mred b\nc");
        assert_eq!(single_line("one\ntwo"), "one two");
    }

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefgh", 5), "abcd…");
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
    }
}
