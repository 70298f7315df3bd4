//! Date helper functions

use chrono::{DateTime, Locale, TimeZone};

/// Format a date using a Moment.js-compatible format string in the given
/// locale
///
/// # Examples
/// ```ignore
/// format_date(&date, "D MMM YYYY", Locale::pt_BR) // -> "25 mar 2021"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str, locale: Locale) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    date.format_localized(&chrono_format, locale).to_string()
}

/// Format an optional date; absent dates render as an empty string
pub fn format_optional_date<Tz: TimeZone>(
    date: Option<&DateTime<Tz>>,
    format: &str,
    locale: Locale,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.map(|d| format_date(d, format, locale))
        .unwrap_or_default()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

/// Resolve a language tag such as `pt-BR` to a chrono locale, falling
/// back to POSIX for unknown tags
pub fn locale_for(language: &str) -> Locale {
    let tag = language.replace('-', "_");
    Locale::try_from(tag.as_str()).unwrap_or_else(|_| {
        if !language.is_empty() {
            tracing::warn!("Unknown language '{}', using POSIX date names", language);
        }
        Locale::POSIX
    })
}

/// Moment.js tokens and their chrono equivalents, longest first
const MOMENT_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("yyyy", "%Y"),
    ("MMMM", "%B"),
    ("DDDD", "%j"),
    ("dddd", "%A"),
    ("MMM", "%b"),
    ("DDD", "%-j"),
    ("ddd", "%a"),
    ("SSS", "%3f"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("ZZ", "%z"),
    ("D", "%-d"),
    ("M", "%-m"),
    ("H", "%-H"),
];

/// Convert Moment.js format to chrono format. The format is scanned once,
/// so replacement output is never matched again; `[...]` is literal text.
fn moment_to_chrono_format(format: &str) -> String {
    let mut result = String::with_capacity(format.len() * 2);
    let mut rest = format;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(end) = rest.find(']') {
                push_literal(&mut result, &rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
        }

        match MOMENT_TOKENS
            .iter()
            .find(|(token, _)| rest.starts_with(token))
        {
            Some((token, chrono)) => {
                result.push_str(chrono);
                rest = &rest[token.len()..];
            }
            None => {
                push_literal(&mut result, &rest[..c.len_utf8()]);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    result
}

fn push_literal(result: &mut String, text: &str) {
    result.push_str(&text.replace('%', "%%"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_format_date_pt_br() {
        let date = Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap();
        assert_eq!(format_date(&date, "D MMM YYYY", Locale::pt_BR), "25 mar 2021");
        assert_eq!(format_date(&date, "YYYY-MM-DD", Locale::pt_BR), "2021-03-25");
    }

    #[test]
    fn test_single_digit_day() {
        let date = Utc.with_ymd_and_hms(2021, 4, 5, 10, 0, 0).unwrap();
        assert_eq!(format_date(&date, "D MMM YYYY", Locale::en_US), "5 Apr 2021");
    }

    #[test]
    fn test_timezone_shifts_day() {
        let date = Utc.with_ymd_and_hms(2021, 3, 25, 1, 0, 0).unwrap();
        let sao_paulo = FixedOffset::west_opt(3 * 3600).unwrap();
        let local = date.with_timezone(&sao_paulo);
        assert_eq!(format_date(&local, "D MMM YYYY", Locale::pt_BR), "24 mar 2021");
    }

    #[test]
    fn test_optional_date() {
        let none: Option<&DateTime<Utc>> = None;
        assert_eq!(format_optional_date(none, "D MMM YYYY", Locale::pt_BR), "");
    }

    #[test]
    fn test_locale_for() {
        assert_eq!(locale_for("pt-BR"), Locale::pt_BR);
        assert_eq!(locale_for("en_US"), Locale::en_US);
        assert_eq!(locale_for("klingon"), Locale::POSIX);
    }

    #[test]
    fn test_moment_to_chrono() {
        assert_eq!(moment_to_chrono_format("YYYY-MM-DD"), "%Y-%m-%d");
        assert_eq!(moment_to_chrono_format("D MMM yyyy"), "%-d %b %Y");
        assert_eq!(moment_to_chrono_format("HH:mm:ss"), "%H:%M:%S");
    }

    #[test]
    fn test_moment_tokens_are_not_rescanned() {
        assert_eq!(moment_to_chrono_format("DDD"), "%-j");
        assert_eq!(moment_to_chrono_format("DDDD/YYYY"), "%j/%Y");
        assert_eq!(moment_to_chrono_format("D [de] MMMM"), "%-d de %B");
        assert_eq!(moment_to_chrono_format("100% D"), "100%% %-d");

        let date = Utc.with_ymd_and_hms(2021, 2, 3, 10, 0, 0).unwrap();
        assert_eq!(format_date(&date, "DDD", Locale::pt_BR), "34");
        assert_eq!(
            format_date(&date, "D [de] MMMM", Locale::pt_BR),
            "3 de fevereiro"
        );
    }
}
