use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

/// Treats empty and whitespace-only parameters as absent.
pub(crate) fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

pub(crate) fn coerce_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn parse_object_id(raw: &str) -> Option<ObjectId> {
    ObjectId::parse_str(raw.trim()).ok()
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub(crate) fn is_date_only(raw: &str) -> bool {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").is_ok()
}

pub(crate) fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(
            ch,
            '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Accepts JSON numbers or numeric strings, as browser forms submit either.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(value)) => Ok(Some(value)),
        Some(NumberOrText::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(text)) => coerce_f64(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("'{text}' is not a number"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_accept_dates_and_rfc3339() {
        assert_eq!(
            parse_timestamp("2025-02-01"),
            Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2025-02-01T10:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2025, 2, 1, 8, 30, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn lenient_numbers_accept_strings() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default, deserialize_with = "lenient_f64")]
            gpa: Option<f64>,
        }

        let body: Body = serde_json::from_str(r#"{"gpa":"3.4"}"#).expect("string coerces");
        assert_eq!(body.gpa, Some(3.4));
        let body: Body = serde_json::from_str(r#"{"gpa":3}"#).expect("number parses");
        assert_eq!(body.gpa, Some(3.0));
        let body: Body = serde_json::from_str(r#"{}"#).expect("missing is none");
        assert_eq!(body.gpa, None);
        assert!(serde_json::from_str::<Body>(r#"{"gpa":"high"}"#).is_err());
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        assert_eq!(escape_regex("a.b+c"), "a\\.b\\+c");
    }
}
