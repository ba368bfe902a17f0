//! Coercion module: turns wire-format filter values into typed values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::schema::{EnumDomain, FieldDescriptor};
use crate::types::{FieldKind, Value};
use crate::{QueryError, QueryResult};

/// Coerces `raw` to the kind declared by `field`.
/// Key fields have the value lowercased first.
pub fn coerce<R>(raw: &str, field: &FieldDescriptor<R>) -> QueryResult<Value<'static>> {
    let value = if field.folds_case() {
        coerce_kind(&raw.to_ascii_lowercase(), field.kind(), field.domain())
    } else {
        coerce_kind(raw, field.kind(), field.domain())
    };
    value.ok_or_else(|| QueryError::ValueFormat {
        field: field.name().to_string(),
        raw: raw.to_string(),
        expected: field.kind(),
    })
}

/// Coerces `raw` to `kind`, returning `None` when it does not parse.
///
/// Enum tags accept a member name (ignoring ASCII case) or a declared ordinal. Without a
/// domain any non-negative ordinal is accepted.
pub fn coerce_kind(raw: &str, kind: FieldKind, domain: Option<&EnumDomain>) -> Option<Value<'static>> {
    match kind {
        FieldKind::Text => Some(Value::Text(raw.to_string().into())),
        FieldKind::Number => parse_number(raw).map(Value::Number),
        FieldKind::Boolean => parse_bool(raw).map(Value::Boolean),
        FieldKind::Timestamp => parse_timestamp(raw).map(Value::Timestamp),
        FieldKind::EnumTag => parse_enum_tag(raw, domain).map(Value::EnumTag),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

const NAIVE_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// ISO-8601, read as UTC: RFC 3339 with an offset, a date-time with or without seconds
/// (a trailing `Z` is allowed), or a bare date (midnight).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let local = raw
        .strip_suffix('Z')
        .or_else(|| raw.strip_suffix('z'))
        .unwrap_or(raw);
    if let Some(naive) = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(local, format).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_enum_tag(raw: &str, domain: Option<&EnumDomain>) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(ordinal) = raw.parse::<u32>() {
        return match domain {
            Some(domain) if !domain.contains_ordinal(ordinal) => None,
            _ => Some(ordinal),
        };
    }
    domain.and_then(|domain| domain.ordinal_of(raw))
}
