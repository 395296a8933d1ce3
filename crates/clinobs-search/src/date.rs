//! Date search over the scalar effective time of an Observation.
//!
//! The value of `date` is `<prefix><literal>`. The literal is widened to the
//! range implied by its precision:
//! - Year: 2023 -> [2023-01-01, 2024-01-01)
//! - Month: 2023-01 -> [2023-01-01, 2023-02-01)
//! - Day: 2023-01-15 -> [2023-01-15, 2023-01-16)
//! - DateTime: [instant, instant + 1s)
//!
//! and compared against `effectiveDateTime` or `effectiveDate`:
//! - eq: within the range
//! - ne: outside the range
//! - gt / sa: at or after the end
//! - lt / eb: before the start
//! - ge: at or after the start
//! - le: before the end
//! - ap: within the range widened by 10% on each side
//!
//! Observations whose effective time is a period, or absent, never match.

use crate::error::QueryError;
use crate::parameters::SearchPrefix;
use clinobs_core::{EffectiveTime, FhirDateTime};
use clinobs_storage::{CompareOp, DocumentFilter};
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time};

/// Scalar effective fields searched by `date`, as stored in documents.
pub const SCALAR_EFFECTIVE_FIELDS: [&str; 2] = [EffectiveTime::DATE_TIME, EffectiveTime::DATE];

/// Half-open range `[start, end)` implied by a date literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

/// Split `ge2023-01-01` into its prefix and literal.
///
/// A value that starts with a digit has no prefix and means `eq`. Any other
/// two leading characters must be a known prefix.
pub fn split_prefix(value: &str) -> Result<(SearchPrefix, &str), QueryError> {
    if value.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok((SearchPrefix::Eq, value));
    }
    let Some((head, rest)) = value.split_at_checked(2) else {
        return Err(QueryError::UnknownPrefix(value.to_string()));
    };
    let prefix = SearchPrefix::parse(head).ok_or_else(|| QueryError::UnknownPrefix(head.to_string()))?;
    Ok((prefix, rest))
}

fn invalid(message: impl Into<String>) -> QueryError {
    QueryError::invalid_value("date", message)
}

fn midnight(date: Date) -> OffsetDateTime {
    date.with_time(Time::MIDNIGHT).assume_utc()
}

/// Parse a date literal into a range based on its precision.
pub fn parse_date_range(date_str: &str) -> Result<DateRange, QueryError> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return Err(invalid("missing date"));
    }

    // Year only: 2023
    if trimmed.len() == 4 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = trimmed
            .parse()
            .map_err(|_| invalid(format!("Invalid year: {trimmed}")))?;
        let start = Date::from_calendar_date(year, Month::January, 1)
            .map_err(|e| invalid(format!("Invalid date: {e}")))?;
        let end = Date::from_calendar_date(year + 1, Month::January, 1)
            .map_err(|e| invalid(format!("Invalid date: {e}")))?;
        return Ok(DateRange {
            start: midnight(start),
            end: midnight(end),
        });
    }

    // Year-Month: 2023-01
    if trimmed.len() == 7 && trimmed.chars().nth(4) == Some('-') {
        let (year, month) = trimmed
            .split_once('-')
            .ok_or_else(|| invalid(format!("Invalid month: {trimmed}")))?;
        let year: i32 = year
            .parse()
            .map_err(|_| invalid(format!("Invalid year: {year}")))?;
        let month_num: u8 = month
            .parse()
            .map_err(|_| invalid(format!("Invalid month: {month}")))?;
        let month = Month::try_from(month_num)
            .map_err(|_| invalid(format!("Invalid month number: {month_num}")))?;

        let start = Date::from_calendar_date(year, month, 1)
            .map_err(|e| invalid(format!("Invalid date: {e}")))?;
        let end = if month == Month::December {
            Date::from_calendar_date(year + 1, Month::January, 1)
        } else {
            Date::from_calendar_date(year, month.next(), 1)
        }
        .map_err(|e| invalid(format!("Invalid date: {e}")))?;

        return Ok(DateRange {
            start: midnight(start),
            end: midnight(end),
        });
    }

    // Full date: 2023-01-15
    if trimmed.len() == 10 && !trimmed.contains('T') {
        let date = Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
            .map_err(|e| invalid(format!("Invalid date: {e}")))?;
        let next = date
            .next_day()
            .ok_or_else(|| invalid(format!("No day follows {trimmed}")))?;
        return Ok(DateRange {
            start: midnight(date),
            end: midnight(next),
        });
    }

    parse_datetime_range(trimmed)
}

fn parse_datetime_range(dt_str: &str) -> Result<DateRange, QueryError> {
    if !dt_str.contains('T') {
        return Err(invalid(format!("Unrecognized date format: {dt_str}")));
    }

    let start = match FhirDateTime::parse_lenient(dt_str) {
        Ok(dt) => dt.into_inner(),
        // 2023-01-15T10:30
        Err(_) => PrimitiveDateTime::parse(
            dt_str,
            format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        )
        .map_err(|e| invalid(format!("Invalid datetime: {e}")))?
        .assume_utc(),
    };

    let end = start
        .checked_add(Duration::SECOND)
        .ok_or_else(|| invalid(format!("No instant follows {dt_str}")))?;
    Ok(DateRange { start, end })
}

impl DateRange {
    /// The range grown by a tenth of its length on each side, for `ap`.
    pub fn widened(&self) -> Result<DateRange, QueryError> {
        let expansion = (self.end - self.start) / 10;
        match (
            self.start.checked_sub(expansion),
            self.end.checked_add(expansion),
        ) {
            (Some(start), Some(end)) => Ok(DateRange { start, end }),
            _ => Err(invalid("Approximate range runs past the supported dates")),
        }
    }
}

fn compare(path: &str, op: CompareOp, instant: OffsetDateTime) -> DocumentFilter {
    DocumentFilter::compare(path, op, FhirDateTime::new(instant))
}

fn within(path: &str, start: OffsetDateTime, end: OffsetDateTime) -> DocumentFilter {
    DocumentFilter::and(vec![
        compare(path, CompareOp::Ge, start),
        compare(path, CompareOp::Lt, end),
    ])
}

fn field_condition(path: &str, prefix: SearchPrefix, range: &DateRange) -> DocumentFilter {
    match prefix {
        SearchPrefix::Ne => DocumentFilter::and(vec![
            DocumentFilter::exists(path),
            DocumentFilter::not(within(path, range.start, range.end)),
        ]),
        SearchPrefix::Gt | SearchPrefix::Sa => compare(path, CompareOp::Ge, range.end),
        SearchPrefix::Lt | SearchPrefix::Eb => compare(path, CompareOp::Lt, range.start),
        SearchPrefix::Ge => compare(path, CompareOp::Ge, range.start),
        SearchPrefix::Le => compare(path, CompareOp::Lt, range.end),
        SearchPrefix::Eq | SearchPrefix::Ap => within(path, range.start, range.end),
    }
}

/// Translate a full `date` parameter value into a store filter.
pub fn date_filter(value: &str) -> Result<DocumentFilter, QueryError> {
    let (prefix, literal) = split_prefix(value)?;
    let mut range = parse_date_range(literal)?;
    if prefix == SearchPrefix::Ap {
        range = range.widened()?;
    }
    tracing::trace!(%prefix, ?range, "date search range");

    Ok(DocumentFilter::or(
        SCALAR_EFFECTIVE_FIELDS
            .iter()
            .map(|field| field_condition(field, prefix, &range))
            .collect(),
    ))
}
