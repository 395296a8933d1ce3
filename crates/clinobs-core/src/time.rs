use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// An instant on the wire, always held in UTC.
///
/// Inbound values are accepted in several shapes (see [`FhirDateTime::parse_lenient`]);
/// outbound values are always RFC 3339 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FhirDateTime(pub OffsetDateTime);

impl FhirDateTime {
    pub fn new(datetime: OffsetDateTime) -> Self {
        Self(datetime.to_offset(UtcOffset::UTC))
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn timestamp(&self) -> i64 {
        self.0.unix_timestamp()
    }

    /// Parse any of the accepted textual forms:
    ///
    /// - RFC 3339 date-time (`2023-05-15T14:30:00+02:00`)
    /// - local date-time without offset, taken as UTC (`2023-05-15T14:30:00`)
    /// - calendar date, year-month or bare year, taken as the start of that
    ///   period in UTC (`2023-05-15`, `2023-05`, `2023`)
    ///
    /// The UTC result must fall in years 0000-9999, the range RFC 3339 can
    /// write back out.
    pub fn parse_lenient(s: &str) -> Result<Self> {
        if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
            return Self::representable(dt, s);
        }

        let local = format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
        );
        if let Ok(dt) = PrimitiveDateTime::parse(s, local) {
            return Self::representable(dt.assume_utc(), s);
        }

        let date = parse_partial_date(s)
            .ok_or_else(|| CoreError::invalid_date_time(format!("Failed to parse date '{s}'")))?;
        Self::representable(date.midnight().assume_utc(), s)
    }

    /// Milliseconds since the Unix epoch, limited like [`FhirDateTime::parse_lenient`].
    pub fn from_unix_millis(millis: i64) -> Result<Self> {
        let nanos = i128::from(millis) * 1_000_000;
        let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|e| {
            CoreError::invalid_date_time(format!("Invalid Unix timestamp millis {millis}: {e}"))
        })?;
        Self::representable(datetime, millis)
    }

    fn representable(datetime: OffsetDateTime, input: impl fmt::Display) -> Result<Self> {
        datetime
            .checked_to_offset(UtcOffset::UTC)
            .filter(|utc| RFC3339_YEARS.contains(&utc.year()))
            .map(Self)
            .ok_or_else(|| {
                CoreError::invalid_date_time(format!("'{input}' lies outside years 0000-9999"))
            })
    }
}

const RFC3339_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

fn parse_partial_date(s: &str) -> Option<Date> {
    if !s.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        return None;
    }
    match s.len() {
        4 => {
            let year: i32 = s.parse().ok()?;
            Date::from_calendar_date(year, Month::January, 1).ok()
        }
        7 => {
            let (year, month) = s.split_once('-')?;
            let year: i32 = year.parse().ok()?;
            let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
            Date::from_calendar_date(year, month, 1).ok()
        }
        10 => Date::parse(s, format_description!("[year]-[month]-[day]")).ok(),
        _ => None,
    }
}

impl fmt::Display for FhirDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self
            .0
            .to_offset(UtcOffset::UTC)
            .format(&Rfc3339)
            .map_err(|_| fmt::Error)?;
        write!(f, "{formatted}")
    }
}

impl FromStr for FhirDateTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let datetime = OffsetDateTime::parse(s, &Rfc3339).map_err(|e| {
            CoreError::invalid_date_time(format!("Failed to parse FHIR DateTime '{s}': {e}"))
        })?;
        Self::representable(datetime, s)
    }
}

impl Serialize for FhirDateTime {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = self
            .0
            .to_offset(UtcOffset::UTC)
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

impl<'de> Deserialize<'de> for FhirDateTime {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FhirDateTime::from_str(&s).map_err(serde::de::Error::custom)
    }
}

pub fn now_utc() -> FhirDateTime {
    FhirDateTime(OffsetDateTime::now_utc())
}
