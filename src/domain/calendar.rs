//! Calendar-day arithmetic in the service's operating zone.
//!
//! Every "today" and "same day" decision in the crate goes through this
//! module. The zone is configured once for the service and is never taken
//! from a caller.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, Month, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

/// Fixed UTC offset in which calendar days are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingZone(FixedOffset);

impl OperatingZone {
    /// IST, the zone the laundry service operates in.
    pub fn kolkata() -> Self {
        // 5h30m east of UTC is always in range.
        Self(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap_or_else(utc_offset))
    }

    pub fn utc() -> Self {
        Self(utc_offset())
    }

    pub fn from_offset(offset: FixedOffset) -> Self {
        Self(offset)
    }

    pub fn offset(&self) -> FixedOffset {
        self.0
    }

    /// Calendar date of `instant` in this zone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// The instant at which `date` begins in this zone.
    pub fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(NaiveTime::MIN);
        // A fixed offset never produces gaps or folds.
        match self.0.from_local_datetime(&naive).single() {
            Some(dt) => dt.with_timezone(&Utc),
            None => naive.and_utc(),
        }
    }
}

impl Default for OperatingZone {
    fn default() -> Self {
        Self::kolkata()
    }
}

impl fmt::Display for OperatingZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OperatingZone {
    type Err = ParseZoneError;

    /// Accepts "UTC", "Z", "+05:30", "-0300" or "+7".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(Self::utc());
        }

        let (sign, rest) = match s.as_bytes().first() {
            Some(b'+') => (1, &s[1..]),
            Some(b'-') => (-1, &s[1..]),
            _ => return Err(ParseZoneError(s.to_string())),
        };

        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseZoneError(s.to_string()));
        }

        let (hours, minutes) = match digits.len() {
            1 | 2 => (digits.as_str(), "0"),
            3 => (&digits[..1], &digits[1..]),
            4 => (&digits[..2], &digits[2..]),
            _ => return Err(ParseZoneError(s.to_string())),
        };
        let hours: i32 = hours.parse().map_err(|_| ParseZoneError(s.to_string()))?;
        let minutes: i32 = minutes.parse().map_err(|_| ParseZoneError(s.to_string()))?;
        if minutes >= 60 {
            return Err(ParseZoneError(s.to_string()));
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self)
            .ok_or_else(|| ParseZoneError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid operating zone '{0}', expected UTC or an offset such as +05:30")]
pub struct ParseZoneError(String);

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

pub fn is_same_calendar_day(a: DateTime<Utc>, b: DateTime<Utc>, zone: OperatingZone) -> bool {
    zone.local_date(a) == zone.local_date(b)
}

pub fn is_today(date: DateTime<Utc>, now: DateTime<Utc>, zone: OperatingZone) -> bool {
    is_same_calendar_day(date, now, zone)
}

/// English name of the month `now` falls in, e.g. "May".
pub fn month_name(now: DateTime<Utc>, zone: OperatingZone) -> &'static str {
    let month = now.with_timezone(&zone.offset()).month();
    Month::try_from(month as u8)
        .map(|m| m.name())
        .unwrap_or("Unknown")
}

/// Parse either a plain `YYYY-MM-DD` (local midnight in `zone`) or an
/// RFC 3339 timestamp.
pub fn parse_day_or_instant(input: &str, zone: OperatingZone) -> Result<DateTime<Utc>, ParseDateError> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(zone.local_midnight(date));
    }
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ParseDateError(input.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date '{0}', expected YYYY-MM-DD or an RFC 3339 timestamp")]
pub struct ParseDateError(String);
