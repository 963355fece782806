// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Precision-aware temporal types
//!
//! FHIR dates may be partial (`2020`, `2020-03`). Each value remembers the
//! precision it was written with, and comparisons between values of
//! different precision are only decided when the common prefix differs.
//! Otherwise the result is unknown (`None`), which the evaluator turns into
//! an empty collection.

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Precision levels for temporal values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum TemporalPrecision {
    /// Year precision (YYYY)
    Year,
    /// Month precision (YYYY-MM)
    Month,
    /// Day precision (YYYY-MM-DD)
    Day,
    /// Hour precision (YYYY-MM-DDTHH)
    Hour,
    /// Minute precision (YYYY-MM-DDTHH:MM)
    Minute,
    /// Second precision (YYYY-MM-DDTHH:MM:SS)
    Second,
    /// Millisecond precision (YYYY-MM-DDTHH:MM:SS.sss)
    Millisecond,
}

impl TemporalPrecision {
    /// Number of calendar components significant at this precision
    ///
    /// Seconds and milliseconds count as one level, so `10:00:00` and
    /// `10:00:00.000` compare as equal.
    fn date_components(self) -> usize {
        match self {
            Self::Year => 1,
            Self::Month => 2,
            Self::Day => 3,
            Self::Hour => 4,
            Self::Minute => 5,
            Self::Second | Self::Millisecond => 7,
        }
    }

    fn time_components(self) -> usize {
        match self {
            Self::Year | Self::Month | Self::Day | Self::Hour => 1,
            Self::Minute => 2,
            Self::Second | Self::Millisecond => 4,
        }
    }
}

/// Compare two component vectors known to `len_a` and `len_b` places
fn compare_partial(a: &[i64], len_a: usize, b: &[i64], len_b: usize) -> Option<Ordering> {
    let common = len_a.min(len_b);
    match a[..common].cmp(&b[..common]) {
        Ordering::Equal if len_a == len_b => Some(Ordering::Equal),
        Ordering::Equal => None,
        ord => Some(ord),
    }
}

fn parse_fixed_digits(text: &str, len: usize) -> Option<u32> {
    if text.len() == len && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Precision-aware date type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrecisionDate {
    /// The date value, with missing components set to 1
    pub date: NaiveDate,
    /// The precision of the original input
    pub precision: TemporalPrecision,
}

impl PrecisionDate {
    /// Create a date of the given precision
    pub fn new(date: NaiveDate, precision: TemporalPrecision) -> Self {
        Self { date, precision }
    }

    /// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('-');
        let year = parse_fixed_digits(parts.next()?, 4)? as i32;
        let (month, precision) = match parts.next() {
            Some(m) => (parse_fixed_digits(m, 2)?, TemporalPrecision::Month),
            None => (1, TemporalPrecision::Year),
        };
        let (day, precision) = match parts.next() {
            Some(d) => (parse_fixed_digits(d, 2)?, TemporalPrecision::Day),
            None => (1, precision),
        };
        if parts.next().is_some() {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, day).map(|date| Self::new(date, precision))
    }

    /// Current local date
    pub fn today() -> Self {
        Self::new(Local::now().date_naive(), TemporalPrecision::Day)
    }

    fn components(&self) -> [i64; 7] {
        [
            self.date.year() as i64,
            self.date.month() as i64,
            self.date.day() as i64,
            0,
            0,
            0,
            0,
        ]
    }

    /// Compare with another date; `None` when precision makes it undecidable
    pub fn partial_compare(&self, other: &Self) -> Option<Ordering> {
        compare_partial(
            &self.components(),
            self.precision.date_components(),
            &other.components(),
            other.precision.date_components(),
        )
    }

    /// The same instant as a date-time at midnight UTC, keeping the precision
    pub fn to_datetime(&self) -> PrecisionDateTime {
        let naive = self.date.and_time(NaiveTime::MIN);
        PrecisionDateTime::new(
            utc_offset().from_utc_datetime(&naive),
            self.precision,
        )
    }
}

impl fmt::Display for PrecisionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            TemporalPrecision::Year => write!(f, "{}", self.date.format("%Y")),
            TemporalPrecision::Month => write!(f, "{}", self.date.format("%Y-%m")),
            _ => write!(f, "{}", self.date.format("%Y-%m-%d")),
        }
    }
}

/// Precision-aware datetime type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrecisionDateTime {
    /// The datetime value; UTC when the input carried no offset
    pub datetime: DateTime<FixedOffset>,
    /// The precision of the original input
    pub precision: TemporalPrecision,
}

impl PrecisionDateTime {
    /// Create a datetime of the given precision
    pub fn new(datetime: DateTime<FixedOffset>, precision: TemporalPrecision) -> Self {
        Self {
            datetime,
            precision,
        }
    }

    /// Parse a FHIR dateTime/instant: a partial date optionally followed by
    /// `T`, a partial time and a `Z` or `+hh:mm` offset
    pub fn parse(text: &str) -> Option<Self> {
        let (date_text, time_text) = match text.split_once('T') {
            Some((date, time)) => (date, Some(time).filter(|t| !t.is_empty())),
            None => (text, None),
        };
        let date = PrecisionDate::parse(date_text)?;

        let Some(time_text) = time_text else {
            return Some(date.to_datetime());
        };
        if date.precision != TemporalPrecision::Day {
            return None;
        }

        let (time_text, offset) = split_offset(time_text)?;
        let time = PrecisionTime::parse(time_text)?;
        let naive = NaiveDateTime::new(date.date, time.time);
        let datetime = offset.from_local_datetime(&naive).single()?;
        Some(Self::new(datetime, time.precision))
    }

    /// Current instant in the local offset
    pub fn now() -> Self {
        Self::new(Local::now().fixed_offset(), TemporalPrecision::Millisecond)
    }

    fn components(&self) -> [i64; 7] {
        let utc = self.datetime.naive_utc();
        [
            utc.year() as i64,
            utc.month() as i64,
            utc.day() as i64,
            utc.hour() as i64,
            utc.minute() as i64,
            utc.second() as i64,
            (utc.nanosecond() / 1_000_000) as i64,
        ]
    }

    /// Compare with another datetime; `None` when precision makes it undecidable
    pub fn partial_compare(&self, other: &Self) -> Option<Ordering> {
        compare_partial(
            &self.components(),
            self.precision.date_components(),
            &other.components(),
            other.precision.date_components(),
        )
    }
}

/// Split `10:00:00+02:00` into the time text and its offset
fn split_offset(text: &str) -> Option<(&str, FixedOffset)> {
    if let Some(time) = text.strip_suffix('Z') {
        return Some((time, utc_offset()));
    }
    let Some(sign_at) = text.find(['+', '-']) else {
        return Some((text, utc_offset()));
    };
    let (time, zone) = text.split_at(sign_at);
    let sign = if zone.starts_with('-') { -1 } else { 1 };
    let (hours, minutes) = zone[1..].split_once(':')?;
    let seconds = (parse_fixed_digits(hours, 2)? * 3600 + parse_fixed_digits(minutes, 2)? * 60)
        as i32;
    FixedOffset::east_opt(sign * seconds).map(|offset| (time, offset))
}

impl fmt::Display for PrecisionDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pattern = match self.precision {
            TemporalPrecision::Year => "%Y",
            TemporalPrecision::Month => "%Y-%m",
            TemporalPrecision::Day => "%Y-%m-%d",
            TemporalPrecision::Hour => "%Y-%m-%dT%H%:z",
            TemporalPrecision::Minute => "%Y-%m-%dT%H:%M%:z",
            TemporalPrecision::Second => "%Y-%m-%dT%H:%M:%S%:z",
            TemporalPrecision::Millisecond => "%Y-%m-%dT%H:%M:%S%.3f%:z",
        };
        write!(f, "{}", self.datetime.format(pattern))
    }
}

/// Precision-aware time type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrecisionTime {
    /// The time value
    pub time: NaiveTime,
    /// The precision of the original input
    pub precision: TemporalPrecision,
}

impl PrecisionTime {
    /// Create a time of the given precision
    pub fn new(time: NaiveTime, precision: TemporalPrecision) -> Self {
        Self { time, precision }
    }

    /// Parse `HH`, `HH:MM`, `HH:MM:SS` or `HH:MM:SS.fff`
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split(':');
        let hour = parse_fixed_digits(parts.next()?, 2)?;
        let mut precision = TemporalPrecision::Hour;

        let minute = match parts.next() {
            Some(m) => {
                precision = TemporalPrecision::Minute;
                parse_fixed_digits(m, 2)?
            }
            None => 0,
        };

        let (second, nanos) = match parts.next() {
            Some(s) => match s.split_once('.') {
                Some((whole, fraction)) => {
                    precision = TemporalPrecision::Millisecond;
                    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                        return None;
                    }
                    let digits: String = fraction.chars().chain("000000000".chars()).take(9).collect();
                    (parse_fixed_digits(whole, 2)?, digits.parse().ok()?)
                }
                None => {
                    precision = TemporalPrecision::Second;
                    (parse_fixed_digits(s, 2)?, 0)
                }
            },
            None => (0, 0),
        };
        if parts.next().is_some() {
            return None;
        }

        NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
            .map(|time| Self::new(time, precision))
    }

    /// Current local time of day
    pub fn now() -> Self {
        Self::new(Local::now().time(), TemporalPrecision::Millisecond)
    }

    fn components(&self) -> [i64; 4] {
        [
            self.time.hour() as i64,
            self.time.minute() as i64,
            self.time.second() as i64,
            (self.time.nanosecond() / 1_000_000) as i64,
        ]
    }

    /// Compare with another time; `None` when precision makes it undecidable
    pub fn partial_compare(&self, other: &Self) -> Option<Ordering> {
        compare_partial(
            &self.components(),
            self.precision.time_components(),
            &other.components(),
            other.precision.time_components(),
        )
    }
}

impl fmt::Display for PrecisionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            TemporalPrecision::Minute => write!(f, "{}", self.time.format("%H:%M")),
            TemporalPrecision::Second => write!(f, "{}", self.time.format("%H:%M:%S")),
            TemporalPrecision::Millisecond => write!(f, "{}", self.time.format("%H:%M:%S%.3f")),
            _ => write!(f, "{}", self.time.format("%H")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("2020", TemporalPrecision::Year)]
    #[case("2020-03", TemporalPrecision::Month)]
    #[case("2020-03-15", TemporalPrecision::Day)]
    fn parses_partial_dates(#[case] text: &str, #[case] precision: TemporalPrecision) {
        let date = PrecisionDate::parse(text).expect("valid date");
        assert_eq!(date.precision, precision);
        assert_eq!(date.to_string(), text);
    }

    #[rstest]
    #[case("2020-13")]
    #[case("2020-02-30")]
    #[case("20-01-01")]
    #[case("2020-01-01-01")]
    fn rejects_invalid_dates(#[case] text: &str) {
        assert_eq!(PrecisionDate::parse(text), None);
    }

    #[test]
    fn datetime_with_offset_compares_in_utc() {
        let a = PrecisionDateTime::parse("2020-01-01T10:00:00+02:00").expect("valid");
        let b = PrecisionDateTime::parse("2020-01-01T08:00:00Z").expect("valid");
        assert_eq!(a.partial_compare(&b), Some(Ordering::Equal));
        assert_eq!(a.precision, TemporalPrecision::Second);
        assert_eq!(a.to_string(), "2020-01-01T10:00:00+02:00");
    }

    #[test]
    fn datetime_precision_follows_input() {
        let date_only = PrecisionDateTime::parse("2020-01-01T").expect("valid");
        assert_eq!(date_only.precision, TemporalPrecision::Day);
        let millis = PrecisionDateTime::parse("2020-01-01T10:00:00.5Z").expect("valid");
        assert_eq!(millis.precision, TemporalPrecision::Millisecond);
        assert_eq!(PrecisionDateTime::parse("2020T10:00"), None);
    }

    #[test]
    fn differing_precision_is_undecided_on_common_prefix() {
        let year = PrecisionDate::parse("2020").expect("valid");
        let day = PrecisionDate::parse("2020-06-01").expect("valid");
        let later = PrecisionDate::parse("2021-01-01").expect("valid");
        assert_eq!(year.partial_compare(&day), None);
        assert_eq!(year.partial_compare(&later), Some(Ordering::Less));
    }

    #[test]
    fn seconds_and_milliseconds_share_a_level() {
        let a = PrecisionTime::parse("10:00:00").expect("valid");
        let b = PrecisionTime::parse("10:00:00.000").expect("valid");
        let c = PrecisionTime::parse("10:00").expect("valid");
        assert_eq!(a.partial_compare(&b), Some(Ordering::Equal));
        assert_eq!(a.partial_compare(&c), None);
        assert_eq!(PrecisionTime::parse("25:00"), None);
    }
}
