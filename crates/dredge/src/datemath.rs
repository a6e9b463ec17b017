//! Relative date expressions
//!
//! An expression is a run of operations applied left to right to "now":
//!
//! ```text
//! +1DAY        one day later
//! -6HOURS      six hours earlier
//! /DAY         round down to the start of the day
//! -1MONTH/DAY  a month ago, at midnight
//! ```
//!
//! Units: `YEAR(S)`, `MONTH(S)`, `DAY(S)`/`DATE`, `HOUR(S)`, `MINUTE(S)`,
//! `SECOND(S)`, `MILLI(S)`/`MILLISECOND(S)`. Calendar steps and rounding
//! happen in the evaluator's zone, with the offset looked up per instant, so a
//! daylight-saving change between "now" and the result is honoured. An empty
//! expression means "now".

use chrono::{
    DateTime, Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, TimeZone, Timelike,
    Utc,
};
use thiserror::Error;

/// A malformed expression, with the byte offset where parsing stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset} in '{expr}'")]
pub struct DateMathError {
    pub expr: String,
    pub offset: usize,
    pub message: String,
}

impl DateMathError {
    fn new(expr: &str, offset: usize, message: impl Into<String>) -> Self {
        Self {
            expr: expr.to_string(),
            offset,
            message: message.into(),
        }
    }
}

/// Evaluates relative date expressions.
pub trait DateMath {
    fn evaluate(&self, expr: &str) -> Result<DateTime<Utc>, DateMathError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Milli,
}

impl Unit {
    fn parse(word: &str) -> Option<Self> {
        let unit = match word {
            "YEAR" | "YEARS" => Unit::Year,
            "MONTH" | "MONTHS" => Unit::Month,
            "DAY" | "DAYS" | "DATE" => Unit::Day,
            "HOUR" | "HOURS" => Unit::Hour,
            "MINUTE" | "MINUTES" => Unit::Minute,
            "SECOND" | "SECONDS" => Unit::Second,
            "MILLI" | "MILLIS" | "MILLISECOND" | "MILLISECONDS" => Unit::Milli,
            _ => return None,
        };
        Some(unit)
    }
}

/// The host's date-math grammar evaluated in a time zone (the system's local
/// zone by default) against the system clock, or against a pinned instant.
#[derive(Debug, Clone, Copy)]
pub struct StandardDateMath<Tz: TimeZone = Local> {
    zone: Tz,
    now: Option<DateTime<Utc>>,
}

impl StandardDateMath {
    pub fn new() -> Self {
        Self::in_zone(Local, None)
    }

    /// Evaluate every expression relative to `now` instead of the clock.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self::in_zone(Local, Some(now))
    }
}

impl Default for StandardDateMath {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tz: TimeZone> StandardDateMath<Tz> {
    pub fn in_zone(zone: Tz, now: Option<DateTime<Utc>>) -> Self {
        Self { zone, now }
    }
}

impl<Tz: TimeZone> DateMath for StandardDateMath<Tz> {
    fn evaluate(&self, expr: &str) -> Result<DateTime<Utc>, DateMathError> {
        let now = self.now.unwrap_or_else(Utc::now);
        let mut current = now.with_timezone(&self.zone);
        let bytes = expr.as_bytes();
        let mut pos = 0;

        while pos < bytes.len() {
            let op = bytes[pos];
            let op_at = pos;
            pos += 1;
            match op {
                b'/' => {
                    let (unit, next) = read_unit(expr, pos)?;
                    pos = next;
                    current = round_down(current, unit)
                        .ok_or_else(|| DateMathError::new(expr, op_at, "rounding out of range"))?;
                }
                b'+' | b'-' => {
                    let digits_end = expr[pos..]
                        .find(|c: char| !c.is_ascii_digit())
                        .map_or(bytes.len(), |i| pos + i);
                    if digits_end == pos {
                        return Err(DateMathError::new(expr, pos, "expected a number"));
                    }
                    let amount: i64 = expr[pos..digits_end]
                        .parse()
                        .map_err(|_| DateMathError::new(expr, pos, "number out of range"))?;
                    let (unit, next) = read_unit(expr, digits_end)?;
                    pos = next;
                    let signed = if op == b'-' { -amount } else { amount };
                    current = add(current, signed, unit)
                        .ok_or_else(|| DateMathError::new(expr, op_at, "date out of range"))?;
                }
                _ => {
                    return Err(DateMathError::new(
                        expr,
                        op_at,
                        format!("unexpected '{}'", expr[op_at..].chars().next().unwrap_or('?')),
                    ));
                }
            }
        }

        Ok(current.with_timezone(&Utc))
    }
}

fn read_unit(expr: &str, start: usize) -> Result<(Unit, usize), DateMathError> {
    let end = expr[start..]
        .find(|c: char| !c.is_ascii_alphabetic())
        .map_or(expr.len(), |i| start + i);
    if end == start {
        return Err(DateMathError::new(expr, start, "expected a unit"));
    }
    let word = &expr[start..end];
    Unit::parse(word)
        .map(|unit| (unit, end))
        .ok_or_else(|| DateMathError::new(expr, start, format!("unknown unit '{}'", word)))
}

fn add<Tz: TimeZone>(t: DateTime<Tz>, amount: i64, unit: Unit) -> Option<DateTime<Tz>> {
    match unit {
        Unit::Year => add_months(t, amount.checked_mul(12)?),
        Unit::Month => add_months(t, amount),
        Unit::Day => t.checked_add_signed(Duration::try_days(amount)?),
        Unit::Hour => t.checked_add_signed(Duration::try_hours(amount)?),
        Unit::Minute => t.checked_add_signed(Duration::try_minutes(amount)?),
        Unit::Second => t.checked_add_signed(Duration::try_seconds(amount)?),
        Unit::Milli => t.checked_add_signed(Duration::try_milliseconds(amount)?),
    }
}

fn add_months<Tz: TimeZone>(t: DateTime<Tz>, months: i64) -> Option<DateTime<Tz>> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        t.checked_add_months(magnitude)
    } else {
        t.checked_sub_months(magnitude)
    }
}

fn round_down<Tz: TimeZone>(t: DateTime<Tz>, unit: Unit) -> Option<DateTime<Tz>> {
    let local = t.naive_local();
    let date = local.date();
    let rounded: NaiveDateTime = match unit {
        Unit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_hms_opt(0, 0, 0)?,
        Unit::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_hms_opt(0, 0, 0)?,
        Unit::Day => date.and_hms_opt(0, 0, 0)?,
        Unit::Hour => date.and_hms_opt(local.hour(), 0, 0)?,
        Unit::Minute => date.and_hms_opt(local.hour(), local.minute(), 0)?,
        Unit::Second => date.and_hms_opt(local.hour(), local.minute(), local.second())?,
        Unit::Milli => {
            let millis = local.nanosecond() / 1_000_000;
            date.and_hms_milli_opt(local.hour(), local.minute(), local.second(), millis)?
        }
    };
    // A repeated wall-clock time takes its first occurrence.
    t.timezone().from_local_datetime(&rounded).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, LocalResult};

    fn pinned_at(now: DateTime<Utc>) -> StandardDateMath<FixedOffset> {
        StandardDateMath::in_zone(FixedOffset::east_opt(0).unwrap(), Some(now))
    }

    fn pinned() -> StandardDateMath<FixedOffset> {
        pinned_at(Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 30).unwrap())
    }

    /// +01:00 in winter, +02:00 from 2024-03-31T01:00:00Z on.
    #[derive(Debug, Clone, Copy)]
    struct TwoSeason;

    const SPRING_FORWARD: i64 = 1_711_846_800;

    impl TwoSeason {
        fn winter() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::east_opt(2 * 3600).unwrap()
        }
    }

    impl TimeZone for TwoSeason {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            TwoSeason
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let fits = |offset: FixedOffset, winter: bool| {
                let instant = (*local - offset).and_utc().timestamp();
                (instant < SPRING_FORWARD) == winter
            };
            match (fits(Self::winter(), true), fits(Self::summer(), false)) {
                (true, true) => LocalResult::Ambiguous(Self::winter(), Self::summer()),
                (true, false) => LocalResult::Single(Self::winter()),
                (false, true) => LocalResult::Single(Self::summer()),
                (false, false) => LocalResult::None,
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if utc.and_utc().timestamp() < SPRING_FORWARD {
                Self::winter()
            } else {
                Self::summer()
            }
        }
    }

    #[test]
    fn test_empty_expression_is_now() {
        let dm = pinned();
        assert_eq!(
            dm.evaluate("").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 30).unwrap()
        );
    }

    #[test]
    fn test_add_and_subtract() {
        let dm = pinned();
        assert_eq!(
            dm.evaluate("-1DAY").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 14, 13, 45, 30).unwrap()
        );
        assert_eq!(
            dm.evaluate("+2HOURS-30MINUTES").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 15, 15, 30).unwrap()
        );
        assert_eq!(
            dm.evaluate("-1YEAR").unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 15, 13, 45, 30).unwrap()
        );
    }

    #[test]
    fn test_month_arithmetic_clamps_to_month_end() {
        let dm = pinned_at(Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap());
        assert_eq!(
            dm.evaluate("-1MONTH").unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_rounding_uses_zone() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 30).unwrap();
        assert_eq!(
            pinned().evaluate("/DAY").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
        );
        // 13:45 UTC is 15:45 at +02:00, so local midnight is 22:00 UTC the day before.
        let plus_two = StandardDateMath::in_zone(FixedOffset::east_opt(2 * 3600).unwrap(), Some(now));
        assert_eq!(
            plus_two.evaluate("/DAY").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 14, 22, 0, 0).unwrap()
        );
        assert_eq!(
            pinned().evaluate("-1MONTH/MONTH").unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_rounding_across_daylight_saving_change() {
        // Summer now (+02:00); six months back is winter (+01:00).
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 10, 0, 0).unwrap();
        let dm = StandardDateMath::in_zone(TwoSeason, Some(now));
        assert_eq!(
            dm.evaluate("-6MONTHS/DAY").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 14, 23, 0, 0).unwrap()
        );
        assert_eq!(
            dm.evaluate("/DAY").unwrap(),
            Utc.with_ymd_and_hms(2024, 7, 14, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_local_zone_is_default() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 30).unwrap();
        let expected = Local
            .from_local_datetime(&now.with_timezone(&Local).date_naive().and_hms_opt(0, 0, 0).unwrap())
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(StandardDateMath::at(now).evaluate("/DAY").unwrap(), expected);
    }

    #[test]
    fn test_malformed_expressions() {
        let dm = pinned();
        let err = dm.evaluate("-1FORTNIGHT").unwrap_err();
        assert!(err.message.contains("FORTNIGHT"));
        assert_eq!(err.offset, 2);

        assert!(dm.evaluate("-DAY").is_err());
        assert!(dm.evaluate("+1").is_err());
        assert!(dm.evaluate("1DAY").is_err());
        assert!(dm.evaluate("-1day").is_err());
    }
}
