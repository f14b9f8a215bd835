//! Calendar-day bounds for timestamp range queries.
//!
//! A day is taken in the time zone of the instant passed in, so callers that
//! want the clinic's local day hand in a `DateTime<Local>`.
//!
//! Two flavours, not interchangeable:
//!
//! - [`DayRange::inclusive`]: `start <= t <= 23:59:59.999`, used when looking
//!   up a veterinarian's appointments for a day
//! - [`DayRange::exclusive`]: `start <= t < start of next day`, used by the
//!   filtered appointment search

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::Value;

use crate::db::{timestamp_value, Operator, Predicate};

/// How the upper bound of a [`DayRange`] compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndBound {
    /// `t <= end`, with `end` the last millisecond of the day.
    Inclusive,
    /// `t < end`, with `end` the first instant of the following day.
    Exclusive,
}

/// Bounds of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub bound: EndBound,
}

impl DayRange {
    /// `[00:00:00.000, 23:59:59.999]` of the instant's day.
    pub fn inclusive<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        let tz = instant.timezone();
        let day = instant.date_naive();
        let last_milli = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);

        Self {
            start: start_of(&tz, day),
            end: resolve_backward(&tz, day.and_time(last_milli)),
            bound: EndBound::Inclusive,
        }
    }

    /// `[00:00:00.000, next day 00:00:00.000)` of the instant's day.
    pub fn exclusive<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        let tz = instant.timezone();
        let day = instant.date_naive();
        let start = start_of(&tz, day);
        let end = match day.succ_opt() {
            Some(next) => start_of(&tz, next),
            None => start + Duration::days(1),
        };

        Self {
            start,
            end,
            bound: EndBound::Exclusive,
        }
    }

    /// Whether `instant` falls inside the range.
    pub fn contains<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> bool {
        let instant = instant.with_timezone(&Utc);
        let below_end = match self.bound {
            EndBound::Inclusive => instant <= self.end,
            EndBound::Exclusive => instant < self.end,
        };
        instant >= self.start && below_end
    }

    /// The two predicates restricting `field` to this day.
    pub fn predicates(&self, field: &str) -> [Predicate; 2] {
        let upper = match self.bound {
            EndBound::Inclusive => Operator::Lte,
            EndBound::Exclusive => Operator::Lt,
        };
        [
            Predicate::new(field, Operator::Gte, self.start_value()),
            Predicate::new(field, upper, self.end_value()),
        ]
    }

    pub fn start_value(&self) -> Value {
        timestamp_value(&self.start)
    }

    pub fn end_value(&self) -> Value {
        timestamp_value(&self.end)
    }
}

fn start_of<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<Utc> {
    resolve_forward(tz, day.and_time(NaiveTime::MIN))
}

// Wall-clock times skipped by a DST jump have no instant; midnight moves to the
// first valid time after the gap, the end of day to the last one before it.
const GAP_STEP_MINUTES: i64 = 15;
const MAX_GAP_STEPS: i64 = 12;

fn resolve_forward<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    (0..=MAX_GAP_STEPS)
        .find_map(|step| {
            let shifted = naive + Duration::minutes(step * GAP_STEP_MINUTES);
            tz.from_local_datetime(&shifted).earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

fn resolve_backward<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    (0..=MAX_GAP_STEPS)
        .find_map(|step| {
            let shifted = naive - Duration::minutes(step * GAP_STEP_MINUTES);
            tz.from_local_datetime(&shifted).latest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}
