// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Five-field cron expression parsing and next-match evaluation.
//!
//! Fields are `minute hour day-of-month month day-of-week`, with the usual
//! syntax: `*`, lists, ranges, steps, three-letter month/weekday names, and
//! day-of-week `7` as an alias for Sunday. When both day fields are
//! restricted the standard OR rule applies. Evaluation is in UTC, the single
//! configured server time zone; per-schedule zones are not modeled.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on skip iterations in [`CronExpr::next_after`]. Each
/// iteration advances at least one minute, hour, day, or month, so this
/// covers over a century of day-of-month/month combinations before we give
/// up on an unsatisfiable expression (e.g. `0 0 31 2 *`).
const MAX_STEPS: u32 = 5_000;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const DOW_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Errors from parsing a cron expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronError {
    #[error("expected 5 fields (minute hour day month weekday), got {0}")]
    FieldCount(usize),
    #[error("invalid {field} field: {text:?}")]
    Invalid { field: &'static str, text: String },
}

/// A parsed 5-field cron expression.
///
/// Each field is a bitmask of allowed values; `dom_restricted` /
/// `dow_restricted` remember whether the day fields were `*`, which the
/// OR rule needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    source: String,
    minutes: u64,
    hours: u64,
    dom: u64,
    months: u64,
    dow: u64,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronExpr {
    /// Parse a 5-field expression.
    pub fn parse(text: &str) -> Result<Self, CronError> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::FieldCount(fields.len()));
        }

        let (minutes, _) = parse_field(fields[0], "minute", 0, 59, &[])?;
        let (hours, _) = parse_field(fields[1], "hour", 0, 23, &[])?;
        let (dom, dom_restricted) = parse_field(fields[2], "day", 1, 31, &[])?;
        let (months, _) = parse_field(fields[3], "month", 1, 12, &MONTH_NAMES)?;
        let (mut dow, dow_restricted) = parse_field(fields[4], "weekday", 0, 7, &DOW_NAMES)?;

        // 7 is an alias for Sunday
        if dow & (1 << 7) != 0 {
            dow = (dow | 1) & !(1 << 7);
        }

        Ok(Self {
            source: text.to_string(),
            minutes,
            hours,
            dom,
            months,
            dow,
            dom_restricted,
            dow_restricted,
        })
    }

    /// The expression text as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether a timestamp (truncated to the minute) matches.
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        self.minutes & (1 << at.minute()) != 0
            && self.hours & (1 << at.hour()) != 0
            && self.months & (1 << at.month()) != 0
            && self.day_matches(&at)
    }

    /// Next matching timestamp strictly after `after`, evaluated in UTC.
    ///
    /// Returns `None` only for expressions with no reachable occurrence.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        // First whole minute strictly after `after`
        let mut secs = (after.timestamp().div_euclid(60) + 1) * 60;

        for _ in 0..MAX_STEPS {
            let t = DateTime::<Utc>::from_timestamp(secs, 0)?;

            if self.months & (1 << t.month()) == 0 {
                let (year, month) = if t.month() == 12 {
                    (t.year() + 1, 1)
                } else {
                    (t.year(), t.month() + 1)
                };
                secs = Utc
                    .with_ymd_and_hms(year, month, 1, 0, 0, 0)
                    .single()?
                    .timestamp();
                continue;
            }
            if !self.day_matches(&t) {
                secs = (secs.div_euclid(86_400) + 1) * 86_400;
                continue;
            }
            if self.hours & (1 << t.hour()) == 0 {
                secs = (secs.div_euclid(3_600) + 1) * 3_600;
                continue;
            }
            if self.minutes & (1 << t.minute()) == 0 {
                secs += 60;
                continue;
            }
            return Some(t);
        }
        None
    }

    /// Millisecond-epoch wrapper around [`CronExpr::next_after`].
    pub fn next_after_ms(&self, after_ms: u64) -> Option<u64> {
        let after = DateTime::<Utc>::from_timestamp_millis(after_ms as i64)?;
        self.next_after(after).map(|t| t.timestamp_millis() as u64)
    }

    fn day_matches(&self, t: &DateTime<Utc>) -> bool {
        let dom_hit = self.dom & (1 << t.day()) != 0;
        let dow_hit = self.dow & (1 << t.weekday().num_days_from_sunday()) != 0;
        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom_hit || dow_hit,
            (true, false) => dom_hit,
            (false, true) => dow_hit,
            (false, false) => true,
        }
    }
}

impl FromStr for CronExpr {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Serialize for CronExpr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for CronExpr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Parse one cron field into a bitmask over `min..=max`.
///
/// Returns the mask and whether the field restricts anything (i.e. was not
/// a bare `*`).
fn parse_field(
    text: &str,
    field: &'static str,
    min: u32,
    max: u32,
    names: &[&str],
) -> Result<(u64, bool), CronError> {
    let invalid = || CronError::Invalid {
        field,
        text: text.to_string(),
    };

    if text == "*" {
        let mut mask = 0u64;
        for v in min..=max {
            mask |= 1 << v;
        }
        return Ok((mask, false));
    }

    let parse_value = |item: &str| -> Result<u32, CronError> {
        if let Ok(n) = item.parse::<u32>() {
            if n < min || n > max {
                return Err(invalid());
            }
            return Ok(n);
        }
        let lower = item.to_ascii_lowercase();
        // Name tables start at the field minimum (jan = 1, sun = 0)
        names
            .iter()
            .position(|name| *name == lower)
            .map(|idx| idx as u32 + min)
            .ok_or_else(invalid)
    };

    let mut mask = 0u64;
    for item in text.split(',') {
        if item.is_empty() {
            return Err(invalid());
        }

        let (range_text, step) = match item.split_once('/') {
            Some((range, step_text)) => {
                let step: u32 = step_text.parse().map_err(|_| invalid())?;
                if step == 0 {
                    return Err(invalid());
                }
                (range, step)
            }
            None => (item, 1),
        };

        let (lo, hi) = if range_text == "*" {
            (min, max)
        } else if let Some((a, b)) = range_text.split_once('-') {
            (parse_value(a)?, parse_value(b)?)
        } else {
            let v = parse_value(range_text)?;
            // `N/step` means N through the field maximum
            if item.contains('/') {
                (v, max)
            } else {
                (v, v)
            }
        };
        if lo > hi {
            return Err(invalid());
        }

        let mut v = lo;
        while v <= hi {
            mask |= 1 << v;
            v += step;
        }
    }

    Ok((mask, true))
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
