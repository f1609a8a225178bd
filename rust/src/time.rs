//! Wall-clock time of day and weekly time ranges.
//!
//! Times arrive as zero-padded `HH:MM` strings and are parsed once into
//! minutes since midnight. Overlap and duration arithmetic then works on
//! plain integers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing an `HH:MM` string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("time is required")]
    Empty,
    #[error("'{0}' is not in HH:MM format")]
    Malformed(String),
    #[error("'{0}' is not a valid time of day")]
    OutOfRange(String),
}

/// A local wall-clock time with minute precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Build from hour and minute, rejecting values outside 00:00..=23:59.
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self(hour * 60 + minute))
    }

    /// Parse a strict, zero-padded `HH:MM` string.
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        if s.is_empty() {
            return Err(TimeParseError::Empty);
        }

        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[2] == b':'
            && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit());
        if !well_formed {
            return Err(TimeParseError::Malformed(s.to_string()));
        }

        let digit = |i: usize| u16::from(bytes[i] - b'0');
        let hour = digit(0) * 10 + digit(1);
        let minute = digit(3) * 10 + digit(4);

        Self::from_hm(hour, minute).ok_or_else(|| TimeParseError::OutOfRange(s.to_string()))
    }

    /// Minutes since midnight.
    #[inline]
    pub fn minutes(self) -> u16 {
        self.0
    }

    #[inline]
    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    #[inline]
    pub fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A half-open interval `[start, end)` within a single day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    /// Returns `None` unless `end` is strictly after `start`.
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// Length in minutes.
    #[inline]
    pub fn duration_minutes(&self) -> u32 {
        u32::from(self.end.minutes() - self.start.minutes())
    }

    /// Two ranges overlap iff `s1 < e2 && s2 < e1`. Touching ranges do not.
    #[inline]
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
