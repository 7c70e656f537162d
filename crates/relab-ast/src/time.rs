//! Time values
//!
//! Durations are carried as a magnitude plus the unit they were written in.
//! Comparison and hashing go through the normalized nanosecond count, so
//! `1000 usec` and `1 msec` are the same value.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors produced when parsing a time value from text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("Empty time value")]
    Empty,
    #[error("Invalid magnitude: {0}")]
    InvalidMagnitude(String),
    #[error("Unknown time unit: {0}")]
    UnknownUnit(String),
    #[error("Missing time unit for non-zero magnitude {0}")]
    MissingUnit(i64),
}

/// Unit of a time value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// No unit; only meaningful with a zero magnitude
    #[default]
    None,
    Nsec,
    Usec,
    Msec,
    Sec,
    Min,
    Hour,
    Day,
    Week,
}

impl TimeUnit {
    /// All units that carry a scale, smallest first
    pub const SCALED: [TimeUnit; 8] = [
        TimeUnit::Nsec,
        TimeUnit::Usec,
        TimeUnit::Msec,
        TimeUnit::Sec,
        TimeUnit::Min,
        TimeUnit::Hour,
        TimeUnit::Day,
        TimeUnit::Week,
    ];

    /// Number of nanoseconds in one of this unit
    pub fn nanos(self) -> i128 {
        match self {
            TimeUnit::None => 0,
            TimeUnit::Nsec => 1,
            TimeUnit::Usec => 1_000,
            TimeUnit::Msec => 1_000_000,
            TimeUnit::Sec => 1_000_000_000,
            TimeUnit::Min => 60 * 1_000_000_000,
            TimeUnit::Hour => 3_600 * 1_000_000_000,
            TimeUnit::Day => 86_400 * 1_000_000_000,
            TimeUnit::Week => 604_800 * 1_000_000_000,
        }
    }

    /// Canonical spelling used when rendering
    pub fn canonical_name(self) -> &'static str {
        match self {
            TimeUnit::None => "",
            TimeUnit::Nsec => "nsec",
            TimeUnit::Usec => "usec",
            TimeUnit::Msec => "msec",
            TimeUnit::Sec => "sec",
            TimeUnit::Min => "min",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => TimeUnit::None,
            "ns" | "nsec" | "nsecs" => TimeUnit::Nsec,
            "us" | "usec" | "usecs" => TimeUnit::Usec,
            "ms" | "msec" | "msecs" => TimeUnit::Msec,
            "s" | "sec" | "secs" | "second" | "seconds" => TimeUnit::Sec,
            "min" | "mins" | "minute" | "minutes" => TimeUnit::Min,
            "h" | "hour" | "hours" => TimeUnit::Hour,
            "d" | "day" | "days" => TimeUnit::Day,
            "week" | "weeks" => TimeUnit::Week,
            other => return Err(TimeParseError::UnknownUnit(other.to_string())),
        };
        Ok(unit)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// A duration as written in source: magnitude and unit
///
/// A value without a unit must have a zero magnitude. Loading from text or a
/// design file enforces this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(try_from = "RawTimeValue")]
pub struct TimeValue {
    pub magnitude: i64,
    pub unit: TimeUnit,
}

/// Unchecked form read from design files
#[derive(Deserialize)]
struct RawTimeValue {
    magnitude: i64,
    #[serde(default)]
    unit: TimeUnit,
}

impl TryFrom<RawTimeValue> for TimeValue {
    type Error = TimeParseError;

    fn try_from(raw: RawTimeValue) -> Result<Self, Self::Error> {
        TimeValue::checked(raw.magnitude, raw.unit)
    }
}

impl TimeValue {
    /// The canonical zero used for timer and action defaults
    pub const ZERO: TimeValue = TimeValue {
        magnitude: 0,
        unit: TimeUnit::None,
    };

    /// Build a value without checking the unit
    ///
    /// With `TimeUnit::None` the value is zero whatever the magnitude; use
    /// [`TimeValue::checked`] to reject that case.
    pub fn new(magnitude: i64, unit: TimeUnit) -> Self {
        Self { magnitude, unit }
    }

    /// Build a value, rejecting a non-zero magnitude without a unit
    pub fn checked(magnitude: i64, unit: TimeUnit) -> Result<Self, TimeParseError> {
        if unit == TimeUnit::None && magnitude != 0 {
            return Err(TimeParseError::MissingUnit(magnitude));
        }
        Ok(Self { magnitude, unit })
    }

    pub fn nsec(magnitude: i64) -> Self {
        Self::new(magnitude, TimeUnit::Nsec)
    }

    pub fn usec(magnitude: i64) -> Self {
        Self::new(magnitude, TimeUnit::Usec)
    }

    pub fn msec(magnitude: i64) -> Self {
        Self::new(magnitude, TimeUnit::Msec)
    }

    pub fn sec(magnitude: i64) -> Self {
        Self::new(magnitude, TimeUnit::Sec)
    }

    /// Magnitude expressed in nanoseconds
    pub fn to_nanos(&self) -> i128 {
        self.magnitude as i128 * self.unit.nanos()
    }

    pub fn is_zero(&self) -> bool {
        self.to_nanos() == 0
    }

    /// Convert to a `Duration`; negative values have no representation
    pub fn as_duration(&self) -> Option<Duration> {
        let nanos = self.to_nanos();
        if nanos < 0 {
            return None;
        }
        let secs = u64::try_from(nanos / 1_000_000_000).ok()?;
        Some(Duration::new(secs, (nanos % 1_000_000_000) as u32))
    }

    /// Re-express the value in the largest unit that represents it exactly
    pub fn normalized(&self) -> TimeValue {
        let nanos = self.to_nanos();
        if nanos == 0 {
            return TimeValue::ZERO;
        }
        for unit in TimeUnit::SCALED.iter().rev() {
            let scale = unit.nanos();
            if nanos % scale == 0 {
                if let Ok(magnitude) = i64::try_from(nanos / scale) {
                    return TimeValue::new(magnitude, *unit);
                }
            }
        }
        *self
    }
}

impl PartialEq for TimeValue {
    fn eq(&self, other: &Self) -> bool {
        self.to_nanos() == other.to_nanos()
    }
}

impl Eq for TimeValue {}

impl Hash for TimeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_nanos().hash(state);
    }
}

impl PartialOrd for TimeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_nanos().cmp(&other.to_nanos())
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            TimeUnit::None => write!(f, "{}", self.magnitude),
            unit => write!(f, "{} {}", self.magnitude, unit),
        }
    }
}

impl FromStr for TimeValue {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TimeParseError::Empty);
        }

        let split = s
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);

        let magnitude: i64 = digits
            .parse()
            .map_err(|_| TimeParseError::InvalidMagnitude(digits.to_string()))?;
        let unit: TimeUnit = unit.parse()?;
        TimeValue::checked(magnitude, unit)
    }
}
