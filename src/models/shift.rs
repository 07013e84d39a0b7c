//! Shift types and their timing.
//!
//! A shift type is a category of work period with a fixed duration and a
//! start hour relative to midnight of the day it is assigned to.
//!
//! # Day Accounting
//! A shift assigned "for day d" always belongs to day d, even when it runs
//! past midnight. A night shift starting at 16:00 on d and ending at 08:00 on
//! d+1 counts against d for coverage, exclusivity and rest rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shift type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShiftType {
    /// Regular day shift (default 08:00–16:00).
    Day,
    /// Night shift spanning into the next calendar day (default 16:00–08:00).
    Night,
    /// Late shift (default 12:00–20:00).
    Late,
    /// Shift worked on a public holiday.
    Holiday,
}

impl ShiftType {
    /// All shift types in declaration order.
    pub const ALL: [ShiftType; 4] = [
        ShiftType::Day,
        ShiftType::Night,
        ShiftType::Late,
        ShiftType::Holiday,
    ];

    /// Shift types staffed on regular (non-holiday) days.
    pub const REGULAR: [ShiftType; 3] = [ShiftType::Day, ShiftType::Night, ShiftType::Late];

    /// Short lowercase name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ShiftType::Day => "day",
            ShiftType::Night => "night",
            ShiftType::Late => "late",
            ShiftType::Holiday => "holiday",
        }
    }

    /// Whether a worker may state this type as a preference.
    #[inline]
    pub fn is_preferable(&self) -> bool {
        !matches!(self, ShiftType::Holiday)
    }

    #[inline]
    pub(crate) fn index(&self) -> usize {
        match self {
            ShiftType::Day => 0,
            ShiftType::Night => 1,
            ShiftType::Late => 2,
            ShiftType::Holiday => 3,
        }
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShiftType::Day => "DayShift",
            ShiftType::Night => "NightShift",
            ShiftType::Late => "LateShift",
            ShiftType::Holiday => "HolidayShift",
        };
        f.write_str(label)
    }
}

/// Error returned when a shift type name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownShiftType(pub String);

impl fmt::Display for UnknownShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown shift type '{}'", self.0)
    }
}

impl std::error::Error for UnknownShiftType {}

impl FromStr for ShiftType {
    type Err = UnknownShiftType;

    /// Accepts short names (`day`) and display names (`DayShift`), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "dayshift" | "day_shift" => Ok(ShiftType::Day),
            "night" | "nightshift" | "night_shift" => Ok(ShiftType::Night),
            "late" | "lateshift" | "late_shift" => Ok(ShiftType::Late),
            "holiday" | "holidayshift" | "holiday_shift" => Ok(ShiftType::Holiday),
            _ => Err(UnknownShiftType(s.to_string())),
        }
    }
}

/// Timing of a single shift type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftSpec {
    /// Duration in hours.
    pub hours: i64,
    /// Start hour relative to midnight of the assigned day (0..24).
    pub start_hour: i64,
}

impl ShiftSpec {
    /// Creates a shift spec.
    pub fn new(hours: i64, start_hour: i64) -> Self {
        Self { hours, start_hour }
    }

    /// End hour relative to midnight of the assigned day (may exceed 24).
    #[inline]
    pub fn end_hour(&self) -> i64 {
        self.start_hour + self.hours
    }
}

/// Durations and start hours of all shift types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftCatalog {
    specs: [ShiftSpec; 4],
}

impl Default for ShiftCatalog {
    fn default() -> Self {
        Self {
            specs: [
                ShiftSpec::new(8, 8),
                ShiftSpec::new(16, 16),
                ShiftSpec::new(8, 12),
                ShiftSpec::new(8, 8),
            ],
        }
    }
}

impl ShiftCatalog {
    /// Creates the default catalog (Day 8h@08, Night 16h@16, Late 8h@12, Holiday 8h@08).
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the spec of one shift type.
    pub fn with_spec(mut self, shift: ShiftType, spec: ShiftSpec) -> Self {
        self.specs[shift.index()] = spec;
        self
    }

    /// Timing of a shift type.
    #[inline]
    pub fn spec(&self, shift: ShiftType) -> ShiftSpec {
        self.specs[shift.index()]
    }

    /// Duration of a shift type in hours.
    #[inline]
    pub fn hours(&self, shift: ShiftType) -> i64 {
        self.specs[shift.index()].hours
    }

    /// Rest hours between `earlier` on day d and `later` on day d+1.
    ///
    /// Negative when the shifts overlap.
    pub fn rest_between(&self, earlier: ShiftType, later: ShiftType) -> i64 {
        24 + self.spec(later).start_hour - self.spec(earlier).end_hour()
    }
}
