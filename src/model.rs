//! Observation records and the (time block, weekday) planning grid.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

pub const MINUTES_PER_DAY: u16 = 1440;

/// Monday through Sunday, the order every table and report uses.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// One passenger-count sample, as delivered by an observation source.
///
/// Fields are kept close to the source format: `time_block` is the raw
/// `HH:MM` text and `passenger_count` is signed so malformed rows survive
/// decoding and can be rejected by the aggregator instead of the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub time_block: String,
    pub pickup_location: String,
    pub passenger_count: i64,
    #[serde(default)]
    pub day_of_week: Option<String>,
}

impl Observation {
    /// Resolves the weekday, preferring the explicit `day_of_week` column.
    pub fn weekday(&self) -> Result<Weekday, PlanError> {
        match self.day_of_week.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => parse_weekday(name).ok_or_else(|| {
                PlanError::InvalidRecord(format!("unrecognized day of week {name:?}"))
            }),
            _ => Ok(self.date.weekday()),
        }
    }

    /// Validates the record and returns the demand cell it belongs to.
    ///
    /// Only checks that the time block is well formed; membership in a
    /// particular grid is the aggregator's concern.
    pub fn cell_key(&self) -> Result<CellKey, PlanError> {
        if self.passenger_count < 0 {
            return Err(PlanError::InvalidRecord(format!(
                "negative passenger count {}",
                self.passenger_count
            )));
        }
        let time_block = self.time_block.parse::<TimeBlock>()?;
        let weekday = self.weekday()?;
        Ok(CellKey {
            time_block,
            weekday,
        })
    }
}

/// Parses a weekday from its full or three-letter English name, ignoring case.
pub fn parse_weekday(name: &str) -> Option<Weekday> {
    let lower = name.trim().to_ascii_lowercase();
    WEEKDAYS
        .iter()
        .copied()
        .find(|day| lower == weekday_name(*day).to_ascii_lowercase() || lower == short_name(*day))
}

/// Full English name of a weekday, e.g. `"Monday"`.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn short_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Start of a fixed-width bucket of the day, in minutes after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeBlock(u16);

impl TimeBlock {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }
}

impl fmt::Display for TimeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for TimeBlock {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlanError::InvalidRecord(format!("malformed time block {s:?}"));
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u16 = hour.parse().map_err(|_| invalid())?;
        let minute: u16 = minute.parse().map_err(|_| invalid())?;
        if hour >= 24 || minute >= 60 {
            return Err(invalid());
        }
        Ok(Self(hour * 60 + minute))
    }
}

/// Composite identity of a demand cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub time_block: TimeBlock,
    pub weekday: Weekday,
}

impl CellKey {
    pub fn new(time_block: TimeBlock, weekday: Weekday) -> Self {
        Self {
            time_block,
            weekday,
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.time_block, weekday_name(self.weekday))
    }
}

/// The canonical set of time blocks for a bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGrid {
    granularity_minutes: u16,
}

impl TimeGrid {
    /// The bucket width must be positive and divide the day evenly.
    pub fn new(granularity_minutes: u16) -> Result<Self, PlanError> {
        if granularity_minutes == 0 || MINUTES_PER_DAY % granularity_minutes != 0 {
            return Err(PlanError::InvalidPolicy(format!(
                "time block granularity of {granularity_minutes} minutes does not divide a day"
            )));
        }
        Ok(Self {
            granularity_minutes,
        })
    }

    pub fn granularity_minutes(&self) -> u16 {
        self.granularity_minutes
    }

    /// Block width in hours, the default `block_duration_hours` for this grid.
    pub fn block_hours(&self) -> f64 {
        f64::from(self.granularity_minutes) / 60.0
    }

    pub fn blocks(&self) -> Vec<TimeBlock> {
        (0..MINUTES_PER_DAY)
            .step_by(usize::from(self.granularity_minutes))
            .map(TimeBlock)
            .collect()
    }
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self {
            granularity_minutes: 30,
        }
    }
}
