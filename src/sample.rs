//! Synthetic observation data for demos and tests.
//!
//! Reproduces the morning/evening crew-change peaks of an airport crew
//! shuttle: heavy 05:00–09:59, moderate 15:00–19:59, light midday, near
//! empty overnight, with weekends at 70% of weekday demand.

use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::model::{Observation, TimeGrid, weekday_name};

pub const DEFAULT_LOCATIONS: [&str; 3] =
    ["Marriott Downtown", "Hilton Anchorage", "Sheraton Anchorage"];

#[derive(Debug, Clone)]
pub struct SampleGenerator {
    pub year: i32,
    pub month: u32,
    /// Days generated from the 1st; stops early at the end of the month.
    pub days: u32,
    pub locations: Vec<String>,
    pub grid: TimeGrid,
    /// Fixed seed for reproducible output; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for SampleGenerator {
    fn default() -> Self {
        Self {
            year: 2024,
            month: 1,
            days: 30,
            locations: DEFAULT_LOCATIONS.iter().map(|l| l.to_string()).collect(),
            grid: TimeGrid::default(),
            seed: None,
        }
    }
}

impl SampleGenerator {
    /// Parses a `YYYY-MM` month.
    pub fn for_month(month: &str) -> Result<Self> {
        let (year, month) = month
            .split_once('-')
            .ok_or_else(|| anyhow!("expected YYYY-MM, got {month:?}"))?;
        Ok(Self {
            year: year.parse()?,
            month: month.parse()?,
            ..Default::default()
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn generate(&self) -> Result<Vec<Observation>> {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or_else(|| anyhow!("invalid month {}-{:02}", self.year, self.month))?;
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);
        let blocks = self.grid.blocks();

        let mut rows = Vec::new();
        for date in first.iter_days().take(self.days as usize) {
            if date.month() != self.month {
                break;
            }
            let weekday = date.weekday();

            for block in &blocks {
                for location in &self.locations {
                    rows.push(Observation {
                        date,
                        time_block: block.to_string(),
                        pickup_location: location.clone(),
                        passenger_count: passengers(&mut rng, block.hour(), weekday),
                        day_of_week: Some(weekday_name(weekday).to_string()),
                    });
                }
            }
        }

        debug!(seed, rows = rows.len(), "Generated sample observations");
        Ok(rows)
    }
}

fn passengers(rng: &mut StdRng, hour: u16, weekday: Weekday) -> i64 {
    let base: i64 = match hour {
        5..=9 => rng.random_range(3..=10),
        15..=19 => rng.random_range(2..=7),
        10..=14 => rng.random_range(1..=4),
        _ => rng.random_range(0..=1),
    };

    if matches!(weekday, Weekday::Sat | Weekday::Sun) {
        (base as f64 * 0.7).floor() as i64
    } else {
        base
    }
}
