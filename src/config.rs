//! Planner configuration: policy constants, grid granularity, and the
//! accepted hourly-rate range.
//!
//! Layered lowest to highest: built-in defaults, an optional JSON file,
//! `SHUTTLE_*` environment variables, then explicit overrides from the CLI.
//!
//! ```json
//! {
//!   "capacity": { "seats_per_shuttle": 16, "fleet_ceiling": 4, "buffer_shuttles": 1 },
//!   "cost": { "hourly_rate": 84.0, "block_duration_hours": 0.5, "weeks_per_month": 4.0 },
//!   "granularity_minutes": 30,
//!   "hourly_rate_range": { "min": 70.0, "max": 100.0 }
//! }
//! ```

use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PlanError;
use crate::model::TimeGrid;
use crate::policy::{CapacityPolicy, CostPolicy};

/// Business bounds for the hourly rate, enforced here rather than by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateRange {
    pub min: f64,
    pub max: f64,
}

impl Default for RateRange {
    fn default() -> Self {
        Self {
            min: 70.0,
            max: 100.0,
        }
    }
}

impl RateRange {
    pub fn contains(&self, rate: f64) -> bool {
        (self.min..=self.max).contains(&rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub capacity: CapacityPolicy,
    pub cost: CostPolicy,
    pub granularity_minutes: u16,
    pub hourly_rate_range: RateRange,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            capacity: CapacityPolicy::default(),
            cost: CostPolicy::default(),
            granularity_minutes: 30,
            hourly_rate_range: RateRange::default(),
        }
    }
}

impl PlannerConfig {
    /// Loads the config from a JSON file at `path`; missing keys take defaults.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(content)?;
        config.check_range()?;
        let rate = config.cost.hourly_rate;
        config.set_hourly_rate(rate);
        Ok(config)
    }

    /// Applies `SHUTTLE_HOURLY_RATE`, `SHUTTLE_SEATS_PER_SHUTTLE`,
    /// `SHUTTLE_FLEET_CEILING` and `SHUTTLE_BUFFER_SHUTTLES` when set.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(rate) = env_var::<f64>("SHUTTLE_HOURLY_RATE")? {
            self.set_hourly_rate(rate);
        }
        if let Some(seats) = env_var("SHUTTLE_SEATS_PER_SHUTTLE")? {
            self.capacity.seats_per_shuttle = seats;
        }
        if let Some(ceiling) = env_var("SHUTTLE_FLEET_CEILING")? {
            self.capacity.fleet_ceiling = ceiling;
        }
        if let Some(buffer) = env_var("SHUTTLE_BUFFER_SHUTTLES")? {
            self.capacity.buffer_shuttles = buffer;
        }
        Ok(())
    }

    /// Sets the hourly rate, clamping it into the configured range.
    ///
    /// Non-finite rates are stored unchanged so the planner can reject them.
    pub fn set_hourly_rate(&mut self, rate: f64) {
        let range = self.hourly_rate_range;
        let effective = if rate.is_finite() && !range.contains(rate) {
            let clamped = rate.clamp(range.min, range.max);
            warn!(
                requested = rate,
                clamped,
                min = range.min,
                max = range.max,
                "Hourly rate outside configured range"
            );
            clamped
        } else {
            rate
        };
        self.cost.hourly_rate = effective;
    }

    /// The canonical time blocks for the configured granularity.
    pub fn grid(&self) -> Result<TimeGrid, PlanError> {
        let grid = TimeGrid::new(self.granularity_minutes)?;
        if (grid.block_hours() - self.cost.block_duration_hours).abs() > f64::EPSILON {
            warn!(
                granularity_minutes = self.granularity_minutes,
                block_duration_hours = self.cost.block_duration_hours,
                "Block duration does not match the time grid"
            );
        }
        Ok(grid)
    }

    fn check_range(&self) -> Result<()> {
        let RateRange { min, max } = self.hourly_rate_range;
        if !(min.is_finite() && max.is_finite() && min <= max) {
            bail!("hourly_rate_range must satisfy min <= max, got [{min}, {max}]");
        }
        Ok(())
    }
}

fn env_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse()
                .with_context(|| format!("parsing {name}={raw:?}"))?;
            debug!(name, "Config override from environment");
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.capacity.seats_per_shuttle, 16);
        assert_eq!(config.capacity.fleet_ceiling, 4);
        assert_eq!(config.capacity.buffer_shuttles, 1);
        assert_eq!(config.cost.hourly_rate, 84.0);
        assert_eq!(config.grid().unwrap().blocks().len(), 48);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            PlannerConfig::from_json(r#"{ "capacity": { "fleet_ceiling": 6 } }"#).unwrap();
        assert_eq!(config.capacity.fleet_ceiling, 6);
        assert_eq!(config.capacity.seats_per_shuttle, 16);
        assert_eq!(config.cost.weeks_per_month, 4.0);
    }

    #[test]
    fn test_rate_clamped_into_range() {
        let mut config = PlannerConfig::default();
        config.set_hourly_rate(120.0);
        assert_eq!(config.cost.hourly_rate, 100.0);
        config.set_hourly_rate(50.0);
        assert_eq!(config.cost.hourly_rate, 70.0);
        config.set_hourly_rate(91.0);
        assert_eq!(config.cost.hourly_rate, 91.0);
    }

    #[test]
    fn test_custom_range_from_json() {
        let config = PlannerConfig::from_json(
            r#"{ "cost": { "hourly_rate": 60.0 }, "hourly_rate_range": { "min": 50.0, "max": 95.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.cost.hourly_rate, 60.0);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result =
            PlannerConfig::from_json(r#"{ "hourly_rate_range": { "min": 100.0, "max": 70.0 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_nan_rate_left_for_planner() {
        let mut config = PlannerConfig::default();
        config.set_hourly_rate(f64::NAN);
        assert!(config.cost.hourly_rate.is_nan());
        assert!(config.cost.validate().is_err());
    }

    #[test]
    fn test_bad_granularity() {
        let config = PlannerConfig {
            granularity_minutes: 50,
            ..Default::default()
        };
        assert!(matches!(config.grid(), Err(PlanError::InvalidPolicy(_))));
    }
}
