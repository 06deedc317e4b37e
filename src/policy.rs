//! Capacity and cost policies consumed by the fleet planner.

use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// How many shuttles a cell may get and how many passengers each one seats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityPolicy {
    pub seats_per_shuttle: u32,
    pub fleet_ceiling: u32,
    pub buffer_shuttles: u32,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            seats_per_shuttle: 16,
            fleet_ceiling: 4,
            buffer_shuttles: 1,
        }
    }
}

impl CapacityPolicy {
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.seats_per_shuttle == 0 {
            return Err(PlanError::InvalidPolicy(
                "seats_per_shuttle must be positive".into(),
            ));
        }
        if self.fleet_ceiling == 0 {
            return Err(PlanError::InvalidPolicy(
                "fleet_ceiling must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Turns shuttle counts into money.
///
/// `hourly_rate` is only required to be finite and non-negative here; the
/// business range (e.g. $70–$100) is applied by the configuration layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostPolicy {
    pub hourly_rate: f64,
    pub block_duration_hours: f64,
    pub weeks_per_month: f64,
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self {
            hourly_rate: 84.0,
            block_duration_hours: 0.5,
            weeks_per_month: 4.0,
        }
    }
}

impl CostPolicy {
    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.hourly_rate.is_finite() || self.hourly_rate < 0.0 {
            return Err(PlanError::InvalidPolicy(format!(
                "hourly_rate must be a finite non-negative number, got {}",
                self.hourly_rate
            )));
        }
        if !self.block_duration_hours.is_finite() || self.block_duration_hours <= 0.0 {
            return Err(PlanError::InvalidPolicy(format!(
                "block_duration_hours must be positive, got {}",
                self.block_duration_hours
            )));
        }
        if !self.weeks_per_month.is_finite() || self.weeks_per_month < 0.0 {
            return Err(PlanError::InvalidPolicy(format!(
                "weeks_per_month must be a finite non-negative number, got {}",
                self.weeks_per_month
            )));
        }
        Ok(())
    }
}
