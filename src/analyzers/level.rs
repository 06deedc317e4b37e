use serde::Serialize;

/// Heat-map band for a cell's average demand.
///
/// | Average passengers | Level  |
/// |--------------------|--------|
/// | > 6                | High   |
/// | > 3                | Medium |
/// | otherwise          | Low    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandLevel {
    Low,
    Medium,
    High,
}

impl DemandLevel {
    pub fn from_average(average_passengers: f64) -> Self {
        match average_passengers {
            a if a > 6.0 => DemandLevel::High,
            a if a > 3.0 => DemandLevel::Medium,
            _ => DemandLevel::Low,
        }
    }
}

/// Indicator for a time block's mean shuttle count across weekdays.
///
/// | Mean shuttles | Pressure |
/// |---------------|----------|
/// | > 3.5         | High     |
/// | > 2           | Medium   |
/// | otherwise     | Low      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FleetPressure {
    Low,
    Medium,
    High,
}

impl FleetPressure {
    pub fn from_mean_shuttles(mean: f64) -> Self {
        match mean {
            m if m > 3.5 => FleetPressure::High,
            m if m > 2.0 => FleetPressure::Medium,
            _ => FleetPressure::Low,
        }
    }
}
