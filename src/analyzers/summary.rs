use std::collections::HashSet;

use crate::analyzers::types::DemandTable;
use crate::analyzers::utility::mean;
use crate::model::{Observation, TimeBlock};

/// Headline figures for a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub valid_records: usize,
    pub total_passengers: u64,
    pub service_days: usize,
    pub daily_average_passengers: f64,
    pub active_locations: usize,
    /// Block with the highest mean of its weekday averages; earliest wins ties.
    pub peak_time_block: Option<TimeBlock>,
}

impl DatasetSummary {
    /// Only observations that pass record validation contribute. A record
    /// that would overflow the passenger total counts as invalid.
    pub fn from_observations(observations: &[Observation], table: &DemandTable) -> Self {
        let mut dates = HashSet::new();
        let mut locations = HashSet::new();
        let mut total_passengers = 0u64;
        let mut valid_records = 0usize;

        for o in observations.iter().filter(|o| o.cell_key().is_ok()) {
            let Some(total) = total_passengers.checked_add(o.passenger_count.unsigned_abs())
            else {
                continue;
            };
            valid_records += 1;
            total_passengers = total;
            dates.insert(o.date);
            locations.insert(o.pickup_location.as_str());
        }

        let daily_average_passengers = if dates.is_empty() {
            0.0
        } else {
            total_passengers as f64 / dates.len() as f64
        };

        Self {
            total_records: observations.len(),
            valid_records,
            total_passengers,
            service_days: dates.len(),
            daily_average_passengers,
            active_locations: locations.len(),
            peak_time_block: peak_time_block(table),
        }
    }
}

fn peak_time_block(table: &DemandTable) -> Option<TimeBlock> {
    let mut peak: Option<(TimeBlock, f64)> = None;

    for block in table.time_blocks() {
        let averages: Vec<f64> = table
            .iter()
            .filter(|c| c.key.time_block == *block)
            .map(|c| c.average_passengers)
            .collect();
        let m = mean(&averages);
        if m > 0.0 && peak.is_none_or(|(_, best)| m > best) {
            peak = Some((*block, m));
        }
    }

    peak.map(|(block, _)| block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::aggregate;
    use crate::model::{TimeGrid, WEEKDAYS};
    use chrono::NaiveDate;

    fn obs(day: u32, block: &str, location: &str, count: i64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            time_block: block.to_string(),
            pickup_location: location.to_string(),
            passenger_count: count,
            day_of_week: None,
        }
    }

    #[test]
    fn test_summary_figures() {
        let rows = vec![
            obs(1, "07:00", "Marriott Downtown", 10),
            obs(1, "07:00", "Hilton Anchorage", 6),
            obs(2, "17:30", "Hilton Anchorage", 4),
            obs(2, "17:30", "Hilton Anchorage", -2),
        ];
        let blocks = TimeGrid::default().blocks();
        let table = aggregate(&rows, &WEEKDAYS, &blocks).table;
        let summary = DatasetSummary::from_observations(&rows, &table);

        assert_eq!(summary.total_records, 4);
        assert_eq!(summary.valid_records, 3);
        assert_eq!(summary.total_passengers, 20);
        assert_eq!(summary.service_days, 2);
        assert_eq!(summary.daily_average_passengers, 10.0);
        assert_eq!(summary.active_locations, 2);
        assert_eq!(summary.peak_time_block.unwrap().to_string(), "07:00");
    }

    #[test]
    fn test_empty_dataset_has_no_peak() {
        let blocks = TimeGrid::default().blocks();
        let table = aggregate(&[], &WEEKDAYS, &blocks).table;
        let summary = DatasetSummary::from_observations(&[], &table);

        assert_eq!(summary.daily_average_passengers, 0.0);
        assert!(summary.peak_time_block.is_none());
    }

    #[test]
    fn test_overflowing_record_not_counted() {
        let rows = vec![
            obs(1, "07:00", "Marriott Downtown", i64::MAX),
            obs(2, "07:00", "Marriott Downtown", i64::MAX),
            obs(3, "07:00", "Hilton Anchorage", i64::MAX),
        ];
        let blocks = TimeGrid::default().blocks();
        let table = aggregate(&rows, &WEEKDAYS, &blocks).table;
        let summary = DatasetSummary::from_observations(&rows, &table);

        assert_eq!(summary.valid_records, 2);
        assert_eq!(summary.total_passengers, 2 * i64::MAX.unsigned_abs());
        assert_eq!(summary.service_days, 2);
        assert_eq!(summary.active_locations, 1);
    }

    #[test]
    fn test_peak_ties_pick_earliest() {
        let rows = vec![
            obs(1, "18:00", "Marriott Downtown", 5),
            obs(1, "06:00", "Marriott Downtown", 5),
        ];
        let blocks = TimeGrid::default().blocks();
        let table = aggregate(&rows, &WEEKDAYS, &blocks).table;
        let summary = DatasetSummary::from_observations(&rows, &table);

        assert_eq!(summary.peak_time_block.unwrap().to_string(), "06:00");
    }
}
