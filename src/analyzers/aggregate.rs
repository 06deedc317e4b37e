use std::collections::HashMap;

use chrono::Weekday;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::analyzers::types::{Aggregation, DemandCell, DemandTable, RejectedRecord};
use crate::analyzers::utility::dedup_ordered;
use crate::error::PlanError;
use crate::model::{CellKey, Observation, TimeBlock};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Tally {
    count: u64,
    total: u64,
}

/// Running passenger tallies over a fixed (time block, weekday) grid.
///
/// Every cell exists from construction, so folding never creates keys and
/// two aggregators over the same grid can be merged in any order.
#[derive(Debug, Clone)]
pub struct Aggregator {
    time_blocks: Vec<TimeBlock>,
    weekdays: Vec<Weekday>,
    tallies: HashMap<CellKey, Tally>,
}

impl Aggregator {
    pub fn new(weekdays: &[Weekday], time_blocks: &[TimeBlock]) -> Self {
        let time_blocks = dedup_ordered(time_blocks);
        let weekdays = dedup_ordered(weekdays);

        let mut tallies = HashMap::with_capacity(time_blocks.len() * weekdays.len());
        for block in &time_blocks {
            for day in &weekdays {
                tallies.insert(CellKey::new(*block, *day), Tally::default());
            }
        }

        Self {
            time_blocks,
            weekdays,
            tallies,
        }
    }

    /// Folds one observation into its cell.
    ///
    /// A rejected observation leaves every tally untouched, including one
    /// whose count would overflow the cell's passenger total.
    pub fn fold(&mut self, observation: &Observation) -> Result<CellKey, PlanError> {
        let key = observation.cell_key()?;
        let tally = self.tallies.get_mut(&key).ok_or_else(|| {
            PlanError::InvalidRecord(format!("{key} is not a cell of the planning grid"))
        })?;

        let total = tally
            .total
            .checked_add(observation.passenger_count.unsigned_abs())
            .ok_or_else(|| overflow(&key))?;
        tally.count += 1;
        tally.total = total;
        Ok(key)
    }

    /// Adds another aggregator's tallies into this one.
    ///
    /// Both must have been built over the same axes. On error `self` is left
    /// unchanged.
    pub fn merge(&mut self, other: Aggregator) -> Result<(), PlanError> {
        if self.time_blocks != other.time_blocks || self.weekdays != other.weekdays {
            return Err(PlanError::InvalidPolicy(
                "cannot merge aggregators built over different grids".to_string(),
            ));
        }

        let mut merged = Vec::with_capacity(other.tallies.len());
        for (key, theirs) in other.tallies {
            let ours = self.tallies.get(&key).copied().unwrap_or_default();
            let total = ours
                .total
                .checked_add(theirs.total)
                .ok_or_else(|| overflow(&key))?;
            merged.push((
                key,
                Tally {
                    count: ours.count + theirs.count,
                    total,
                },
            ));
        }
        self.tallies.extend(merged);
        Ok(())
    }

    /// Computes averages and freezes the table.
    pub fn finish(self) -> DemandTable {
        let cells = self
            .tallies
            .into_iter()
            .map(|(key, t)| (key, DemandCell::new(key, t.count, t.total)))
            .collect();

        DemandTable {
            time_blocks: self.time_blocks,
            weekdays: self.weekdays,
            cells,
        }
    }
}

/// Aggregates observations into a zero-filled demand table.
///
/// Malformed observations are skipped and reported in
/// [`Aggregation::rejected`] rather than aborting the run.
pub fn aggregate(
    observations: &[Observation],
    weekdays: &[Weekday],
    time_blocks: &[TimeBlock],
) -> Aggregation {
    let mut aggregator = Aggregator::new(weekdays, time_blocks);
    let mut rejected = Vec::new();

    for (index, observation) in observations.iter().enumerate() {
        if let Err(error) = aggregator.fold(observation) {
            rejected.push(RejectedRecord { index, error });
        }
    }

    finish(aggregator, rejected, observations.len())
}

/// Same result as [`aggregate`], folding partitions of the input on the rayon
/// pool and merging the partial tallies.
pub fn aggregate_parallel(
    observations: &[Observation],
    weekdays: &[Weekday],
    time_blocks: &[TimeBlock],
) -> Aggregation {
    let merged = observations
        .par_iter()
        .enumerate()
        .fold(
            || (Aggregator::new(weekdays, time_blocks), Vec::new()),
            |(mut aggregator, mut rejected), (index, observation)| {
                if let Err(error) = aggregator.fold(observation) {
                    rejected.push(RejectedRecord { index, error });
                }
                (aggregator, rejected)
            },
        )
        .map(Ok::<_, PlanError>)
        .try_reduce(
            || (Aggregator::new(weekdays, time_blocks), Vec::new()),
            |(mut left, mut left_rejected), (right, right_rejected)| {
                left.merge(right)?;
                left_rejected.extend(right_rejected);
                Ok((left, left_rejected))
            },
        );

    match merged {
        Ok((aggregator, mut rejected)) => {
            rejected.sort_by_key(|r| r.index);
            finish(aggregator, rejected, observations.len())
        }
        // partitions that fit on their own can still overflow once combined;
        // only input order decides which record is rejected
        Err(error) => {
            warn!(%error, "Parallel merge failed, aggregating sequentially");
            aggregate(observations, weekdays, time_blocks)
        }
    }
}

fn overflow(key: &CellKey) -> PlanError {
    PlanError::InvalidRecord(format!("passenger total for {key} overflows"))
}

fn finish(aggregator: Aggregator, rejected: Vec<RejectedRecord>, total: usize) -> Aggregation {
    for r in &rejected {
        warn!(index = r.index, error = %r.error, "Skipping observation");
    }

    let table = aggregator.finish();
    debug!(
        observations = total,
        rejected = rejected.len(),
        cells = table.len(),
        "Aggregation complete"
    );

    Aggregation { table, rejected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TimeGrid, WEEKDAYS};
    use chrono::NaiveDate;

    fn obs(day: &str, block: &str, location: &str, count: i64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            time_block: block.to_string(),
            pickup_location: location.to_string(),
            passenger_count: count,
            day_of_week: Some(day.to_string()),
        }
    }

    fn key(block: &str, day: Weekday) -> CellKey {
        CellKey::new(block.parse().unwrap(), day)
    }

    fn sample_rows() -> Vec<Observation> {
        vec![
            obs("Monday", "07:00", "Marriott Downtown", 4),
            obs("Monday", "07:00", "Hilton Anchorage", 8),
            obs("Monday", "07:00", "Sheraton Anchorage", 3),
            obs("Tuesday", "07:00", "Marriott Downtown", 5),
            obs("Sunday", "23:30", "Hilton Anchorage", 1),
            obs("Saturday", "12:00", "Sheraton Anchorage", 0),
        ]
    }

    #[test]
    fn test_every_cell_present_for_empty_input() {
        let blocks = TimeGrid::default().blocks();
        let result = aggregate(&[], &WEEKDAYS, &blocks);

        assert_eq!(result.table.len(), 48 * 7);
        assert!(result.rejected.is_empty());
        for cell in result.table.iter() {
            assert_eq!(cell.observation_count, 0);
            assert_eq!(cell.average_passengers, 0.0);
        }
    }

    #[test]
    fn test_totals_and_averages() {
        let blocks = TimeGrid::default().blocks();
        let result = aggregate(&sample_rows(), &WEEKDAYS, &blocks);
        let table = &result.table;

        let monday = table.get(&key("07:00", Weekday::Mon)).unwrap();
        assert_eq!(monday.observation_count, 3);
        assert_eq!(monday.total_passengers, 15);
        assert_eq!(monday.average_passengers, 5.0);

        let saturday = table.get(&key("12:00", Weekday::Sat)).unwrap();
        assert_eq!(saturday.observation_count, 1);
        assert_eq!(saturday.average_passengers, 0.0);

        let untouched = table.get(&key("03:00", Weekday::Wed)).unwrap();
        assert_eq!(untouched.observation_count, 0);
    }

    #[test]
    fn test_iteration_order_follows_axes() {
        let blocks = TimeGrid::default().blocks();
        let result = aggregate(&[], &WEEKDAYS, &blocks);
        let first: Vec<_> = result.table.iter().take(8).map(|c| c.key).collect();

        assert_eq!(first[0], key("00:00", Weekday::Mon));
        assert_eq!(first[6], key("00:00", Weekday::Sun));
        assert_eq!(first[7], key("00:30", Weekday::Mon));
    }

    #[test]
    fn test_negative_count_rejected_without_side_effects() {
        let blocks = TimeGrid::default().blocks();
        let mut aggregator = Aggregator::new(&WEEKDAYS, &blocks);
        aggregator.fold(&obs("Monday", "07:00", "Hilton Anchorage", 5)).unwrap();

        let err = aggregator
            .fold(&obs("Monday", "07:00", "Hilton Anchorage", -1))
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidRecord(_)));

        let table = aggregator.finish();
        let cell = table.get(&key("07:00", Weekday::Mon)).unwrap();
        assert_eq!(cell.observation_count, 1);
        assert_eq!(cell.total_passengers, 5);
    }

    #[test]
    fn test_overflowing_count_rejected_without_side_effects() {
        let blocks = TimeGrid::default().blocks();
        let rows = vec![
            obs("Monday", "07:00", "Hilton Anchorage", i64::MAX),
            obs("Monday", "07:00", "Hilton Anchorage", i64::MAX),
            obs("Monday", "07:00", "Hilton Anchorage", i64::MAX),
            obs("Monday", "07:00", "Hilton Anchorage", 1),
        ];
        let result = aggregate(&rows, &WEEKDAYS, &blocks);

        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].index, 2);
        assert!(matches!(result.rejected[0].error, PlanError::InvalidRecord(_)));

        let cell = result.table.get(&key("07:00", Weekday::Mon)).unwrap();
        assert_eq!(cell.observation_count, 3);
        assert_eq!(cell.total_passengers, 2 * i64::MAX.unsigned_abs() + 1);
    }

    #[test]
    fn test_parallel_overflow_matches_sequential() {
        let blocks = TimeGrid::default().blocks();
        let rows = vec![obs("Monday", "07:00", "Hilton Anchorage", i64::MAX); 3];

        let sequential = aggregate(&rows, &WEEKDAYS, &blocks);
        let parallel = aggregate_parallel(&rows, &WEEKDAYS, &blocks);

        assert_eq!(parallel.rejected, sequential.rejected);
        let k = key("07:00", Weekday::Mon);
        assert_eq!(parallel.table.get(&k), sequential.table.get(&k));
    }

    #[test]
    fn test_merge_overflow_leaves_tallies_unchanged() {
        let blocks = TimeGrid::default().blocks();
        let mut a = Aggregator::new(&WEEKDAYS, &blocks);
        let mut b = Aggregator::new(&WEEKDAYS, &blocks);
        a.fold(&obs("Monday", "07:00", "Hilton Anchorage", i64::MAX)).unwrap();
        a.fold(&obs("Tuesday", "08:00", "Hilton Anchorage", 3)).unwrap();
        b.fold(&obs("Monday", "07:00", "Hilton Anchorage", i64::MAX)).unwrap();
        b.fold(&obs("Monday", "07:00", "Hilton Anchorage", 2)).unwrap();
        b.fold(&obs("Tuesday", "08:00", "Hilton Anchorage", 4)).unwrap();

        assert!(matches!(a.merge(b), Err(PlanError::InvalidRecord(_))));

        let table = a.finish();
        let tuesday = table.get(&key("08:00", Weekday::Tue)).unwrap();
        assert_eq!(tuesday.total_passengers, 3);
        assert_eq!(tuesday.observation_count, 1);
    }

    #[test]
    fn test_merge_rejects_different_grids() {
        let blocks = TimeGrid::default().blocks();
        let mut weekly = Aggregator::new(&WEEKDAYS, &blocks);
        let mut monday = Aggregator::new(&[Weekday::Mon], &blocks);
        monday.fold(&obs("Monday", "07:00", "Hilton Anchorage", 5)).unwrap();

        let err = weekly.merge(monday).unwrap_err();
        assert!(matches!(err, PlanError::InvalidPolicy(_)));
        assert_eq!(
            weekly
                .finish()
                .get(&key("07:00", Weekday::Mon))
                .unwrap()
                .observation_count,
            0
        );
    }

    #[test]
    fn test_non_canonical_block_rejected() {
        let blocks = TimeGrid::default().blocks();
        let rows = vec![
            obs("Monday", "07:15", "Hilton Anchorage", 2),
            obs("Blursday", "07:00", "Hilton Anchorage", 2),
            obs("Monday", "7 am", "Hilton Anchorage", 2),
            obs("Monday", "07:00", "Hilton Anchorage", 2),
        ];
        let result = aggregate(&rows, &WEEKDAYS, &blocks);

        let indices: Vec<_> = result.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(
            result
                .table
                .get(&key("07:00", Weekday::Mon))
                .unwrap()
                .observation_count,
            1
        );
    }

    #[test]
    fn test_weekday_outside_axis_rejected() {
        let blocks = TimeGrid::default().blocks();
        let weekdays = [Weekday::Mon, Weekday::Tue];
        let result = aggregate(&sample_rows(), &weekdays, &blocks);

        assert_eq!(result.table.len(), 48 * 2);
        assert_eq!(result.rejected.len(), 2);
    }

    #[test]
    fn test_duplicate_axis_entries_collapse() {
        let blocks: Vec<TimeBlock> = vec!["07:00".parse().unwrap(), "07:00".parse().unwrap()];
        let result = aggregate(&[], &[Weekday::Mon, Weekday::Mon], &blocks);
        assert_eq!(result.table.len(), 1);
    }

    #[test]
    fn test_merge_matches_direct_aggregation() {
        let blocks = TimeGrid::default().blocks();
        let rows = sample_rows();
        let (left, right) = rows.split_at(2);

        let mut a = Aggregator::new(&WEEKDAYS, &blocks);
        let mut b = Aggregator::new(&WEEKDAYS, &blocks);
        for o in left {
            a.fold(o).unwrap();
        }
        for o in right {
            b.fold(o).unwrap();
        }
        b.merge(a).unwrap();
        let merged = b.finish();

        let direct = aggregate(&rows, &WEEKDAYS, &blocks).table;
        for cell in direct.iter() {
            let other = merged.get(&cell.key).unwrap();
            assert_eq!(other.observation_count, cell.observation_count);
            assert_eq!(other.total_passengers, cell.total_passengers);
            assert!((other.average_passengers - cell.average_passengers).abs() < 1e-9);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let blocks = TimeGrid::default().blocks();
        let mut rows = Vec::new();
        for i in 0..2_000i64 {
            let day = ["Monday", "Wednesday", "Saturday"][(i % 3) as usize];
            let block = if i % 5 == 0 { "08:00" } else { "17:30" };
            rows.push(obs(day, block, "Marriott Downtown", i % 11));
        }
        rows.push(obs("Monday", "08:00", "Marriott Downtown", -3));

        let sequential = aggregate(&rows, &WEEKDAYS, &blocks);
        let parallel = aggregate_parallel(&rows, &WEEKDAYS, &blocks);

        assert_eq!(parallel.rejected, sequential.rejected);
        assert_eq!(parallel.table.len(), sequential.table.len());
        for cell in sequential.table.iter() {
            assert_eq!(parallel.table.get(&cell.key), Some(cell));
        }
    }
}
