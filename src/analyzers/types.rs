//! Data types produced by the aggregation and planning pipeline.

use std::collections::HashMap;

use chrono::Weekday;

use crate::analyzers::utility::mean;
use crate::error::PlanError;
use crate::model::{CellKey, TimeBlock};
use crate::policy::CapacityPolicy;

/// Demand statistics for one (time block, weekday) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandCell {
    pub key: CellKey,
    pub observation_count: u64,
    pub total_passengers: u64,
    pub average_passengers: f64,
}

impl DemandCell {
    pub(crate) fn new(key: CellKey, observation_count: u64, total_passengers: u64) -> Self {
        let average_passengers = if observation_count == 0 {
            0.0
        } else {
            total_passengers as f64 / observation_count as f64
        };
        Self {
            key,
            observation_count,
            total_passengers,
            average_passengers,
        }
    }
}

/// Every (time block, weekday) cell of a planning grid, zero-filled where no
/// observation landed.
#[derive(Debug, Clone)]
pub struct DemandTable {
    pub(crate) time_blocks: Vec<TimeBlock>,
    pub(crate) weekdays: Vec<Weekday>,
    pub(crate) cells: HashMap<CellKey, DemandCell>,
}

impl DemandTable {
    pub fn get(&self, key: &CellKey) -> Option<&DemandCell> {
        self.cells.get(key)
    }

    pub fn time_blocks(&self) -> &[TimeBlock] {
        &self.time_blocks
    }

    pub fn weekdays(&self) -> &[Weekday] {
        &self.weekdays
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells ordered by time block, then by weekday.
    pub fn iter(&self) -> impl Iterator<Item = &DemandCell> + '_ {
        self.time_blocks.iter().flat_map(move |block| {
            self.weekdays
                .iter()
                .filter_map(move |day| self.cells.get(&CellKey::new(*block, *day)))
        })
    }
}

/// An observation the aggregator refused, with its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub index: usize,
    pub error: PlanError,
}

/// Output of a full aggregation run.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub table: DemandTable,
    pub rejected: Vec<RejectedRecord>,
}

/// Shuttle provisioning for a single demand cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetRecommendation {
    pub key: CellKey,
    /// Shuttles needed to seat the average demand, before buffer and ceiling.
    pub raw_need: u32,
    pub shuttle_count: u32,
    /// Raw need alone exceeds the fleet ceiling; the cell is under-provisioned.
    pub saturated: bool,
    /// Weekly cost of operating this cell once.
    pub cell_cost: f64,
}

/// Fleet plan over a whole demand table.
#[derive(Debug, Clone)]
pub struct FleetPlan {
    pub monthly_cost: f64,
    pub cost_by_weekday: Vec<(Weekday, f64)>,
    pub monthly_shuttle_hours: f64,
    /// Policy the recommendations were computed under.
    pub capacity: CapacityPolicy,
    pub(crate) recommendations: Vec<FleetRecommendation>,
    pub(crate) index: HashMap<CellKey, usize>,
}

impl FleetPlan {
    /// Recommendations in table order: by time block, then by weekday.
    pub fn recommendations(&self) -> &[FleetRecommendation] {
        &self.recommendations
    }

    pub fn get(&self, key: &CellKey) -> Option<&FleetRecommendation> {
        self.index
            .get(key)
            .and_then(|i| self.recommendations.get(*i))
    }

    pub fn cost_for(&self, day: Weekday) -> Option<f64> {
        self.cost_by_weekday
            .iter()
            .find(|(d, _)| *d == day)
            .map(|(_, cost)| *cost)
    }

    pub fn saturated_cells(&self) -> impl Iterator<Item = &FleetRecommendation> + '_ {
        self.recommendations.iter().filter(|r| r.saturated)
    }

    /// Mean shuttle count across weekdays for each time block, in block order.
    pub fn mean_shuttles_by_block(&self) -> Vec<(TimeBlock, f64)> {
        let mut by_block: Vec<(TimeBlock, Vec<f64>)> = Vec::new();
        for rec in &self.recommendations {
            let count = f64::from(rec.shuttle_count);
            let same_block = by_block
                .last()
                .is_some_and(|(block, _)| *block == rec.key.time_block);
            if !same_block {
                by_block.push((rec.key.time_block, Vec::new()));
            }
            if let Some((_, counts)) = by_block.last_mut() {
                counts.push(count);
            }
        }
        by_block
            .into_iter()
            .map(|(block, counts)| (block, mean(&counts)))
            .collect()
    }
}

/// Mean passengers at one pickup location within a drill-down cell.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationDemand {
    pub location: String,
    pub observation_count: u64,
    pub average_passengers: f64,
}

/// Read-only projection of one cell for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillDown {
    pub cell: DemandCell,
    pub recommendation: FleetRecommendation,
    /// Share of provisioned seats the average demand fills.
    pub loop_efficiency: f64,
    pub locations: Option<Vec<LocationDemand>>,
}
