//! Report projection and export for fleet plans.
//!
//! Supports a structured log summary, pretty JSON, and per-cell CSV
//! (optionally gzip-compressed).

use std::fs::File;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analyzers::level::{DemandLevel, FleetPressure};
use crate::analyzers::summary::DatasetSummary;
use crate::analyzers::types::{Aggregation, DrillDown, FleetPlan};
use crate::model::{Observation, weekday_name};
use crate::policy::{CapacityPolicy, CostPolicy};

/// One row of the shuttle-count table.
#[derive(Debug, Clone, Serialize)]
pub struct CellReport {
    pub time_block: String,
    pub day: String,
    pub observation_count: u64,
    pub total_passengers: u64,
    pub average_passengers: f64,
    pub demand_level: DemandLevel,
    pub raw_need: u32,
    pub shuttle_count: u32,
    pub saturated: bool,
    pub cell_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekdayCost {
    pub day: String,
    pub monthly_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockReport {
    pub time_block: String,
    pub mean_shuttles: f64,
    pub pressure: FleetPressure,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub total_records: usize,
    pub rejected_records: usize,
    pub total_passengers: u64,
    pub service_days: usize,
    pub daily_average_passengers: f64,
    pub active_locations: usize,
    pub peak_time_block: Option<String>,
}

/// Serializable view of a complete planning run.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub generated_at: DateTime<Utc>,
    pub capacity: CapacityPolicy,
    pub cost: CostPolicy,
    pub summary: SummaryReport,
    pub monthly_cost: f64,
    pub monthly_shuttle_hours: f64,
    pub saturated_cells: usize,
    pub cost_by_weekday: Vec<WeekdayCost>,
    pub blocks: Vec<BlockReport>,
    pub cells: Vec<CellReport>,
}

impl PlanReport {
    pub fn new(
        aggregation: &Aggregation,
        plan: &FleetPlan,
        summary: &DatasetSummary,
        capacity: &CapacityPolicy,
        cost: &CostPolicy,
    ) -> Self {
        let cells = aggregation
            .table
            .iter()
            .filter_map(|cell| {
                let rec = plan.get(&cell.key)?;
                Some(CellReport {
                    time_block: cell.key.time_block.to_string(),
                    day: weekday_name(cell.key.weekday).to_string(),
                    observation_count: cell.observation_count,
                    total_passengers: cell.total_passengers,
                    average_passengers: cell.average_passengers,
                    demand_level: DemandLevel::from_average(cell.average_passengers),
                    raw_need: rec.raw_need,
                    shuttle_count: rec.shuttle_count,
                    saturated: rec.saturated,
                    cell_cost: rec.cell_cost,
                })
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            capacity: *capacity,
            cost: *cost,
            summary: SummaryReport {
                total_records: summary.total_records,
                rejected_records: aggregation.rejected.len(),
                total_passengers: summary.total_passengers,
                service_days: summary.service_days,
                daily_average_passengers: summary.daily_average_passengers,
                active_locations: summary.active_locations,
                peak_time_block: summary.peak_time_block.map(|b| b.to_string()),
            },
            monthly_cost: plan.monthly_cost,
            monthly_shuttle_hours: plan.monthly_shuttle_hours,
            saturated_cells: plan.saturated_cells().count(),
            cost_by_weekday: plan
                .cost_by_weekday
                .iter()
                .map(|(day, cost)| WeekdayCost {
                    day: weekday_name(*day).to_string(),
                    monthly_cost: *cost,
                })
                .collect(),
            blocks: plan
                .mean_shuttles_by_block()
                .into_iter()
                .map(|(block, mean)| BlockReport {
                    time_block: block.to_string(),
                    mean_shuttles: mean,
                    pressure: FleetPressure::from_mean_shuttles(mean),
                })
                .collect(),
            cells,
        }
    }
}

/// Logs the headline figures of a report as structured events.
pub fn log_plan_summary(report: &PlanReport) {
    let s = &report.summary;
    info!(
        records = s.total_records,
        rejected = s.rejected_records,
        daily_average = %format!("{:.0}", s.daily_average_passengers),
        locations = s.active_locations,
        peak = s.peak_time_block.as_deref().unwrap_or("-"),
        "Demand summary"
    );
    info!(
        hourly_rate = report.cost.hourly_rate,
        monthly_cost = %format!("{:.2}", report.monthly_cost),
        shuttle_hours = report.monthly_shuttle_hours,
        "Monthly cost estimate"
    );
    for day in &report.cost_by_weekday {
        info!(day = %day.day, monthly_cost = %format!("{:.2}", day.monthly_cost), "Weekday cost");
    }
    if report.saturated_cells > 0 {
        warn!(
            cells = report.saturated_cells,
            ceiling = report.capacity.fleet_ceiling,
            "Demand exceeds fleet ceiling in some cells"
        );
    }
}

/// Logs a drill-down view.
pub fn log_drill_down(view: &DrillDown) {
    info!(
        cell = %view.cell.key,
        observations = view.cell.observation_count,
        average = %format!("{:.1}", view.cell.average_passengers),
        shuttles = view.recommendation.shuttle_count,
        saturated = view.recommendation.saturated,
        loop_efficiency = %format!("{:.0}%", view.loop_efficiency * 100.0),
        "Cell detail"
    );
    for loc in view.locations.iter().flatten() {
        info!(
            location = %loc.location,
            observations = loc.observation_count,
            average = %format!("{:.1}", loc.average_passengers),
            "Pickup location"
        );
    }
}

/// Writes the report as pretty-printed JSON.
pub fn write_plan_json(path: &str, report: &PlanReport) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    debug!(path, "Wrote plan JSON");
    Ok(())
}

/// Writes one CSV row per cell, gzip-compressed when `gzip` is set.
pub fn write_plan_csv(path: &str, report: &PlanReport, gzip: bool) -> Result<()> {
    let file = File::create(path)?;
    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write_rows(&mut encoder, &report.cells)?;
        encoder.finish()?;
    } else {
        write_rows(file, &report.cells)?;
    }
    debug!(path, gzip, rows = report.cells.len(), "Wrote plan CSV");
    Ok(())
}

/// Writes observations in the same CSV layout the parser reads.
pub fn write_observations_csv(path: &str, rows: &[Observation]) -> Result<()> {
    write_rows(File::create(path)?, rows)?;
    debug!(path, rows = rows.len(), "Wrote observations CSV");
    Ok(())
}

fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
