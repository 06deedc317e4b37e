use std::collections::HashMap;

use tracing::debug;

use crate::analyzers::types::{DemandCell, DemandTable, FleetPlan, FleetRecommendation};
use crate::error::PlanError;
use crate::policy::{CapacityPolicy, CostPolicy};

/// Shuttles for an average demand: `(raw_need, shuttle_count)`.
///
/// Raw need is the seats-per-shuttle ceiling of the demand; the count adds
/// the buffer, caps at the fleet ceiling, and never drops below one because
/// every route is assumed staffed. `capacity` must already be validated.
pub fn shuttles_for(average_passengers: f64, capacity: &CapacityPolicy) -> (u32, u32) {
    let raw_need = if average_passengers > 0.0 {
        // `as` saturates, so absurd demand pins to u32::MAX instead of wrapping
        (average_passengers / f64::from(capacity.seats_per_shuttle)).ceil() as u32
    } else {
        0
    };
    let shuttle_count = capacity
        .fleet_ceiling
        .min(raw_need.saturating_add(capacity.buffer_shuttles))
        .max(1);
    (raw_need, shuttle_count)
}

fn recommend(
    cell: &DemandCell,
    capacity: &CapacityPolicy,
    cost: &CostPolicy,
) -> FleetRecommendation {
    let (raw_need, shuttle_count) = shuttles_for(cell.average_passengers, capacity);
    FleetRecommendation {
        key: cell.key,
        raw_need,
        shuttle_count,
        saturated: raw_need > capacity.fleet_ceiling,
        cell_cost: f64::from(shuttle_count) * cost.block_duration_hours * cost.hourly_rate,
    }
}

/// Recommends a shuttle count for every cell and extrapolates the monthly cost.
///
/// # Errors
///
/// Returns [`PlanError::InvalidPolicy`] if either policy is malformed; no
/// partial plan is produced in that case.
pub fn plan(
    table: &DemandTable,
    capacity: &CapacityPolicy,
    cost: &CostPolicy,
) -> Result<FleetPlan, PlanError> {
    capacity.validate()?;
    cost.validate()?;

    let mut recommendations = Vec::with_capacity(table.len());
    let mut index = HashMap::with_capacity(table.len());
    let mut cost_by_weekday: Vec<_> = table.weekdays().iter().map(|d| (*d, 0.0)).collect();
    let mut weekly_shuttle_hours = 0.0;

    for cell in table.iter() {
        let rec = recommend(cell, capacity, cost);

        if let Some((_, day_cost)) = cost_by_weekday
            .iter_mut()
            .find(|(d, _)| *d == rec.key.weekday)
        {
            *day_cost += rec.cell_cost;
        }
        weekly_shuttle_hours += f64::from(rec.shuttle_count) * cost.block_duration_hours;

        index.insert(rec.key, recommendations.len());
        recommendations.push(rec);
    }

    for (_, day_cost) in cost_by_weekday.iter_mut() {
        *day_cost *= cost.weeks_per_month;
    }
    let monthly_cost =
        recommendations.iter().map(|r| r.cell_cost).sum::<f64>() * cost.weeks_per_month;

    let plan = FleetPlan {
        monthly_shuttle_hours: weekly_shuttle_hours * cost.weeks_per_month,
        recommendations,
        monthly_cost,
        cost_by_weekday,
        capacity: *capacity,
        index,
    };

    debug!(
        cells = plan.recommendations.len(),
        saturated = plan.saturated_cells().count(),
        monthly_cost = plan.monthly_cost,
        "Fleet plan computed"
    );

    Ok(plan)
}
