use std::collections::BTreeMap;

use crate::analyzers::types::{DemandTable, DrillDown, FleetPlan, LocationDemand};
use crate::model::{CellKey, Observation};

/// Inspects a single cell: its demand, its recommendation, and optionally a
/// per-pickup-location breakdown recomputed from the raw observations.
///
/// Loop efficiency uses the capacity policy recorded on `plan`. Returns
/// `None` when `key` is not part of the table's grid.
pub fn drill_down(
    key: &CellKey,
    table: &DemandTable,
    plan: &FleetPlan,
    observations: Option<&[Observation]>,
) -> Option<DrillDown> {
    let cell = table.get(key)?.clone();
    let recommendation = plan.get(key)?.clone();

    let seats =
        f64::from(recommendation.shuttle_count) * f64::from(plan.capacity.seats_per_shuttle);
    let loop_efficiency = if seats > 0.0 {
        cell.average_passengers / seats
    } else {
        0.0
    };

    Some(DrillDown {
        cell,
        recommendation,
        loop_efficiency,
        locations: observations.map(|rows| location_breakdown(key, rows)),
    })
}

/// Mean passengers per pickup location among the observations of one cell,
/// sorted by location. Records that fail validation, or would overflow their
/// location's total, are ignored.
pub fn location_breakdown(key: &CellKey, observations: &[Observation]) -> Vec<LocationDemand> {
    let mut by_location: BTreeMap<&str, (u64, u64)> = BTreeMap::new();

    for o in observations {
        if o.cell_key().ok().as_ref() != Some(key) {
            continue;
        }
        let entry = by_location.entry(o.pickup_location.as_str()).or_default();
        if let Some(total) = entry.1.checked_add(o.passenger_count.unsigned_abs()) {
            entry.0 += 1;
            entry.1 = total;
        }
    }

    by_location
        .into_iter()
        .map(|(location, (count, total))| LocationDemand {
            location: location.to_string(),
            observation_count: count,
            average_passengers: total as f64 / count as f64,
        })
        .collect()
}
