//! Demand aggregation and fleet sizing.
//!
//! Observations are folded into a zero-filled (time block, weekday) demand
//! table, which the planner turns into per-cell shuttle counts and a
//! monthly cost estimate. Everything here is pure and stateless.

pub mod aggregate;
pub mod drilldown;
pub mod level;
pub mod planner;
pub mod summary;
pub mod types;
pub mod utility;

pub use aggregate::{Aggregator, aggregate, aggregate_parallel};
pub use drilldown::drill_down;
pub use planner::plan;
pub use types::{
    Aggregation, DemandCell, DemandTable, DrillDown, FleetPlan, FleetRecommendation,
    LocationDemand, RejectedRecord,
};
