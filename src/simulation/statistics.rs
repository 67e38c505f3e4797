//! Per-tick statistics snapshots
//!
//! [`TickStatistics`] is the record every downstream consumer (exporters, the
//! analyzer, observers) reads. Route maps are ordered by name so serialized
//! output is stable between runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Aggregates for a single route at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatistics {
    pub count: usize,
    pub density: f64,
    pub mean_speed: f64,
    pub congested: bool,
}

/// Network-wide aggregates for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickStatistics {
    /// 1-based tick index, 0 for a snapshot taken outside the tick loop
    pub tick: u32,
    pub elapsed_minutes: f64,
    pub vehicle_count: usize,
    pub mean_speed_kmh: f64,
    pub congestion_ratio_percent: f64,
    pub congested_route_count: usize,
    pub route_count: usize,
    pub per_route: BTreeMap<String, RouteStatistics>,
}

impl TickStatistics {
    pub fn with_tick(mut self, tick: u32) -> Self {
        self.tick = tick;
        self
    }
}
