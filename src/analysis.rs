//! Post-hoc analysis of a recorded statistics history

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::Serialize;
use sorted_vec::SortedVec;

use crate::simulation::TickStatistics;

/// Ticks a route must be congested in to count as a congestion zone
pub const DEFAULT_ZONE_MIN_TICKS: usize = 5;

/// Width of the sliding window used to find peak periods, in ticks
pub const DEFAULT_PEAK_WINDOW: usize = 5;

/// Mean congestion above which a window is a peak period, in percent
pub const PEAK_CONGESTION_PERCENT: f64 = 50.0;

/// Speed that earns the full speed half of the efficiency score, in km/h
pub const REFERENCE_SPEED: f64 = 120.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakPeriod {
    /// Tick at the center of the window
    pub tick: u32,
    pub congestion_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensitySummary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleEvolution {
    pub initial: usize,
    pub final_count: usize,
    pub maximum: usize,
    pub minimum: usize,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePerformance {
    pub name: String,
    pub mean_speed: f64,
    pub mean_density: f64,
    /// Share of ticks the route was congested, in percent
    pub congestion_percent: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralSummary {
    pub ticks: usize,
    pub total_minutes: f64,
    pub mean_speed: f64,
    pub median_speed: f64,
    pub speed_std_dev: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionSummary {
    pub mean_ratio_percent: f64,
    pub zones: BTreeMap<String, usize>,
    pub peak_periods: Vec<PeakPeriod>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub summary: GeneralSummary,
    pub congestion: CongestionSummary,
    pub density: BTreeMap<String, DensitySummary>,
    pub vehicles: VehicleEvolution,
    pub routes: Vec<RoutePerformance>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let sorted = SortedVec::from_unsorted(values.iter().copied().map(OrderedFloat).collect());
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2].into_inner(),
        _ => (sorted[n / 2 - 1].into_inner() + sorted[n / 2].into_inner()) / 2.0,
    }
}

/// Sample standard deviation, 0 with fewer than two values
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Read-only analysis over the snapshots of one run
pub struct Analyzer<'a> {
    history: &'a [TickStatistics],
}

impl<'a> Analyzer<'a> {
    pub fn new(history: &'a [TickStatistics]) -> Self {
        Self { history }
    }

    /// Mean speeds of the ticks where anything moved
    fn moving_speeds(&self) -> Vec<f64> {
        self.history
            .iter()
            .map(|s| s.mean_speed_kmh)
            .filter(|speed| *speed > 0.0)
            .collect()
    }

    pub fn mean_speed(&self) -> f64 {
        mean(&self.moving_speeds())
    }

    pub fn median_speed(&self) -> f64 {
        median(&self.moving_speeds())
    }

    pub fn speed_std_dev(&self) -> f64 {
        std_dev(&self.moving_speeds())
    }

    pub fn mean_congestion(&self) -> f64 {
        let ratios: Vec<f64> = self
            .history
            .iter()
            .map(|s| s.congestion_ratio_percent)
            .collect();
        mean(&ratios)
    }

    /// Routes congested in at least `min_ticks` ticks, with their congested tick count
    pub fn congestion_zones(&self, min_ticks: usize) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for snapshot in self.history {
            for (name, route) in &snapshot.per_route {
                if route.congested {
                    *counts.entry(name.clone()).or_default() += 1;
                }
            }
        }
        counts.retain(|_, count| *count >= min_ticks);
        counts
    }

    /// Windows of `window` ticks whose mean congestion exceeds 50 %
    pub fn peak_periods(&self, window: usize) -> Vec<PeakPeriod> {
        if window == 0 || self.history.len() < window {
            return Vec::new();
        }

        self.history
            .windows(window)
            .filter_map(|slice| {
                let ratios: Vec<f64> = slice.iter().map(|s| s.congestion_ratio_percent).collect();
                let congestion_percent = mean(&ratios);
                (congestion_percent > PEAK_CONGESTION_PERCENT).then(|| PeakPeriod {
                    tick: slice[window / 2].tick,
                    congestion_percent,
                })
            })
            .collect()
    }

    pub fn density_by_route(&self) -> BTreeMap<String, DensitySummary> {
        let mut densities: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for snapshot in self.history {
            for (name, route) in &snapshot.per_route {
                densities.entry(name.clone()).or_default().push(route.density);
            }
        }

        densities
            .into_iter()
            .map(|(name, values)| {
                let summary = DensitySummary {
                    mean: mean(&values),
                    median: median(&values),
                    min: values.iter().copied().fold(f64::INFINITY, f64::min),
                    max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    std_dev: std_dev(&values),
                };
                (name, summary)
            })
            .collect()
    }

    pub fn vehicle_evolution(&self) -> Option<VehicleEvolution> {
        let first = self.history.first()?;
        let last = self.history.last()?;
        let counts: Vec<f64> = self.history.iter().map(|s| s.vehicle_count as f64).collect();

        Some(VehicleEvolution {
            initial: first.vehicle_count,
            final_count: last.vehicle_count,
            maximum: self.history.iter().map(|s| s.vehicle_count).max()?,
            minimum: self.history.iter().map(|s| s.vehicle_count).min()?,
            mean: mean(&counts),
        })
    }

    /// Score from 0 to 100: half from mean speed, half from the absence of congestion
    pub fn efficiency_score(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let speed_score = self.mean_speed() / REFERENCE_SPEED * 50.0;
        let flow_score = (100.0 - self.mean_congestion()) / 2.0;
        (speed_score + flow_score).min(100.0)
    }

    /// Routes ranked best first by `mean_speed - 0.5 * congestion_percent`
    pub fn compare_routes(&self) -> Vec<RoutePerformance> {
        let mut speeds: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        let mut densities: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        let mut congested_ticks: BTreeMap<&str, usize> = BTreeMap::new();

        for snapshot in self.history {
            for (name, route) in &snapshot.per_route {
                speeds.entry(name.as_str()).or_default().push(route.mean_speed);
                densities.entry(name.as_str()).or_default().push(route.density);
                let congested = congested_ticks.entry(name.as_str()).or_default();
                if route.congested {
                    *congested += 1;
                }
            }
        }

        let ticks = self.history.len().max(1) as f64;
        let mut performances: Vec<RoutePerformance> = speeds
            .iter()
            .map(|(name, route_speeds)| {
                let mean_speed = mean(route_speeds);
                let congestion_percent =
                    congested_ticks.get(name).copied().unwrap_or(0) as f64 / ticks * 100.0;
                RoutePerformance {
                    name: name.to_string(),
                    mean_speed,
                    mean_density: densities.get(name).map_or(0.0, |d| mean(d)),
                    congestion_percent,
                    score: mean_speed - congestion_percent * 0.5,
                }
            })
            .collect();

        performances.sort_by(|a, b| b.score.total_cmp(&a.score));
        performances
    }

    /// Every analysis bundled together, `None` for an empty history
    pub fn report(&self) -> Option<AnalysisReport> {
        let last = self.history.last()?;

        Some(AnalysisReport {
            summary: GeneralSummary {
                ticks: self.history.len(),
                total_minutes: last.elapsed_minutes,
                mean_speed: self.mean_speed(),
                median_speed: self.median_speed(),
                speed_std_dev: self.speed_std_dev(),
                efficiency: self.efficiency_score(),
            },
            congestion: CongestionSummary {
                mean_ratio_percent: self.mean_congestion(),
                zones: self.congestion_zones(DEFAULT_ZONE_MIN_TICKS),
                peak_periods: self.peak_periods(DEFAULT_PEAK_WINDOW),
            },
            density: self.density_by_route(),
            vehicles: self.vehicle_evolution()?,
            routes: self.compare_routes(),
        })
    }
}
