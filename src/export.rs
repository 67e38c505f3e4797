//! Writers for the statistics history and analysis reports
//!
//! Every writer refuses an empty history rather than producing an empty file.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::analysis::AnalysisReport;
use crate::simulation::{SimError, SimResult, TickStatistics};

pub const HISTORY_JSON_FILE: &str = "simulation_history.json";
pub const GLOBAL_CSV_FILE: &str = "simulation_global.csv";
pub const ROUTES_CSV_FILE: &str = "simulation_routes.csv";
pub const REPORT_TEXT_FILE: &str = "analysis_report.txt";

fn ensure_not_empty(history: &[TickStatistics]) -> SimResult<()> {
    if history.is_empty() {
        return Err(SimError::InvalidArgument("no data to export".to_string()));
    }
    Ok(())
}

/// Writes result files into one output directory
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    /// Creates the output directory if it does not exist yet
    pub fn new(output_dir: impl Into<PathBuf>) -> SimResult<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The full history as a JSON array of tick records
    pub fn write_history_json(&self, history: &[TickStatistics]) -> SimResult<PathBuf> {
        ensure_not_empty(history)?;
        let path = self.output_dir.join(HISTORY_JSON_FILE);
        fs::write(&path, serde_json::to_string_pretty(history)?)?;
        info!("JSON export written to {}", path.display());
        Ok(path)
    }

    /// One CSV row per tick with the network-wide aggregates
    pub fn write_global_csv(&self, history: &[TickStatistics]) -> SimResult<PathBuf> {
        ensure_not_empty(history)?;
        let path = self.output_dir.join(GLOBAL_CSV_FILE);
        let mut writer = csv::Writer::from_path(&path)?;

        writer.write_record([
            "tick",
            "elapsed_minutes",
            "vehicle_count",
            "mean_speed_kmh",
            "congestion_ratio_percent",
            "congested_routes",
        ])?;
        for snapshot in history {
            writer.write_record([
                snapshot.tick.to_string(),
                snapshot.elapsed_minutes.to_string(),
                snapshot.vehicle_count.to_string(),
                format!("{:.2}", snapshot.mean_speed_kmh),
                format!("{:.2}", snapshot.congestion_ratio_percent),
                snapshot.congested_route_count.to_string(),
            ])?;
        }
        writer.flush()?;

        info!("Global CSV export written to {}", path.display());
        Ok(path)
    }

    /// One CSV row per tick and route
    pub fn write_route_csv(&self, history: &[TickStatistics]) -> SimResult<PathBuf> {
        ensure_not_empty(history)?;
        let path = self.output_dir.join(ROUTES_CSV_FILE);
        let mut writer = csv::Writer::from_path(&path)?;

        writer.write_record([
            "tick",
            "route",
            "vehicle_count",
            "density",
            "mean_speed_kmh",
            "congested",
        ])?;
        for snapshot in history {
            for (name, route) in &snapshot.per_route {
                writer.write_record([
                    snapshot.tick.to_string(),
                    name.clone(),
                    route.count.to_string(),
                    format!("{:.2}", route.density),
                    format!("{:.2}", route.mean_speed),
                    route.congested.to_string(),
                ])?;
            }
        }
        writer.flush()?;

        info!("Route CSV export written to {}", path.display());
        Ok(path)
    }

    pub fn write_text_report(&self, report: &AnalysisReport) -> SimResult<PathBuf> {
        let path = self.output_dir.join(REPORT_TEXT_FILE);
        fs::write(&path, render_report(report))?;
        info!("Text report written to {}", path.display());
        Ok(path)
    }
}

/// Human-readable rendering of an analysis report
pub fn render_report(report: &AnalysisReport) -> String {
    let rule = "-".repeat(80);
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(out, "{:^80}", "SIMULATION ANALYSIS REPORT");
    let _ = writeln!(out, "{}\n", "=".repeat(80));

    let summary = &report.summary;
    let _ = writeln!(out, "GENERAL SUMMARY\n{rule}");
    let _ = writeln!(out, "Ticks simulated: {}", summary.ticks);
    let _ = writeln!(out, "Total duration: {:.0} minutes", summary.total_minutes);
    let _ = writeln!(out, "Mean speed: {:.2} km/h", summary.mean_speed);
    let _ = writeln!(out, "Median speed: {:.2} km/h", summary.median_speed);
    let _ = writeln!(out, "Speed std-dev: {:.2} km/h", summary.speed_std_dev);
    let _ = writeln!(out, "Efficiency score: {:.1}/100\n", summary.efficiency);

    let congestion = &report.congestion;
    let _ = writeln!(out, "CONGESTION\n{rule}");
    let _ = writeln!(
        out,
        "Mean congestion ratio: {:.2}%\n",
        congestion.mean_ratio_percent
    );
    if congestion.zones.is_empty() {
        let _ = writeln!(out, "No significant congestion zone detected.");
    } else {
        let _ = writeln!(out, "Frequently congested routes:");
        let mut zones: Vec<(&String, &usize)> = congestion.zones.iter().collect();
        zones.sort_by(|a, b| b.1.cmp(a.1));
        for (route, count) in zones {
            let percent = *count as f64 / summary.ticks.max(1) as f64 * 100.0;
            let _ = writeln!(out, "  * {route}: {count} ticks ({percent:.1}%)");
        }
    }
    if !congestion.peak_periods.is_empty() {
        let _ = writeln!(
            out,
            "\nPeak periods detected: {}",
            congestion.peak_periods.len()
        );
        for peak in congestion.peak_periods.iter().take(5) {
            let _ = writeln!(
                out,
                "  * Tick {}: {:.1}% congestion",
                peak.tick, peak.congestion_percent
            );
        }
    }
    let _ = writeln!(out);

    let vehicles = &report.vehicles;
    let _ = writeln!(out, "VEHICLES\n{rule}");
    let _ = writeln!(out, "Initial: {}", vehicles.initial);
    let _ = writeln!(out, "Final: {}", vehicles.final_count);
    let _ = writeln!(out, "Maximum: {}", vehicles.maximum);
    let _ = writeln!(out, "Minimum: {}", vehicles.minimum);
    let _ = writeln!(out, "Mean: {:.1}\n", vehicles.mean);

    let _ = writeln!(out, "DENSITY PER ROUTE\n{rule}");
    for (route, density) in &report.density {
        let _ = writeln!(
            out,
            "{route}: mean {:.2}, median {:.2}, min {:.2}, max {:.2} veh/km",
            density.mean, density.median, density.min, density.max
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "ROUTE RANKING\n{rule}");
    for (rank, route) in report.routes.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", rank + 1, route.name);
        let _ = writeln!(
            out,
            "   Mean speed: {:.1} km/h | Density: {:.1} veh/km | Congestion: {:.1}%",
            route.mean_speed, route.mean_density, route.congestion_percent
        );
    }

    out
}
