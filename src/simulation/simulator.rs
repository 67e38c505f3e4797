//! The tick loop that drives a network and records its statistics
//!
//! This is the entry point for running a traffic simulation.

use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::config::ScenarioConfig;
use super::error::{SimError, SimResult};
use super::network::Network;
use super::statistics::TickStatistics;
use super::types::VehicleId;

/// Initial speed range of vehicles entering during a run, in km/h
const SPAWN_SPEED_MIN: f64 = 60.0;
const SPAWN_SPEED_MAX: f64 = 120.0;

/// Callback invoked after every tick with the tick index and its snapshot
pub type Observer = Box<dyn FnMut(u32, &TickStatistics)>;

/// Runs a [`Network`] tick by tick
pub struct Simulator {
    pub network: Network,

    /// One snapshot per tick of the last run, in order
    history: Vec<TickStatistics>,

    observers: Vec<Observer>,

    /// Every random decision of the simulation is drawn from this source
    rng: StdRng,

    /// Log progress lines while running
    pub show_progress: bool,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(Network::default())
    }
}

impl Simulator {
    fn new_internal(network: Network, rng: StdRng) -> Self {
        Self {
            network,
            history: Vec::new(),
            observers: Vec::new(),
            rng,
            show_progress: true,
        }
    }

    pub fn new(network: Network) -> Self {
        Self::new_internal(network, StdRng::from_os_rng())
    }

    /// Create a simulator with a seeded RNG for reproducible simulations
    pub fn new_with_seed(network: Network, seed: u64) -> Self {
        Self::new_internal(network, StdRng::seed_from_u64(seed))
    }

    /// Create a simulator around a caller-provided random source
    pub fn with_rng(network: Network, rng: StdRng) -> Self {
        Self::new_internal(network, rng)
    }

    /// Load a scenario document and build a seeded simulator for it
    ///
    /// The same seed drives initial vehicle placement and the run itself.
    pub fn from_config_file(path: impl AsRef<Path>, seed: Option<u64>) -> SimResult<Self> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let path = path.as_ref();
        let network = ScenarioConfig::from_path(path)?.build_network(path, &mut rng)?;
        Ok(Self::with_rng(network, rng))
    }

    pub fn add_observer(&mut self, observer: impl FnMut(u32, &TickStatistics) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn history(&self) -> &[TickStatistics] {
        &self.history
    }

    /// Spawn a vehicle with a random speed on a random route
    ///
    /// Candidates default to every route. Without any candidate route the vehicle is
    /// registered without a route.
    pub fn add_random_vehicle(
        &mut self,
        candidates: Option<&[String]>,
    ) -> SimResult<Option<VehicleId>> {
        let speed = self.rng.random_range(SPAWN_SPEED_MIN..SPAWN_SPEED_MAX);
        let route_names = match candidates {
            Some(candidates) => candidates.to_vec(),
            None => self.network.route_names(),
        };
        let route_name = route_names.choose(&mut self.rng).map(String::as_str);

        Ok(self.network.spawn_vehicle(speed, route_name)?)
    }

    /// Run `steps` ticks of `dt` minutes each
    ///
    /// Each tick a new vehicle enters with probability `arrival_rate`. Statistics of
    /// previous runs are discarded.
    pub fn run(&mut self, steps: u32, dt: f64, arrival_rate: f64) -> SimResult<()> {
        if steps == 0 {
            return Err(SimError::InvalidArgument(
                "the number of steps must be positive".to_string(),
            ));
        }
        if dt.is_nan() || dt <= 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "time step must be positive, got {dt}"
            )));
        }
        if !(0.0..=1.0).contains(&arrival_rate) {
            return Err(SimError::InvalidArgument(format!(
                "arrival rate must be within [0, 1], got {arrival_rate}"
            )));
        }

        info!("=== SIMULATION START ===");
        info!("Steps: {}, time step: {} min", steps, dt);
        info!("Arrival rate: {:.1}%", arrival_rate * 100.0);
        info!("Initial vehicles: {}", self.network.vehicle_count());

        self.history.clear();
        let progress_every = (steps / 10).max(1);

        for tick in 1..=steps {
            if self.network.route_count() > 0 && self.rng.random_bool(arrival_rate) {
                self.add_random_vehicle(None)?;
            }

            self.network.update(dt, &mut self.rng);

            let snapshot = self.network.statistics().with_tick(tick);

            for observer in &mut self.observers {
                observer(tick, &snapshot);
            }

            if self.show_progress && (tick == 1 || tick == steps || tick % progress_every == 0) {
                log_progress(&snapshot, steps);
            }

            self.history.push(snapshot);
        }

        self.log_summary();
        Ok(())
    }

    /// Log averages and peaks of the last run
    pub fn log_summary(&self) {
        info!("=== SIMULATION COMPLETE ===");

        let Some(last) = self.history.last() else {
            info!("No simulation data available");
            return;
        };

        let ticks = self.history.len() as f64;
        let mean_vehicles =
            self.history.iter().map(|s| s.vehicle_count as f64).sum::<f64>() / ticks;
        let mean_speed = self.history.iter().map(|s| s.mean_speed_kmh).sum::<f64>() / ticks;
        let mean_congestion = self
            .history
            .iter()
            .map(|s| s.congestion_ratio_percent)
            .sum::<f64>()
            / ticks;

        info!("Simulated time: {:.0} min", self.network.elapsed_minutes);
        info!("Mean vehicles: {:.1}", mean_vehicles);
        info!("Mean speed: {:.1} km/h", mean_speed);
        info!("Mean congestion: {:.1}%", mean_congestion);

        if let Some(peak) = self.history.iter().max_by_key(|s| s.vehicle_count) {
            info!("Peak vehicles: {} (tick {})", peak.vehicle_count, peak.tick);
        }
        if let Some(peak) = self
            .history
            .iter()
            .max_by(|a, b| a.congestion_ratio_percent.total_cmp(&b.congestion_ratio_percent))
        {
            info!(
                "Peak congestion: {:.1}% (tick {})",
                peak.congestion_ratio_percent, peak.tick
            );
        }

        info!("Active vehicles: {}", self.network.vehicle_count());
        info!(
            "Congested routes: {}/{}",
            last.congested_route_count, last.route_count
        );
    }

    /// Clear every vehicle, the clock and the recorded history
    pub fn reinitialize(&mut self) {
        self.network.reinitialize();
        self.history.clear();
        info!("Simulation reinitialized");
    }

    /// Save the current network layout as a scenario document
    pub fn save_configuration(&self, path: impl AsRef<Path>) -> SimResult<()> {
        let path = path.as_ref();
        ScenarioConfig::from_network(&self.network).write(path)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

fn log_progress(snapshot: &TickStatistics, steps: u32) {
    let percent = snapshot.tick as f64 / steps as f64 * 100.0;
    info!(
        "[Tick {:4}/{}] ({:5.1}%) | Vehicles: {:3} | Mean speed: {:5.1} km/h | Congestion: {:5.1}%",
        snapshot.tick,
        steps,
        percent,
        snapshot.vehicle_count,
        snapshot.mean_speed_kmh,
        snapshot.congestion_ratio_percent
    );
}
