//! Scenario documents: loading a network from JSON and saving one back

use std::fs;
use std::path::Path;

use log::info;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::{SimError, SimResult};
use super::network::Network;
use super::route::Route;
use super::traffic_light::TrafficLight;
use super::types::{DEFAULT_CONGESTION_THRESHOLD, DEFAULT_LANES, DEFAULT_SPEED_LIMIT};
use super::vehicle::Vehicle;

fn default_speed_limit() -> f64 {
    DEFAULT_SPEED_LIMIT
}

fn default_lanes() -> u32 {
    DEFAULT_LANES
}

fn default_cycle_seconds() -> f64 {
    5.0
}

fn default_vehicle_count() -> usize {
    10
}

fn default_speed_min() -> f64 {
    60.0
}

fn default_speed_max() -> f64 {
    120.0
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioConfig {
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_vehicles: Option<InitialVehiclesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub congestion_threshold: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    pub name: String,
    pub length: f64,
    #[serde(default = "default_speed_limit")]
    pub speed_limit: f64,
    #[serde(default = "default_lanes")]
    pub lanes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traffic_lights: Vec<TrafficLightConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrafficLightConfig {
    pub position: f64,
    #[serde(default = "default_cycle_seconds")]
    pub cycle_seconds: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub from: String,
    pub to: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitialVehiclesConfig {
    #[serde(default = "default_vehicle_count")]
    pub count: usize,
    #[serde(default = "default_speed_min")]
    pub speed_min: f64,
    #[serde(default = "default_speed_max")]
    pub speed_max: f64,
    /// Routes vehicles may start on; every route when empty
    #[serde(default)]
    pub routes: Vec<String>,
}

impl Default for InitialVehiclesConfig {
    fn default() -> Self {
        Self {
            count: default_vehicle_count(),
            speed_min: default_speed_min(),
            speed_max: default_speed_max(),
            routes: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    /// Read and parse a scenario document
    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| SimError::config(path, format!("cannot read file: {e}")))?;
        serde_json::from_str(&contents)
            .map_err(|e| SimError::config(path, format!("malformed document: {e}")))
    }

    /// Describe an existing network, so it can be saved and loaded again
    pub fn from_network(network: &Network) -> Self {
        let routes = network
            .routes()
            .map(|route| RouteConfig {
                name: route.name.clone(),
                length: route.length,
                speed_limit: route.speed_limit,
                lanes: route.lanes,
                capacity: route.capacity,
                traffic_lights: route
                    .signals()
                    .iter()
                    .map(|signal| TrafficLightConfig {
                        position: signal.position,
                        cycle_seconds: signal.light.cycle,
                    })
                    .collect(),
            })
            .collect();

        let connections = network
            .connections()
            .into_iter()
            .map(|(from, to)| ConnectionConfig { from, to })
            .collect();

        Self {
            routes,
            connections,
            initial_vehicles: Some(InitialVehiclesConfig {
                count: network.vehicle_count(),
                ..InitialVehiclesConfig::default()
            }),
            congestion_threshold: Some(network.congestion_threshold),
        }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> SimResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Build the network described by this document
    ///
    /// `source` names the document in error messages. Network errors, such as a
    /// connection to an unknown route, are reported as configuration errors.
    pub fn build_network<R: Rng>(
        &self,
        source: impl AsRef<Path>,
        rng: &mut R,
    ) -> SimResult<Network> {
        let source = source.as_ref();
        let mut network = Network::default();
        network.congestion_threshold = self
            .congestion_threshold
            .unwrap_or(DEFAULT_CONGESTION_THRESHOLD);

        for route_config in &self.routes {
            if route_config.length <= 0.0 {
                return Err(SimError::config(
                    source,
                    format!("route '{}' must have a positive length", route_config.name),
                ));
            }

            let mut route = Route::new(route_config.name.clone(), route_config.length)
                .with_speed_limit(route_config.speed_limit)
                .with_lanes(route_config.lanes);
            if let Some(capacity) = route_config.capacity {
                route = route.with_capacity(capacity);
            }
            for light in &route_config.traffic_lights {
                route.add_traffic_light(light.position, TrafficLight::new(light.cycle_seconds));
            }

            network
                .add_route(route)
                .map_err(|e| SimError::config(source, e))?;
        }

        for connection in &self.connections {
            network
                .connect(&connection.from, &connection.to)
                .map_err(|e| SimError::config(source, e))?;
        }

        if let Some(initial_vehicles) = &self.initial_vehicles {
            place_initial_vehicles(&mut network, initial_vehicles, source, rng)?;
        }

        info!(
            "Scenario loaded: {} routes, {} vehicles",
            network.route_count(),
            network.vehicle_count()
        );

        Ok(network)
    }

    /// A ring road with one exit, used when no scenario file is given
    pub fn demo() -> Self {
        let route = |name: &str, length: f64, speed_limit: f64| RouteConfig {
            name: name.to_string(),
            length,
            speed_limit,
            lanes: DEFAULT_LANES,
            capacity: None,
            traffic_lights: Vec::new(),
        };
        let connection = |from: &str, to: &str| ConnectionConfig {
            from: from.to_string(),
            to: to.to_string(),
        };

        let mut boulevard = route("Boulevard", 2.0, 50.0);
        boulevard.traffic_lights.push(TrafficLightConfig {
            position: 1.5,
            cycle_seconds: 120.0,
        });

        Self {
            routes: vec![
                route("A1", 5.0, 130.0),
                route("Ring North", 3.0, 70.0),
                route("Ring South", 3.0, 70.0),
                boulevard,
                route("Exit", 1.0, 50.0),
            ],
            connections: vec![
                connection("A1", "Ring North"),
                connection("Ring North", "Ring South"),
                connection("Ring South", "Ring North"),
                connection("Ring South", "Boulevard"),
                connection("Boulevard", "Exit"),
            ],
            initial_vehicles: Some(InitialVehiclesConfig {
                count: 20,
                routes: vec!["A1".to_string(), "Ring North".to_string()],
                ..InitialVehiclesConfig::default()
            }),
            congestion_threshold: None,
        }
    }
}

fn place_initial_vehicles<R: Rng>(
    network: &mut Network,
    config: &InitialVehiclesConfig,
    source: &Path,
    rng: &mut R,
) -> SimResult<()> {
    if config.speed_min < 0.0 || config.speed_min > config.speed_max {
        return Err(SimError::config(
            source,
            format!(
                "invalid initial speed range {}..{}",
                config.speed_min, config.speed_max
            ),
        ));
    }

    let start_routes = if config.routes.is_empty() {
        network.route_names()
    } else {
        config.routes.clone()
    };

    for _ in 0..config.count {
        let speed = rng.random_range(config.speed_min..=config.speed_max);
        let id = network.allocate_vehicle_id();
        let vehicle = Vehicle::new(id, speed);

        let route_name = start_routes.choose(rng).map(String::as_str);
        network
            .add_vehicle(vehicle, route_name)
            .map_err(|e| SimError::config(source, e))?;
    }

    Ok(())
}

/// Load a scenario document and build its network in one step
pub fn load_network<R: Rng>(path: impl AsRef<Path>, rng: &mut R) -> SimResult<Network> {
    let path = path.as_ref();
    ScenarioConfig::from_path(path)?.build_network(path, rng)
}
