//! Road network: routes, the directed graph connecting them and the vehicle registry
//!
//! Routes are kept in a name-ordered map and vehicles in an id-ordered registry so
//! that a seeded random source always produces the same run.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::{debug, warn};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::Direction;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::error::NetworkError;
use super::route::Route;
use super::statistics::{RouteStatistics, TickStatistics};
use super::traffic_light::TrafficLight;
use super::types::{IdAllocator, VehicleId, DEFAULT_CONGESTION_THRESHOLD};
use super::vehicle::{Vehicle, VehicleRegistry};

/// The complete road network of a simulation
#[derive(Debug, Clone)]
pub struct Network {
    pub name: String,

    /// Routes by name
    routes: BTreeMap<String, Route>,

    /// Downstream connections between routes; cycles are allowed
    graph: StableDiGraph<String, ()>,

    /// Maps route names to their node indices in the graph
    route_to_node: HashMap<String, NodeIndex>,

    /// Every vehicle in the network, whether or not it is on a route
    vehicles: VehicleRegistry,

    ids: IdAllocator,

    /// Simulated time in minutes
    pub elapsed_minutes: f64,

    /// Density above which a route counts as congested, in vehicles per km
    pub congestion_threshold: f64,
}

impl Default for Network {
    fn default() -> Self {
        Self::new("Main network")
    }
}

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: BTreeMap::new(),
            graph: StableDiGraph::new(),
            route_to_node: HashMap::new(),
            vehicles: VehicleRegistry::new(),
            ids: IdAllocator::new(),
            elapsed_minutes: 0.0,
            congestion_threshold: DEFAULT_CONGESTION_THRESHOLD,
        }
    }

    /// Adds a route to the network graph
    pub fn add_route(&mut self, route: Route) -> Result<(), NetworkError> {
        if self.routes.contains_key(&route.name) {
            return Err(NetworkError::DuplicateRoute(route.name));
        }

        let node_index = self.graph.add_node(route.name.clone());
        self.route_to_node.insert(route.name.clone(), node_index);
        self.routes.insert(route.name.clone(), route);
        Ok(())
    }

    /// Remove a route and every vehicle on it
    /// Returns `false` if no route has that name
    pub fn remove_route(&mut self, name: &str) -> bool {
        let Some(route) = self.routes.remove(name) else {
            return false;
        };

        for vehicle_id in route.vehicle_ids() {
            self.vehicles.remove(vehicle_id);
        }

        // Removing the node also removes every edge touching it
        if let Some(node_index) = self.route_to_node.remove(name) {
            self.graph.remove_node(node_index);
        }

        true
    }

    pub fn route(&self, name: &str) -> Option<&Route> {
        self.routes.get(name)
    }

    pub fn route_mut(&mut self, name: &str) -> Option<&mut Route> {
        self.routes.get_mut(name)
    }

    /// All routes ordered by name
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn route_names(&self) -> Vec<String> {
        self.routes.keys().cloned().collect()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    fn node(&self, name: &str) -> Result<NodeIndex, NetworkError> {
        self.route_to_node
            .get(name)
            .copied()
            .ok_or_else(|| NetworkError::RouteNotFound(name.to_string()))
    }

    /// Adds a directed connection: vehicles finishing `from` may continue on `to`
    pub fn connect(&mut self, from: &str, to: &str) -> Result<(), NetworkError> {
        let from_node = self.node(from)?;
        let to_node = self.node(to)?;

        if self.graph.find_edge(from_node, to_node).is_none() {
            self.graph.add_edge(from_node, to_node, ());
        }
        Ok(())
    }

    /// Names of the routes reachable from the end of `name`, ordered by name
    pub fn downstream(&self, name: &str) -> Result<Vec<String>, NetworkError> {
        let node_index = self.node(name)?;

        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(node_index, Direction::Outgoing)
            .filter_map(|neighbor| self.graph.node_weight(neighbor).cloned())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Every connection as `(from, to)` pairs, ordered by name
    pub fn connections(&self) -> Vec<(String, String)> {
        let mut connections: Vec<(String, String)> = self
            .routes
            .keys()
            .flat_map(|from| {
                self.downstream(from)
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |to| (from.clone(), to))
            })
            .collect();
        connections.sort();
        connections
    }

    pub fn add_traffic_light(
        &mut self,
        route_name: &str,
        position: f64,
        light: TrafficLight,
    ) -> Result<(), NetworkError> {
        let route = self
            .routes
            .get_mut(route_name)
            .ok_or_else(|| NetworkError::RouteNotFound(route_name.to_string()))?;
        route.add_traffic_light(position, light);
        Ok(())
    }

    pub fn allocate_vehicle_id(&mut self) -> VehicleId {
        self.ids.next_vehicle_id()
    }

    /// Register a vehicle, optionally placing it at the start of a route
    ///
    /// Returns `Ok(false)` when the vehicle is already registered or the route is full.
    pub fn add_vehicle(
        &mut self,
        vehicle: Vehicle,
        route_name: Option<&str>,
    ) -> Result<bool, NetworkError> {
        match route_name {
            Some(route_name) => self.add_vehicle_at(vehicle, route_name, 0.0),
            None => {
                if self.vehicles.contains_key(&vehicle.id) {
                    warn!("Vehicle {} is already registered", vehicle.id);
                    return Ok(false);
                }
                let mut vehicle = vehicle;
                vehicle.clear_route();
                self.vehicles.insert(vehicle.id, vehicle);
                Ok(true)
            }
        }
    }

    /// Register a vehicle and place it on `route_name` at `position`
    pub fn add_vehicle_at(
        &mut self,
        mut vehicle: Vehicle,
        route_name: &str,
        position: f64,
    ) -> Result<bool, NetworkError> {
        if self.vehicles.contains_key(&vehicle.id) {
            warn!("Vehicle {} is already registered", vehicle.id);
            return Ok(false);
        }

        let route = self
            .routes
            .get_mut(route_name)
            .ok_or_else(|| NetworkError::RouteNotFound(route_name.to_string()))?;

        if let Err(e) = route.add_vehicle(vehicle.id) {
            warn!("Could not place vehicle {}: {}", vehicle.id, e);
            return Ok(false);
        }

        vehicle.change_route(Some(route.handle()));
        vehicle.position = position.clamp(0.0, route.length);
        self.vehicles.insert(vehicle.id, vehicle);
        Ok(true)
    }

    /// Create a vehicle with a fresh id
    /// Returns `Ok(None)` if the route could not take it
    pub fn spawn_vehicle(
        &mut self,
        speed: f64,
        route_name: Option<&str>,
    ) -> Result<Option<VehicleId>, NetworkError> {
        let id = self.allocate_vehicle_id();
        let added = self.add_vehicle(Vehicle::new(id, speed), route_name)?;
        Ok(added.then_some(id))
    }

    /// Remove a vehicle from its route and from the network
    pub fn remove_vehicle(&mut self, vehicle_id: VehicleId) -> bool {
        let Some(vehicle) = self.vehicles.remove(&vehicle_id) else {
            return false;
        };

        if let Some(route) = vehicle.route_name().and_then(|name| self.routes.get_mut(name)) {
            route.remove_vehicle(vehicle_id);
        }
        true
    }

    pub fn vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&vehicle_id)
    }

    pub fn vehicle_mut(&mut self, vehicle_id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(&vehicle_id)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Move a registered vehicle onto another route, back at position 0
    ///
    /// Returns `Ok(false)` when no route is given or the target route is full; the
    /// vehicle then keeps its current route.
    pub fn change_route(
        &mut self,
        vehicle_id: VehicleId,
        route_name: Option<&str>,
    ) -> Result<bool, NetworkError> {
        let current = self
            .vehicles
            .get(&vehicle_id)
            .ok_or(NetworkError::VehicleNotFound(vehicle_id))?
            .route_name()
            .map(str::to_string);

        let Some(route_name) = route_name else {
            return Ok(false);
        };
        if !self.routes.contains_key(route_name) {
            return Err(NetworkError::RouteNotFound(route_name.to_string()));
        }

        if let Some(old_route) = current.as_deref().and_then(|name| self.routes.get_mut(name)) {
            old_route.remove_vehicle(vehicle_id);
        }

        let new_route = self
            .routes
            .get_mut(route_name)
            .ok_or_else(|| NetworkError::RouteNotFound(route_name.to_string()))?;

        if let Err(e) = new_route.add_vehicle(vehicle_id) {
            debug!("Vehicle {} stays on {:?}: {}", vehicle_id, current, e);
            if let Some(old_route) = current.as_deref().and_then(|name| self.routes.get_mut(name)) {
                let restored = old_route.add_vehicle(vehicle_id);
                debug_assert!(
                    restored.is_ok(),
                    "vehicle {vehicle_id} was a member of its route a moment ago"
                );
            }
            return Ok(false);
        }

        let handle = new_route.handle();
        if let Some(vehicle) = self.vehicles.get_mut(&vehicle_id) {
            vehicle.change_route(Some(handle));
        }
        Ok(true)
    }

    /// Advance the whole network by `dt` minutes
    pub fn update<R: Rng>(&mut self, dt: f64, rng: &mut R) {
        // Routes do not interact during car-following, so their order does not matter
        for route in self.routes.values_mut() {
            route.update_vehicles(dt, &mut self.vehicles);
        }

        self.handle_transitions(rng);

        self.elapsed_minutes += dt;
    }

    /// Send every vehicle that reached the end of its route to a random downstream
    /// route, or out of the network when there is none
    fn handle_transitions<R: Rng>(&mut self, rng: &mut R) {
        let route_names = self.route_names();

        for route_name in route_names {
            let arrived = match self.routes.get_mut(&route_name) {
                Some(route) => route.collect_arrived(&self.vehicles),
                None => continue,
            };
            if arrived.is_empty() {
                continue;
            }

            let downstream = self.downstream(&route_name).unwrap_or_default();

            for vehicle_id in arrived {
                let Some(next_route) = downstream.choose(rng) else {
                    debug!("Vehicle {} leaves the network at {}", vehicle_id, route_name);
                    self.remove_vehicle(vehicle_id);
                    continue;
                };

                match self.change_route(vehicle_id, Some(next_route.as_str())) {
                    Ok(true) => {
                        debug!("Vehicle {} moves from {} to {}", vehicle_id, route_name, next_route)
                    }
                    // Downstream is full: change_route put it back at the end of this route,
                    // where it stands still until there is room
                    Ok(false) => {
                        if let Some(vehicle) = self.vehicles.get_mut(&vehicle_id) {
                            vehicle.speed = 0.0;
                        }
                    }
                    Err(e) => {
                        warn!("Dropping vehicle {}: {}", vehicle_id, e);
                        self.remove_vehicle(vehicle_id);
                    }
                }
            }
        }
    }

    /// Mean speed over vehicles that are on a route, 0 when there are none
    pub fn mean_speed(&self) -> f64 {
        let speeds: Vec<f64> = self
            .vehicles
            .values()
            .filter(|vehicle| vehicle.route().is_some())
            .map(|vehicle| vehicle.speed)
            .collect();

        if speeds.is_empty() {
            return 0.0;
        }
        speeds.iter().sum::<f64>() / speeds.len() as f64
    }

    pub fn congested_routes(&self) -> Vec<&Route> {
        self.routes
            .values()
            .filter(|route| route.is_congested(self.congestion_threshold))
            .collect()
    }

    /// Snapshot of the current network state, with tick 0
    pub fn statistics(&self) -> TickStatistics {
        let congested_route_count = self.congested_routes().len();
        let congestion_ratio_percent = if self.routes.is_empty() {
            0.0
        } else {
            congested_route_count as f64 / self.routes.len() as f64 * 100.0
        };

        let per_route = self
            .routes
            .iter()
            .map(|(name, route)| {
                (
                    name.clone(),
                    RouteStatistics {
                        count: route.vehicle_count(),
                        density: route.density(),
                        mean_speed: route.mean_speed(&self.vehicles),
                        congested: route.is_congested(self.congestion_threshold),
                    },
                )
            })
            .collect();

        TickStatistics {
            tick: 0,
            elapsed_minutes: self.elapsed_minutes,
            vehicle_count: self.vehicles.len(),
            mean_speed_kmh: self.mean_speed(),
            congestion_ratio_percent,
            congested_route_count,
            route_count: self.routes.len(),
            per_route,
        }
    }

    /// Remove every vehicle and reset the clock, keeping routes and connections
    pub fn reinitialize(&mut self) {
        for route in self.routes.values_mut() {
            route.clear_vehicles();
        }
        for vehicle in self.vehicles.values_mut() {
            vehicle.clear_route();
        }
        self.vehicles.clear();
        self.elapsed_minutes = 0.0;
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        writeln!(f, "  - {} routes", self.routes.len())?;
        writeln!(f, "  - {} vehicles", self.vehicles.len())?;
        writeln!(f, "  - Mean speed: {:.1} km/h", self.mean_speed())?;
        write!(f, "  - Elapsed: {:.0} minutes", self.elapsed_minutes)
    }
}
