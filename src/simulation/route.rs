//! A single road segment and the per-tick update of the vehicles on it

use std::cmp::Reverse;
use std::fmt;

use log::warn;
use ordered_float::OrderedFloat;

use super::error::MembershipError;
use super::traffic_light::TrafficLight;
use super::types::{
    Leader, RouteHandle, VehicleId, DEFAULT_CAPACITY_PER_LANE, DEFAULT_LANES, DEFAULT_SPEED_LIMIT,
};
use super::vehicle::VehicleRegistry;

/// A traffic light installed at a fixed distance from the start of a route
#[derive(Debug, Clone)]
pub struct Signal {
    pub position: f64,
    pub light: TrafficLight,
}

/// A one-way road in the network
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    /// Length in km
    pub length: f64,
    /// Speed limit in km/h
    pub speed_limit: f64,
    pub lanes: u32,
    /// Maximum number of vehicles accepted at once, unlimited when `None`
    pub capacity: Option<usize>,
    /// Member vehicles, reordered front to back on every update
    vehicles: Vec<VehicleId>,
    signals: Vec<Signal>,
    /// Vehicles stopped at a red stop line during the last update
    held: Vec<VehicleId>,
}

impl Route {
    pub fn new(name: impl Into<String>, length: f64) -> Self {
        Self {
            name: name.into(),
            length,
            speed_limit: DEFAULT_SPEED_LIMIT,
            lanes: DEFAULT_LANES,
            capacity: None,
            vehicles: Vec::new(),
            signals: Vec::new(),
            held: Vec::new(),
        }
    }

    pub fn with_speed_limit(mut self, speed_limit: f64) -> Self {
        self.speed_limit = speed_limit;
        self
    }

    pub fn with_lanes(mut self, lanes: u32) -> Self {
        self.lanes = lanes;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// The handle vehicles keep to refer to this route
    pub fn handle(&self) -> RouteHandle {
        RouteHandle {
            name: self.name.clone(),
            length: self.length,
            speed_limit: self.speed_limit,
        }
    }

    pub fn add_vehicle(&mut self, vehicle_id: VehicleId) -> Result<(), MembershipError> {
        if let Some(capacity) = self.capacity {
            if self.vehicles.len() >= capacity {
                return Err(MembershipError::AtCapacity {
                    route: self.name.clone(),
                    capacity,
                });
            }
        }

        if self.contains(vehicle_id) {
            return Err(MembershipError::Duplicate(vehicle_id));
        }

        self.vehicles.push(vehicle_id);
        Ok(())
    }

    /// Returns `false` if the vehicle was not on this route
    pub fn remove_vehicle(&mut self, vehicle_id: VehicleId) -> bool {
        let before = self.vehicles.len();
        self.vehicles.retain(|id| *id != vehicle_id);
        self.held.retain(|id| *id != vehicle_id);
        self.vehicles.len() != before
    }

    pub fn contains(&self, vehicle_id: VehicleId) -> bool {
        self.vehicles.contains(&vehicle_id)
    }

    pub fn vehicle_ids(&self) -> &[VehicleId] {
        &self.vehicles
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn add_traffic_light(&mut self, position: f64, light: TrafficLight) {
        let position = position.clamp(0.0, self.length);
        self.signals.push(Signal { position, light });
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Closest stop line at or ahead of `position` whose light stays red for `window_secs`
    fn red_stop_line_ahead(&self, position: f64, window_secs: f64) -> Option<f64> {
        self.signals
            .iter()
            .filter(|signal| {
                signal.position >= position && signal.light.is_red_throughout(window_secs)
            })
            .map(|signal| OrderedFloat(signal.position))
            .min()
            .map(OrderedFloat::into_inner)
    }

    /// Run one car-following step for every vehicle on the route
    ///
    /// Vehicles are processed front to back, so each follower reacts to where its
    /// leader is after the leader already moved in this tick.
    pub fn update_vehicles(&mut self, dt: f64, vehicles: &mut VehicleRegistry) {
        let window_secs = dt * 60.0;
        self.held.clear();

        self.vehicles.sort_by_key(|id| {
            Reverse(OrderedFloat(
                vehicles.get(id).map_or(f64::NEG_INFINITY, |v| v.position),
            ))
        });

        let mut leader: Option<Leader> = None;
        for vehicle_id in &self.vehicles {
            let Some(vehicle) = vehicles.get_mut(vehicle_id) else {
                warn!("Route {} tracks unknown vehicle {}", self.name, vehicle_id);
                continue;
            };

            vehicle.adjust_speed(leader);

            // Reaching the line counts, so a vehicle already waiting on it stays held
            match self.red_stop_line_ahead(vehicle.position, window_secs) {
                Some(stop_line) if vehicle.projected_position(dt) >= stop_line => {
                    vehicle.stop_at(stop_line, dt);
                    self.held.push(*vehicle_id);
                }
                _ => vehicle.advance(dt),
            }

            leader = Some(Leader {
                position: vehicle.position,
                speed: vehicle.speed,
            });
        }

        for signal in &mut self.signals {
            signal.light.update_timer(window_secs);
        }
    }

    /// Remove and return every vehicle that reached the end of the route
    ///
    /// Vehicles held by a red light on the route end stay on the route.
    pub fn collect_arrived(&mut self, vehicles: &VehicleRegistry) -> Vec<VehicleId> {
        let held = &self.held;
        let (arrived, remaining): (Vec<VehicleId>, Vec<VehicleId>) =
            self.vehicles.iter().partition(|id| {
                !held.contains(*id)
                    && vehicles
                        .get(*id)
                        .is_some_and(|vehicle| vehicle.has_arrived())
            });

        self.vehicles = remaining;
        arrived
    }

    /// Vehicles per km
    pub fn density(&self) -> f64 {
        if self.length == 0.0 {
            return 0.0;
        }
        self.vehicles.len() as f64 / self.length
    }

    /// Mean speed of the vehicles on the route, 0 when empty
    pub fn mean_speed(&self, vehicles: &VehicleRegistry) -> f64 {
        let speeds: Vec<f64> = self
            .vehicles
            .iter()
            .filter_map(|id| vehicles.get(id))
            .map(|vehicle| vehicle.speed)
            .collect();

        if speeds.is_empty() {
            return 0.0;
        }
        speeds.iter().sum::<f64>() / speeds.len() as f64
    }

    pub fn is_congested(&self, threshold: f64) -> bool {
        self.density() > threshold
    }

    /// How many more vehicles fit, given a per-lane capacity per km
    pub fn remaining_capacity(&self, capacity_per_lane: u32) -> usize {
        let total = (self.length * self.lanes as f64 * capacity_per_lane as f64) as usize;
        total.saturating_sub(self.vehicles.len())
    }

    pub fn remaining_default_capacity(&self) -> usize {
        self.remaining_capacity(DEFAULT_CAPACITY_PER_LANE)
    }

    pub(crate) fn clear_vehicles(&mut self) {
        self.vehicles.clear();
        self.held.clear();
    }

    /// Whether the last update stopped this vehicle at a red light
    pub fn is_held(&self, vehicle_id: VehicleId) -> bool {
        self.held.contains(&vehicle_id)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} km, max {} km/h]: {} vehicles, density {:.1} veh/km",
            self.name,
            self.length,
            self.speed_limit,
            self.vehicles.len(),
            self.density()
        )
    }
}
