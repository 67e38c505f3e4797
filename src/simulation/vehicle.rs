//! Vehicle state and the car-following rule
//!
//! A vehicle only knows the route it drives on through a [`RouteHandle`]; route
//! membership itself is tracked by the route and the network.

use std::collections::BTreeMap;
use std::fmt;

use super::types::{
    Leader, RouteHandle, VehicleId, EMERGENCY_DECELERATION, FOLLOWING_ACCELERATION,
    FREE_ROAD_ACCELERATION, SAFETY_DISTANCE, SPEED_CAP,
};

/// A vehicle in the traffic simulation
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Distance from the start of the current route, in km
    pub position: f64,
    /// Current speed, in km/h
    pub speed: f64,
    pub speed_cap: f64,
    /// Total distance driven across all routes, in km
    pub distance_traveled: f64,
    /// Total time spent driving, in minutes
    pub travel_time: f64,
    route: Option<RouteHandle>,
}

impl Vehicle {
    pub fn new(id: VehicleId, speed: f64) -> Self {
        Self {
            id,
            position: 0.0,
            speed,
            speed_cap: SPEED_CAP,
            distance_traveled: 0.0,
            travel_time: 0.0,
            route: None,
        }
    }

    /// Start the vehicle somewhere other than the beginning of its route
    pub fn at_position(mut self, position: f64) -> Self {
        self.position = position;
        self
    }

    /// Put the vehicle on a route without resetting its position
    pub fn on_route(mut self, route: RouteHandle) -> Self {
        self.route = Some(route);
        self
    }

    pub fn route(&self) -> Option<&RouteHandle> {
        self.route.as_ref()
    }

    pub fn route_name(&self) -> Option<&str> {
        self.route.as_ref().map(|route| route.name.as_str())
    }

    /// The highest speed this vehicle may reach on its current route
    pub fn speed_limit(&self) -> f64 {
        match &self.route {
            Some(route) => route.speed_limit.min(self.speed_cap),
            None => self.speed_cap,
        }
    }

    /// Where the vehicle would end up after `dt` minutes, ignoring the end of the route
    pub fn projected_position(&self, dt: f64) -> f64 {
        self.position + self.speed.min(self.speed_limit()) * dt / 60.0
    }

    /// Move the vehicle along its route for `dt` minutes
    ///
    /// # Panics
    /// Panics when the vehicle has a negative speed or would end up at a negative
    /// position. Both mean the speed update produced a corrupt state.
    pub fn advance(&mut self, dt: f64) {
        let Some(route) = &self.route else {
            return;
        };

        assert!(
            self.speed >= 0.0,
            "vehicle {} has a negative speed of {} km/h",
            self.id,
            self.speed
        );

        let effective_speed = self.speed.min(route.speed_limit).min(self.speed_cap);
        let displacement = effective_speed * dt / 60.0;
        let previous = self.position;
        let unclamped = self.position + displacement;

        assert!(
            unclamped >= 0.0,
            "vehicle {} reached a negative position of {} km",
            self.id,
            unclamped
        );

        // Clamping to the route end is what makes an arrival observable
        self.position = unclamped.min(route.length);
        self.distance_traveled += (self.position - previous).max(0.0);
        self.travel_time += dt;
    }

    /// Move up to `stop_line` and stand still there for the rest of the tick
    pub fn stop_at(&mut self, stop_line: f64, dt: f64) {
        let previous = self.position;
        self.position = stop_line.max(previous);
        self.distance_traveled += self.position - previous;
        self.travel_time += dt;
        self.speed = 0.0;
    }

    /// Car-following rule with the default safety distance
    pub fn adjust_speed(&mut self, leader: Option<Leader>) {
        self.adjust_speed_with(leader, SAFETY_DISTANCE);
    }

    /// Car-following rule
    ///
    /// The leader's position must already reflect its movement in the current tick.
    pub fn adjust_speed_with(&mut self, leader: Option<Leader>, safety_distance: f64) {
        let limit = self.speed_limit();

        let new_speed = match leader {
            None => self.speed + FREE_ROAD_ACCELERATION,
            Some(leader) => {
                let gap = leader.position - self.position;
                if gap < safety_distance {
                    (leader.speed - EMERGENCY_DECELERATION).max(0.0)
                } else if gap < 2.0 * safety_distance {
                    leader.speed
                } else {
                    self.speed + FOLLOWING_ACCELERATION
                }
            }
        };

        self.speed = new_speed.min(limit).max(0.0);
    }

    /// Move the vehicle onto a new route, back at position 0
    ///
    /// Returns `false` and leaves the vehicle untouched when no route is given.
    pub fn change_route(&mut self, new_route: Option<RouteHandle>) -> bool {
        match new_route {
            Some(route) => {
                self.route = Some(route);
                self.position = 0.0;
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear_route(&mut self) {
        self.route = None;
    }

    pub fn has_arrived(&self) -> bool {
        match &self.route {
            Some(route) => self.position >= route.length,
            None => false,
        }
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.1} km/h on {} (position: {:.2} km)",
            self.id,
            self.speed,
            self.route_name().unwrap_or("no route"),
            self.position
        )
    }
}

/// Every vehicle known to a network, keyed by id
///
/// Ordered so aggregate statistics sum in the same order on every run.
pub type VehicleRegistry = BTreeMap<VehicleId, Vehicle>;
