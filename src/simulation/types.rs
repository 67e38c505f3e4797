//! Core types for the traffic simulation
//!
//! Identifiers, route handles and the physical constants of the car-following model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for a vehicle
/// This is a simple wrapper around a u64 for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VEH_{:04}", self.0)
    }
}

/// Hands out monotonically increasing vehicle ids.
///
/// Every [`Network`](super::Network) owns its own allocator, so two independent
/// simulations never share a counter.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next_id: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_vehicle_id(&mut self) -> VehicleId {
        self.next_id += 1;
        VehicleId(self.next_id)
    }
}

/// Non-owning reference from a vehicle to the route it drives on.
///
/// Length and speed limit never change after a route is created, so the handle
/// carries copies of them and the vehicle can move without borrowing the route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteHandle {
    pub name: String,
    pub length: f64,
    pub speed_limit: f64,
}

/// Position and speed of the vehicle directly ahead, read after it moved this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leader {
    pub position: f64,
    pub speed: f64,
}

/// Global speed cap of every vehicle, in km/h
pub const SPEED_CAP: f64 = 130.0;

/// Minimum gap to the leader before emergency braking, in km
pub const SAFETY_DISTANCE: f64 = 0.05;

/// Speed gained per tick when the road ahead is empty, in km/h
pub const FREE_ROAD_ACCELERATION: f64 = 10.0;

/// Speed gained per tick when following at a comfortable gap, in km/h
pub const FOLLOWING_ACCELERATION: f64 = 5.0;

/// Speed shed below the leader's speed when braking, in km/h
pub const EMERGENCY_DECELERATION: f64 = 10.0;

/// Density above which a route counts as congested, in vehicles per km
pub const DEFAULT_CONGESTION_THRESHOLD: f64 = 20.0;

/// Speed limit of a route when none is configured, in km/h
pub const DEFAULT_SPEED_LIMIT: f64 = 90.0;

/// Lane count of a route when none is configured
pub const DEFAULT_LANES: u32 = 2;

/// Vehicles one lane can hold per km, used for remaining-capacity estimates
pub const DEFAULT_CAPACITY_PER_LANE: u32 = 30;
