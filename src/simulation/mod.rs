//! Standalone traffic-flow engine
//!
//! Vehicles follow each other along one-way routes, move on to a random
//! downstream route when they reach the end of one, and leave the network at
//! routes without successors. Every tick produces a [`TickStatistics`] snapshot.

mod config;
mod error;
mod network;
mod route;
mod simulator;
mod statistics;
mod traffic_light;
mod types;
mod vehicle;

pub use config::{
    load_network, ConnectionConfig, InitialVehiclesConfig, RouteConfig, ScenarioConfig,
    TrafficLightConfig,
};
pub use error::{MembershipError, NetworkError, SimError, SimResult};
pub use network::Network;
pub use route::{Route, Signal};
pub use simulator::{Observer, Simulator};
pub use statistics::{RouteStatistics, TickStatistics};
pub use traffic_light::{LightState, TrafficLight};
pub use types::{
    IdAllocator, Leader, RouteHandle, VehicleId, DEFAULT_CAPACITY_PER_LANE,
    DEFAULT_CONGESTION_THRESHOLD, DEFAULT_LANES, DEFAULT_SPEED_LIMIT, EMERGENCY_DECELERATION,
    FOLLOWING_ACCELERATION, FREE_ROAD_ACCELERATION, SAFETY_DISTANCE, SPEED_CAP,
};
pub use vehicle::{Vehicle, VehicleRegistry};
