use assert_approx_eq::assert_approx_eq;
use traffic_flow::simulation::{
    LightState, MembershipError, Route, TrafficLight, Vehicle, VehicleId, VehicleRegistry,
};

fn place(route: &mut Route, registry: &mut VehicleRegistry, id: u64, position: f64, speed: f64) {
    let vehicle = Vehicle::new(VehicleId(id), speed)
        .on_route(route.handle())
        .at_position(position);
    route.add_vehicle(vehicle.id).unwrap();
    registry.insert(vehicle.id, vehicle);
}

#[test]
fn test_density_of_empty_and_zero_length_routes() {
    let empty = Route::new("Empty", 5.0);
    assert_eq!(empty.density(), 0.0);

    let mut degenerate = Route::new("Point", 0.0);
    degenerate.add_vehicle(VehicleId(1)).unwrap();
    assert_eq!(degenerate.density(), 0.0);
    assert!(!degenerate.is_congested(20.0));
}

#[test]
fn test_density_and_congestion() {
    let mut route = Route::new("Short", 0.1);
    for id in 1..=3 {
        route.add_vehicle(VehicleId(id)).unwrap();
    }

    assert_approx_eq!(route.density(), 30.0);
    assert!(route.is_congested(20.0));
    assert!(!route.is_congested(40.0));
}

#[test]
fn test_membership_is_a_set() {
    let mut route = Route::new("R", 2.0);

    assert!(route.add_vehicle(VehicleId(1)).is_ok());
    assert_eq!(
        route.add_vehicle(VehicleId(1)),
        Err(MembershipError::Duplicate(VehicleId(1)))
    );
    assert_eq!(route.vehicle_count(), 1);

    assert!(route.remove_vehicle(VehicleId(1)));
    assert!(!route.remove_vehicle(VehicleId(1)));
    assert_eq!(route.vehicle_count(), 0);
}

#[test]
fn test_capacity_rejects_overflow() {
    let mut route = Route::new("R", 2.0).with_capacity(1);

    assert!(route.add_vehicle(VehicleId(1)).is_ok());
    assert_eq!(
        route.add_vehicle(VehicleId(2)),
        Err(MembershipError::AtCapacity {
            route: "R".to_string(),
            capacity: 1,
        })
    );
    assert!(!route.contains(VehicleId(2)));
}

#[test]
fn test_remaining_capacity() {
    let mut route = Route::new("R", 2.0).with_lanes(2);
    for id in 1..=3 {
        route.add_vehicle(VehicleId(id)).unwrap();
    }

    assert_eq!(route.remaining_capacity(30), 117);
    assert_eq!(route.remaining_default_capacity(), 117);
}

#[test]
fn test_update_processes_leader_before_follower() {
    let mut route = Route::new("R", 10.0).with_speed_limit(90.0);
    let mut registry = VehicleRegistry::new();

    // Inserted back to front on purpose
    place(&mut route, &mut registry, 1, 1.0, 80.0);
    place(&mut route, &mut registry, 2, 1.02, 20.0);

    route.update_vehicles(0.01, &mut registry);

    assert_eq!(route.vehicle_ids(), &[VehicleId(2), VehicleId(1)]);

    let leader = &registry[&VehicleId(2)];
    assert_eq!(leader.speed, 30.0);
    assert_approx_eq!(leader.position, 1.025);

    // The follower reacts to the leader's new position and brakes
    let follower = &registry[&VehicleId(1)];
    assert_eq!(follower.speed, 20.0);
    assert_approx_eq!(follower.position, 1.0 + 20.0 * 0.01 / 60.0);
}

#[test]
fn test_positions_stay_on_route() {
    let mut route = Route::new("R", 1.0).with_speed_limit(130.0);
    let mut registry = VehicleRegistry::new();
    place(&mut route, &mut registry, 1, 0.9, 120.0);
    place(&mut route, &mut registry, 2, 0.2, 120.0);

    for _ in 0..5 {
        route.update_vehicles(1.0, &mut registry);
        for vehicle in registry.values() {
            assert!(vehicle.position >= 0.0 && vehicle.position <= 1.0);
            assert!(vehicle.speed >= 0.0 && vehicle.speed <= 130.0);
        }
    }
}

#[test]
fn test_collect_arrived() {
    let mut route = Route::new("R", 1.0);
    let mut registry = VehicleRegistry::new();
    place(&mut route, &mut registry, 1, 1.0, 50.0);
    place(&mut route, &mut registry, 2, 0.5, 50.0);

    let arrived = route.collect_arrived(&registry);

    assert_eq!(arrived, vec![VehicleId(1)]);
    assert_eq!(route.vehicle_ids(), &[VehicleId(2)]);
}

#[test]
fn test_mean_speed() {
    let mut route = Route::new("R", 5.0);
    let mut registry = VehicleRegistry::new();
    assert_eq!(route.mean_speed(&registry), 0.0);

    place(&mut route, &mut registry, 1, 0.0, 40.0);
    place(&mut route, &mut registry, 2, 1.0, 60.0);
    assert_approx_eq!(route.mean_speed(&registry), 50.0);
}

#[test]
fn test_red_light_stops_vehicle_at_line() {
    let mut route = Route::new("Boulevard", 2.0).with_speed_limit(60.0);
    route.add_traffic_light(1.2, TrafficLight::new(120.0));
    let mut registry = VehicleRegistry::new();
    place(&mut route, &mut registry, 1, 1.0, 60.0);

    // The first 30 s of a 120 s cycle are all red
    route.update_vehicles(0.5, &mut registry);

    let vehicle = &registry[&VehicleId(1)];
    assert_eq!(vehicle.position, 1.2);
    assert_eq!(vehicle.speed, 0.0);
    assert!(route.is_held(VehicleId(1)));
}

#[test]
fn test_light_turning_green_within_tick_lets_vehicle_pass() {
    let mut route = Route::new("Boulevard", 2.0).with_speed_limit(60.0);
    route.add_traffic_light(1.5, TrafficLight::new(100.0));
    let mut registry = VehicleRegistry::new();
    place(&mut route, &mut registry, 1, 1.0, 60.0);

    // Red ends after 50 s, inside this one-minute tick
    route.update_vehicles(1.0, &mut registry);

    let vehicle = &registry[&VehicleId(1)];
    assert_eq!(vehicle.position, 2.0);
    assert!(vehicle.has_arrived());
    assert!(!route.is_held(VehicleId(1)));
}

#[test]
fn test_light_holds_then_releases_over_several_ticks() {
    let mut route = Route::new("Boulevard", 2.0).with_speed_limit(60.0);
    route.add_traffic_light(1.5, TrafficLight::new(120.0));
    let mut registry = VehicleRegistry::new();
    place(&mut route, &mut registry, 1, 1.0, 60.0);

    route.update_vehicles(1.0, &mut registry);
    assert_eq!(registry[&VehicleId(1)].position, 1.5);
    assert_eq!(registry[&VehicleId(1)].speed, 0.0);
    assert_eq!(route.signals()[0].light.state(), LightState::Green);

    route.update_vehicles(1.0, &mut registry);
    assert!(registry[&VehicleId(1)].position > 1.5);
    assert!(!route.is_held(VehicleId(1)));
    assert_eq!(route.signals()[0].light.state(), LightState::Red);
}

#[test]
fn test_default_light_never_blocks_one_minute_ticks() {
    let mut route = Route::new("Street", 1.0);
    route.add_traffic_light(0.5, TrafficLight::default());
    let mut registry = VehicleRegistry::new();
    place(&mut route, &mut registry, 1, 0.0, 0.0);

    let mut ticks = 0;
    while !registry[&VehicleId(1)].has_arrived() {
        assert!(ticks < 10, "vehicle stuck at {} km", registry[&VehicleId(1)].position);
        route.update_vehicles(1.0, &mut registry);
        assert!(!route.is_held(VehicleId(1)));
        ticks += 1;
    }

    assert_eq!(route.collect_arrived(&registry), vec![VehicleId(1)]);
}

#[test]
fn test_red_light_at_route_end_keeps_vehicle() {
    let mut route = Route::new("Junction", 1.0).with_speed_limit(60.0);
    route.add_traffic_light(1.0, TrafficLight::new(600.0));
    let mut registry = VehicleRegistry::new();
    place(&mut route, &mut registry, 1, 0.9, 60.0);

    route.update_vehicles(1.0, &mut registry);

    assert_eq!(registry[&VehicleId(1)].position, 1.0);
    assert!(route.is_held(VehicleId(1)));
    assert!(route.collect_arrived(&registry).is_empty());
    assert!(route.contains(VehicleId(1)));
}

#[test]
fn test_traffic_light_position_is_clamped() {
    let mut route = Route::new("R", 2.0);
    route.add_traffic_light(5.0, TrafficLight::default());
    route.add_traffic_light(-1.0, TrafficLight::default());

    let positions: Vec<f64> = route.signals().iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![2.0, 0.0]);
}
