use std::cell::RefCell;
use std::rc::Rc;

use assert_approx_eq::assert_approx_eq;
use traffic_flow::simulation::{Network, Route, SimError, Simulator};

fn long_road_simulator(seed: u64) -> Simulator {
    let mut network = Network::new("Test");
    network.add_route(Route::new("Highway", 1000.0)).unwrap();
    let mut simulator = Simulator::new_with_seed(network, seed);
    simulator.show_progress = false;
    simulator
}

#[test]
fn test_history_has_one_snapshot_per_tick() {
    let mut simulator = long_road_simulator(1);

    simulator.run(12, 1.0, 0.5).unwrap();

    let ticks: Vec<u32> = simulator.history().iter().map(|s| s.tick).collect();
    assert_eq!(ticks, (1..=12).collect::<Vec<u32>>());
    assert_approx_eq!(simulator.history()[11].elapsed_minutes, 12.0);
    assert_approx_eq!(simulator.network.elapsed_minutes, 12.0);
}

#[test]
fn test_observers_see_every_tick() {
    let mut simulator = long_road_simulator(2);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    simulator.add_observer(move |tick, snapshot| {
        assert_eq!(tick, snapshot.tick);
        sink.borrow_mut().push(tick);
    });

    simulator.run(5, 0.5, 0.0).unwrap();

    assert_eq!(*seen.borrow(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_certain_arrivals_add_one_vehicle_per_tick() {
    let mut simulator = long_road_simulator(3);

    simulator.run(10, 1.0, 1.0).unwrap();

    assert_eq!(simulator.network.vehicle_count(), 10);
    for vehicle in simulator.network.vehicles() {
        assert_eq!(vehicle.route_name(), Some("Highway"));
    }
}

#[test]
fn test_no_arrivals_without_routes() {
    let mut simulator = Simulator::new_with_seed(Network::default(), 4);
    simulator.show_progress = false;

    simulator.run(5, 1.0, 1.0).unwrap();

    assert_eq!(simulator.network.vehicle_count(), 0);
    assert_eq!(simulator.history().len(), 5);
}

#[test]
fn test_zero_arrival_rate() {
    let mut simulator = long_road_simulator(5);

    simulator.run(20, 1.0, 0.0).unwrap();

    assert_eq!(simulator.network.vehicle_count(), 0);
}

#[test]
fn test_invalid_arguments_rejected() {
    let mut simulator = long_road_simulator(6);

    for (steps, dt, rate) in [
        (0, 1.0, 0.5),
        (10, 0.0, 0.5),
        (10, -1.0, 0.5),
        (10, f64::NAN, 0.5),
        (10, 1.0, 1.5),
        (10, 1.0, -0.1),
    ] {
        let result = simulator.run(steps, dt, rate);
        assert!(
            matches!(result, Err(SimError::InvalidArgument(_))),
            "run({steps}, {dt}, {rate}) should be rejected"
        );
    }
    assert!(simulator.history().is_empty());
}

#[test]
fn test_new_run_replaces_history() {
    let mut simulator = long_road_simulator(7);

    simulator.run(8, 1.0, 0.3).unwrap();
    simulator.run(3, 1.0, 0.3).unwrap();

    assert_eq!(simulator.history().len(), 3);
    assert_eq!(simulator.history()[0].tick, 1);
}

#[test]
fn test_add_random_vehicle() {
    let mut simulator = long_road_simulator(8);

    let id = simulator.add_random_vehicle(None).unwrap().unwrap();
    let vehicle = simulator.network.vehicle(id).unwrap();
    assert_eq!(vehicle.route_name(), Some("Highway"));
    assert!((60.0..120.0).contains(&vehicle.speed));

    let mut empty = Simulator::new_with_seed(Network::default(), 8);
    let routeless = empty.add_random_vehicle(None).unwrap().unwrap();
    assert!(empty.network.vehicle(routeless).unwrap().route().is_none());
}

#[test]
fn test_reinitialize_clears_state() {
    let mut simulator = long_road_simulator(9);
    simulator.run(5, 1.0, 1.0).unwrap();

    simulator.reinitialize();

    assert!(simulator.history().is_empty());
    assert_eq!(simulator.network.vehicle_count(), 0);
    assert_eq!(simulator.network.elapsed_minutes, 0.0);
    assert_eq!(simulator.network.route_count(), 1);
}
