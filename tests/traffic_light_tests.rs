use assert_approx_eq::assert_approx_eq;
use traffic_flow::simulation::{LightState, TrafficLight};

#[test]
fn test_phase_durations() {
    let light = TrafficLight::new(10.0);
    assert_approx_eq!(light.red_duration(), 5.0);
    assert_approx_eq!(light.green_duration(), 4.0);
    assert_approx_eq!(light.amber_duration(), 1.0);
}

#[test]
fn test_cycle_states() {
    let expected = [
        (0.0, LightState::Red),
        (2.0, LightState::Red),
        (5.0, LightState::Green),
        (7.0, LightState::Green),
        (9.0, LightState::Amber),
        (10.5, LightState::Red),
    ];

    for (time, state) in expected {
        let mut light = TrafficLight::new(10.0);
        light.update_timer(time);
        assert_eq!(light.state(), state, "state at t = {time}");
    }
}

#[test]
fn test_timer_accumulates() {
    let mut light = TrafficLight::new(10.0);
    light.update_timer(3.0);
    assert!(light.is_red());
    light.update_timer(3.0);
    assert_eq!(light.state(), LightState::Green);
    assert_approx_eq!(light.timer, 6.0);
}

#[test]
fn test_zero_cycle_is_always_green() {
    let mut light = TrafficLight::new(0.0);
    assert_eq!(light.state(), LightState::Green);
    light.update_timer(12.0);
    assert_eq!(light.state(), LightState::Green);
}

#[test]
fn test_red_throughout_window() {
    let mut light = TrafficLight::new(10.0);
    assert!(light.is_red_throughout(4.0));
    assert!(light.is_red_throughout(5.0));
    assert!(!light.is_red_throughout(6.0));

    light.update_timer(5.0);
    assert!(!light.is_red_throughout(1.0));

    // One minute spans many 5 s cycles
    assert!(!TrafficLight::default().is_red_throughout(60.0));
    assert!(!TrafficLight::new(0.0).is_red_throughout(1.0));
}
