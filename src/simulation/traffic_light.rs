//! Fixed-cycle traffic signals that can be placed on a route

use serde::{Deserialize, Serialize};

/// The phase a signal shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    Red,
    Green,
    Amber,
}

/// Share of the cycle spent on red
const RED_SHARE: f64 = 0.5;
/// Share of the cycle spent on green; amber takes the rest
const GREEN_SHARE: f64 = 0.4;

/// A traffic light cycling red, green, amber
#[derive(Debug, Clone)]
pub struct TrafficLight {
    /// Length of a full cycle in seconds
    pub cycle: f64,
    /// Seconds elapsed since the light was installed
    pub timer: f64,
}

impl TrafficLight {
    pub fn new(cycle: f64) -> Self {
        Self { cycle, timer: 0.0 }
    }

    pub fn red_duration(&self) -> f64 {
        RED_SHARE * self.cycle
    }

    pub fn green_duration(&self) -> f64 {
        GREEN_SHARE * self.cycle
    }

    pub fn amber_duration(&self) -> f64 {
        self.cycle - self.red_duration() - self.green_duration()
    }

    pub fn state(&self) -> LightState {
        if self.cycle <= 0.0 {
            return LightState::Green;
        }

        let t = self.timer.rem_euclid(self.cycle);
        if t < self.red_duration() {
            LightState::Red
        } else if t < self.red_duration() + self.green_duration() {
            LightState::Green
        } else {
            LightState::Amber
        }
    }

    pub fn is_red(&self) -> bool {
        self.state() == LightState::Red
    }

    /// Whether the light shows red for the whole of the next `window_secs` seconds
    ///
    /// A tick usually spans many seconds, so a light that turns green at any point
    /// within it lets traffic through.
    pub fn is_red_throughout(&self, window_secs: f64) -> bool {
        if self.cycle <= 0.0 {
            return false;
        }
        let t = self.timer.rem_euclid(self.cycle);
        t < self.red_duration() && t + window_secs <= self.red_duration()
    }

    /// Advance the timer by `delta_secs` seconds
    pub fn update_timer(&mut self, delta_secs: f64) {
        self.timer += delta_secs;
    }
}

impl Default for TrafficLight {
    fn default() -> Self {
        Self::new(5.0)
    }
}
