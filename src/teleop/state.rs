//! Shared runtime state of the teleop controller
//!
//! Each field sits behind its own mutex. Guards are only held for a single
//! read or write and never while another guard is taken, so no lock ordering
//! exists between fields. The protected values are plain scalars, which makes
//! a poisoned guard safe to recover.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::{Duration, Instant};

/// Sign applied to the forward/backward linear component
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriveDirection {
    #[default]
    Forward,
    Backward,
}

impl DriveDirection {
    pub fn from_forward(forward: bool) -> Self {
        if forward {
            DriveDirection::Forward
        } else {
            DriveDirection::Backward
        }
    }

    pub fn sign(&self) -> f64 {
        match self {
            DriveDirection::Forward => 1.0,
            DriveDirection::Backward => -1.0,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DriveDirection::Forward => "forward",
            DriveDirection::Backward => "backward",
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct ControllerState {
    enabled: Mutex<bool>,
    drive_direction: Mutex<DriveDirection>,
    car_style_turning: Mutex<bool>,
    // None until the first frame arrives
    last_input_time: Mutex<Option<Instant>>,
}

impl ControllerState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Mutex::new(enabled),
            drive_direction: Mutex::new(DriveDirection::Forward),
            car_style_turning: Mutex::new(false),
            last_input_time: Mutex::new(None),
        }
    }

    pub fn enabled(&self) -> bool {
        *lock(&self.enabled)
    }

    pub fn set_enabled(&self, enabled: bool) {
        *lock(&self.enabled) = enabled;
    }

    pub fn drive_direction(&self) -> DriveDirection {
        *lock(&self.drive_direction)
    }

    pub fn set_drive_direction(&self, direction: DriveDirection) {
        *lock(&self.drive_direction) = direction;
    }

    pub fn car_style_turning(&self) -> bool {
        *lock(&self.car_style_turning)
    }

    pub fn set_car_style_turning(&self, car_style: bool) {
        *lock(&self.car_style_turning) = car_style;
    }

    /// Records that input arrived at `now`
    ///
    /// Never moves the timestamp backwards.
    pub fn record_input(&self, now: Instant) {
        let mut last = lock(&self.last_input_time);
        *last = Some(match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }

    pub fn last_input_time(&self) -> Option<Instant> {
        *lock(&self.last_input_time)
    }

    /// Time since the last recorded input, `None` if nothing arrived yet
    pub fn input_age(&self, now: Instant) -> Option<Duration> {
        self.last_input_time()
            .map(|last| now.saturating_duration_since(last))
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_forward_with_normal_turning() {
        let state = ControllerState::new(true);
        assert!(state.enabled());
        assert_eq!(state.drive_direction(), DriveDirection::Forward);
        assert!(!state.car_style_turning());
        assert_eq!(state.last_input_time(), None);
    }

    #[test]
    fn direction_sign_is_unit() {
        assert_eq!(DriveDirection::from_forward(true).sign(), 1.0);
        assert_eq!(DriveDirection::from_forward(false).sign(), -1.0);
    }

    #[test]
    fn last_input_time_never_goes_backwards() {
        let state = ControllerState::default();
        let early = Instant::now();
        let late = early + Duration::from_millis(50);

        state.record_input(late);
        state.record_input(early);
        assert_eq!(state.last_input_time(), Some(late));

        assert_eq!(
            state.input_age(late + Duration::from_millis(10)),
            Some(Duration::from_millis(10))
        );
        assert_eq!(state.input_age(early), Some(Duration::ZERO));
    }

    #[test]
    fn concurrent_writers_leave_consistent_values() {
        let state = Arc::new(ControllerState::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        state.set_enabled(i % 2 == 0);
                        state.set_drive_direction(DriveDirection::from_forward(i % 3 == 0));
                        state.set_car_style_turning(i % 2 == 1);
                        state.record_input(Instant::now());
                        let sign = state.drive_direction().sign();
                        assert!(sign == 1.0 || sign == -1.0);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(state.last_input_time().is_some());
    }
}
