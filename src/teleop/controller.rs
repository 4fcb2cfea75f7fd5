//! Per-frame translation and runtime flag mutators
//!
//! [`TeleopController`] is synchronous and owns no tasks. It is shared via
//! `Arc` between the frame task, the watchdog and whoever calls the
//! mutators; see [`super::teleop_handle`] for the task wiring.

use crate::config::TeleopConfig;
use crate::controller::decoder::{DecodeError, DecodedInput, InputFrame};
use crate::teleop::drive::{self, SpeedLimits, VelocityCommand};
use crate::teleop::service::{ServiceKind, ServiceResponse};
use crate::teleop::state::{ControllerState, DriveDirection};
use crate::teleop::switches::{ModeSwitches, SelectedMode};
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

/// What one frame produced
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameOutcome {
    pub mode: Option<SelectedMode>,
    pub velocity: Option<VelocityCommand>,
}

#[derive(Debug)]
pub struct TeleopController {
    state: Arc<ControllerState>,
    limits: SpeedLimits,
    timeout: Duration,
}

impl TeleopController {
    pub fn new(config: &TeleopConfig) -> Self {
        Self {
            state: Arc::new(ControllerState::new(config.enabled_on_start)),
            limits: SpeedLimits::from(config),
            timeout: config.timeout(),
        }
    }

    pub fn state(&self) -> &Arc<ControllerState> {
        &self.state
    }

    pub fn limits(&self) -> &SpeedLimits {
        &self.limits
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Translates one received frame
    ///
    /// The input timestamp is refreshed before decoding, so a malformed frame
    /// still counts as a sign of life. A frame that fails to decode produces
    /// nothing.
    pub fn handle_frame(
        &self,
        frame: &InputFrame,
        now: Instant,
    ) -> Result<FrameOutcome, DecodeError> {
        self.state.record_input(now);

        let input = DecodedInput::decode(frame)?;
        let switches = ModeSwitches::from_input(&input);
        let mode = switches.selected_mode();

        if !self.state.enabled() {
            return Ok(FrameOutcome {
                mode,
                velocity: None,
            });
        }

        let raw = drive::unscaled_command(
            &input,
            &switches,
            self.state.drive_direction(),
            self.state.car_style_turning(),
        );
        let velocity = self.limits.scale(raw, switches.turbo);
        debug!(
            "Frame translated: mode={:?}, raw={:?}, scaled={:?}",
            mode, raw, velocity
        );

        Ok(FrameOutcome {
            mode,
            velocity: Some(velocity),
        })
    }

    /// Whether the watchdog should stop the robot at `now`
    ///
    /// True when enabled and no frame arrived within the timeout, including
    /// the case where no frame ever arrived.
    pub fn is_stale(&self, now: Instant) -> bool {
        let enabled = self.state.enabled();
        let timed_out = match self.state.input_age(now) {
            Some(age) => age > self.timeout,
            None => true,
        };
        enabled && timed_out
    }

    pub fn set_enabled(&self, enabled: bool) -> String {
        self.state.set_enabled(enabled);
        info!("Velocity output {}", if enabled { "enabled" } else { "disabled" });
        "Updated gamepad_input enable status".to_string()
    }

    pub fn set_drive_direction(&self, forward: bool) -> String {
        let direction = DriveDirection::from_forward(forward);
        self.state.set_drive_direction(direction);
        info!("Drive direction set to {}", direction.describe());
        format!("Driving {}", direction.describe())
    }

    pub fn set_car_style_turning(&self, car_style: bool) -> String {
        self.state.set_car_style_turning(car_style);
        info!("Car style turning set to {}", car_style);
        format!("Car style turning set to {}", car_style)
    }

    /// Routes a trigger to its mutator, never fails
    pub fn call(&self, kind: ServiceKind, flag: bool) -> ServiceResponse {
        let message = match kind {
            ServiceKind::Enable => self.set_enabled(flag),
            ServiceKind::DriveForward => self.set_drive_direction(flag),
            ServiceKind::CarStyleTurning => self.set_car_style_turning(flag),
        };
        ServiceResponse::ok(message)
    }
}
