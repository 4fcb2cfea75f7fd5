//! Velocity translation
//!
//! Turns decoded stick positions into a [`VelocityCommand`]:
//!
//! 1. **Drive mode**: normal drive while the deadman switch is held, tank
//!    drive while only the left bumper is held, otherwise standstill
//! 2. **Direction correction**: forward component times the drive direction
//! 3. **Scaling**: per axis and per sign, so asymmetric speed limits scale
//!    correctly in both directions
//! 4. **Clamping**: into the configured range of the axis family

use crate::config::TeleopConfig;
use crate::controller::decoder::DecodedInput;
use crate::teleop::state::DriveDirection;
use crate::teleop::switches::ModeSwitches;
use serde::{Deserialize, Serialize};

/// Stick values below this magnitude snap to exactly zero in normal drive
pub const DEADZONE: f64 = 0.01;

/// Linear vector of a twist
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Commanded velocity, published as a twist
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VelocityCommand {
    /// Forward/backward
    pub linear_x: f64,
    /// Vertical
    pub linear_z: f64,
    /// Yaw rate
    pub angular_z: f64,
}

impl VelocityCommand {
    /// All-zero command used for the safety stop
    pub fn stop() -> Self {
        Self::default()
    }

    pub fn is_stop(&self) -> bool {
        self.linear_x == 0.0 && self.linear_z == 0.0 && self.angular_z == 0.0
    }

    pub fn to_twist(&self) -> Twist {
        Twist {
            linear: Vector3 {
                x: self.linear_x,
                y: 0.0,
                z: self.linear_z,
            },
            angular: Vector3 {
                x: 0.0,
                y: 0.0,
                z: self.angular_z,
            },
        }
    }
}

/// Wire layout of a velocity command
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

/// Speed bounds and multipliers
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedLimits {
    pub turbo_multiplier: f64,
    pub base_multiplier: f64,
    pub min_linear_speed: f64,
    pub max_linear_speed: f64,
    pub min_angular_speed: f64,
    pub max_angular_speed: f64,
}

impl From<&TeleopConfig> for SpeedLimits {
    fn from(config: &TeleopConfig) -> Self {
        Self {
            turbo_multiplier: config.turbo_multiplier,
            base_multiplier: config.base_multiplier,
            min_linear_speed: config.min_linear_speed,
            max_linear_speed: config.max_linear_speed,
            min_angular_speed: config.min_angular_speed,
            max_angular_speed: config.max_angular_speed,
        }
    }
}

impl SpeedLimits {
    fn multiplier(&self, turbo: bool) -> f64 {
        if turbo {
            self.turbo_multiplier
        } else {
            self.base_multiplier
        }
    }

    /// Scales the unscaled command and clamps each component
    pub fn scale(&self, raw: VelocityCommand, turbo: bool) -> VelocityCommand {
        let multiplier = self.multiplier(turbo);
        let linear = |value: f64| {
            scale_axis(
                value,
                self.min_linear_speed,
                self.max_linear_speed,
                multiplier,
            )
        };

        VelocityCommand {
            linear_x: linear(raw.linear_x),
            linear_z: linear(raw.linear_z),
            angular_z: scale_axis(
                raw.angular_z,
                self.min_angular_speed,
                self.max_angular_speed,
                multiplier,
            ),
        }
    }
}

fn clamp(value: f64, lower: f64, upper: f64) -> f64 {
    value.max(lower).min(upper)
}

fn scale_axis(value: f64, min: f64, max: f64, multiplier: f64) -> f64 {
    let bound = if value >= 0.0 { max } else { min };
    clamp(value * bound.abs() * multiplier, min, max)
}

fn snap(value: f64) -> f64 {
    if value.abs() < DEADZONE {
        0.0
    } else {
        value
    }
}

/// Unscaled command while the deadman switch is held
pub fn normal_drive(input: &DecodedInput, car_style_turning: bool) -> VelocityCommand {
    let x = snap(-f64::from(input.left_stick_x));
    let y = snap(f64::from(input.left_stick_y));
    let z = snap(f64::from(input.right_stick_y));

    let mut angular = -x;
    if car_style_turning {
        // sign(0) counts as forward
        angular *= if y >= 0.0 { 1.0 } else { -1.0 };
    }

    VelocityCommand {
        linear_x: y,
        linear_z: z,
        // negating a snapped zero yields -0.0
        angular_z: snap(angular),
    }
}

/// Unscaled command from the two vertical stick axes
pub fn tank_drive(input: &DecodedInput) -> VelocityCommand {
    let left = f64::from(input.left_stick_y);
    let right = f64::from(input.right_stick_y);

    VelocityCommand {
        linear_x: (left + right) / 2.0,
        linear_z: 0.0,
        angular_z: (-left + right) / 2.0,
    }
}

/// Drive mode selection and direction correction, before scaling
pub fn unscaled_command(
    input: &DecodedInput,
    switches: &ModeSwitches,
    direction: DriveDirection,
    car_style_turning: bool,
) -> VelocityCommand {
    let mut command = if switches.deadman {
        normal_drive(input, car_style_turning)
    } else if switches.tank_drive {
        tank_drive(input)
    } else {
        VelocityCommand::stop()
    };

    // adding +0.0 turns the -0.0 of a reversed standstill into +0.0
    command.linear_x = command.linear_x * direction.sign() + 0.0;
    command
}
