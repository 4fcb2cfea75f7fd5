//! Teleop subsystem: controller input to mode selection and velocity
//!
//! 1. [`switches`] - Mode switches and their priority
//! 2. [`drive`] - Normal/tank drive, direction correction, scaling, clamping
//! 3. [`state`] - Shared runtime flags, one mutex per field
//! 4. [`controller`] - Per-frame translation and the flag mutators
//! 5. [`watchdog`] - Stop command when input goes stale
//! 6. [`teleop_handle`] - Task wiring and lifecycle
//!
//! # Architecture
//!
//! ```text
//! InputFrame ──► Decoder ──► Switches ──► SelectedMode ─────────────┐
//!                               │                                   ├──► TeleopOutput
//!                               └──► Drive ──► Scale ──► Velocity ──┤
//!                                                                   │
//!                                        Watchdog ──► Stop ─────────┘
//! ```

pub mod controller;
pub mod drive;
pub mod service;
pub mod state;
pub mod switches;
pub mod teleop_handle;
pub mod watchdog;

pub use controller::{FrameOutcome, TeleopController};
pub use drive::{Twist, VelocityCommand};
pub use service::{ServiceKind, ServiceResponse};
pub use switches::SelectedMode;
pub use teleop_handle::{TeleopError, TeleopHandle, TeleopOutput};
