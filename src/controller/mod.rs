//! Controller input subsystem
//!
//! 1. [`decoder`] - Positional frame to named controls
//! 2. [`event_collector`] - Optional local gamepad source producing frames
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Collector ──► InputFrame ──► Decoder ──► DecodedInput
//!  (gilrs)    (polling)        ▲
//!                              │
//!                       MQTT joy topic
//! ```

pub mod decoder;
pub mod event_collector;

pub use decoder::{DecodeError, DecodedInput, InputFrame};
pub use event_collector::{CollectorError, CollectorHandle, CollectorSettings};
