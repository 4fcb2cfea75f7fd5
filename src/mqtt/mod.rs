//! # MQTT Bridge
//!
//! Transport between the teleop core and the rest of the robot.
//!
//! ```text
//! mqtt/
//! ├── config.rs           - Broker settings and topic names
//! ├── message_manager.rs  - Outbound message representation and encoding
//! └── mqtt_handler.rs     - Event loop, routing and publishing
//! ```
//!
//! ## Topics
//!
//! | Topic                          | Direction | Payload                              |
//! |--------------------------------|-----------|--------------------------------------|
//! | `joy_topic`                    | in        | `{"axes": [..], "buttons": [..]}`    |
//! | `<service>`                    | in        | `true` / `false` / `{"data": bool}`  |
//! | `<service>/response`           | out       | `{"success": bool, "message": ".."}` |
//! | `selected_mode_topic`          | out       | mode label, e.g. `teleop`            |
//! | `cmd_vel_topic`                | out       | twist as JSON                        |
//!
//! The three services are `enabled_service`, `drive_forward_service` and
//! `car_style_turning_service`.

pub mod config;
pub mod message_manager;
pub mod mqtt_handler;

pub use mqtt_handler::{MqttError, MqttHandler};
