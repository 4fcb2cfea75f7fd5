use crate::controller::decoder::{InputFrame, AXIS_COUNT, BUTTON_COUNT};
use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use statum::{machine, state};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Button order of a joystick frame
const FRAME_BUTTONS: [Button; BUTTON_COUNT] = [
    Button::South,        // A
    Button::East,         // B
    Button::West,         // X
    Button::North,        // Y
    Button::LeftTrigger,  // left bumper
    Button::RightTrigger, // right bumper
    Button::Select,
    Button::Start,
    Button::Mode, // guide
    Button::LeftThumb,
    Button::RightThumb,
];

// Collector settings
#[derive(Clone, Debug, PartialEq)]
pub struct CollectorSettings {
    pub poll_interval_ms: u64,
    pub gamepad_index: Option<usize>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 20,
            gamepad_index: None,
        }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to send frame: {0}")]
    FrameSendError(String),

    #[error("Collector task failed: {0}")]
    TaskError(String),
}

// Define collector states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
pub struct EventCollector<S: CollectionState> {
    // Gilrs context
    gilrs: Gilrs,

    // Gamepad frames are built from
    active_gamepad: Option<GamepadId>,

    settings: CollectorSettings,

    // Channel into the teleop frame task
    frame_sender: mpsc::Sender<InputFrame>,
}

impl<S: CollectionState> EventCollector<S> {
    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }
}

impl EventCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        frame_sender: mpsc::Sender<InputFrame>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, None, settings, frame_sender))
    }

    // Pick the gamepad and transition to Collecting
    pub fn initialize(mut self) -> EventCollector<Collecting> {
        let gamepads: Vec<(GamepadId, String)> = self
            .gilrs
            .gamepads()
            .map(|(id, gamepad)| (id, gamepad.name().to_string()))
            .collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, waiting for one");
        } else {
            info!("Found {} gamepads:", gamepads.len());
            for (idx, (id, name)) in gamepads.iter().enumerate() {
                info!("  [{}] ID: {}, Name: {}", idx, id, name);
            }

            let index = self.settings.gamepad_index.unwrap_or(0);
            match gamepads.get(index) {
                Some((id, name)) => {
                    self.active_gamepad = Some(*id);
                    info!("Selected gamepad: {} ({})", name, id);
                }
                None => warn!(
                    "Configured gamepad index {} not connected, waiting for it",
                    index
                ),
            }
        }

        info!("Event Collector initialized, transitioning to Collecting state");
        self.transition()
    }
}

impl EventCollector<Collecting> {
    // Pump gilrs events and track connects/disconnects
    fn drain_events(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => {
                    info!("Gamepad {} connected", id);
                    if self.active_gamepad.is_none() {
                        info!("Using gamepad {}", id);
                        self.active_gamepad = Some(id);
                    }
                }
                EventType::Disconnected => {
                    if self.active_gamepad == Some(id) {
                        warn!("Active gamepad {} disconnected, no frames until reconnect", id);
                    }
                }
                _ => {}
            }
        }
    }

    // Build a frame from the active gamepad's current state
    pub fn sample(&mut self) -> Option<InputFrame> {
        self.drain_events();

        let gamepad = self.gilrs.connected_gamepad(self.active_gamepad?)?;
        Some(build_frame(
            |axis| gamepad.value(axis),
            |button| gamepad.is_pressed(button),
            |button| {
                gamepad
                    .button_data(button)
                    .map(|data| data.value())
                    .unwrap_or(0.0)
            },
        ))
    }

    pub fn run_collection_loop(&mut self, cancel: &CancellationToken) -> Result<(), CollectorError> {
        let interval = Duration::from_millis(self.settings().poll_interval_ms);
        info!("Starting Event Collector loop every {:?}", interval);

        // For performance monitoring
        let mut frame_count = 0u64;
        let mut dropped_count = 0u64;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);

        while !cancel.is_cancelled() {
            if let Some(frame) = self.sample() {
                match self.frame_sender.try_send(frame) {
                    Ok(()) => frame_count += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        dropped_count += 1;
                        debug!("Frame queue full, dropping frame");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        error!("Frame channel closed");
                        return Err(CollectorError::FrameSendError(
                            "frame channel closed".to_string(),
                        ));
                    }
                }
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Event Collector stats: {} frames sent, {} dropped in last {} seconds",
                    frame_count,
                    dropped_count,
                    log_interval.num_seconds()
                );
                frame_count = 0;
                dropped_count = 0;
                last_log_time = now;
            }

            std::thread::sleep(interval);
        }

        info!("Event Collector loop cancelled");
        Ok(())
    }
}

/// Assembles a joystick-driver style frame
///
/// Follows the Linux joystick layout: stick X is positive to the left,
/// triggers rest at 1.0 and reach -1.0 fully pressed, dpad X is positive to
/// the left and dpad Y positive up.
pub fn build_frame(
    value: impl Fn(Axis) -> f32,
    pressed: impl Fn(Button) -> bool,
    analog: impl Fn(Button) -> f32,
) -> InputFrame {
    let trigger = |button: Button| 1.0 - 2.0 * analog(button).clamp(0.0, 1.0);
    let dpad = |negative: Button, positive: Button, axis: Axis| match (
        pressed(negative),
        pressed(positive),
    ) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        (false, false) => value(axis),
        (true, true) => 0.0,
    };

    let mut axes = Vec::with_capacity(AXIS_COUNT);
    axes.push(-value(Axis::LeftStickX));
    axes.push(value(Axis::LeftStickY));
    axes.push(trigger(Button::LeftTrigger2));
    axes.push(-value(Axis::RightStickX));
    axes.push(value(Axis::RightStickY));
    axes.push(trigger(Button::RightTrigger2));
    axes.push(-dpad(Button::DPadLeft, Button::DPadRight, Axis::DPadX));
    axes.push(dpad(Button::DPadDown, Button::DPadUp, Axis::DPadY));

    let buttons = FRAME_BUTTONS
        .iter()
        .map(|button| i32::from(pressed(*button)))
        .collect();

    InputFrame::new(axes, buttons)
}

// Public interface for spawning and running the collector
pub struct CollectorHandle {
    task: tokio::task::JoinHandle<Result<(), CollectorError>>,
}

impl CollectorHandle {
    /// Starts the collector on a blocking thread
    ///
    /// Returns once gilrs is initialized, so a missing input backend fails
    /// startup instead of surfacing later.
    pub async fn spawn(
        settings: Option<CollectorSettings>,
        frame_sender: mpsc::Sender<InputFrame>,
        cancel: CancellationToken,
    ) -> Result<Self, CollectorError> {
        info!("Spawning Event Collector with settings: {:?}", settings);
        let (ready_tx, ready_rx) = oneshot::channel();

        // gilrs stays on the thread that created it
        let task = tokio::task::spawn_blocking(move || {
            let collector = match EventCollector::create(settings, frame_sender) {
                Ok(collector) => {
                    let _ = ready_tx.send(Ok(()));
                    collector
                }
                Err(e) => {
                    let message = e.to_string();
                    let _ = ready_tx.send(Err(e));
                    return Err(CollectorError::InitializationError(message));
                }
            };

            let mut collecting = collector.initialize();
            let result = collecting.run_collection_loop(&cancel);
            if let Err(e) = &result {
                error!("Collector task terminated with error: {}", e);
            }
            result
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                info!("Event Collector successfully started");
                Ok(Self { task })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CollectorError::InitializationError(
                "collector thread exited during startup".to_string(),
            )),
        }
    }

    pub async fn join(self) -> Result<(), CollectorError> {
        self.task
            .await
            .map_err(|e| CollectorError::TaskError(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::decoder::DecodedInput;

    #[test]
    fn idle_gamepad_decodes_to_rest_position() {
        let frame = build_frame(|_| 0.0, |_| false, |_| 0.0);
        let input = DecodedInput::decode(&frame).unwrap();

        assert_eq!(frame.axes.len(), AXIS_COUNT);
        assert_eq!(frame.buttons.len(), BUTTON_COUNT);
        assert_eq!(input.left_trigger, 1.0);
        assert_eq!(input.right_trigger, 1.0);
        assert!(!input.x);
    }

    #[test]
    fn stick_x_is_positive_to_the_left() {
        let frame = build_frame(
            |axis| match axis {
                Axis::LeftStickX => 0.5,
                Axis::LeftStickY => 0.25,
                _ => 0.0,
            },
            |_| false,
            |_| 0.0,
        );
        let input = DecodedInput::decode(&frame).unwrap();
        assert_eq!(input.left_stick_x, -0.5);
        assert_eq!(input.left_stick_y, 0.25);
    }

    #[test]
    fn xbox_face_buttons_land_on_their_fields() {
        let frame = build_frame(
            |_| 0.0,
            |button| matches!(button, Button::West | Button::North),
            |_| 0.0,
        );
        let input = DecodedInput::decode(&frame).unwrap();
        assert!(input.x);
        assert!(input.y);
        assert!(!input.a);
        assert!(!input.b);
    }

    #[test]
    fn full_trigger_reads_minus_one() {
        let frame = build_frame(
            |_| 0.0,
            |_| false,
            |button| if button == Button::RightTrigger2 { 1.0 } else { 0.0 },
        );
        let input = DecodedInput::decode(&frame).unwrap();
        assert_eq!(input.right_trigger, -1.0);
        assert_eq!(input.left_trigger, 1.0);
    }

    #[test]
    fn dpad_buttons_map_to_axes() {
        let frame = build_frame(
            |_| 0.0,
            |button| matches!(button, Button::DPadUp | Button::DPadLeft),
            |_| 0.0,
        );
        let input = DecodedInput::decode(&frame).unwrap();
        assert_eq!(input.dpad_y, 1.0);
        assert_eq!(input.dpad_x, 1.0);
    }
}
