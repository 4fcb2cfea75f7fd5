//! Teleop Handle - Task wiring for frame translation and the watchdog
//!
//! Spawns two independent tokio tasks sharing one [`TeleopController`]:
//!
//! ```text
//! InputFrame ─[mpsc]→ Frame Task ──┐
//!                                  ├─[mpsc]→ TeleopOutput → boundary layer
//!            Watchdog (interval) ──┘
//! ```
//!
//! Mutators are reached through [`TeleopHandle::controller`] and may be
//! called from any task while both loops run.

use crate::config::{ConfigError, TeleopConfig};
use crate::controller::decoder::InputFrame;
use crate::teleop::controller::TeleopController;
use crate::teleop::drive::VelocityCommand;
use crate::teleop::switches::SelectedMode;
use crate::teleop::watchdog::run_watchdog;
use chrono::Local;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Something for the boundary layer to publish
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TeleopOutput {
    SelectedMode(SelectedMode),
    Velocity(VelocityCommand),
}

// Teleop errors
#[derive(Debug, thiserror::Error)]
pub enum TeleopError {
    #[error("Invalid teleop config: {0}")]
    Config(#[from] ConfigError),

    #[error("Output channel closed: {0}")]
    OutputClosed(String),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub struct TeleopHandle {
    controller: Arc<TeleopController>,
    cancel: CancellationToken,
    frame_task: JoinHandle<Result<(), TeleopError>>,
    watchdog_task: JoinHandle<Result<(), TeleopError>>,
}

impl TeleopHandle {
    /// Validates the config and starts the frame task and the watchdog
    ///
    /// Both tasks stop when `cancel` fires. The frame task also stops when
    /// every frame sender is dropped, the watchdog keeps running until
    /// cancelled.
    pub fn spawn(
        config: &TeleopConfig,
        frame_receiver: mpsc::Receiver<InputFrame>,
        output_sender: mpsc::Sender<TeleopOutput>,
        cancel: CancellationToken,
    ) -> Result<Self, TeleopError> {
        config.validate()?;
        info!("Initializing teleop controller with config: {:?}", config);

        let controller = Arc::new(TeleopController::new(config));

        info!("Spawning frame task");
        let frame_task = tokio::spawn(run_frame_loop(
            controller.clone(),
            frame_receiver,
            output_sender.clone(),
            cancel.clone(),
        ));

        info!("Spawning watchdog task");
        let watchdog_task = tokio::spawn(run_watchdog(
            controller.clone(),
            output_sender,
            cancel.clone(),
        ));

        info!("Teleop controller started");
        Ok(Self {
            controller,
            cancel,
            frame_task,
            watchdog_task,
        })
    }

    pub fn controller(&self) -> Arc<TeleopController> {
        self.controller.clone()
    }

    pub fn shutdown(&self) {
        info!("Teleop shutdown requested");
        self.cancel.cancel();
    }

    /// Waits for both tasks, returning the first error
    pub async fn join(self) -> Result<(), TeleopError> {
        let frame_result = self.frame_task.await?;
        let watchdog_result = self.watchdog_task.await?;
        frame_result.and(watchdog_result)
    }
}

async fn emit(
    output: &mpsc::Sender<TeleopOutput>,
    message: TeleopOutput,
) -> Result<(), TeleopError> {
    output
        .send(message)
        .await
        .map_err(|e| TeleopError::OutputClosed(e.to_string()))
}

async fn run_frame_loop(
    controller: Arc<TeleopController>,
    mut frames: mpsc::Receiver<InputFrame>,
    output: mpsc::Sender<TeleopOutput>,
    cancel: CancellationToken,
) -> Result<(), TeleopError> {
    info!("Entering frame loop");

    // Stats
    let mut frame_count = 0u64;
    let mut malformed_count = 0u64;
    let mut last_stats_time = Local::now();
    let stats_interval = chrono::Duration::seconds(30);

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Frame loop shutting down");
                return Ok(());
            }
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => {
                    info!("Frame channel closed, leaving frame loop");
                    return Ok(());
                }
            },
        };

        frame_count += 1;
        match controller.handle_frame(&frame, Instant::now()) {
            Ok(outcome) => {
                if let Some(mode) = outcome.mode {
                    debug!("Selected mode: {}", mode);
                    emit(&output, TeleopOutput::SelectedMode(mode)).await?;
                }
                if let Some(velocity) = outcome.velocity {
                    emit(&output, TeleopOutput::Velocity(velocity)).await?;
                }
            }
            Err(e) => {
                malformed_count += 1;
                warn!("Skipping malformed frame: {}", e);
            }
        }

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            info!(
                "Frame stats: {} frames, {} malformed in the last {} seconds",
                frame_count,
                malformed_count,
                (now - last_stats_time).num_seconds()
            );
            frame_count = 0;
            malformed_count = 0;
            last_stats_time = now;
        }
    }
}

/// Logs the outcome of a finished teleop task
pub fn log_task_result(result: &Result<(), TeleopError>) {
    match result {
        Ok(()) => info!("Teleop tasks finished"),
        Err(e) => error!("Teleop task terminated with error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::decoder::{AXIS_COUNT, BUTTON_COUNT};
    use tokio::time::Duration;

    fn config(enabled_on_start: bool) -> TeleopConfig {
        TeleopConfig {
            timeout: 0.5,
            turbo_multiplier: 1.0,
            base_multiplier: 0.5,
            min_linear_speed: -0.5,
            max_linear_speed: 1.0,
            min_angular_speed: -2.0,
            max_angular_speed: 2.0,
            enabled_on_start,
        }
    }

    fn drive_frame() -> InputFrame {
        let mut axes = vec![0.0; AXIS_COUNT];
        axes[1] = 1.0;
        let mut buttons = vec![0; BUTTON_COUNT];
        buttons[2] = 1; // X
        InputFrame::new(axes, buttons)
    }

    fn teleop_frame() -> InputFrame {
        let mut frame = drive_frame();
        frame.buttons[3] = 1; // Y
        frame
    }

    struct Harness {
        frames: mpsc::Sender<InputFrame>,
        outputs: mpsc::Receiver<TeleopOutput>,
        handle: TeleopHandle,
    }

    fn start(enabled_on_start: bool) -> Harness {
        let (frames, frame_rx) = mpsc::channel(16);
        let (output_tx, outputs) = mpsc::channel(16);
        let handle = TeleopHandle::spawn(
            &config(enabled_on_start),
            frame_rx,
            output_tx,
            CancellationToken::new(),
        )
        .unwrap();
        Harness {
            frames,
            outputs,
            handle,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_stops_after_timeout() {
        let mut h = start(true);

        // nothing received yet, so the first tick already stops
        assert_eq!(
            h.outputs.recv().await,
            Some(TeleopOutput::Velocity(VelocityCommand::stop()))
        );

        let sent_at = Instant::now();
        h.frames.send(drive_frame()).await.unwrap();
        match h.outputs.recv().await {
            Some(TeleopOutput::Velocity(v)) => assert_eq!(v.linear_x, 0.5),
            other => panic!("unexpected output {:?}", other),
        }

        assert_eq!(
            h.outputs.recv().await,
            Some(TeleopOutput::Velocity(VelocityCommand::stop()))
        );
        let elapsed = sent_at.elapsed();
        assert!(elapsed > Duration::from_millis(500), "stopped after {:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(600), "stopped after {:?}", elapsed);

        h.handle.shutdown();
        h.handle.join().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_watchdog_stays_silent() {
        let mut h = start(false);
        let result = tokio::time::timeout(Duration::from_secs(30), h.outputs.recv()).await;
        assert!(result.is_err(), "unexpected output {:?}", result);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frame_is_skipped() {
        let mut h = start(false);
        h.frames
            .send(InputFrame::new(vec![0.0; 2], vec![1; BUTTON_COUNT]))
            .await
            .unwrap();
        h.frames.send(teleop_frame()).await.unwrap();

        assert_eq!(
            h.outputs.recv().await,
            Some(TeleopOutput::SelectedMode(SelectedMode::Teleop))
        );
        assert!(h.outputs.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn mode_comes_before_velocity() {
        let mut h = start(false);
        h.handle.controller().set_enabled(true);
        h.frames.send(teleop_frame()).await.unwrap();

        // first watchdog tick may land before the frame
        let mut outputs = Vec::new();
        while outputs.len() < 2 {
            match h.outputs.recv().await {
                Some(TeleopOutput::Velocity(v)) if v.is_stop() && outputs.is_empty() => {}
                Some(output) => outputs.push(output),
                None => break,
            }
        }

        assert_eq!(outputs[0], TeleopOutput::SelectedMode(SelectedMode::Teleop));
        assert!(matches!(outputs[1], TeleopOutput::Velocity(v) if v.linear_x == 0.5));
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_at_runtime_silences_velocity() {
        let mut h = start(false);
        let controller = h.handle.controller();

        controller.set_enabled(true);
        controller.set_enabled(false);
        h.frames.send(teleop_frame()).await.unwrap();

        assert_eq!(
            h.outputs.recv().await,
            Some(TeleopOutput::SelectedMode(SelectedMode::Teleop))
        );
        let result = tokio::time::timeout(Duration::from_secs(5), h.outputs.recv()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn shutdown_joins_both_tasks() {
        let h = start(false);
        drop(h.frames);
        h.handle.shutdown();
        h.handle.join().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let (_frames, frame_rx) = mpsc::channel(1);
        let (output_tx, _outputs) = mpsc::channel(1);
        let mut bad = config(true);
        bad.timeout = -1.0;

        let result = TeleopHandle::spawn(&bad, frame_rx, output_tx, CancellationToken::new());
        assert!(matches!(result, Err(TeleopError::Config(_))));
    }
}
