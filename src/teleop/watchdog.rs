//! Liveness watchdog
//!
//! Checks the input timestamp several times per timeout window and sends a
//! zero velocity command on every tick while the controller is enabled and
//! input is stale. Best effort only: the tick is a tokio interval, not a
//! real-time guarantee.

use crate::teleop::controller::TeleopController;
use crate::teleop::drive::VelocityCommand;
use crate::teleop::teleop_handle::{TeleopError, TeleopOutput};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Watchdog ticks per timeout window
pub const CHECKS_PER_TIMEOUT: u32 = 5;

/// Tick period for a given timeout
///
/// Computed on the duration itself. An integer `checks / timeout` rate would
/// truncate to zero for timeouts of five seconds or more. Never below 1ms,
/// since `tokio::time::interval` rejects a zero period.
pub fn watchdog_period(timeout: Duration) -> Duration {
    (timeout / CHECKS_PER_TIMEOUT).max(Duration::from_millis(1))
}

pub(crate) async fn run_watchdog(
    controller: Arc<TeleopController>,
    output: mpsc::Sender<TeleopOutput>,
    cancel: CancellationToken,
) -> Result<(), TeleopError> {
    let period = watchdog_period(controller.timeout());
    info!(
        "Starting watchdog: timeout {:?}, checking every {:?}",
        controller.timeout(),
        period
    );

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stopped = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Watchdog shutting down");
                return Ok(());
            }
            _ = interval.tick() => {}
        }

        if controller.is_stale(Instant::now()) {
            if !stopped {
                warn!(
                    "No input within {:?}, sending stop command",
                    controller.timeout()
                );
                stopped = true;
            } else {
                debug!("Input still stale, repeating stop command");
            }
            output
                .send(TeleopOutput::Velocity(VelocityCommand::stop()))
                .await
                .map_err(|e| TeleopError::OutputClosed(e.to_string()))?;
        } else if stopped {
            info!("Input resumed");
            stopped = false;
        }
    }
}
