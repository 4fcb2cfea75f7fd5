pub mod config;
pub mod controller;
pub mod mqtt;
pub mod teleop;

use crate::config::AppConfig;
use crate::controller::event_collector::{CollectorHandle, CollectorSettings};
use crate::mqtt::MqttHandler;
use crate::teleop::teleop_handle::log_task_result;
use crate::teleop::{TeleopHandle, TeleopOutput};
use color_eyre::{eyre::eyre, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = config::resolve_config_path(std::env::args().nth(1))?;
    let config = AppConfig::load(&config_path)
        .await
        .map_err(|e| eyre!("Failed to load {}: {}", config_path.display(), e))?;

    let cancel = CancellationToken::new();
    let (frame_sender, frame_receiver) = mpsc::channel(100);
    let (output_sender, mut output_receiver) = mpsc::channel(100);

    let teleop_handle = TeleopHandle::spawn(
        &config.teleop,
        frame_receiver,
        output_sender,
        cancel.clone(),
    )
    .map_err(|e| eyre!("Failed to spawn teleop controller: {}", e))?;

    let collector_handle = match &config.gamepad {
        Some(gamepad) => {
            info!("Starting local gamepad source");
            let handle = CollectorHandle::spawn(
                Some(CollectorSettings::from(gamepad)),
                frame_sender.clone(),
                cancel.clone(),
            )
            .await
            .map_err(|e| eyre!("Failed to spawn gamepad collector: {}", e))?;
            Some(handle)
        }
        None => None,
    };

    let mut output_task = match &config.mqtt {
        Some(mqtt_config) => {
            let handler =
                MqttHandler::new(mqtt_config, teleop_handle.controller(), frame_sender.clone());
            let cancel = cancel.clone();
            tokio::spawn(handler.run(output_receiver, cancel))
        }
        None => {
            warn!("No [mqtt] section configured, outputs are only logged");
            tokio::spawn(async move {
                while let Some(output) = output_receiver.recv().await {
                    match output {
                        TeleopOutput::SelectedMode(mode) => info!("Selected mode: {}", mode),
                        TeleopOutput::Velocity(velocity) => info!("Velocity: {:?}", velocity),
                    }
                }
            })
        }
    };

    if config.gamepad.is_none() && config.mqtt.is_none() {
        warn!("Neither [gamepad] nor [mqtt] configured, no input frames will arrive");
    }
    drop(frame_sender);

    // Teleop tasks only fail after the output task is gone
    let output_stopped = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
            false
        }
        result = &mut output_task => {
            result?;
            error!("Output task stopped unexpectedly, shutting down");
            true
        }
    };
    teleop_handle.shutdown();

    let teleop_result = teleop_handle.join().await;
    log_task_result(&teleop_result);
    if let Some(handle) = collector_handle {
        if let Err(e) = handle.join().await {
            warn!("Gamepad collector stopped with error: {}", e);
        }
    }
    if output_stopped {
        return Err(eyre!("Output task stopped before shutdown was requested"));
    }
    output_task.await?;

    teleop_result.map_err(|e| eyre!(e))
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
