use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::{MqttConfig, TopicConfig};
use super::message_manager::MQTTMessage;
use crate::controller::decoder::InputFrame;
use crate::teleop::service::parse_bool_request;
use crate::teleop::{ServiceKind, TeleopController, TeleopOutput};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const RESPONSE_SUFFIX: &str = "/response";

// MQTT errors
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    #[error("Client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Failed,
}

#[derive(Clone, Debug, Default)]
pub struct MQTTStatus {
    pub connection_state: ConnectionState,
    pub messages_received: usize,
    pub messages_sent: usize,
    pub last_activity: Option<chrono::DateTime<chrono::Local>>,
}

/// Where an incoming publish goes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncomingRoute {
    Joy,
    Service(ServiceKind),
}

impl TopicConfig {
    pub fn route(&self, topic: &str) -> Option<IncomingRoute> {
        if topic == self.joy_topic {
            Some(IncomingRoute::Joy)
        } else if topic == self.enabled_service {
            Some(IncomingRoute::Service(ServiceKind::Enable))
        } else if topic == self.drive_forward_service {
            Some(IncomingRoute::Service(ServiceKind::DriveForward))
        } else if topic == self.car_style_turning_service {
            Some(IncomingRoute::Service(ServiceKind::CarStyleTurning))
        } else {
            None
        }
    }

    fn subscriptions(&self) -> [(&str, QoS); 4] {
        [
            (self.joy_topic.as_str(), QoS::AtMostOnce),
            (self.enabled_service.as_str(), QoS::AtLeastOnce),
            (self.drive_forward_service.as_str(), QoS::AtLeastOnce),
            (self.car_style_turning_service.as_str(), QoS::AtLeastOnce),
        ]
    }
}

pub fn response_topic(service_topic: &str) -> String {
    format!("{}{}", service_topic, RESPONSE_SUFFIX)
}

/// Bridges MQTT topics to the teleop tasks
///
/// Joy frames go into the frame channel, service requests call the mutators
/// directly, teleop outputs are published back out.
pub struct MqttHandler {
    status: MQTTStatus,
    client: AsyncClient,
    eventloop: EventLoop,
    topics: TopicConfig,
    controller: Arc<TeleopController>,
    frame_sender: mpsc::Sender<InputFrame>,
}

impl MqttHandler {
    pub fn new(
        config: &MqttConfig,
        controller: Arc<TeleopController>,
        frame_sender: mpsc::Sender<InputFrame>,
    ) -> Self {
        let mut mqtt_options = MqttOptions::new(&config.client_id, &config.host, config.port);
        mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if let Some(user) = &config.user {
            mqtt_options.set_credentials(user, config.password.clone().unwrap_or_default());
        }

        let (client, eventloop) = AsyncClient::new(mqtt_options, 100);
        info!(
            "MQTT client created for {}:{} as {}",
            config.host, config.port, config.client_id
        );

        MqttHandler {
            status: MQTTStatus::default(),
            client,
            eventloop,
            topics: config.topics.clone(),
            controller,
            frame_sender,
        }
    }

    fn set_connection_state(&mut self, state: ConnectionState) {
        if self.status.connection_state != state {
            debug!(
                "MQTT connection state {:?} -> {:?}",
                self.status.connection_state, state
            );
            self.status.connection_state = state;
        }
    }

    /// Runs until cancelled or the output channel closes
    ///
    /// Connection, subscribe and encode failures are logged and never end
    /// the loop.
    pub async fn run(mut self, mut outputs: mpsc::Receiver<TeleopOutput>, cancel: CancellationToken) {
        info!("Starting MQTT bridge");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(
                        "MQTT bridge shutting down ({} received, {} sent)",
                        self.status.messages_received, self.status.messages_sent
                    );
                    // Best effort, the broker drops us on keep-alive anyway
                    if let Err(e) = self.client.try_disconnect() {
                        debug!("Disconnect failed: {}", e);
                    }
                    return;
                }
                output = outputs.recv() => match output {
                    Some(output) => {
                        if let Err(e) = self.publish_output(&output) {
                            warn!("Dropping teleop output {:?}: {}", output, e);
                        }
                    }
                    None => {
                        info!("Teleop output channel closed, stopping MQTT bridge");
                        return;
                    }
                },
                event = self.eventloop.poll() => match event {
                    Ok(event) => self.handle_event(event),
                    Err(e) => {
                        if self.status.connection_state != ConnectionState::Failed {
                            error!("MQTT connection error: {}", e);
                        }
                        self.set_connection_state(ConnectionState::Failed);
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                        }
                    }
                },
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(_)) => {
                if self.status.connection_state == ConnectionState::Failed {
                    info!("Reconnected to MQTT broker");
                } else {
                    info!("Connected to MQTT broker");
                }
                self.set_connection_state(ConnectionState::Connected);
                if let Err(e) = self.subscribe_all() {
                    // Retried on the next ConnAck
                    warn!("Failed to queue subscriptions: {}", e);
                }
            }
            Event::Incoming(Packet::Publish(publish)) => {
                self.status.messages_received += 1;
                self.status.last_activity = Some(chrono::Local::now());
                self.handle_publish(publish);
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("Broker closed the connection");
                self.set_connection_state(ConnectionState::Disconnected);
            }
            _ => {}
        }
    }

    // Clean session, so this runs after every connect
    fn subscribe_all(&self) -> Result<(), MqttError> {
        for (topic, qos) in self.topics.subscriptions() {
            debug!("Subscribing to {}", topic);
            self.client.try_subscribe(topic, qos)?;
        }
        Ok(())
    }

    fn handle_publish(&mut self, publish: Publish) {
        match self.topics.route(&publish.topic) {
            Some(IncomingRoute::Joy) => match serde_json::from_slice::<InputFrame>(&publish.payload) {
                Ok(frame) => match self.frame_sender.try_send(frame) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!("Frame queue full, dropping joy message");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        warn!("Frame channel closed, dropping joy message");
                    }
                },
                Err(e) => warn!("Ignoring unparseable joy message: {}", e),
            },
            Some(IncomingRoute::Service(kind)) => match parse_bool_request(&publish.payload) {
                Some(flag) => {
                    info!("Service request {} = {}", kind, flag);
                    let response = self.controller.call(kind, flag);
                    match serde_json::to_string(&response) {
                        Ok(content) => {
                            let message =
                                MQTTMessage::from_topic(response_topic(&publish.topic), content);
                            self.publish(message, QoS::AtLeastOnce);
                        }
                        Err(e) => warn!("Failed to encode {} response: {}", kind, e),
                    }
                }
                None => warn!(
                    "Ignoring {} request with non-boolean payload {:?}",
                    kind,
                    String::from_utf8_lossy(&publish.payload)
                ),
            },
            None => debug!("Ignoring message on unexpected topic {}", publish.topic),
        }
    }

    fn publish_output(&mut self, output: &TeleopOutput) -> Result<(), MqttError> {
        let message = MQTTMessage::from_output(&self.topics, output)?;
        self.publish(message, QoS::AtMostOnce);
        Ok(())
    }

    fn publish(&mut self, message: MQTTMessage, qos: QoS) {
        debug!("Publishing {}", message);
        match self
            .client
            .try_publish(message.topic, qos, false, message.content.into_bytes())
        {
            Ok(()) => {
                self.status.messages_sent += 1;
                self.status.last_activity = Some(chrono::Local::now());
            }
            // Request queue full while disconnected, drop instead of blocking
            Err(e) => warn!("Failed to queue MQTT message: {}", e),
        }
    }
}
