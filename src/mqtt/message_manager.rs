use crate::mqtt::config::TopicConfig;
use crate::teleop::TeleopOutput;
use chrono::NaiveDateTime;
use std::fmt;

/// Outbound message with the time it was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MQTTMessage {
    pub topic: String,
    pub content: String,
    pub timestamp: NaiveDateTime,
}

impl fmt::Display for MQTTMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} - {}: {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.topic,
            self.content
        )
    }
}

impl MQTTMessage {
    pub fn from_topic(topic: String, content: String) -> Self {
        MQTTMessage {
            topic,
            content,
            timestamp: chrono::Local::now().naive_local(),
        }
    }

    /// Encodes a teleop output for its topic
    ///
    /// Modes go out as the bare label, velocities as a JSON twist.
    pub fn from_output(
        topics: &TopicConfig,
        output: &TeleopOutput,
    ) -> Result<Self, serde_json::Error> {
        match output {
            TeleopOutput::SelectedMode(mode) => Ok(Self::from_topic(
                topics.selected_mode_topic.clone(),
                mode.label().to_string(),
            )),
            TeleopOutput::Velocity(velocity) => Ok(Self::from_topic(
                topics.cmd_vel_topic.clone(),
                serde_json::to_string(&velocity.to_twist())?,
            )),
        }
    }
}
