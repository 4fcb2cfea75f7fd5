use crate::config::ConfigError;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default)]
    pub topics: TopicConfig,
}

/// Topic names, request/response services get a `/response` suffix for replies
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TopicConfig {
    pub joy_topic: String,
    pub cmd_vel_topic: String,
    pub selected_mode_topic: String,
    pub enabled_service: String,
    pub drive_forward_service: String,
    pub car_style_turning_service: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            joy_topic: "joy".to_string(),
            cmd_vel_topic: "cmd_vel".to_string(),
            selected_mode_topic: "selected_mode".to_string(),
            enabled_service: "gamepad_input/enabled".to_string(),
            drive_forward_service: "gamepad_input/drive_forward".to_string(),
            car_style_turning_service: "gamepad_input/car_style_turning".to_string(),
        }
    }
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "gamepad-teleop".to_string()
}

fn default_keep_alive_secs() -> u64 {
    5
}

impl MqttConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "mqtt.host",
                reason: "must not be empty".to_string(),
            });
        }
        let topics = [
            ("mqtt.topics.joy_topic", &self.topics.joy_topic),
            ("mqtt.topics.cmd_vel_topic", &self.topics.cmd_vel_topic),
            (
                "mqtt.topics.selected_mode_topic",
                &self.topics.selected_mode_topic,
            ),
            ("mqtt.topics.enabled_service", &self.topics.enabled_service),
            (
                "mqtt.topics.drive_forward_service",
                &self.topics.drive_forward_service,
            ),
            (
                "mqtt.topics.car_style_turning_service",
                &self.topics.car_style_turning_service,
            ),
        ];
        for (key, topic) in topics {
            if topic.is_empty() || topic.contains(['+', '#']) {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("'{}' is not a valid topic name", topic),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_defaults() {
        let config: MqttConfig = toml::from_str("host = \"broker.local\"").unwrap();
        assert_eq!(config.port, 1883);
        assert_eq!(config.topics.cmd_vel_topic, "cmd_vel");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_wildcard_topics() {
        let config: MqttConfig =
            toml::from_str("host = \"broker.local\"\n[topics]\njoy_topic = \"joy/#\"").unwrap();
        assert!(config.validate().is_err());
    }
}
