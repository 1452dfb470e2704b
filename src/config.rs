use crate::error::{ClientError, Result};
use crate::logger::LogSeverity;
use crate::protocol::client_settings::ClientSettingsPacket;
use crate::protocol::handshake::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client Settings sent right after Join Game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub locale: String,
    pub view_distance: i8,
    /// 0 enabled, 1 commands only, 2 hidden
    pub chat_mode: i32,
    pub chat_colors: bool,
    pub displayed_skin_parts: u8,
    /// 0 left, 1 right
    pub main_hand: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            locale: "en_US".to_owned(),
            view_distance: 10,
            chat_mode: 0,
            chat_colors: true,
            displayed_skin_parts: 0x7F,
            main_hand: 1,
        }
    }
}

impl Settings {
    pub fn to_packet(&self) -> ClientSettingsPacket {
        ClientSettingsPacket {
            locale: self.locale.clone(),
            view_distance: self.view_distance,
            chat_mode: self.chat_mode,
            chat_colors: self.chat_colors,
            displayed_skin_parts: self.displayed_skin_parts,
            main_hand: self.main_hand,
        }
    }
}

/// Tunables for a single connection. Server address and credentials are passed separately.
///
/// Events are delivered on a bounded channel of `event_capacity` entries. A consumer that falls
/// that far behind loses events; each lost event is logged as a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub protocol_version: i32,
    pub settings: Settings,
    /// Send Client Status (perform respawn) as soon as health drops to zero
    pub auto_respawn: bool,
    pub event_capacity: usize,
    pub tick_interval_ms: u64,
    pub log_level: LogSeverity,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            settings: Settings::default(),
            auto_respawn: false,
            event_capacity: 1024,
            tick_interval_ms: 50,
            log_level: LogSeverity::Info,
        }
    }
}

impl ClientConfig {
    /// Parses a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json)
            .map_err(|e| ClientError::ProtocolError(format!("Invalid client config: {}", e)))?;
        if config.event_capacity == 0 {
            return Err(ClientError::ProtocolError(
                "event_capacity must be at least 1".to_owned(),
            ));
        }
        if config.tick_interval_ms == 0 {
            return Err(ClientError::ProtocolError(
                "tick_interval_ms must be at least 1".to_owned(),
            ));
        }
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.protocol_version, 340);
        assert_eq!(config.event_capacity, 1024);
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
        assert!(!config.auto_respawn);

        let packet = config.settings.to_packet();
        assert_eq!(packet.locale, "en_US");
        assert_eq!(packet.displayed_skin_parts, 0x7F);
        assert_eq!(packet.main_hand, 1);
    }

    #[test]
    fn test_from_json_partial() {
        let config = ClientConfig::from_json(
            r#"{"auto_respawn": true, "log_level": "debug", "settings": {"view_distance": 4}}"#,
        )
        .unwrap();
        assert!(config.auto_respawn);
        assert_eq!(config.log_level, LogSeverity::Debug);
        assert_eq!(config.settings.view_distance, 4);
        assert_eq!(config.settings.locale, "en_US");
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert_matches!(
            ClientConfig::from_json(r#"{"event_capacity": 0}"#),
            Err(ClientError::ProtocolError(_))
        );
        assert_matches!(
            ClientConfig::from_json("not json"),
            Err(ClientError::ProtocolError(_))
        );
    }
}
