use super::packet::*;
use serde::{Deserialize, Serialize};
use std::io;

/// Status Request, sent right after a handshake with next state 1.
#[derive(Debug)]
pub struct StatusRequestPacket;

impl Packet for StatusRequestPacket {
    fn packet_id() -> i32 {
        0x00
    }

    fn read_from_buffer(_buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(StatusRequestPacket)
    }

    fn write_to_buffer(&self, _buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct StatusResponsePacket {
    pub response: String,
}

impl Packet for StatusResponsePacket {
    fn packet_id() -> i32 {
        0x00
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(StatusResponsePacket {
            response: buffer.read_string()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_string(&self.response);
        Ok(())
    }
}

/// Ping and Pong share the layout: the server echoes the payload back.
#[derive(Debug)]
pub struct PingPacket {
    pub payload: i64,
}

impl Packet for PingPacket {
    fn packet_id() -> i32 {
        0x01
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(PingPacket {
            payload: buffer.read_i64()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_i64(self.payload);
        Ok(())
    }
}

/// Server list entry as returned by the status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub version: StatusVersion,
    pub players: StatusPlayers,
    /// Chat component, either a plain string or an object
    pub description: serde_json::Value,
    #[serde(default)]
    pub favicon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusVersion {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPlayers {
    pub max: i32,
    pub online: i32,
    #[serde(default)]
    pub sample: Vec<StatusPlayer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPlayer {
    pub name: String,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_json() {
        let json = r#"{
            "version": {"name": "1.12.2", "protocol": 340},
            "players": {"max": 20, "online": 1, "sample": [{"name": "Notch", "id": "069a79f4-44e9-4726-a5be-fca90e38aaf5"}]},
            "description": {"text": "A Minecraft Server"}
        }"#;
        let status: ServerStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.version.protocol, 340);
        assert_eq!(status.players.sample[0].name, "Notch");
        assert_eq!(status.description["text"], "A Minecraft Server");
        assert!(status.favicon.is_none());
    }

    #[test]
    fn test_parse_status_without_sample() {
        let json = r#"{"version":{"name":"x","protocol":340},"players":{"max":1,"online":0},"description":"motd"}"#;
        let status: ServerStatus = serde_json::from_str(json).unwrap();
        assert!(status.players.sample.is_empty());
        assert_eq!(status.description, "motd");
    }
}
