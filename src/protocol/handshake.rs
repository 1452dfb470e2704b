use super::packet::*;
use std::io;

/// Protocol version spoken by this client (game release 1.12.2).
pub const PROTOCOL_VERSION: i32 = 340;

/// State the server should switch to after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    Status = 1,
    Login = 2,
}

/// Handshake packet
#[derive(Debug)]
pub struct HandshakePacket {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: NextState,
}

impl HandshakePacket {
    pub fn new(server_address: &str, server_port: u16, next_state: NextState) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            server_address: server_address.to_owned(),
            server_port,
            next_state,
        }
    }
}

impl Packet for HandshakePacket {
    fn packet_id() -> i32 {
        0x00
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        let protocol_version = buffer.read_varint()?;
        let server_address = buffer.read_string()?;
        let server_port = buffer.read_u16()?;
        let next_state = match buffer.read_varint()? {
            1 => NextState::Status,
            2 => NextState::Login,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid next state {}", other),
                ))
            }
        };

        Ok(HandshakePacket {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(self.protocol_version);
        buffer.write_string(&self.server_address);
        buffer.write_u16(self.server_port);
        buffer.write_varint(self.next_state as i32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::{frame, COMPRESSION_DISABLED};

    #[test]
    fn test_handshake_wire_bytes() {
        let packet = HandshakePacket::new("example.com", 25565, NextState::Login);
        let framed = frame(&RawPacket::from_packet(&packet).unwrap(), COMPRESSION_DISABLED).unwrap();

        let mut body = vec![0x00, 0xD4, 0x02, 11];
        body.extend_from_slice(b"example.com");
        body.extend_from_slice(&[0x63, 0xDD, 0x02]);
        let mut expected = vec![body.len() as u8];
        expected.extend_from_slice(&body);

        assert_eq!(framed, expected);
    }

    #[test]
    fn test_handshake_read_back() {
        let raw = RawPacket::from_packet(&HandshakePacket::new("localhost", 25565, NextState::Status)).unwrap();
        let packet: HandshakePacket = raw.decode().unwrap();
        assert_eq!(packet.protocol_version, PROTOCOL_VERSION);
        assert_eq!(packet.server_address, "localhost");
        assert_eq!(packet.next_state, NextState::Status);
    }
}
