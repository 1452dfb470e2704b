use super::packet::*;
use std::io;
use uuid::Uuid;

/// Login Start (serverbound)
#[derive(Debug)]
pub struct LoginStartPacket {
    pub username: String,
}

impl Packet for LoginStartPacket {
    fn packet_id() -> i32 {
        0x00
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(LoginStartPacket {
            username: buffer.read_string_max(16)?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_string(&self.username);
        Ok(())
    }
}

/// Disconnect during login. The reason is a JSON chat component.
#[derive(Debug)]
pub struct LoginDisconnectPacket {
    pub reason: String,
}

impl Packet for LoginDisconnectPacket {
    fn packet_id() -> i32 {
        0x00
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(LoginDisconnectPacket {
            reason: buffer.read_string()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_string(&self.reason);
        Ok(())
    }
}

/// Encryption Request (clientbound)
#[derive(Debug)]
pub struct EncryptionRequestPacket {
    /// Empty on vanilla servers, still part of the session hash
    pub server_id: String,
    /// DER-encoded RSA public key
    pub public_key: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl Packet for EncryptionRequestPacket {
    fn packet_id() -> i32 {
        0x01
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(EncryptionRequestPacket {
            server_id: buffer.read_string_max(20)?,
            public_key: buffer.read_byte_array()?,
            verify_token: buffer.read_byte_array()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_string(&self.server_id);
        buffer.write_byte_array(&self.public_key);
        buffer.write_byte_array(&self.verify_token);
        Ok(())
    }
}

/// Encryption Response (serverbound). Both fields are encrypted with the server's public key.
#[derive(Debug)]
pub struct EncryptionResponsePacket {
    pub shared_secret: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl Packet for EncryptionResponsePacket {
    fn packet_id() -> i32 {
        0x01
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(EncryptionResponsePacket {
            shared_secret: buffer.read_byte_array()?,
            verify_token: buffer.read_byte_array()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_byte_array(&self.shared_secret);
        buffer.write_byte_array(&self.verify_token);
        Ok(())
    }
}

/// Login Success (clientbound). This protocol version sends the UUID as a hyphenated string.
#[derive(Debug)]
pub struct LoginSuccessPacket {
    pub uuid: Uuid,
    pub username: String,
}

impl Packet for LoginSuccessPacket {
    fn packet_id() -> i32 {
        0x02
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        let uuid = buffer.read_string_max(36)?;
        let uuid = Uuid::parse_str(&uuid).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UUID: {}", e))
        })?;
        let username = buffer.read_string_max(16)?;

        Ok(LoginSuccessPacket { uuid, username })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_string(&self.uuid.hyphenated().to_string());
        buffer.write_string(&self.username);
        Ok(())
    }
}

/// Set Compression (clientbound)
#[derive(Debug)]
pub struct SetCompressionPacket {
    /// Smallest body size that gets compressed, negative to turn compression off
    pub threshold: i32,
}

impl Packet for SetCompressionPacket {
    fn packet_id() -> i32 {
        0x03
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(SetCompressionPacket {
            threshold: buffer.read_varint()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(self.threshold);
        Ok(())
    }
}
