use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use std::io;

/// Longest chat message the server accepts from a client, in bytes.
pub const MAX_CHAT_LEN: usize = 256;

/// Chat Message (clientbound)
#[derive(Debug, Clone)]
pub struct ChatMessagePacket {
    /// Raw JSON chat component
    pub json: String,
    /// 0 chat, 1 system message, 2 above the hotbar
    pub position: u8,
}

impl Packet for ChatMessagePacket {
    fn packet_id() -> i32 {
        0x0F
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(ChatMessagePacket {
            json: buffer.read_string()?,
            position: buffer.read_u8()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_string(&self.json);
        buffer.write_u8(self.position);
        Ok(())
    }
}

/// Chat Message (serverbound). Commands are sent the same way, with a leading slash.
#[derive(Debug, Clone)]
pub struct ChatPacket {
    pub message: String,
}

impl Packet for ChatPacket {
    fn packet_id() -> i32 {
        0x02
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(ChatPacket {
            message: buffer.read_string_max(MAX_CHAT_LEN)?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        if self.message.len() > MAX_CHAT_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Chat message of {} bytes is too long", self.message.len()),
            ));
        }
        buffer.write_string(&self.message);
        Ok(())
    }
}
