use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use std::io;

/// Client Settings (serverbound), sent once after Join Game.
#[derive(Debug, Clone)]
pub struct ClientSettingsPacket {
    pub locale: String,
    pub view_distance: i8,
    /// 0 enabled, 1 commands only, 2 hidden
    pub chat_mode: i32,
    pub chat_colors: bool,
    /// Bit mask of the visible skin layers
    pub displayed_skin_parts: u8,
    /// 0 left, 1 right
    pub main_hand: i32,
}

impl Packet for ClientSettingsPacket {
    fn packet_id() -> i32 {
        0x04
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(ClientSettingsPacket {
            locale: buffer.read_string_max(16)?,
            view_distance: buffer.read_i8()?,
            chat_mode: buffer.read_varint()?,
            chat_colors: buffer.read_bool()?,
            displayed_skin_parts: buffer.read_u8()?,
            main_hand: buffer.read_varint()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_string(&self.locale);
        buffer.write_i8(self.view_distance);
        buffer.write_varint(self.chat_mode);
        buffer.write_bool(self.chat_colors);
        buffer.write_u8(self.displayed_skin_parts);
        buffer.write_varint(self.main_hand);
        Ok(())
    }
}
