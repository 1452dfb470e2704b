use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use std::io;

/// Keep Alive sent by the server. Has to be answered with the same id.
#[derive(Debug, Clone)]
pub struct KeepAlivePacket {
    pub keep_alive_id: i64,
}

impl Packet for KeepAlivePacket {
    fn packet_id() -> i32 {
        0x1F
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(KeepAlivePacket {
            keep_alive_id: buffer.read_i64()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_i64(self.keep_alive_id);
        Ok(())
    }
}

/// Keep Alive answer.
#[derive(Debug, Clone)]
pub struct KeepAliveResponsePacket {
    pub keep_alive_id: i64,
}

impl Packet for KeepAliveResponsePacket {
    fn packet_id() -> i32 {
        0x0B
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(KeepAliveResponsePacket {
            keep_alive_id: buffer.read_i64()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_i64(self.keep_alive_id);
        Ok(())
    }
}

impl KeepAliveResponsePacket {
    pub fn new(keep_alive_id: i64) -> Self {
        Self { keep_alive_id }
    }
}
