use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use std::io;

/// Held Item Change sent by the server to select a hotbar slot.
#[derive(Debug)]
pub struct HeldItemChangePacket {
    pub slot: i8,
}

impl Packet for HeldItemChangePacket {
    fn packet_id() -> i32
    where
        Self: Sized,
    {
        0x3A
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(HeldItemChangePacket {
            slot: buffer.read_i8()?,
        })
    }
}

/// Held Item Change sent by the client.
#[derive(Debug)]
pub struct SelectSlotPacket {
    slot: i16,
}

impl Packet for SelectSlotPacket {
    fn packet_id() -> i32 {
        0x1A
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_i16(self.slot);
        Ok(())
    }
}

impl SelectSlotPacket {
    pub fn new(slot: i16) -> SelectSlotPacket {
        SelectSlotPacket { slot }
    }
}
