//! Serverbound packets for acting on the world: digging, placing, attacking and respawning.

use crate::protocol::packet::{BlockPos, MinecraftPacketBuffer, Packet};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Main = 0,
    Off = 1,
}

/// Block face a dig or placement targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Bottom = 0,
    Top = 1,
    North = 2,
    South = 3,
    West = 4,
    East = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiggingStatus {
    Started = 0,
    Cancelled = 1,
    Finished = 2,
    DropItemStack = 3,
    DropItem = 4,
    FinishUsingItem = 5,
    SwapHands = 6,
}

/// Client Status (serverbound)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatusPacket {
    PerformRespawn = 0,
    RequestStats = 1,
}

impl Packet for ClientStatusPacket {
    fn packet_id() -> i32 {
        0x03
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        match buffer.read_varint()? {
            0 => Ok(ClientStatusPacket::PerformRespawn),
            1 => Ok(ClientStatusPacket::RequestStats),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown client status {}", other),
            )),
        }
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(*self as i32);
        Ok(())
    }
}

/// Use Entity (serverbound)
#[derive(Debug, Clone)]
pub enum UseEntityPacket {
    Interact { target: i32, hand: Hand },
    Attack { target: i32 },
}

impl Packet for UseEntityPacket {
    fn packet_id() -> i32 {
        0x0A
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        match self {
            UseEntityPacket::Interact { target, hand } => {
                buffer.write_varint(*target);
                buffer.write_varint(0);
                buffer.write_varint(*hand as i32);
            }
            UseEntityPacket::Attack { target } => {
                buffer.write_varint(*target);
                buffer.write_varint(1);
            }
        }
        Ok(())
    }
}

/// Player Digging (serverbound)
#[derive(Debug, Clone)]
pub struct PlayerDiggingPacket {
    pub status: DiggingStatus,
    pub position: BlockPos,
    pub face: Face,
}

impl Packet for PlayerDiggingPacket {
    fn packet_id() -> i32 {
        0x14
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(self.status as i32);
        buffer.write_position(self.position);
        buffer.write_i8(self.face as i8);
        Ok(())
    }
}

/// Animation (serverbound), swings an arm.
#[derive(Debug, Clone)]
pub struct AnimationPacket {
    pub hand: Hand,
}

impl Packet for AnimationPacket {
    fn packet_id() -> i32 {
        0x1D
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(self.hand as i32);
        Ok(())
    }
}

/// Player Block Placement (serverbound)
#[derive(Debug, Clone)]
pub struct PlayerBlockPlacementPacket {
    /// Block being clicked, not the block being placed
    pub position: BlockPos,
    pub face: Face,
    pub hand: Hand,
    /// Position of the crosshair on the face, 0.0 to 1.0
    pub cursor: [f32; 3],
}

impl Packet for PlayerBlockPlacementPacket {
    fn packet_id() -> i32 {
        0x1F
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_position(self.position);
        buffer.write_varint(self.face as i32);
        buffer.write_varint(self.hand as i32);
        for axis in self.cursor {
            buffer.write_f32(axis);
        }
        Ok(())
    }
}

/// Use Item (serverbound)
#[derive(Debug, Clone)]
pub struct UseItemPacket {
    pub hand: Hand,
}

impl Packet for UseItemPacket {
    fn packet_id() -> i32 {
        0x20
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(self.hand as i32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packet::RawPacket;

    #[test]
    fn test_digging_layout() {
        let raw = RawPacket::from_packet(&PlayerDiggingPacket {
            status: DiggingStatus::Finished,
            position: BlockPos::new(1, 2, 3),
            face: Face::Top,
        })
        .unwrap();
        assert_eq!(raw.id(), 0x14);
        let mut expected = vec![0x02];
        expected.extend_from_slice(&BlockPos::new(1, 2, 3).to_packed().to_be_bytes());
        expected.push(0x01);
        assert_eq!(raw.data(), &expected[..]);
    }

    #[test]
    fn test_attack_layout() {
        let raw = RawPacket::from_packet(&UseEntityPacket::Attack { target: 300 }).unwrap();
        assert_eq!(raw.data(), &[0xAC, 0x02, 0x01]);
    }

    #[test]
    fn test_placement_layout() {
        let raw = RawPacket::from_packet(&PlayerBlockPlacementPacket {
            position: BlockPos::new(0, 64, 0),
            face: Face::Top,
            hand: Hand::Main,
            cursor: [0.5, 1.0, 0.5],
        })
        .unwrap();
        assert_eq!(raw.id(), 0x1F);
        assert_eq!(raw.data().len(), 8 + 1 + 1 + 12);
    }
}
