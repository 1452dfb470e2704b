//! Clientbound entity packets. Only the fields the world model tracks are decoded, entity
//! metadata trailing the spawn packets is skipped.

use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use std::io;
use uuid::Uuid;

/// Relative moves are sent in 1/4096 of a block.
pub const RELATIVE_MOVE_SCALE: f64 = 4096.0;
/// Velocity is sent in 1/8000 of a block per tick.
pub const VELOCITY_SCALE: f64 = 8000.0;

fn read_velocity(buffer: &mut MinecraftPacketBuffer) -> io::Result<[f64; 3]> {
    Ok([
        buffer.read_i16()? as f64 / VELOCITY_SCALE,
        buffer.read_i16()? as f64 / VELOCITY_SCALE,
        buffer.read_i16()? as f64 / VELOCITY_SCALE,
    ])
}

fn read_delta(buffer: &mut MinecraftPacketBuffer) -> io::Result<[f64; 3]> {
    Ok([
        buffer.read_i16()? as f64 / RELATIVE_MOVE_SCALE,
        buffer.read_i16()? as f64 / RELATIVE_MOVE_SCALE,
        buffer.read_i16()? as f64 / RELATIVE_MOVE_SCALE,
    ])
}

fn read_position(buffer: &mut MinecraftPacketBuffer) -> io::Result<[f64; 3]> {
    Ok([buffer.read_f64()?, buffer.read_f64()?, buffer.read_f64()?])
}

/// Spawn Object: vehicles, dropped items, projectiles.
#[derive(Debug, Clone)]
pub struct SpawnObjectPacket {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub kind: i8,
    pub position: [f64; 3],
    pub pitch: f32,
    pub yaw: f32,
    pub data: i32,
    pub velocity: [f64; 3],
}

impl Packet for SpawnObjectPacket {
    fn packet_id() -> i32 {
        0x00
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(SpawnObjectPacket {
            entity_id: buffer.read_varint()?,
            uuid: buffer.read_uuid()?,
            kind: buffer.read_i8()?,
            position: read_position(buffer)?,
            pitch: buffer.read_angle()?,
            yaw: buffer.read_angle()?,
            data: buffer.read_i32()?,
            velocity: read_velocity(buffer)?,
        })
    }
}

/// Spawn Mob
#[derive(Debug, Clone)]
pub struct SpawnMobPacket {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub kind: i32,
    pub position: [f64; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub head_pitch: f32,
    pub velocity: [f64; 3],
}

impl Packet for SpawnMobPacket {
    fn packet_id() -> i32 {
        0x03
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(SpawnMobPacket {
            entity_id: buffer.read_varint()?,
            uuid: buffer.read_uuid()?,
            kind: buffer.read_varint()?,
            position: read_position(buffer)?,
            yaw: buffer.read_angle()?,
            pitch: buffer.read_angle()?,
            head_pitch: buffer.read_angle()?,
            velocity: read_velocity(buffer)?,
        })
    }
}

/// Spawn Player
#[derive(Debug, Clone)]
pub struct SpawnPlayerPacket {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub position: [f64; 3],
    pub yaw: f32,
    pub pitch: f32,
}

impl Packet for SpawnPlayerPacket {
    fn packet_id() -> i32 {
        0x05
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(SpawnPlayerPacket {
            entity_id: buffer.read_varint()?,
            uuid: buffer.read_uuid()?,
            position: read_position(buffer)?,
            yaw: buffer.read_angle()?,
            pitch: buffer.read_angle()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(self.entity_id);
        buffer.write_uuid(self.uuid);
        for axis in self.position {
            buffer.write_f64(axis);
        }
        buffer.write_angle(self.yaw);
        buffer.write_angle(self.pitch);
        // Empty metadata
        buffer.write_u8(0xFF);
        Ok(())
    }
}

/// Entity Relative Move
#[derive(Debug, Clone)]
pub struct EntityRelativeMovePacket {
    pub entity_id: i32,
    /// Already scaled to blocks
    pub delta: [f64; 3],
    pub on_ground: bool,
}

impl Packet for EntityRelativeMovePacket {
    fn packet_id() -> i32 {
        0x26
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(EntityRelativeMovePacket {
            entity_id: buffer.read_varint()?,
            delta: read_delta(buffer)?,
            on_ground: buffer.read_bool()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(self.entity_id);
        for axis in self.delta {
            buffer.write_i16((axis * RELATIVE_MOVE_SCALE) as i16);
        }
        buffer.write_bool(self.on_ground);
        Ok(())
    }
}

/// Entity Look And Relative Move
#[derive(Debug, Clone)]
pub struct EntityLookAndRelativeMovePacket {
    pub entity_id: i32,
    pub delta: [f64; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Packet for EntityLookAndRelativeMovePacket {
    fn packet_id() -> i32 {
        0x27
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(EntityLookAndRelativeMovePacket {
            entity_id: buffer.read_varint()?,
            delta: read_delta(buffer)?,
            yaw: buffer.read_angle()?,
            pitch: buffer.read_angle()?,
            on_ground: buffer.read_bool()?,
        })
    }
}

/// Entity Look
#[derive(Debug, Clone)]
pub struct EntityLookPacket {
    pub entity_id: i32,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Packet for EntityLookPacket {
    fn packet_id() -> i32 {
        0x28
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(EntityLookPacket {
            entity_id: buffer.read_varint()?,
            yaw: buffer.read_angle()?,
            pitch: buffer.read_angle()?,
            on_ground: buffer.read_bool()?,
        })
    }
}

/// Destroy Entities
#[derive(Debug, Clone)]
pub struct DestroyEntitiesPacket {
    pub entity_ids: Vec<i32>,
}

impl Packet for DestroyEntitiesPacket {
    fn packet_id() -> i32 {
        0x32
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        let count = buffer.read_varint()?;
        if count < 0 || count as usize > buffer.remaining() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid entity count {}", count),
            ));
        }
        let entity_ids = (0..count)
            .map(|_| buffer.read_varint())
            .collect::<io::Result<Vec<_>>>()?;
        Ok(DestroyEntitiesPacket { entity_ids })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(self.entity_ids.len() as i32);
        for id in &self.entity_ids {
            buffer.write_varint(*id);
        }
        Ok(())
    }
}

/// Entity Head Look
#[derive(Debug, Clone)]
pub struct EntityHeadLookPacket {
    pub entity_id: i32,
    pub head_yaw: f32,
}

impl Packet for EntityHeadLookPacket {
    fn packet_id() -> i32 {
        0x36
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(EntityHeadLookPacket {
            entity_id: buffer.read_varint()?,
            head_yaw: buffer.read_angle()?,
        })
    }
}

/// Entity Velocity
#[derive(Debug, Clone)]
pub struct EntityVelocityPacket {
    pub entity_id: i32,
    /// Blocks per tick
    pub velocity: [f64; 3],
}

impl Packet for EntityVelocityPacket {
    fn packet_id() -> i32 {
        0x3E
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(EntityVelocityPacket {
            entity_id: buffer.read_varint()?,
            velocity: read_velocity(buffer)?,
        })
    }
}

/// Entity Teleport
#[derive(Debug, Clone)]
pub struct EntityTeleportPacket {
    pub entity_id: i32,
    pub position: [f64; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Packet for EntityTeleportPacket {
    fn packet_id() -> i32 {
        0x4C
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(EntityTeleportPacket {
            entity_id: buffer.read_varint()?,
            position: read_position(buffer)?,
            yaw: buffer.read_angle()?,
            pitch: buffer.read_angle()?,
            on_ground: buffer.read_bool()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packet::RawPacket;

    #[test]
    fn test_relative_move_scale() {
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_varint(12);
        buffer.write_i16(4096);
        buffer.write_i16(-2048);
        buffer.write_i16(1024);
        buffer.write_bool(true);

        let packet: EntityRelativeMovePacket = RawPacket::new(0x26, buffer.into_inner()).decode().unwrap();
        assert_eq!(packet.entity_id, 12);
        assert_eq!(packet.delta, [1.0, -0.5, 0.25]);
        assert!(packet.on_ground);
    }

    #[test]
    fn test_velocity_scale() {
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_varint(3);
        buffer.write_i16(8000);
        buffer.write_i16(-4000);
        buffer.write_i16(0);

        let packet: EntityVelocityPacket = RawPacket::new(0x3E, buffer.into_inner()).decode().unwrap();
        assert_eq!(packet.velocity, [1.0, -0.5, 0.0]);
    }

    #[test]
    fn test_destroy_reads_every_id() {
        let raw = RawPacket::from_packet(&DestroyEntitiesPacket {
            entity_ids: vec![1, 300, 70000],
        })
        .unwrap();
        let packet: DestroyEntitiesPacket = raw.decode().unwrap();
        assert_eq!(packet.entity_ids, vec![1, 300, 70000]);
    }

    #[test]
    fn test_spawn_player_angles() {
        let packet = SpawnPlayerPacket {
            entity_id: 5,
            uuid: Uuid::nil(),
            position: [0.5, 64.0, -3.5],
            yaw: 90.0,
            pitch: -45.0,
        };
        let decoded: SpawnPlayerPacket = RawPacket::from_packet(&packet).unwrap().decode().unwrap();
        assert_eq!(decoded.position, [0.5, 64.0, -3.5]);
        assert_eq!(decoded.yaw, 90.0);
        // -45 degrees wraps around to 315
        assert_eq!(decoded.pitch, 315.0);
    }
}
