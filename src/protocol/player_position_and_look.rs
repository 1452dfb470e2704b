use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use std::io;

/// Player Position And Look (clientbound)
/// Moves the player. Every field is either absolute or relative to the current value, as
/// selected by its own bit in `flags`.
#[derive(Debug, Clone)]
pub struct PlayerPositionAndLook {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Rotation on the Y axis, in degrees
    pub yaw: f32,
    /// Rotation on the X axis, in degrees
    pub pitch: f32,
    /// Bit field for relative/absolute positions and rotations
    pub flags: u8,
    /// Teleport ID for client confirmation
    pub teleport_id: i32,
}

impl Packet for PlayerPositionAndLook {
    fn packet_id() -> i32
    where
        Self: Sized,
    {
        0x2F
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(PlayerPositionAndLook {
            x: buffer.read_f64()?,
            y: buffer.read_f64()?,
            z: buffer.read_f64()?,
            yaw: buffer.read_f32()?,
            pitch: buffer.read_f32()?,
            flags: buffer.read_u8()?,
            teleport_id: buffer.read_varint()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_f64(self.x);
        buffer.write_f64(self.y);
        buffer.write_f64(self.z);
        buffer.write_f32(self.yaw);
        buffer.write_f32(self.pitch);
        buffer.write_u8(self.flags);
        buffer.write_varint(self.teleport_id);
        Ok(())
    }
}

impl PlayerPositionAndLook {
    /// Flag constants for the flags field
    pub const RELATIVE_X: u8 = 0x01;
    pub const RELATIVE_Y: u8 = 0x02;
    pub const RELATIVE_Z: u8 = 0x04;
    pub const RELATIVE_Y_ROT: u8 = 0x08;
    pub const RELATIVE_X_ROT: u8 = 0x10;

    /// Applies the packet to the current position and rotation, returning the new ones.
    pub fn apply(&self, position: [f64; 3], yaw: f32, pitch: f32) -> ([f64; 3], f32, f32) {
        let relative = |flag: u8| self.flags & flag != 0;
        let pick = |flag: u8, current: f64, value: f64| {
            if relative(flag) {
                current + value
            } else {
                value
            }
        };

        let position = [
            pick(Self::RELATIVE_X, position[0], self.x),
            pick(Self::RELATIVE_Y, position[1], self.y),
            pick(Self::RELATIVE_Z, position[2], self.z),
        ];
        let yaw = pick(Self::RELATIVE_Y_ROT, yaw as f64, self.yaw as f64) as f32;
        let pitch = pick(Self::RELATIVE_X_ROT, pitch as f64, self.pitch as f64) as f32;
        (position, yaw, pitch)
    }
}

/// Teleport Confirm (serverbound)
#[derive(Debug)]
pub struct TeleportConfirmPacket {
    pub teleport_id: i32,
}

impl Packet for TeleportConfirmPacket {
    fn packet_id() -> i32 {
        0x00
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(TeleportConfirmPacket {
            teleport_id: buffer.read_varint()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(self.teleport_id);
        Ok(())
    }
}

/// Player (serverbound), only the on-ground state.
#[derive(Debug)]
pub struct PlayerOnGroundPacket {
    pub on_ground: bool,
}

impl Packet for PlayerOnGroundPacket {
    fn packet_id() -> i32 {
        0x0C
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_bool(self.on_ground);
        Ok(())
    }
}

/// Player Position (serverbound). `y` is the feet position.
#[derive(Debug)]
pub struct PlayerPositionPacket {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub on_ground: bool,
}

impl Packet for PlayerPositionPacket {
    fn packet_id() -> i32 {
        0x0D
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_f64(self.x);
        buffer.write_f64(self.y);
        buffer.write_f64(self.z);
        buffer.write_bool(self.on_ground);
        Ok(())
    }
}

/// Player Position And Look (serverbound)
#[derive(Debug)]
pub struct PlayerPositionAndLookUpdate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Packet for PlayerPositionAndLookUpdate {
    fn packet_id() -> i32 {
        0x0E
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(PlayerPositionAndLookUpdate {
            x: buffer.read_f64()?,
            y: buffer.read_f64()?,
            z: buffer.read_f64()?,
            yaw: buffer.read_f32()?,
            pitch: buffer.read_f32()?,
            on_ground: buffer.read_bool()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_f64(self.x);
        buffer.write_f64(self.y);
        buffer.write_f64(self.z);
        buffer.write_f32(self.yaw);
        buffer.write_f32(self.pitch);
        buffer.write_bool(self.on_ground);
        Ok(())
    }
}

/// Player Look (serverbound)
#[derive(Debug)]
pub struct PlayerLookPacket {
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Packet for PlayerLookPacket {
    fn packet_id() -> i32 {
        0x0F
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_f32(self.yaw);
        buffer.write_f32(self.pitch);
        buffer.write_bool(self.on_ground);
        Ok(())
    }
}
