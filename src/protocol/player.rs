use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use std::io;

/// Update Health (clientbound)
#[derive(Debug, Clone)]
pub struct UpdateHealthPacket {
    /// 0 or less means dead, 20 is full
    pub health: f32,
    pub food: i32,
    pub food_saturation: f32,
}

impl Packet for UpdateHealthPacket {
    fn packet_id() -> i32 {
        0x41
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(UpdateHealthPacket {
            health: buffer.read_f32()?,
            food: buffer.read_varint()?,
            food_saturation: buffer.read_f32()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_f32(self.health);
        buffer.write_varint(self.food);
        buffer.write_f32(self.food_saturation);
        Ok(())
    }
}

/// Player Abilities (clientbound)
#[derive(Debug, Clone)]
pub struct PlayerAbilitiesPacket {
    pub flags: i8,
    pub flying_speed: f32,
    pub field_of_view_modifier: f32,
}

impl PlayerAbilitiesPacket {
    pub const INVULNERABLE: i8 = 0x01;
    pub const FLYING: i8 = 0x02;
    pub const ALLOW_FLYING: i8 = 0x04;
    pub const CREATIVE_MODE: i8 = 0x08;
}

impl Packet for PlayerAbilitiesPacket {
    fn packet_id() -> i32 {
        0x2C
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(PlayerAbilitiesPacket {
            flags: buffer.read_i8()?,
            flying_speed: buffer.read_f32()?,
            field_of_view_modifier: buffer.read_f32()?,
        })
    }
}

/// Disconnect (play). The reason is a JSON chat component.
#[derive(Debug, Clone)]
pub struct DisconnectPacket {
    pub reason: String,
}

impl Packet for DisconnectPacket {
    fn packet_id() -> i32 {
        0x1A
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(DisconnectPacket {
            reason: buffer.read_string()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_string(&self.reason);
        Ok(())
    }
}

/// Title (clientbound)
#[derive(Debug, Clone, PartialEq)]
pub enum TitlePacket {
    SetTitle(String),
    SetSubtitle(String),
    SetActionBar(String),
    SetTimes {
        fade_in: i32,
        stay: i32,
        fade_out: i32,
    },
    Hide,
    Reset,
}

impl Packet for TitlePacket {
    fn packet_id() -> i32 {
        0x48
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(match buffer.read_varint()? {
            0 => TitlePacket::SetTitle(buffer.read_string()?),
            1 => TitlePacket::SetSubtitle(buffer.read_string()?),
            2 => TitlePacket::SetActionBar(buffer.read_string()?),
            3 => TitlePacket::SetTimes {
                fade_in: buffer.read_i32()?,
                stay: buffer.read_i32()?,
                fade_out: buffer.read_i32()?,
            },
            4 => TitlePacket::Hide,
            5 => TitlePacket::Reset,
            action => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Unknown title action {}", action),
                ))
            }
        })
    }
}

/// Sound Effect (clientbound)
#[derive(Debug, Clone)]
pub struct SoundEffectPacket {
    pub sound_id: i32,
    pub category: i32,
    /// Block coordinates, sent as fixed-point with 3 fractional bits
    pub position: [f64; 3],
    pub volume: f32,
    pub pitch: f32,
}

impl Packet for SoundEffectPacket {
    fn packet_id() -> i32 {
        0x49
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(SoundEffectPacket {
            sound_id: buffer.read_varint()?,
            category: buffer.read_varint()?,
            position: [
                buffer.read_i32()? as f64 / 8.0,
                buffer.read_i32()? as f64 / 8.0,
                buffer.read_i32()? as f64 / 8.0,
            ],
            volume: buffer.read_f32()?,
            pitch: buffer.read_f32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packet::RawPacket;

    #[test]
    fn test_title_actions() {
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_varint(3);
        buffer.write_i32(10);
        buffer.write_i32(70);
        buffer.write_i32(20);
        let packet: TitlePacket = RawPacket::new(0x48, buffer.into_inner()).decode().unwrap();
        assert_eq!(
            packet,
            TitlePacket::SetTimes {
                fade_in: 10,
                stay: 70,
                fade_out: 20
            }
        );

        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_varint(9);
        assert!(RawPacket::new(0x48, buffer.into_inner())
            .decode::<TitlePacket>()
            .is_err());
    }

    #[test]
    fn test_sound_position_fixed_point() {
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_varint(42);
        buffer.write_varint(0);
        buffer.write_i32(8);
        buffer.write_i32(-4);
        buffer.write_i32(100);
        buffer.write_f32(1.0);
        buffer.write_f32(0.5);
        let packet: SoundEffectPacket = RawPacket::new(0x49, buffer.into_inner()).decode().unwrap();
        assert_eq!(packet.position, [1.0, -0.5, 12.5]);
    }
}
