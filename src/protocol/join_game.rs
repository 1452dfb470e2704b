use super::packet::*;
use std::io::Result;

/// Join Game (clientbound)
#[derive(Debug, Clone)]
pub struct JoinGamePacket {
    pub entity_id: i32,
    /// Bits 0-2 are the game mode, bit 3 is the hardcore flag
    pub gamemode: u8,
    /// -1 nether, 0 overworld, 1 end
    pub dimension: i32,
    pub difficulty: u8,
    /// Ignored by the client
    pub max_players: u8,
    pub level_type: String,
    pub reduced_debug_info: bool,
}

impl JoinGamePacket {
    pub fn game_mode(&self) -> u8 {
        self.gamemode & 0x07
    }

    pub fn is_hardcore(&self) -> bool {
        self.gamemode & 0x08 != 0
    }
}

impl Packet for JoinGamePacket {
    fn packet_id() -> i32 {
        0x23
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> Result<Self> {
        Ok(JoinGamePacket {
            entity_id: buffer.read_i32()?,
            gamemode: buffer.read_u8()?,
            dimension: buffer.read_i32()?,
            difficulty: buffer.read_u8()?,
            max_players: buffer.read_u8()?,
            level_type: buffer.read_string_max(16)?,
            reduced_debug_info: buffer.read_bool()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> Result<()> {
        buffer.write_i32(self.entity_id);
        buffer.write_u8(self.gamemode);
        buffer.write_i32(self.dimension);
        buffer.write_u8(self.difficulty);
        buffer.write_u8(self.max_players);
        buffer.write_string(&self.level_type);
        buffer.write_bool(self.reduced_debug_info);
        Ok(())
    }
}

/// Respawn (clientbound), sent after death and on dimension change.
#[derive(Debug, Clone)]
pub struct RespawnPacket {
    pub dimension: i32,
    pub difficulty: u8,
    pub gamemode: u8,
    pub level_type: String,
}

impl Packet for RespawnPacket {
    fn packet_id() -> i32 {
        0x35
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> Result<Self> {
        Ok(RespawnPacket {
            dimension: buffer.read_i32()?,
            difficulty: buffer.read_u8()?,
            gamemode: buffer.read_u8()?,
            level_type: buffer.read_string_max(16)?,
        })
    }
}

/// Server Difficulty (clientbound)
#[derive(Debug, Clone)]
pub struct ServerDifficultyPacket {
    pub difficulty: u8,
}

impl Packet for ServerDifficultyPacket {
    fn packet_id() -> i32 {
        0x0D
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> Result<Self> {
        Ok(ServerDifficultyPacket {
            difficulty: buffer.read_u8()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardcore_flag() {
        let packet = JoinGamePacket {
            entity_id: 7,
            gamemode: 0x08 | 0x01,
            dimension: 0,
            difficulty: 2,
            max_players: 20,
            level_type: "default".to_owned(),
            reduced_debug_info: false,
        };
        let decoded: JoinGamePacket = RawPacket::from_packet(&packet).unwrap().decode().unwrap();
        assert!(decoded.is_hardcore());
        assert_eq!(decoded.game_mode(), 1);
        assert_eq!(decoded.level_type, "default");
    }
}
