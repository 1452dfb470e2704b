use crate::protocol::packet::BlockPos;
use crate::protocol::player::TitlePacket;
use crate::world::chunk::BlockState;
use crate::world::player::PlayerInfo;
use crate::world::{ChunkPos, WorldTime};

/// Something the caller may want to react to. Delivered in the order the packets arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    JoinGame(PlayerInfo),
    Respawn(PlayerInfo),
    /// Raw chat JSON. Position 0 chat, 1 system, 2 action bar.
    Chat { json: String, position: u8 },
    Title(TitlePacket),
    BlockChange {
        position: BlockPos,
        previous: Option<BlockState>,
        state: BlockState,
    },
    ChunkLoaded(ChunkPos),
    ChunkUnloaded(ChunkPos),
    EntitySpawned(i32),
    EntityDestroyed(i32),
    HealthChanged {
        health: f32,
        food: i32,
        food_saturation: f32,
    },
    Death,
    /// The server moved the local player.
    Teleport {
        position: [f64; 3],
        yaw: f32,
        pitch: f32,
    },
    HeldItemChanged(i8),
    Sound {
        sound_id: i32,
        category: i32,
        position: [f64; 3],
        volume: f32,
        pitch: f32,
    },
    TimeUpdate(WorldTime),
    /// Play-phase disconnect with the raw reason JSON. Always the last event.
    Disconnected(String),
}
