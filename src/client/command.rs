use crate::protocol::packet::BlockPos;
use crate::world::chunk::BlockState;
use crate::world::entity::Entity;
use crate::world::player::{Player, PlayerInfo};
use tokio::sync::oneshot;

/// Requests the control loop serves on behalf of a [`super::ClientHandle`]. Queries carry a
/// reply channel, state changes do not.
#[derive(Debug)]
pub enum Command {
    BlockAt {
        position: BlockPos,
        reply: oneshot::Sender<Option<BlockState>>,
    },
    Player(oneshot::Sender<Player>),
    PlayerInfo(oneshot::Sender<PlayerInfo>),
    Entity {
        id: i32,
        reply: oneshot::Sender<Option<Entity>>,
    },
    ClosestEntity {
        radius: f64,
        reply: oneshot::Sender<Option<Entity>>,
    },
    SetPosition {
        position: [f64; 3],
        on_ground: bool,
    },
    Look {
        yaw: f32,
        pitch: f32,
    },
    LookAt([f64; 3]),
    /// Hotbar slot 0 to 8
    SelectSlot(i8),
    Respawn,
    Disconnect,
}
