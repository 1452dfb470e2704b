use crate::protocol::packet::BlockPos;
use uuid::Uuid;

/// Facts from Join Game and Respawn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerInfo {
    pub entity_id: i32,
    pub game_mode: u8,
    pub hardcore: bool,
    pub dimension: i32,
    pub difficulty: u8,
    pub level_type: String,
    pub reduced_debug_info: bool,
    pub spawn_position: Option<BlockPos>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerAbilities {
    pub invulnerable: bool,
    pub flying: bool,
    pub allow_flying: bool,
    pub creative_mode: bool,
    pub flying_speed: f32,
    pub field_of_view_modifier: f32,
}

/// The local player.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub uuid: Uuid,
    pub name: String,
    pub position: [f64; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
    pub health: f32,
    pub food: i32,
    pub food_saturation: f32,
    pub held_slot: i8,
    pub abilities: PlayerAbilities,
}

impl Player {
    pub fn new(uuid: Uuid, name: String) -> Self {
        Self {
            uuid,
            name,
            position: [0.0; 3],
            yaw: 0.0,
            pitch: 0.0,
            on_ground: false,
            health: 20.0,
            food: 20,
            food_saturation: 5.0,
            held_slot: 0,
            abilities: PlayerAbilities::default(),
        }
    }

    /// Eye position, 1.62 blocks above the feet.
    pub fn eye_position(&self) -> [f64; 3] {
        [self.position[0], self.position[1] + 1.62, self.position[2]]
    }

    /// Yaw and pitch in degrees that make the player look at `target`.
    pub fn rotation_towards(&self, target: [f64; 3]) -> (f32, f32) {
        let eye = self.eye_position();
        let dx = target[0] - eye[0];
        let dy = target[1] - eye[1];
        let dz = target[2] - eye[2];
        let horizontal = (dx * dx + dz * dz).sqrt();

        let yaw = (-dx).atan2(dz).to_degrees();
        let pitch = (-dy).atan2(horizontal).to_degrees();
        (yaw as f32, pitch as f32)
    }
}
