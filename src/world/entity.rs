use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Vehicles, items and projectiles, with their object type id
    Object(i8),
    /// Mobs, with their entity type id
    Mob(i32),
    Player,
}

/// An entity as tracked from spawn, movement and destroy packets.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: i32,
    pub uuid: Uuid,
    pub kind: EntityKind,
    pub position: [f64; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub head_yaw: f32,
    /// Blocks per tick
    pub velocity: [f64; 3],
    pub on_ground: bool,
}

impl Entity {
    pub fn new(id: i32, uuid: Uuid, kind: EntityKind, position: [f64; 3]) -> Self {
        Self {
            id,
            uuid,
            kind,
            position,
            yaw: 0.0,
            pitch: 0.0,
            head_yaw: 0.0,
            velocity: [0.0; 3],
            on_ground: false,
        }
    }

    pub fn distance_squared(&self, to: [f64; 3]) -> f64 {
        self.position
            .iter()
            .zip(to.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}
