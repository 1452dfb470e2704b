pub mod bit_storage;
pub mod chunk;
pub mod entity;
pub mod palette;
pub mod player;

use crate::protocol::packet::BlockPos;
use chunk::{BlockState, Chunk, ChunkUpdate, SECTION_SIZE};
use entity::Entity;
use std::collections::HashMap;
use std::io;

/// Column coordinates, block coordinates divided by 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn of(pos: BlockPos) -> Self {
        Self::new(pos.x >> 4, pos.z >> 4)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldTime {
    pub world_age: i64,
    pub time_of_day: i64,
}

/// Everything the client knows about the world around it. Owned by the control loop.
#[derive(Debug, Default)]
pub struct World {
    chunks: HashMap<ChunkPos, Chunk>,
    entities: HashMap<i32, Entity>,
    pub time: WorldTime,
    /// Only the overworld sends sky light
    pub has_sky_light: bool,
}

impl World {
    pub fn new(has_sky_light: bool) -> Self {
        Self {
            has_sky_light,
            ..Self::default()
        }
    }

    /// Drops all chunks and entities, as on respawn into another dimension.
    pub fn reset(&mut self, has_sky_light: bool) {
        self.chunks.clear();
        self.entities.clear();
        self.has_sky_light = has_sky_light;
    }

    pub fn apply_chunk(&mut self, pos: ChunkPos, update: ChunkUpdate) {
        self.chunks.entry(pos).or_default().apply(update);
    }

    pub fn unload_chunk(&mut self, pos: ChunkPos) -> Option<Chunk> {
        self.chunks.remove(&pos)
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Block at `pos`, or `None` when its column is not loaded.
    pub fn block(&self, pos: BlockPos) -> Option<BlockState> {
        let chunk = self.chunks.get(&ChunkPos::of(pos))?;
        if !(0..256).contains(&pos.y) {
            return Some(BlockState::AIR);
        }
        Some(chunk.get_block(local(pos.x), pos.y as usize, local(pos.z)))
    }

    /// Sets the block at `pos` and returns the previous one. Changes to unloaded columns are
    /// ignored and yield `None`.
    pub fn set_block(
        &mut self,
        pos: BlockPos,
        state: BlockState,
    ) -> io::Result<Option<BlockState>> {
        if !(0..256).contains(&pos.y) {
            return Ok(None);
        }
        let has_sky_light = self.has_sky_light;
        let Some(chunk) = self.chunks.get_mut(&ChunkPos::of(pos)) else {
            return Ok(None);
        };
        chunk
            .set_block(local(pos.x), pos.y as usize, local(pos.z), state, has_sky_light)
            .map(Some)
    }

    pub fn create_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    pub fn destroy_entity(&mut self, id: i32) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn entity(&self, id: i32) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: i32) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Moves an entity by `delta` blocks. Returns false if the entity is unknown.
    pub fn move_entity(&mut self, id: i32, delta: [f64; 3], on_ground: bool) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) => {
                for (axis, d) in entity.position.iter_mut().zip(delta) {
                    *axis += d;
                }
                entity.on_ground = on_ground;
                true
            }
            None => false,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Nearest entity to `from` within `radius` blocks, skipping `exclude`.
    pub fn closest_entity(&self, from: [f64; 3], radius: f64, exclude: i32) -> Option<&Entity> {
        self.entities
            .values()
            .filter(|entity| entity.id != exclude)
            .map(|entity| (entity.distance_squared(from), entity))
            .filter(|(distance, _)| *distance <= radius * radius)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, entity)| entity)
    }
}

fn local(coordinate: i32) -> usize {
    (coordinate & (SECTION_SIZE as i32 - 1)) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity::EntityKind;
    use uuid::Uuid;

    #[test]
    fn test_blocks_in_loaded_chunks_only() {
        let mut world = World::new(true);
        let pos = BlockPos::new(-1, 64, 17);
        assert_eq!(world.block(pos), None);
        assert_eq!(world.set_block(pos, BlockState(16)).unwrap(), None);

        world.apply_chunk(
            ChunkPos::of(pos),
            ChunkUpdate {
                ground_up_continuous: true,
                sections: Vec::new(),
                biomes: None,
            },
        );
        assert_eq!(ChunkPos::of(pos), ChunkPos::new(-1, 1));
        assert_eq!(world.block(pos), Some(BlockState::AIR));
        assert_eq!(world.set_block(pos, BlockState(16)).unwrap(), Some(BlockState::AIR));
        assert!(world.set_block(pos, BlockState(1 << 13)).is_err());
        assert_eq!(world.block(pos), Some(BlockState(16)));
        assert_eq!(world.block(BlockPos::new(-16, 64, 16)), Some(BlockState::AIR));

        world.unload_chunk(ChunkPos::new(-1, 1));
        assert_eq!(world.block(pos), None);
    }

    #[test]
    fn test_entities() {
        let mut world = World::new(true);
        world.create_entity(Entity::new(1, Uuid::nil(), EntityKind::Mob(50), [0.0, 64.0, 0.0]));
        world.create_entity(Entity::new(2, Uuid::nil(), EntityKind::Player, [10.0, 64.0, 0.0]));
        world.create_entity(Entity::new(3, Uuid::nil(), EntityKind::Object(2), [6.0, 64.0, 0.0]));

        assert!(world.move_entity(1, [0.5, 0.0, -0.25], true));
        assert_eq!(world.entity(1).unwrap().position, [0.5, 64.0, -0.25]);
        assert!(!world.move_entity(9, [1.0, 0.0, 0.0], false));

        let closest = world.closest_entity([9.0, 64.0, 0.0], 5.0, -1).unwrap();
        assert_eq!(closest.id, 2);
        let closest = world.closest_entity([9.0, 64.0, 0.0], 5.0, 2).unwrap();
        assert_eq!(closest.id, 3);
        assert!(world.closest_entity([100.0, 64.0, 0.0], 5.0, -1).is_none());

        assert!(world.destroy_entity(2).is_some());
        assert_eq!(world.entity_count(), 2);
        world.reset(false);
        assert_eq!(world.entity_count(), 0);
    }
}
