//! Play-phase state owned by the control loop, and the clientbound packet table that updates it.

use super::command::Command;
use super::event::Event;
use crate::config::{ClientConfig, Settings};
use crate::error::{ClientError, Result};
use crate::logger::{log, LogSeverity};
use crate::protocol::block_change::*;
use crate::protocol::chat::ChatMessagePacket;
use crate::protocol::chunk_data::ChunkDataPacket;
use crate::protocol::entity::*;
use crate::protocol::held_item_change::{HeldItemChangePacket, SelectSlotPacket};
use crate::protocol::interaction::ClientStatusPacket;
use crate::protocol::join_game::{JoinGamePacket, RespawnPacket, ServerDifficultyPacket};
use crate::protocol::keep_alive::{KeepAlivePacket, KeepAliveResponsePacket};
use crate::protocol::packet::{BlockPos, Packet, RawPacket};
use crate::protocol::player::*;
use crate::protocol::player_position_and_look::*;
use crate::world::chunk::{BlockState, ChunkUpdate};
use crate::world::entity::{Entity, EntityKind};
use crate::world::player::{Player, PlayerAbilities, PlayerInfo};
use crate::world::{ChunkPos, World, WorldTime};
use std::io;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;
use LogSeverity::*;

/// Idle ticks between two Player (on ground) packets when nothing moved.
const IDLE_UPDATE_TICKS: u64 = 20;

/// What the server last heard about our position.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SentPosition {
    position: [f64; 3],
    yaw: f32,
    pitch: f32,
    on_ground: bool,
}

pub(crate) struct ClientState {
    pub(crate) player: Player,
    pub(crate) info: PlayerInfo,
    pub(crate) world: World,
    settings: Settings,
    auto_respawn: bool,
    dead: bool,
    /// Set by the first Player Position And Look, nothing is sent before it
    spawned: bool,
    last_sent: Option<SentPosition>,
    idle_ticks: u64,
    tick: u64,
    outbound: mpsc::UnboundedSender<RawPacket>,
    events: mpsc::Sender<Event>,
    ticks: watch::Sender<u64>,
}

impl ClientState {
    pub(crate) fn new(
        uuid: Uuid,
        name: String,
        config: &ClientConfig,
        outbound: mpsc::UnboundedSender<RawPacket>,
        events: mpsc::Sender<Event>,
        ticks: watch::Sender<u64>,
    ) -> Self {
        Self {
            player: Player::new(uuid, name),
            info: PlayerInfo::default(),
            world: World::new(true),
            settings: config.settings.clone(),
            auto_respawn: config.auto_respawn,
            dead: false,
            spawned: false,
            last_sent: None,
            idle_ticks: 0,
            tick: 0,
            outbound,
            events,
            ticks,
        }
    }

    fn send<P: Packet>(&self, packet: &P) -> Result<()> {
        let raw = RawPacket::from_packet(packet)?;
        self.outbound
            .send(raw)
            .map_err(|_| ClientError::ClientStopped)
    }

    fn emit(&self, event: Event) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                log(format!("Event queue full, dropping {:?}", event), Warning)
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Handles one inbound packet. Decode errors are logged and swallowed, only fatal errors are
    /// returned.
    pub(crate) fn dispatch(&mut self, packet: RawPacket) -> Result<()> {
        match self.handle_packet(&packet) {
            Err(e) if !e.is_fatal() => {
                log(e.to_string(), Warning);
                Ok(())
            }
            result => result,
        }
    }

    fn handle_packet(&mut self, packet: &RawPacket) -> Result<()> {
        match packet.id() {
            // Spawn Object
            0x00 => {
                let spawn: SpawnObjectPacket = decode(packet)?;
                let mut entity = Entity::new(
                    spawn.entity_id,
                    spawn.uuid,
                    EntityKind::Object(spawn.kind),
                    spawn.position,
                );
                entity.yaw = spawn.yaw;
                entity.pitch = spawn.pitch;
                entity.velocity = spawn.velocity;
                self.spawn_entity(entity);
            }
            // Spawn Mob
            0x03 => {
                let spawn: SpawnMobPacket = decode(packet)?;
                let mut entity = Entity::new(
                    spawn.entity_id,
                    spawn.uuid,
                    EntityKind::Mob(spawn.kind),
                    spawn.position,
                );
                entity.yaw = spawn.yaw;
                entity.pitch = spawn.pitch;
                entity.head_yaw = spawn.yaw;
                entity.velocity = spawn.velocity;
                self.spawn_entity(entity);
            }
            // Spawn Player
            0x05 => {
                let spawn: SpawnPlayerPacket = decode(packet)?;
                let mut entity = Entity::new(
                    spawn.entity_id,
                    spawn.uuid,
                    EntityKind::Player,
                    spawn.position,
                );
                entity.yaw = spawn.yaw;
                entity.pitch = spawn.pitch;
                entity.head_yaw = spawn.yaw;
                self.spawn_entity(entity);
            }
            // Block Change
            0x0B => {
                let change: BlockChangePacket = decode(packet)?;
                self.change_block(change.position, change.block_id)
                    .map_err(|e| ClientError::decode(packet.id(), e))?;
            }
            // Server Difficulty
            0x0D => {
                let difficulty: ServerDifficultyPacket = decode(packet)?;
                self.info.difficulty = difficulty.difficulty;
            }
            // Chat Message
            0x0F => {
                let chat: ChatMessagePacket = decode(packet)?;
                self.emit(Event::Chat {
                    json: chat.json,
                    position: chat.position,
                });
            }
            // Multi Block Change
            0x10 => {
                let change: MultiBlockChangePacket = decode(packet)?;
                for record in &change.records {
                    let position = record.world_position(change.chunk_x, change.chunk_z);
                    // One bad record does not void the rest of the batch.
                    if let Err(e) = self.change_block(position, record.block_id) {
                        log(ClientError::decode(packet.id(), e).to_string(), Warning);
                    }
                }
            }
            // Disconnect
            0x1A => {
                let disconnect: DisconnectPacket = decode(packet)?;
                log(format!("Disconnected: {}", disconnect.reason), Info);
                self.emit(Event::Disconnected(disconnect.reason.clone()));
                return Err(ClientError::Disconnected(disconnect.reason));
            }
            // Unload Chunk
            0x1D => {
                let unload: UnloadChunkPacket = decode(packet)?;
                let pos = ChunkPos::new(unload.chunk_x, unload.chunk_z);
                if self.world.unload_chunk(pos).is_some() {
                    self.emit(Event::ChunkUnloaded(pos));
                }
            }
            // Keep Alive
            0x1F => {
                let keep_alive: KeepAlivePacket = decode(packet)?;
                self.send(&KeepAliveResponsePacket::new(keep_alive.keep_alive_id))?;
            }
            // Chunk Data
            0x20 => {
                let chunk: ChunkDataPacket = decode(packet)?;
                let update = ChunkUpdate::decode(&chunk, self.world.has_sky_light)
                    .map_err(|e| ClientError::decode(packet.id(), e))?;
                let pos = ChunkPos::new(chunk.chunk_x, chunk.chunk_z);
                self.world.apply_chunk(pos, update);
                self.emit(Event::ChunkLoaded(pos));
            }
            // Join Game
            0x23 => {
                let join: JoinGamePacket = decode(packet)?;
                self.info = PlayerInfo {
                    entity_id: join.entity_id,
                    game_mode: join.game_mode(),
                    hardcore: join.is_hardcore(),
                    dimension: join.dimension,
                    difficulty: join.difficulty,
                    level_type: join.level_type,
                    reduced_debug_info: join.reduced_debug_info,
                    spawn_position: None,
                };
                self.world.reset(join.dimension == 0);
                self.send(&self.settings.to_packet())?;
                log(
                    format!(
                        "Joined game as entity {} in dimension {}",
                        self.info.entity_id, self.info.dimension
                    ),
                    Info,
                );
                self.emit(Event::JoinGame(self.info.clone()));
            }
            // Entity Relative Move
            0x26 => {
                let movement: EntityRelativeMovePacket = decode(packet)?;
                self.world
                    .move_entity(movement.entity_id, movement.delta, movement.on_ground);
            }
            // Entity Look And Relative Move
            0x27 => {
                let movement: EntityLookAndRelativeMovePacket = decode(packet)?;
                if self
                    .world
                    .move_entity(movement.entity_id, movement.delta, movement.on_ground)
                {
                    if let Some(entity) = self.world.entity_mut(movement.entity_id) {
                        entity.yaw = movement.yaw;
                        entity.pitch = movement.pitch;
                    }
                }
            }
            // Entity Look
            0x28 => {
                let look: EntityLookPacket = decode(packet)?;
                if let Some(entity) = self.world.entity_mut(look.entity_id) {
                    entity.yaw = look.yaw;
                    entity.pitch = look.pitch;
                    entity.on_ground = look.on_ground;
                }
            }
            // Player Abilities
            0x2C => {
                let abilities: PlayerAbilitiesPacket = decode(packet)?;
                let flag = |bit: i8| abilities.flags & bit != 0;
                self.player.abilities = PlayerAbilities {
                    invulnerable: flag(PlayerAbilitiesPacket::INVULNERABLE),
                    flying: flag(PlayerAbilitiesPacket::FLYING),
                    allow_flying: flag(PlayerAbilitiesPacket::ALLOW_FLYING),
                    creative_mode: flag(PlayerAbilitiesPacket::CREATIVE_MODE),
                    flying_speed: abilities.flying_speed,
                    field_of_view_modifier: abilities.field_of_view_modifier,
                };
            }
            // Player Position And Look
            0x2F => {
                let teleport: PlayerPositionAndLook = decode(packet)?;
                self.teleport(&teleport)?;
            }
            // Destroy Entities
            0x32 => {
                let destroy: DestroyEntitiesPacket = decode(packet)?;
                for id in destroy.entity_ids {
                    if self.world.destroy_entity(id).is_some() {
                        self.emit(Event::EntityDestroyed(id));
                    }
                }
            }
            // Respawn
            0x35 => {
                let respawn: RespawnPacket = decode(packet)?;
                if respawn.dimension != self.info.dimension {
                    self.world.reset(respawn.dimension == 0);
                }
                self.info.dimension = respawn.dimension;
                self.info.difficulty = respawn.difficulty;
                self.info.game_mode = respawn.gamemode & 0x07;
                self.info.level_type = respawn.level_type;
                self.emit(Event::Respawn(self.info.clone()));
            }
            // Entity Head Look
            0x36 => {
                let look: EntityHeadLookPacket = decode(packet)?;
                if let Some(entity) = self.world.entity_mut(look.entity_id) {
                    entity.head_yaw = look.head_yaw;
                }
            }
            // Held Item Change
            0x3A => {
                let held: HeldItemChangePacket = decode(packet)?;
                self.player.held_slot = held.slot;
                self.emit(Event::HeldItemChanged(held.slot));
            }
            // Entity Velocity
            0x3E => {
                let velocity: EntityVelocityPacket = decode(packet)?;
                if let Some(entity) = self.world.entity_mut(velocity.entity_id) {
                    entity.velocity = velocity.velocity;
                }
            }
            // Update Health
            0x41 => {
                let health: UpdateHealthPacket = decode(packet)?;
                self.update_health(health)?;
            }
            // Spawn Position
            0x46 => {
                let spawn: SpawnPositionPacket = decode(packet)?;
                self.info.spawn_position = Some(spawn.position);
            }
            // Time Update
            0x47 => {
                let time: TimeUpdatePacket = decode(packet)?;
                self.world.time = WorldTime {
                    world_age: time.world_age,
                    time_of_day: time.time_of_day,
                };
                self.emit(Event::TimeUpdate(self.world.time));
            }
            // Title
            0x48 => {
                let title: TitlePacket = decode(packet)?;
                self.emit(Event::Title(title));
            }
            // Sound Effect
            0x49 => {
                let sound: SoundEffectPacket = decode(packet)?;
                self.emit(Event::Sound {
                    sound_id: sound.sound_id,
                    category: sound.category,
                    position: sound.position,
                    volume: sound.volume,
                    pitch: sound.pitch,
                });
            }
            // Entity Teleport
            0x4C => {
                let teleport: EntityTeleportPacket = decode(packet)?;
                if let Some(entity) = self.world.entity_mut(teleport.entity_id) {
                    entity.position = teleport.position;
                    entity.yaw = teleport.yaw;
                    entity.pitch = teleport.pitch;
                    entity.on_ground = teleport.on_ground;
                }
            }
            id => log(format!("Ignoring packet 0x{:02x}", id), Debug),
        }
        Ok(())
    }

    fn spawn_entity(&mut self, entity: Entity) {
        let id = entity.id;
        self.world.create_entity(entity);
        self.emit(Event::EntitySpawned(id));
    }

    fn change_block(&mut self, position: BlockPos, block_id: i32) -> io::Result<()> {
        let id = u32::try_from(block_id).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Negative block state id {}", block_id),
            )
        })?;
        let state = BlockState(id);
        let previous = self.world.set_block(position, state)?;
        self.emit(Event::BlockChange {
            position,
            previous,
            state,
        });
        Ok(())
    }

    fn teleport(&mut self, teleport: &PlayerPositionAndLook) -> Result<()> {
        let (position, yaw, pitch) =
            teleport.apply(self.player.position, self.player.yaw, self.player.pitch);
        self.player.position = position;
        self.player.yaw = yaw;
        self.player.pitch = pitch;

        self.send(&TeleportConfirmPacket {
            teleport_id: teleport.teleport_id,
        })?;
        let sent = SentPosition {
            position,
            yaw,
            pitch,
            on_ground: self.player.on_ground,
        };
        self.send_position(sent)?;
        self.spawned = true;

        self.emit(Event::Teleport {
            position,
            yaw,
            pitch,
        });
        Ok(())
    }

    fn update_health(&mut self, health: UpdateHealthPacket) -> Result<()> {
        self.player.health = health.health;
        self.player.food = health.food;
        self.player.food_saturation = health.food_saturation;
        self.emit(Event::HealthChanged {
            health: health.health,
            food: health.food,
            food_saturation: health.food_saturation,
        });

        if health.health > 0.0 {
            self.dead = false;
        } else if !self.dead {
            self.dead = true;
            self.emit(Event::Death);
            if self.auto_respawn {
                log("Died, respawning".to_owned(), Info);
                self.send(&ClientStatusPacket::PerformRespawn)?;
            }
        }
        Ok(())
    }

    fn send_position(&mut self, sent: SentPosition) -> Result<()> {
        self.send(&PlayerPositionAndLookUpdate {
            x: sent.position[0],
            y: sent.position[1],
            z: sent.position[2],
            yaw: sent.yaw,
            pitch: sent.pitch,
            on_ground: sent.on_ground,
        })?;
        self.last_sent = Some(sent);
        self.idle_ticks = 0;
        Ok(())
    }

    /// Serves a caller request. Returns false when the caller asked to disconnect.
    pub(crate) fn handle_command(&mut self, command: Command) -> Result<bool> {
        // Reply errors only mean the caller stopped waiting.
        match command {
            Command::BlockAt { position, reply } => {
                let _ = reply.send(self.world.block(position));
            }
            Command::Player(reply) => {
                let _ = reply.send(self.player.clone());
            }
            Command::PlayerInfo(reply) => {
                let _ = reply.send(self.info.clone());
            }
            Command::Entity { id, reply } => {
                let _ = reply.send(self.world.entity(id).cloned());
            }
            Command::ClosestEntity { radius, reply } => {
                let closest = self
                    .world
                    .closest_entity(self.player.position, radius, self.info.entity_id)
                    .cloned();
                let _ = reply.send(closest);
            }
            Command::SetPosition {
                position,
                on_ground,
            } => {
                self.player.position = position;
                self.player.on_ground = on_ground;
            }
            Command::Look { yaw, pitch } => {
                self.player.yaw = yaw;
                self.player.pitch = pitch;
            }
            Command::LookAt(target) => {
                let (yaw, pitch) = self.player.rotation_towards(target);
                self.player.yaw = yaw;
                self.player.pitch = pitch;
            }
            Command::SelectSlot(slot) => {
                self.send(&SelectSlotPacket::new(slot as i16))?;
                self.player.held_slot = slot;
            }
            Command::Respawn => {
                self.send(&ClientStatusPacket::PerformRespawn)?;
            }
            Command::Disconnect => {
                log("Disconnect requested".to_owned(), Info);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Advances the tick counter and tells the server where we are.
    pub(crate) fn tick(&mut self) -> Result<()> {
        self.tick += 1;
        self.ticks.send_replace(self.tick);
        if !self.spawned {
            return Ok(());
        }

        let current = SentPosition {
            position: self.player.position,
            yaw: self.player.yaw,
            pitch: self.player.pitch,
            on_ground: self.player.on_ground,
        };
        let Some(last) = self.last_sent else {
            return self.send_position(current);
        };

        let moved = current.position != last.position;
        let turned = current.yaw != last.yaw || current.pitch != last.pitch;
        match (moved, turned) {
            (true, true) => return self.send_position(current),
            (true, false) => self.send(&PlayerPositionPacket {
                x: current.position[0],
                y: current.position[1],
                z: current.position[2],
                on_ground: current.on_ground,
            })?,
            (false, true) => self.send(&PlayerLookPacket {
                yaw: current.yaw,
                pitch: current.pitch,
                on_ground: current.on_ground,
            })?,
            (false, false) => {
                self.idle_ticks += 1;
                if self.idle_ticks < IDLE_UPDATE_TICKS && current.on_ground == last.on_ground {
                    return Ok(());
                }
                self.send(&PlayerOnGroundPacket {
                    on_ground: current.on_ground,
                })?;
            }
        }
        self.last_sent = Some(current);
        self.idle_ticks = 0;
        Ok(())
    }
}

fn decode<P: Packet>(packet: &RawPacket) -> Result<P> {
    packet
        .decode()
        .map_err(|e| ClientError::decode(packet.id(), e))
}
