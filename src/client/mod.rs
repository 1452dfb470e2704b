//! Play-phase dispatch: a reader task and a writer task around a single control loop that owns
//! all client state.

pub mod command;
pub mod event;
mod handler;

pub use command::Command;
pub use event::Event;

use crate::auth::{Auth, SessionService};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::logger::{self, log, LogSeverity};
use crate::protocol::chat::{ChatPacket, MAX_CHAT_LEN};
use crate::protocol::codec::PacketCodec;
use crate::protocol::crypto::{CipherReader, CipherWriter};
use crate::protocol::handshake::NextState;
use crate::protocol::interaction::*;
use crate::protocol::login::LoginSuccessPacket;
use crate::protocol::packet::{BlockPos, Packet, RawPacket};
use crate::session::{Phase, Session};
use crate::world::chunk::BlockState;
use crate::world::entity::Entity;
use crate::world::player::{Player, PlayerInfo};
use futures::{SinkExt, StreamExt};
use handler::ClientState;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::codec::{FramedRead, FramedWrite};
use LogSeverity::*;

/// Decoded frames waiting for the control loop.
const INBOUND_CAPACITY: usize = 256;

/// A logged-in connection, ready to [`run`](Client::run).
pub struct Client<R, W> {
    reader: CipherReader<R>,
    writer: CipherWriter<W>,
    threshold: i32,
    state: ClientState,
    outbound: mpsc::UnboundedReceiver<RawPacket>,
    commands: mpsc::UnboundedReceiver<Command>,
    handle: ClientHandle,
    tick_interval: Duration,
}

impl Client<OwnedReadHalf, OwnedWriteHalf> {
    /// Connects and logs in. Returns the client and the stream of events it will produce.
    pub async fn join<S>(
        host: &str,
        port: u16,
        auth: &Auth,
        service: &S,
        config: ClientConfig,
    ) -> Result<(Self, mpsc::Receiver<Event>)>
    where
        S: SessionService + ?Sized,
    {
        logger::init(config.log_level);
        let mut session = Session::connect(host, port).await?;
        session
            .handshake(host, port, NextState::Login, config.protocol_version)
            .await?;
        let profile = session.login(auth, service).await?;
        Client::new(session, profile, &config)
    }
}

impl<R, W> Client<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Takes over a session that has finished logging in.
    pub fn new(
        session: Session<R, W>,
        profile: LoginSuccessPacket,
        config: &ClientConfig,
    ) -> Result<(Self, mpsc::Receiver<Event>)> {
        if session.phase() != Phase::Play {
            return Err(ClientError::InvalidPhase {
                from: session.phase(),
                to: Phase::Play,
            });
        }
        let (reader, writer, threshold) = session.into_parts();

        let (outbound_tx, outbound) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::channel(config.event_capacity.max(1));
        let (ticks_tx, ticks) = watch::channel(0);

        let handle = ClientHandle {
            outbound: outbound_tx.clone(),
            commands: commands_tx,
            ticks,
        };
        let state = ClientState::new(
            profile.uuid,
            profile.username,
            config,
            outbound_tx,
            events_tx,
            ticks_tx,
        );

        Ok((
            Client {
                reader,
                writer,
                threshold,
                state,
                outbound,
                commands,
                handle,
                tick_interval: config.tick_interval(),
            },
            events,
        ))
    }

    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Runs until the connection ends, the server disconnects us or a handle asks to
    /// disconnect. The event stream closes when this returns.
    pub async fn run(self) -> Result<()> {
        let Client {
            reader,
            writer,
            threshold,
            mut state,
            outbound,
            mut commands,
            handle,
            tick_interval,
        } = self;
        // Handles held by callers keep the command queue open, ours must not.
        drop(handle);

        let (errors_tx, mut errors) = mpsc::channel(2);
        let (inbound_tx, mut inbound) = mpsc::channel(INBOUND_CAPACITY);
        let reader_task = tokio::spawn(read_loop(reader, threshold, inbound_tx, errors_tx.clone()));
        let writer_task = tokio::spawn(write_loop(writer, threshold, outbound, errors_tx));

        let mut ticker = time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                packet = inbound.recv() => match packet {
                    Some(packet) => {
                        if let Err(e) = state.dispatch(packet) {
                            break Err(e);
                        }
                    }
                    None => break Err(errors.try_recv().unwrap_or(ClientError::ConnectionClosed)),
                },
                Some(error) = errors.recv() => {
                    // Frames read before the failure are still delivered.
                    let mut result = Err(error);
                    while let Ok(packet) = inbound.try_recv() {
                        if let Err(e) = state.dispatch(packet) {
                            result = Err(e);
                            break;
                        }
                    }
                    break result;
                }
                Some(command) = commands.recv() => match state.handle_command(command) {
                    Ok(true) => {}
                    Ok(false) => break Ok(()),
                    Err(e) => break Err(e),
                },
                _ = ticker.tick() => {
                    if let Err(e) = state.tick() {
                        break Err(e);
                    }
                }
            }
        };

        reader_task.abort();
        writer_task.abort();
        // Wait for both so the queues are gone before the caller sees the result.
        let _ = reader_task.await;
        let _ = writer_task.await;
        match &result {
            Ok(()) => log("Client stopped".to_owned(), Info),
            Err(ClientError::Disconnected(_)) => {}
            Err(e) => log(format!("Client stopped: {}", e), Error),
        }
        // Dropping the state closes the event stream.
        drop(state);
        result
    }
}

async fn read_loop<R>(
    reader: CipherReader<R>,
    threshold: i32,
    inbound: mpsc::Sender<RawPacket>,
    errors: mpsc::Sender<ClientError>,
) where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(reader, PacketCodec::new(threshold));
    let error = loop {
        match frames.next().await {
            Some(Ok(packet)) => {
                if inbound.send(packet).await.is_err() {
                    return;
                }
            }
            Some(Err(e)) => break e,
            None => break ClientError::ConnectionClosed,
        }
    };
    log(format!("Reader stopped: {}", error), Debug);
    let _ = errors.send(error).await;
}

async fn write_loop<W>(
    writer: CipherWriter<W>,
    threshold: i32,
    mut outbound: mpsc::UnboundedReceiver<RawPacket>,
    errors: mpsc::Sender<ClientError>,
) where
    W: AsyncWrite + Unpin,
{
    let mut frames = FramedWrite::new(writer, PacketCodec::new(threshold));
    while let Some(packet) = outbound.recv().await {
        if let Err(e) = write_batch(&mut frames, &mut outbound, packet).await {
            log(format!("Writer stopped: {}", e), Debug);
            let _ = errors.send(e).await;
            return;
        }
    }
}

/// Writes `first` and whatever queued up behind it, then flushes once.
async fn write_batch<W>(
    frames: &mut FramedWrite<CipherWriter<W>, PacketCodec>,
    outbound: &mut mpsc::UnboundedReceiver<RawPacket>,
    first: RawPacket,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    frames.feed(first).await?;
    while let Ok(packet) = outbound.try_recv() {
        frames.feed(packet).await?;
    }
    frames.flush().await
}

/// Cheap, cloneable access to a running [`Client`]. Packets sent through any handle leave in
/// the order they were sent.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    outbound: mpsc::UnboundedSender<RawPacket>,
    commands: mpsc::UnboundedSender<Command>,
    ticks: watch::Receiver<u64>,
}

impl ClientHandle {
    pub fn send_raw(&self, packet: RawPacket) -> Result<()> {
        self.outbound
            .send(packet)
            .map_err(|_| ClientError::ClientStopped)
    }

    pub fn send<P: Packet>(&self, packet: &P) -> Result<()> {
        self.send_raw(RawPacket::from_packet(packet)?)
    }

    fn command(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::ClientStopped)
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.command(command(reply))?;
        response.await.map_err(|_| ClientError::ClientStopped)
    }

    /// Sends a chat message or a command. At most 256 bytes.
    pub fn chat(&self, message: &str) -> Result<()> {
        if message.len() > MAX_CHAT_LEN {
            return Err(ClientError::ChatTooLong(message.len()));
        }
        self.send(&ChatPacket {
            message: message.to_owned(),
        })
    }

    /// Block at `position`, `None` while its chunk is not loaded.
    pub async fn block_at(&self, position: BlockPos) -> Result<Option<BlockState>> {
        self.request(|reply| Command::BlockAt { position, reply })
            .await
    }

    pub async fn player(&self) -> Result<Player> {
        self.request(Command::Player).await
    }

    pub async fn player_info(&self) -> Result<PlayerInfo> {
        self.request(Command::PlayerInfo).await
    }

    pub async fn entity(&self, id: i32) -> Result<Option<Entity>> {
        self.request(|reply| Command::Entity { id, reply }).await
    }

    /// Nearest entity within `radius` blocks of the player, excluding the player itself.
    pub async fn closest_entity(&self, radius: f64) -> Result<Option<Entity>> {
        self.request(|reply| Command::ClosestEntity { radius, reply })
            .await
    }

    /// Moves the player. The server hears about it on the next tick.
    pub fn set_position(&self, position: [f64; 3], on_ground: bool) -> Result<()> {
        self.command(Command::SetPosition {
            position,
            on_ground,
        })
    }

    pub fn look(&self, yaw: f32, pitch: f32) -> Result<()> {
        self.command(Command::Look { yaw, pitch })
    }

    pub fn look_at(&self, target: [f64; 3]) -> Result<()> {
        self.command(Command::LookAt(target))
    }

    pub fn select_slot(&self, slot: i8) -> Result<()> {
        if !(0..9).contains(&slot) {
            return Err(ClientError::ProtocolError(format!(
                "Hotbar slot {} out of range",
                slot
            )));
        }
        self.command(Command::SelectSlot(slot))
    }

    pub fn swing_hand(&self, hand: Hand) -> Result<()> {
        self.send(&AnimationPacket { hand })
    }

    pub fn use_item(&self, hand: Hand) -> Result<()> {
        self.send(&UseItemPacket { hand })
    }

    pub fn attack(&self, entity_id: i32) -> Result<()> {
        self.send(&UseEntityPacket::Attack { target: entity_id })?;
        self.swing_hand(Hand::Main)
    }

    pub fn interact(&self, entity_id: i32, hand: Hand) -> Result<()> {
        self.send(&UseEntityPacket::Interact {
            target: entity_id,
            hand,
        })
    }

    pub fn respawn(&self) -> Result<()> {
        self.command(Command::Respawn)
    }

    /// Places the held block against `face` of the block at `position`.
    pub fn place_block(&self, position: BlockPos, face: Face) -> Result<()> {
        self.send(&PlayerBlockPlacementPacket {
            position,
            face,
            hand: Hand::Main,
            cursor: [0.5, 0.5, 0.5],
        })?;
        self.swing_hand(Hand::Main)
    }

    pub fn start_digging(&self, position: BlockPos, face: Face) -> Result<()> {
        self.send(&PlayerDiggingPacket {
            status: DiggingStatus::Started,
            position,
            face,
        })
    }

    pub fn finish_digging(&self, position: BlockPos, face: Face) -> Result<()> {
        self.send(&PlayerDiggingPacket {
            status: DiggingStatus::Finished,
            position,
            face,
        })
    }

    /// Digs the block at `position`, swinging every tick until the server reports a different
    /// block there. Returns the new block. Wrap in a timeout for blocks that never break.
    pub async fn dig(&self, position: BlockPos, face: Face) -> Result<BlockState> {
        let original = self.block_at(position).await?.ok_or_else(|| {
            ClientError::ProtocolError(format!("Chunk of {:?} is not loaded", position))
        })?;
        let mut ticks = self.ticks();
        self.start_digging(position, face)?;
        self.finish_digging(position, face)?;

        loop {
            ticks
                .changed()
                .await
                .map_err(|_| ClientError::ClientStopped)?;
            match self.block_at(position).await? {
                Some(state) if state == original => self.swing_hand(Hand::Main)?,
                Some(state) => return Ok(state),
                None => {
                    return Err(ClientError::ProtocolError(format!(
                        "Chunk of {:?} unloaded while digging",
                        position
                    )))
                }
            }
        }
    }

    /// Asks the client to close the connection.
    pub fn disconnect(&self) -> Result<()> {
        self.command(Command::Disconnect)
    }

    /// Tick counter, bumped once per tick while the client runs.
    pub fn ticks(&self) -> watch::Receiver<u64> {
        self.ticks.clone()
    }
}
