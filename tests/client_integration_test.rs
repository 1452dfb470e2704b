use assert_matches::assert_matches;
use futures::future::BoxFuture;
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};
use skiff::auth::{Auth, JoinSession, SessionService};
use skiff::client::{Client, ClientHandle, Event};
use skiff::config::ClientConfig;
use skiff::error::{ClientError, Result};
use skiff::protocol::block_change::{BlockChangePacket, TimeUpdatePacket};
use skiff::protocol::chat::{ChatMessagePacket, ChatPacket};
use skiff::protocol::codec::{read_packet, write_packet, COMPRESSION_DISABLED};
use skiff::protocol::crypto::{create_cipher, CipherReader, CipherWriter};
use skiff::protocol::handshake::{HandshakePacket, NextState, PROTOCOL_VERSION};
use skiff::protocol::interaction::{DiggingStatus, Face};
use skiff::protocol::join_game::JoinGamePacket;
use skiff::protocol::keep_alive::{KeepAlivePacket, KeepAliveResponsePacket};
use skiff::protocol::login::*;
use skiff::protocol::packet::{BlockPos, MinecraftPacketBuffer, Packet, RawPacket};
use skiff::protocol::player::DisconnectPacket;
use skiff::session::{Phase, Session};
use skiff::world::chunk::{BlockState, Chunk};
use skiff::world::ChunkPos;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use uuid::Uuid;

const WAIT: Duration = Duration::from_secs(5);
const VERIFY_TOKEN: [u8; 4] = [9, 8, 7, 6];

type TestClient = Client<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// Records the join requests instead of calling the session server.
#[derive(Default)]
struct RecordingSession {
    joins: Mutex<Vec<JoinSession>>,
}

impl SessionService for RecordingSession {
    fn join_session<'a>(&'a self, request: &'a JoinSession) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.joins.lock().unwrap().push(request.clone());
            Ok(())
        })
    }
}

/// Server end of the connection.
struct MockServer {
    reader: CipherReader<ReadHalf<DuplexStream>>,
    writer: CipherWriter<WriteHalf<DuplexStream>>,
    threshold: i32,
}

impl MockServer {
    fn new(stream: DuplexStream) -> Self {
        let (read, write) = split(stream);
        Self {
            reader: CipherReader::new(read),
            writer: CipherWriter::new(write),
            threshold: COMPRESSION_DISABLED,
        }
    }

    async fn send<P: Packet>(&mut self, packet: &P) {
        let raw = RawPacket::from_packet(packet).unwrap();
        self.send_raw(&raw).await;
    }

    async fn send_raw(&mut self, raw: &RawPacket) {
        write_packet(&mut self.writer, raw, self.threshold)
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> RawPacket {
        timeout(WAIT, read_packet(&mut self.reader, self.threshold >= 0))
            .await
            .expect("client sent nothing")
            .unwrap()
    }

    /// Next packet with the given id, skipping anything else the client sends meanwhile.
    async fn recv_id(&mut self, id: i32) -> RawPacket {
        loop {
            let packet = self.recv().await;
            if packet.id() == id {
                return packet;
            }
        }
    }

    /// Reads the handshake and Login Start, returning the player name.
    async fn login_start(&mut self) -> String {
        let handshake: HandshakePacket = self.recv().await.decode().unwrap();
        assert_eq!(handshake.protocol_version, PROTOCOL_VERSION);
        assert_eq!(handshake.next_state, NextState::Login);
        let start: LoginStartPacket = self.recv().await.decode().unwrap();
        start.username
    }

    async fn encrypt(&mut self, key: &RsaPrivateKey) {
        let public_key = key
            .to_public_key()
            .to_public_key_der()
            .unwrap()
            .as_bytes()
            .to_vec();
        self.send(&EncryptionRequestPacket {
            server_id: String::new(),
            public_key,
            verify_token: VERIFY_TOKEN.to_vec(),
        })
        .await;

        let response: EncryptionResponsePacket = self.recv().await.decode().unwrap();
        let secret = key
            .decrypt(Pkcs1v15Encrypt, &response.shared_secret)
            .unwrap();
        let token = key
            .decrypt(Pkcs1v15Encrypt, &response.verify_token)
            .unwrap();
        assert_eq!(token, VERIFY_TOKEN);

        let (encryptor, decryptor) = create_cipher(&secret).unwrap();
        self.writer.install(encryptor).unwrap();
        self.reader.install(decryptor).unwrap();
    }

    async fn compress(&mut self, threshold: i32) {
        self.send(&SetCompressionPacket { threshold }).await;
        self.threshold = threshold;
    }

    async fn succeed(&mut self, username: String) {
        self.send(&LoginSuccessPacket {
            uuid: Uuid::from_u128(0xABCD),
            username,
        })
        .await;
    }

    /// Server side of the login sequence.
    async fn accept(&mut self, key: Option<&RsaPrivateKey>, threshold: i32) {
        let username = self.login_start().await;
        if let Some(key) = key {
            self.encrypt(key).await;
        }
        if threshold >= 0 {
            self.compress(threshold).await;
        }
        self.succeed(username).await;
    }
}

struct Connected {
    handle: ClientHandle,
    events: mpsc::Receiver<Event>,
    server: MockServer,
    run: JoinHandle<Result<()>>,
}

async fn connect(
    config: ClientConfig,
    key: Option<&RsaPrivateKey>,
    threshold: i32,
    service: &RecordingSession,
) -> Connected {
    let (client_end, server_end) = duplex(1 << 20);
    let (read, write) = split(client_end);
    let mut session = Session::new(read, write);
    let mut server = MockServer::new(server_end);

    let login = async {
        session
            .handshake("localhost", 25565, NextState::Login, PROTOCOL_VERSION)
            .await?;
        session.login(&Auth::offline("bot"), service).await
    };
    let (profile, ()) = tokio::join!(login, server.accept(key, threshold));
    let profile = profile.unwrap();
    assert_eq!(profile.username, "bot");

    let (client, events): (TestClient, _) = Client::new(session, profile, &config).unwrap();
    let handle = client.handle();
    Connected {
        handle,
        events,
        server,
        run: tokio::spawn(client.run()),
    }
}

async fn next_event(events: &mut mpsc::Receiver<Event>) -> Option<Event> {
    timeout(WAIT, events.recv()).await.expect("no event")
}

fn chat(text: &str) -> ChatMessagePacket {
    ChatMessagePacket {
        json: format!(r#"{{"text":"{}"}}"#, text),
        position: 0,
    }
}

#[tokio::test]
async fn test_login_with_encryption_and_compression() {
    let key = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
    let service = RecordingSession::default();
    let mut c = connect(ClientConfig::default(), Some(&key), 64, &service).await;

    {
        let joins = service.joins.lock().unwrap();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].selected_profile.name, "bot");
        assert!(!joins[0].server_id.is_empty());
    }

    c.server
        .send(&JoinGamePacket {
            entity_id: 7,
            gamemode: 0,
            dimension: 0,
            difficulty: 1,
            max_players: 20,
            level_type: "default".to_owned(),
            reduced_debug_info: false,
        })
        .await;
    let settings = c.server.recv().await;
    assert_eq!(settings.id(), 0x04);
    assert_matches!(next_event(&mut c.events).await, Some(Event::JoinGame(info)) if info.entity_id == 7);

    // Above the threshold in both directions.
    let long = "x".repeat(200);
    c.server.send(&chat(&long)).await;
    assert_matches!(
        next_event(&mut c.events).await,
        Some(Event::Chat { json, .. }) if json.contains(&long)
    );
    c.handle.chat(&long).unwrap();
    let message: ChatPacket = c.server.recv_id(0x02).await.decode().unwrap();
    assert_eq!(message.message, long);

    c.handle.disconnect().unwrap();
    assert_matches!(timeout(WAIT, c.run).await.unwrap().unwrap(), Ok(()));
    assert_eq!(next_event(&mut c.events).await, None);
}

#[tokio::test]
async fn test_login_with_compression_before_encryption() {
    let key = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
    let service = RecordingSession::default();
    let (client_end, server_end) = duplex(1 << 20);
    let (read, write) = split(client_end);
    let mut session = Session::new(read, write);
    let mut server = MockServer::new(server_end);

    let login = async {
        session
            .handshake("localhost", 25565, NextState::Login, PROTOCOL_VERSION)
            .await?;
        session.login(&Auth::offline("bot"), &service).await
    };
    let accept = async {
        let username = server.login_start().await;
        server.compress(64).await;
        // Sent compressed and still in the clear.
        server.encrypt(&key).await;
        server.succeed(username).await;
    };
    let (profile, ()) = tokio::join!(login, accept);
    let profile = profile.unwrap();
    assert_eq!(profile.uuid, Uuid::from_u128(0xABCD));
    assert_eq!(session.phase(), Phase::Play);
    assert_eq!(session.threshold(), 64);
    assert_eq!(service.joins.lock().unwrap().len(), 1);

    let (client, mut events): (TestClient, _) =
        Client::new(session, profile, &ClientConfig::default()).unwrap();
    let run = tokio::spawn(client.run());
    server.send(&chat(&"y".repeat(200))).await;
    assert_matches!(
        next_event(&mut events).await,
        Some(Event::Chat { json, .. }) if json.len() > 200
    );
    run.abort();
}

#[tokio::test]
async fn test_events_arrive_in_packet_order() {
    let service = RecordingSession::default();
    let mut c = connect(ClientConfig::default(), None, 256, &service).await;

    c.server.send(&chat("one")).await;
    c.server
        .send(&TimeUpdatePacket {
            world_age: 100,
            time_of_day: 6000,
        })
        .await;
    c.server.send(&chat("two")).await;

    assert_matches!(next_event(&mut c.events).await, Some(Event::Chat { json, .. }) if json.contains("one"));
    assert_matches!(next_event(&mut c.events).await, Some(Event::TimeUpdate(time)) if time.time_of_day == 6000);
    assert_matches!(next_event(&mut c.events).await, Some(Event::Chat { json, .. }) if json.contains("two"));
    assert!(service.joins.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_keep_alive_survives_bad_packets() {
    let service = RecordingSession::default();
    let mut c = connect(ClientConfig::default(), None, COMPRESSION_DISABLED, &service).await;

    // Unknown id, then a Block Change cut short.
    c.server.send_raw(&RawPacket::new(0x7F, vec![1, 2, 3])).await;
    c.server.send_raw(&RawPacket::new(0x0B, vec![0x00])).await;
    c.server
        .send(&KeepAlivePacket {
            keep_alive_id: 123456789,
        })
        .await;

    let response: KeepAliveResponsePacket = c.server.recv_id(0x0B).await.decode().unwrap();
    assert_eq!(response.keep_alive_id, 123456789);

    c.server
        .send(&TimeUpdatePacket {
            world_age: 1,
            time_of_day: 2,
        })
        .await;
    assert_matches!(next_event(&mut c.events).await, Some(Event::TimeUpdate(_)));
}

#[tokio::test]
async fn test_disconnect_ends_event_stream() {
    let service = RecordingSession::default();
    let mut c = connect(ClientConfig::default(), None, 128, &service).await;

    c.server.send(&chat("last words")).await;
    c.server
        .send(&DisconnectPacket {
            reason: r#"{"text":"Server closed"}"#.to_owned(),
        })
        .await;
    drop(c.server);

    assert_matches!(next_event(&mut c.events).await, Some(Event::Chat { .. }));
    assert_matches!(
        next_event(&mut c.events).await,
        Some(Event::Disconnected(reason)) if reason.contains("Server closed")
    );
    assert_eq!(next_event(&mut c.events).await, None);
    assert_matches!(
        timeout(WAIT, c.run).await.unwrap().unwrap(),
        Err(ClientError::Disconnected(_))
    );
    assert_matches!(c.handle.player().await, Err(ClientError::ClientStopped));
    assert_matches!(c.handle.chat("hello?"), Err(ClientError::ClientStopped));
}

#[tokio::test]
async fn test_connection_loss_is_fatal() {
    let service = RecordingSession::default();
    let mut c = connect(ClientConfig::default(), None, COMPRESSION_DISABLED, &service).await;

    drop(c.server);
    assert_matches!(
        timeout(WAIT, c.run).await.unwrap().unwrap(),
        Err(ClientError::ConnectionClosed) | Err(ClientError::IoError(_))
    );
    assert_eq!(next_event(&mut c.events).await, None);
}

#[tokio::test]
async fn test_outbound_order_across_handles() {
    let service = RecordingSession::default();
    let mut c = connect(ClientConfig::default(), None, 16, &service).await;
    let other = c.handle.clone();

    c.handle.chat("a1").unwrap();
    other.chat("b1").unwrap();
    c.handle.chat("a2").unwrap();
    other.chat("b2").unwrap();
    assert_matches!(
        other.chat(&"y".repeat(257)),
        Err(ClientError::ChatTooLong(257))
    );

    let mut received = Vec::new();
    for _ in 0..4 {
        let message: ChatPacket = c.server.recv_id(0x02).await.decode().unwrap();
        received.push(message.message);
    }
    assert_eq!(received, ["a1", "b1", "a2", "b2"]);
}

#[tokio::test]
async fn test_queries_and_digging() {
    let config = ClientConfig {
        tick_interval_ms: 10,
        ..ClientConfig::default()
    };
    let service = RecordingSession::default();
    let mut c = connect(config, None, 256, &service).await;

    let stone = BlockState::new(1, 0);
    let target = BlockPos::new(3, 70, -5);
    let mut chunk = Chunk::new();
    chunk.set_block(3, 70, 11, stone, true).unwrap();
    c.server.send(&chunk.encode(0, -1)).await;
    assert_eq!(
        next_event(&mut c.events).await,
        Some(Event::ChunkLoaded(ChunkPos::new(0, -1)))
    );

    assert_eq!(c.handle.block_at(target).await.unwrap(), Some(stone));
    assert_eq!(c.handle.block_at(BlockPos::new(3, 70, 40)).await.unwrap(), None);
    assert_eq!(c.handle.player().await.unwrap().name, "bot");

    let digger = {
        let handle = c.handle.clone();
        tokio::spawn(async move { handle.dig(target, Face::Top).await })
    };

    for status in [DiggingStatus::Started, DiggingStatus::Finished] {
        let packet = c.server.recv_id(0x14).await;
        let mut buffer = MinecraftPacketBuffer::from_slice(packet.data());
        assert_eq!(buffer.read_varint().unwrap(), status as i32);
        assert_eq!(buffer.read_position().unwrap(), target);
        assert_eq!(buffer.read_i8().unwrap(), Face::Top as i8);
    }

    c.server
        .send(&BlockChangePacket {
            position: target,
            block_id: 0,
        })
        .await;
    let broken = timeout(WAIT, digger).await.unwrap().unwrap();
    assert_eq!(broken.unwrap(), BlockState::AIR);
}
