//! Connection setup: handshake, status query and the login sequence up to Login Success.

use crate::auth::{Auth, JoinSession, SessionService};
use crate::error::{ClientError, Result};
use crate::logger::{log, LogSeverity};
use crate::protocol::codec::{read_packet, write_packet, COMPRESSION_DISABLED};
use crate::protocol::crypto::{
    create_cipher, encrypt_with_public_key, generate_secret, server_hash, CipherReader,
    CipherWriter,
};
use crate::protocol::handshake::{HandshakePacket, NextState};
use crate::protocol::login::*;
use crate::protocol::packet::{Packet, RawPacket};
use crate::protocol::status::{PingPacket, ServerStatus, StatusRequestPacket, StatusResponsePacket};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use LogSeverity::*;

/// Connection phase. Only moves forward. Encryption and compression are each entered at most
/// once during login, in either order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Handshake,
    Status,
    Login,
    /// Encryption Response sent, both directions encrypted
    Encryption,
    /// Set Compression received
    Compression,
    Play,
}

impl Phase {
    pub fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Handshake, Status | Login)
                | (Login, Encryption | Compression | Play)
                | (Encryption, Compression | Play)
                | (Compression, Encryption | Play)
        )
    }
}

/// Result of a status query.
#[derive(Debug, Clone)]
pub struct StatusReply {
    pub status: ServerStatus,
    /// Response JSON exactly as the server sent it
    pub raw: String,
    pub latency: Duration,
}

/// A connection that has not reached the play phase yet. Reads are unbuffered so that nothing
/// past Login Success is consumed before the play reader takes over.
pub struct Session<R, W> {
    reader: CipherReader<R>,
    writer: CipherWriter<W>,
    phase: Phase,
    threshold: i32,
    encrypted: bool,
    compressed: bool,
}

impl Session<OwnedReadHalf, OwnedWriteHalf> {
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        log(format!("Connected to {}:{}", host, port), Debug);
        let (read, write) = stream.into_split();
        Ok(Session::new(read, write))
    }
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: CipherReader::new(reader),
            writer: CipherWriter::new(writer),
            phase: Phase::Handshake,
            threshold: COMPRESSION_DISABLED,
            encrypted: false,
            compressed: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Negotiated compression threshold, negative while compression is off.
    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    fn advance(&mut self, next: Phase) -> Result<()> {
        let repeated = match next {
            Phase::Encryption => self.encrypted,
            Phase::Compression => self.compressed,
            _ => false,
        };
        if repeated || !self.phase.can_advance_to(next) {
            return Err(ClientError::InvalidPhase {
                from: self.phase,
                to: next,
            });
        }
        log(format!("Phase {:?} -> {:?}", self.phase, next), Debug);
        match next {
            Phase::Encryption => self.encrypted = true,
            Phase::Compression => self.compressed = true,
            _ => {}
        }
        self.phase = next;
        Ok(())
    }

    pub async fn send<P: Packet>(&mut self, packet: &P) -> Result<()> {
        let raw = RawPacket::from_packet(packet)?;
        write_packet(&mut self.writer, &raw, self.threshold).await
    }

    pub async fn receive(&mut self) -> Result<RawPacket> {
        read_packet(&mut self.reader, self.threshold >= 0).await
    }

    async fn receive_as<P: Packet>(&mut self) -> Result<P> {
        let raw = self.receive().await?;
        raw.decode().map_err(|e| ClientError::decode(raw.id(), e))
    }

    pub async fn handshake(
        &mut self,
        host: &str,
        port: u16,
        next_state: NextState,
        protocol_version: i32,
    ) -> Result<()> {
        if self.phase != Phase::Handshake {
            return Err(ClientError::InvalidPhase {
                from: self.phase,
                to: Phase::Handshake,
            });
        }
        let mut handshake = HandshakePacket::new(host, port, next_state);
        handshake.protocol_version = protocol_version;
        self.send(&handshake).await?;
        self.advance(match next_state {
            NextState::Status => Phase::Status,
            NextState::Login => Phase::Login,
        })
    }

    /// Server list query. Expects the handshake to have been sent with next state Status.
    pub async fn query_status(&mut self) -> Result<StatusReply> {
        if self.phase != Phase::Status {
            return Err(ClientError::InvalidPhase {
                from: self.phase,
                to: Phase::Status,
            });
        }
        self.send(&StatusRequestPacket).await?;
        let response: StatusResponsePacket = self.receive_as().await?;
        let status: ServerStatus = serde_json::from_str(&response.response).map_err(|e| {
            ClientError::ProtocolError(format!("Invalid status response: {}", e))
        })?;

        let started = Instant::now();
        let payload = crate::logger::time::unix_millis();
        self.send(&PingPacket { payload }).await?;
        let pong: PingPacket = self.receive_as().await?;
        let latency = started.elapsed();
        if pong.payload != payload {
            return Err(ClientError::ProtocolError(format!(
                "Pong payload {} does not match ping {}",
                pong.payload, payload
            )));
        }

        Ok(StatusReply {
            status,
            raw: response.response,
            latency,
        })
    }

    /// Runs the login sequence until Login Success. Encryption and compression are enabled
    /// along the way when the server asks for them.
    pub async fn login<S>(&mut self, auth: &Auth, service: &S) -> Result<LoginSuccessPacket>
    where
        S: SessionService + ?Sized,
    {
        if self.phase != Phase::Login {
            return Err(ClientError::InvalidPhase {
                from: self.phase,
                to: Phase::Login,
            });
        }
        self.send(&LoginStartPacket {
            username: auth.name.clone(),
        })
        .await?;

        loop {
            let packet = self.receive().await?;
            let id = packet.id();
            match id {
                0x00 => {
                    let disconnect: LoginDisconnectPacket =
                        packet.decode().map_err(|e| ClientError::decode(id, e))?;
                    log(format!("Login rejected: {}", disconnect.reason), Warning);
                    return Err(ClientError::Disconnected(disconnect.reason));
                }
                0x01 => {
                    let request: EncryptionRequestPacket =
                        packet.decode().map_err(|e| ClientError::decode(id, e))?;
                    self.advance(Phase::Encryption)?;
                    self.enable_encryption(request, auth, service).await?;
                }
                0x02 => {
                    let success: LoginSuccessPacket =
                        packet.decode().map_err(|e| ClientError::decode(id, e))?;
                    self.advance(Phase::Play)?;
                    log(
                        format!("Logged in as {} ({})", success.username, success.uuid),
                        Info,
                    );
                    return Ok(success);
                }
                0x03 => {
                    let compression: SetCompressionPacket =
                        packet.decode().map_err(|e| ClientError::decode(id, e))?;
                    self.advance(Phase::Compression)?;
                    self.threshold = compression.threshold;
                    log(
                        format!("Compression threshold set to {}", self.threshold),
                        Debug,
                    );
                }
                other => {
                    return Err(ClientError::ProtocolError(format!(
                        "Unexpected packet 0x{:02x} during login",
                        other
                    )))
                }
            }
        }
    }

    async fn enable_encryption<S>(
        &mut self,
        request: EncryptionRequestPacket,
        auth: &Auth,
        service: &S,
    ) -> Result<()>
    where
        S: SessionService + ?Sized,
    {
        let secret = generate_secret();
        let hash = server_hash(&request.server_id, &secret, &request.public_key);
        service
            .join_session(&JoinSession::new(auth, hash))
            .await?;

        let response = EncryptionResponsePacket {
            shared_secret: encrypt_with_public_key(&request.public_key, &secret)?,
            verify_token: encrypt_with_public_key(&request.public_key, &request.verify_token)?,
        };
        // The response itself still goes out in the clear.
        self.send(&response).await?;

        let (encryptor, decryptor) = create_cipher(&secret)?;
        self.writer.install(encryptor)?;
        self.reader.install(decryptor)?;
        log("Encryption enabled".to_owned(), Debug);
        Ok(())
    }

    /// Hands the transport over to the play phase.
    pub fn into_parts(self) -> (CipherReader<R>, CipherWriter<W>, i32) {
        (self.reader, self.writer, self.threshold)
    }
}

/// Connects, queries the server list entry and measures latency.
pub async fn ping(host: &str, port: u16) -> Result<StatusReply> {
    let mut session = Session::connect(host, port).await?;
    session
        .handshake(
            host,
            port,
            NextState::Status,
            crate::protocol::handshake::PROTOCOL_VERSION,
        )
        .await?;
    session.query_status().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::handshake::PROTOCOL_VERSION;
    use assert_matches::assert_matches;
    use futures::future::BoxFuture;
    use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};
    use uuid::Uuid;

    struct NoSession;

    impl SessionService for NoSession {
        fn join_session<'a>(&'a self, _request: &'a JoinSession) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Err(ClientError::AuthError("unexpected join".to_owned())) })
        }
    }

    type TestSession = Session<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    fn pair() -> (TestSession, DuplexStream) {
        let (client, server) = duplex(64 * 1024);
        let (read, write) = split(client);
        (Session::new(read, write), server)
    }

    async fn send_raw<P: Packet>(stream: &mut DuplexStream, packet: &P, threshold: i32) {
        let raw = RawPacket::from_packet(packet).unwrap();
        write_packet(stream, &raw, threshold).await.unwrap();
    }

    #[test]
    fn test_phase_order() {
        assert!(Phase::Handshake.can_advance_to(Phase::Login));
        assert!(Phase::Login.can_advance_to(Phase::Play));
        assert!(Phase::Encryption.can_advance_to(Phase::Compression));
        assert!(Phase::Compression.can_advance_to(Phase::Encryption));
        assert!(!Phase::Encryption.can_advance_to(Phase::Encryption));
        assert!(!Phase::Encryption.can_advance_to(Phase::Login));
        assert!(!Phase::Play.can_advance_to(Phase::Login));
        assert!(!Phase::Login.can_advance_to(Phase::Login));
        assert!(!Phase::Status.can_advance_to(Phase::Login));
    }

    #[tokio::test]
    async fn test_offline_login_with_compression() {
        let (mut session, mut server) = pair();
        let uuid = Uuid::from_u128(0x1234);

        let server_task = tokio::spawn(async move {
            let handshake = read_packet(&mut server, false).await.unwrap();
            let handshake: HandshakePacket = handshake.decode().unwrap();
            assert_eq!(handshake.protocol_version, PROTOCOL_VERSION);
            assert_eq!(handshake.next_state, NextState::Login);

            let start: LoginStartPacket = read_packet(&mut server, false)
                .await
                .unwrap()
                .decode()
                .unwrap();
            assert_eq!(start.username, "bot");

            send_raw(&mut server, &SetCompressionPacket { threshold: 256 }, -1).await;
            let success = LoginSuccessPacket {
                uuid,
                username: "bot".to_owned(),
            };
            send_raw(&mut server, &success, 256).await;
            server
        });

        session
            .handshake("localhost", 25565, NextState::Login, PROTOCOL_VERSION)
            .await
            .unwrap();
        let success = session.login(&Auth::offline("bot"), &NoSession).await.unwrap();
        assert_eq!(success.uuid, uuid);
        assert_eq!(session.phase(), Phase::Play);
        assert_eq!(session.threshold(), 256);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_login_disconnect() {
        let (mut session, mut server) = pair();
        let server_task = tokio::spawn(async move {
            read_packet(&mut server, false).await.unwrap();
            read_packet(&mut server, false).await.unwrap();
            let disconnect = LoginDisconnectPacket {
                reason: r#"{"text":"banned"}"#.to_owned(),
            };
            send_raw(&mut server, &disconnect, -1).await;
            server
        });

        session
            .handshake("localhost", 25565, NextState::Login, PROTOCOL_VERSION)
            .await
            .unwrap();
        let result = session.login(&Auth::offline("bot"), &NoSession).await;
        assert_matches!(result, Err(ClientError::Disconnected(reason)) if reason.contains("banned"));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_compression_is_rejected() {
        let (mut session, mut server) = pair();
        let server_task = tokio::spawn(async move {
            read_packet(&mut server, false).await.unwrap();
            read_packet(&mut server, false).await.unwrap();
            send_raw(&mut server, &SetCompressionPacket { threshold: 64 }, -1).await;
            send_raw(&mut server, &SetCompressionPacket { threshold: 64 }, 64).await;
            server
        });

        session
            .handshake("localhost", 25565, NextState::Login, PROTOCOL_VERSION)
            .await
            .unwrap();
        let result = session.login(&Auth::offline("bot"), &NoSession).await;
        assert_matches!(
            result,
            Err(ClientError::InvalidPhase {
                from: Phase::Compression,
                to: Phase::Compression
            })
        );
        server_task.await.unwrap();
    }

    #[test]
    fn test_login_steps_happen_once_in_any_order() {
        let (mut session, _server) = pair();
        session.phase = Phase::Login;
        session.advance(Phase::Compression).unwrap();
        session.advance(Phase::Encryption).unwrap();
        assert_matches!(
            session.advance(Phase::Compression),
            Err(ClientError::InvalidPhase {
                from: Phase::Encryption,
                to: Phase::Compression
            })
        );
        session.advance(Phase::Play).unwrap();
        assert_eq!(session.phase(), Phase::Play);
    }

    #[tokio::test]
    async fn test_status_query() {
        let (mut session, mut server) = pair();
        let json = r#"{"version":{"name":"1.12.2","protocol":340},"players":{"max":20,"online":1},"description":{"text":"hello"}}"#;

        let server_task = tokio::spawn(async move {
            let handshake: HandshakePacket = read_packet(&mut server, false)
                .await
                .unwrap()
                .decode()
                .unwrap();
            assert_eq!(handshake.next_state, NextState::Status);
            let request = read_packet(&mut server, false).await.unwrap();
            assert_eq!(request.id(), 0x00);
            send_raw(
                &mut server,
                &StatusResponsePacket {
                    response: json.to_owned(),
                },
                -1,
            )
            .await;
            let ping: PingPacket = read_packet(&mut server, false)
                .await
                .unwrap()
                .decode()
                .unwrap();
            send_raw(&mut server, &ping, -1).await;
            server
        });

        assert_matches!(
            session.query_status().await,
            Err(ClientError::InvalidPhase { .. })
        );
        session
            .handshake("localhost", 25565, NextState::Status, PROTOCOL_VERSION)
            .await
            .unwrap();
        let reply = session.query_status().await.unwrap();
        assert_eq!(reply.status.version.protocol, 340);
        assert_eq!(reply.status.players.online, 1);
        assert_eq!(reply.raw, json);
        server_task.await.unwrap();
    }
}
