pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod protocol;
pub mod session;
pub mod world;

// Re-export commonly used items
pub use auth::{Auth, MojangSessionService, SessionService};
pub use client::{Client, ClientHandle, Event};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use logger::{log, LogSeverity};
pub use protocol::packet::{BlockPos, Packet, RawPacket};
pub use session::ping;
