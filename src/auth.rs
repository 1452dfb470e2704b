//! Session server authentication used when an online-mode server requests encryption.

use crate::error::{ClientError, Result};
use crate::logger::{log, LogSeverity};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub const MOJANG_JOIN_URL: &str = "https://sessionserver.mojang.com/session/minecraft/join";

/// Credentials of the account the client plays as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    pub name: String,
    /// Profile id without dashes
    pub uuid: String,
    pub access_token: String,
}

impl Auth {
    /// Credentials for offline-mode servers, which never ask for encryption.
    pub fn offline(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            uuid: String::new(),
            access_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedProfile {
    pub id: String,
    pub name: String,
}

/// Body of the session server join request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSession {
    pub access_token: String,
    pub selected_profile: SelectedProfile,
    /// Server hash from [`crate::protocol::crypto::server_hash`]
    pub server_id: String,
}

impl JoinSession {
    pub fn new(auth: &Auth, server_hash: String) -> Self {
        Self {
            access_token: auth.access_token.clone(),
            selected_profile: SelectedProfile {
                id: auth.uuid.clone(),
                name: auth.name.clone(),
            },
            server_id: server_hash,
        }
    }
}

/// Announces a join to the session server before the Encryption Response is sent.
pub trait SessionService: Send + Sync {
    fn join_session<'a>(&'a self, request: &'a JoinSession) -> BoxFuture<'a, Result<()>>;
}

pub struct MojangSessionService {
    http: reqwest::Client,
    url: String,
}

impl MojangSessionService {
    pub fn new() -> Self {
        Self::with_url(MOJANG_JOIN_URL)
    }

    pub fn with_url(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_owned(),
        }
    }
}

impl Default for MojangSessionService {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionService for MojangSessionService {
    fn join_session<'a>(&'a self, request: &'a JoinSession) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            log(
                format!("Joining session as {}", request.selected_profile.name),
                LogSeverity::Debug,
            );
            let response = self
                .http
                .post(&self.url)
                .json(request)
                .send()
                .await
                .map_err(|e| ClientError::AuthError(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::AuthError(format!("{}: {}", status, body)))
        })
    }
}
