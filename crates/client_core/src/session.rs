//! Authenticated identity and the readiness value the orchestrator checks
//! before touching a backend.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::PrincipalId,
    error::ApiError,
    protocol::{AuthTokenRequest, SessionResponse},
};
use tokio::sync::watch;
use tracing::info;
use url::Url;

use crate::{error::StoreError, store::ItemStore};

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolves once an identity is available.
    async fn await_authenticated_session(&self) -> Result<PrincipalId, StoreError>;
}

/// Sentinel identity for the unauthenticated local mode.
pub struct LocalSession;

#[async_trait]
impl SessionProvider for LocalSession {
    async fn await_authenticated_session(&self) -> Result<PrincipalId, StoreError> {
        Ok(PrincipalId::local())
    }
}

/// Signs in against the document store: with a custom token when one is
/// configured, anonymously otherwise.
pub struct HttpSessionProvider {
    http: Client,
    server_url: Url,
    custom_token: Option<String>,
}

impl HttpSessionProvider {
    pub fn new(server_url: &str, custom_token: Option<String>) -> Result<Self, StoreError> {
        Ok(Self {
            http: Client::new(),
            server_url: parse_server_url(server_url)?,
            custom_token,
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn await_authenticated_session(&self) -> Result<PrincipalId, StoreError> {
        let auth_error = |err: reqwest::Error| StoreError::Auth(err.to_string());
        let request = match &self.custom_token {
            Some(token) => self
                .http
                .post(join(&self.server_url, "/auth/token")?)
                .json(&AuthTokenRequest {
                    token: token.clone(),
                }),
            None => self.http.post(join(&self.server_url, "/auth/anonymous")?),
        };
        let response = request.send().await.map_err(auth_error)?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ApiError>().await {
                Ok(body) => body.message,
                Err(_) => format!("sign-in rejected with status {status}"),
            };
            return Err(StoreError::Auth(message));
        }
        let body: SessionResponse = response.json().await.map_err(auth_error)?;
        info!(
            principal_id = %body.principal_id,
            with_token = self.custom_token.is_some(),
            "session: signed in"
        );
        Ok(body.principal_id)
    }
}

/// Proof that sign-in completed against `server_url`. The remote store can
/// only be built from one of these.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    server_url: Url,
    principal: PrincipalId,
}

impl AuthenticatedSession {
    pub fn new(server_url: Url, principal: PrincipalId) -> Self {
        Self {
            server_url,
            principal,
        }
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    pub fn principal(&self) -> &PrincipalId {
        &self.principal
    }
}

#[derive(Clone)]
pub struct ReadySession {
    pub principal: PrincipalId,
    pub store: Arc<dyn ItemStore>,
}

#[derive(Clone)]
pub enum Readiness {
    Pending,
    Ready(ReadySession),
    Failed(String),
}

impl Readiness {
    pub fn ready(&self) -> Option<&ReadySession> {
        match self {
            Self::Ready(session) => Some(session),
            Self::Pending | Self::Failed(_) => None,
        }
    }
}

pub fn readiness_channel() -> (watch::Sender<Readiness>, watch::Receiver<Readiness>) {
    watch::channel(Readiness::Pending)
}

pub(crate) fn parse_server_url(raw: &str) -> Result<Url, StoreError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| StoreError::Initialization(format!("invalid server url '{raw}': {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(StoreError::Initialization(format!(
            "server url must use http or https, got '{other}'"
        ))),
    }
}

pub(crate) fn join(base: &Url, route: &str) -> Result<Url, StoreError> {
    base.join(route)
        .map_err(|err| StoreError::Initialization(format!("invalid route '{route}': {err}")))
}

pub(crate) fn is_unauthorized(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}
