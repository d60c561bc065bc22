//! `LanyardClient` builder and façade.
//!
//! This is the composition root for the SDK. It constructs the layers —
//! token store, session coordinator, REST gateway — wires them together,
//! and hands the application one object that exposes the session
//! operations and the resource clients.

use std::sync::Arc;

use lanyard_gateway::{GatewayConfig, RequestGateway};
use lanyard_protocol::UserProfile;
use lanyard_room::{Connector, WebSocketConnector};
use lanyard_session::{
    MemoryTokenStore, SessionConfig, SessionCoordinator, SessionEvent, SessionStatus, TokenStore,
};
use tokio::sync::broadcast;

use crate::LanyardError;

/// The assembled client: one session, one gateway, shared tokens.
///
/// Cheap to clone; clones share the same session. The connector type
/// parameter defaults to the production WebSocket connector — tests
/// inject their own through
/// [`build_with_connector`](LanyardClientBuilder::build_with_connector).
///
/// # Example
///
/// ```rust,no_run
/// use lanyard::LanyardClient;
///
/// # async fn demo() -> Result<(), lanyard::LanyardError> {
/// let client = LanyardClient::builder()
///     .identity_endpoint("wss://id.example.com/session")
///     .world_endpoint("wss://world.example.com/session")
///     .api_base_url("https://api.example.com")
///     .build()?;
///
/// client.connect().await?;
/// let user = client.login("alice", "secret").await?;
/// println!("hello {}", user.display_name);
/// client.join_world().await?;
/// # Ok(())
/// # }
/// ```
pub struct LanyardClient<C: Connector = WebSocketConnector> {
    session: SessionCoordinator<C>,
    gateway: RequestGateway<SessionCoordinator<C>>,
}

impl<C: Connector> Clone for LanyardClient<C> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            gateway: self.gateway.clone(),
        }
    }
}

impl LanyardClient {
    /// Starts a builder with localhost development defaults.
    pub fn builder() -> LanyardClientBuilder {
        LanyardClientBuilder::new()
    }
}

impl<C: Connector> LanyardClient<C> {
    /// The session coordinator, for code that wants the full surface.
    pub fn session(&self) -> &SessionCoordinator<C> {
        &self.session
    }

    /// The REST gateway and its resource clients.
    pub fn gateway(&self) -> &RequestGateway<SessionCoordinator<C>> {
        &self.gateway
    }

    /// Current session status.
    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Cached profile of the logged-in user, if any.
    pub fn user(&self) -> Option<UserProfile> {
        self.session.user()
    }

    /// Subscribes to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    /// Opens the identity channel. See
    /// [`SessionCoordinator::connect_identity`].
    pub async fn connect(&self) -> Result<(), LanyardError> {
        self.session.connect_identity().await.map_err(Into::into)
    }

    /// Logs in with credentials. See [`SessionCoordinator::login`].
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<UserProfile, LanyardError> {
        self.session
            .login(identifier, secret)
            .await
            .map_err(Into::into)
    }

    /// Resumes a stored session. See [`SessionCoordinator::resume`].
    pub async fn resume(&self) -> Result<UserProfile, LanyardError> {
        self.session.resume().await.map_err(Into::into)
    }

    /// Joins the world room. See [`SessionCoordinator::join_world`].
    pub async fn join_world(&self) -> Result<(), LanyardError> {
        self.session.join_world().await.map_err(Into::into)
    }

    /// Ends the session. See [`SessionCoordinator::logout`].
    pub async fn logout(&self) {
        self.session.logout().await;
    }
}

/// Builder for [`LanyardClient`].
///
/// All knobs have defaults pointed at localhost, so a bare
/// `builder().build()` produces a client that talks to a local dev
/// stack.
pub struct LanyardClientBuilder {
    identity_endpoint: String,
    world_endpoint: String,
    api_base_url: String,
    store: Option<Arc<dyn TokenStore>>,
    reconnect_max_attempts: Option<u32>,
}

impl LanyardClientBuilder {
    pub fn new() -> Self {
        Self {
            identity_endpoint: "ws://127.0.0.1:4000/identity".to_string(),
            world_endpoint: "ws://127.0.0.1:4001/world".to_string(),
            api_base_url: "http://127.0.0.1:4002/api".to_string(),
            store: None,
            reconnect_max_attempts: None,
        }
    }

    /// WebSocket URL of the identity service.
    pub fn identity_endpoint(mut self, url: impl Into<String>) -> Self {
        self.identity_endpoint = url.into();
        self
    }

    /// WebSocket URL of the world service.
    pub fn world_endpoint(mut self, url: impl Into<String>) -> Self {
        self.world_endpoint = url.into();
        self
    }

    /// Base URL of the REST API.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Where tokens persist. Defaults to an in-memory store; pass a
    /// [`FileTokenStore`](lanyard_session::FileTokenStore) to survive
    /// restarts.
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Overrides how many reconnect attempts the identity channel makes
    /// before the session degrades.
    pub fn reconnect_max_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_max_attempts = Some(attempts);
        self
    }

    /// Builds a client on the production WebSocket connector.
    pub fn build(self) -> Result<LanyardClient, LanyardError> {
        self.build_with_connector(WebSocketConnector::new())
    }

    /// Builds a client on a caller-supplied connector.
    pub fn build_with_connector<C: Connector>(
        self,
        connector: C,
    ) -> Result<LanyardClient<C>, LanyardError> {
        let store: Arc<dyn TokenStore> = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));
        let mut config = SessionConfig::new(&self.identity_endpoint, &self.world_endpoint);
        if let Some(attempts) = self.reconnect_max_attempts {
            config.reconnect_max_attempts = attempts;
        }
        tracing::debug!(
            identity = %config.identity_endpoint,
            world = %config.world_endpoint,
            api = %self.api_base_url,
            "building lanyard client"
        );
        let session = SessionCoordinator::new(connector, store, config);
        let gateway = RequestGateway::new(
            Arc::new(session.clone()),
            GatewayConfig::new(self.api_base_url),
        )
        .map_err(LanyardError::Gateway)?;
        Ok(LanyardClient { session, gateway })
    }
}

impl Default for LanyardClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
