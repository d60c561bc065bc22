//! The session coordinator: one object that drives the whole client session.
//!
//! The coordinator owns both room connections (identity and world), the
//! token store, and the status machine, and exposes the operations the
//! application calls: connect, login, resume, join the world, logout. It
//! publishes [`SessionEvent`]s for everything the application should react
//! to, and it implements [`TokenSource`] so the REST gateway can pull
//! bearer tokens from the same place the channels do.
//!
//! # Cancellation
//!
//! `logout()` must win against everything, including a login that is
//! mid-flight on the wire. The coordinator handles this with an *epoch*:
//! a counter bumped by every logout. Operations capture the epoch when
//! they start and re-check it at every await boundary before committing
//! anything; a stale epoch means a logout happened in between, and the
//! operation aborts without touching state. The epoch and the status live
//! in one atomic word so a status write can be made conditional on the
//! epoch that observed it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lanyard_protocol::{
    ClientFrame, ProtocolError, RoomTarget, ServerFrame, UserProfile, PROTOCOL_VERSION,
};
use lanyard_room::{Connector, JoinedRoom, RoomConnection, RoomError, RoomEvent};
use rand::Rng;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::{
    EventBus, SessionConfig, SessionError, SessionEvent, SessionStatus, TokenPair, TokenSource,
    TokenStore,
};

const STATUS_BITS: u32 = 8;
const STATUS_MASK: u64 = 0xff;

/// Drives the client session: channels, credentials, status, events.
///
/// Cheap to clone; clones share one session. Typical flow:
///
/// ```text
/// connect_identity() ─→ login() ─→ join_world() ─→ ... ─→ logout()
///        │                │
///        │                └ or resume(), if a previous run left tokens
///        └ retries with backoff on its own
/// ```
///
/// All dependencies come in through [`new`](Self::new): the connector
/// decides how rooms are reached (WebSocket in production, scripted mocks
/// in tests), the store decides where tokens live.
pub struct SessionCoordinator<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for SessionCoordinator<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<C: Connector> {
    connector: C,
    config: SessionConfig,
    store: Arc<dyn TokenStore>,
    events: EventBus,

    /// Packed `(epoch << 8) | status`. See the module docs on
    /// cancellation for why these share a word.
    state: AtomicU64,

    /// Collapses concurrent refresh calls into one wire exchange.
    refresh_gate: Mutex<()>,
    refresh_generation: AtomicU64,

    /// Serializes the state-changing operations. `logout()` deliberately
    /// does not take it — it aborts the holder via the epoch instead of
    /// waiting for it.
    op_gate: Mutex<()>,

    identity: Mutex<Option<RoomConnection>>,
    world: Mutex<Option<RoomConnection>>,
}

impl<C: Connector> Inner<C> {
    fn epoch(&self) -> u64 {
        self.state.load(Ordering::Acquire) >> STATUS_BITS
    }

    fn snapshot(&self) -> (u64, SessionStatus) {
        let state = self.state.load(Ordering::Acquire);
        (
            state >> STATUS_BITS,
            SessionStatus::from_u8((state & STATUS_MASK) as u8),
        )
    }

    fn guard(&self, epoch: u64) -> Result<(), SessionError> {
        if self.epoch() == epoch {
            Ok(())
        } else {
            Err(SessionError::Aborted)
        }
    }

    /// Sets the status iff the epoch still matches. Returns `false` when
    /// a logout got there first.
    fn set_status_if(&self, epoch: u64, status: SessionStatus) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current >> STATUS_BITS != epoch {
                return false;
            }
            let next = (epoch << STATUS_BITS) | status as u64;
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    tracing::debug!(
                        from = %SessionStatus::from_u8((current & STATUS_MASK) as u8),
                        to = %status,
                        "session status"
                    );
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Like [`set_status_if`](Self::set_status_if), but also requires the
    /// current status to be `from`.
    fn transition_if(&self, epoch: u64, from: SessionStatus, to: SessionStatus) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current >> STATUS_BITS != epoch || current & STATUS_MASK != from as u64 {
                return false;
            }
            let next = (epoch << STATUS_BITS) | to as u64;
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    tracing::debug!(from = %from, to = %to, "session status");
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Logout entry point: bumps the epoch and lands on `Anonymous` in
    /// one atomic step, so no in-flight operation can write a status
    /// afterwards.
    fn reset_for_logout(&self) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let next =
                ((current >> STATUS_BITS) + 1) << STATUS_BITS | SessionStatus::Anonymous as u64;
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

impl<C: Connector> SessionCoordinator<C> {
    /// Creates a coordinator from its dependencies. The config is
    /// validated (degenerate values clamped) on the way in.
    pub fn new(connector: C, store: Arc<dyn TokenStore>, config: SessionConfig) -> Self {
        let config = config.validated();
        let events = EventBus::new(config.event_capacity);
        Self {
            inner: Arc::new(Inner {
                connector,
                config,
                store,
                events,
                state: AtomicU64::new(SessionStatus::Anonymous as u64),
                refresh_gate: Mutex::new(()),
                refresh_generation: AtomicU64::new(0),
                op_gate: Mutex::new(()),
                identity: Mutex::new(None),
                world: Mutex::new(None),
            }),
        }
    }

    /// Current position in the session lifecycle.
    pub fn status(&self) -> SessionStatus {
        self.inner.snapshot().1
    }

    /// The cached user profile, if a session is (or was) logged in.
    pub fn user(&self) -> Option<UserProfile> {
        self.inner.store.user()
    }

    /// Subscribes to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// A handle to the event bus itself, for code that wants to hold one.
    pub fn events(&self) -> EventBus {
        self.inner.events.clone()
    }

    /// Latest measured identity-channel round trip, if one completed.
    pub async fn identity_rtt_ms(&self) -> Option<u64> {
        self.inner
            .identity
            .lock()
            .await
            .as_ref()
            .and_then(|conn| conn.rtt_ms())
    }

    /// Opens the identity channel.
    ///
    /// Valid from `anonymous` and `degraded`. On success the session sits
    /// in `awaiting_credentials`, ready for [`login`](Self::login) or
    /// [`resume`](Self::resume). If the store already holds tokens, the
    /// join advertises the access token so the room can rebind the
    /// channel to the existing identity.
    ///
    /// Connect failures are retried with exponential backoff and jitter
    /// (see [`SessionConfig::reconnect_base_delay`]); when the attempts
    /// run out the session goes `degraded`, a
    /// [`SessionEvent::ConnectionFailed`] is published, and the last
    /// error is returned. A rejection from the room is not retried —
    /// dialing again with the same join would only be rejected again.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] — called while connected.
    /// - [`SessionError::Aborted`] — a logout cut the attempt short.
    /// - [`SessionError::Room`] — the final connect failure.
    pub async fn connect_identity(&self) -> Result<(), SessionError> {
        let _op = self.inner.op_gate.lock().await;
        let (epoch, status) = self.inner.snapshot();
        if !matches!(status, SessionStatus::Anonymous | SessionStatus::Degraded) {
            return Err(SessionError::InvalidState { status });
        }
        if !self.inner.set_status_if(epoch, SessionStatus::ConnectingIdentity) {
            return Err(SessionError::Aborted);
        }

        let mut attempt: u32 = 0;
        let joined = loop {
            match open_identity(&self.inner).await {
                Ok(joined) => {
                    if self.inner.epoch() != epoch {
                        joined.connection.close().await;
                        return Err(SessionError::Aborted);
                    }
                    break joined;
                }
                Err(e) => {
                    if self.inner.epoch() != epoch {
                        return Err(SessionError::Aborted);
                    }
                    let retryable =
                        matches!(&e, SessionError::Room(room) if room.is_retryable());
                    if !retryable || attempt >= self.inner.config.reconnect_max_attempts {
                        self.inner.set_status_if(epoch, SessionStatus::Degraded);
                        self.inner.events.publish(SessionEvent::ConnectionFailed {
                            target: RoomTarget::Identity,
                        });
                        return Err(e);
                    }
                    let delay = backoff_delay(&self.inner.config, attempt);
                    attempt += 1;
                    tracing::warn!(attempt, ?delay, error = %e, "identity connect failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        };

        let JoinedRoom {
            connection,
            events,
            session_id,
            ..
        } = joined;
        {
            let mut slot = self.inner.identity.lock().await;
            if self.inner.epoch() != epoch {
                drop(slot);
                connection.close().await;
                return Err(SessionError::Aborted);
            }
            *slot = Some(connection);
        }
        tokio::spawn(supervise_identity(Arc::clone(&self.inner), events, epoch));
        if !self.inner.set_status_if(epoch, SessionStatus::AwaitingCredentials) {
            return Err(SessionError::Aborted);
        }
        tracing::info!(%session_id, "identity channel ready");
        Ok(())
    }

    /// Exchanges credentials for a session.
    ///
    /// On success the token pair is stored (as one unit), the profile is
    /// cached, the status moves to `authenticated`, and
    /// [`SessionEvent::Authenticated`] is published. On rejection the
    /// status stays `awaiting_credentials` and
    /// [`SessionEvent::LoginFailed`] carries the server's error code —
    /// the UI shows it and the user tries again.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] — called anywhere but
    ///   `awaiting_credentials`: no identity channel yet, or a session
    ///   is already active. Switching accounts means logging out first.
    /// - [`SessionError::Credential`] — the server rejected the login.
    /// - [`SessionError::Room`] — the channel failed mid-exchange.
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<UserProfile, SessionError> {
        let _op = self.inner.op_gate.lock().await;
        let (epoch, status) = self.inner.snapshot();
        if !status.can_login() {
            return Err(SessionError::InvalidState { status });
        }
        let identity = self.identity_conn().await?;

        tracing::info!(identifier, "logging in");
        let reply = identity
            .request(|cid| ClientFrame::Login {
                cid,
                identifier: identifier.to_string(),
                secret: secret.to_string(),
            })
            .await?;

        match reply {
            ServerFrame::LoginOk {
                user,
                access_token,
                refresh_token,
                ..
            } => {
                self.inner.guard(epoch)?;
                self.inner
                    .store
                    .set_tokens(TokenPair::new(access_token, refresh_token));
                self.inner.store.set_user(user.clone());
                if !self.inner.set_status_if(epoch, SessionStatus::Authenticated) {
                    // The epoch moved between the guard and the status
                    // write: a logout already wiped the store, and the
                    // pair we just wrote must not outlive it.
                    self.inner.store.clear();
                    return Err(SessionError::Aborted);
                }
                tracing::info!(user = %user.id, "login succeeded");
                self.inner
                    .events
                    .publish(SessionEvent::Authenticated { user: user.clone() });
                Ok(user)
            }
            ServerFrame::RequestFailed { code, message, .. } => {
                self.inner.guard(epoch)?;
                tracing::warn!(%code, "login rejected");
                self.inner.events.publish(SessionEvent::LoginFailed {
                    code: code.clone(),
                    message: message.clone(),
                });
                Err(SessionError::Credential { code, message })
            }
            other => Err(unexpected_frame(&other)),
        }
    }

    /// Resumes a previous session from the stored refresh token, skipping
    /// the credential prompt.
    ///
    /// Runs one refresh exchange to rotate the pair and prove the stored
    /// session is still honored. On success this is equivalent to a
    /// login: `authenticated` status, [`SessionEvent::Authenticated`]
    /// with the cached profile. On rejection the stale session is wiped —
    /// the user logs in normally.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoStoredSession`] — nothing to resume.
    /// - [`SessionError::Credential`] — the server refused the stored
    ///   refresh token.
    pub async fn resume(&self) -> Result<UserProfile, SessionError> {
        let _op = self.inner.op_gate.lock().await;
        let (epoch, status) = self.inner.snapshot();
        if status != SessionStatus::AwaitingCredentials {
            return Err(SessionError::InvalidState { status });
        }
        let pair = self
            .inner
            .store
            .tokens()
            .ok_or(SessionError::NoStoredSession)?;
        let user = self.inner.store.user().ok_or(SessionError::NoStoredSession)?;
        let identity = self.identity_conn().await?;

        tracing::info!(user = %user.id, "resuming stored session");
        let reply = identity
            .request(|cid| ClientFrame::Refresh {
                cid,
                refresh_token: pair.refresh,
            })
            .await?;

        match reply {
            ServerFrame::RefreshOk {
                access_token,
                refresh_token,
                ..
            } => {
                self.inner.guard(epoch)?;
                self.inner
                    .store
                    .set_tokens(TokenPair::new(access_token, refresh_token));
                self.inner.refresh_generation.fetch_add(1, Ordering::AcqRel);
                if !self.inner.set_status_if(epoch, SessionStatus::Authenticated) {
                    // Same commit race as in login: the losing write has
                    // to be taken back out of the store.
                    self.inner.store.clear();
                    return Err(SessionError::Aborted);
                }
                self.inner
                    .events
                    .publish(SessionEvent::Authenticated { user: user.clone() });
                Ok(user)
            }
            ServerFrame::RequestFailed { code, message, .. } => {
                self.inner.guard(epoch)?;
                tracing::warn!(%code, "stored session refused, clearing it");
                self.inner.store.clear();
                self.inner.events.publish(SessionEvent::LoginFailed {
                    code: code.clone(),
                    message: message.clone(),
                });
                Err(SessionError::Credential { code, message })
            }
            other => Err(unexpected_frame(&other)),
        }
    }

    /// Rotates the token pair, collapsing concurrent callers into a
    /// single wire exchange.
    ///
    /// The first caller performs the refresh; callers that arrive while
    /// it is in flight wait for it and return the token it produced. A
    /// rejected refresh means the session is dead: the store is wiped,
    /// the world channel (if any) is torn down, the status falls back to
    /// `awaiting_credentials`, and [`SessionEvent::AuthExpired`] tells
    /// the UI to ask for credentials again.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoStoredSession`] — no pair to rotate.
    /// - [`SessionError::Credential`] — the server refused the refresh
    ///   token; the session has been expired locally.
    pub async fn refresh_tokens(&self) -> Result<String, SessionError> {
        let (epoch, _) = self.inner.snapshot();
        let generation = self.inner.refresh_generation.load(Ordering::Acquire);
        let _flight = self.inner.refresh_gate.lock().await;
        if self.inner.refresh_generation.load(Ordering::Acquire) != generation {
            // Someone else rotated the pair while we queued; theirs is
            // fresh enough.
            return self
                .inner
                .store
                .tokens()
                .map(|pair| pair.access)
                .ok_or(SessionError::NoStoredSession);
        }

        let pair = self
            .inner
            .store
            .tokens()
            .ok_or(SessionError::NoStoredSession)?;
        let identity = self.identity_conn().await?;

        tracing::debug!("refreshing token pair");
        let reply = identity
            .request(|cid| ClientFrame::Refresh {
                cid,
                refresh_token: pair.refresh,
            })
            .await?;

        match reply {
            ServerFrame::RefreshOk {
                access_token,
                refresh_token,
                ..
            } => {
                self.inner
                    .store
                    .set_tokens(TokenPair::new(access_token.clone(), refresh_token));
                // Checked after the write on purpose: a logout that raced
                // this refresh has already cleared the store, and the
                // rotated pair must not repopulate it.
                if self.inner.guard(epoch).is_err() {
                    self.inner.store.clear();
                    return Err(SessionError::Aborted);
                }
                self.inner.refresh_generation.fetch_add(1, Ordering::AcqRel);
                Ok(access_token)
            }
            ServerFrame::RequestFailed { code, message, .. } => {
                self.inner.guard(epoch)?;
                tracing::warn!(%code, "refresh rejected, expiring session");
                self.expire_session(epoch).await;
                Err(SessionError::Credential { code, message })
            }
            other => Err(unexpected_frame(&other)),
        }
    }

    /// Joins the world room via the two-phase ticket handoff.
    ///
    /// Phase one asks the identity room to stamp a one-time ticket (the
    /// world room never sees the real credentials). Phase two opens the
    /// world channel with that ticket. Only when the world room accepts
    /// does the status reach `in_world` and [`SessionEvent::WorldJoined`]
    /// fire with the lobby snapshot.
    ///
    /// Any failure in either phase puts the status back to
    /// `authenticated` — the session is fine, only the world attempt
    /// failed, and calling again mints a fresh ticket.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] — not `authenticated` (including
    ///   already being in the world).
    /// - [`SessionError::Credential`] — the identity room refused to
    ///   stamp a ticket.
    /// - [`SessionError::Room`] — the world room refused the ticket or
    ///   the channel failed.
    pub async fn join_world(&self) -> Result<(), SessionError> {
        let _op = self.inner.op_gate.lock().await;
        let (epoch, status) = self.inner.snapshot();
        if status != SessionStatus::Authenticated {
            return Err(SessionError::InvalidState { status });
        }
        let identity = self.identity_conn().await?;
        if !self.inner.set_status_if(epoch, SessionStatus::JoiningWorld) {
            return Err(SessionError::Aborted);
        }

        // Phase one: the identity room stamps a one-time world ticket.
        let ticket = match identity
            .request(|cid| ClientFrame::TicketRequest { cid })
            .await
        {
            Ok(ServerFrame::TicketOk { ticket, user, .. }) => {
                self.inner.guard(epoch)?;
                // The ticket reply carries the profile; keep the cache
                // current.
                self.inner.store.set_user(user);
                ticket
            }
            Ok(ServerFrame::RequestFailed { code, message, .. }) => {
                self.inner.set_status_if(epoch, SessionStatus::Authenticated);
                return Err(SessionError::Credential { code, message });
            }
            Ok(other) => {
                self.inner.set_status_if(epoch, SessionStatus::Authenticated);
                return Err(unexpected_frame(&other));
            }
            Err(e) => {
                self.inner.set_status_if(epoch, SessionStatus::Authenticated);
                return Err(e.into());
            }
        };

        // Phase two: hand the ticket to the world room.
        let joined = match RoomConnection::open(
            &self.inner.connector,
            RoomTarget::World,
            &self.inner.config.world_endpoint,
            ClientFrame::JoinWorld { ticket },
            &self.inner.config.room,
        )
        .await
        {
            Ok(joined) => joined,
            Err(e) => {
                self.inner.set_status_if(epoch, SessionStatus::Authenticated);
                return Err(SessionError::Room(e));
            }
        };

        let JoinedRoom {
            connection,
            events,
            lobby,
            ..
        } = joined;
        {
            let mut slot = self.inner.world.lock().await;
            if self.inner.epoch() != epoch {
                drop(slot);
                connection.close().await;
                return Err(SessionError::Aborted);
            }
            *slot = Some(connection);
        }
        if !self.inner.set_status_if(epoch, SessionStatus::InWorld) {
            return Err(SessionError::Aborted);
        }
        tokio::spawn(watch_world(Arc::clone(&self.inner), events, epoch));
        tracing::info!("world joined");
        self.inner
            .events
            .publish(SessionEvent::WorldJoined { lobby });
        Ok(())
    }

    /// Ends the session. Safe to call from any state, including with
    /// operations in flight — they abort instead of committing.
    ///
    /// Sends a best-effort logout notice on the identity channel, closes
    /// both channels, wipes the token store, and publishes
    /// [`SessionEvent::LoggedOut`]. Local teardown does not depend on the
    /// server acknowledging anything.
    pub async fn logout(&self) {
        self.inner.reset_for_logout();
        tracing::info!("logging out");

        if let Some(identity) = self.inner.identity.lock().await.take() {
            let _ = identity.send(ClientFrame::Logout);
            identity.close().await;
        }
        if let Some(world) = self.inner.world.lock().await.take() {
            world.close().await;
        }
        self.inner.store.clear();
        self.inner.events.publish(SessionEvent::LoggedOut);
    }

    async fn identity_conn(&self) -> Result<RoomConnection, SessionError> {
        self.inner
            .identity
            .lock()
            .await
            .clone()
            .ok_or(SessionError::ChannelDown)
    }

    /// Local session expiry: the stored credentials are no longer
    /// honored. Empties the world slot before closing so the watcher
    /// treats the close as deliberate.
    async fn expire_session(&self, epoch: u64) {
        self.inner.store.clear();
        self.inner.set_status_if(epoch, SessionStatus::AwaitingCredentials);
        if let Some(world) = self.inner.world.lock().await.take() {
            world.close().await;
        }
        self.inner.events.publish(SessionEvent::AuthExpired);
    }
}

impl<C: Connector> TokenSource for SessionCoordinator<C> {
    fn access_token(&self) -> Option<String> {
        self.inner.store.tokens().map(|pair| pair.access)
    }

    fn refresh(
        &self,
    ) -> impl std::future::Future<Output = Result<String, SessionError>> + Send {
        let this = self.clone();
        async move { this.refresh_tokens().await }
    }
}

// ---------------------------------------------------------------------------
// Channel plumbing
// ---------------------------------------------------------------------------

async fn open_identity<C: Connector>(inner: &Inner<C>) -> Result<JoinedRoom, SessionError> {
    let join = ClientFrame::JoinIdentity {
        version: PROTOCOL_VERSION,
        access_token: inner.store.tokens().map(|pair| pair.access),
    };
    let joined = RoomConnection::open(
        &inner.connector,
        RoomTarget::Identity,
        &inner.config.identity_endpoint,
        join,
        &inner.config.room,
    )
    .await?;
    Ok(joined)
}

/// Pumps identity-channel events and reconnects the channel when it
/// drops. Lives as long as the channel keeps coming back; exits on
/// logout or when the reconnect attempts run out.
async fn supervise_identity<C: Connector>(
    inner: Arc<Inner<C>>,
    mut events: mpsc::Receiver<RoomEvent>,
    epoch: u64,
) {
    loop {
        let reason = loop {
            match events.recv().await {
                Some(RoomEvent::Frame(ServerFrame::AuthRequired { message })) => {
                    if inner.epoch() == epoch {
                        inner.events.publish(SessionEvent::AuthRequired { message });
                    }
                }
                Some(RoomEvent::Frame(frame)) => {
                    tracing::debug!(frame = frame.name(), "unhandled identity frame");
                }
                Some(RoomEvent::Closed { reason }) => break reason,
                None => break None,
            }
        };

        if inner.epoch() != epoch {
            return;
        }
        inner.identity.lock().await.take();
        tracing::warn!(?reason, "identity channel lost");
        inner.events.publish(SessionEvent::ConnectionLost {
            target: RoomTarget::Identity,
            reason,
        });

        match reconnect_identity(&inner, epoch).await {
            Some(new_events) => events = new_events,
            None => return,
        }
    }
}

/// Runs the identity backoff loop. Returns the new event stream on
/// success; on exhaustion degrades the session and returns `None`.
async fn reconnect_identity<C: Connector>(
    inner: &Arc<Inner<C>>,
    epoch: u64,
) -> Option<mpsc::Receiver<RoomEvent>> {
    for attempt in 1..=inner.config.reconnect_max_attempts {
        let delay = backoff_delay(&inner.config, attempt - 1);
        tracing::info!(attempt, ?delay, "identity reconnect scheduled");
        tokio::time::sleep(delay).await;
        if inner.epoch() != epoch {
            return None;
        }

        match open_identity(inner).await {
            Ok(joined) => {
                let JoinedRoom {
                    connection, events, ..
                } = joined;
                {
                    let mut slot = inner.identity.lock().await;
                    if inner.epoch() != epoch {
                        drop(slot);
                        connection.close().await;
                        return None;
                    }
                    *slot = Some(connection);
                }
                tracing::info!(attempt, "identity channel restored");
                inner.events.publish(SessionEvent::ConnectionRestored {
                    target: RoomTarget::Identity,
                    attempt,
                });
                return Some(events);
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "identity reconnect attempt failed");
            }
        }
    }

    if inner.epoch() == epoch {
        inner.set_status_if(epoch, SessionStatus::Degraded);
        inner.events.publish(SessionEvent::ConnectionFailed {
            target: RoomTarget::Identity,
        });
    }
    None
}

/// Pumps world-channel events. The world never reconnects on its own: a
/// fresh join needs a fresh ticket, so the fallback is `authenticated`
/// and the caller decides when to join again.
async fn watch_world<C: Connector>(
    inner: Arc<Inner<C>>,
    mut events: mpsc::Receiver<RoomEvent>,
    epoch: u64,
) {
    let reason = loop {
        match events.recv().await {
            Some(RoomEvent::Frame(ServerFrame::Event { kind, payload })) => {
                if inner.epoch() == epoch {
                    inner
                        .events
                        .publish(SessionEvent::WorldMessage { kind, payload });
                }
            }
            Some(RoomEvent::Frame(frame)) => {
                tracing::debug!(frame = frame.name(), "unhandled world frame");
            }
            Some(RoomEvent::Closed { reason }) => break reason,
            None => break None,
        }
    };

    if inner.epoch() != epoch {
        return;
    }
    // A close we initiated (logout, session expiry) empties the slot
    // first — finding the connection still there means the world died
    // out from under us.
    if inner.world.lock().await.take().is_none() {
        return;
    }
    tracing::warn!(?reason, "world channel lost");
    inner.events.publish(SessionEvent::ConnectionLost {
        target: RoomTarget::World,
        reason,
    });
    inner.transition_if(epoch, SessionStatus::InWorld, SessionStatus::Authenticated);
}

/// Exponential backoff with jitter: `base * 2^attempt`, capped, plus up
/// to a quarter of the capped delay so a fleet of clients spreads out.
fn backoff_delay(config: &SessionConfig, attempt: u32) -> Duration {
    let exp = config
        .reconnect_base_delay
        .saturating_mul(1u32 << attempt.min(16));
    let capped = exp.min(config.reconnect_max_delay);
    let jitter_cap = (capped.as_millis() as u64 / 4).max(1);
    let jitter = rand::rng().random_range(0..jitter_cap);
    capped + Duration::from_millis(jitter)
}

fn unexpected_frame(frame: &ServerFrame) -> SessionError {
    SessionError::Room(RoomError::Protocol(ProtocolError::UnexpectedFrame(
        frame.name().to_string(),
    )))
}

// =========================================================================
// Tests
// =========================================================================
