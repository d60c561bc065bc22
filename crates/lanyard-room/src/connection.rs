//! Room connections: the lifecycle wrapper around one real-time channel.
//!
//! A [`RoomConnection`] is the client's view of one logical room — either
//! the identity room or the world room. Internally it is an actor: a
//! background task owns the transport connection and multiplexes between
//! outbound commands, inbound frames, and a keep-alive timer. The handle
//! you hold is a cheap clone over a command channel plus shared state.
//!
//! Two kinds of traffic share the channel:
//!
//! - **Correlated requests** ([`RoomConnection::request`]): send a frame
//!   carrying a fresh correlation id, park a one-shot receiver in the
//!   pending map, and resolve on whichever comes first — the matching
//!   reply or the timeout. The pending entry is removed on every exit
//!   path, so repeated calls never leak handlers.
//! - **Everything else**: uncorrelated frames pushed by the room flow out
//!   the [`RoomEvent`] stream; fire-and-forget sends go in through
//!   [`RoomConnection::send`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lanyard_protocol::{ClientFrame, Codec, JsonCodec, RoomTarget, ServerFrame};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{Instant, MissedTickBehavior};

use crate::{Connection, Connector, LinkState, RoomConfig, RoomError};

/// Sentinel for "no round trip measured yet".
const RTT_UNMEASURED: u64 = u64::MAX;

// ---------------------------------------------------------------------------
// RoomEvent
// ---------------------------------------------------------------------------

/// Events a room connection surfaces outside the request/response flow.
#[derive(Debug)]
pub enum RoomEvent {
    /// An uncorrelated frame pushed by the room — notices, lobby traffic.
    Frame(ServerFrame),

    /// The channel is gone. `reason` carries the transport error text if
    /// the connection died; `None` means a clean close (either side).
    /// Always the final event on the stream.
    Closed { reason: Option<String> },
}

// ---------------------------------------------------------------------------
// RoomConnection
// ---------------------------------------------------------------------------

/// Everything a successful [`RoomConnection::open`] yields.
#[derive(Debug)]
pub struct JoinedRoom {
    /// Handle to the live connection.
    pub connection: RoomConnection,

    /// Stream of uncorrelated frames and the final close notification.
    pub events: mpsc::Receiver<RoomEvent>,

    /// The room-assigned session id from the welcome frame.
    pub session_id: String,

    /// The live lobby snapshot, present when the world room sent one.
    pub lobby: Option<serde_json::Value>,
}

#[derive(Debug)]
struct Shared {
    target: RoomTarget,
    state: AtomicU8,
    pending: Mutex<HashMap<u64, oneshot::Sender<ServerFrame>>>,
    next_cid: AtomicU64,
    rtt_ms: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: LinkState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

enum Command {
    Send(ClientFrame),
    Close(oneshot::Sender<()>),
}

/// Handle to one live room connection.
///
/// Clones share the same underlying channel. The connection task keeps
/// running until the channel closes, a local [`close`](Self::close) is
/// requested, or every handle is dropped.
#[derive(Clone, Debug)]
pub struct RoomConnection {
    shared: Arc<Shared>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    request_timeout: Duration,
}

impl RoomConnection {
    /// Dials `endpoint`, sends `join` as the first frame, and waits for
    /// the room's verdict.
    ///
    /// Resolving requires the room-defined ready signal (`welcome`) — a
    /// successfully opened socket is not enough, because the room may
    /// still refuse the join (bad ticket, version mismatch) after the
    /// transport handshake. Frames the room pushes before its welcome are
    /// forwarded on the event stream rather than lost.
    ///
    /// # Errors
    ///
    /// - [`RoomError::Transport`] — dialing or the socket failed.
    /// - [`RoomError::Rejected`] — the room refused the join.
    /// - [`RoomError::JoinTimeout`] — no verdict within
    ///   [`RoomConfig::join_timeout`].
    pub async fn open<C: Connector>(
        connector: &C,
        target: RoomTarget,
        endpoint: &str,
        join: ClientFrame,
        config: &RoomConfig,
    ) -> Result<JoinedRoom, RoomError> {
        let deadline = Instant::now() + config.join_timeout;
        let codec = JsonCodec;

        let mut conn = match tokio::time::timeout_at(deadline, connector.connect(endpoint)).await
        {
            Ok(result) => result?,
            Err(_) => return Err(RoomError::JoinTimeout),
        };
        conn.send(&codec.encode(&join)?).await?;

        // Wait for the ready signal, buffering anything that outruns it.
        let mut early = Vec::new();
        let (session_id, lobby) = loop {
            let bytes = match tokio::time::timeout_at(deadline, conn.recv()).await {
                Ok(Ok(Some(bytes))) => bytes,
                Ok(Ok(None)) => return Err(RoomError::ConnectionClosed),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    let _ = conn.close().await;
                    return Err(RoomError::JoinTimeout);
                }
            };
            match codec.decode::<ServerFrame>(&bytes)? {
                ServerFrame::Welcome { session_id, lobby } => break (session_id, lobby),
                ServerFrame::Reject { code, message } => {
                    let _ = conn.close().await;
                    return Err(RoomError::Rejected { code, message });
                }
                other => early.push(other),
            }
        };

        tracing::info!(%target, conn = %conn.id(), %session_id, "room joined");

        let shared = Arc::new(Shared {
            target,
            state: AtomicU8::new(LinkState::Open as u8),
            pending: Mutex::new(HashMap::new()),
            next_cid: AtomicU64::new(1),
            rtt_ms: AtomicU64::new(RTT_UNMEASURED),
        });
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::channel(config.event_buffer);

        for frame in early {
            let _ = event_tx.try_send(RoomEvent::Frame(frame));
        }

        tokio::spawn(run_connection(
            conn,
            Arc::clone(&shared),
            cmd_rx,
            event_tx,
            config.ping_interval,
        ));

        Ok(JoinedRoom {
            connection: Self {
                shared,
                cmd_tx,
                request_timeout: config.request_timeout,
            },
            events,
            session_id,
            lobby,
        })
    }

    /// The logical room this connection is bound to.
    pub fn target(&self) -> RoomTarget {
        self.shared.target
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        LinkState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Latest measured round-trip time, if a ping has completed.
    pub fn rtt_ms(&self) -> Option<u64> {
        match self.shared.rtt_ms.load(Ordering::Relaxed) {
            RTT_UNMEASURED => None,
            rtt => Some(rtt),
        }
    }

    /// Sends a fire-and-forget frame.
    ///
    /// # Errors
    /// Returns [`RoomError::ConnectionClosed`] if the connection task has
    /// already exited.
    pub fn send(&self, frame: ClientFrame) -> Result<(), RoomError> {
        self.cmd_tx
            .send(Command::Send(frame))
            .map_err(|_| RoomError::ConnectionClosed)
    }

    /// Performs one correlated request/response exchange.
    ///
    /// `build` receives a freshly allocated correlation id and returns the
    /// request frame carrying it. The future resolves with the reply frame
    /// bearing the same id — the caller matches the concrete variant it
    /// expects (success or failure are both "replies" here).
    ///
    /// # Errors
    ///
    /// - [`RoomError::RequestTimeout`] — no reply within
    ///   [`RoomConfig::request_timeout`]; the pending entry is removed, so
    ///   a late reply is logged and dropped rather than delivered to a
    ///   future call.
    /// - [`RoomError::ConnectionClosed`] — the connection ended before the
    ///   reply arrived.
    pub async fn request(
        &self,
        build: impl FnOnce(u64) -> ClientFrame,
    ) -> Result<ServerFrame, RoomError> {
        let cid = self.shared.next_cid.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.shared.pending.lock().await.insert(cid, reply_tx);

        if self.cmd_tx.send(Command::Send(build(cid))).is_err() {
            self.shared.pending.lock().await.remove(&cid);
            return Err(RoomError::ConnectionClosed);
        }

        match tokio::time::timeout(self.request_timeout, reply_rx).await {
            Ok(Ok(frame)) => Ok(frame),
            // Sender dropped: the connection closed and drained the map.
            Ok(Err(_)) => Err(RoomError::ConnectionClosed),
            Err(_) => {
                self.shared.pending.lock().await.remove(&cid);
                tracing::debug!(target = %self.shared.target, cid, "request timed out");
                Err(RoomError::RequestTimeout)
            }
        }
    }

    /// Closes the connection and waits for teardown to finish.
    ///
    /// Every pending request fails with [`RoomError::ConnectionClosed`],
    /// and the event stream ends with [`RoomEvent::Closed`]. Calling this
    /// on an already-closed connection is a no-op.
    pub async fn close(&self) {
        self.shared.set_state(LinkState::Closing);
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Close(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

async fn run_connection<T: Connection>(
    mut conn: T,
    shared: Arc<Shared>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::Sender<RoomEvent>,
    ping_interval: Duration,
) {
    let codec = JsonCodec;
    let started = Instant::now();
    let mut ping = tokio::time::interval_at(started + ping_interval, ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut close_reason: Option<String> = None;
    let mut close_ack: Option<oneshot::Sender<()>> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send(frame)) => {
                    let bytes = match codec.encode(&frame) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            tracing::warn!(target = %shared.target, error = %e, "dropping unencodable frame");
                            continue;
                        }
                    };
                    if let Err(e) = conn.send(&bytes).await {
                        close_reason = Some(e.to_string());
                        break;
                    }
                }
                Some(Command::Close(ack)) => {
                    close_ack = Some(ack);
                    let _ = conn.close().await;
                    break;
                }
                // Every handle dropped; tear down quietly.
                None => {
                    let _ = conn.close().await;
                    break;
                }
            },

            incoming = conn.recv() => match incoming {
                Ok(Some(bytes)) => match codec.decode::<ServerFrame>(&bytes) {
                    Ok(ServerFrame::Pong { sent_at_ms }) => {
                        let now_ms = started.elapsed().as_millis() as u64;
                        let rtt = now_ms.saturating_sub(sent_at_ms);
                        shared.rtt_ms.store(rtt, Ordering::Relaxed);
                    }
                    Ok(frame) => route_frame(&shared, &event_tx, frame).await,
                    Err(e) => {
                        tracing::warn!(target = %shared.target, error = %e, "dropping undecodable frame");
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    close_reason = Some(e.to_string());
                    break;
                }
            },

            _ = ping.tick() => {
                let frame = ClientFrame::Ping {
                    sent_at_ms: started.elapsed().as_millis() as u64,
                };
                match codec.encode(&frame) {
                    Ok(bytes) => {
                        if let Err(e) = conn.send(&bytes).await {
                            close_reason = Some(e.to_string());
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(target = %shared.target, error = %e, "failed to encode ping");
                    }
                }
            }
        }
    }

    shared.set_state(if close_reason.is_some() {
        LinkState::Errored
    } else {
        LinkState::Closed
    });

    // Fail every waiter: dropping the one-shot senders wakes each pending
    // request with a closed-channel error.
    let dropped = {
        let mut pending = shared.pending.lock().await;
        let n = pending.len();
        pending.clear();
        n
    };
    if dropped > 0 {
        tracing::debug!(target = %shared.target, dropped, "failed pending requests on close");
    }

    let _ = event_tx
        .send(RoomEvent::Closed {
            reason: close_reason.clone(),
        })
        .await;
    if let Some(ack) = close_ack {
        let _ = ack.send(());
    }

    tracing::info!(target = %shared.target, reason = ?close_reason, "room connection closed");
}

async fn route_frame(shared: &Shared, event_tx: &mpsc::Sender<RoomEvent>, frame: ServerFrame) {
    if let Some(cid) = frame.correlation_id() {
        match shared.pending.lock().await.remove(&cid) {
            // The waiter may have timed out between routing and delivery;
            // a failed send here is the same as a late reply.
            Some(reply_tx) => {
                let _ = reply_tx.send(frame);
            }
            None => {
                tracing::debug!(target = %shared.target, cid, frame = frame.name(), "late reply dropped");
            }
        }
        return;
    }

    if let Err(e) = event_tx.try_send(RoomEvent::Frame(frame)) {
        tracing::warn!(target = %shared.target, error = %e, "event stream full, dropping frame");
    }
}

// =========================================================================
// Tests
// =========================================================================
