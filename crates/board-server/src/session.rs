//! Per-connection push session.
//!
//! Lifecycle of one websocket subscriber:
//!
//! ```text
//! Connecting --register--> Active --(client close | write failure |
//!                                    dropped by broadcaster | shutdown)--> Closed
//! ```
//!
//! While active, two halves run side by side:
//! - writer: outbound queue -> socket, each write bounded by `send_timeout`,
//!   frames not newer than the last one written are skipped, and so are
//!   frames whose version was issued before the subscriber registered;
//! - reader: discards client messages, watches for Close or EOF.
//!
//! Whichever half ends first ends the session. The subscriber is removed
//! from the registry exactly once, on the way to `Closed`.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::DeliveryError;
use crate::state::AppState;
use crate::types::{OutboundRx, SnapshotFrame, SubscriberId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active(SubscriberId),
    Closed,
}

/// State holder for one connection.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Session {
            state: SessionState::Connecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `Connecting -> Active`. Ignored in any other state.
    pub fn activate(&mut self, id: SubscriberId) -> bool {
        match self.state {
            SessionState::Connecting => {
                self.state = SessionState::Active(id);
                true
            }
            _ => false,
        }
    }

    /// Move to `Closed`. Returns the subscriber id only on the first call
    /// from `Active`, so the caller unregisters it once.
    pub fn close(&mut self) -> Option<SubscriberId> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Active(id) => Some(id),
            _ => None,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    ClientClosed,
    ReadFailed,
    WriteFailed,
    Dropped,
    Shutdown,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionEnd::ClientClosed => "client closed",
            SessionEnd::ReadFailed => "read failed",
            SessionEnd::WriteFailed => "write failed",
            SessionEnd::Dropped => "dropped by broadcaster",
            SessionEnd::Shutdown => "server shutting down",
        };
        f.write_str(s)
    }
}

/// Versions at or below the floor are stale for this subscriber.
///
/// The floor starts at the last version issued before registration, so a
/// snapshot read before the client joined is never written to it, even
/// when its own initial snapshot could not be produced.
#[derive(Debug, Clone, Copy)]
struct VersionFloor(u64);

impl VersionFloor {
    /// Accept `version` and raise the floor to it, or reject it as stale.
    fn admit(&mut self, version: u64) -> bool {
        if version <= self.0 {
            return false;
        }
        self.0 = version;
        true
    }
}

/// Run one upgraded websocket until it closes.
pub async fn run_session(socket: WebSocket, state: Arc<AppState>) {
    let mut session = Session::new();
    let send_timeout = state.config.send_timeout();
    let (mut sink, mut stream) = socket.split();

    let (id, rx) = match state.registry.register().await {
        Ok(registered) => registered,
        Err(e) => {
            warn!(error = %e, "refusing subscriber");
            let frame = CloseFrame {
                code: close_code::AGAIN,
                reason: Cow::Owned(e.to_string()),
            };
            let _ = timeout(send_timeout, sink.send(Message::Close(Some(frame)))).await;
            session.close();
            return;
        }
    };
    session.activate(id);
    let floor = VersionFloor(state.producer.issued_version());

    // The first frame is produced after registration, so it is never
    // older than the moment this client joined.
    let initial = match state.producer.produce().await {
        Ok(snapshot) => SnapshotFrame::encode(&snapshot)
            .map_err(|e| warn!(subscriber = %id, error = %e, "failed to encode snapshot"))
            .ok(),
        Err(e) => {
            debug!(subscriber = %id, error = %e, "no initial snapshot");
            None
        }
    };

    let end = tokio::select! {
        _ = state.cancel.cancelled() => SessionEnd::Shutdown,
        end = write_loop(id, &mut sink, rx, floor, initial, send_timeout) => end,
        end = read_loop(id, &mut stream) => end,
    };

    if end != SessionEnd::WriteFailed && end != SessionEnd::ClientClosed {
        let frame = CloseFrame {
            code: close_code::AWAY,
            reason: Cow::Borrowed(""),
        };
        let _ = timeout(send_timeout, sink.send(Message::Close(Some(frame)))).await;
    }

    if let Some(id) = session.close() {
        state.registry.unregister(id).await;
        info!(subscriber = %id, reason = %end, "session closed");
    }
}

async fn write_loop(
    id: SubscriberId,
    sink: &mut SplitSink<WebSocket, Message>,
    mut rx: OutboundRx,
    mut floor: VersionFloor,
    initial: Option<SnapshotFrame>,
    send_timeout: Duration,
) -> SessionEnd {
    if let Some(frame) = initial.filter(|f| floor.admit(f.version)) {
        if let Err(e) = write_frame(id, sink, &frame, send_timeout).await {
            warn!(error = %e, "initial snapshot not delivered");
            return SessionEnd::WriteFailed;
        }
    }

    while let Some(frame) = rx.recv().await {
        if !floor.admit(frame.version) {
            debug!(subscriber = %id, version = frame.version, floor = floor.0, "skipping stale snapshot");
            continue;
        }
        if let Err(e) = write_frame(id, sink, &frame, send_timeout).await {
            warn!(error = %e, "push failed");
            return SessionEnd::WriteFailed;
        }
    }

    SessionEnd::Dropped
}

async fn write_frame(
    id: SubscriberId,
    sink: &mut SplitSink<WebSocket, Message>,
    frame: &SnapshotFrame,
    send_timeout: Duration,
) -> Result<(), DeliveryError> {
    match timeout(send_timeout, sink.send(Message::Text(frame.json.to_string()))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(DeliveryError::Write { id, source }),
        Err(_) => Err(DeliveryError::Timeout {
            id,
            after: send_timeout,
        }),
    }
}

async fn read_loop(id: SubscriberId, stream: &mut SplitStream<WebSocket>) -> SessionEnd {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(_)) => return SessionEnd::ClientClosed,
            Ok(_) => {}
            Err(e) => {
                debug!(subscriber = %id, error = %e, "read failed");
                return SessionEnd::ReadFailed;
            }
        }
    }
    SessionEnd::ClientClosed
}
