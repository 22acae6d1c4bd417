//! RESP-backed store (Redis / DiceDB compatible).
//!
//! Commands go over one shared connection guarded by an async mutex,
//! opened on first use. Any failure other than a rejected command drops
//! the connection; the next call reconnects. Calls are never retried here.
//!
//! Watching uses a dedicated connection per subscription, since a
//! connection in watch mode only receives pushes.

use std::time::Duration;

use async_trait::async_trait;
use board_core::ScoreEntry;
use board_protocol::wire_types::{zadd, zrange_top, zrange_watch};
use board_protocol::{decode_ranking, decode_watch_frame, Command, ProtocolError, RespValue, WatchFrame};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::change::{Change, ChangeSource};
use crate::error::{ChangeError, StoreError};

use super::connection::RespConnection;
use super::ScoreStore;

pub struct RespStore {
    addr: String,
    io_timeout: Duration,
    conn: Mutex<Option<RespConnection>>,
}

impl RespStore {
    pub fn new(addr: impl Into<String>, io_timeout: Duration) -> Self {
        RespStore {
            addr: addr.into(),
            io_timeout,
            conn: Mutex::new(None),
        }
    }

    async fn request(&self, cmd: &Command) -> Result<RespValue, StoreError> {
        let mut guard = self.conn.lock().await;

        if guard.is_none() {
            *guard = Some(RespConnection::connect(&self.addr, self.io_timeout).await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(StoreError::Closed);
        };

        let result = conn.request(cmd).await;
        if let Err(e) = &result {
            if e.poisons_connection() {
                warn!(addr = %self.addr, error = %e, "dropping store connection");
                *guard = None;
            }
        }
        result
    }
}

#[async_trait]
impl ScoreStore for RespStore {
    async fn upsert(&self, key: &str, entry: &ScoreEntry) -> Result<(), StoreError> {
        match self.request(&zadd(key, entry)).await? {
            RespValue::Integer(_) => Ok(()),
            other => Err(ProtocolError::UnexpectedReply(format!(
                "ZADD answered with {}",
                other.kind()
            ))
            .into()),
        }
    }

    async fn top(&self, key: &str, k: usize) -> Result<Vec<ScoreEntry>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let reply = self.request(&zrange_top(key, k)).await?;
        Ok(decode_ranking(&reply)?)
    }

    async fn watch(&self, key: &str, k: usize) -> Result<Box<dyn ChangeSource>, StoreError> {
        let mut watch = RespWatch {
            addr: self.addr.clone(),
            io_timeout: self.io_timeout,
            command: zrange_watch(key, k),
            conn: None,
            pending: None,
        };
        watch.subscribe().await?;
        Ok(Box::new(watch))
    }

    fn name(&self) -> &'static str {
        "resp"
    }
}

/// Push-driven change source on a dedicated watch connection.
struct RespWatch {
    addr: String,
    io_timeout: Duration,
    command: Command,
    conn: Option<RespConnection>,
    /// Ranking that arrived as the subscription's first reply.
    pending: Option<Vec<ScoreEntry>>,
}

impl RespWatch {
    /// Open a connection, issue the watch command and wait (bounded) for
    /// the store to accept it.
    ///
    /// An error reply means the store cannot watch this query.
    async fn subscribe(&mut self) -> Result<(), StoreError> {
        let mut conn = RespConnection::connect(&self.addr, self.io_timeout).await?;
        conn.send(&self.command).await?;

        let io_timeout = self.io_timeout;
        let first = timeout(io_timeout, conn.read_frame())
            .await
            .map_err(|_| StoreError::Timeout(io_timeout))??;

        match first {
            RespValue::Error(msg) => {
                warn!(addr = %self.addr, command = %self.command.name(), error = %msg, "watch refused");
                return Err(StoreError::Rejected(msg));
            }
            frame => match decode_watch_frame(&frame)? {
                WatchFrame::Ack => {}
                WatchFrame::Update(entries) => self.pending = Some(entries),
            },
        }

        info!(addr = %self.addr, command = %self.command.name(), "watch subscribed");
        self.conn = Some(conn);
        Ok(())
    }
}

#[async_trait]
impl ChangeSource for RespWatch {
    async fn next_change(&mut self) -> Result<Change, ChangeError> {
        loop {
            if self.conn.is_none() {
                self.subscribe().await?;
            }
            if let Some(entries) = self.pending.take() {
                return Ok(Change::Ranked(entries));
            }
            let Some(conn) = self.conn.as_mut() else {
                return Err(StoreError::Closed.into());
            };

            let frame = match conn.read_frame().await {
                Ok(RespValue::Error(msg)) => {
                    self.conn = None;
                    return Err(StoreError::Rejected(msg).into());
                }
                Ok(frame) => frame,
                Err(e) => {
                    self.conn = None;
                    return Err(e.into());
                }
            };

            match decode_watch_frame(&frame)? {
                WatchFrame::Ack => {
                    debug!(addr = %self.addr, "watch acknowledged");
                    continue;
                }
                WatchFrame::Update(entries) => return Ok(Change::Ranked(entries)),
            }
        }
    }

    fn describe(&self) -> &'static str {
        "resp-watch"
    }
}
