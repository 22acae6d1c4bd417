//! Error taxonomy for the server.
//!
//! - [`StoreError`]: the external ordered set is unavailable or refused a
//!   command. Surfaces as 500 on `/update`, never retried automatically.
//! - [`DeliveryError`]: one subscriber's push failed or timed out. Contained
//!   to that subscriber, which is removed.
//! - [`ChangeError`]: a trigger source failed, either because the store did
//!   (`Store`) or because a notification payload was malformed (`Protocol`,
//!   that cycle is skipped).
//! - [`ApiError`]: what the HTTP layer reports to callers.
//!
//! `ValidationError` lives in `board_core`, `ProtocolError` in
//! `board_protocol`.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use board_core::ValidationError;
use board_protocol::ProtocolError;
use thiserror::Error;

use crate::types::SubscriberId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("store rejected command: {0}")]
    Rejected(String),

    #[error("malformed store reply: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("store closed the connection")]
    Closed,

    #[error("store does not support watching keys")]
    WatchUnsupported,
}

impl StoreError {
    /// Whether the connection that produced this error must be discarded.
    ///
    /// A rejected command leaves the connection in a known state; anything
    /// else may have left a reply in flight.
    pub fn poisons_connection(&self) -> bool {
        !matches!(self, StoreError::Rejected(_) | StoreError::WatchUnsupported)
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("subscriber {0} is gone")]
    Closed(SubscriberId),

    #[error("subscriber {0} has a full queue")]
    Lagging(SubscriberId),

    #[error("subscriber {id} did not accept the snapshot within {after:?}")]
    Timeout { id: SubscriberId, after: Duration },

    #[error("write to subscriber {id} failed: {source}")]
    Write {
        id: SubscriberId,
        #[source]
        source: axum::Error,
    },
}

#[derive(Debug, Error)]
pub enum ChangeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed change notification: {0}")]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("subscriber limit of {max} reached")]
    Full { max: usize },

    #[error("registry is closed")]
    Closed,
}

/// Error returned from HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
