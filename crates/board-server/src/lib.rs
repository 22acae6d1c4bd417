//! board-server
//!
//! Live leaderboard server: scores arrive over HTTP, the ranked top-K is
//! pushed to every websocket subscriber whenever it may have changed.

pub mod broadcaster;
pub mod change;
pub mod config;
pub mod error;
pub mod http;
pub mod producer;
pub mod registry;
pub mod server;
pub mod state;
pub mod store;
pub mod types;

// internal, not re-exported
mod session;
