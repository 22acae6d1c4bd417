//! board-protocol
//!
//! Wire-level encoding/decoding for the leaderboard service.
//!
//! This crate turns logical leaderboard values (`board_core::ScoreEntry`,
//! `RankingSnapshot`) into bytes and back again.
//!
//! - [`json_codec`]    : HTTP request bodies and push-channel payloads
//! - [`resp`]          : RESP frames spoken by the external ordered-set store
//! - [`ranking_codec`] : store replies / watch pushes → ranked entries
//! - [`wire_types`]    : store command vocabulary

pub mod error;
pub mod json_codec;
pub mod ranking_codec;
pub mod resp;
pub mod wire_types;

pub use error::ProtocolError;
pub use json_codec::{decode_snapshot, encode_snapshot, parse_update};
pub use ranking_codec::{decode_ranking, decode_watch_frame, WatchFrame};
pub use resp::{decode_frame, encode_value, Command, RespValue};
