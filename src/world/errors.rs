use thiserror::Error;

use super::types::RoomId;

/// Errors that can arise while building or mutating the shared world.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Wrapper around IO errors (reading seed files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around serde_json errors while decoding world seeds.
    #[error("world seed parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The world definition failed load-time validation.
    #[error("invalid world definition: {0}")]
    InvalidWorld(String),

    /// A room id that is not part of the loaded world.
    #[error("unknown room: {0}")]
    UnknownRoom(RoomId),

    /// A room was asked for a random exit but every exit is the sentinel.
    #[error("room {0} has no valid exits")]
    NoValidExit(RoomId),

    /// Giver does not hold enough whole-unit tokens for the transfer.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u32, available: u32 },

    /// A player tried to pay themselves.
    #[error("cannot transfer money to yourself")]
    SelfTransfer,

    /// Zero-amount transfers are rejected.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// No connected player matched the given name.
    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("name already in use: {0}")]
    NameTaken(String),

    #[error("world is full ({0} sessions)")]
    WorldFull(usize),
}
