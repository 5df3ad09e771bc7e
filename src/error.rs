//! Error types for the bulletin server
//!
//! Defines application-level errors and per-recipient delivery errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and protocol
/// errors (rendered as a single response line, session stays open).
/// The `Display` text of a protocol error is what the client sees.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line codec error (fatal - broken stream)
    #[error("Line codec error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The state actor is gone (fatal - internal channel broken)
    #[error("Server is shutting down")]
    ServerClosed,

    /// Malformed arguments for a known command
    #[error("Usage: {0}")]
    Usage(&'static str),

    /// Request line longer than the codec accepts; the line is skipped
    #[error("Usage: requests are limited to {0} bytes per line.")]
    LineTooLong(usize),

    /// Message index is not a number
    #[error("Invalid message ID. Must be a number.")]
    InvalidIndex,

    /// Structured request could not be decoded
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Command requires a registered identity
    #[error("Register first with '!register [username]'.")]
    NotRegistered,

    /// Session already holds an identity
    #[error("You are already connected.")]
    AlreadyRegistered,

    /// Another live session holds the name
    #[error("Username is taken. Please choose another.")]
    NameTaken,

    /// No room with the given name
    #[error("Room {0} does not exist.")]
    RoomNotFound(String),

    /// Identity is not a participant of the room
    #[error("You are not a participant of {0}.")]
    NotAMember(String),

    /// Public board index out of range
    #[error("Message ID not found.")]
    NotFound,

    /// Room log index out of range
    #[error("Message ID not found in {0}.")]
    RoomMessageNotFound(String),

    /// Unknown command token
    #[error("Unrecognized command. Use '!help' for assistance.")]
    UnrecognizedCommand,
}

impl AppError {
    /// Whether this error must terminate the session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Io(_) | AppError::Codec(_) | AppError::ServerClosed
        )
    }
}

/// Per-recipient delivery errors
///
/// Raised when a notification cannot be queued for one recipient.
/// Never surfaced to the sender of the notification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient's outbound queue is full (slow reader)
    #[error("Outbound queue full")]
    QueueFull,
    /// The recipient's writer has gone away
    #[error("Channel closed")]
    Closed,
}
