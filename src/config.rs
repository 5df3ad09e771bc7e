//! Server configuration
//!
//! `ServerConfig` carries everything the listener and sessions need. The
//! binary fills it from command-line flags; tests build it directly.

use std::time::Duration;

use clap::ValueEnum;

use crate::command::Pending;
use crate::error::AppError;
use crate::message::Outbound;

/// Default bind address
pub const DEFAULT_ADDR: &str = "127.0.0.1:4040";

/// Rooms provisioned at startup when none are configured
pub const DEFAULT_ROOM_COUNT: usize = 5;

/// Longest accepted request line, in bytes
pub const MAX_LINE_LENGTH: usize = 4096;

/// Wire framing spoken on every connection of a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Framing {
    /// `!command arg...` lines, plain text replies
    #[default]
    Text,
    /// One JSON object per line in both directions
    Json,
}

impl Framing {
    /// Public board capacity used when none is configured
    pub fn default_board_capacity(self) -> usize {
        match self {
            Framing::Text => 5,
            Framing::Json => 2,
        }
    }

    /// Resolve the command named by one request line
    pub fn decode(self, line: &str) -> Result<Pending<'_>, AppError> {
        match self {
            Framing::Text => Pending::text(line),
            Framing::Json => Pending::json(line),
        }
    }

    /// Encode one outbound message as a line (without the terminator)
    pub fn encode(self, msg: &Outbound) -> Result<String, AppError> {
        match self {
            Framing::Text => Ok(msg.text().to_string()),
            Framing::Json => Ok(serde_json::to_string(msg)?),
        }
    }

    /// Reply sent before closing on a client-requested disconnect
    pub fn farewell(self) -> Option<&'static str> {
        match self {
            Framing::Text => None,
            Framing::Json => Some("You have left the board."),
        }
    }
}

/// Listener and session settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind
    pub addr: String,
    /// Wire framing
    pub framing: Framing,
    /// Maximum public board size
    pub board_capacity: usize,
    /// Rooms provisioned at startup
    pub rooms: Vec<String>,
    /// Per-session outbound queue depth
    pub outbound_buffer: usize,
    /// Bound on a single socket write
    pub write_timeout: Duration,
    /// State actor command queue depth
    pub command_buffer: usize,
}

impl ServerConfig {
    /// Defaults for the given framing
    pub fn for_framing(framing: Framing) -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            framing,
            board_capacity: framing.default_board_capacity(),
            rooms: default_rooms(),
            outbound_buffer: 64,
            write_timeout: Duration::from_secs(5),
            command_buffer: 256,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::for_framing(Framing::default())
    }
}

/// `Room1` .. `Room5`
pub fn default_rooms() -> Vec<String> {
    (1..=DEFAULT_ROOM_COUNT).map(|i| format!("Room{}", i)).collect()
}
