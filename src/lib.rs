//! Bulletin Board Server Library
//!
//! A multi-user bulletin board and chat room server over a line-oriented
//! TCP protocol, built on tokio using the Actor pattern for shared state.
//!
//! # Features
//! - Unique display-name registration
//! - Bounded public message board with FIFO eviction
//! - Fixed set of rooms with participant lists and message logs
//! - Server-wide and room-wide notifications
//! - Text (`!command`) or JSON-lines framing
//!
//! # Architecture
//! - `ChatServer` is the central actor owning the `Store`; every state
//!   operation is one message to it, so operations are linearizable
//! - Each connection runs a `handler` task plus a writer task draining a
//!   bounded outbound queue
//! - Notifications are queued with `try_send`, so a slow client never
//!   stalls the actor or other clients
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use bulletin_server::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:4040").await.unwrap();
//!     serve(listener, ServerConfig::default()).await;
//! }
//! ```

pub mod board;
pub mod client;
pub mod codec;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod listener;
pub mod message;
pub mod notifier;
pub mod room;
pub mod server;
pub mod state;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use command::Command;
pub use config::{Framing, ServerConfig};
pub use dispatcher::{Dispatcher, Response};
pub use error::{AppError, DeliveryError};
pub use handler::handle_connection;
pub use listener::{bind_and_serve, serve};
pub use message::{JsonRequest, Outbound, Post};
pub use room::Room;
pub use server::{ChatServer, ServerCommand, ServerHandle};
pub use state::Store;
pub use types::{ClientId, SessionState};
