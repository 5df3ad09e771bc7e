//! ChatServer Actor implementation
//!
//! The central actor that owns the shared state store. Sessions talk to it
//! through a `ServerHandle`; each request carries a oneshot reply channel.
//! Because the actor handles one command at a time, every store operation
//! (including mutate-then-notify sequences) is atomic with respect to all
//! other sessions.

use chrono::Local;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::client::Client;
use crate::error::AppError;
use crate::message::Post;
use crate::notifier::notify;
use crate::state::Store;

type Reply<T> = oneshot::Sender<T>;

/// Commands sent from sessions to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Claim an identity for a connection
    Register {
        name: String,
        client: Client,
        reply: Reply<Result<(), AppError>>,
    },
    /// Release an identity and announce the departure
    Deregister { name: String, reply: Reply<bool> },
    /// Post to the public board
    PostPublic {
        author: String,
        body: String,
        reply: Reply<Result<Post, AppError>>,
    },
    /// Read the public board by position
    GetPublic {
        index: usize,
        reply: Reply<Result<Post, AppError>>,
    },
    /// List registered identities
    ListActive { reply: Reply<Vec<String>> },
    /// List room names
    ListRooms { reply: Reply<Vec<String>> },
    /// Join a room
    JoinRoom {
        name: String,
        room: String,
        reply: Reply<Result<(), AppError>>,
    },
    /// Leave a room
    LeaveRoom {
        name: String,
        room: String,
        reply: Reply<Result<(), AppError>>,
    },
    /// Post to a room log
    PostRoom {
        author: String,
        room: String,
        body: String,
        reply: Reply<Result<Post, AppError>>,
    },
    /// Read a room log by position
    GetRoomMessage {
        name: String,
        room: String,
        index: usize,
        reply: Reply<Result<Post, AppError>>,
    },
    /// List a room's participants
    ListRoomParticipants {
        name: String,
        room: String,
        reply: Reply<Result<Vec<String>, AppError>>,
    },
}

/// The main ChatServer actor
///
/// Owns the store and processes commands from session handlers.
pub struct ChatServer {
    /// All shared state
    store: Store,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given store and command receiver
    pub fn new(store: Store, receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self { store, receiver }
    }

    /// Spawn the actor on the current runtime and return a handle to it
    pub fn start(store: Store, buffer: usize) -> ServerHandle {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        tokio::spawn(ChatServer::new(store, rx).run());
        ServerHandle { tx }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!(
            "ChatServer started with {} rooms, board capacity {}",
            self.store.room_names().len(),
            self.store.board().capacity()
        );

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    ///
    /// A dropped reply receiver means the session went away mid-request;
    /// the state change still stands.
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Register { name, client, reply } => {
                let _ = reply.send(self.handle_register(name, client));
            }
            ServerCommand::Deregister { name, reply } => {
                let _ = reply.send(self.handle_deregister(&name));
            }
            ServerCommand::PostPublic { author, body, reply } => {
                let _ = reply.send(self.handle_post_public(&author, &body));
            }
            ServerCommand::GetPublic { index, reply } => {
                let _ = reply.send(self.store.public(index));
            }
            ServerCommand::ListActive { reply } => {
                let _ = reply.send(self.store.active());
            }
            ServerCommand::ListRooms { reply } => {
                let _ = reply.send(self.store.room_names());
            }
            ServerCommand::JoinRoom { name, room, reply } => {
                let _ = reply.send(self.handle_join_room(&name, &room));
            }
            ServerCommand::LeaveRoom { name, room, reply } => {
                let _ = reply.send(self.handle_leave_room(&name, &room));
            }
            ServerCommand::PostRoom {
                author,
                room,
                body,
                reply,
            } => {
                let _ = reply.send(self.handle_post_room(&author, &room, &body));
            }
            ServerCommand::GetRoomMessage {
                name,
                room,
                index,
                reply,
            } => {
                let _ = reply.send(self.store.room_message(&name, &room, index));
            }
            ServerCommand::ListRoomParticipants { name, room, reply } => {
                let _ = reply.send(self.store.room_participants(&name, &room));
            }
        }
    }

    /// Handle identity registration
    fn handle_register(&mut self, name: String, client: Client) -> Result<(), AppError> {
        let client_id = client.id;
        self.store.register(&name, client)?;
        info!("Client {} registered as '{}'", client_id, name);

        let report = notify(
            self.store.users(),
            Some(client_id),
            &format!("{} joined the server!", name),
        );
        debug!("Join notice for '{}': {:?}", name, report);
        Ok(())
    }

    /// Handle identity release
    fn handle_deregister(&mut self, name: &str) -> bool {
        let Some(client) = self.store.deregister(name) else {
            return false;
        };
        info!("Client {} released '{}'", client.id, name);

        let report = notify(
            self.store.users(),
            None,
            &format!("{} has left the server.", name),
        );
        debug!(
            "Departure notice for '{}': {:?}, {} users remain",
            name,
            report,
            self.store.active().len()
        );
        true
    }

    /// Handle a public board post
    fn handle_post_public(&mut self, author: &str, body: &str) -> Result<Post, AppError> {
        if self.store.client_id(author).is_none() {
            return Err(AppError::NotRegistered);
        }

        let (position, post) = self.store.post_public(author, body, Local::now());
        debug!(
            "'{}' posted public message at position {}/{}",
            author,
            position,
            self.store.board().capacity()
        );

        notify(self.store.users(), None, &post.to_string());
        Ok(post)
    }

    /// Handle room joining
    fn handle_join_room(&mut self, name: &str, room: &str) -> Result<(), AppError> {
        let newly_joined = self.store.join_room(name, room)?;
        if !newly_joined {
            return Ok(());
        }
        info!("'{}' joined room {}", name, room);

        let joiner = self.store.client_id(name);
        let room = self.store.room(room)?;
        debug!("Room {} now has {} participants", room.name, room.participant_count());
        notify(
            room.clients(),
            joiner,
            &format!("{} has joined {}.", name, room.name),
        );
        Ok(())
    }

    /// Handle voluntary room leaving
    fn handle_leave_room(&mut self, name: &str, room: &str) -> Result<(), AppError> {
        self.store.leave_room(name, room)?;
        info!("'{}' left room {}", name, room);

        let room = self.store.room(room)?;
        notify(
            room.clients(),
            None,
            &format!("{} has left {}.", name, room.name),
        );
        Ok(())
    }

    /// Handle a room post
    fn handle_post_room(&mut self, author: &str, room: &str, body: &str) -> Result<Post, AppError> {
        let post = self.store.post_room(author, room, body, Local::now())?;

        let sender = self.store.client_id(author);
        let room = self.store.room(room)?;
        debug!(
            "'{}' posted to {} ({} messages)",
            author,
            room.name,
            room.log_len()
        );
        notify(
            room.clients(),
            sender,
            &format!("Message in {}: {}", room.name, post),
        );
        Ok(post)
    }
}

/// Cloneable handle to the ChatServer actor
///
/// Each method is one atomic store operation.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    tx: mpsc::Sender<ServerCommand>,
}

impl ServerHandle {
    /// Send a command and wait for its reply
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> ServerCommand,
    ) -> Result<T, AppError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| AppError::ServerClosed)?;
        rx.await.map_err(|_| AppError::ServerClosed)
    }

    pub async fn register(&self, name: &str, client: Client) -> Result<(), AppError> {
        self.request(|reply| ServerCommand::Register {
            name: name.to_string(),
            client,
            reply,
        })
        .await?
    }

    /// Returns true if the name was registered
    pub async fn deregister(&self, name: &str) -> Result<bool, AppError> {
        self.request(|reply| ServerCommand::Deregister {
            name: name.to_string(),
            reply,
        })
        .await
    }

    pub async fn post_public(&self, author: &str, body: &str) -> Result<Post, AppError> {
        self.request(|reply| ServerCommand::PostPublic {
            author: author.to_string(),
            body: body.to_string(),
            reply,
        })
        .await?
    }

    pub async fn get_public(&self, index: usize) -> Result<Post, AppError> {
        self.request(|reply| ServerCommand::GetPublic { index, reply })
            .await?
    }

    pub async fn list_active(&self) -> Result<Vec<String>, AppError> {
        self.request(|reply| ServerCommand::ListActive { reply }).await
    }

    pub async fn list_rooms(&self) -> Result<Vec<String>, AppError> {
        self.request(|reply| ServerCommand::ListRooms { reply }).await
    }

    pub async fn join_room(&self, name: &str, room: &str) -> Result<(), AppError> {
        self.request(|reply| ServerCommand::JoinRoom {
            name: name.to_string(),
            room: room.to_string(),
            reply,
        })
        .await?
    }

    pub async fn leave_room(&self, name: &str, room: &str) -> Result<(), AppError> {
        self.request(|reply| ServerCommand::LeaveRoom {
            name: name.to_string(),
            room: room.to_string(),
            reply,
        })
        .await?
    }

    pub async fn post_room(&self, author: &str, room: &str, body: &str) -> Result<Post, AppError> {
        self.request(|reply| ServerCommand::PostRoom {
            author: author.to_string(),
            room: room.to_string(),
            body: body.to_string(),
            reply,
        })
        .await?
    }

    pub async fn get_room_message(
        &self,
        name: &str,
        room: &str,
        index: usize,
    ) -> Result<Post, AppError> {
        self.request(|reply| ServerCommand::GetRoomMessage {
            name: name.to_string(),
            room: room.to_string(),
            index,
            reply,
        })
        .await?
    }

    pub async fn list_room_participants(
        &self,
        name: &str,
        room: &str,
    ) -> Result<Vec<String>, AppError> {
        self.request(|reply| ServerCommand::ListRoomParticipants {
            name: name.to_string(),
            room: room.to_string(),
            reply,
        })
        .await?
    }
}
