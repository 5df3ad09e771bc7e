//! Command dispatcher
//!
//! Resolves the command named by one request line, checks the session's
//! registration state before looking at arguments, runs the command against
//! the state actor and renders the reply. Every
//! protocol error is turned into a single error reply here; only fatal
//! errors escape to the session handler.

use tracing::debug;

use crate::client::Client;
use crate::command::{Command, CommandKind, HELP_TEXT};
use crate::config::Framing;
use crate::error::AppError;
use crate::message::Outbound;
use crate::server::ServerHandle;
use crate::types::SessionState;

/// What the session should do after a request
#[derive(Debug, PartialEq, Eq)]
pub enum Response {
    /// Write the reply and keep going
    Reply(Outbound),
    /// Write the reply and move the session to `Registered(name)`
    Registered { name: String, reply: Outbound },
    /// Close the session
    Quit,
}

/// Per-session dispatcher
#[derive(Debug, Clone)]
pub struct Dispatcher {
    server: ServerHandle,
    client: Client,
    framing: Framing,
}

impl Dispatcher {
    pub fn new(server: ServerHandle, client: Client, framing: Framing) -> Self {
        Self {
            server,
            client,
            framing,
        }
    }

    /// Handle one request line
    ///
    /// Returns `Err` only for fatal errors.
    pub async fn dispatch(&self, state: &SessionState, line: &str) -> Result<Response, AppError> {
        match self.handle(state, line).await {
            Ok(response) => Ok(response),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!("Client {} request rejected: {}", self.client.id, e);
                Ok(Response::Reply(Outbound::Error(e.to_string())))
            }
        }
    }

    async fn handle(&self, state: &SessionState, line: &str) -> Result<Response, AppError> {
        let pending = self.framing.decode(line)?;
        check_state(pending.kind(), state)?;
        let command = pending.into_command()?;
        self.execute(state.identity().unwrap_or_default(), command).await
    }

    async fn execute(&self, me: &str, command: Command) -> Result<Response, AppError> {
        let reply = match command {
            Command::Help => HELP_TEXT.to_string(),
            Command::Register { name } => {
                self.server.register(&name, self.client.clone()).await?;
                let reply = Outbound::Ok(format!("Welcome to the server, {}!", name));
                return Ok(Response::Registered { name, reply });
            }
            Command::Send { body } => {
                self.server.post_public(me, &body).await?;
                "Message sent successfully.".to_string()
            }
            Command::Retrieve { index } => self.server.get_public(index).await?.to_string(),
            Command::Active => {
                let users = self.server.list_active().await?;
                listing("Active users:", &users)
            }
            Command::Rooms => {
                let rooms = self.server.list_rooms().await?;
                listing("Available Rooms:", &rooms)
            }
            Command::JoinRoom { room } => {
                self.server.join_room(me, &room).await?;
                format!("You joined {}.", room)
            }
            Command::RoomMsg { room, body } => {
                self.server.post_room(me, &room, &body).await?;
                format!("Message sent to {}.", room)
            }
            Command::RoomRetrieve { room, index } => self
                .server
                .get_room_message(me, &room, index)
                .await?
                .to_string(),
            Command::RoomUsers { room } => {
                let users = self.server.list_room_participants(me, &room).await?;
                listing(&format!("Participants in {}:", room), &users)
            }
            Command::LeaveRoom { room } => {
                self.server.leave_room(me, &room).await?;
                format!("You left {}.", room)
            }
            Command::Quit => return Ok(Response::Quit),
        };

        Ok(Response::Reply(Outbound::Ok(reply)))
    }
}

/// Registration gate, applied before arity and argument checks
fn check_state(kind: CommandKind, state: &SessionState) -> Result<(), AppError> {
    match (kind, state) {
        (CommandKind::Register, SessionState::Registered(_)) => Err(AppError::AlreadyRegistered),
        (kind, SessionState::Unregistered) if kind.requires_identity() => {
            Err(AppError::NotRegistered)
        }
        _ => Ok(()),
    }
}

/// A header line followed by one entry per line
fn listing(header: &str, entries: &[String]) -> String {
    let mut out = header.to_string();
    for entry in entries {
        out.push('\n');
        out.push_str(entry);
    }
    out
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::server::ChatServer;
    use crate::state::Store;
    use crate::types::ClientId;

    fn setup(framing: Framing) -> (ServerHandle, Dispatcher, mpsc::Receiver<Outbound>) {
        let server = ChatServer::start(Store::new(5, &["Room1", "Room2"]), 64);
        let (tx, rx) = mpsc::channel(32);
        let client = Client::new(ClientId::new(), tx);
        let dispatcher = Dispatcher::new(server.clone(), client, framing);
        (server, dispatcher, rx)
    }

    fn other_client() -> Client {
        let (tx, _rx) = mpsc::channel(32);
        Client::new(ClientId::new(), tx)
    }

    fn error(text: &str) -> Response {
        Response::Reply(Outbound::Error(text.to_string()))
    }

    fn ok(text: &str) -> Response {
        Response::Reply(Outbound::Ok(text.to_string()))
    }

    #[tokio::test]
    async fn test_requires_registration() {
        let (_server, dispatcher, _rx) = setup(Framing::Text);
        let state = SessionState::Unregistered;

        for line in ["!send hi", "!retrieve 1", "!active", "!joinroom Room1", "!leaveroom Room1"] {
            assert_eq!(
                dispatcher.dispatch(&state, line).await.unwrap(),
                error("Register first with '!register [username]'."),
                "line: {}",
                line
            );
        }

        // Commands open to everyone
        let rooms = dispatcher.dispatch(&state, "!rooms").await.unwrap();
        assert_eq!(rooms, ok("Available Rooms:\nRoom1\nRoom2"));
        assert!(matches!(
            dispatcher.dispatch(&state, "!help").await.unwrap(),
            Response::Reply(Outbound::Ok(_))
        ));
    }

    #[tokio::test]
    async fn test_registration_checked_before_arguments() {
        let (_server, dispatcher, _rx) = setup(Framing::Text);
        let state = SessionState::Unregistered;

        for line in ["!send", "!retrieve abc", "!roomretrieve Room1 x", "!active now"] {
            assert_eq!(
                dispatcher.dispatch(&state, line).await.unwrap(),
                error("Register first with '!register [username]'."),
                "line: {}",
                line
            );
        }

        let state = SessionState::Registered("alice".to_string());
        for line in ["!register", "!register a b"] {
            assert_eq!(
                dispatcher.dispatch(&state, line).await.unwrap(),
                error("You are already connected."),
                "line: {}",
                line
            );
        }
        assert_eq!(
            dispatcher.dispatch(&state, "!retrieve abc").await.unwrap(),
            error("Invalid message ID. Must be a number.")
        );
    }

    #[tokio::test]
    async fn test_json_registration_checked_before_arguments() {
        let (_server, dispatcher, _rx) = setup(Framing::Json);

        let state = SessionState::Unregistered;
        assert_eq!(
            dispatcher
                .dispatch(&state, r#"{"command":"post","body":" "}"#)
                .await
                .unwrap(),
            error("Register first with '!register [username]'.")
        );

        let state = SessionState::Registered("alice".to_string());
        assert_eq!(
            dispatcher
                .dispatch(&state, r#"{"command":"connect","username":"two words"}"#)
                .await
                .unwrap(),
            error("You are already connected.")
        );
    }

    #[tokio::test]
    async fn test_register_flow() {
        let (server, dispatcher, _rx) = setup(Framing::Text);
        server.register("bob", other_client()).await.unwrap();

        let state = SessionState::Unregistered;
        assert_eq!(
            dispatcher.dispatch(&state, "!register bob").await.unwrap(),
            error("Username is taken. Please choose another.")
        );

        let response = dispatcher.dispatch(&state, "!register alice").await.unwrap();
        assert_eq!(
            response,
            Response::Registered {
                name: "alice".to_string(),
                reply: Outbound::Ok("Welcome to the server, alice!".to_string()),
            }
        );

        let state = SessionState::Registered("alice".to_string());
        assert_eq!(
            dispatcher.dispatch(&state, "!register carol").await.unwrap(),
            error("You are already connected.")
        );
        assert_eq!(
            dispatcher.dispatch(&state, "!active").await.unwrap(),
            ok("Active users:\nalice\nbob")
        );
    }

    #[tokio::test]
    async fn test_usage_and_unknown() {
        let (_server, dispatcher, _rx) = setup(Framing::Text);
        let state = SessionState::Unregistered;

        assert_eq!(
            dispatcher.dispatch(&state, "!register").await.unwrap(),
            error("Usage: !register [username]")
        );
        assert_eq!(
            dispatcher.dispatch(&state, "!dance").await.unwrap(),
            error("Unrecognized command. Use '!help' for assistance.")
        );
        assert_eq!(dispatcher.dispatch(&state, "!quit").await.unwrap(), Response::Quit);
    }

    #[tokio::test]
    async fn test_room_commands() {
        let (server, dispatcher, _rx) = setup(Framing::Text);
        server.register("alice", dispatcher.client.clone()).await.unwrap();
        let state = SessionState::Registered("alice".to_string());

        assert_eq!(
            dispatcher.dispatch(&state, "!roommsg Room1 hi").await.unwrap(),
            error("You are not a participant of Room1.")
        );
        assert_eq!(
            dispatcher.dispatch(&state, "!joinroom Lobby").await.unwrap(),
            error("Room Lobby does not exist.")
        );
        assert_eq!(
            dispatcher.dispatch(&state, "!joinroom Room1").await.unwrap(),
            ok("You joined Room1.")
        );
        assert_eq!(
            dispatcher.dispatch(&state, "!roommsg Room1 hi all").await.unwrap(),
            ok("Message sent to Room1.")
        );
        match dispatcher.dispatch(&state, "!roomretrieve Room1 1").await.unwrap() {
            Response::Reply(Outbound::Ok(text)) => assert!(text.ends_with("alice said: hi all")),
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(
            dispatcher.dispatch(&state, "!roomretrieve Room1 2").await.unwrap(),
            error("Message ID not found in Room1.")
        );
        assert_eq!(
            dispatcher.dispatch(&state, "!roomusers Room1").await.unwrap(),
            ok("Participants in Room1:\nalice")
        );
        assert_eq!(
            dispatcher.dispatch(&state, "!leaveroom Room1").await.unwrap(),
            ok("You left Room1.")
        );
        assert_eq!(
            dispatcher.dispatch(&state, "!leaveroom Room1").await.unwrap(),
            error("You are not a participant of Room1.")
        );
    }

    #[tokio::test]
    async fn test_json_framing() {
        let (_server, dispatcher, _rx) = setup(Framing::Json);
        let state = SessionState::Unregistered;

        let response = dispatcher
            .dispatch(&state, r#"{"command":"connect","username":"alice"}"#)
            .await
            .unwrap();
        assert!(matches!(response, Response::Registered { ref name, .. } if name == "alice"));

        let state = SessionState::Registered("alice".to_string());
        assert_eq!(
            dispatcher
                .dispatch(&state, r#"{"command":"message","id":1}"#)
                .await
                .unwrap(),
            error("Message ID not found.")
        );
        assert!(matches!(
            dispatcher.dispatch(&state, "{oops").await.unwrap(),
            Response::Reply(Outbound::Error(_))
        ));
        assert_eq!(
            dispatcher
                .dispatch(&state, r#"{"command":"leave"}"#)
                .await
                .unwrap(),
            Response::Quit
        );
    }
}
