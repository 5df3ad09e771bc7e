//! Command parsing
//!
//! Both framings decode into the same `Command` value in two steps: the
//! command name is resolved first (`Pending`), then arity and arguments are
//! checked. The dispatcher gates on session state between the two.

use crate::error::AppError;
use crate::message::JsonRequest;

/// Static help text for `!help`
pub const HELP_TEXT: &str = "\
Available Commands:
- !help: Display this help menu.
- !register [username]: Join the public board with a unique username.
- !send [message]: Post a public message.
- !retrieve [id]: View a specific public message by ID.
- !active: See a list of active users.
- !rooms: View available chat rooms.
- !joinroom [room]: Join a chat room.
- !roommsg [room] [message]: Send a message to a chat room.
- !roomretrieve [room] [id]: Retrieve a specific message from a chat room.
- !roomusers [room]: List participants in a chat room.
- !leaveroom [room]: Leave a chat room.
- !quit: Disconnect from the server.";

/// A decoded client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Register { name: String },
    Send { body: String },
    Retrieve { index: usize },
    Active,
    Rooms,
    JoinRoom { room: String },
    RoomMsg { room: String, body: String },
    RoomRetrieve { room: String, index: usize },
    RoomUsers { room: String },
    LeaveRoom { room: String },
    Quit,
}

/// Which command a request names, before its arguments are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Register,
    Send,
    Retrieve,
    Active,
    Rooms,
    JoinRoom,
    RoomMsg,
    RoomRetrieve,
    RoomUsers,
    LeaveRoom,
    Quit,
}

impl CommandKind {
    /// Look up a text-framing command name; names are case-sensitive
    pub fn from_token(token: &str) -> Option<CommandKind> {
        let kind = match token {
            "!help" => CommandKind::Help,
            "!register" => CommandKind::Register,
            "!send" => CommandKind::Send,
            "!retrieve" => CommandKind::Retrieve,
            "!active" => CommandKind::Active,
            "!rooms" => CommandKind::Rooms,
            "!joinroom" => CommandKind::JoinRoom,
            "!roommsg" => CommandKind::RoomMsg,
            "!roomretrieve" => CommandKind::RoomRetrieve,
            "!roomusers" => CommandKind::RoomUsers,
            "!leaveroom" => CommandKind::LeaveRoom,
            "!quit" => CommandKind::Quit,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether the command needs a registered identity
    pub fn requires_identity(self) -> bool {
        !matches!(
            self,
            CommandKind::Help | CommandKind::Register | CommandKind::Rooms | CommandKind::Quit
        )
    }
}

/// A request whose command is known but whose arguments are unchecked
#[derive(Debug)]
pub enum Pending<'a> {
    Text { kind: CommandKind, args: Vec<&'a str> },
    Json(JsonRequest),
}

impl<'a> Pending<'a> {
    /// Split one line of the text framing into command name and arguments
    pub fn text(line: &'a str) -> Result<Pending<'a>, AppError> {
        let mut tokens = line.split_whitespace();
        let kind = tokens
            .next()
            .and_then(CommandKind::from_token)
            .ok_or(AppError::UnrecognizedCommand)?;
        Ok(Pending::Text {
            kind,
            args: tokens.collect(),
        })
    }

    /// Deserialize one line of the structured framing
    pub fn json(line: &str) -> Result<Pending<'a>, AppError> {
        let request: JsonRequest =
            serde_json::from_str(line).map_err(|e| AppError::InvalidRequest(e.to_string()))?;
        Ok(Pending::Json(request))
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Pending::Text { kind, .. } => *kind,
            Pending::Json(request) => match request {
                JsonRequest::Connect { .. } => CommandKind::Register,
                JsonRequest::Post { .. } => CommandKind::Send,
                JsonRequest::Users => CommandKind::Active,
                JsonRequest::Message { .. } => CommandKind::Retrieve,
                JsonRequest::Leave => CommandKind::Quit,
                JsonRequest::Groups => CommandKind::Rooms,
                JsonRequest::GroupJoin { .. } => CommandKind::JoinRoom,
                JsonRequest::GroupPost { .. } => CommandKind::RoomMsg,
                JsonRequest::GroupMessage { .. } => CommandKind::RoomRetrieve,
                JsonRequest::GroupUsers { .. } => CommandKind::RoomUsers,
                JsonRequest::GroupLeave { .. } => CommandKind::LeaveRoom,
                JsonRequest::Help => CommandKind::Help,
            },
        }
    }

    /// Check arity and arguments
    pub fn into_command(self) -> Result<Command, AppError> {
        match self {
            Pending::Text { kind, args } => parse_args(kind, &args),
            Pending::Json(request) => Command::try_from(request),
        }
    }
}

impl Command {
    /// Parse one line of the text framing
    ///
    /// Tokens are separated by any whitespace; message bodies are rejoined
    /// with single spaces.
    pub fn parse(line: &str) -> Result<Command, AppError> {
        Pending::text(line)?.into_command()
    }

    /// Decode one line of the structured framing
    pub fn from_json(line: &str) -> Result<Command, AppError> {
        Pending::json(line)?.into_command()
    }
}

fn parse_args(kind: CommandKind, args: &[&str]) -> Result<Command, AppError> {
    match kind {
        CommandKind::Help => no_args(args, Command::Help, "!help"),
        CommandKind::Register => match args {
            [name] => Ok(Command::Register {
                name: name.to_string(),
            }),
            _ => Err(AppError::Usage("!register [username]")),
        },
        CommandKind::Send => match args {
            [] => Err(AppError::Usage("!send [message]")),
            words => Ok(Command::Send {
                body: words.join(" "),
            }),
        },
        CommandKind::Retrieve => match args {
            [index] => Ok(Command::Retrieve {
                index: parse_index(index)?,
            }),
            _ => Err(AppError::Usage("!retrieve [id]")),
        },
        CommandKind::Active => no_args(args, Command::Active, "!active"),
        CommandKind::Rooms => no_args(args, Command::Rooms, "!rooms"),
        CommandKind::JoinRoom => match args {
            [room] => Ok(Command::JoinRoom {
                room: room.to_string(),
            }),
            _ => Err(AppError::Usage("!joinroom [room]")),
        },
        CommandKind::RoomMsg => match args {
            [room, words @ ..] if !words.is_empty() => Ok(Command::RoomMsg {
                room: room.to_string(),
                body: words.join(" "),
            }),
            _ => Err(AppError::Usage("!roommsg [room] [message]")),
        },
        CommandKind::RoomRetrieve => match args {
            [room, index] => Ok(Command::RoomRetrieve {
                room: room.to_string(),
                index: parse_index(index)?,
            }),
            _ => Err(AppError::Usage("!roomretrieve [room] [id]")),
        },
        CommandKind::RoomUsers => match args {
            [room] => Ok(Command::RoomUsers {
                room: room.to_string(),
            }),
            _ => Err(AppError::Usage("!roomusers [room]")),
        },
        CommandKind::LeaveRoom => match args {
            [room] => Ok(Command::LeaveRoom {
                room: room.to_string(),
            }),
            _ => Err(AppError::Usage("!leaveroom [room]")),
        },
        CommandKind::Quit => no_args(args, Command::Quit, "!quit"),
    }
}

impl TryFrom<JsonRequest> for Command {
    type Error = AppError;

    fn try_from(request: JsonRequest) -> Result<Self, Self::Error> {
        let command = match request {
            JsonRequest::Connect { username } => {
                let name = single_token(&username).ok_or(AppError::Usage("connect {username}"))?;
                Command::Register { name }
            }
            JsonRequest::Post { subject, body } => Command::Send {
                body: compose_body(subject, body).ok_or(AppError::Usage("post {subject, body}"))?,
            },
            JsonRequest::Users => Command::Active,
            JsonRequest::Message { id } => Command::Retrieve { index: id },
            JsonRequest::Leave => Command::Quit,
            JsonRequest::Groups => Command::Rooms,
            JsonRequest::GroupJoin { group } => Command::JoinRoom { room: group },
            JsonRequest::GroupPost {
                group,
                subject,
                body,
            } => Command::RoomMsg {
                room: group,
                body: compose_body(subject, body)
                    .ok_or(AppError::Usage("grouppost {group, subject, body}"))?,
            },
            JsonRequest::GroupMessage { group, id } => Command::RoomRetrieve {
                room: group,
                index: id,
            },
            JsonRequest::GroupUsers { group } => Command::RoomUsers { room: group },
            JsonRequest::GroupLeave { group } => Command::LeaveRoom { room: group },
            JsonRequest::Help => Command::Help,
        };
        Ok(command)
    }
}

fn no_args(args: &[&str], command: Command, usage: &'static str) -> Result<Command, AppError> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(AppError::Usage(usage))
    }
}

fn parse_index(token: &str) -> Result<usize, AppError> {
    token.parse().map_err(|_| AppError::InvalidIndex)
}

/// Usernames must be a single whitespace-free token, as in the text framing
fn single_token(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Join an optional subject onto a body; None if both are blank
fn compose_body(subject: Option<String>, body: String) -> Option<String> {
    let body = body.trim();
    let subject = subject.as_deref().map(str::trim).filter(|s| !s.is_empty());
    match (subject, body.is_empty()) {
        (Some(subject), true) => Some(subject.to_string()),
        (Some(subject), false) => Some(format!("{}: {}", subject, body)),
        (None, false) => Some(body.to_string()),
        (None, true) => None,
    }
}
