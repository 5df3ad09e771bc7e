//! Message records and wire messages
//!
//! `Post` is the stored form of a public or room message. `JsonRequest`
//! and `Outbound` define the structured (JSON lines) framing using Serde's
//! tagged enums; `Outbound` is also the unit carried by every session's
//! outbound queue regardless of framing.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp format used when rendering messages
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A stored message on the public board or in a room log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Identity of the author at posting time
    pub author: String,
    /// Local time the message was accepted
    pub posted_at: DateTime<Local>,
    /// Message text
    pub body: String,
}

impl Post {
    pub fn new(author: impl Into<String>, posted_at: DateTime<Local>, body: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            posted_at,
            body: body.into(),
        }
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} said: {}",
            self.posted_at.format(TIMESTAMP_FORMAT),
            self.author,
            self.body
        )
    }
}

/// Client → Server request in the structured framing
///
/// Tagged by the `command` field with lowercase names.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum JsonRequest {
    /// Register a username
    Connect { username: String },
    /// Post to the public board
    Post {
        #[serde(default)]
        subject: Option<String>,
        body: String,
    },
    /// List active users
    Users,
    /// Retrieve a public message by 1-based id
    Message { id: usize },
    /// Disconnect
    Leave,
    /// List rooms
    Groups,
    /// Join a room
    GroupJoin { group: String },
    /// Post to a room
    GroupPost {
        group: String,
        #[serde(default)]
        subject: Option<String>,
        body: String,
    },
    /// Retrieve a room message by 1-based id
    GroupMessage { group: String, id: usize },
    /// List room participants
    GroupUsers { group: String },
    /// Leave a room
    GroupLeave { group: String },
    /// Show help
    Help,
}

/// Server → Client line
///
/// In the text framing only the payload is written. In the structured
/// framing it is serialized as `{"status": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum Outbound {
    /// Successful command reply
    Ok(String),
    /// Recoverable command error
    Error(String),
    /// Banner or asynchronous notification
    Event(String),
}

impl Outbound {
    /// The text payload, without framing
    pub fn text(&self) -> &str {
        match self {
            Outbound::Ok(text) | Outbound::Error(text) | Outbound::Event(text) => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_post_display() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let post = Post::new("alice", at, "hello there");
        assert_eq!(post.to_string(), "[2024-03-09 14:05:00] alice said: hello there");
    }

    #[test]
    fn test_json_request_deserialize() {
        let json = r#"{"command": "connect", "username": "alice"}"#;
        let req: JsonRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            req,
            JsonRequest::Connect {
                username: "alice".to_string()
            }
        );

        let json = r#"{"command": "grouppost", "group": "Room1", "body": "hi"}"#;
        let req: JsonRequest = serde_json::from_str(json).unwrap();
        match req {
            JsonRequest::GroupPost { group, subject, body } => {
                assert_eq!(group, "Room1");
                assert!(subject.is_none());
                assert_eq!(body, "hi");
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_json_request_unknown_command() {
        let json = r#"{"command": "shout", "text": "hi"}"#;
        assert!(serde_json::from_str::<JsonRequest>(json).is_err());
    }

    #[test]
    fn test_outbound_serialize() {
        let json = serde_json::to_string(&Outbound::Error("Message ID not found.".to_string())).unwrap();
        assert!(json.contains("\"status\":\"error\""));
        assert!(json.contains("\"message\":\"Message ID not found.\""));
    }
}
