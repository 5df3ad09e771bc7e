//! Room struct definition
//!
//! Represents a named chat room with a participant registry and an
//! append-only message log.

use std::collections::BTreeMap;

use crate::client::Client;
use crate::message::Post;

/// Named chat room
///
/// Participants are keyed by identity, so joining twice keeps a single
/// entry. The log is never trimmed.
#[derive(Debug)]
pub struct Room {
    /// Room name, unique within the server
    pub name: String,
    /// Identity -> connection handle
    participants: BTreeMap<String, Client>,
    /// Messages in posting order
    log: Vec<Post>,
}

impl Room {
    /// Create an empty room
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            participants: BTreeMap::new(),
            log: Vec::new(),
        }
    }

    /// Add or refresh a participant
    ///
    /// Returns true if the identity was not already a participant.
    pub fn join(&mut self, identity: &str, client: Client) -> bool {
        self.participants.insert(identity.to_string(), client).is_none()
    }

    /// Remove a participant
    ///
    /// Returns the removed handle, or None if the identity was not present.
    pub fn leave(&mut self, identity: &str) -> Option<Client> {
        self.participants.remove(identity)
    }

    /// Check if an identity is a participant
    pub fn contains(&self, identity: &str) -> bool {
        self.participants.contains_key(identity)
    }

    /// Append a message to the log
    pub fn append(&mut self, post: Post) {
        self.log.push(post);
    }

    /// Get a logged message by 1-based position
    pub fn message(&self, position: usize) -> Option<&Post> {
        position.checked_sub(1).and_then(|i| self.log.get(i))
    }

    /// Participant identities in registry order
    pub fn participant_names(&self) -> Vec<String> {
        self.participants.keys().cloned().collect()
    }

    /// Connection handles of all participants
    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.participants.values()
    }

    /// Get the number of participants in the room
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn log_len(&self) -> usize {
        self.log.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use tokio::sync::mpsc;

    use super::*;
    use crate::types::ClientId;

    fn client() -> Client {
        let (tx, _rx) = mpsc::channel(4);
        Client::new(ClientId::new(), tx)
    }

    #[test]
    fn test_room_creation() {
        let room = Room::new("Room1");

        assert_eq!(room.name, "Room1");
        assert_eq!(room.participant_count(), 0);
        assert_eq!(room.log_len(), 0);
    }

    #[test]
    fn test_room_join_twice_keeps_one_entry() {
        let mut room = Room::new("Room1");

        assert!(room.join("alice", client()));
        assert!(!room.join("alice", client()));

        assert_eq!(room.participant_count(), 1);
        assert_eq!(room.participant_names(), vec!["alice".to_string()]);
    }

    #[test]
    fn test_room_leave() {
        let mut room = Room::new("Room1");
        room.join("alice", client());

        assert!(room.leave("alice").is_some());
        assert!(room.leave("alice").is_none());
        assert!(!room.contains("alice"));
    }

    #[test]
    fn test_room_log_is_not_trimmed() {
        let mut room = Room::new("Room1");
        for i in 0..20 {
            room.append(Post::new("alice", Local::now(), format!("msg {}", i)));
        }

        assert_eq!(room.log_len(), 20);
        assert_eq!(room.message(1).unwrap().body, "msg 0");
        assert_eq!(room.message(20).unwrap().body, "msg 19");
        assert!(room.message(0).is_none());
        assert!(room.message(21).is_none());
    }
}
