//! Shared state store
//!
//! Holds the user registry, the public board and the fixed room table.
//! The store itself is plain synchronous data; it is owned by the
//! `ChatServer` actor, which makes every operation atomic with respect to
//! all others by processing one request at a time.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};

use crate::board::Board;
use crate::client::Client;
use crate::error::AppError;
use crate::message::Post;
use crate::room::Room;
use crate::types::ClientId;

#[derive(Debug)]
pub struct Store {
    /// Registered identity -> connection handle
    users: BTreeMap<String, Client>,
    /// Bounded public board
    board: Board,
    /// Rooms in provisioning order
    rooms: Vec<Room>,
}

impl Store {
    /// Create a store with an empty board and the given rooms
    ///
    /// Duplicate room names are provisioned once.
    pub fn new<S: AsRef<str>>(board_capacity: usize, room_names: &[S]) -> Self {
        let mut rooms: Vec<Room> = Vec::with_capacity(room_names.len());
        for name in room_names {
            let name = name.as_ref();
            if !rooms.iter().any(|r| r.name == name) {
                rooms.push(Room::new(name));
            }
        }

        Self {
            users: BTreeMap::new(),
            board: Board::new(board_capacity),
            rooms,
        }
    }

    /// Register `name` for `client` iff no live session holds it
    pub fn register(&mut self, name: &str, client: Client) -> Result<(), AppError> {
        if self.users.contains_key(name) {
            return Err(AppError::NameTaken);
        }
        self.users.insert(name.to_string(), client);
        Ok(())
    }

    /// Remove `name` from the registry and from every room
    ///
    /// Idempotent. Returns the removed handle if the name was registered.
    pub fn deregister(&mut self, name: &str) -> Option<Client> {
        for room in &mut self.rooms {
            room.leave(name);
        }
        self.users.remove(name)
    }

    /// Append to the public board
    ///
    /// Returns the stored post and its current 1-based position.
    pub fn post_public(&mut self, author: &str, body: &str, at: DateTime<Local>) -> (usize, Post) {
        let post = Post::new(author, at, body);
        let position = self.board.push(post.clone());
        (position, post)
    }

    /// Get a public post by current 1-based position
    pub fn public(&self, position: usize) -> Result<Post, AppError> {
        self.board.get(position).cloned().ok_or(AppError::NotFound)
    }

    /// Snapshot of registered identities
    pub fn active(&self) -> Vec<String> {
        self.users.keys().cloned().collect()
    }

    /// Names of all provisioned rooms
    pub fn room_names(&self) -> Vec<String> {
        self.rooms.iter().map(|r| r.name.clone()).collect()
    }

    /// Add a registered identity to a room; joining twice is a no-op
    ///
    /// Returns true if the identity was not already a participant.
    pub fn join_room(&mut self, name: &str, room: &str) -> Result<bool, AppError> {
        let client = self.users.get(name).cloned().ok_or(AppError::NotRegistered)?;
        Ok(self.room_mut(room)?.join(name, client))
    }

    /// Remove an identity from a room
    pub fn leave_room(&mut self, name: &str, room: &str) -> Result<(), AppError> {
        self.member_room_mut(name, room)?.leave(name);
        Ok(())
    }

    /// Append to a room log; the author must be a participant
    pub fn post_room(
        &mut self,
        author: &str,
        room: &str,
        body: &str,
        at: DateTime<Local>,
    ) -> Result<Post, AppError> {
        let post = Post::new(author, at, body);
        self.member_room_mut(author, room)?.append(post.clone());
        Ok(post)
    }

    /// Get a room message by 1-based position; the caller must be a participant
    pub fn room_message(&self, name: &str, room: &str, position: usize) -> Result<Post, AppError> {
        let room = self.member_room(name, room)?;
        room.message(position)
            .cloned()
            .ok_or_else(|| AppError::RoomMessageNotFound(room.name.clone()))
    }

    /// Participant identities of a room; the caller must be a participant
    pub fn room_participants(&self, name: &str, room: &str) -> Result<Vec<String>, AppError> {
        Ok(self.member_room(name, room)?.participant_names())
    }

    /// Handles of every registered session
    pub fn users(&self) -> impl Iterator<Item = &Client> {
        self.users.values()
    }

    /// Connection id of a registered identity
    pub fn client_id(&self, name: &str) -> Option<ClientId> {
        self.users.get(name).map(|c| c.id)
    }

    /// Look up a room by name
    pub fn room(&self, room: &str) -> Result<&Room, AppError> {
        self.rooms
            .iter()
            .find(|r| r.name == room)
            .ok_or_else(|| AppError::RoomNotFound(room.to_string()))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    fn room_mut(&mut self, room: &str) -> Result<&mut Room, AppError> {
        self.rooms
            .iter_mut()
            .find(|r| r.name == room)
            .ok_or_else(|| AppError::RoomNotFound(room.to_string()))
    }

    fn member_room(&self, name: &str, room: &str) -> Result<&Room, AppError> {
        let found = self.room(room)?;
        if !found.contains(name) {
            return Err(AppError::NotAMember(found.name.clone()));
        }
        Ok(found)
    }

    fn member_room_mut(&mut self, name: &str, room: &str) -> Result<&mut Room, AppError> {
        let found = self.room_mut(room)?;
        if !found.contains(name) {
            return Err(AppError::NotAMember(found.name.clone()));
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn client() -> Client {
        let (tx, _rx) = mpsc::channel(4);
        Client::new(ClientId::new(), tx)
    }

    fn store() -> Store {
        Store::new(5, &["Room1", "Room2", "Room3"])
    }

    #[test]
    fn test_register_name_taken() {
        let mut store = store();

        assert!(store.register("alice", client()).is_ok());
        assert!(matches!(
            store.register("alice", client()),
            Err(AppError::NameTaken)
        ));
        // Names are case-sensitive
        assert!(store.register("Alice", client()).is_ok());
        assert_eq!(store.active(), vec!["Alice".to_string(), "alice".to_string()]);
    }

    #[test]
    fn test_board_boundary_at_capacity() {
        let mut store = store();
        for i in 1..=6 {
            store.post_public("alice", &format!("post {}", i), Local::now());
        }

        // Six posts into a board of five: position 1 now holds post 2
        assert_eq!(store.public(1).unwrap().body, "post 2");
        assert_eq!(store.public(5).unwrap().body, "post 6");
        assert!(matches!(store.public(6), Err(AppError::NotFound)));
        assert!(matches!(store.public(0), Err(AppError::NotFound)));
    }

    #[test]
    fn test_room_membership_gating() {
        let mut store = store();
        store.register("alice", client()).unwrap();

        assert!(matches!(
            store.post_room("alice", "Room1", "hi", Local::now()),
            Err(AppError::NotAMember(_))
        ));
        assert!(matches!(
            store.room_message("alice", "Room1", 1),
            Err(AppError::NotAMember(_))
        ));
        assert!(matches!(
            store.room_participants("alice", "Room1"),
            Err(AppError::NotAMember(_))
        ));
        assert!(matches!(
            store.leave_room("alice", "Room1"),
            Err(AppError::NotAMember(_))
        ));

        store.join_room("alice", "Room1").unwrap();

        let post = store.post_room("alice", "Room1", "hi", Local::now()).unwrap();
        assert_eq!(post.body, "hi");
        assert_eq!(store.room_message("alice", "Room1", 1).unwrap().body, "hi");
        assert!(matches!(
            store.room_message("alice", "Room1", 2),
            Err(AppError::RoomMessageNotFound(_))
        ));
        assert_eq!(
            store.room_participants("alice", "Room1").unwrap(),
            vec!["alice".to_string()]
        );
        assert!(store.leave_room("alice", "Room1").is_ok());
    }

    #[test]
    fn test_unknown_room() {
        let mut store = store();
        store.register("alice", client()).unwrap();

        assert!(matches!(
            store.join_room("alice", "Lobby"),
            Err(AppError::RoomNotFound(_))
        ));
        assert!(matches!(
            store.leave_room("alice", "Lobby"),
            Err(AppError::RoomNotFound(_))
        ));
        assert!(matches!(
            store.room_participants("alice", "Lobby"),
            Err(AppError::RoomNotFound(_))
        ));
    }

    #[test]
    fn test_join_and_leave_twice() {
        let mut store = store();
        store.register("alice", client()).unwrap();

        assert!(store.join_room("alice", "Room2").unwrap());
        assert!(!store.join_room("alice", "Room2").unwrap());
        assert_eq!(store.room("Room2").unwrap().participant_count(), 1);

        assert!(store.leave_room("alice", "Room2").is_ok());
        assert!(matches!(
            store.leave_room("alice", "Room2"),
            Err(AppError::NotAMember(_))
        ));
    }

    #[test]
    fn test_deregister_removes_everywhere() {
        let mut store = store();
        store.register("alice", client()).unwrap();
        store.register("bob", client()).unwrap();
        store.join_room("alice", "Room1").unwrap();
        store.join_room("alice", "Room3").unwrap();
        store.join_room("bob", "Room1").unwrap();

        assert!(store.deregister("alice").is_some());

        assert_eq!(store.active(), vec!["bob".to_string()]);
        assert_eq!(
            store.room_participants("bob", "Room1").unwrap(),
            vec!["bob".to_string()]
        );
        assert!(!store.room("Room3").unwrap().contains("alice"));

        // Idempotent
        assert!(store.deregister("alice").is_none());
    }

    #[test]
    fn test_room_log_survives_departure() {
        let mut store = store();
        store.register("alice", client()).unwrap();
        store.register("bob", client()).unwrap();
        store.join_room("alice", "Room1").unwrap();
        store.join_room("bob", "Room1").unwrap();
        store.post_room("alice", "Room1", "bye", Local::now()).unwrap();

        store.deregister("alice");

        let post = store.room_message("bob", "Room1", 1).unwrap();
        assert_eq!(post.author, "alice");
    }

    #[test]
    fn test_duplicate_room_names_provisioned_once() {
        let store = Store::new(5, &["Room1", "Room1", "Room2"]);
        assert_eq!(store.room_names(), vec!["Room1".to_string(), "Room2".to_string()]);
    }
}
