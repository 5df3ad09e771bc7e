//! Bounded public message board
//!
//! Keeps the most recent `capacity` posts. Posts are addressed by their
//! current 1-based position, so a position refers to a different post once
//! older posts have been evicted.

use std::collections::VecDeque;

use crate::message::Post;

#[derive(Debug)]
pub struct Board {
    posts: VecDeque<Post>,
    capacity: usize,
}

impl Board {
    /// Create an empty board holding at most `capacity` posts
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            posts: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a post, evicting the oldest one if the board is over capacity
    ///
    /// Returns the 1-based position of the new post.
    pub fn push(&mut self, post: Post) -> usize {
        self.posts.push_back(post);
        while self.posts.len() > self.capacity {
            self.posts.pop_front();
        }
        self.posts.len()
    }

    /// Get a post by its current 1-based position
    pub fn get(&self, position: usize) -> Option<&Post> {
        position.checked_sub(1).and_then(|i| self.posts.get(i))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
