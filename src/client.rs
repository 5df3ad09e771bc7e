//! Connection handle
//!
//! A cheap, cloneable reference to one session's outbound queue. The
//! registry and room participant maps hold clones of it; the session's
//! writer task owns the receiving end and the socket.

use tokio::sync::mpsc;

use crate::error::DeliveryError;
use crate::message::Outbound;
use crate::types::ClientId;

/// Handle for writing to a connected client
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Server → Client queue, drained by the session's writer task
    pub sender: mpsc::Sender<Outbound>,
}

impl Client {
    /// Create a new handle with the given ID and sender channel
    pub fn new(id: ClientId, sender: mpsc::Sender<Outbound>) -> Self {
        Self { id, sender }
    }

    /// Queue a reply for this client, waiting for queue space
    ///
    /// Used by the session for its own replies. Returns an error if the
    /// writer has gone away.
    pub async fn send(&self, msg: Outbound) -> Result<(), DeliveryError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| DeliveryError::Closed)
    }

    /// Queue a notification without waiting
    ///
    /// Used for fan-out from the state actor, which must never block on a
    /// slow reader.
    pub fn try_deliver(&self, msg: Outbound) -> Result<(), DeliveryError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}
