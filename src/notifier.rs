//! Best-effort fan-out of notifications
//!
//! Delivery to each recipient is independent: a failure for one recipient
//! is logged and counted, never aborts the batch and never deregisters the
//! recipient. Deregistration only happens when that recipient's own
//! session notices its connection is gone.

use tracing::debug;

use crate::client::Client;
use crate::message::Outbound;
use crate::types::ClientId;

/// Outcome of one broadcast
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients whose queue accepted the line
    pub delivered: usize,
    /// Recipients whose queue was full or closed
    pub failed: usize,
}

/// Queue `line` as an event for every target except `exclude`
pub fn notify<'a, I>(targets: I, exclude: Option<ClientId>, line: &str) -> DeliveryReport
where
    I: IntoIterator<Item = &'a Client>,
{
    let mut report = DeliveryReport::default();

    for client in targets {
        if Some(client.id) == exclude {
            continue;
        }
        match client.try_deliver(Outbound::Event(line.to_string())) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                debug!("Dropping notification for {}: {}", client.id, e);
                report.failed += 1;
            }
        }
    }

    report
}
