//! Named message channel between the data side and the player side
//!
//! Messages are paired by name: a request on `levels:request` is answered on
//! `levels:response`, and so on. Listeners only receive messages sent after
//! they started listening.

use crate::models::{Levels, SampleTable};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::trace;

/// Request for the level catalog
pub const LEVELS_REQUEST: &str = "levels:request";
/// Level catalog response
pub const LEVELS_RESPONSE: &str = "levels:response";
/// Request for the sample table
pub const TABLE_REQUEST: &str = "table:request";
/// Sample table response
pub const TABLE_RESPONSE: &str = "table:response";

/// Message body
#[derive(Debug, Clone)]
pub enum Payload {
    Empty,
    Levels(Arc<Levels>),
    SampleTable(Arc<SampleTable>),
}

/// Named publish/subscribe transport
pub trait MessageChannel: Send + Sync {
    /// Publish `payload` to every current listener of `name`
    fn send(&self, name: &str, payload: Payload);

    /// Receive every message published on `name` from now on
    fn listen(&self, name: &str) -> broadcast::Receiver<Payload>;
}

/// In-process channel backed by one broadcast sender per name
pub struct LocalChannel {
    senders: Mutex<HashMap<String, broadcast::Sender<Payload>>>,
    capacity: usize,
}

impl LocalChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn sender(&self, name: &str) -> broadcast::Sender<Payload> {
        let mut senders = self
            .senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        senders
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new(16)
    }
}

impl MessageChannel for LocalChannel {
    fn send(&self, name: &str, payload: Payload) {
        let delivered = self.sender(name).send(payload).unwrap_or(0);
        trace!(name, delivered, "channel send");
    }

    fn listen(&self, name: &str) -> broadcast::Receiver<Payload> {
        self.sender(name).subscribe()
    }
}
