//! Realtime change feed
//!
//! The feed delivers other participants' confirmed mutations as an
//! asynchronous sequence of raw change notifications. It is strictly a
//! receive path: this session's own mutations always go directly to the
//! record store, connected or not.
//!
//! [`ChangeFeed`] is the collaborator seam; [`LocalFeed`] taps the SQLite
//! store's in-process broadcast, [`WsFeed`] speaks the JSON WebSocket
//! protocol of a hosted service. [`FeedSupervisor`] owns the subscription
//! lifecycle: connect, detect drop, reconnect after a fixed delay.

mod local;
mod message;
mod supervisor;
mod ws;

pub use local::LocalFeed;
pub use message::{ClientMessage, ServerMessage};
pub use supervisor::{FeedSupervisor, SyncStatus, RECONNECT_DELAY};
pub use ws::WsFeed;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::event::RawChange;

/// Errors from establishing or running a subscription
///
/// Feed disruption is never surfaced to the mutation path; the supervisor
/// resolves it by reconnecting.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Could not reach the feed endpoint
    #[error("feed connection failed: {0}")]
    Connect(String),

    /// The feed closed or timed out before signalling ready
    #[error("feed handshake failed: {0}")]
    Handshake(String),

    /// The feed sent something unintelligible
    #[error("feed protocol error: {0}")]
    Protocol(String),
}

/// An open subscription to one list's change feed
///
/// A lazy, unbounded, in-order sequence of raw changes. Dropping the
/// subscription releases the underlying handle, so at most one is live per
/// supervisor at any time.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<RawChange>,
}

impl Subscription {
    /// Wrap a receiving channel as a subscription
    pub fn new(rx: mpsc::UnboundedReceiver<RawChange>) -> Self {
        Self { rx }
    }

    /// Next change notification; None once the feed is disrupted or closed
    pub async fn next(&mut self) -> Option<RawChange> {
        self.rx.recv().await
    }
}

/// The realtime feed collaborator
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Establish a subscription for `list_id`
    ///
    /// Returning Ok is the feed-ready signal: from that point the
    /// subscription yields changes until disruption.
    async fn subscribe(&self, list_id: Uuid) -> Result<Subscription, FeedError>;
}
