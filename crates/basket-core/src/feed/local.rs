//! In-process change feed
//!
//! Bridges the SQLite store's broadcast channel into per-list
//! subscriptions. Useful for tests and for multiple sessions (tabs) over
//! one local store; cross-participant delivery needs the WebSocket feed.

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::event::RawChange;
use crate::feed::{ChangeFeed, FeedError, Subscription};

/// Change feed over an in-process broadcast channel
#[derive(Clone)]
pub struct LocalFeed {
    events: broadcast::Sender<(Uuid, RawChange)>,
}

impl LocalFeed {
    pub(crate) fn new(events: broadcast::Sender<(Uuid, RawChange)>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl ChangeFeed for LocalFeed {
    async fn subscribe(&self, list_id: Uuid) -> Result<Subscription, FeedError> {
        let mut source = self.events.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok((changed_list, change)) => {
                        if changed_list != list_id {
                            continue;
                        }
                        if tx.send(change).is_err() {
                            // Subscription dropped
                            break;
                        }
                    }
                    // Missed events mean the sequence has a gap; end the
                    // subscription and let the supervisor reconnect.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "local feed lagged");
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(rx))
    }
}
