//! WebSocket change feed
//!
//! Connects to a hosted feed endpoint, subscribes to one list and forwards
//! each change notification. The handshake (subscribe -> ready) runs under
//! a deadline; after that the read loop lives until the connection drops or
//! the subscription is released.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::feed::message::{ClientMessage, ServerMessage};
use crate::feed::{ChangeFeed, FeedError, Subscription};

/// How long to wait for the ready acknowledgement
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket-backed change feed
pub struct WsFeed {
    url: String,
}

impl WsFeed {
    /// Create a feed client for the endpoint at `url` (ws:// or wss://)
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl ChangeFeed for WsFeed {
    async fn subscribe(&self, list_id: Uuid) -> Result<Subscription, FeedError> {
        debug!(url = %self.url, %list_id, "connecting to change feed");
        let (ws_stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| FeedError::Connect(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        let subscribe = ClientMessage::Subscribe { list_id };
        write
            .send(Message::Text(subscribe.encode()))
            .await
            .map_err(|e| FeedError::Connect(e.to_string()))?;

        // Wait for the ready acknowledgement under a deadline
        let deadline = tokio::time::Instant::now() + HANDSHAKE_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(FeedError::Handshake("timed out waiting for ready".to_string()));
            }

            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => match ServerMessage::decode(&text) {
                            Ok(ServerMessage::Ready { .. }) => break,
                            Ok(ServerMessage::Error { message }) => {
                                return Err(FeedError::Protocol(message));
                            }
                            Ok(_) => {
                                // Nothing else is expected before ready
                            }
                            Err(e) => {
                                return Err(FeedError::Protocol(e.to_string()));
                            }
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            return Err(FeedError::Handshake(
                                "feed closed during handshake".to_string(),
                            ));
                        }
                        Some(Err(e)) => {
                            return Err(FeedError::Connect(e.to_string()));
                        }
                        _ => {}
                    }
                }
                _ = tokio::time::sleep(remaining) => {
                    return Err(FeedError::Handshake("timed out waiting for ready".to_string()));
                }
            }
        }

        debug!(%list_id, "change feed ready");
        let (tx, rx) = mpsc::unbounded_channel();

        // Forward change frames until the connection drops or the
        // subscription is released; releasing closes the socket.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => match ServerMessage::decode(&text) {
                                Ok(ServerMessage::Change { change }) => {
                                    if tx.send(change).is_err() {
                                        break;
                                    }
                                }
                                Ok(ServerMessage::Error { message }) => {
                                    warn!(%message, "change feed reported an error");
                                    break;
                                }
                                Ok(_) => {}
                                Err(e) => {
                                    warn!(error = %e, "undecodable feed frame");
                                }
                            },
                            Some(Ok(Message::Ping(payload))) => {
                                if write.send(Message::Pong(payload)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Err(e)) => {
                                warn!(error = %e, "change feed connection error");
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = tx.closed() => {
                        let _ = write.close().await;
                        break;
                    }
                }
            }
        });

        Ok(Subscription::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_connect_error() {
        let feed = WsFeed::new("ws://127.0.0.1:9/feed");
        let err = feed.subscribe(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, FeedError::Connect(_)));
    }
}
