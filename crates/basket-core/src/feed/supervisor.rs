//! Feed connection supervision
//!
//! Owns the subscription lifecycle for one open list view:
//! `Connecting -> Connected -> Disconnected -> Connecting -> ...` until the
//! view is torn down. A dropped feed schedules exactly one reconnect
//! attempt after a fixed delay, and the previous handle is always released
//! before a new one is established, so duplicate delivery cannot occur.
//!
//! Connectivity loss never reaches the mutation path; it is only visible
//! through the status channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::event::RawChange;
use crate::feed::ChangeFeed;

/// Fixed delay before a reconnect attempt
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Feed connectivity, as surfaced to the rendering collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Attempting to establish a subscription
    Connecting,
    /// Receiving live changes
    Connected,
    /// Subscription lost; reconnect pending
    Disconnected,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Connecting => write!(f, "connecting"),
            SyncStatus::Connected => write!(f, "connected"),
            SyncStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Commands sent to the supervision task
#[derive(Debug, Clone)]
enum SupervisorCommand {
    /// Tear down: release the feed handle and cancel any pending reconnect
    Shutdown,
}

/// Handle to the supervision task for one list view
pub struct FeedSupervisor {
    command_tx: mpsc::Sender<SupervisorCommand>,
    status_rx: watch::Receiver<SyncStatus>,
    events_rx: Option<mpsc::UnboundedReceiver<RawChange>>,
    task: JoinHandle<()>,
}

impl FeedSupervisor {
    /// Spawn supervision of `list_id` over the given feed
    pub fn spawn(feed: Arc<dyn ChangeFeed>, list_id: Uuid) -> Self {
        let (command_tx, command_rx) = mpsc::channel(4);
        let (status_tx, status_rx) = watch::channel(SyncStatus::Connecting);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(supervise(feed, list_id, command_rx, status_tx, event_tx));

        Self {
            command_tx,
            status_rx,
            events_rx: Some(event_rx),
            task,
        }
    }

    /// Current connectivity
    pub fn status(&self) -> SyncStatus {
        *self.status_rx.borrow()
    }

    /// Subscribe to connectivity changes
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_rx.clone()
    }

    /// Take the normalizable event stream (can only be taken once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<RawChange>> {
        self.events_rx.take()
    }

    /// Tear down the supervision task
    ///
    /// Unconditional: releases the live handle if any and cancels a pending
    /// reconnect timer, then waits for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(SupervisorCommand::Shutdown).await;
        let _ = self.task.await;
    }
}

async fn supervise(
    feed: Arc<dyn ChangeFeed>,
    list_id: Uuid,
    mut command_rx: mpsc::Receiver<SupervisorCommand>,
    status_tx: watch::Sender<SyncStatus>,
    event_tx: mpsc::UnboundedSender<RawChange>,
) {
    loop {
        let _ = status_tx.send(SyncStatus::Connecting);

        match feed.subscribe(list_id).await {
            Ok(mut subscription) => {
                info!(%list_id, "change feed connected");
                let _ = status_tx.send(SyncStatus::Connected);

                // Pump changes until disruption or teardown. The
                // subscription is dropped at the end of this scope, before
                // any reconnect attempt.
                loop {
                    tokio::select! {
                        cmd = command_rx.recv() => {
                            match cmd {
                                Some(SupervisorCommand::Shutdown) | None => {
                                    let _ = status_tx.send(SyncStatus::Disconnected);
                                    return;
                                }
                            }
                        }
                        change = subscription.next() => {
                            match change {
                                Some(change) => {
                                    if event_tx.send(change).is_err() {
                                        // Consumer gone; treat as teardown
                                        let _ = status_tx.send(SyncStatus::Disconnected);
                                        return;
                                    }
                                }
                                None => break,
                            }
                        }
                    }
                }
                warn!(%list_id, "change feed disrupted");
            }
            Err(e) => {
                warn!(%list_id, error = %e, "change feed connection failed");
            }
        }

        let _ = status_tx.send(SyncStatus::Disconnected);

        // Exactly one reconnect attempt, after a fixed delay. Teardown
        // cancels the pending timer.
        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            _ = command_rx.recv() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    use crate::feed::{FeedError, Subscription};
    use crate::models::Item;

    /// Feed double holding the single sender of the live subscription.
    /// Dropping that sender simulates a feed-closed signal; a resubscribe
    /// while the previous receiver is still alive is recorded as an
    /// overlap (duplicate delivery would be possible).
    struct ScriptedFeed {
        connects: AtomicUsize,
        overlaps: AtomicUsize,
        live: Mutex<Option<mpsc::UnboundedSender<RawChange>>>,
    }

    impl ScriptedFeed {
        fn new() -> Self {
            Self {
                connects: AtomicUsize::new(0),
                overlaps: AtomicUsize::new(0),
                live: Mutex::new(None),
            }
        }

        fn drop_live_handle(&self) {
            self.live.lock().unwrap().take();
        }

        fn send(&self, change: RawChange) {
            if let Some(tx) = self.live.lock().unwrap().as_ref() {
                let _ = tx.send(change);
            }
        }
    }

    #[async_trait]
    impl ChangeFeed for ScriptedFeed {
        async fn subscribe(&self, _list_id: Uuid) -> Result<Subscription, FeedError> {
            self.connects.fetch_add(1, Ordering::SeqCst);

            let (tx, rx) = mpsc::unbounded_channel();
            let mut live = self.live.lock().unwrap();
            if let Some(prev) = live.as_ref() {
                if !prev.is_closed() {
                    self.overlaps.fetch_add(1, Ordering::SeqCst);
                }
            }
            *live = Some(tx);

            Ok(Subscription::new(rx))
        }
    }

    fn change() -> RawChange {
        RawChange::Insert {
            item: Item {
                id: Uuid::new_v4(),
                list_id: Uuid::new_v4(),
                name: "Milk".to_string(),
                qty: None,
                unit: None,
                price: None,
                bought: false,
                sort_order: 0,
                created_at: Utc::now(),
            },
        }
    }

    async fn wait_for(rx: &mut watch::Receiver<SyncStatus>, status: SyncStatus) {
        while *rx.borrow() != status {
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_and_forwards_changes() {
        let feed = Arc::new(ScriptedFeed::new());
        let mut supervisor = FeedSupervisor::spawn(feed.clone(), Uuid::new_v4());
        let mut events = supervisor.take_events().unwrap();
        let mut status = supervisor.subscribe_status();

        wait_for(&mut status, SyncStatus::Connected).await;
        assert_eq!(feed.connects.load(Ordering::SeqCst), 1);

        let sent = change();
        feed.send(sent.clone());
        assert_eq!(events.recv().await.unwrap(), sent);

        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_fixed_delay() {
        let feed = Arc::new(ScriptedFeed::new());
        let supervisor = FeedSupervisor::spawn(feed.clone(), Uuid::new_v4());
        let mut status = supervisor.subscribe_status();

        wait_for(&mut status, SyncStatus::Connected).await;

        let dropped_at = tokio::time::Instant::now();
        feed.drop_live_handle();
        wait_for(&mut status, SyncStatus::Disconnected).await;

        // One reconnect, scheduled exactly RECONNECT_DELAY after the drop
        wait_for(&mut status, SyncStatus::Connected).await;
        assert_eq!(feed.connects.load(Ordering::SeqCst), 2);
        assert!(dropped_at.elapsed() >= RECONNECT_DELAY);

        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_subscription_is_ever_live() {
        let feed = Arc::new(ScriptedFeed::new());
        let supervisor = FeedSupervisor::spawn(feed.clone(), Uuid::new_v4());
        let mut status = supervisor.subscribe_status();

        // Go through a few disruption/reconnect rounds
        for _ in 0..3 {
            wait_for(&mut status, SyncStatus::Connected).await;
            feed.drop_live_handle();
            wait_for(&mut status, SyncStatus::Disconnected).await;
        }
        wait_for(&mut status, SyncStatus::Connected).await;

        assert_eq!(feed.connects.load(Ordering::SeqCst), 4);
        assert_eq!(feed.overlaps.load(Ordering::SeqCst), 0);
        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_reconnect() {
        let feed = Arc::new(ScriptedFeed::new());
        let supervisor = FeedSupervisor::spawn(feed.clone(), Uuid::new_v4());
        let mut status = supervisor.subscribe_status();

        wait_for(&mut status, SyncStatus::Connected).await;
        feed.drop_live_handle();
        wait_for(&mut status, SyncStatus::Disconnected).await;

        // Teardown while the reconnect timer is pending
        supervisor.shutdown().await;
        tokio::time::sleep(RECONNECT_DELAY * 10).await;

        assert_eq!(feed.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_the_live_handle() {
        let feed = Arc::new(ScriptedFeed::new());
        let supervisor = FeedSupervisor::spawn(feed.clone(), Uuid::new_v4());
        let mut status = supervisor.subscribe_status();

        wait_for(&mut status, SyncStatus::Connected).await;
        supervisor.shutdown().await;

        let live = feed.live.lock().unwrap();
        assert!(live.as_ref().unwrap().is_closed());
    }
}
