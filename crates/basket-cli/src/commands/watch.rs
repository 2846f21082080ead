//! Watch command handler
//!
//! Keeps a session open, wired to the change feed through the connection
//! supervisor, and re-renders the view on every reconciled event or
//! connectivity change. Ctrl-C tears the view down.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use basket_core::{ChangeFeed, Config, FeedSupervisor, Filter, SqliteStore, WsFeed};

use crate::commands::{open_session, open_store};
use crate::output::Output;

/// Watch a list live
pub async fn run(token: String, filter: String, output: &Output) -> Result<()> {
    let Some(filter) = Filter::parse(&filter) else {
        bail!("Unknown filter '{}'. Use all, unbought or bought.", filter);
    };

    let config = Config::load()?;

    // The feed pairs with the store: WebSocket against a hosted service,
    // the in-process broadcast against the local database.
    let store: Arc<dyn basket_core::RecordStore>;
    let feed: Arc<dyn ChangeFeed>;
    if config.is_remote() {
        let Some(ref feed_url) = config.feed_url else {
            bail!(
                "No feed_url configured. Set it with:\n  \
                 basket config set feed_url wss://your-service/feed"
            );
        };
        store = open_store(&config)?;
        feed = Arc::new(WsFeed::new(feed_url));
    } else {
        let local = Arc::new(
            SqliteStore::open(&config.db_path()).context("Failed to open local store")?,
        );
        feed = Arc::new(local.feed());
        store = local;
    }

    let mut session = open_session(store, &token).await?;
    session.set_filter(filter);

    let mut supervisor = FeedSupervisor::spawn(feed, session.list().id);
    let mut events = supervisor
        .take_events()
        .expect("event stream already taken");
    let mut status_rx = supervisor.subscribe_status();
    session.attach_status(supervisor.subscribe_status());

    output.message("Watching for changes. Press Ctrl-C to stop.");
    let view = session.current_view();
    output.print_view(session.list(), &view);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = session.current_view();
                output.print_view(session.list(), &view);
            }

            raw = events.recv() => {
                match raw {
                    Some(raw) => {
                        session.apply_raw(raw);
                        let view = session.current_view();
                        output.print_view(session.list(), &view);
                    }
                    None => break,
                }
            }
        }
    }

    supervisor.shutdown().await;
    output.message("Stopped watching.");

    Ok(())
}
