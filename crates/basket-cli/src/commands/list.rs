//! List command handlers

use anyhow::{bail, Context, Result};

use basket_core::{Config, Filter};

use crate::commands::{open_session, open_store};
use crate::output::Output;

/// Create a new shared list
pub async fn create(name: String, output: &Output) -> Result<()> {
    let config = Config::load()?;
    let store = open_store(&config)?;

    let list = store
        .create_list(&name)
        .await
        .context("Failed to create list")?;

    output.success(&format!("Created list: {}", list.name));
    output.print_list(&list);

    Ok(())
}

/// Show a list, optionally filtered
pub async fn show(token: String, filter: String, output: &Output) -> Result<()> {
    let Some(filter) = Filter::parse(&filter) else {
        bail!("Unknown filter '{}'. Use all, unbought or bought.", filter);
    };

    let config = Config::load()?;
    let store = open_store(&config)?;

    let mut session = open_session(store, &token).await?;
    session.set_filter(filter);

    let view = session.current_view();
    output.print_view(session.list(), &view);

    Ok(())
}
