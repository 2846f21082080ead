//! Item command handlers

use anyhow::{Context, Result};

use basket_core::{Config, ItemPatch, NewItem};

use crate::commands::{open_session, open_store, parse_item_id};
use crate::output::Output;

/// Add an item to a list
pub async fn add(
    token: String,
    name: String,
    qty: Option<String>,
    unit: Option<String>,
    price: Option<f64>,
    output: &Output,
) -> Result<()> {
    let config = Config::load()?;
    let store = open_store(&config)?;
    let mut session = open_session(store, &token).await?;

    let item = session
        .add_item(NewItem {
            name,
            qty,
            unit,
            price,
        })
        .await
        .context("Failed to add item")?;

    output.success(&format!("Added: {}", item.name));
    output.print_item(&item);

    Ok(())
}

/// Toggle an item's bought flag
pub async fn toggle(token: String, id: String, output: &Output) -> Result<()> {
    let config = Config::load()?;
    let store = open_store(&config)?;
    let mut session = open_session(store, &token).await?;

    let item_id = parse_item_id(&id, session.items())?;
    let item = session
        .toggle_bought(item_id)
        .await
        .context("Failed to toggle item")?;

    output.success(&format!(
        "{}: {}",
        if item.bought { "Bought" } else { "Unbought" },
        item.name
    ));
    output.print_item(&item);

    Ok(())
}

/// Edit an item's fields
pub async fn edit(
    token: String,
    id: String,
    name: Option<String>,
    qty: Option<String>,
    unit: Option<String>,
    price: Option<f64>,
    output: &Output,
) -> Result<()> {
    let patch = ItemPatch {
        name,
        qty,
        unit,
        price,
        bought: None,
    };
    if patch.is_empty() {
        output.message("Nothing to change.");
        return Ok(());
    }

    let config = Config::load()?;
    let store = open_store(&config)?;
    let mut session = open_session(store, &token).await?;

    let item_id = parse_item_id(&id, session.items())?;
    let item = session
        .update_item(item_id, patch)
        .await
        .context("Failed to update item")?;

    output.success(&format!("Updated: {}", item.name));
    output.print_item(&item);

    Ok(())
}

/// Delete an item
pub async fn delete(token: String, id: String, output: &Output) -> Result<()> {
    let config = Config::load()?;
    let store = open_store(&config)?;
    let mut session = open_session(store, &token).await?;

    let item_id = parse_item_id(&id, session.items())?;
    session
        .delete_item(item_id)
        .await
        .context("Failed to delete item")?;

    output.success(&format!("Deleted item: {}", item_id));

    Ok(())
}

/// Delete every bought item
pub async fn clear(token: String, output: &Output) -> Result<()> {
    let config = Config::load()?;
    let store = open_store(&config)?;
    let mut session = open_session(store, &token).await?;

    let bought = session.current_view().counts.bought;
    session
        .clear_bought()
        .await
        .context("Failed to clear bought items")?;

    output.success(&format!("Cleared {} bought item(s)", bought));

    Ok(())
}

/// Move an item to a new position in the full order
pub async fn move_item(token: String, id: String, position: usize, output: &Output) -> Result<()> {
    let config = Config::load()?;
    let store = open_store(&config)?;
    let mut session = open_session(store, &token).await?;

    let item_id = parse_item_id(&id, session.items())?;
    session
        .move_item(item_id, position)
        .await
        .context("Failed to move item")?;

    output.success(&format!("Moved item to position {}", position));
    let view = session.current_view();
    output.print_view(session.list(), &view);

    Ok(())
}
