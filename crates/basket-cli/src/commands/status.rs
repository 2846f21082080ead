//! Status command handler

use anyhow::{Context, Result};

use basket_core::Config;

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let mode = if config.is_remote() { "remote" } else { "local" };
    let db_exists = config.db_path().exists();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "mode": mode,
                    "service_url": config.service_url,
                    "feed_url": config.feed_url,
                    "storage": {
                        "data_dir": config.data_dir,
                        "database_exists": db_exists
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", mode);
        }
        OutputFormat::Human => {
            println!("Basket Status");
            println!("=============");
            println!();
            println!("Mode: {}", mode);
            if let Some(ref url) = config.service_url {
                println!("  Service: {}", url);
                println!(
                    "  Feed:    {}",
                    config.feed_url.as_deref().unwrap_or("(not set)")
                );
            }
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!(
                "  Database: {}",
                if db_exists { "present" } else { "not created yet" }
            );
        }
    }

    Ok(())
}
