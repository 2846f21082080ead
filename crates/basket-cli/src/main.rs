//! Basket CLI
//!
//! Command-line interface for Basket - shared shopping lists.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "basket")]
#[command(about = "Basket - shared shopping lists, synced in real time")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new shared list
    Create {
        /// List name
        name: String,
    },
    /// Show a list
    Show {
        /// Share token of the list
        token: String,
        /// Filter: all, unbought or bought
        #[arg(short, long, default_value = "all")]
        filter: String,
    },
    /// Add an item to a list
    Add {
        /// Share token of the list
        token: String,
        /// Item name
        name: String,
        /// Quantity ("2", "1.5", ...)
        #[arg(long)]
        qty: Option<String>,
        /// Unit (each, kg, g, L, mL, pack)
        #[arg(long)]
        unit: Option<String>,
        /// Unit price
        #[arg(long)]
        price: Option<f64>,
    },
    /// Toggle an item's bought flag
    #[command(alias = "buy")]
    Toggle {
        /// Share token of the list
        token: String,
        /// Item ID (full UUID or prefix)
        id: String,
    },
    /// Edit an item
    Edit {
        /// Share token of the list
        token: String,
        /// Item ID (full UUID or prefix)
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New quantity (empty string clears)
        #[arg(long)]
        qty: Option<String>,
        /// New unit (empty string clears)
        #[arg(long)]
        unit: Option<String>,
        /// New unit price
        #[arg(long)]
        price: Option<f64>,
    },
    /// Delete an item
    #[command(alias = "rm")]
    Delete {
        /// Share token of the list
        token: String,
        /// Item ID (full UUID or prefix)
        id: String,
    },
    /// Delete every bought item
    Clear {
        /// Share token of the list
        token: String,
    },
    /// Move an item to a new position
    Move {
        /// Share token of the list
        token: String,
        /// Item ID (full UUID or prefix)
        id: String,
        /// Target position (0-based)
        position: usize,
    },
    /// Watch a list live
    Watch {
        /// Share token of the list
        token: String,
        /// Filter: all, unbought or bought
        #[arg(short, long, default_value = "all")]
        filter: String,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show configuration and storage status
    Status,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, service_url, feed_url)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match cli.command {
        Commands::Create { name } => commands::list::create(name, &output).await,
        Commands::Show { token, filter } => commands::list::show(token, filter, &output).await,
        Commands::Add {
            token,
            name,
            qty,
            unit,
            price,
        } => commands::item::add(token, name, qty, unit, price, &output).await,
        Commands::Toggle { token, id } => commands::item::toggle(token, id, &output).await,
        Commands::Edit {
            token,
            id,
            name,
            qty,
            unit,
            price,
        } => commands::item::edit(token, id, name, qty, unit, price, &output).await,
        Commands::Delete { token, id } => commands::item::delete(token, id, &output).await,
        Commands::Clear { token } => commands::item::clear(token, &output).await,
        Commands::Move {
            token,
            id,
            position,
        } => commands::item::move_item(token, id, position, &output).await,
        Commands::Watch { token, filter } => commands::watch::run(token, filter, &output).await,
        Commands::Config { command } => match command {
            Some(ConfigCommands::Show) | None => commands::config::show(&output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, &output)
            }
        },
        Commands::Status => commands::status::show(&output),
    }
}
