//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use basket_core::{Item, SessionView, ShoppingList};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a newly created list with its share token
    pub fn print_list(&self, list: &ShoppingList) {
        match self.format {
            OutputFormat::Human => {
                println!("Name:  {}", list.name);
                println!("Token: {}", list.share_token);
                println!();
                println!("Anyone holding the token can view and edit the list:");
                println!("  basket show {}", list.share_token);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(list).unwrap());
            }
            OutputFormat::Quiet => {
                println!("{}", list.share_token);
            }
        }
    }

    /// Print a single item
    pub fn print_item(&self, item: &Item) {
        match self.format {
            OutputFormat::Human => {
                println!("{}", format_item_line(item));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(item).unwrap());
            }
            OutputFormat::Quiet => {
                println!("{}", item.id);
            }
        }
    }

    /// Print a projected list view
    pub fn print_view(&self, list: &ShoppingList, view: &SessionView) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "{} | {} item(s), {} unbought, {} bought [{}]",
                    list.name,
                    view.counts.all,
                    view.counts.unbought,
                    view.counts.bought,
                    view.sync_status
                );

                if view.items.is_empty() {
                    println!("  (no items in this view)");
                } else {
                    for item in &view.items {
                        println!("  {}", format_item_line(item));
                    }
                }

                if let Some(ref billing) = view.billing {
                    println!(
                        "Bill estimate: ${:.2} (${:.2} in cart, ${:.2} remaining), {} priced",
                        billing.total,
                        billing.bought_total,
                        billing.unbought_total,
                        billing.priced_items
                    );
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "list": list,
                        "items": view.items,
                        "counts": view.counts,
                        "billing": view.billing,
                        "sync_status": view.sync_status.to_string()
                    })
                );
            }
            OutputFormat::Quiet => {
                for item in &view.items {
                    println!("{}", item.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// One human-readable item line: id prefix, bought marker, name, quantity,
/// unit price
fn format_item_line(item: &Item) -> String {
    let marker = if item.bought { "[x]" } else { "[ ]" };

    let mut line = format!(
        "{} {} {}",
        &item.id.to_string()[..8],
        marker,
        item.name
    );

    if let Some(ref qty) = item.qty {
        line.push_str(&format!(" x{}", qty));
        if let Some(ref unit) = item.unit {
            if unit != "each" {
                line.push_str(&format!(" {}", unit));
            }
        }
    }
    if let Some(price) = item.price {
        line.push_str(&format!(" @ ${:.2}", price));
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_format_item_line() {
        let item = Item {
            id: Uuid::nil(),
            list_id: Uuid::nil(),
            name: "Milk".to_string(),
            qty: Some("2".to_string()),
            unit: Some("L".to_string()),
            price: Some(1.8),
            bought: false,
            sort_order: 0,
            created_at: Utc::now(),
        };

        let line = format_item_line(&item);
        assert!(line.contains("[ ] Milk"));
        assert!(line.contains("2 L"));
        assert!(line.contains("$1.80"));
    }

    #[test]
    fn test_format_item_line_hides_each_unit() {
        let item = Item {
            id: Uuid::nil(),
            list_id: Uuid::nil(),
            name: "Eggs".to_string(),
            qty: Some("12".to_string()),
            unit: Some("each".to_string()),
            price: None,
            bought: true,
            sort_order: 0,
            created_at: Utc::now(),
        };

        let line = format_item_line(&item);
        assert!(line.contains("[x] Eggs"));
        assert!(line.contains("12"));
        assert!(!line.contains("each"));
    }
}
