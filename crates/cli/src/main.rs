//! CardVault CLI - Database migrations and stock management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create or upgrade the database schema
//! cv-cli migrate
//!
//! # Import a batch of card codes from a file
//! cv-cli stock import -p 1 -f codes.txt --batch "spring-drop" --priority 10
//!
//! # Add a single unit
//! cv-cli stock add -p 1 -c "GAME-KEY-AAAA-BBBB"
//!
//! # Show availability stats for products 1 and 2
//! cv-cli stock stats -p 1 -p 2
//!
//! # Remove expired unused units
//! cv-cli stock sweep
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `stock import` / `stock add` - Load stock units
//! - `stock delete` - Delete an unused unit
//! - `stock stats` - Per-product availability counters
//! - `stock sweep` - Remove expired unused units

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "cv-cli")]
#[command(author, version, about = "CardVault CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage digital stock units
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// Import stock units from a text file (one unit per line)
    Import {
        /// Product to import into
        #[arg(short, long)]
        product: i64,

        /// Path to the text file; reads stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Batch label for this import
        #[arg(short, long)]
        batch: Option<String>,

        /// Allocation priority (higher is consumed first)
        #[arg(long, default_value_t = 0)]
        priority: i32,

        /// RFC 3339 expiry applied to every imported unit
        #[arg(long)]
        expires: Option<DateTime<Utc>>,

        /// Importer name recorded on every unit
        #[arg(long)]
        created_by: Option<String>,
    },
    /// Add a single stock unit
    Add {
        /// Product to add to
        #[arg(short, long)]
        product: i64,

        /// The unit content (card code, link, license text)
        #[arg(short, long)]
        content: String,

        /// Batch label
        #[arg(short, long)]
        batch: Option<String>,

        /// Allocation priority (higher is consumed first)
        #[arg(long, default_value_t = 0)]
        priority: i32,

        /// RFC 3339 expiry
        #[arg(long)]
        expires: Option<DateTime<Utc>>,

        /// Importer name
        #[arg(long)]
        created_by: Option<String>,
    },
    /// Delete an unused stock unit by id
    Delete {
        /// Stock unit id
        #[arg(long)]
        id: i64,
    },
    /// Show availability stats for one or more products
    Stats {
        /// Product id; repeat for several products
        #[arg(short, long = "product", required = true)]
        products: Vec<i64>,
    },
    /// Delete expired unused units
    Sweep {
        /// Restrict the sweep to one product
        #[arg(short, long)]
        product: Option<i64>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Stock { action } => match action {
            StockAction::Import {
                product,
                file,
                batch,
                priority,
                expires,
                created_by,
            } => {
                let options = cardvault_inventory::ImportOptions {
                    batch_name: batch,
                    created_by,
                    priority,
                    expires_at: expires,
                };
                commands::stock::import(product, file.as_deref(), &options).await?;
            }
            StockAction::Add {
                product,
                content,
                batch,
                priority,
                expires,
                created_by,
            } => {
                let options = cardvault_inventory::ImportOptions {
                    batch_name: batch,
                    created_by,
                    priority,
                    expires_at: expires,
                };
                commands::stock::add(product, &content, &options).await?;
            }
            StockAction::Delete { id } => commands::stock::delete(id).await?,
            StockAction::Stats { products } => commands::stock::stats(&products).await?,
            StockAction::Sweep { product } => commands::stock::sweep(product).await?,
        },
    }
    Ok(())
}
