//! City map command-line front end.
//!
//! Loads the map from a JSON store and answers the questions the minimap
//! panel does: where am I, what is nearest, what does it cost to get there.
//!
//! ```bash
//! cargo run -p citymap -- --at 101,57 briefing
//! cargo run -p citymap -- update
//! cargo run -p citymap -- destination set Gum 51st
//! ```

mod commands;

use anyhow::Context;
use citymap_core::{Category, GridPoint, JsonStore, Navigator, NavigatorConfig, SyncConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(long, env = "CITYMAP_STORE", default_value = "citymap.json", help = "Path to the map store")]
    store: PathBuf,

    #[arg(long, env = "CITYMAP_CATALOG_URL", help = "Catalog page to sync from")]
    catalog_url: Option<String>,

    #[arg(
        long,
        env = "CITYMAP_FETCH_TIMEOUT_SECS",
        default_value_t = 30,
        help = "Catalog request timeout in seconds"
    )]
    timeout: u64,

    #[arg(long, value_parser = parse_point, help = "Tracked position as COLUMN,ROW")]
    at: Option<GridPoint>,

    #[arg(long, help = "Print results as JSON")]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Refresh guild and shop locations from the catalog")]
    Update {
        #[arg(long, help = "Refresh only this category, even if not due")]
        category: Option<Category>,
    },
    #[command(about = "Nearest bank, transit and tavern, and the destination")]
    Briefing,
    #[command(about = "List landmarks of a category by distance")]
    Nearest {
        category: Category,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    #[command(about = "Direct and transit AP cost to an intersection")]
    Route { column: String, row: String },
    #[command(subcommand, about = "Show, set or clear the destination")]
    Destination(DestinationCommand),
    #[command(subcommand, about = "Show or change the minimap zoom")]
    Zoom(ZoomCommand),
    #[command(about = "Print the minimap window around the position")]
    Map {
        #[arg(long, num_args = 2, value_names = ["COLUMN", "ROW"], help = "Center on an intersection instead")]
        go: Option<Vec<String>>,
    },
    #[command(about = "Name the intersection of a cell")]
    Name { column: i32, row: i32 },
    #[command(about = "Move a landmark by hand")]
    Relocate {
        category: Category,
        name: String,
        #[arg(num_args = 2, value_names = ["COLUMN", "ROW"], required_unless_present = "clear")]
        location: Vec<String>,
        #[arg(long, help = "Mark the location unknown")]
        clear: bool,
    },
}

#[derive(Subcommand, Debug)]
enum DestinationCommand {
    Show,
    Set { column: String, row: String },
    Clear,
    Recent,
}

#[derive(Subcommand, Debug)]
enum ZoomCommand {
    Show,
    In,
    Out,
    Set { level: i32 },
}

fn parse_point(value: &str) -> Result<GridPoint, String> {
    let (column, row) = value
        .split_once(',')
        .ok_or_else(|| format!("expected COLUMN,ROW, got {value:?}"))?;
    let column = column.trim().parse().map_err(|e| format!("bad column: {e}"))?;
    let row = row.trim().parse().map_err(|e| format!("bad row: {e}"))?;
    Ok(GridPoint::new(column, row))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive("info".parse()?)
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut sync = SyncConfig::default().with_timeout(Duration::from_secs(cli.timeout));
    if let Some(url) = &cli.catalog_url {
        sync = sync.with_url(url.clone());
    }
    let config = NavigatorConfig::new().with_sync(sync);

    let store = JsonStore::open(&cli.store)
        .await
        .with_context(|| format!("opening map store {}", cli.store.display()))?;
    let mut nav = Navigator::connect(Arc::new(store), config).await?;

    if let Some(position) = cli.at {
        debug!(position = %position, "tracked position from command line");
        nav.update_position(position);
    }

    commands::run(&mut nav, cli.command, cli.json).await
}
