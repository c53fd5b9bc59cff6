//! toprepos CLI - sync job and read API for the most-starred repositories.

mod commands;
mod config;
mod progress;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "toprepos")]
#[command(version)]
#[command(about = "Track the most-starred repositories and their daily commit activity")]
#[command(
    long_about = "toprepos fetches the most-starred repositories from GitHub or GitLab, keeps a \
dense star ranking (with each repository's previous rank) and incrementally records \
per-day commit counts and authors. A read-only HTTP API serves both tables."
)]
#[command(after_long_help = r#"EXAMPLES
    Run one sync cycle against GitHub:
        $ TOPREPOS_SOURCE__TOKEN=ghp_... toprepos sync

    Sync the top 50, skipping repositories whose activity fetch fails:
        $ toprepos sync --top-n 50 --continue-on-error

    Serve the read API:
        $ toprepos serve --port 8000
        $ curl 'http://127.0.0.1:8000/api/repos/top100?sort_by=forks'

CONFIGURATION
    toprepos reads configuration from:
      1. ~/.config/toprepos/config.toml (or $XDG_CONFIG_HOME/toprepos/config.toml)
      2. ./toprepos.toml
      3. Environment variables (TOPREPOS_<SECTION>__<KEY>)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    TOPREPOS_DATABASE__URL      Database connection string (default: ~/.local/state/toprepos/toprepos.db)
    TOPREPOS_SOURCE__PROVIDER   github or gitlab (default: github)
    TOPREPOS_SOURCE__TOKEN      API token sent as a bearer token
    TOPREPOS_SYNC__ON_ERROR     abort or continue (default: abort)
    RUST_LOG                    Log filter (default: toprepos=info,toprepos_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync cycle: rank the top repositories, then sync their activity
    Sync(SyncArgs),
    /// Serve the read API
    Serve(ServeArgs),
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct SyncArgs {
    /// Number of top repositories to fetch (default from config or 100)
    #[arg(short = 'n', long)]
    top_n: Option<usize>,

    /// Keep going when one repository's activity sync fails
    #[arg(short = 'c', long)]
    continue_on_error: bool,
}

#[derive(Debug, Clone, Args)]
struct ServeArgs {
    /// Address to bind (default from config or 127.0.0.1)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on (default from config or 8000)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("toprepos=info,toprepos_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        commands::meta::handle_completions(*shell)?;
        return Ok(());
    }

    let config = config::Config::load();
    let database_url = config
        .database_url()
        .ok_or("could not determine a database URL; set TOPREPOS_DATABASE__URL")?;

    if database_url.starts_with("sqlite://") {
        ensure_sqlite_dir(&database_url)?;
    }

    match cli.command {
        Commands::Sync(args) => {
            commands::sync::handle_sync(args, &config, &database_url).await?;
        }
        Commands::Serve(args) => {
            commands::serve::handle_serve(args, &config, &database_url).await?;
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url, &config.pool_options())
                .await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Create the parent directory of a file-backed SQLite database.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    let db_path = database_url.trim_start_matches("sqlite://");
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
