use std::path::PathBuf;

use anyhow::Context;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, about, version)]
struct CliArgs {
    /// Directory holding `base.toml` and per-environment overlays.
    #[arg(long, env = "BOOKSHELF_CONFIG_DIR", default_value = "config", global = true)]
    config_dir: PathBuf,

    /// Environment overlay to load (local, staging, production).
    #[arg(long = "env", env = "BOOKSHELF_ENV", default_value = "local", global = true)]
    environment: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create missing tables and serve the HTTP API.
    Serve,
    /// Create missing tables and exit.
    InitDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Allow missing `.env` files without failing.
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();

    let settings = Settings::load_from(&args.config_dir, &args.environment)
        .with_context(|| "failed to load bookshelf settings")?;

    bookshelf_telemetry::init(&settings.telemetry)?;

    let app = bookshelf_app::bootstrap(settings).await?;

    match args.command {
        Command::Serve => app.serve().await,
        Command::InitDb => {
            tracing::info!(db = %app.settings().database.url, "schema initialized");
            app.shutdown().await
        }
    }
}
