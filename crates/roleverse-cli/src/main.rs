use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod bootstrap;
mod commands;
mod helper;
mod logging;

#[derive(Parser)]
#[command(name = "roleverse")]
#[command(about = "RoleVerse - text adventures narrated by a language model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new game or continue an existing session
    Play {
        /// Session to resume
        #[arg(long)]
        session: Option<String>,
    },
    /// List stored sessions
    List,
    /// Export a session as a save file
    Export {
        /// Session to export
        id: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Start a new session from a save file
    Import {
        file: PathBuf,
    },
    /// Delete sessions that have been idle too long
    Sweep {
        /// Overrides `session.idle_ttl_minutes` from the config
        #[arg(long)]
        max_idle_minutes: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init()?;

    let app = bootstrap::App::build().await?;

    match cli.command {
        Commands::Play { session } => commands::play::run(&app, session).await?,
        Commands::List => commands::saves::list(&app).await?,
        Commands::Export { id, out } => commands::saves::export(&app, &id, out.as_deref()).await?,
        Commands::Import { file } => commands::saves::import(&app, &file).await?,
        Commands::Sweep { max_idle_minutes } => {
            commands::sweep::run(&app, max_idle_minutes).await?
        }
    }

    Ok(())
}
