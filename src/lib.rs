mod commands;
pub mod core;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::core::frontend::ConsoleFrontend;
use crate::core::state::AppState;

#[derive(Parser)]
#[command(name = "playdeck")]
#[command(version)]
#[command(about = "Install and play games from installer descriptors")]
struct Cli {
    /// Directory holding settings, system/runner/game configs
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a game from the installer index or a local descriptor
    Install {
        game: String,

        #[arg(short, long)]
        installer: Option<PathBuf>,
    },

    /// Launch an installed game
    Play { slug: String },

    /// Set the directory games are installed into
    SetGamesDir { path: PathBuf },

    /// Set the base URL installer descriptors are downloaded from
    SetInstallerUrl { url: String },

    /// List installed games
    List,
}

/// Entry point for the `playdeck` binary. Returns the process exit code.
pub fn run() -> i32 {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,playdeck_lib=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Cannot start async runtime: {}", e);
            return 1;
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(()) => 0,
        Err(message) => {
            eprintln!("{}", message);
            1
        }
    }
}

async fn dispatch(cli: Cli) -> Result<(), String> {
    let mut app = AppState::new(cli.config_dir).map_err(|e| e.to_string())?;
    tracing::debug!("Playdeck data dir {:?}", app.data_dir);

    match cli.command {
        Commands::Install { game, installer } => {
            let config =
                commands::install_game(&app, &ConsoleFrontend, &game, installer.as_deref()).await?;
            println!("Installed {} ({})", config.realname, config.runner);
        }
        Commands::Play { slug } => commands::play_game(&app, &slug).await?,
        Commands::SetGamesDir { path } => commands::set_games_dir(&app, &path).await?,
        Commands::SetInstallerUrl { url } => commands::set_installer_url(&mut app, &url)?,
        Commands::List => {
            for game in commands::list_games(&app).await? {
                println!("{}\t{}\t{}", game.slug, game.realname, game.runner);
            }
        }
    }
    Ok(())
}
