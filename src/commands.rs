use std::path::Path;

use tracing::{info, warn};

use crate::core::config::GameConfig;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::frontend::{Frontend, UserAction};
use crate::core::installer::InstallSession;
use crate::core::launch;
use crate::core::state::AppState;

const GAMES_DIR_PROMPT: &str = "Where should games be installed?";

/// One installed game as shown by `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub slug: String,
    pub realname: String,
    pub runner: String,
}

fn new_session<'a>(
    app: &'a AppState,
    frontend: &'a dyn Frontend,
    game: &str,
    installer: Option<&Path>,
) -> InstallSession<'a> {
    match installer {
        Some(path) => InstallSession::with_installer(app, frontend, path),
        None => InstallSession::new(app, frontend, game),
    }
}

fn report_warnings(session: &InstallSession<'_>) {
    for e in session.reported_errors() {
        warn!("{} ({})", e, e.category());
    }
}

/// Install `game`, asking for an install root once if none is configured.
pub async fn install_game(
    app: &AppState,
    frontend: &dyn Frontend,
    game: &str,
    installer: Option<&Path>,
) -> Result<GameConfig, String> {
    let mut session = new_session(app, frontend, game, installer);
    let err = match session.run().await {
        Ok(config) => {
            report_warnings(&session);
            return Ok(config);
        }
        Err(e) => e,
    };

    if !session.user_actions().contains(&UserAction::AskGamesDir) {
        return Err(install_failure(game, &err));
    }

    let Some(dir) = frontend.ask_directory(GAMES_DIR_PROMPT).await else {
        return Err(install_failure(game, &err));
    };
    app.config_store
        .set_games_dir(&dir)
        .await
        .map_err(|e| install_failure(game, &e))?;

    info!("Retrying install of {} into {:?}", game, dir);
    let mut retry = new_session(app, frontend, game, installer);
    let config = retry.run().await.map_err(|e| install_failure(game, &e))?;
    report_warnings(&retry);
    Ok(config)
}

fn install_failure(game: &str, err: &LauncherError) -> String {
    format!("Unable to install \"{}\": {} ({})", game, err, err.category())
}

pub async fn play_game(app: &AppState, slug: &str) -> Result<(), String> {
    launch::play(app, slug)
        .await
        .map(|_| ())
        .map_err(|e| format!("Unable to play \"{}\": {}", slug, e))
}

pub async fn set_games_dir(app: &AppState, path: &Path) -> Result<(), String> {
    app.config_store
        .set_games_dir(path)
        .await
        .map_err(|e| e.to_string())
}

/// Point descriptor downloads at another installer index and persist it.
pub fn set_installer_url(app: &mut AppState, raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("Invalid installer URL {:?}: {}", raw, e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("Installer URL must be http or https: {}", raw));
    }
    let mut base = parsed.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }

    app.settings.installer_url = base;
    app.save_settings().map_err(|e| e.to_string())?;
    info!("Installer index set to {}", app.settings.installer_url);
    Ok(())
}

pub async fn list_games(app: &AppState) -> Result<Vec<GameSummary>, String> {
    collect_games(app).await.map_err(|e| e.to_string())
}

async fn collect_games(app: &AppState) -> LauncherResult<Vec<GameSummary>> {
    let mut games = Vec::new();
    for slug in app.config_store.list_games().await? {
        match app.config_store.load_game(&slug).await {
            Ok(config) => games.push(GameSummary {
                slug,
                realname: config.realname,
                runner: config.runner,
            }),
            Err(e) => warn!("Skipping unreadable game config {}: {}", slug, e),
        }
    }
    Ok(games)
}
