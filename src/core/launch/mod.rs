pub mod task;

use std::process::ExitStatus;

use tracing::info;

use crate::core::config::GameConfig;
use crate::core::error::LauncherResult;
use crate::core::runners::Runner;
use crate::core::state::AppState;

pub use task::launch;

/// Build the runner command for an installed game.
pub async fn game_command(app: &AppState, game: &GameConfig) -> LauncherResult<(Runner, Vec<String>)> {
    let options = app.config_store.runner_options(&game.runner).await?;
    let runner = Runner::new(&game.runner, &app.runner_dir(), &options)?;
    let argv = runner.play(game)?;
    Ok((runner, argv))
}

/// Start an installed game with its runner and wait for it to quit.
pub async fn play(app: &AppState, slug: &str) -> LauncherResult<ExitStatus> {
    let game = app.config_store.load_game(slug).await?;
    let (runner, argv) = game_command(app, &game).await?;
    info!("Playing {} with {}", game.realname, runner.human_name());
    launch(&argv, runner.working_dir(&game).as_deref()).await
}
