pub mod display;
pub mod zdoom;

use std::path::{Path, PathBuf};

use crate::core::config::GameConfig;
use crate::core::error::{LauncherError, LauncherResult};

pub use zdoom::{ZDoom, ZDoomOptions};

/// Dispatcher without Box<dyn>
pub enum Runner {
    ZDoom(ZDoom),
}

impl Runner {
    /// Build the runner named by `runner_id` from its stored options.
    pub fn new(
        runner_id: &str,
        runner_dir: &Path,
        options: &std::collections::BTreeMap<String, serde_yaml::Value>,
    ) -> LauncherResult<Self> {
        match runner_id {
            ZDoom::ID => Ok(Runner::ZDoom(ZDoom::new(
                runner_dir,
                ZDoomOptions::from_map(options)?,
            ))),
            other => Err(LauncherError::UnknownRunner(other.to_string())),
        }
    }

    pub fn human_name(&self) -> &'static str {
        match self {
            Runner::ZDoom(_) => ZDoom::HUMAN_NAME,
        }
    }

    pub fn executable(&self) -> &Path {
        match self {
            Runner::ZDoom(r) => r.executable(),
        }
    }

    /// Argument vector that starts the game, executable first.
    pub fn play(&self, game: &GameConfig) -> LauncherResult<Vec<String>> {
        match self {
            Runner::ZDoom(r) => r.play(game),
        }
    }

    pub fn working_dir(&self, game: &GameConfig) -> Option<PathBuf> {
        match self {
            Runner::ZDoom(r) => r.working_dir(game),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn unknown_runner_is_rejected() {
        let err = Runner::new("dosbox", Path::new("/opt"), &BTreeMap::new())
            .err()
            .unwrap();
        assert!(matches!(err, LauncherError::UnknownRunner(id) if id == "dosbox"));
    }

    #[test]
    fn zdoom_is_built_from_options() {
        let runner = Runner::new("zdoom", Path::new("/opt"), &BTreeMap::new()).unwrap();
        assert_eq!(runner.human_name(), "ZDoom");
        assert_eq!(runner.executable(), Path::new("/opt/zdoom"));
    }
}
