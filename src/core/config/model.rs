use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::core::installer::descriptor::scalar_to_string;

/// Launch targets and game options, persisted under the `game` key.
///
/// `exe`, `iso` and `rom` are absolute paths inside the game directory.
/// Any other key (`main_file`, `file`, `warp`, ...) is a game option read by
/// the runner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exe: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rom: Option<PathBuf>,
    #[serde(flatten)]
    pub options: BTreeMap<String, Value>,
}

/// Per-game launcher config written once an install completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub realname: String,
    pub runner: String,
    /// Install directory; the game runs from here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub game: GameSection,
}

impl GameConfig {
    pub fn new(realname: impl Into<String>, runner: impl Into<String>) -> Self {
        Self {
            realname: realname.into(),
            runner: runner.into(),
            directory: None,
            game: GameSection::default(),
        }
    }

    /// A game option rendered as a string, if present and scalar.
    pub fn option(&self, key: &str) -> Option<String> {
        self.game.options.get(key).and_then(scalar_to_string)
    }
}

/// On-disk shape of `runners/<id>.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_path: Option<PathBuf>,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

/// On-disk shape of `system.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_path: Option<PathBuf>,
}

/// Settings for one runner, with its install root resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub runner_id: String,
    /// Directory games for this runner are installed under.
    pub install_root: PathBuf,
    pub options: BTreeMap<String, Value>,
}
