// ZDoom command line parameters: http://zdoom.org/wiki/Command_line_parameters

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::display;
use crate::core::config::GameConfig;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::installer::descriptor::scalar_to_string;

/// Boolean runner options, in the order their switches are emitted.
pub const BOOL_OPTIONS: [&str; 6] = ["nomusic", "nosfx", "nosound", "2", "4", "nostartup"];

/// Sentinel resolution meaning "whatever the desktop currently uses".
pub const DESKTOP_RESOLUTION: &str = "desktop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skill {
    TooYoungToDie,
    NotTooRough,
    HurtMePlenty,
    UltraViolence,
    Nightmare,
}

impl Skill {
    pub fn from_level(level: &str) -> Option<Self> {
        match level.trim() {
            "0" => Some(Skill::TooYoungToDie),
            "1" => Some(Skill::NotTooRough),
            "2" => Some(Skill::HurtMePlenty),
            "3" => Some(Skill::UltraViolence),
            "4" => Some(Skill::Nightmare),
            _ => None,
        }
    }

    pub fn level(self) -> &'static str {
        match self {
            Skill::TooYoungToDie => "0",
            Skill::NotTooRough => "1",
            Skill::HurtMePlenty => "2",
            Skill::UltraViolence => "3",
            Skill::Nightmare => "4",
        }
    }
}

/// Runner-level options, read from `runners/zdoom.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZDoomOptions {
    pub resolution: Option<String>,
    /// Enabled switches from `BOOL_OPTIONS`.
    pub flags: Vec<&'static str>,
    pub skill: Option<Skill>,
}

impl ZDoomOptions {
    pub fn from_map(options: &BTreeMap<String, Value>) -> LauncherResult<Self> {
        let flags = BOOL_OPTIONS
            .iter()
            .copied()
            .filter(|name| options.get(*name).is_some_and(is_enabled))
            .collect();

        let resolution = options
            .get("resolution")
            .and_then(scalar_to_string)
            .filter(|r| !r.trim().is_empty());

        let skill = match options.get("skill").and_then(scalar_to_string) {
            Some(level) if !level.trim().is_empty() => Some(Skill::from_level(&level).ok_or_else(
                || LauncherError::Runner(format!("invalid skill level {:?}", level)),
            )?),
            _ => None,
        };

        Ok(Self {
            resolution,
            flags,
            skill,
        })
    }
}

pub struct ZDoom {
    executable: PathBuf,
    options: ZDoomOptions,
}

impl ZDoom {
    pub const ID: &'static str = "zdoom";
    pub const HUMAN_NAME: &'static str = "ZDoom";

    pub fn new(runner_dir: &Path, options: ZDoomOptions) -> Self {
        Self {
            executable: runner_dir.join("zdoom"),
            options,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// The WAD to load: `main_file`, falling back to the installed `rom`.
    fn main_file(game: &GameConfig) -> Option<String> {
        game.option("main_file").or_else(|| {
            game.game
                .rom
                .as_ref()
                .map(|rom| rom.to_string_lossy().to_string())
        })
    }

    /// Run in the install directory. Configs written before it was recorded
    /// fall back to the directory holding the main data file.
    pub fn working_dir(&self, game: &GameConfig) -> Option<PathBuf> {
        if let Some(dir) = &game.directory {
            return Some(dir.clone());
        }
        Self::main_file(game)
            .and_then(|wad| Path::new(&wad).parent().map(Path::to_path_buf))
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    pub fn play(&self, game: &GameConfig) -> LauncherResult<Vec<String>> {
        let mut command = vec![self.executable.to_string_lossy().to_string()];

        if let Some(resolution) = &self.options.resolution {
            let resolution = if resolution == DESKTOP_RESOLUTION {
                display::current_resolution()?
            } else {
                resolution.clone()
            };
            let (width, height) = split_resolution(&resolution)?;
            command.push("-width".into());
            command.push(width);
            command.push("-height".into());
            command.push(height);
        }

        for flag in &self.options.flags {
            command.push(format!("-{}", flag));
        }

        if let Some(skill) = self.options.skill {
            command.push("-skill".into());
            command.push(skill.level().into());
        }

        if let Some(warp) = game.option("warp").filter(|w| !w.is_empty()) {
            command.push("-warp".into());
            command.push(warp);
        }

        if let Some(wad) = Self::main_file(game).filter(|w| !w.is_empty()) {
            command.push("-iwad".into());
            command.push(wad);
        }

        if let Some(pwad) = game.option("file").filter(|f| !f.is_empty()) {
            command.push("-file".into());
            command.push(pwad);
        }

        Ok(command)
    }
}

/// Whether a switch value turns the switch on. YAML 1.1 spellings (`yes`,
/// `on`, ...) are honoured since serde_yaml reads them as plain strings.
fn is_enabled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "no" | "n" | "off" | "0"
        ),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => is_enabled(&tagged.value),
    }
}

fn split_resolution(resolution: &str) -> LauncherResult<(String, String)> {
    let invalid = || LauncherError::Runner(format!("invalid resolution {:?}", resolution));
    let (width, height) = resolution.split_once('x').ok_or_else(invalid)?;
    let (width, height) = (width.trim(), height.trim());
    if width.parse::<u32>().is_err() || height.parse::<u32>().is_err() {
        return Err(invalid());
    }
    Ok((width.to_string(), height.to_string()))
}
