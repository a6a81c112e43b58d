use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::config::ConfigStore;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;

const APP_DIR_NAME: &str = "Playdeck";
const SETTINGS_FILE: &str = "launcher_settings.json";
pub const DEFAULT_INSTALLER_URL: &str = "http://lutris.net/media/installers/";

/// Global launcher settings, stored as JSON in the data directory.
///
/// Unset directories fall back to the platform defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Base URL installer descriptors are fetched from; `<name>.yml` is appended.
    pub installer_url: String,
    /// Where downloaded installer descriptors are kept.
    pub cache_dir: Option<PathBuf>,
    /// Root of the per-game scratch directories fetched files land in.
    pub tmp_dir: Option<PathBuf>,
    /// Where runner binaries live.
    pub runner_dir: Option<PathBuf>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            installer_url: DEFAULT_INSTALLER_URL.to_string(),
            cache_dir: None,
            tmp_dir: None,
            runner_dir: None,
        }
    }
}

pub struct AppState {
    pub data_dir: PathBuf,
    pub settings: LauncherSettings,
    pub config_store: ConfigStore,
    pub downloader: Downloader,
}

impl AppState {
    /// Open the launcher state rooted at `data_dir`, or the platform config
    /// directory when `None`.
    pub fn new(data_dir: Option<PathBuf>) -> LauncherResult<Self> {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        std::fs::create_dir_all(&data_dir).map_err(LauncherError::io(&data_dir))?;
        let settings = load_settings_from_disk(&data_dir).unwrap_or_default();
        Self::with_settings(data_dir, settings)
    }

    pub fn with_settings(data_dir: PathBuf, settings: LauncherSettings) -> LauncherResult<Self> {
        let client = build_http_client()?;
        Ok(Self {
            config_store: ConfigStore::new(data_dir.clone()),
            data_dir,
            settings,
            downloader: Downloader::new(client),
        })
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.settings.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR_NAME)
        })
    }

    /// Cached installer descriptors, one `<game>.yml` each.
    pub fn installers_dir(&self) -> PathBuf {
        self.cache_dir().join("installers")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.settings
            .tmp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR_NAME))
    }

    pub fn runner_dir(&self) -> PathBuf {
        self.settings.runner_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME)
                .join("runners")
        })
    }

    pub fn home_dir(&self) -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"))
    }

    pub fn save_settings(&self) -> LauncherResult<()> {
        let settings_path = self.data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&settings_path, json).map_err(LauncherError::io(&settings_path))
    }
}

fn load_settings_from_disk(data_dir: &Path) -> Option<LauncherSettings> {
    let path = data_dir.join(SETTINGS_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("Ignoring corrupt settings at {:?}: {}", path, e);
            None
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
