use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::Value;
use tracing::{debug, info};

use super::model::{GameConfig, RunnerConfig, RunnerFile, SystemFile};
use crate::core::error::{LauncherError, LauncherResult};

/// Reads and writes the YAML configuration tree:
///
/// - `system.yml`       : global install root
/// - `runners/<id>.yml` : per-runner install root and options
/// - `games/<slug>.yml` : one launcher config per installed game
pub struct ConfigStore {
    config_dir: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn game_config_path(&self, slug: &str) -> PathBuf {
        self.config_dir.join("games").join(format!("{}.yml", slug))
    }

    fn runner_config_path(&self, runner_id: &str) -> PathBuf {
        self.config_dir.join("runners").join(format!("{}.yml", runner_id))
    }

    fn system_config_path(&self) -> PathBuf {
        self.config_dir.join("system.yml")
    }

    /// Load a runner's settings and resolve where its games are installed.
    ///
    /// The runner's own `game_path` wins over the global one. Fails with
    /// `ConfigMissing` when neither is set.
    pub async fn load(&self, runner_id: &str) -> LauncherResult<RunnerConfig> {
        let runner_file: RunnerFile = read_yaml_or_default(&self.runner_config_path(runner_id)).await?;
        let system_file: SystemFile = read_yaml_or_default(&self.system_config_path()).await?;

        let install_root = runner_file
            .game_path
            .or(system_file.game_path)
            .ok_or_else(|| LauncherError::ConfigMissing {
                runner: runner_id.to_string(),
            })?;

        debug!("Runner {} installs under {:?}", runner_id, install_root);
        Ok(RunnerConfig {
            runner_id: runner_id.to_string(),
            install_root,
            options: runner_file.options,
        })
    }

    /// Runner options alone; unlike `load`, no install root is needed.
    pub async fn runner_options(&self, runner_id: &str) -> LauncherResult<BTreeMap<String, Value>> {
        let runner_file: RunnerFile = read_yaml_or_default(&self.runner_config_path(runner_id)).await?;
        Ok(runner_file.options)
    }

    /// Persist the global install root.
    pub async fn set_games_dir(&self, path: &Path) -> LauncherResult<()> {
        let mut system_file: SystemFile = read_yaml_or_default(&self.system_config_path()).await?;
        system_file.game_path = Some(path.to_path_buf());
        write_yaml(&self.system_config_path(), &system_file).await?;
        info!("Games directory set to {:?}", path);
        Ok(())
    }

    /// Write a game's launcher config, replacing any previous one.
    pub async fn save(&self, slug: &str, config: &GameConfig) -> LauncherResult<()> {
        let path = self.game_config_path(slug);
        write_yaml(&path, config).await?;
        info!("Wrote game config {:?}", path);
        Ok(())
    }

    pub async fn load_game(&self, slug: &str) -> LauncherResult<GameConfig> {
        let path = self.game_config_path(slug);
        if !path.exists() {
            return Err(LauncherError::GameNotFound(slug.to_string()));
        }
        read_yaml(&path).await
    }

    /// Slugs of every installed game, sorted.
    pub async fn list_games(&self) -> LauncherResult<Vec<String>> {
        let games_dir = self.config_dir.join("games");
        let mut slugs = Vec::new();

        if !games_dir.exists() {
            return Ok(slugs);
        }

        let mut entries = tokio::fs::read_dir(&games_dir)
            .await
            .map_err(LauncherError::io(&games_dir))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(LauncherError::io(&games_dir))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yml") {
                if let Some(stem) = path.file_stem() {
                    slugs.push(stem.to_string_lossy().to_string());
                }
            }
        }

        slugs.sort();
        Ok(slugs)
    }
}

async fn read_yaml<T: DeserializeOwned>(path: &Path) -> LauncherResult<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(LauncherError::io(path))?;
    Ok(serde_yaml::from_str(&raw)?)
}

async fn read_yaml_or_default<T: DeserializeOwned + Default>(path: &Path) -> LauncherResult<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(LauncherError::io(path))?;
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_str(&raw)?)
}

/// Serialize to a temporary sibling, then rename over `path`.
async fn write_yaml<T: Serialize>(path: &Path, value: &T) -> LauncherResult<()> {
    let yaml = serde_yaml::to_string(value)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(LauncherError::io(parent))?;
    }

    let tmp_path = path.with_extension("yml.tmp");
    tokio::fs::write(&tmp_path, yaml)
        .await
        .map_err(LauncherError::io(&tmp_path))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(LauncherError::io(path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store(label: &str) -> (PathBuf, ConfigStore) {
        let dir = std::env::temp_dir().join(format!(
            "playdeck-config-{}-{}",
            label,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        (dir.clone(), ConfigStore::new(dir))
    }

    #[tokio::test]
    async fn load_without_any_game_path_is_config_missing() {
        let (dir, store) = scratch_store("missing");
        let err = store.load("zdoom").await.unwrap_err();
        assert!(matches!(err, LauncherError::ConfigMissing { runner } if runner == "zdoom"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn global_games_dir_applies_to_every_runner() {
        let (dir, store) = scratch_store("global");
        store.set_games_dir(Path::new("/srv/games")).await.unwrap();

        let config = store.load("zdoom").await.unwrap();
        assert_eq!(config.install_root, PathBuf::from("/srv/games"));
        assert!(config.options.is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn runner_game_path_overrides_global() {
        let (dir, store) = scratch_store("runner");
        store.set_games_dir(Path::new("/srv/games")).await.unwrap();
        std::fs::create_dir_all(dir.join("runners")).unwrap();
        std::fs::write(
            dir.join("runners").join("zdoom.yml"),
            "game_path: /srv/doom\noptions:\n  skill: '3'\n  nomusic: true\n",
        )
        .unwrap();

        let config = store.load("zdoom").await.unwrap();
        assert_eq!(config.install_root, PathBuf::from("/srv/doom"));
        assert_eq!(config.options.get("nomusic"), Some(&Value::Bool(true)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn saved_game_config_loads_back_and_is_overwritten() {
        let (dir, store) = scratch_store("games");
        let mut config = GameConfig::new("Doom", "zdoom");
        config.game.rom = Some(PathBuf::from("/srv/games/Doom/doom.wad"));
        store.save("doom", &config).await.unwrap();
        assert_eq!(store.load_game("doom").await.unwrap(), config);

        config.realname = "The Ultimate Doom".into();
        store.save("doom", &config).await.unwrap();
        assert_eq!(
            store.load_game("doom").await.unwrap().realname,
            "The Ultimate Doom"
        );
        assert!(!dir.join("games").join("doom.yml.tmp").exists());
        assert_eq!(store.list_games().await.unwrap(), vec!["doom".to_string()]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unknown_game_is_not_found() {
        let (dir, store) = scratch_store("unknown");
        let err = store.load_game("quake").await.unwrap_err();
        assert!(matches!(err, LauncherError::GameNotFound(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
