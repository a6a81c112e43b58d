// ─── Install session ───
// Drives one install attempt from descriptor to written game config.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::context::{ActionContext, ResolvedFiles};
use super::descriptor::{slug_from_path, InstallerDescriptor};
use super::executor;
use crate::core::config::{GameConfig, RunnerConfig};
use crate::core::downloader::FileFetcher;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::frontend::{Frontend, UserAction};
use crate::core::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    DescriptorFetched,
    DescriptorParsed,
    FilesReady,
    ActionsApplied,
    ConfigWritten,
    Aborted,
}

/// One install attempt. Build a fresh session per attempt.
pub struct InstallSession<'a> {
    app: &'a AppState,
    frontend: &'a dyn Frontend,
    game_name: String,
    descriptor_path: PathBuf,
    state: SessionState,
    descriptor: Option<InstallerDescriptor>,
    runner_config: Option<RunnerConfig>,
    game_dir: Option<PathBuf>,
    files: ResolvedFiles,
    /// Non-fatal action failures, in the order they happened.
    reported_errors: Vec<LauncherError>,
    user_actions: Vec<UserAction>,
}

impl<'a> InstallSession<'a> {
    /// Install `game_name`, using the cached descriptor if there is one and
    /// downloading it from the installer index otherwise.
    pub fn new(app: &'a AppState, frontend: &'a dyn Frontend, game_name: &str) -> Self {
        let descriptor_path = app.installers_dir().join(format!("{}.yml", game_name));
        Self::build(app, frontend, game_name.to_string(), descriptor_path)
    }

    /// Install from a descriptor file already on disk.
    pub fn with_installer(app: &'a AppState, frontend: &'a dyn Frontend, path: &Path) -> Self {
        Self::build(app, frontend, slug_from_path(path), path.to_path_buf())
    }

    fn build(
        app: &'a AppState,
        frontend: &'a dyn Frontend,
        game_name: String,
        descriptor_path: PathBuf,
    ) -> Self {
        Self {
            app,
            frontend,
            game_name,
            descriptor_path,
            state: SessionState::Uninitialized,
            descriptor: None,
            runner_config: None,
            game_dir: None,
            files: ResolvedFiles::new(),
            reported_errors: Vec::new(),
            user_actions: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The game's display name once parsed, else the name it was requested by.
    pub fn game_name(&self) -> &str {
        self.descriptor
            .as_ref()
            .map(|d| d.name.as_str())
            .unwrap_or(&self.game_name)
    }

    pub fn descriptor(&self) -> Option<&InstallerDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn runner_config(&self) -> Option<&RunnerConfig> {
        self.runner_config.as_ref()
    }

    pub fn game_dir(&self) -> Option<&Path> {
        self.game_dir.as_deref()
    }

    pub fn resolved_files(&self) -> &ResolvedFiles {
        &self.files
    }

    pub fn reported_errors(&self) -> &[LauncherError] {
        &self.reported_errors
    }

    /// Things the user must do before a retry can succeed.
    pub fn user_actions(&self) -> &[UserAction] {
        &self.user_actions
    }

    /// Full install: `prepare` then `install`.
    pub async fn run(&mut self) -> LauncherResult<GameConfig> {
        self.prepare().await?;
        self.install().await
    }

    /// Fetch and parse the descriptor and resolve the install directory.
    pub async fn prepare(&mut self) -> LauncherResult<()> {
        let result = self.prepare_steps().await;
        self.settle(result)
    }

    /// Fetch game files, apply actions and write the game config.
    pub async fn install(&mut self) -> LauncherResult<GameConfig> {
        let result = self.install_steps().await;
        self.settle(result)
    }

    async fn prepare_steps(&mut self) -> LauncherResult<()> {
        self.expect_state(SessionState::Uninitialized)?;
        self.fetch_descriptor().await?;
        self.parse_descriptor().await
    }

    async fn install_steps(&mut self) -> LauncherResult<GameConfig> {
        self.expect_state(SessionState::DescriptorParsed)?;
        self.fetch_game_files().await?;
        self.apply_actions().await?;
        let config = self.write_config().await?;
        info!("{} installed", self.game_name());
        Ok(config)
    }

    fn expect_state(&self, expected: SessionState) -> LauncherResult<()> {
        if self.state != expected {
            return Err(LauncherError::Other(format!(
                "install session is {:?}, expected {:?}",
                self.state, expected
            )));
        }
        Ok(())
    }

    fn settle<T>(&mut self, result: LauncherResult<T>) -> LauncherResult<T> {
        if let Err(e) = &result {
            self.state = SessionState::Aborted;
            error!("Unable to install {}: {}", self.game_name(), e);
        }
        result
    }

    // ── Uninitialized → DescriptorFetched ──

    async fn fetch_descriptor(&mut self) -> LauncherResult<()> {
        if self.descriptor_path.exists() {
            debug!("Using local copy of the installer {:?}", self.descriptor_path);
        } else {
            let url = format!("{}{}.yml", self.app.settings.installer_url, self.game_name);
            info!("Fetching installer {}", url);
            self.app
                .downloader
                .download_file(&url, &self.descriptor_path, None)
                .await
                .map_err(|e| match e {
                    LauncherError::FetchFailed { url, reason } => {
                        LauncherError::DescriptorUnreachable { url, reason }
                    }
                    other => other,
                })?;
        }
        self.state = SessionState::DescriptorFetched;
        Ok(())
    }

    // ── DescriptorFetched → DescriptorParsed ──

    async fn parse_descriptor(&mut self) -> LauncherResult<()> {
        let descriptor = InstallerDescriptor::load(&self.descriptor_path).await?;
        debug!(
            "Parsed installer for {} (runner {}, {} files, {} actions)",
            descriptor.name,
            descriptor.runner,
            descriptor.files.len(),
            descriptor.actions.len()
        );

        let runner_config = match self.app.config_store.load(&descriptor.runner).await {
            Ok(config) => config,
            Err(LauncherError::ConfigMissing { runner }) => {
                debug!("Install dir missing");
                self.user_actions.push(UserAction::AskGamesDir);
                self.descriptor = Some(descriptor);
                return Err(LauncherError::InstallDirMissing { runner });
            }
            Err(e) => return Err(e),
        };

        self.game_dir = Some(runner_config.install_root.join(&descriptor.name));
        self.runner_config = Some(runner_config);
        self.descriptor = Some(descriptor);
        self.state = SessionState::DescriptorParsed;
        Ok(())
    }

    // ── DescriptorParsed → FilesReady ──

    async fn fetch_game_files(&mut self) -> LauncherResult<()> {
        let (descriptor, game_dir) = parsed(&self.descriptor, &self.game_dir)?;

        tokio::fs::create_dir_all(game_dir)
            .await
            .map_err(LauncherError::io(game_dir))?;

        let fetcher = FileFetcher::new(
            self.app.tmp_dir().join(&descriptor.slug),
            &self.app.downloader,
            self.frontend,
        );
        for declaration in &descriptor.files {
            let path = fetcher.resolve(&declaration.id, &declaration.source).await?;
            self.files.insert(declaration.id.clone(), path);
        }
        debug!("{} game files ready for {}", self.files.len(), descriptor.name);

        self.state = SessionState::FilesReady;
        Ok(())
    }

    // ── FilesReady → ActionsApplied ──

    async fn apply_actions(&mut self) -> LauncherResult<()> {
        let (descriptor, game_dir) = parsed(&self.descriptor, &self.game_dir)?;
        let home_dir = self.app.home_dir();
        let fallback_dir = self.app.tmp_dir();
        tokio::fs::create_dir_all(&fallback_dir)
            .await
            .map_err(LauncherError::io(&fallback_dir))?;

        let ctx = ActionContext {
            game_dir,
            working_dir: game_dir,
            home_dir: &home_dir,
            fallback_dir: &fallback_dir,
            files: &self.files,
        };

        for action in &descriptor.actions {
            match executor::execute(action, &ctx).await {
                Ok(outcome) => debug!("{} -> {:?}", action.name(), outcome),
                Err(e) if !e.is_fatal() => {
                    warn!("{} failed, continuing: {}", action.name(), e);
                    self.reported_errors.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        self.state = SessionState::ActionsApplied;
        Ok(())
    }

    // ── ActionsApplied → ConfigWritten ──

    async fn write_config(&mut self) -> LauncherResult<GameConfig> {
        let (descriptor, game_dir) = parsed(&self.descriptor, &self.game_dir)?;

        let mut config = GameConfig::new(&descriptor.name, &descriptor.runner);
        config.directory = Some(game_dir.to_path_buf());
        config.game.exe = descriptor.exe.as_ref().map(|exe| game_dir.join(exe));
        config.game.iso = descriptor.iso.as_ref().map(|iso| game_dir.join(iso));
        config.game.rom = descriptor.rom.as_ref().map(|rom| game_dir.join(rom));

        self.app.config_store.save(&descriptor.slug, &config).await?;
        self.state = SessionState::ConfigWritten;
        Ok(config)
    }
}

/// Borrow the parsed descriptor and game dir without tying up the rest of the session.
fn parsed<'s>(
    descriptor: &'s Option<InstallerDescriptor>,
    game_dir: &'s Option<PathBuf>,
) -> LauncherResult<(&'s InstallerDescriptor, &'s Path)> {
    match (descriptor, game_dir) {
        (Some(descriptor), Some(game_dir)) => Ok((descriptor, game_dir.as_path())),
        _ => Err(LauncherError::Other("installer descriptor not parsed".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frontend::HeadlessFrontend;
    use crate::core::state::LauncherSettings;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Sandbox {
        root: PathBuf,
        app: AppState,
    }

    impl Sandbox {
        async fn new(label: &str, with_games_dir: bool) -> Self {
            Self::with_installer_url(label, with_games_dir, "http://127.0.0.1:9/").await
        }

        async fn with_installer_url(label: &str, with_games_dir: bool, installer_url: &str) -> Self {
            let root = std::env::temp_dir().join(format!(
                "playdeck-session-{}-{}",
                label,
                std::process::id()
            ));
            let _ = std::fs::remove_dir_all(&root);
            std::fs::create_dir_all(&root).unwrap();

            let settings = LauncherSettings {
                installer_url: installer_url.to_string(),
                cache_dir: Some(root.join("cache")),
                tmp_dir: Some(root.join("tmp")),
                runner_dir: Some(root.join("runners")),
            };
            let app = AppState::with_settings(root.join("config"), settings).unwrap();
            if with_games_dir {
                app.config_store
                    .set_games_dir(&root.join("games"))
                    .await
                    .unwrap();
            }
            Self { root, app }
        }

        fn write(&self, name: &str, body: &str) -> PathBuf {
            let path = self.root.join(name);
            std::fs::write(&path, body).unwrap();
            path
        }

        fn doom_descriptor(&self, installer: &str) -> PathBuf {
            let wad = self.write("doom.wad", "IWAD");
            let text = format!(
                "protocol: 1\nversion: \"1.0\"\nrunner: zdoom\nname: Doom\nrom: doom.wad\nfiles:\n  - wad: \"file://{}\"\ninstaller:\n{}",
                wad.display(),
                installer
            );
            self.write("doom.yml", &text)
        }
    }

    impl Drop for Sandbox {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    #[tokio::test]
    async fn doom_installs_end_to_end() {
        let sandbox = Sandbox::new("e2e", true).await;
        let descriptor = sandbox.doom_descriptor("  - move:\n      src: wad\n      dst: gamedir\n");
        let frontend = HeadlessFrontend;

        let mut session = InstallSession::with_installer(&sandbox.app, &frontend, &descriptor);
        let config = session.run().await.unwrap();

        let game_dir = sandbox.root.join("games").join("Doom");
        assert!(game_dir.join("doom.wad").exists());
        assert_eq!(session.state(), SessionState::ConfigWritten);
        assert_eq!(config.runner, "zdoom");
        assert_eq!(config.realname, "Doom");
        assert_eq!(config.game.rom, Some(game_dir.join("doom.wad")));
        assert_eq!(config.directory.as_deref(), Some(game_dir.as_path()));

        let written = std::fs::read_to_string(
            sandbox.root.join("config").join("games").join("doom.yml"),
        )
        .unwrap();
        let yaml: serde_yaml::Value = serde_yaml::from_str(&written).unwrap();
        assert_eq!(yaml["runner"], serde_yaml::Value::String("zdoom".into()));
        assert_eq!(yaml["realname"], serde_yaml::Value::String("Doom".into()));
    }

    #[tokio::test]
    async fn protocol_mismatch_touches_nothing() {
        let sandbox = Sandbox::new("protocol", true).await;
        let descriptor = sandbox.write(
            "future.yml",
            "protocol: 2\nversion: '1'\nrunner: zdoom\nname: Future\nfiles:\n  - a: file:///x\n",
        );
        let frontend = HeadlessFrontend;

        let mut session = InstallSession::with_installer(&sandbox.app, &frontend, &descriptor);
        let err = session.run().await.unwrap_err();

        assert!(matches!(err, LauncherError::ProtocolMismatch { expected: 1, ref found } if found == "2"));
        assert_eq!(session.state(), SessionState::Aborted);
        assert!(!sandbox.root.join("games").exists());
        assert!(!sandbox.root.join("tmp").exists());
    }

    #[tokio::test]
    async fn missing_install_dir_queues_a_user_action() {
        let sandbox = Sandbox::new("no-games-dir", false).await;
        let descriptor = sandbox.doom_descriptor("  - locate: ~\n");
        let frontend = HeadlessFrontend;

        let mut session = InstallSession::with_installer(&sandbox.app, &frontend, &descriptor);
        let err = session.prepare().await.unwrap_err();

        assert!(matches!(err, LauncherError::InstallDirMissing { runner } if runner == "zdoom"));
        assert_eq!(session.user_actions(), &[UserAction::AskGamesDir]);
        assert_eq!(session.state(), SessionState::Aborted);
    }

    #[tokio::test]
    async fn unsupported_action_stops_the_session_before_config() {
        let sandbox = Sandbox::new("unsupported", true).await;
        let descriptor = sandbox.doom_descriptor(
            "  - move:\n      src: wad\n      dst: gamedir\n  - frobnicate: {}\n  - locate: ~\n",
        );
        let frontend = HeadlessFrontend;

        let mut session = InstallSession::with_installer(&sandbox.app, &frontend, &descriptor);
        let err = session.run().await.unwrap_err();

        assert!(matches!(err, LauncherError::UnsupportedAction(_)));
        // actions before the unknown one already ran
        assert!(sandbox.root.join("games").join("Doom").join("doom.wad").exists());
        assert!(!sandbox.root.join("config").join("games").join("doom.yml").exists());
    }

    #[tokio::test]
    async fn move_failure_is_reported_and_install_continues() {
        let sandbox = Sandbox::new("move-failure", true).await;
        let descriptor = sandbox.doom_descriptor(
            "  - move:\n      src: /nonexistent/readme.txt\n      dst: gamedir\n  - move:\n      src: wad\n      dst: gamedir\n",
        );
        let frontend = HeadlessFrontend;

        let mut session = InstallSession::with_installer(&sandbox.app, &frontend, &descriptor);
        session.run().await.unwrap();

        assert_eq!(session.reported_errors().len(), 1);
        assert!(matches!(
            session.reported_errors()[0],
            LauncherError::MoveFailed { .. }
        ));
        assert!(sandbox.root.join("games").join("Doom").join("doom.wad").exists());
    }

    #[tokio::test]
    async fn resolved_files_are_recorded_in_declaration_order() {
        let sandbox = Sandbox::new("resolved", true).await;
        let descriptor = sandbox.doom_descriptor("  - locate: ~\n");
        let frontend = HeadlessFrontend;

        let mut session = InstallSession::with_installer(&sandbox.app, &frontend, &descriptor);
        session.prepare().await.unwrap();
        assert_eq!(session.state(), SessionState::DescriptorParsed);
        assert!(session.resolved_files().is_empty());

        session.install().await.unwrap();
        assert_eq!(
            session.resolved_files().get("wad"),
            Some(sandbox.root.join("tmp").join("doom").join("doom.wad").as_path())
        );
    }

    #[tokio::test]
    async fn descriptor_is_downloaded_then_reused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/installers/quake.yml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "protocol: 1\nversion: '1'\nrunner: zdoom\nname: Quake\n",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/installers/", server.uri());
        let sandbox = Sandbox::with_installer_url("download", true, &url).await;
        let frontend = HeadlessFrontend;

        let mut first = InstallSession::new(&sandbox.app, &frontend, "quake");
        first.run().await.unwrap();
        assert!(sandbox.root.join("cache").join("installers").join("quake.yml").exists());

        let mut second = InstallSession::new(&sandbox.app, &frontend, "quake");
        second.prepare().await.unwrap();
        assert_eq!(second.game_name(), "Quake");
    }

    #[tokio::test]
    async fn unreachable_index_is_descriptor_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/installers/", server.uri());
        let sandbox = Sandbox::with_installer_url("unreachable", true, &url).await;
        let frontend = HeadlessFrontend;

        let mut session = InstallSession::new(&sandbox.app, &frontend, "hexen");
        let err = session.run().await.unwrap_err();

        assert!(matches!(err, LauncherError::DescriptorUnreachable { .. }));
        assert_eq!(err.category(), "installer unreachable");
    }

    #[tokio::test]
    async fn install_requires_prepare_first() {
        let sandbox = Sandbox::new("order", true).await;
        let descriptor = sandbox.doom_descriptor("  - locate: ~\n");
        let frontend = HeadlessFrontend;

        let mut session = InstallSession::with_installer(&sandbox.app, &frontend, &descriptor);
        assert!(session.install().await.is_err());
        assert_eq!(session.state(), SessionState::Aborted);
    }
}
