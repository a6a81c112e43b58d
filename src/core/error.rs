use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the installer and launcher back end.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Installer descriptor unreachable at {url}: {reason}")]
    DescriptorUnreachable { url: String, reason: String },

    #[error("Could not fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    // ── Descriptor ──────────────────────────────────────
    #[error("Wrong protocol version (expected {expected}, got {found})")]
    ProtocolMismatch { expected: u64, found: String },

    #[error("Invalid installer descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Configuration ───────────────────────────────────
    #[error("No install directory configured for runner {runner}")]
    ConfigMissing { runner: String },

    #[error("Install directory missing for runner {runner}")]
    InstallDirMissing { runner: String },

    #[error("Game not found: {0}")]
    GameNotFound(String),

    // ── Actions ─────────────────────────────────────────
    #[error("Action {0} not supported")]
    UnsupportedAction(String),

    #[error("Unknown file identifier: {0}")]
    UnknownFile(String),

    #[error("Cannot move {src:?} to {dst:?}: {reason}")]
    MoveFailed {
        src: PathBuf,
        dst: PathBuf,
        reason: String,
    },

    #[error("Unable to find executable {0:?}")]
    ExecutableMissing(PathBuf),

    #[error("MD5 mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Extraction of {path:?} failed: {reason}")]
    ExtractFailed { path: PathBuf, reason: String },

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Runner ──────────────────────────────────────────
    #[error("Unknown runner: {0}")]
    UnknownRunner(String),

    #[error("Runner error: {0}")]
    Runner(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    /// Whether an error raised by an install action stops the whole session.
    ///
    /// Move failures are reported and the remaining actions still run.
    /// Everything else aborts.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LauncherError::MoveFailed { .. })
    }

    /// Short category shown to the user next to the game name.
    pub fn category(&self) -> &'static str {
        match self {
            LauncherError::DescriptorUnreachable { .. } => "installer unreachable",
            LauncherError::ProtocolMismatch { .. } => "protocol mismatch",
            LauncherError::InvalidDescriptor(_)
            | LauncherError::Yaml(_)
            | LauncherError::UnknownFile(_) => "invalid installer",
            LauncherError::ConfigMissing { .. } | LauncherError::InstallDirMissing { .. } => {
                "install directory missing"
            }
            LauncherError::FetchFailed { .. } | LauncherError::Http(_) => "download failed",
            LauncherError::MoveFailed { .. } => "move failed",
            LauncherError::ExecutableMissing(_) => "executable missing",
            LauncherError::UnsupportedAction(_) => "unsupported action",
            LauncherError::ChecksumMismatch { .. } => "checksum mismatch",
            LauncherError::ExtractFailed { .. } | LauncherError::Zip(_) => "extraction failed",
            LauncherError::GameNotFound(_) => "game not found",
            LauncherError::UnknownRunner(_) | LauncherError::Runner(_) => "runner error",
            LauncherError::Io { .. } | LauncherError::Json(_) | LauncherError::Other(_) => {
                "internal error"
            }
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| LauncherError::Io { path, source }
    }
}
