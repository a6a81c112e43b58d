// ─── Front end boundary ───
// The install session never touches a UI directly. Whatever drives it
// (console, dialog, service) implements `Frontend`.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

/// Progress of a single file transfer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DownloadProgress {
    pub url: String,
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
    pub file_name: String,
}

impl DownloadProgress {
    pub fn percent(&self) -> Option<u64> {
        match self.total_bytes {
            Some(total) if total > 0 => Some(self.bytes_downloaded.saturating_mul(100) / total),
            _ => None,
        }
    }
}

/// Requests a session queues for the user when it cannot continue on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// No install root is configured; ask where games should go.
    AskGamesDir,
}

#[async_trait]
pub trait Frontend: Send + Sync {
    /// Ask the user to pick a directory. `None` means the prompt was cancelled.
    async fn ask_directory(&self, prompt: &str) -> Option<PathBuf>;

    /// Called repeatedly while a file downloads.
    fn download_progress(&self, progress: &DownloadProgress);
}

/// Front end for unattended runs: never answers prompts, logs progress.
pub struct HeadlessFrontend;

#[async_trait]
impl Frontend for HeadlessFrontend {
    async fn ask_directory(&self, prompt: &str) -> Option<PathBuf> {
        debug!("Headless front end cannot answer prompt: {}", prompt);
        None
    }

    fn download_progress(&self, progress: &DownloadProgress) {
        debug!(
            "{}: {} / {:?} bytes",
            progress.file_name, progress.bytes_downloaded, progress.total_bytes
        );
    }
}

/// Terminal front end: prompts on stdin, prints a percentage on stderr.
pub struct ConsoleFrontend;

#[async_trait]
impl Frontend for ConsoleFrontend {
    async fn ask_directory(&self, prompt: &str) -> Option<PathBuf> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || {
            eprint!("{}: ", prompt);
            let _ = std::io::stderr().flush();
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).ok()?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(PathBuf::from(trimmed))
            }
        })
        .await
        .ok()
        .flatten()
    }

    fn download_progress(&self, progress: &DownloadProgress) {
        match progress.percent() {
            Some(percent) => eprint!("\r{} {:>3} %", progress.file_name, percent),
            None => eprint!("\r{} {} bytes", progress.file_name, progress.bytes_downloaded),
        }
        if progress.total_bytes == Some(progress.bytes_downloaded) {
            eprintln!();
        }
    }
}
