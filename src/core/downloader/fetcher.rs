// ─── Game file fetcher ───
// Resolves a declared game file to a path inside the per-game cache dir.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::client::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::frontend::Frontend;
use crate::core::installer::descriptor::FileSource;

/// URL prefix meaning "ask the user which directory holds this file".
pub const ASK_DIR_MARKER: &str = "$ASK_DIR";
const FILE_SCHEME: &str = "file://";

/// Where a declared file comes from, once its URL has been classified.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin<'a> {
    Local(&'a str),
    AskDir(&'a str),
    Remote(&'a str),
}

impl<'a> Origin<'a> {
    fn classify(url: &'a str) -> Self {
        if let Some(location) = url.strip_prefix(FILE_SCHEME) {
            Origin::Local(location)
        } else if let Some(rest) = url.strip_prefix(ASK_DIR_MARKER) {
            // one separator character follows the marker
            let mut chars = rest.chars();
            chars.next();
            Origin::AskDir(chars.as_str())
        } else {
            Origin::Remote(url)
        }
    }
}

pub struct FileFetcher<'a> {
    cache_dir: PathBuf,
    downloader: &'a Downloader,
    frontend: &'a dyn Frontend,
}

impl<'a> FileFetcher<'a> {
    /// `cache_dir` is the per-slug directory fetched files land in.
    pub fn new(cache_dir: PathBuf, downloader: &'a Downloader, frontend: &'a dyn Frontend) -> Self {
        Self {
            cache_dir,
            downloader,
            frontend,
        }
    }

    /// Fetch `source` and return the local path it now lives at.
    ///
    /// A file already present in the cache under the destination name is
    /// returned as is, so resolving the same declaration twice only does the
    /// work once.
    pub async fn resolve(&self, identifier: &str, source: &FileSource) -> LauncherResult<PathBuf> {
        let url = source.url();
        debug!("Fetching {} from {}", identifier, url);

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(LauncherError::io(&self.cache_dir))?;

        let file_name = destination_name(source)?;
        let dest_file = self.cache_dir.join(&file_name);
        if dest_file.exists() {
            debug!("{} already cached at {:?}", identifier, dest_file);
            return Ok(dest_file);
        }

        let resolved = match Origin::classify(url) {
            Origin::Local(location) => {
                self.import_local(url, Path::new(location), &dest_file, source.copy())
                    .await?
            }
            Origin::AskDir(basename) => {
                let prompt = format!("Select location of file {}", basename);
                let dir = self.frontend.ask_directory(&prompt).await.ok_or_else(|| {
                    LauncherError::FetchFailed {
                        url: url.to_string(),
                        reason: "no directory selected".into(),
                    }
                })?;
                self.import_local(url, &dir.join(basename), &dest_file, source.copy())
                    .await?
            }
            Origin::Remote(remote) => {
                self.downloader
                    .download_file(remote, &dest_file, Some(self.frontend))
                    .await?;
                dest_file
            }
        };

        info!("Resolved {} -> {:?}", identifier, resolved);
        Ok(resolved)
    }

    async fn import_local(
        &self,
        url: &str,
        location: &Path,
        dest_file: &Path,
        copy: bool,
    ) -> LauncherResult<PathBuf> {
        if !location.exists() {
            return Err(LauncherError::FetchFailed {
                url: url.to_string(),
                reason: format!("{:?} does not exist", location),
            });
        }
        if !copy {
            return Ok(location.to_path_buf());
        }
        tokio::fs::copy(location, dest_file)
            .await
            .map_err(|e| LauncherError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(dest_file.to_path_buf())
    }
}

/// The file name a source is stored under: the explicit override, else the
/// last segment of its URL.
pub fn destination_name(source: &FileSource) -> LauncherResult<String> {
    if let Some(name) = source.filename() {
        return Ok(name.to_string());
    }

    let url = source.url();
    let basename = match url::Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        _ => url.rsplit('/').next().map(str::to_string),
    };

    basename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| LauncherError::InvalidDescriptor(format!("no file name in url {}", url)))
}
