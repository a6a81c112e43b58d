use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::frontend::{DownloadProgress, Frontend};

/// Sequential HTTP downloader reporting progress to the front end.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` to `dest`.
    ///
    /// Creates parent directories as needed. The body is streamed into a
    /// `.part` sibling which is renamed over `dest` only once complete, so an
    /// interrupted transfer never leaves a file the cache would reuse.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        frontend: Option<&dyn Frontend>,
    ) -> LauncherResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(LauncherError::io(parent))?;
        }

        let fetch_failed = |reason: String| LauncherError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_failed(format!("HTTP {}", status.as_u16())));
        }

        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let part_path = dest.with_file_name(format!(".{}.{}.part", file_name, Uuid::new_v4()));

        let written = async {
            let bytes = write_part(response, &part_path, url, &file_name, frontend).await?;
            tokio::fs::rename(&part_path, dest)
                .await
                .map_err(LauncherError::io(dest))?;
            Ok::<u64, LauncherError>(bytes)
        }
        .await;

        let bytes_downloaded = match written {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, bytes_downloaded);
        Ok(())
    }
}

/// Stream the response body into `part_path`, returning the byte count.
async fn write_part(
    response: reqwest::Response,
    part_path: &Path,
    url: &str,
    file_name: &str,
    frontend: Option<&dyn Frontend>,
) -> LauncherResult<u64> {
    let total_bytes = response.content_length();
    let mut file = tokio::fs::File::create(part_path)
        .await
        .map_err(LauncherError::io(part_path))?;
    let mut stream = response.bytes_stream();
    let mut bytes_downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| LauncherError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        file.write_all(&chunk)
            .await
            .map_err(LauncherError::io(part_path))?;
        bytes_downloaded += chunk.len() as u64;

        if let Some(frontend) = frontend {
            frontend.download_progress(&DownloadProgress {
                url: url.to_string(),
                bytes_downloaded,
                total_bytes,
                file_name: file_name.to_string(),
            });
        }
    }

    file.flush().await.map_err(LauncherError::io(part_path))?;
    Ok(bytes_downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scratch_dir(label: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "playdeck-downloader-{}-{}",
            label,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn download_writes_body_and_leaves_no_part_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doom.wad"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"IWAD".to_vec()))
            .mount(&server)
            .await;

        let dir = scratch_dir("ok");
        let dest = dir.join("nested").join("doom.wad");
        let downloader = Downloader::new(Client::new());
        downloader
            .download_file(&format!("{}/doom.wad", server.uri()), &dest, None)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"IWAD");
        let leftovers = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .count();
        assert_eq!(leftovers, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn http_error_status_is_a_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = scratch_dir("404");
        let dest = dir.join("missing.zip");
        let err = Downloader::new(Client::new())
            .download_file(&format!("{}/missing.zip", server.uri()), &dest, None)
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::FetchFailed { .. }));
        assert!(err.to_string().contains("HTTP 404"));
        assert!(!dest.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_part_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"IWAD".to_vec()))
            .mount(&server)
            .await;

        let dir = scratch_dir("rename");
        // an occupied directory cannot be replaced by a file
        let dest = dir.join("doom.wad");
        std::fs::create_dir_all(dest.join("occupied")).unwrap();

        let err = Downloader::new(Client::new())
            .download_file(&format!("{}/doom.wad", server.uri()), &dest, None)
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::Io { .. }));
        let leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .count();
        assert_eq!(leftovers, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
