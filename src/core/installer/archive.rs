use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

/// Archive formats the `extract` action knows how to unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    TarBz2,
}

impl ArchiveKind {
    /// Guess the format from the file name. `None` for anything unrecognised.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar.bz2") {
            Some(ArchiveKind::TarBz2)
        } else {
            None
        }
    }
}

/// What to unpack and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractPlan {
    pub kind: ArchiveKind,
    pub archive: PathBuf,
    pub dest: PathBuf,
}

/// Decide where an archive goes.
///
/// Zip archives unpack into the game directory, gzip tarballs into its parent
/// (they usually carry their own top-level folder) and bzip2 tarballs into the
/// working directory.
pub fn plan_extraction(archive: &Path, game_dir: &Path, working_dir: &Path) -> Option<ExtractPlan> {
    let kind = ArchiveKind::detect(archive)?;
    let dest = match kind {
        ArchiveKind::Zip => game_dir.to_path_buf(),
        ArchiveKind::TarGz => game_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| game_dir.to_path_buf()),
        ArchiveKind::TarBz2 => working_dir.to_path_buf(),
    };
    Some(ExtractPlan {
        kind,
        archive: archive.to_path_buf(),
        dest,
    })
}

pub async fn extract(plan: &ExtractPlan) -> LauncherResult<()> {
    info!("Extracting {:?} into {:?}", plan.archive, plan.dest);
    tokio::fs::create_dir_all(&plan.dest)
        .await
        .map_err(LauncherError::io(&plan.dest))?;

    match plan.kind {
        ArchiveKind::Zip => {
            let archive = plan.archive.clone();
            let dest = plan.dest.clone();
            run_blocking(move || unzip(&archive, &dest)).await
        }
        ArchiveKind::TarGz => {
            let archive = plan.archive.clone();
            let dest = plan.dest.clone();
            run_blocking(move || untar_gz(&archive, &dest)).await
        }
        ArchiveKind::TarBz2 => untar_bz2(&plan.archive, &plan.dest).await,
    }
}

async fn run_blocking<F>(job: F) -> LauncherResult<()>
where
    F: FnOnce() -> LauncherResult<()> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| LauncherError::Other(format!("extraction task failed: {}", e)))?
}

fn unzip(archive: &Path, dest: &Path) -> LauncherResult<()> {
    let file = File::open(archive).map_err(LauncherError::io(archive))?;
    let mut zip = zip::ZipArchive::new(file)?;
    debug!("{:?}: {} entries", archive, zip.len());
    zip.extract(dest)?;
    Ok(())
}

fn untar_gz(archive: &Path, dest: &Path) -> LauncherResult<()> {
    let file = File::open(archive).map_err(LauncherError::io(archive))?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball.unpack(dest).map_err(|e| LauncherError::ExtractFailed {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    })
}

async fn untar_bz2(archive: &Path, dest: &Path) -> LauncherResult<()> {
    let status = tokio::process::Command::new("tar")
        .arg("xjf")
        .arg(archive)
        .current_dir(dest)
        .status()
        .await
        .map_err(|e| LauncherError::ExtractFailed {
            path: archive.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !status.success() {
        return Err(LauncherError::ExtractFailed {
            path: archive.to_path_buf(),
            reason: format!("tar exited with {}", status),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "playdeck-archive-{}-{}",
            label,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn plans_follow_the_archive_suffix() {
        let game_dir = Path::new("/games/quake");
        let working_dir = Path::new("/work");

        let zip = plan_extraction(Path::new("/cache/game.zip"), game_dir, working_dir).unwrap();
        assert_eq!(zip.kind, ArchiveKind::Zip);
        assert_eq!(zip.dest, PathBuf::from("/games/quake"));

        let tgz = plan_extraction(Path::new("/cache/game.tar.gz"), game_dir, working_dir).unwrap();
        assert_eq!(tgz.kind, ArchiveKind::TarGz);
        assert_eq!(tgz.dest, PathBuf::from("/games"));

        let short = plan_extraction(Path::new("/cache/game.tgz"), game_dir, working_dir).unwrap();
        assert_eq!(short.kind, ArchiveKind::TarGz);

        let bz2 = plan_extraction(Path::new("/cache/game.tar.bz2"), game_dir, working_dir).unwrap();
        assert_eq!(bz2.kind, ArchiveKind::TarBz2);
        assert_eq!(bz2.dest, PathBuf::from("/work"));
    }

    #[test]
    fn unrecognised_suffix_has_no_plan() {
        for name in ["game.rar", "game.wad", "game.tar", "zip"] {
            assert_eq!(
                plan_extraction(Path::new(name), Path::new("/g"), Path::new("/w")),
                None
            );
        }
    }

    #[tokio::test]
    async fn zip_archive_unpacks_into_destination() {
        let dir = scratch_dir("zip");
        let archive = dir.join("game.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            writer
                .start_file("data/readme.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"hello").unwrap();
            writer.finish().unwrap();
        }

        let game_dir = dir.join("games").join("quake");
        let plan = plan_extraction(&archive, &game_dir, &dir).unwrap();
        extract(&plan).await.unwrap();

        let extracted = game_dir.join("data").join("readme.txt");
        assert_eq!(std::fs::read_to_string(extracted).unwrap(), "hello");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn gzip_tarball_unpacks_into_parent_of_game_dir() {
        let dir = scratch_dir("tgz");
        let archive = dir.join("game.tar.gz");
        {
            let file = File::create(&archive).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let body = b"#!/bin/sh\n";
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, "quake/start.sh", &body[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let game_dir = dir.join("games").join("quake");
        std::fs::create_dir_all(&game_dir).unwrap();
        let plan = plan_extraction(&archive, &game_dir, &dir).unwrap();
        extract(&plan).await.unwrap();

        assert!(game_dir.join("start.sh").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn corrupt_zip_is_an_error() {
        let dir = scratch_dir("corrupt");
        let archive = dir.join("broken.zip");
        std::fs::write(&archive, b"not a zip").unwrap();

        let plan = plan_extraction(&archive, &dir.join("game"), &dir).unwrap();
        let err = extract(&plan).await.unwrap_err();
        assert!(matches!(err, LauncherError::Zip(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn bzip2_tarball_unpacks_into_working_dir() {
        let dir = scratch_dir("bz2");
        let staging = dir.join("staging");
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("a.txt"), b"bz2").unwrap();
        let archive = dir.join("game.tar.bz2");
        let status = std::process::Command::new("tar")
            .arg("cjf")
            .arg(&archive)
            .arg("a.txt")
            .current_dir(&staging)
            .status()
            .unwrap();
        assert!(status.success());

        let working_dir = dir.join("work");
        let plan = plan_extraction(&archive, &dir.join("games").join("quake"), &working_dir).unwrap();
        extract(&plan).await.unwrap();

        assert_eq!(std::fs::read(working_dir.join("a.txt")).unwrap(), b"bz2");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
