// ─── Action executor ───
// One exhaustive match over `InstallAction`; each arm is a small handler.

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use tracing::{debug, info, warn};

use super::action::InstallAction;
use super::archive;
use super::context::ActionContext;
use crate::core::error::{LauncherError, LauncherResult};

/// Destination alias for the game directory in `move` actions.
pub const GAMEDIR_ALIAS: &str = "gamedir";
/// Placeholder replaced by the home directory in `move` destinations.
pub const HOMEDIR_ALIAS: &str = "homedir";

/// What an action did, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    Extracted { dest: PathBuf },
    Moved { to: PathBuf },
    Deleted { path: PathBuf },
    /// `request_media` result: whether the expected file was found.
    Media(bool),
    Ran { exit_code: Option<i32> },
    /// Nothing to do (unrecognised archive, `locate`, file already gone).
    Skipped,
}

pub async fn execute(action: &InstallAction, ctx: &ActionContext<'_>) -> LauncherResult<ActionOutcome> {
    debug!("Running action {}", action.name());
    match action {
        InstallAction::CheckMd5 { file, value } => check_md5(ctx, file, value).await,
        InstallAction::Extract { file } => extract(ctx, file).await,
        InstallAction::Move { src, dst } => move_file(ctx, src, dst).await,
        InstallAction::Delete { file } => delete(ctx, file).await,
        InstallAction::RequestMedia { default, contains } => {
            Ok(request_media(default.as_deref(), contains))
        }
        InstallAction::Run { file } => run(ctx, file).await,
        InstallAction::Locate => Ok(ActionOutcome::Skipped),
        InstallAction::Unsupported { name } => Err(LauncherError::UnsupportedAction(name.clone())),
    }
}

async fn check_md5(ctx: &ActionContext<'_>, file: &str, expected: &str) -> LauncherResult<ActionOutcome> {
    let path = ctx.files.require(file)?.to_path_buf();
    info!("Checking md5 for {:?}", path);

    let actual = md5_file(&path).await?;
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(LauncherError::ChecksumMismatch {
            path,
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(ActionOutcome::Done)
}

/// Hex md5 of a file, computed on a blocking thread in fixed-size chunks.
pub async fn md5_file(path: &Path) -> LauncherResult<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> LauncherResult<String> {
        use std::io::Read;

        let mut file = std::fs::File::open(&path).map_err(LauncherError::io(&path))?;
        let mut hasher = Md5::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let read = file.read(&mut buf).map_err(LauncherError::io(&path))?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(|e| LauncherError::Other(format!("checksum task failed: {}", e)))?
}

async fn extract(ctx: &ActionContext<'_>, file: &str) -> LauncherResult<ActionOutcome> {
    let path = ctx.files.require(file)?;
    match archive::plan_extraction(path, ctx.game_dir, ctx.working_dir) {
        Some(plan) => {
            archive::extract(&plan).await?;
            Ok(ActionOutcome::Extracted { dest: plan.dest })
        }
        None => {
            debug!("No extractor for {:?}, skipping", path);
            Ok(ActionOutcome::Skipped)
        }
    }
}

/// Resolve a `move` destination: the game dir alias, else a home-relative
/// path, else the fallback dir when that path does not exist.
pub fn move_destination(ctx: &ActionContext<'_>, dst: &str) -> PathBuf {
    if dst == GAMEDIR_ALIAS {
        return ctx.game_dir.to_path_buf();
    }
    let expanded = PathBuf::from(dst.replace(HOMEDIR_ALIAS, &ctx.home_dir.to_string_lossy()));
    if expanded.exists() {
        expanded
    } else {
        ctx.fallback_dir.to_path_buf()
    }
}

async fn move_file(ctx: &ActionContext<'_>, src: &str, dst: &str) -> LauncherResult<ActionOutcome> {
    let src_path = match ctx.files.get(src) {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(src),
    };
    let dst_dir = move_destination(ctx, dst);
    info!("Moving {:?} to {:?}", src_path, dst_dir);

    let move_failed = |reason: &str| LauncherError::MoveFailed {
        src: src_path.clone(),
        dst: dst_dir.clone(),
        reason: reason.to_string(),
    };

    if !src_path.exists() {
        return Err(move_failed("source does not exist"));
    }

    let target = if dst_dir.is_dir() {
        let name = src_path
            .file_name()
            .ok_or_else(|| move_failed("source has no file name"))?;
        dst_dir.join(name)
    } else {
        dst_dir.clone()
    };
    if target.exists() {
        return Err(move_failed("destination already exists"));
    }

    if let Err(e) = tokio::fs::rename(&src_path, &target).await {
        // rename cannot cross filesystems; fall back to copy + remove
        debug!("rename failed ({}), copying instead", e);
        let from = src_path.clone();
        let to = target.clone();
        tokio::task::spawn_blocking(move || copy_then_remove(&from, &to))
            .await
            .map_err(|e| move_failed(&e.to_string()))?
            .map_err(|e| move_failed(&e.to_string()))?;
    }

    Ok(ActionOutcome::Moved { to: target })
}

fn copy_then_remove(source: &Path, destination: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        std::fs::create_dir_all(destination)?;
        copy_dir_recursive(source, destination)?;
        std::fs::remove_dir_all(source)
    } else {
        std::fs::copy(source, destination)?;
        std::fs::remove_file(source)
    }
}

fn copy_dir_recursive(source: &Path, destination: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = destination.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else if file_type.is_file() {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

async fn delete(ctx: &ActionContext<'_>, file: &str) -> LauncherResult<ActionOutcome> {
    let path = ctx.files.require(file)?.to_path_buf();
    if !path.exists() {
        warn!("Nothing to delete at {:?}", path);
        return Ok(ActionOutcome::Skipped);
    }

    info!("Deleting {:?}", path);
    if path.is_dir() {
        tokio::fs::remove_dir_all(&path)
            .await
            .map_err(LauncherError::io(&path))?;
    } else {
        tokio::fs::remove_file(&path)
            .await
            .map_err(LauncherError::io(&path))?;
    }
    Ok(ActionOutcome::Deleted { path })
}

fn request_media(default: Option<&Path>, contains: &str) -> ActionOutcome {
    let found = default
        .map(|dir| dir.join(contains).exists())
        .unwrap_or(false);
    info!("Media containing {} found: {}", contains, found);
    ActionOutcome::Media(found)
}

async fn run(ctx: &ActionContext<'_>, file: &str) -> LauncherResult<ActionOutcome> {
    let exec_path = ctx.files.require(file)?.to_path_buf();
    if !exec_path.exists() {
        return Err(LauncherError::ExecutableMissing(exec_path));
    }

    make_executable(&exec_path).await?;
    info!("Running {:?}", exec_path);

    let status = tokio::process::Command::new(&exec_path)
        .current_dir(ctx.working_dir)
        .status()
        .await
        .map_err(LauncherError::io(&exec_path))?;

    if !status.success() {
        warn!("{:?} exited with {}", exec_path, status);
    }
    Ok(ActionOutcome::Ran {
        exit_code: status.code(),
    })
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> LauncherResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(LauncherError::io(path))?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    tokio::fs::set_permissions(path, permissions)
        .await
        .map_err(LauncherError::io(path))
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> LauncherResult<()> {
    Ok(())
}
