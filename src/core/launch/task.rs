// ─── Launch Task ───
// Spawns a runner process for an installed game and waits for it to exit.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// Spawn `argv` (executable first) with inherited stdio and wait for it.
///
/// A non-zero exit is logged, not returned as an error.
pub async fn launch(argv: &[String], working_dir: Option<&Path>) -> LauncherResult<ExitStatus> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| LauncherError::Runner("empty command line".into()))?;

    let program_path = Path::new(program);
    if !program_path.exists() {
        return Err(LauncherError::ExecutableMissing(program_path.to_path_buf()));
    }

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::inherit());
    cmd.stdout(Stdio::inherit());
    cmd.stderr(Stdio::inherit());

    info!("Launching {:?}", program_path);
    debug!("Command (copy/paste): {}", format_command_for_logs(cmd.as_std()));

    let mut child = cmd
        .spawn()
        .map_err(|e| LauncherError::Runner(format!("cannot start {}: {}", program, e)))?;
    let status = child.wait().await.map_err(LauncherError::io(program_path))?;

    if status.success() {
        info!("Game exited normally");
    } else {
        warn!("Game exited with {}", status);
    }
    Ok(status)
}

fn format_command_for_logs(cmd: &std::process::Command) -> String {
    let program = shell_escape(&cmd.get_program().to_string_lossy());
    let args = cmd
        .get_args()
        .map(|arg| shell_escape(&arg.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ");

    if args.is_empty() {
        program
    } else {
        format!("{} {}", program, args)
    }
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "''".to_string();
    }

    if raw
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '='))
    {
        return raw.to_string();
    }

    format!("'{}'", raw.replace('\'', "'\\''"))
}
