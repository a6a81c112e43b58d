use std::process::Command;

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Current desktop resolution as `WxH`, read from `xrandr`.
pub fn current_resolution() -> LauncherResult<String> {
    let output = Command::new("xrandr")
        .arg("--current")
        .output()
        .map_err(|e| LauncherError::Runner(format!("cannot run xrandr: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let resolution = parse_xrandr_current(&stdout)
        .ok_or_else(|| LauncherError::Runner("cannot read current resolution".into()))?;
    debug!("Desktop resolution {}", resolution);
    Ok(resolution)
}

/// Pull `W x H` out of the `Screen 0: ... current W x H, ...` line.
pub fn parse_xrandr_current(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let rest = line.split("current ").nth(1)?;
        let dims = rest.split(',').next()?;
        let (width, height) = dims.split_once(" x ")?;
        let (width, height) = (width.trim(), height.trim());
        if width.parse::<u32>().is_ok() && height.parse::<u32>().is_ok() {
            Some(format!("{}x{}", width, height))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_screen_line() {
        let output = "Screen 0: minimum 8 x 8, current 1920 x 1080, maximum 32767 x 32767\n\
                      HDMI-1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 527mm x 296mm\n";
        assert_eq!(parse_xrandr_current(output).as_deref(), Some("1920x1080"));
    }

    #[test]
    fn no_screen_line_is_none() {
        assert_eq!(parse_xrandr_current("Can't open display\n"), None);
    }
}
