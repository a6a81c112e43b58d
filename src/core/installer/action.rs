use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::Value;

use super::descriptor::{scalar_to_string, single_entry};
use crate::core::error::{LauncherError, LauncherResult};

/// One declared install step with its typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallAction {
    CheckMd5 { file: String, value: String },
    Extract { file: String },
    Move { src: String, dst: String },
    Delete { file: String },
    RequestMedia {
        default: Option<PathBuf>,
        contains: String,
    },
    Run { file: String },
    Locate,
    /// An action name this launcher does not know. Executing it aborts the install.
    Unsupported { name: String },
}

#[derive(Deserialize)]
struct FileParams {
    file: String,
}

#[derive(Deserialize)]
struct ChecksumParams {
    file: String,
    value: Value,
}

#[derive(Deserialize)]
struct MoveParams {
    src: String,
    dst: String,
}

#[derive(Deserialize)]
struct MediaParams {
    #[serde(default)]
    default: Option<PathBuf>,
    contains: String,
}

impl InstallAction {
    /// Build an action from a `- name: {params}` list entry.
    pub fn from_entry(entry: &Value) -> LauncherResult<Self> {
        let (name, params) = single_entry(entry, "installer action")?;

        let action = match name.as_str() {
            "check_md5" => {
                let p: ChecksumParams = params_of(&name, params)?;
                let value = scalar_to_string(&p.value).ok_or_else(|| {
                    LauncherError::InvalidDescriptor("check_md5 value must be a scalar".into())
                })?;
                InstallAction::CheckMd5 {
                    file: p.file,
                    value,
                }
            }
            "extract" => InstallAction::Extract {
                file: params_of::<FileParams>(&name, params)?.file,
            },
            "move" => {
                let p: MoveParams = params_of(&name, params)?;
                InstallAction::Move {
                    src: p.src,
                    dst: p.dst,
                }
            }
            "delete" => InstallAction::Delete {
                file: params_of::<FileParams>(&name, params)?.file,
            },
            "request_media" => {
                let p: MediaParams = params_of(&name, params)?;
                InstallAction::RequestMedia {
                    default: p.default,
                    contains: p.contains,
                }
            }
            "run" => InstallAction::Run {
                file: params_of::<FileParams>(&name, params)?.file,
            },
            "locate" => InstallAction::Locate,
            other => InstallAction::Unsupported {
                name: other.to_string(),
            },
        };

        Ok(action)
    }

    pub fn name(&self) -> &str {
        match self {
            InstallAction::CheckMd5 { .. } => "check_md5",
            InstallAction::Extract { .. } => "extract",
            InstallAction::Move { .. } => "move",
            InstallAction::Delete { .. } => "delete",
            InstallAction::RequestMedia { .. } => "request_media",
            InstallAction::Run { .. } => "run",
            InstallAction::Locate => "locate",
            InstallAction::Unsupported { name } => name,
        }
    }
}

fn params_of<T: DeserializeOwned>(action: &str, params: &Value) -> LauncherResult<T> {
    serde_yaml::from_value(params.clone()).map_err(|e| {
        LauncherError::InvalidDescriptor(format!("bad parameters for {}: {}", action, e))
    })
}
