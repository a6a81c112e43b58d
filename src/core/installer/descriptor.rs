use std::collections::BTreeSet;
use std::path::Path;

use serde_yaml::Value;

use super::action::InstallAction;
use crate::core::error::{LauncherError, LauncherResult};

/// Installer protocol this launcher understands. Descriptors must match it exactly.
pub const SUPPORTED_PROTOCOL: u64 = 1;

/// Where a declared game file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Bare location string.
    Url(String),
    /// `{url, filename?, nocopy?}` record.
    Record {
        url: String,
        filename: Option<String>,
        nocopy: bool,
    },
}

impl FileSource {
    pub fn url(&self) -> &str {
        match self {
            FileSource::Url(url) => url,
            FileSource::Record { url, .. } => url,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            FileSource::Url(_) => None,
            FileSource::Record { filename, .. } => filename.as_deref(),
        }
    }

    /// Whether local sources get copied into the cache.
    pub fn copy(&self) -> bool {
        match self {
            FileSource::Url(_) => true,
            FileSource::Record { nocopy, .. } => !nocopy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDeclaration {
    pub id: String,
    pub source: FileSource,
}

/// A parsed installer script for one game.
#[derive(Debug, Clone)]
pub struct InstallerDescriptor {
    pub protocol: u64,
    pub version: String,
    pub runner: String,
    pub name: String,
    pub exe: Option<String>,
    pub iso: Option<String>,
    pub rom: Option<String>,
    pub files: Vec<FileDeclaration>,
    pub actions: Vec<InstallAction>,
    /// Derived from the descriptor's file name; namespaces cache and config files.
    pub slug: String,
}

impl InstallerDescriptor {
    /// Parse a descriptor document.
    ///
    /// The protocol version is checked before anything else so a descriptor
    /// written for another protocol is rejected without further validation.
    pub fn parse(text: &str, slug: impl Into<String>) -> LauncherResult<Self> {
        let doc: Value = serde_yaml::from_str(text)?;
        if !doc.is_mapping() {
            return Err(LauncherError::InvalidDescriptor(
                "top level must be a mapping".into(),
            ));
        }

        let protocol = doc
            .get("protocol")
            .ok_or_else(|| LauncherError::InvalidDescriptor("missing protocol".into()))?;
        if !is_supported_protocol(protocol) {
            return Err(LauncherError::ProtocolMismatch {
                expected: SUPPORTED_PROTOCOL,
                found: render_value(protocol),
            });
        }

        let version = required_scalar(&doc, "version")?;
        let runner = required_scalar(&doc, "runner")?;
        let name = required_scalar(&doc, "name")?;

        let files = match doc.get("files") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(entries)) => parse_files(entries)?,
            Some(_) => {
                return Err(LauncherError::InvalidDescriptor(
                    "files must be a list".into(),
                ))
            }
        };

        let actions = match doc.get("installer") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(entries)) => entries
                .iter()
                .map(InstallAction::from_entry)
                .collect::<LauncherResult<Vec<_>>>()?,
            Some(_) => {
                return Err(LauncherError::InvalidDescriptor(
                    "installer must be a list".into(),
                ))
            }
        };

        Ok(Self {
            protocol: SUPPORTED_PROTOCOL,
            version,
            runner,
            name,
            exe: doc.get("exe").and_then(scalar_to_string),
            iso: doc.get("iso").and_then(scalar_to_string),
            rom: doc.get("rom").and_then(scalar_to_string),
            files,
            actions,
            slug: slug.into(),
        })
    }

    /// Read and parse a descriptor from disk, deriving the slug from its file name.
    pub async fn load(path: &Path) -> LauncherResult<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(LauncherError::io(path))?;
        Self::parse(&text, slug_from_path(path))
    }
}

/// `quake.yml` → `quake`.
pub fn slug_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Render a YAML scalar as a string. `version: 1.0` is a float in YAML but a
/// string to us.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Only a number equal to the supported version matches; `1.0` counts, `'1'` does not.
fn is_supported_protocol(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64() == Some(SUPPORTED_PROTOCOL as f64),
        _ => false,
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{:?}", s),
        other => scalar_to_string(other).unwrap_or_else(|| {
            serde_yaml::to_string(other)
                .map(|yaml| yaml.trim().to_string())
                .unwrap_or_else(|_| "?".into())
        }),
    }
}

fn required_scalar(doc: &Value, field: &str) -> LauncherResult<String> {
    doc.get(field)
        .and_then(scalar_to_string)
        .ok_or_else(|| LauncherError::InvalidDescriptor(format!("missing mandatory field {}", field)))
}

fn parse_files(entries: &[Value]) -> LauncherResult<Vec<FileDeclaration>> {
    let mut seen = BTreeSet::new();
    let mut files = Vec::with_capacity(entries.len());

    for entry in entries {
        let (id, value) = single_entry(entry, "file declaration")?;
        if !seen.insert(id.clone()) {
            return Err(LauncherError::InvalidDescriptor(format!(
                "duplicate file identifier {}",
                id
            )));
        }
        let source = parse_file_source(&id, value)?;
        files.push(FileDeclaration { id, source });
    }

    Ok(files)
}

fn parse_file_source(id: &str, value: &Value) -> LauncherResult<FileSource> {
    match value {
        Value::String(url) => Ok(FileSource::Url(url.clone())),
        Value::Mapping(_) => {
            let url = value
                .get("url")
                .and_then(Value::as_str)
                .ok_or_else(|| LauncherError::InvalidDescriptor(format!("file {} has no url", id)))?;
            // presence of the key is what counts, unless it is explicitly false
            let nocopy = !matches!(value.get("nocopy"), None | Some(Value::Bool(false)));
            Ok(FileSource::Record {
                url: url.to_string(),
                filename: value.get("filename").and_then(scalar_to_string),
                nocopy,
            })
        }
        _ => Err(LauncherError::InvalidDescriptor(format!(
            "file {} must be a url or a mapping",
            id
        ))),
    }
}

/// Split a `- key: value` list entry into its only key and value.
pub(crate) fn single_entry<'v>(entry: &'v Value, what: &str) -> LauncherResult<(String, &'v Value)> {
    let mapping = entry
        .as_mapping()
        .ok_or_else(|| LauncherError::InvalidDescriptor(format!("{} must be a mapping", what)))?;
    if mapping.len() != 1 {
        return Err(LauncherError::InvalidDescriptor(format!(
            "{} must have exactly one key, found {}",
            what,
            mapping.len()
        )));
    }
    let (key, value) = mapping
        .iter()
        .next()
        .ok_or_else(|| LauncherError::InvalidDescriptor(format!("empty {}", what)))?;
    let key = scalar_to_string(key)
        .ok_or_else(|| LauncherError::InvalidDescriptor(format!("{} key must be a string", what)))?;
    Ok((key, value))
}
