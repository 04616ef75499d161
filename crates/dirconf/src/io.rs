//! loading and saving markup files
//!
//! The format is picked by file extension: `.yaml`/`.yml` or `.json`.
use crate::value::Value;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Option<Format> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("unable to access {}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to parse yaml")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unable to parse json")]
    Json(#[from] serde_json::Error),
}

pub fn load(path: &Path) -> Result<Value, LoadError> {
    let format =
        Format::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat(path.to_owned()))?;
    tracing::info!(path=%path.display(), "loading file");

    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })?;

    parse(&contents, format)
}

/// Decode markup text
pub fn parse(contents: &str, format: Format) -> Result<Value, LoadError> {
    let value = match format {
        Format::Yaml => serde_yaml::from_str::<serde_yaml::Value>(contents)?.into(),
        Format::Json => serde_json::from_str::<serde_json::Value>(contents)?.into(),
    };

    Ok(value)
}

pub fn dump(value: &Value, path: &Path) -> Result<(), LoadError> {
    let format =
        Format::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat(path.to_owned()))?;
    tracing::info!(path=%path.display(), "writing file");

    let contents = match format {
        Format::Yaml => serde_yaml::to_string(value)?,
        Format::Json => serde_json::to_string_pretty(value)?,
    };

    std::fs::write(path, contents).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })
}
