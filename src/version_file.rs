use serde_json::Value as JsonValue;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_VERSION_FILE: &str = "VERSION";
pub const VERSION_KEY: &str = "version";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFileFormat {
    Raw,
    Json,
}

impl VersionFileFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for VersionFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for VersionFileFormat {
    type Err = VersionFileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "json" => Ok(Self::Json),
            _ => Err(VersionFileError::UnsupportedFormat(value.trim().to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum VersionFileError {
    #[error("Failed to read version file `{}`.", .path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Version file `{}` is not valid JSON.", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Version file `{}` has no string `version` field.", .path.display())]
    MissingField { path: PathBuf },
    #[error("Unsupported version file type `{0}`. Expected `raw` or `json`.")]
    UnsupportedFormat(String),
}

/// A version file bound to one path. Reading never writes to the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFile {
    path: PathBuf,
}

impl VersionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses `selector` as a [`VersionFileFormat`] before opening the file.
    pub fn read_version_as(&self, selector: &str) -> Result<String, VersionFileError> {
        let format = VersionFileFormat::from_str(selector)?;
        self.read_version(format)
    }

    pub fn read_version(&self, format: VersionFileFormat) -> Result<String, VersionFileError> {
        let content = fs::read_to_string(&self.path).map_err(|source| VersionFileError::Access {
            path: self.path.clone(),
            source,
        })?;

        match format {
            VersionFileFormat::Raw => Ok(content.trim().to_string()),
            VersionFileFormat::Json => self.version_from_json(&content),
        }
    }

    fn version_from_json(&self, content: &str) -> Result<String, VersionFileError> {
        let value: JsonValue =
            serde_json::from_str(content).map_err(|source| VersionFileError::Parse {
                path: self.path.clone(),
                source,
            })?;

        // A non-string `version` is reported, never coerced.
        value
            .as_object()
            .and_then(|object| object.get(VERSION_KEY))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| VersionFileError::MissingField {
                path: self.path.clone(),
            })
    }
}
