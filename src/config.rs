use crate::cli::Cli;
use crate::git::DEFAULT_SHELL_PATH;
use crate::version_file::DEFAULT_VERSION_FILE;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "semver.config.json";
pub const DEFAULT_VERSION_FILE_TYPE: &str = "raw";

const KNOWN_KEYS: [&str; 5] = [
    "shellPath",
    "pushChanges",
    "tagVersions",
    "versionFile",
    "versionFileType",
];

#[derive(Debug, Clone)]
pub enum ConfigSource {
    Discovered(PathBuf),
    Defaulted,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Discovered(path) => Some(path.as_path()),
            Self::Defaulted => None,
        }
    }
}

/// Values pre-set by `semver.config.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub shell_path: Option<String>,
    pub push_changes: Option<bool>,
    pub tag_versions: Option<bool>,
    pub version_file: Option<String>,
    pub version_file_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub values: FileConfig,
    pub source: ConfigSource,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn defaulted() -> Self {
        Self {
            values: FileConfig::default(),
            source: ConfigSource::Defaulted,
            warnings: Vec::new(),
        }
    }
}

/// Effective settings for one invocation, built once and passed to the services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub shell_path: String,
    pub push_changes: bool,
    pub tag_versions: bool,
    pub version_file: String,
    pub version_file_type: String,
}

impl Settings {
    /// CLI flags win over file values, which win over defaults.
    pub fn resolve(cli: &Cli, file: &FileConfig) -> Self {
        Self {
            shell_path: cli
                .shell_path
                .clone()
                .or_else(|| file.shell_path.clone())
                .unwrap_or_else(|| DEFAULT_SHELL_PATH.to_string()),
            push_changes: cli.push || file.push_changes.unwrap_or(false),
            tag_versions: cli.tag || file.tag_versions.unwrap_or(false),
            version_file: cli
                .version_file
                .clone()
                .or_else(|| file.version_file.clone())
                .unwrap_or_else(|| DEFAULT_VERSION_FILE.to_string()),
            version_file_type: cli
                .version_file_type
                .clone()
                .or_else(|| file.version_file_type.clone())
                .unwrap_or_else(|| DEFAULT_VERSION_FILE_TYPE.to_string()),
        }
    }

    pub fn has_action(&self) -> bool {
        self.push_changes || self.tag_versions
    }

    pub fn version_file_path(&self, repo_root: &Path) -> Result<PathBuf> {
        let relative = normalize_repo_relative_path(&self.version_file, "Version file path")?;
        Ok(repo_root.join(relative))
    }
}

pub fn load(repo_root: &Path) -> Result<LoadedConfig> {
    let path = repo_root.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        debug!(path = %path.display(), "no config file found, using defaults");
        return Ok(LoadedConfig::defaulted());
    }

    let raw_contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file `{}`.", path.display()))?;
    let parsed: JsonValue = serde_json::from_str(&raw_contents)
        .with_context(|| format!("Config file `{}` is not valid JSON.", path.display()))?;
    let warnings = collect_warnings(&parsed);

    let values: FileConfig = serde_json::from_value(parsed).with_context(|| {
        format!(
            "Config file `{}` has unsupported value types.",
            path.display()
        )
    })?;

    if let Some(shell_path) = &values.shell_path
        && shell_path.trim().is_empty()
    {
        bail!("`shellPath` cannot be empty.");
    }
    if let Some(version_file) = &values.version_file {
        normalize_repo_relative_path(version_file, "`versionFile`")?;
    }

    Ok(LoadedConfig {
        values,
        source: ConfigSource::Discovered(path),
        warnings,
    })
}

fn normalize_repo_relative_path(value: &str, label: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{label} cannot be empty.");
    }

    let path = Path::new(trimmed);
    if path.is_absolute() {
        bail!("{label} `{trimmed}` must be repository-relative.");
    }

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(_) => {}
            Component::ParentDir => {
                bail!("{label} `{trimmed}` cannot contain `..`.");
            }
            Component::RootDir | Component::Prefix(_) => {
                bail!("{label} `{trimmed}` must be repository-relative.");
            }
        }
    }

    Ok(trimmed.to_string())
}

fn collect_warnings(parsed: &JsonValue) -> Vec<String> {
    let Some(root) = parsed.as_object() else {
        return Vec::new();
    };

    let allowed: BTreeSet<&str> = BTreeSet::from(KNOWN_KEYS);
    root.keys()
        .filter(|key| !allowed.contains(key.as_str()))
        .map(|key| format!("Unknown config key `{key}` was ignored."))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("git-semver").chain(args.iter().copied()))
    }

    #[test]
    fn returns_defaults_when_no_config_file_exists() {
        let temp_dir = tempdir().unwrap();
        let config = load(temp_dir.path()).unwrap();

        assert_eq!(config.values, FileConfig::default());
        assert!(config.warnings.is_empty());
        assert!(matches!(config.source, ConfigSource::Defaulted));

        let settings = Settings::resolve(&cli(&[]), &config.values);
        assert_eq!(settings.shell_path, "/bin/bash");
        assert_eq!(settings.version_file, "VERSION");
        assert_eq!(settings.version_file_type, "raw");
        assert!(!settings.has_action());
    }

    #[test]
    fn parses_all_known_keys() {
        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{
  "shellPath": "/bin/sh",
  "pushChanges": true,
  "tagVersions": false,
  "versionFile": "package.json",
  "versionFileType": "json"
}"#,
        )
        .unwrap();

        let config = load(temp_dir.path()).unwrap();
        assert_eq!(
            config.values,
            FileConfig {
                shell_path: Some("/bin/sh".to_string()),
                push_changes: Some(true),
                tag_versions: Some(false),
                version_file: Some("package.json".to_string()),
                version_file_type: Some("json".to_string()),
            }
        );
        assert!(matches!(config.source, ConfigSource::Discovered(_)));
        assert_eq!(
            config.source.path(),
            Some(temp_dir.path().join(CONFIG_FILE_NAME).as_path())
        );
    }

    #[test]
    fn cli_flags_override_file_values() {
        let file = FileConfig {
            shell_path: Some("/bin/sh".to_string()),
            push_changes: Some(false),
            tag_versions: Some(true),
            version_file: Some("package.json".to_string()),
            version_file_type: Some("json".to_string()),
        };

        let settings = Settings::resolve(
            &cli(&[
                "--shellPath",
                "/usr/bin/zsh",
                "-P",
                "-f",
                "VERSION.txt",
                "-t",
                "raw",
            ]),
            &file,
        );

        assert_eq!(settings.shell_path, "/usr/bin/zsh");
        assert!(settings.push_changes);
        assert!(settings.tag_versions);
        assert_eq!(settings.version_file, "VERSION.txt");
        assert_eq!(settings.version_file_type, "raw");
    }

    #[test]
    fn file_values_fill_unset_flags() {
        let file = FileConfig {
            tag_versions: Some(true),
            version_file_type: Some("json".to_string()),
            ..FileConfig::default()
        };

        let settings = Settings::resolve(&cli(&["-v"]), &file);

        assert!(settings.tag_versions);
        assert!(!settings.push_changes);
        assert_eq!(settings.version_file_type, "json");
    }

    #[test]
    fn fails_on_invalid_json() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "{ \"shellPath\": ").unwrap();

        let err = load(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn fails_on_wrong_value_types() {
        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{ "pushChanges": "yes" }"#,
        )
        .unwrap();

        let err = load(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported value types"));
    }

    #[test]
    fn warns_on_unknown_keys() {
        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{ "versionFile": "VERSION", "experimental": true }"#,
        )
        .unwrap();

        let config = load(temp_dir.path()).unwrap();
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("experimental"));
    }

    #[test]
    fn rejects_parent_segments_in_version_file() {
        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{ "versionFile": "../VERSION" }"#,
        )
        .unwrap();

        let err = load(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("cannot contain `..`"));
    }

    #[test]
    fn rejects_empty_shell_path() {
        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{ "shellPath": "  " }"#,
        )
        .unwrap();

        let err = load(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("`shellPath` cannot be empty"));
    }

    #[test]
    fn version_file_path_is_joined_to_repo_root() {
        let settings = Settings::resolve(&cli(&["-f", "pkg/version.json"]), &FileConfig::default());

        assert_eq!(
            settings.version_file_path(Path::new("/repo")).unwrap(),
            PathBuf::from("/repo/pkg/version.json")
        );
        assert!(
            Settings::resolve(&cli(&["-f", "/etc/VERSION"]), &FileConfig::default())
                .version_file_path(Path::new("/repo"))
                .is_err()
        );
    }
}
