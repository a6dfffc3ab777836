use crate::cli::Cli;
use crate::config::{self, LoadedConfig, Settings};
use crate::git::{CommandRunner, DEFAULT_SHELL_PATH, GitService, ProcessRunner};
use crate::version_file::VersionFile;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};

pub fn run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to determine current directory.")?;
    let mut runner = ProcessRunner;
    run_with_runner(&cwd, cli, &mut runner)
}

pub(crate) fn run_with_runner(
    cwd: &Path,
    cli: &Cli,
    runner: &mut dyn CommandRunner,
) -> Result<()> {
    let discovery_shell = cli.shell_path.as_deref().unwrap_or(DEFAULT_SHELL_PATH);
    let repo_root = GitService::new(discovery_shell, cwd, runner).repo_path();

    let loaded = match &repo_root {
        Ok(root) => config::load(root)?,
        Err(err) => {
            debug!(error = %err, "repository root not found, skipping config file");
            LoadedConfig::defaulted()
        }
    };
    debug!(source = ?loaded.source.path(), "loaded config");
    for warning in &loaded.warnings {
        warn!("{warning}");
    }

    let settings = Settings::resolve(cli, &loaded.values);
    debug!(?settings, "resolved settings");

    if !settings.has_action() {
        println!("Version of git-semver: {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let repo_root = repo_root.context("Failed to determine the git repository root.")?;
    let version_file = VersionFile::new(settings.version_file_path(&repo_root)?);
    let version = version_file
        .read_version_as(&settings.version_file_type)
        .context("Failed to read the current version.")?;
    if semver::Version::parse(&version).is_err() {
        warn!("Version `{version}` is not a SemVer version. Using it verbatim.");
    }
    debug!(%version, path = %version_file.path().display(), "read current version");

    let mut git = GitService::new(&settings.shell_path, &repo_root, runner);

    if settings.push_changes {
        git.add_version_changes(settings.version_file.trim())?;
        git.commit_version_changes(&version)?;
        println!("Committed version {version}.");
    }

    if settings.tag_versions {
        git.create_tag(&version)?;
        println!("Created tag {version}.");
    }

    if settings.push_changes {
        git.push()?;
        println!("Pushed version {version}.");
    }

    Ok(())
}
