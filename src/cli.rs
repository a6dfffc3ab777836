use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "git-semver",
    version,
    about = "standalone tool to version your git repo with semver"
)]
pub struct Cli {
    /// Path to the shell used to run git commands. Defaults to /bin/bash.
    #[arg(long = "shellPath", value_name = "PATH")]
    pub shell_path: Option<String>,
    /// More logs.
    #[arg(short, long)]
    pub verbose: bool,
    /// Commit the version file and push commits and tags.
    #[arg(short = 'P', long)]
    pub push: bool,
    /// Create a git tag named after the current version.
    #[arg(short = 'T', long)]
    pub tag: bool,
    /// Name of the version file, relative to the repository root. Defaults to VERSION.
    #[arg(short = 'f', long = "versionFile", value_name = "PATH")]
    pub version_file: Option<String>,
    /// Type of the version file (raw, json). Defaults to raw.
    #[arg(short = 't', long = "versionFileType", value_name = "TYPE")]
    pub version_file_type: Option<String>,
}
