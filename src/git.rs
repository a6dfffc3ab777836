use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_SHELL_PATH: &str = "/bin/bash";

/// Exit status a POSIX shell reports when it cannot find the command.
const COMMAND_NOT_FOUND_STATUS: i32 = 127;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not inside a git repository: {details}")]
    NotARepository { details: String },
    #[error("Failed to run `{command}` with shell `{shell}`: {details}")]
    Executor {
        shell: String,
        command: String,
        details: String,
    },
    #[error("Failed to stage `{path}`. Command `{command}` failed (exit {status}): {details}")]
    Staging {
        path: String,
        command: String,
        status: i32,
        details: String,
    },
    #[error("Failed to commit version {version}. Command `{command}` failed (exit {status}): {details}")]
    Commit {
        version: String,
        command: String,
        status: i32,
        details: String,
    },
    #[error("Failed to create tag `{tag}`. Command `{command}` failed (exit {status}): {details}")]
    Tag {
        tag: String,
        command: String,
        status: i32,
        details: String,
    },
    #[error("Failed to push. Command `{command}` failed (exit {status}): {details}")]
    Push {
        command: String,
        status: i32,
        details: String,
    },
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stderr if present, otherwise stdout. `git commit` reports "nothing to commit" on stdout.
    fn details(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        "no output".to_string()
    }
}

pub trait CommandRunner {
    fn run(&mut self, cwd: &Path, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, cwd: &Path, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).current_dir(cwd).output()?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Runs git subcommands as `<shell> -c "<command line>"` inside `workdir`, so the
/// caller's git configuration, credentials and hooks apply unchanged.
pub struct GitService<'a> {
    shell_path: String,
    workdir: PathBuf,
    runner: &'a mut dyn CommandRunner,
}

impl<'a> GitService<'a> {
    pub fn new(
        shell_path: impl Into<String>,
        workdir: impl Into<PathBuf>,
        runner: &'a mut dyn CommandRunner,
    ) -> Self {
        Self {
            shell_path: shell_path.into(),
            workdir: workdir.into(),
            runner,
        }
    }

    pub fn repo_path(&mut self) -> Result<PathBuf, GitError> {
        let (command, output) = self.git(&["rev-parse", "--show-toplevel"])?;
        if output.status != 0 {
            debug!(%command, status = output.status, "repository discovery failed");
            return Err(GitError::NotARepository {
                details: output.details(),
            });
        }

        let path = output.stdout.trim();
        if path.is_empty() {
            return Err(GitError::NotARepository {
                details: format!("`{command}` printed no path"),
            });
        }
        Ok(PathBuf::from(path))
    }

    pub fn add_version_changes(&mut self, relative_path: &str) -> Result<(), GitError> {
        let (command, output) = self.git(&["add", "--", relative_path])?;
        if output.status != 0 {
            return Err(GitError::Staging {
                path: relative_path.to_string(),
                command,
                status: output.status,
                details: output.details(),
            });
        }
        Ok(())
    }

    pub fn commit_version_changes(&mut self, version: &str) -> Result<(), GitError> {
        let message = commit_message(version);
        let (command, output) = self.git(&["commit", "-m", &message])?;
        if output.status != 0 {
            return Err(GitError::Commit {
                version: version.to_string(),
                command,
                status: output.status,
                details: output.details(),
            });
        }
        Ok(())
    }

    /// Creates an annotated tag. An existing tag of the same name is an error, never replaced.
    pub fn create_tag(&mut self, version: &str) -> Result<(), GitError> {
        let message = tag_message(version);
        let (command, output) = self.git(&["tag", "-a", version, "-m", &message])?;
        if output.status != 0 {
            return Err(GitError::Tag {
                tag: version.to_string(),
                command,
                status: output.status,
                details: output.details(),
            });
        }
        Ok(())
    }

    pub fn push(&mut self) -> Result<(), GitError> {
        let (command, output) = self.git(&["push", "--follow-tags"])?;
        if output.status != 0 {
            return Err(GitError::Push {
                command,
                status: output.status,
                details: output.details(),
            });
        }
        Ok(())
    }

    fn git(&mut self, args: &[&str]) -> Result<(String, CommandOutput), GitError> {
        let command = git_command_line(args);
        debug!(shell = %self.shell_path, cwd = %self.workdir.display(), %command, "running git");

        let shell_args = vec!["-c".to_string(), command.clone()];
        let output = self
            .runner
            .run(&self.workdir, &self.shell_path, &shell_args)
            .map_err(|err| GitError::Executor {
                shell: self.shell_path.clone(),
                command: command.clone(),
                details: err.to_string(),
            })?;

        if output.status == COMMAND_NOT_FOUND_STATUS {
            return Err(GitError::Executor {
                shell: self.shell_path.clone(),
                command,
                details: output.details(),
            });
        }
        Ok((command, output))
    }
}

pub fn commit_message(version: &str) -> String {
    format!("chore(release): {version}")
}

pub fn tag_message(version: &str) -> String {
    format!("Release {version}")
}

fn git_command_line(args: &[&str]) -> String {
    let mut line = String::from("git");
    for arg in args {
        line.push(' ');
        line.push_str(&shell_escape_single(arg));
    }
    line
}

pub fn shell_escape_single(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }

    if value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '/' | '.' | '_' | '-' | ':' | '+'))
    {
        return value.to_string();
    }

    let escaped = value.replace('\'', "'\"'\"'");
    format!("'{escaped}'")
}
