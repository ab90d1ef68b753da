//! Typed invocation of external programs.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A program plus its arguments, as it appears in the config file.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct CommandLine {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `git remote update`
    pub fn git_remote_update() -> Self {
        Self::new("git", ["remote", "update"])
    }

    /// `wg show all dump`
    pub fn wg_dump() -> Self {
        Self::new("wg", ["show", "all", "dump"])
    }

    /// Binds this command line to a working directory.
    pub fn invocation(&self, working_dir: impl Into<PathBuf>) -> Invocation {
        Invocation {
            program: self.program.clone().into(),
            args: self.args.iter().map(OsString::from).collect(),
            working_dir: working_dir.into(),
            capture: false,
        }
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A fully described process launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    /// Capture stdout instead of letting it pass through to ours.
    pub capture: bool,
}

impl Invocation {
    pub fn capture_stdout(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Empty unless the invocation asked for capture.
    pub stdout: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("working directory must be an absolute path: {}", .0.display())]
    RelativeWorkingDir(PathBuf),

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{program}` exited with {}", describe_exit(.code))]
    Failed { program: String, code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Runs invocations. The updater and the endpoint lister only see this trait,
/// so tests can stand in for `git` and `wg`.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError>;
}

/// Runs invocations as real child processes, blocking until they exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        check_working_dir(&invocation.working_dir)?;

        let program = invocation.program_name();
        debug!(
            "running {} {:?} in {}",
            program,
            invocation.args,
            invocation.working_dir.display()
        );

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null());

        let (status, stdout) = if invocation.capture {
            let output = cmd.stderr(Stdio::inherit()).output();
            let output = output.map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            (output.status, stdout)
        } else {
            let status = cmd.status().map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;
            (status, String::new())
        };

        if status.success() {
            Ok(CommandOutput { stdout })
        } else {
            Err(CommandError::Failed {
                program,
                code: status.code(),
            })
        }
    }
}

pub fn check_working_dir(dir: &Path) -> Result<(), CommandError> {
    if dir.is_absolute() {
        Ok(())
    } else {
        Err(CommandError::RelativeWorkingDir(dir.to_path_buf()))
    }
}
