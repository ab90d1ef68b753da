use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::{Deserialize, Serialize};

use crate::command::CommandLine;
use crate::error::{Error, Result};
use crate::repo_iter::GIT_SUFFIX;
use crate::schedule::{Schedule, DEFAULT_COOLDOWN, DEFAULT_DELAY};

fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN.as_secs()
}

fn default_delay_secs() -> u64 {
    DEFAULT_DELAY.as_secs()
}

fn default_repo_suffix() -> String {
    GIT_SUFFIX.to_string()
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Config {
    /// Tree to search for repositories. Defaults to the directory holding the
    /// `mirror` executable.
    pub root: Option<PathBuf>,
    /// Defaults to `status.json` inside `root`.
    pub status_file: Option<PathBuf>,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
    #[serde(default = "default_repo_suffix")]
    pub repo_suffix: String,
    pub max_depth: Option<usize>,
    #[serde(default = "CommandLine::git_remote_update")]
    pub update_command: CommandLine,
    #[serde(default = "CommandLine::wg_dump")]
    pub endpoints_command: CommandLine,
}

impl Default for Config {
    fn default() -> Self {
        Self::empty()
    }
}

impl Config {
    pub fn empty() -> Self {
        Self {
            root: None,
            status_file: None,
            cooldown_secs: default_cooldown_secs(),
            delay_secs: default_delay_secs(),
            repo_suffix: default_repo_suffix(),
            max_depth: None,
            update_command: CommandLine::git_remote_update(),
            endpoints_command: CommandLine::wg_dump(),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        Self::get_mirror_config_home().map(|home| home.join("config.toml"))
    }

    /// Location of all config. By default
    ///
    /// Linux   :   $XDG_CONFIG_HOME/mirror or $HOME/.config/mirror
    /// macOS   :   $HOME/Library/Application Support/mirror
    /// Windows :   %AppData%\Roaming\mirror
    ///
    /// This can be overridden by setting MIRROR_CONFIG_HOME environment variable.
    fn get_mirror_config_home() -> Option<PathBuf> {
        if let Ok(env_var) = env::var("MIRROR_CONFIG_HOME") {
            if !env_var.is_empty() {
                return Some(env_var.into());
            }
        }

        dirs::config_dir().map(|dir| dir.join("mirror"))
    }

    /// Load Config from the default path, falling back to defaults when there
    /// is no config file.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_file(&path),
            _ => Ok(Self::empty()),
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| Error::ConfigFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::new(
            Duration::from_secs(self.cooldown_secs),
            Duration::from_secs(self.delay_secs),
        )
    }

    /// Absolute, canonical root. Repository identities are derived from it, so
    /// the same tree always produces the same status keys.
    pub fn resolve_root(&self) -> Result<PathBuf> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => Self::executable_dir()?,
        };
        fs::canonicalize(&root).map_err(|source| Error::Root { path: root, source })
    }

    pub fn resolve_status_file(&self, root: &Path) -> PathBuf {
        self.status_file
            .clone()
            .unwrap_or_else(|| root.join("status.json"))
    }

    fn executable_dir() -> Result<PathBuf> {
        let exe = env::current_exe().map_err(|source| Error::Root {
            path: PathBuf::from("<current executable>"),
            source,
        })?;
        Ok(exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")))
    }
}
