use std::path::PathBuf;

use crate::command::CommandError;
use crate::wireguard::ParseError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a run. Per-repository update failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    ConfigFormat {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("unable to access status file {path}: {source}")]
    StatusIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed status file {path}: {source}")]
    StatusFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unable to use {path} as the mirror root: {source}")]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to write progress output: {0}")]
    Output(#[source] std::io::Error),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl Error {
    pub(crate) fn status_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StatusIo {
            path: path.into(),
            source,
        }
    }
}
