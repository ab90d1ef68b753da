//! Keeps a tree of Git mirrors fresh without hammering their remotes, and
//! lists the peer addresses WireGuard currently knows about.

pub mod command;
pub mod config;
pub mod duration;
pub mod error;
pub mod repo_iter;
pub mod repo_status;
pub mod schedule;
pub mod status;
pub mod updater;
pub mod wireguard;

pub use error::{Error, Result};
