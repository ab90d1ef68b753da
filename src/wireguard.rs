//! Peer endpoint addresses from `wg show all dump`.
//!
//! The dump has one tab-separated row per line. The first row for each device
//! describes the interface itself; every following row with the same device
//! name is a peer, whose fourth column is its endpoint (`host:port`, or
//! `(none)` when the peer has not connected yet).

use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use tracing::debug;

use crate::command::{CommandLine, CommandRunner};
use crate::error::Result;

const ENDPOINT_COLUMN: usize = 3;
const NO_ENDPOINT: &str = "(none)";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("could not parse IP address: {input}")]
pub struct ParseError {
    pub input: String,
}

impl ParseError {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Extracts the host of an endpoint as an address. Accepts `1.2.3.4:51820`,
/// `[fe80::1%wg0]:51820` and bare addresses; an IPv6 zone is dropped.
pub fn parse_ip_address(endpoint: &str) -> std::result::Result<IpAddr, ParseError> {
    let endpoint = endpoint.trim();
    if let Ok(addr) = endpoint.parse::<SocketAddr>() {
        return Ok(addr.ip());
    }

    let host = match endpoint.strip_prefix('[') {
        Some(rest) => rest.split_once(']').map(|(host, _)| host),
        None if endpoint.matches(':').count() == 1 => {
            endpoint.split_once(':').map(|(host, _)| host)
        }
        None => Some(endpoint),
    };
    let host = host
        .map(|h| h.split_once('%').map_or(h, |(addr, _zone)| addr))
        .filter(|h| !h.is_empty());

    host.and_then(|h| h.parse::<IpAddr>().ok())
        .ok_or_else(|| ParseError::new(endpoint))
}

/// Every peer endpoint address in `dump`, in row order, duplicates included.
pub fn parse_dump(dump: &str) -> std::result::Result<Vec<IpAddr>, ParseError> {
    let mut current_device: Option<&str> = None;
    let mut addresses = Vec::new();

    for line in dump.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let columns: Vec<&str> = line.split('\t').collect();
        let device = columns[0];

        if current_device != Some(device) {
            // interface row
            current_device = Some(device);
            continue;
        }

        let endpoint = columns
            .get(ENDPOINT_COLUMN)
            .ok_or_else(|| ParseError::new(line))?;
        if *endpoint == NO_ENDPOINT {
            debug!("peer on {device} has no endpoint");
            continue;
        }
        addresses.push(parse_ip_address(endpoint)?);
    }

    Ok(addresses)
}

/// Runs the dump command and returns the distinct peer addresses, sorted.
pub fn peer_addresses(
    command: &CommandLine,
    runner: &dyn CommandRunner,
    working_dir: &Path,
) -> Result<BTreeSet<IpAddr>> {
    let output = runner.run(&command.invocation(working_dir).capture_stdout())?;
    Ok(parse_dump(&output.stdout)?.into_iter().collect())
}
