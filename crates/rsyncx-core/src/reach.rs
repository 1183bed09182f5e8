//! Picking a live endpoint for a group
//!
//! The primary location is probed first, then the fallback, each with the
//! same bounded timeout. Probing never modifies anything.

use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use crate::group::{RemoteLocation, SyncGroup};
use crate::{Error, Result};

/// Default bound for a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    Primary,
    Fallback,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// The endpoint chosen for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub role: EndpointRole,
    pub location: RemoteLocation,
}

/// Checks whether a location answers.
pub trait Probe {
    fn is_reachable(&self, location: &RemoteLocation, timeout: Duration) -> bool;
}

/// TCP connect for SSH targets; for directory targets, the directory that
/// holds the group folder must exist (the folder itself is created on the
/// first sync).
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkProbe;

impl Probe for NetworkProbe {
    fn is_reachable(&self, location: &RemoteLocation, timeout: Duration) -> bool {
        match location {
            RemoteLocation::Directory(path) => {
                path.is_dir() || path.parent().is_some_and(Path::is_dir)
            }
            RemoteLocation::Ssh(target) => {
                let addrs = match (target.host.as_str(), target.port).to_socket_addrs() {
                    Ok(addrs) => addrs,
                    Err(e) => {
                        tracing::debug!("Cannot resolve {}: {}", target.host, e);
                        return false;
                    }
                };
                addrs
                    .into_iter()
                    .any(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok())
            }
        }
    }
}

/// Resolves a group's endpoint using a [`Probe`].
#[derive(Debug, Clone)]
pub struct ReachabilityResolver<P = NetworkProbe> {
    probe: P,
    timeout: Duration,
}

impl ReachabilityResolver<NetworkProbe> {
    pub fn new(timeout: Duration) -> Self {
        Self::with_probe(NetworkProbe, timeout)
    }
}

impl Default for ReachabilityResolver<NetworkProbe> {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl<P: Probe> ReachabilityResolver<P> {
    pub fn with_probe(probe: P, timeout: Duration) -> Self {
        Self { probe, timeout }
    }

    /// First reachable endpoint, primary before fallback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreachable`] when no endpoint answers.
    pub fn resolve(&self, group: &SyncGroup) -> Result<Endpoint> {
        let candidates = std::iter::once((EndpointRole::Primary, &group.remote_primary)).chain(
            group
                .remote_fallback
                .as_ref()
                .map(|loc| (EndpointRole::Fallback, loc)),
        );

        let mut tried = Vec::new();
        for (role, location) in candidates {
            if self.probe.is_reachable(location, self.timeout) {
                tracing::info!("Group '{}' using {} endpoint {}", group.name, role, location);
                return Ok(Endpoint {
                    role,
                    location: location.clone(),
                });
            }
            tracing::warn!("{} endpoint {} unreachable", role, location);
            tried.push(location.to_string());
        }

        Err(Error::Unreachable {
            group: group.name.clone(),
            tried,
        })
    }
}
