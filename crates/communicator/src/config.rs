//! Per-run network addressing
//!
//! Each process resolves, once at setup, which (path, port) pair it listens
//! on and which it sends to, based on whether it is the test runner or the
//! host application. Both are fixed for the process lifetime.

use crate::ports::{resolve_port, LaneIndex};
use crate::error::Result;

/// Which side of the exchange this process is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The process driving the test execution harness
    Runner,
    /// The application process under test
    Parent,
}

impl Role {
    /// The role this process sends to
    pub fn peer(&self) -> Role {
        match self {
            Role::Runner => Role::Parent,
            Role::Parent => Role::Runner,
        }
    }
}

/// One loopback HTTP endpoint: a fixed server path on a fixed port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: &'static str,
    pub port: u16,
}

impl Endpoint {
    /// Full URL for posting to this endpoint
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, self.path)
    }
}

/// The resolved port pair for one test lane, immutable for the process
/// lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfiguration {
    pub runner_port: u16,
    pub parent_port: u16,
}

impl HttpConfiguration {
    /// Resolve both ports for the given lane
    pub fn for_lane(lane: LaneIndex) -> Result<Self> {
        Ok(Self {
            runner_port: resolve_port(Role::Runner, lane)?,
            parent_port: resolve_port(Role::Parent, lane)?,
        })
    }

    fn endpoint(&self, role: Role) -> Endpoint {
        match role {
            Role::Runner => Endpoint {
                path: "/toRunner",
                port: self.runner_port,
            },
            Role::Parent => Endpoint {
                path: "/toParent",
                port: self.parent_port,
            },
        }
    }

    /// The endpoint a process with this role listens on
    pub fn source(&self, role: Role) -> Endpoint {
        self.endpoint(role)
    }

    /// The endpoint a process with this role sends to
    pub fn destination(&self, role: Role) -> Endpoint {
        self.endpoint(role.peer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_and_destination_mirror_each_other() {
        let config = HttpConfiguration::for_lane(LaneIndex::new(1)).unwrap();

        assert_eq!(config.source(Role::Runner), config.destination(Role::Parent));
        assert_eq!(config.source(Role::Parent), config.destination(Role::Runner));
        assert_ne!(config.source(Role::Runner), config.source(Role::Parent));
    }

    #[test]
    fn endpoints_use_loopback_urls() {
        let config = HttpConfiguration {
            runner_port: 49153,
            parent_port: 65534,
        };
        assert_eq!(
            config.source(Role::Runner).url(),
            "http://127.0.0.1:49153/toRunner"
        );
        assert_eq!(
            config.destination(Role::Runner).url(),
            "http://127.0.0.1:65534/toParent"
        );
    }
}
