// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sender version handshake (spec.md §6: "two versions are compatible iff
//! they agree on major+minor — the last component is ignored").

use std::fmt;
use std::str::FromStr;

pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SenderVersion {
    pub fn current() -> Self {
        Self::from_str(PROTOCOL_VERSION).unwrap_or(Self { major: 0, minor: 0, patch: 0 })
    }

    /// P5: compatible iff major+minor agree, regardless of patch.
    pub fn compatible_with(&self, other: &SenderVersion) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl fmt::Display for SenderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SenderVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let major = parts.next().ok_or("missing major")?.parse().map_err(|_| "bad major")?;
        let minor = parts.next().ok_or("missing minor")?.parse().map_err(|_| "bad minor")?;
        let patch = parts.next().unwrap_or("0").parse().map_err(|_| "bad patch")?;
        Ok(Self { major, minor, patch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p5_agrees_on_major_minor_ignores_patch() {
        let a: SenderVersion = "1.4.0".parse().unwrap();
        let b: SenderVersion = "1.4.9".parse().unwrap();
        assert!(a.compatible_with(&b));
    }

    #[test]
    fn p5_rejects_minor_mismatch() {
        let a: SenderVersion = "1.4.0".parse().unwrap();
        let b: SenderVersion = "0.9.0".parse().unwrap();
        assert!(!a.compatible_with(&b));
    }
}
