// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription match patterns.
//!
//! Stored with the compiled [`Regex`] alongside its source string so a
//! nodeset can be deep-copied across admission overwrites without
//! re-parsing (spec.md §9: "Regexes are stored pre-parsed but must be
//! cloneable").

use crate::error::CoreError;
use regex::Regex;
use std::fmt;

#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Build the anchored regex `.*(s1|s2|…)$` from a suffix list
    /// (spec.md §6).
    pub fn from_suffixes(suffixes: &[String]) -> Result<Self, CoreError> {
        let escaped: Vec<String> = suffixes.iter().map(|s| regex::escape(s)).collect();
        let source = format!(".*({})$", escaped.join("|"));
        Self::from_raw(&source)
    }

    /// A bare string value is taken as a raw regex (spec.md §6).
    pub fn from_raw(source: &str) -> Result<Self, CoreError> {
        let regex =
            Regex::new(source).map_err(|e| CoreError::InvalidPattern(format!("{source}: {e}")))?;
        Ok(Self { source: source.to_string(), regex })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, file_identifier: &str) -> bool {
        self.regex.is_match(file_identifier)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
impl Eq for Pattern {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_pattern_is_anchored() {
        // P7: a subscription with suffix `.cbf` matches `a.cbf` and
        // `sub/a.cbf` but not `a.cbf.part`.
        let p = Pattern::from_suffixes(&[".cbf".to_string()]).unwrap();
        assert!(p.is_match("a.cbf"));
        assert!(p.is_match("sub/a.cbf"));
        assert!(!p.is_match("a.cbf.part"));
    }

    #[test]
    fn raw_pattern_is_used_verbatim() {
        let p = Pattern::from_raw(r"^a\.cbf$").unwrap();
        assert!(p.is_match("a.cbf"));
        assert!(!p.is_match("sub/a.cbf"));
    }

    #[test]
    fn invalid_regex_is_an_error_not_a_panic() {
        assert!(Pattern::from_raw("(unclosed").is_err());
    }
}
