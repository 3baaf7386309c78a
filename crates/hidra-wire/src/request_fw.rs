// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request-forward protocol: TaskProvider asks SignalHandler "who wants
//! this file?" (spec.md §4.1, §4.2).

use hidra_core::Target;
use serde::{Deserialize, Serialize};

/// `[GET_REQUESTS, json(file-identifier)]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetRequestsRequest {
    pub file_identifier: String,
}

/// JSON-encoded list of `[endpoint, priority, mode]`, or the sentinel
/// `["None"]` when nothing matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GetRequestsReply {
    Targets(Vec<Target>),
    None([String; 1]),
}

impl GetRequestsReply {
    pub fn none() -> Self {
        GetRequestsReply::None(["None".to_string()])
    }

    pub fn into_targets(self) -> Vec<Target> {
        match self {
            GetRequestsReply::Targets(t) => t,
            GetRequestsReply::None(_) => Vec::new(),
        }
    }
}

impl From<Vec<Target>> for GetRequestsReply {
    fn from(targets: Vec<Target>) -> Self {
        if targets.is_empty() {
            GetRequestsReply::none()
        } else {
            GetRequestsReply::Targets(targets)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_targets_serializes_to_none_sentinel() {
        let reply: GetRequestsReply = Vec::new().into();
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"["None"]"#);
    }
}
