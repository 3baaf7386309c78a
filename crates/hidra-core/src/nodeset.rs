// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Nodesets and the two subscription registries (spec.md §3, §4.2).
//!
//! A nodeset is the round-robin unit for stream mode, or the shared
//! pending-queue unit for query mode. The admission algorithm in
//! [`Registry::admit`] enforces the invariant that, for any two nodesets in
//! the same registry, their endpoint sets are either disjoint or nested
//! (spec.md §3, P6).

use crate::endpoint::Endpoint;
use crate::error::CoreError;
use crate::subscription::{Subscription, Target};
use std::collections::{HashSet, VecDeque};
use tracing::warn;

/// Default cap on a query nodeset's pending-grant queue. Bounded per
/// spec.md §9(c) to stop unbounded growth when a consumer issues `NEXT`
/// but never comes back to collect.
pub const DEFAULT_PENDING_QUEUE_DEPTH: usize = 32;

/// Anything admitted into a [`Registry`] must expose the endpoint set the
/// admission algorithm reasons about.
pub trait NodeSet {
    fn endpoint_set(&self) -> HashSet<Endpoint>;
}

/// A stream-mode nodeset: members are delivered to round-robin, one per
/// matching file (I2).
#[derive(Debug, Clone)]
pub struct StreamNodeSet {
    members: Vec<Subscription>,
    cursor: usize,
}

impl StreamNodeSet {
    pub fn new(members: Vec<Subscription>) -> Self {
        Self { members, cursor: 0 }
    }

    pub fn members(&self) -> &[Subscription] {
        &self.members
    }

    /// Test the current cursor member against `file_identifier`. If it
    /// matches, emit it and advance the cursor modulo the nodeset size
    /// (I2). If it does not match, the cursor does not move and no
    /// delivery happens for this nodeset this round — the file is silently
    /// skipped for this nodeset (spec.md §9 open question (b), resolved as
    /// intended behavior).
    pub fn try_deliver(&mut self, file_identifier: &str) -> Option<Target> {
        if self.members.is_empty() {
            return None;
        }
        let idx = self.cursor % self.members.len();
        let member = &self.members[idx];
        if !member.matches(file_identifier) {
            return None;
        }
        let target = Target {
            endpoint: member.endpoint.clone(),
            priority: member.priority,
            mode: member.mode.into(),
        };
        self.cursor = (self.cursor + 1) % self.members.len();
        Some(target)
    }
}

impl NodeSet for StreamNodeSet {
    fn endpoint_set(&self) -> HashSet<Endpoint> {
        self.members.iter().map(|s| s.endpoint.clone()).collect()
    }
}

/// A query-mode nodeset: delivery requires an explicit `NEXT` grant per
/// consumer (I3).
#[derive(Debug, Clone)]
pub struct QueryNodeSet {
    members: Vec<Subscription>,
    pending: VecDeque<Endpoint>,
    pending_cap: usize,
}

impl QueryNodeSet {
    pub fn new(members: Vec<Subscription>) -> Self {
        Self::with_pending_cap(members, DEFAULT_PENDING_QUEUE_DEPTH)
    }

    pub fn with_pending_cap(members: Vec<Subscription>, pending_cap: usize) -> Self {
        Self { members, pending: VecDeque::new(), pending_cap }
    }

    pub fn members(&self) -> &[Subscription] {
        &self.members
    }

    fn member(&self, endpoint: &Endpoint) -> Option<&Subscription> {
        self.members.iter().find(|m| &m.endpoint == endpoint)
    }

    /// `NEXT <endpoint>`: append the corresponding query subscription (if
    /// any) to the head-of-queue... er, tail — "head-of-queue" in spec.md
    /// §4.2 names the append point from the consumer's point of view; the
    /// oldest pending grant is served first (FIFO), which is what actually
    /// satisfies I3 ("one NEXT grants exactly one file"). Returns `false`
    /// if `endpoint` is not a member of this nodeset.
    pub fn push_next(&mut self, endpoint: &Endpoint) -> bool {
        if self.member(endpoint).is_none() {
            return false;
        }
        if self.pending.len() >= self.pending_cap {
            let dropped = self.pending.pop_front();
            warn!(?dropped, endpoint = %endpoint, "query pending queue full, dropping oldest grant");
        }
        self.pending.push_back(endpoint.clone());
        true
    }

    /// `CANCEL <endpoint>`: remove all pending entries for that endpoint.
    /// Returns the number removed.
    pub fn cancel(&mut self, endpoint: &Endpoint) -> usize {
        let before = self.pending.len();
        self.pending.retain(|e| e != endpoint);
        before - self.pending.len()
    }

    /// If the head-of-queue entry's subscription matches `file_identifier`,
    /// pop it and emit. Otherwise leave the queue untouched and emit
    /// nothing for this nodeset.
    pub fn try_deliver(&mut self, file_identifier: &str) -> Option<Target> {
        let head = self.pending.front()?;
        let member = self.member(head)?;
        if !member.matches(file_identifier) {
            return None;
        }
        let target =
            Target { endpoint: member.endpoint.clone(), priority: member.priority, mode: member.mode.into() };
        self.pending.pop_front();
        Some(target)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl NodeSet for QueryNodeSet {
    fn endpoint_set(&self) -> HashSet<Endpoint> {
        self.members.iter().map(|s| s.endpoint.clone()).collect()
    }
}

/// Outcome of a nodeset admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    Added,
    /// An existing nodeset with a nested/superset/identical endpoint set
    /// was replaced (this also covers the legacy `CONNECTION_ALREADY_OPEN`
    /// re-subscribe case, treated as an idempotent reset per spec.md §9).
    Replaced,
}

/// One of the two parallel subscription registries (stream or query),
/// generic over the nodeset kind it holds.
#[derive(Debug, Default)]
pub struct Registry<N: NodeSet> {
    nodesets: Vec<N>,
}

impl<N: NodeSet> Registry<N> {
    pub fn new() -> Self {
        Self { nodesets: Vec::new() }
    }

    pub fn nodesets(&self) -> &[N] {
        &self.nodesets
    }

    pub fn nodesets_mut(&mut self) -> &mut [N] {
        &mut self.nodesets
    }

    /// Admission algorithm (spec.md §4.2): for each existing nodeset `N`
    /// with endpoint set `E_N`, if the new set `E` nests either way with
    /// `E_N`, replace `N`; if they merely overlap, reject (P6). Otherwise
    /// append as a new nodeset.
    pub fn admit(&mut self, new: N) -> Result<AdmitOutcome, CoreError> {
        let e = new.endpoint_set();
        if e.is_empty() {
            return Err(CoreError::EmptyNodeset);
        }
        for (i, existing) in self.nodesets.iter().enumerate() {
            let en = existing.endpoint_set();
            if e.is_subset(&en) || en.is_subset(&e) {
                self.nodesets[i] = new;
                return Ok(AdmitOutcome::Replaced);
            }
            if !e.is_disjoint(&en) {
                return Err(CoreError::OverlappingNodeset);
            }
        }
        self.nodesets.push(new);
        Ok(AdmitOutcome::Added)
    }

    /// STOP by endpoint-match: remove every nodeset whose endpoint set
    /// intersects `targets`, returning the endpoints actually removed (for
    /// the `CLOSE_SOCKETS` publication).
    pub fn remove_matching(&mut self, targets: &HashSet<Endpoint>) -> Vec<Endpoint> {
        let mut removed = Vec::new();
        self.nodesets.retain(|n| {
            let en = n.endpoint_set();
            if en.is_disjoint(targets) {
                true
            } else {
                removed.extend(en);
                false
            }
        });
        removed
    }

    /// Deliver `file_identifier` through every nodeset, returning the
    /// resolved targets (one per nodeset that had a matching
    /// cursor/head-of-queue member).
    pub fn deliver(&mut self, file_identifier: &str) -> Vec<Target>
    where
        N: DeliverableNodeSet,
    {
        self.nodesets.iter_mut().filter_map(|n| n.try_deliver(file_identifier)).collect()
    }
}

/// Shared behavior needed by [`Registry::deliver`]; implemented by both
/// nodeset kinds via their own `try_deliver`.
pub trait DeliverableNodeSet {
    fn try_deliver(&mut self, file_identifier: &str) -> Option<Target>;
}

impl DeliverableNodeSet for StreamNodeSet {
    fn try_deliver(&mut self, file_identifier: &str) -> Option<Target> {
        StreamNodeSet::try_deliver(self, file_identifier)
    }
}

impl DeliverableNodeSet for QueryNodeSet {
    fn try_deliver(&mut self, file_identifier: &str) -> Option<Target> {
        QueryNodeSet::try_deliver(self, file_identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use crate::subscription::Mode;

    fn sub(host: &str, port: u16, priority: u32) -> Subscription {
        Subscription::new(Endpoint::new(host, port), priority, Pattern::from_raw(".*").unwrap(), Mode::Data)
    }

    #[test]
    fn stream_round_robin_p2() {
        // P2: for n members and m files that all match, deliveries split
        // ceil(m/n) / floor(m/n).
        let mut ns = StreamNodeSet::new(vec![sub("H", 6005, 1), sub("H", 6006, 1)]);
        let mut counts = std::collections::HashMap::new();
        for i in 0..6 {
            let t = ns.try_deliver(&format!("f{i}")).unwrap();
            *counts.entry(t.endpoint.port).or_insert(0) += 1;
        }
        assert_eq!(counts[&6005], 3);
        assert_eq!(counts[&6006], 3);
    }

    #[test]
    fn stream_cursor_does_not_advance_on_non_match() {
        let mut members = vec![sub("H", 6005, 1)];
        members[0].pattern = Pattern::from_raw("never").unwrap();
        let mut ns = StreamNodeSet::new(members);
        assert!(ns.try_deliver("a.cbf").is_none());
        assert_eq!(ns.cursor, 0);
    }

    #[test]
    fn query_requires_next_before_delivery_i3() {
        let mut ns = QueryNodeSet::new(vec![sub("H", 8000, 1)]);
        assert!(ns.try_deliver("a.cbf").is_none());
        assert!(ns.push_next(&Endpoint::new("H", 8000)));
        let t = ns.try_deliver("a.cbf").unwrap();
        assert_eq!(t.endpoint, Endpoint::new("H", 8000));
        // one NEXT grants exactly one file
        assert!(ns.try_deliver("b.cbf").is_none());
    }

    #[test]
    fn query_cancel_purges_pending_grants() {
        let mut ns = QueryNodeSet::new(vec![sub("H", 8000, 1)]);
        ns.push_next(&Endpoint::new("H", 8000));
        ns.push_next(&Endpoint::new("H", 8000));
        assert_eq!(ns.cancel(&Endpoint::new("H", 8000)), 2);
        assert!(ns.try_deliver("a.cbf").is_none());
    }

    #[test]
    fn query_pending_queue_is_bounded_with_oldest_drop() {
        let mut ns = QueryNodeSet::with_pending_cap(vec![sub("H", 8000, 1)], 2);
        let e = Endpoint::new("H", 8000);
        ns.push_next(&e);
        ns.push_next(&e);
        ns.push_next(&e);
        assert_eq!(ns.pending_len(), 2);
    }

    #[test]
    fn admission_replaces_nested_nodeset() {
        let mut reg: Registry<StreamNodeSet> = Registry::new();
        reg.admit(StreamNodeSet::new(vec![sub("H", 1, 1), sub("H", 2, 1)])).unwrap();
        let outcome = reg.admit(StreamNodeSet::new(vec![sub("H", 1, 1)])).unwrap();
        assert_eq!(outcome, AdmitOutcome::Replaced);
        assert_eq!(reg.nodesets().len(), 1);
    }

    #[test]
    fn admission_rejects_overlap_without_nesting_p6() {
        let mut reg: Registry<StreamNodeSet> = Registry::new();
        reg.admit(StreamNodeSet::new(vec![sub("H", 1, 1), sub("H", 2, 1)])).unwrap();
        let err = reg.admit(StreamNodeSet::new(vec![sub("H", 2, 1), sub("H", 3, 1)])).unwrap_err();
        assert_eq!(err, CoreError::OverlappingNodeset);
    }

    #[test]
    fn admission_appends_disjoint_nodeset() {
        let mut reg: Registry<StreamNodeSet> = Registry::new();
        reg.admit(StreamNodeSet::new(vec![sub("H", 1, 1)])).unwrap();
        reg.admit(StreamNodeSet::new(vec![sub("H", 2, 1)])).unwrap();
        assert_eq!(reg.nodesets().len(), 2);
    }

    #[test]
    fn stop_removes_nodeset_by_endpoint_match() {
        let mut reg: Registry<StreamNodeSet> = Registry::new();
        reg.admit(StreamNodeSet::new(vec![sub("H", 1, 1), sub("H", 2, 1)])).unwrap();
        let removed = reg.remove_matching(&HashSet::from([Endpoint::new("H", 1)]));
        assert_eq!(removed.len(), 2);
        assert!(reg.nodesets().is_empty());
    }
}
