//! # Recently Served Name (RSN) table
//!
//! Per-node, per-content bounded set of off-path next-hop hints (spec §3,
//! §4.2). An [`RsnEntry`] is the value half of a [`BoundedStore`]-backed
//! [`RsnTable`], giving cache and RSN the same eviction discipline at the
//! table level (spec §9).
//!
//! A single content's entry can never hold more than one record per
//! next-hop (insert is upsert-by-next-hop), and every next-hop is a
//! neighbor of the owning node, so the entry size bound `|entry| <= degree(v)`
//! (spec invariant 1) holds structurally without any extra bookkeeping.

use crate::cache::BoundedStore;
use crate::ids::{ContentId, NodeId, Time};

/// A single off-path next-hop hint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HintRecord {
    /// Neighbor towards which the content was previously forwarded.
    pub next_hop: NodeId,
    /// The known serving node of that trail (diagnostics only).
    pub destination: NodeId,
    /// Hop count from this node to `destination` at time of insert.
    pub distance: u32,
    /// Last insert or successful-use timestamp.
    pub timestamp: Time,
    /// Whether this hint has been confirmed to lead to content before.
    pub used_before: bool,
}

impl HintRecord {
    /// Age of this record relative to `now`.
    pub fn age(&self, now: Time) -> Time {
        now - self.timestamp
    }

    /// A record is expired once its age exceeds `expiration_interval`.
    pub fn is_expired(&self, now: Time, expiration_interval: Time) -> bool {
        self.age(now) > expiration_interval
    }

    /// A record is fresh while its age is within `fresh_interval`.
    pub fn is_fresh(&self, now: Time, fresh_interval: Time) -> bool {
        self.age(now) <= fresh_interval
    }

    /// Used-and-fresh: confirmed productive and still fresh.
    pub fn is_used_and_fresh(&self, now: Time, fresh_interval: Time) -> bool {
        self.used_before && self.is_fresh(now, fresh_interval)
    }
}

/// An RSN entry for one content id at one node: a small, upsert-by-next-hop
/// set of [`HintRecord`]s plus the freshness/expiration parameters that
/// govern it.
#[derive(Debug, Clone)]
pub struct RsnEntry {
    records: Vec<HintRecord>,
    fresh_interval: Time,
    expiration_interval: Time,
}

impl RsnEntry {
    /// Create an empty entry with the given `F <= X` parameters.
    ///
    /// # Panics
    /// Panics if `fresh_interval > expiration_interval`; validating `F <= X`
    /// is the caller's job (typically at configuration time, see
    /// [`crate::error::ConfigError::FreshAfterExpiration`]).
    pub fn new(fresh_interval: Time, expiration_interval: Time) -> Self {
        assert!(
            fresh_interval <= expiration_interval,
            "fresh_interval must be <= expiration_interval"
        );
        Self { records: Vec::new(), fresh_interval, expiration_interval }
    }

    fn purge_expired(&mut self, now: Time) {
        let expiration = self.expiration_interval;
        self.records.retain(|r| !r.is_expired(now, expiration));
    }

    /// Whether this entry currently holds no records (after lazy expiration).
    pub fn is_empty(&mut self, now: Time) -> bool {
        self.purge_expired(now);
        self.records.is_empty()
    }

    /// Number of live records, for invariant checks.
    pub fn len(&mut self, now: Time) -> usize {
        self.purge_expired(now);
        self.records.len()
    }

    /// Upsert by `next_hop`: a matching record is refreshed in place, else a
    /// new one is appended.
    pub fn insert(
        &mut self,
        next_hop: NodeId,
        destination: NodeId,
        distance: u32,
        now: Time,
        used: bool,
    ) {
        self.purge_expired(now);
        if let Some(r) = self.records.iter_mut().find(|r| r.next_hop == next_hop) {
            r.destination = destination;
            r.distance = distance;
            r.timestamp = now;
            r.used_before = used;
        } else {
            self.records.push(HintRecord { next_hop, destination, distance, timestamp: now, used_before: used });
        }
    }

    /// Mark the record pointing at `next_hop` (if any) as used-and-refreshed
    /// at `now`. Used when an off-path hit confirms a trail was productive.
    pub fn mark_used(&mut self, next_hop: NodeId, now: Time) {
        self.purge_expired(now);
        if let Some(r) = self.records.iter_mut().find(|r| r.next_hop == next_hop) {
            r.used_before = true;
            r.timestamp = now;
        }
    }

    /// Remove the record whose `next_hop` equals `next_hop`. Returns whether
    /// a matching record was present.
    pub fn delete_nexthop(&mut self, next_hop: NodeId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.next_hop != next_hop);
        self.records.len() != before
    }

    /// Fetch the record whose `next_hop` field equals `node`.
    pub fn get_nexthop(&mut self, now: Time, node: NodeId) -> Option<HintRecord> {
        self.purge_expired(now);
        self.records.iter().find(|r| r.next_hop == node).copied()
    }

    /// Freshest (minimum-age) record whose `next_hop != exclude`.
    pub fn get_freshest_except(&mut self, now: Time, exclude: NodeId) -> Option<HintRecord> {
        self.purge_expired(now);
        self.records
            .iter()
            .filter(|r| r.next_hop != exclude)
            .min_by(|a, b| a.age(now).partial_cmp(&b.age(now)).unwrap())
            .copied()
    }

    /// Up to `k` records, excluding `exclude`, sorted by timestamp descending
    /// (freshest first).
    pub fn get_topk_freshest_except(&mut self, now: Time, exclude: NodeId, k: usize) -> Vec<HintRecord> {
        self.purge_expired(now);
        let mut candidates: Vec<HintRecord> =
            self.records.iter().filter(|r| r.next_hop != exclude).copied().collect();
        candidates.sort_by(|a, b| b.timestamp.partial_cmp(&a.timestamp).unwrap());
        candidates.truncate(k);
        candidates
    }

    /// Up to `k` records: used-and-fresh records first (timestamp desc), then
    /// freshest unused records, always excluding `self_node` as next hop
    /// (spec §4.2 — once a trail is confirmed productive, prefer it until it
    /// ages past `F`).
    pub fn get_best_k(&mut self, now: Time, self_node: NodeId, k: usize) -> Vec<HintRecord> {
        self.purge_expired(now);
        let fresh = self.fresh_interval;
        let mut used_fresh: Vec<HintRecord> = self
            .records
            .iter()
            .filter(|r| r.next_hop != self_node && r.is_used_and_fresh(now, fresh))
            .copied()
            .collect();
        used_fresh.sort_by(|a, b| b.timestamp.partial_cmp(&a.timestamp).unwrap());
        if used_fresh.len() >= k {
            used_fresh.truncate(k);
            return used_fresh;
        }
        let mut rest: Vec<HintRecord> = self
            .records
            .iter()
            .filter(|r| r.next_hop != self_node && !r.is_used_and_fresh(now, fresh))
            .copied()
            .collect();
        rest.sort_by(|a, b| b.timestamp.partial_cmp(&a.timestamp).unwrap());
        let remaining = k - used_fresh.len();
        used_fresh.extend(rest.drain(..rest.len().min(remaining)));
        used_fresh
    }
}

/// Per-node RSN table: a bounded map from content id to [`RsnEntry`],
/// evicted by the same policy as [`crate::cache::Cache`].
#[derive(Debug, Clone)]
pub struct RsnTable {
    store: BoundedStore<ContentId, RsnEntry>,
    fresh_interval: Time,
    expiration_interval: Time,
}

impl RsnTable {
    /// Create a table with the given capacity and per-entry freshness
    /// parameters.
    pub fn new(capacity: usize, fresh_interval: Time, expiration_interval: Time) -> Self {
        Self { store: BoundedStore::new(capacity), fresh_interval, expiration_interval }
    }

    /// Look up the entry for `cid` without affecting recency (read-only
    /// views / collectors).
    pub fn peek(&self, cid: ContentId) -> Option<&RsnEntry> {
        self.store.peek(&cid)
    }

    /// Mutable lookup, creating an empty entry if none exists yet and
    /// refreshing table-level recency. This is the entry point strategies
    /// use to read/write hint records.
    pub fn entry_mut(&mut self, cid: ContentId) -> &mut RsnEntry {
        if self.store.get_mut(&cid).is_none() {
            let fresh = self.fresh_interval;
            let expiration = self.expiration_interval;
            self.store.put(cid, RsnEntry::new(fresh, expiration));
        }
        self.store.get_mut(&cid).expect("just inserted")
    }

    /// Mutable lookup that does **not** create an entry when absent, used
    /// by `Controller::get_rsn` (mirrors `Cache::get`'s recency-refreshing,
    /// non-creating semantics at the table level).
    pub fn get(&mut self, cid: ContentId) -> Option<&mut RsnEntry> {
        self.store.get_mut(&cid)
    }

    /// Table-level insert, mirroring `Cache::put`/`BoundedStore::put`.
    /// Returns the evicted entry, if any.
    pub fn put(&mut self, cid: ContentId, entry: RsnEntry) -> Option<RsnEntry> {
        self.store.put(cid, entry).map(|(_, v)| v)
    }

    /// Remove the entire entry for `cid`, returning whether it was present.
    pub fn remove(&mut self, cid: ContentId) -> bool {
        self.store.remove(&cid).is_some()
    }

    /// Drop the entry for `cid` if it has become empty (no live records).
    pub fn drop_if_empty(&mut self, cid: ContentId, now: Time) {
        let empty = self.store.get_mut(&cid).map(|e| e.is_empty(now)).unwrap_or(false);
        if empty {
            self.store.remove(&cid);
        }
    }

    /// Snapshot of content ids currently tracked, for diagnostics/tests.
    pub fn dump(&self) -> impl Iterator<Item = ContentId> + '_ {
        self.store.dump().copied()
    }

    /// Number of distinct contents currently tracked.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Configured table capacity (after zero-coercion).
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::graph::NodeIndex;

    fn n(i: u32) -> NodeId {
        NodeIndex::new(i as usize)
    }

    #[test]
    fn insert_is_upsert_by_nexthop() {
        let mut e = RsnEntry::new(10.0, 20.0);
        e.insert(n(1), n(9), 3, 0.0, false);
        e.insert(n(1), n(9), 2, 5.0, true);
        assert_eq!(e.len(100.0), 0); // expired by now=100 (age 100 > 20)
        let mut e = RsnEntry::new(10.0, 20.0);
        e.insert(n(1), n(9), 3, 0.0, false);
        e.insert(n(1), n(9), 2, 5.0, true);
        let rec = e.get_nexthop(5.0, n(1)).unwrap();
        assert_eq!(rec.distance, 2);
        assert!(rec.used_before);
        assert_eq!(e.len(5.0), 1);
    }

    #[test]
    fn lazy_expiration_drops_stale_records() {
        let mut e = RsnEntry::new(5.0, 10.0);
        e.insert(n(1), n(2), 1, 0.0, false);
        assert_eq!(e.len(9.0), 1);
        assert_eq!(e.len(11.0), 0);
    }

    #[test]
    fn delete_nexthop_removes_only_that_record() {
        let mut e = RsnEntry::new(5.0, 10.0);
        e.insert(n(1), n(9), 1, 0.0, false);
        e.insert(n(2), n(9), 1, 0.0, false);
        e.delete_nexthop(n(1));
        assert!(e.get_nexthop(0.0, n(1)).is_none());
        assert!(e.get_nexthop(0.0, n(2)).is_some());
    }

    #[test]
    fn get_best_k_prefers_used_and_fresh() {
        let mut e = RsnEntry::new(10.0, 100.0);
        e.insert(n(1), n(9), 3, 0.0, false);
        e.insert(n(2), n(9), 2, 1.0, false);
        e.mark_used(n(2), 1.0);
        let best = e.get_best_k(5.0, n(99), 1);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].next_hop, n(2));
    }

    #[test]
    fn get_best_k_excludes_self_node() {
        let mut e = RsnEntry::new(10.0, 100.0);
        e.insert(n(1), n(9), 3, 0.0, false);
        let best = e.get_best_k(5.0, n(1), 5);
        assert!(best.is_empty());
    }

    #[test]
    fn invalidate_then_reinsert_round_trips() {
        let mut e = RsnEntry::new(10.0, 100.0);
        e.insert(n(1), n(9), 3, 0.0, false);
        let before = e.get_nexthop(0.0, n(1));
        e.delete_nexthop(n(1));
        assert!(e.get_nexthop(0.0, n(1)).is_none());
        e.insert(n(1), n(9), 3, 0.0, false);
        assert_eq!(e.get_nexthop(0.0, n(1)), before);
    }
}
