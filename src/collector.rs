//! # Collector bus
//!
//! The telemetry sink contract (spec §6) plus two reference collectors.
//! These are explicitly "thin glue" (spec §1) — a caller is free to supply
//! any other `Collector` impl; every method has a no-op default so a sink
//! interested in only a handful of events costs nothing for the rest
//! ("unregistered events are dropped cheaply", spec §6).

use crate::ids::{ContentId, NodeId, Time};
use std::collections::HashMap;

/// Sink for simulation telemetry. All methods default to a no-op.
pub trait Collector {
    /// A new session started.
    fn start_session(&mut self, _t: Time, _receiver: NodeId, _content: ContentId) {}
    /// `node`'s cache held the requested content.
    fn cache_hit(&mut self, _node: NodeId) {}
    /// `node`'s cache did not hold the requested content.
    fn cache_miss(&mut self, _node: NodeId) {}
    /// The origin served the content directly.
    fn server_hit(&mut self, _node: NodeId) {}
    /// A request packet traversed the link `(u, v)`.
    fn request_hop(&mut self, _u: NodeId, _v: NodeId, _main_path: bool) {}
    /// A content packet traversed the link `(u, v)`.
    fn content_hop(&mut self, _u: NodeId, _v: NodeId, _main_path: bool) {}
    /// A content item was inserted into some cache.
    fn put_item(&mut self, _cid: ContentId) {}
    /// A content item was evicted from some cache.
    fn evict_item(&mut self, _cid: ContentId) {}
    /// The session ended; `success` mirrors spec §4.4's failure semantics
    /// (always `true` in practice, since the origin always serves).
    fn end_session(&mut self, _success: bool) {}
}

/// A collector that does nothing; used where a collector is optional
/// (warmup runs, or callers who only care about cache state mutation).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCollector;

impl Collector for NullCollector {}

/// Per-node and per-content cache hit-ratio accounting.
///
/// `results()`'s per-content value is a **ratio** (`hits / (hits + misses)`),
/// resolving the distilled source's ambiguous per-content shape in favor of
/// the documented ratio semantics rather than a scalar hit/miss collapse.
#[derive(Debug, Default, Clone)]
pub struct CacheHitRatioCollector {
    node_hits: HashMap<NodeId, u64>,
    node_misses: HashMap<NodeId, u64>,
    /// last-seen content of the in-flight session, used to attribute the
    /// next `cache_hit`/`cache_miss` call to a content id.
    current_content: Option<ContentId>,
    content_hits: HashMap<ContentId, u64>,
    content_misses: HashMap<ContentId, u64>,
}

impl CacheHitRatioCollector {
    /// A fresh, empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-node hit ratio (`hits / (hits + misses)`), `None` if the node
    /// saw no cache accesses.
    pub fn node_ratio(&self, node: NodeId) -> Option<f64> {
        let hits = *self.node_hits.get(&node).unwrap_or(&0);
        let misses = *self.node_misses.get(&node).unwrap_or(&0);
        ratio(hits, misses)
    }

    /// Per-content hit ratio across all nodes.
    pub fn content_ratio(&self, cid: ContentId) -> Option<f64> {
        let hits = *self.content_hits.get(&cid).unwrap_or(&0);
        let misses = *self.content_misses.get(&cid).unwrap_or(&0);
        ratio(hits, misses)
    }

    /// All per-content hit ratios observed so far.
    pub fn results(&self) -> HashMap<ContentId, f64> {
        self.content_hits
            .keys()
            .chain(self.content_misses.keys())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .filter_map(|&cid| self.content_ratio(cid).map(|r| (cid, r)))
            .collect()
    }
}

fn ratio(hits: u64, misses: u64) -> Option<f64> {
    let total = hits + misses;
    if total == 0 {
        None
    } else {
        Some(hits as f64 / total as f64)
    }
}

impl Collector for CacheHitRatioCollector {
    fn start_session(&mut self, _t: Time, _receiver: NodeId, content: ContentId) {
        self.current_content = Some(content);
    }

    fn cache_hit(&mut self, node: NodeId) {
        *self.node_hits.entry(node).or_insert(0) += 1;
        if let Some(cid) = self.current_content {
            *self.content_hits.entry(cid).or_insert(0) += 1;
        }
    }

    fn cache_miss(&mut self, node: NodeId) {
        *self.node_misses.entry(node).or_insert(0) += 1;
        if let Some(cid) = self.current_content {
            *self.content_misses.entry(cid).or_insert(0) += 1;
        }
    }

    fn end_session(&mut self, _success: bool) {
        self.current_content = None;
    }
}

/// Cumulative request/content hop counts converted to latency via per-link
/// delay, plus a per-session satisfaction flag.
///
/// Resolves the distilled source's `self.is_sat is True` identity-check
/// ambiguity as a plain boolean assignment: `is_satisfied` is set with `=`,
/// not compared by identity.
#[derive(Debug, Clone)]
pub struct LatencyOverheadCollector {
    satisfaction_bound: Time,
    request_hops: u64,
    content_hops: u64,
    cumulative_latency: Time,
    current_latency: Time,
    is_satisfied: bool,
    satisfied_sessions: u64,
    total_sessions: u64,
}

impl LatencyOverheadCollector {
    /// A collector that considers a session "satisfied" when its total
    /// round-trip latency is within `satisfaction_bound`.
    pub fn new(satisfaction_bound: Time) -> Self {
        Self {
            satisfaction_bound,
            request_hops: 0,
            content_hops: 0,
            cumulative_latency: 0.0,
            current_latency: 0.0,
            is_satisfied: true,
            satisfied_sessions: 0,
            total_sessions: 0,
        }
    }

    /// Total request-packet hops observed across all sessions.
    pub fn request_hop_count(&self) -> u64 {
        self.request_hops
    }

    /// Total content-packet hops observed across all sessions.
    pub fn content_hop_count(&self) -> u64 {
        self.content_hops
    }

    /// Fraction of sessions that finished within the satisfaction bound.
    pub fn satisfaction_ratio(&self) -> Option<f64> {
        ratio(self.satisfied_sessions, self.total_sessions - self.satisfied_sessions)
    }

    /// Mean round-trip latency across all completed sessions.
    pub fn mean_latency(&self) -> Option<f64> {
        if self.total_sessions == 0 {
            None
        } else {
            Some(self.cumulative_latency / self.total_sessions as f64)
        }
    }

    /// Record a hop's delay towards the in-flight session's latency, used by
    /// a caller that pairs this collector with `View::link_delay` (the
    /// collector itself never reads the topology).
    pub fn record_delay(&mut self, delay: Time) {
        self.current_latency += delay;
        self.is_satisfied = self.current_latency <= self.satisfaction_bound;
    }
}

impl Collector for LatencyOverheadCollector {
    fn start_session(&mut self, _t: Time, _receiver: NodeId, _content: ContentId) {
        self.current_latency = 0.0;
        self.is_satisfied = true;
    }

    fn request_hop(&mut self, _u: NodeId, _v: NodeId, _main_path: bool) {
        self.request_hops += 1;
    }

    fn content_hop(&mut self, _u: NodeId, _v: NodeId, _main_path: bool) {
        self.content_hops += 1;
    }

    fn end_session(&mut self, _success: bool) {
        self.total_sessions += 1;
        self.cumulative_latency += self.current_latency;
        if self.is_satisfied {
            self.satisfied_sessions += 1;
        }
    }
}

/// A telemetry event, owned and timestamp-free, used by [`RecordingCollector`]
/// to build an append-only log suitable for asserting determinism
/// (spec §8 invariant 7: "two runs produce byte-identical collector streams").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
    /// `start_session(receiver, content)`.
    StartSession(NodeId, ContentId),
    /// `cache_hit(node)`.
    CacheHit(NodeId),
    /// `cache_miss(node)`.
    CacheMiss(NodeId),
    /// `server_hit(node)`.
    ServerHit(NodeId),
    /// `request_hop(u, v, main_path)`.
    RequestHop(NodeId, NodeId, bool),
    /// `content_hop(u, v, main_path)`.
    ContentHop(NodeId, NodeId, bool),
    /// `put_item(cid)`.
    PutItem(ContentId),
    /// `evict_item(cid)`.
    EvictItem(ContentId),
    /// `end_session(success)`.
    EndSession(bool),
}

/// Append-only recorder of every telemetry call, used by tests to assert
/// that two runs over identical inputs produce identical collector streams
/// (spec §8 invariant 7).
#[derive(Debug, Default, Clone)]
pub struct RecordingCollector {
    /// The events recorded so far, in call order.
    pub events: Vec<TelemetryEvent>,
}

impl RecordingCollector {
    /// A fresh, empty recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for RecordingCollector {
    fn start_session(&mut self, _t: Time, receiver: NodeId, content: ContentId) {
        self.events.push(TelemetryEvent::StartSession(receiver, content));
    }

    fn cache_hit(&mut self, node: NodeId) {
        self.events.push(TelemetryEvent::CacheHit(node));
    }

    fn cache_miss(&mut self, node: NodeId) {
        self.events.push(TelemetryEvent::CacheMiss(node));
    }

    fn server_hit(&mut self, node: NodeId) {
        self.events.push(TelemetryEvent::ServerHit(node));
    }

    fn request_hop(&mut self, u: NodeId, v: NodeId, main_path: bool) {
        self.events.push(TelemetryEvent::RequestHop(u, v, main_path));
    }

    fn content_hop(&mut self, u: NodeId, v: NodeId, main_path: bool) {
        self.events.push(TelemetryEvent::ContentHop(u, v, main_path));
    }

    fn put_item(&mut self, cid: ContentId) {
        self.events.push(TelemetryEvent::PutItem(cid));
    }

    fn evict_item(&mut self, cid: ContentId) {
        self.events.push(TelemetryEvent::EvictItem(cid));
    }

    fn end_session(&mut self, success: bool) {
        self.events.push(TelemetryEvent::EndSession(success));
    }
}
