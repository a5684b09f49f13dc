//! The read-only query facade over a [`Model`] (spec §4.3).
//!
//! `View` never mutates and never emits telemetry; it is always constructed
//! on demand (see [`super::Controller::view`]) and every method returns an
//! owned value, so a `View` never outlives the single expression that built
//! it — it can be freely interleaved with mutating `Controller` calls
//! without any borrow conflict or interior mutability.

use crate::error::ModelError;
use crate::ids::{ContentId, NodeId};
use crate::model::model::Model;
use crate::model::topology::{LinkType, StackKind, Topology};
use crate::rsn::RsnEntry;

/// Read-only queries against a [`Model`] (spec §4.3).
#[derive(Debug, Clone, Copy)]
pub struct View<'a>(pub(crate) &'a Model);

impl<'a> View<'a> {
    /// Origin node of `cid`.
    pub fn content_source(&self, cid: ContentId) -> Result<NodeId, ModelError> {
        self.0.content_source(cid)
    }

    /// Shortest path from `u` to `v`, inclusive of both endpoints.
    pub fn shortest_path(&self, u: NodeId, v: NodeId) -> Option<Vec<NodeId>> {
        self.0.shortest_paths().path(u, v)
    }

    /// Hop-count distance from `u` to `v`.
    pub fn distance(&self, u: NodeId, v: NodeId) -> Option<u32> {
        self.0.shortest_paths().distance(u, v)
    }

    /// Delay of the link directly between `u` and `v`.
    pub fn link_delay(&self, u: NodeId, v: NodeId) -> Result<f64, ModelError> {
        self.0.link_delay(u, v)
    }

    /// Type of the link directly between `u` and `v`.
    pub fn link_type(&self, u: NodeId, v: NodeId) -> Result<LinkType, ModelError> {
        self.0.link_type(u, v)
    }

    /// Whether `v` owns a cache.
    pub fn has_cache(&self, v: NodeId) -> bool {
        self.0.has_cache(v)
    }

    /// Whether `v` owns an RSN table.
    pub fn has_rsn_table(&self, v: NodeId) -> bool {
        self.0.has_rsn(v)
    }

    /// Non-mutating presence check of `cid` in `v`'s cache. `None` if `v`
    /// has no cache.
    pub fn cache_lookup(&self, v: NodeId, cid: ContentId) -> Option<bool> {
        self.0.cache(v).map(|c| c.has(cid))
    }

    /// Non-mutating snapshot of `v`'s RSN entry for `cid`, if any.
    pub fn rsn_lookup(&self, v: NodeId, cid: ContentId) -> Option<RsnEntry> {
        self.0.rsn(v)?.peek(cid).cloned()
    }

    /// All nodes that currently own a cache.
    pub fn cache_nodes(&self) -> Vec<NodeId> {
        self.0.cache_nodes().collect()
    }

    /// All nodes that currently own an RSN table.
    pub fn rsn_nodes(&self) -> Vec<NodeId> {
        self.0.rsn_nodes().collect()
    }

    /// The static topology graph.
    pub fn topology(&self) -> &Topology {
        self.0.topology()
    }

    /// All current storage locations of `cid`: every caching node that has
    /// it, plus the origin.
    pub fn content_locations(&self, cid: ContentId) -> Vec<NodeId> {
        self.0.content_locations(cid)
    }

    /// Stack kind of `v`.
    pub fn stack(&self, v: NodeId) -> Result<&StackKind, ModelError> {
        self.0.topology().stack(v)
    }

    /// Degree of `v` (link count), used by RSN entry-size invariants.
    pub fn degree(&self, v: NodeId) -> usize {
        self.0.topology().degree(v)
    }

    /// Neighbors of `v`.
    pub fn neighbors(&self, v: NodeId) -> Vec<NodeId> {
        self.0.topology().neighbors(v).collect()
    }

    /// Betweenness centrality of `v` (used by CL4M's return-path policy).
    pub fn betweenness(&self, v: NodeId) -> f64 {
        self.0.betweenness().of(v)
    }

    /// Among `candidates`, the one with maximum betweenness centrality.
    pub fn max_betweenness(&self, candidates: impl Iterator<Item = NodeId>) -> Option<NodeId> {
        self.0.betweenness().argmax(candidates)
    }
}
