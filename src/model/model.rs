//! The owning container of all simulation state: topology, per-node caches
//! and RSN tables, precomputed routing tables, and the content-origin index
//! (spec §3, §4.3, §9's "cyclic references" note).
//!
//! `Model` owns everything directly — `HashMap`s keyed by [`NodeId`], exactly
//! like the teacher's `Network` owning its `routers`/`external_routers` maps
//! — nothing is shared through `Rc`/`Arc`, and no interior mutability is
//! needed: [`super::View`] is always constructed as a short-lived, read-only
//! reborrow produced on demand by [`super::Controller::view`], never held
//! alongside a live mutable borrow of the same state.

use crate::cache::Cache;
use crate::error::ModelError;
use crate::ids::{ContentId, NodeId, Time};
use crate::model::centrality::{Betweenness, ShortestPaths};
use crate::model::topology::{LinkType, StackKind, Topology};
use crate::rsn::RsnTable;
use std::collections::HashMap;

/// Owns the topology and all per-node mutable state for one simulation run.
#[derive(Debug)]
pub struct Model {
    topology: Topology,
    caches: HashMap<NodeId, Cache>,
    rsn_tables: HashMap<NodeId, RsnTable>,
    content_source: HashMap<ContentId, NodeId>,
    shortest_paths: ShortestPaths,
    betweenness: Betweenness,
    /// Per-receiver, per-content outstanding-connection counters, used by
    /// SIT-family disconnection events (spec §4.4).
    connections: HashMap<NodeId, HashMap<ContentId, u32>>,
    rsn_fresh_interval: Time,
    rsn_expiration_interval: Time,
}

impl Model {
    /// Build a model from a finished [`Topology`], allocating a [`Cache`]/
    /// [`RsnTable`] for every node whose [`StackKind`] declares one, and
    /// indexing content origins from every [`StackKind::Source`].
    pub fn new(topology: Topology, rsn_fresh_interval: Time, rsn_expiration_interval: Time) -> Self {
        let mut caches = HashMap::new();
        let mut rsn_tables = HashMap::new();
        let mut content_source = HashMap::new();

        for node in topology.nodes() {
            let stack = topology.stack(node).expect("node came from topology.nodes()");
            if let Some(size) = stack.cache_size() {
                caches.insert(node, Cache::new(size));
            }
            if let Some(size) = stack.rsn_size() {
                rsn_tables.insert(node, RsnTable::new(size, rsn_fresh_interval, rsn_expiration_interval));
            }
            if let StackKind::Source { contents } = stack {
                for &cid in contents {
                    content_source.insert(cid, node);
                }
            }
        }

        let shortest_paths = ShortestPaths::compute(&topology);
        let betweenness = Betweenness::compute(&topology);

        Self {
            topology,
            caches,
            rsn_tables,
            content_source,
            shortest_paths,
            betweenness,
            connections: HashMap::new(),
            rsn_fresh_interval,
            rsn_expiration_interval,
        }
    }

    pub(crate) fn topology(&self) -> &Topology {
        &self.topology
    }

    pub(crate) fn shortest_paths(&self) -> &ShortestPaths {
        &self.shortest_paths
    }

    pub(crate) fn betweenness(&self) -> &Betweenness {
        &self.betweenness
    }

    pub(crate) fn content_source(&self, cid: ContentId) -> Result<NodeId, ModelError> {
        self.content_source.get(&cid).copied().ok_or(ModelError::UnknownContentSource(cid))
    }

    pub(crate) fn has_cache(&self, node: NodeId) -> bool {
        self.caches.contains_key(&node)
    }

    pub(crate) fn has_rsn(&self, node: NodeId) -> bool {
        self.rsn_tables.contains_key(&node)
    }

    pub(crate) fn cache(&self, node: NodeId) -> Option<&Cache> {
        self.caches.get(&node)
    }

    pub(crate) fn cache_mut(&mut self, node: NodeId) -> Option<&mut Cache> {
        self.caches.get_mut(&node)
    }

    pub(crate) fn rsn(&self, node: NodeId) -> Option<&RsnTable> {
        self.rsn_tables.get(&node)
    }

    pub(crate) fn rsn_mut(&mut self, node: NodeId) -> Option<&mut RsnTable> {
        self.rsn_tables.get_mut(&node)
    }

    pub(crate) fn cache_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.caches.keys().copied()
    }

    pub(crate) fn rsn_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.rsn_tables.keys().copied()
    }

    /// All nodes currently storing `cid`: every cache that has it, plus the
    /// origin (spec §4.3 `content_locations`).
    pub(crate) fn content_locations(&self, cid: ContentId) -> Vec<NodeId> {
        let mut locations: Vec<NodeId> =
            self.caches.iter().filter(|(_, c)| c.has(cid)).map(|(&n, _)| n).collect();
        if let Ok(src) = self.content_source(cid) {
            if !locations.contains(&src) {
                locations.push(src);
            }
        }
        locations
    }

    pub(crate) fn link_type(&self, u: NodeId, v: NodeId) -> Result<LinkType, ModelError> {
        self.topology.link_type(u, v)
    }

    pub(crate) fn link_delay(&self, u: NodeId, v: NodeId) -> Result<f64, ModelError> {
        self.topology.link_delay(u, v)
    }

    /// Decrement `receiver`'s outstanding-connection counter for `content`;
    /// returns `true` once the counter reaches zero (spec §4.4 disconnection
    /// events). Initializes the counter from `initial` on first use.
    pub(crate) fn decrement_connection(&mut self, receiver: NodeId, content: ContentId, initial: u32) -> bool {
        let counters = self.connections.entry(receiver).or_default();
        let counter = counters.entry(content).or_insert(initial.max(1));
        if *counter > 0 {
            *counter -= 1;
        }
        let exhausted = *counter == 0;
        if exhausted {
            counters.remove(&content);
        }
        exhausted
    }

    pub(crate) fn rsn_fresh_interval(&self) -> Time {
        self.rsn_fresh_interval
    }

    pub(crate) fn rsn_expiration_interval(&self) -> Time {
        self.rsn_expiration_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::topology::LinkType;
    use maplit::hashset;

    fn line_model() -> (Model, Vec<NodeId>) {
        let mut b = Topology::builder();
        let r0 = b.add_receiver(None);
        let r1 = b.add_router(Some(1), None);
        let r2 = b.add_router(Some(1), None);
        let r3 = b.add_router(Some(1), None);
        let r4 = b.add_source(hashset! { ContentId(2) });
        b.add_link(r0, r1, 1.0, LinkType::Internal);
        b.add_link(r1, r2, 1.0, LinkType::Internal);
        b.add_link(r2, r3, 1.0, LinkType::Internal);
        b.add_link(r3, r4, 1.0, LinkType::Internal);
        let topo = b.build();
        let model = Model::new(topo, 10.0, 20.0);
        (model, vec![r0, r1, r2, r3, r4])
    }

    #[test]
    fn content_source_resolves_from_source_stack() {
        let (model, nodes) = line_model();
        assert_eq!(model.content_source(ContentId(2)), Ok(nodes[4]));
        assert_eq!(
            model.content_source(ContentId(99)),
            Err(ModelError::UnknownContentSource(ContentId(99)))
        );
    }

    #[test]
    fn cache_allocated_only_where_configured() {
        let (model, nodes) = line_model();
        assert!(!model.has_cache(nodes[0]));
        assert!(model.has_cache(nodes[1]));
        assert!(!model.has_cache(nodes[4]));
    }

    #[test]
    fn content_locations_includes_origin() {
        let (mut model, nodes) = line_model();
        model.cache_mut(nodes[1]).unwrap().put(ContentId(2));
        let mut locs = model.content_locations(ContentId(2));
        locs.sort();
        let mut expected = vec![nodes[1], nodes[4]];
        expected.sort();
        assert_eq!(locs, expected);
    }

    #[test]
    fn disconnection_counter_reaches_zero() {
        let (mut model, nodes) = line_model();
        assert!(!model.decrement_connection(nodes[0], ContentId(2), 2));
        assert!(model.decrement_connection(nodes[0], ContentId(2), 2));
    }
}
