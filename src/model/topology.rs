//! # Topology graph
//!
//! The static, immutable-for-the-run graph of routers/receivers/sources
//! (spec §3): nodes carry a [`StackKind`], edges carry [`LinkAttrs`]. This
//! module only builds and queries the graph; all-pairs shortest paths and
//! betweenness centrality are precomputed once by [`crate::model::Model`]
//! and live in [`super::centrality`].

use crate::error::ModelError;
use crate::ids::{ContentId, NodeId};
use petgraph::stable_graph::StableGraph;
use petgraph::Undirected;
use std::collections::HashSet;

/// Link type, per spec §3/§6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// A link between two routers internal to the simulated network.
    Internal,
    /// A link crossing into/out of the simulated network (e.g. to a source).
    External,
}

/// Per-link attributes: delay and type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkAttrs {
    /// One-way propagation delay, looked up in both directions (spec §3).
    pub delay: f64,
    /// Internal vs. external link.
    pub link_type: LinkType,
}

/// What role a node plays in the topology (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackKind {
    /// Requests originate here; may optionally own a cache (SIT family).
    Receiver {
        /// `Some(n)` if this receiver owns a cache of size `n`.
        cache_size: Option<usize>,
    },
    /// May own a cache and/or an RSN table.
    Router {
        /// `Some(n)` if this router owns a cache of size `n`.
        cache_size: Option<usize>,
        /// `Some(n)` if this router owns an RSN table of size `n`.
        rsn_size: Option<usize>,
    },
    /// Ground-truth origin of a static set of contents.
    Source {
        /// The contents this source unconditionally serves.
        contents: HashSet<ContentId>,
    },
}

impl StackKind {
    /// Configured cache capacity, if this stack kind owns a cache.
    pub fn cache_size(&self) -> Option<usize> {
        match self {
            StackKind::Receiver { cache_size } => *cache_size,
            StackKind::Router { cache_size, .. } => *cache_size,
            StackKind::Source { .. } => None,
        }
    }

    /// Configured RSN capacity, if this stack kind owns an RSN table.
    pub fn rsn_size(&self) -> Option<usize> {
        match self {
            StackKind::Router { rsn_size, .. } => *rsn_size,
            _ => None,
        }
    }

    /// Whether this node is the origin of `cid`.
    pub fn serves(&self, cid: ContentId) -> bool {
        matches!(self, StackKind::Source { contents } if contents.contains(&cid))
    }
}

type Graph = StableGraph<StackKind, LinkAttrs, Undirected, u32>;

/// The topology graph: nodes carry [`StackKind`], edges carry [`LinkAttrs`].
///
/// Built once via [`Topology::builder`] and treated as immutable afterwards
/// (spec §3: "immutable for the run").
#[derive(Debug, Clone)]
pub struct Topology {
    graph: Graph,
}

impl Topology {
    /// Start building a new, empty topology.
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder { graph: StableGraph::default() }
    }

    /// Stack kind of `node`.
    pub fn stack(&self, node: NodeId) -> Result<&StackKind, ModelError> {
        self.graph.node_weight(node).ok_or(ModelError::NodeNotFound(node))
    }

    /// Whether `node` exists in the topology.
    pub fn contains(&self, node: NodeId) -> bool {
        self.graph.node_weight(node).is_some()
    }

    /// All node identifiers currently in the topology.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Neighbors of `node`, in insertion order.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors(node)
    }

    /// Degree of `node` (bounds RSN entry size per spec invariant 1).
    pub fn degree(&self, node: NodeId) -> usize {
        self.graph.neighbors(node).count()
    }

    /// Attributes of the link between `u` and `v`, if adjacent. Lookup is
    /// direction-agnostic (spec §3: "looked up in both directions").
    pub fn link(&self, u: NodeId, v: NodeId) -> Option<&LinkAttrs> {
        self.graph
            .find_edge(u, v)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// One-way delay of the link between `u` and `v`.
    pub fn link_delay(&self, u: NodeId, v: NodeId) -> Result<f64, ModelError> {
        self.link(u, v).map(|l| l.delay).ok_or(ModelError::NotAdjacent(u, v))
    }

    /// Type of the link between `u` and `v`.
    pub fn link_type(&self, u: NodeId, v: NodeId) -> Result<LinkType, ModelError> {
        self.link(u, v).map(|l| l.link_type).ok_or(ModelError::NotAdjacent(u, v))
    }

    /// Whether an edge exists directly between `u` and `v`.
    pub fn is_adjacent(&self, u: NodeId, v: NodeId) -> bool {
        self.graph.find_edge(u, v).is_some()
    }

    pub(crate) fn graph(&self) -> &Graph {
        &self.graph
    }
}

/// Fluent builder for a [`Topology`] (spec §6's "topology & placement
/// inputs"). Not a topology *generator* — callers supply the graph shape;
/// this only assembles it.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    graph: Graph,
}

impl TopologyBuilder {
    /// Add a router node, returning its identifier.
    pub fn add_router(&mut self, cache_size: Option<usize>, rsn_size: Option<usize>) -> NodeId {
        self.graph.add_node(StackKind::Router { cache_size, rsn_size })
    }

    /// Add a receiver node, returning its identifier.
    pub fn add_receiver(&mut self, cache_size: Option<usize>) -> NodeId {
        self.graph.add_node(StackKind::Receiver { cache_size })
    }

    /// Add a source node serving `contents`, returning its identifier.
    pub fn add_source(&mut self, contents: HashSet<ContentId>) -> NodeId {
        self.graph.add_node(StackKind::Source { contents })
    }

    /// Add an undirected link between `u` and `v`.
    pub fn add_link(&mut self, u: NodeId, v: NodeId, delay: f64, link_type: LinkType) -> &mut Self {
        self.graph.add_edge(u, v, LinkAttrs { delay, link_type });
        self
    }

    /// Finalize the topology.
    pub fn build(self) -> Topology {
        Topology { graph: self.graph }
    }
}
