//! # All-pairs shortest paths and betweenness centrality
//!
//! Precomputed once at [`super::Model`] construction over the static
//! topology (spec §3, §5: "pre-allocation... acceptable for topology sizes
//! in the thousands"). Paths are unweighted hop-count shortest paths (every
//! worked scenario in the spec's test suite specifies exact hop counts, not
//! delay-weighted distances), computed with a BFS per source rather than
//! Dijkstra.
//!
//! Betweenness centrality (needed by CL4M's return-path caching policy, spec
//! §4.4) is not exposed by `petgraph`, so it is computed here with Brandes'
//! algorithm specialized to unweighted graphs (BFS instead of a priority
//! queue), following the standard formulation.

use crate::ids::NodeId;
use crate::model::topology::Topology;
use std::collections::{HashMap, VecDeque};

/// All-pairs shortest paths over an unweighted topology.
#[derive(Debug, Clone, Default)]
pub struct ShortestPaths {
    /// `dist[u][v]` = hop count of the shortest path from `u` to `v`.
    dist: HashMap<NodeId, HashMap<NodeId, u32>>,
    /// `parent[u][v]` = predecessor of `v` on a shortest path from `u`.
    parent: HashMap<NodeId, HashMap<NodeId, NodeId>>,
}

impl ShortestPaths {
    /// Run BFS from every node in `topo` and cache the resulting distance
    /// and predecessor tables.
    pub fn compute(topo: &Topology) -> Self {
        let mut dist = HashMap::new();
        let mut parent = HashMap::new();
        for src in topo.nodes() {
            let (d, p) = bfs_tree(topo, src);
            dist.insert(src, d);
            parent.insert(src, p);
        }
        Self { dist, parent }
    }

    /// Hop-count distance from `u` to `v`, if reachable.
    pub fn distance(&self, u: NodeId, v: NodeId) -> Option<u32> {
        self.dist.get(&u)?.get(&v).copied()
    }

    /// Reconstructed shortest path from `u` to `v`, inclusive of both
    /// endpoints. Empty if `u == v`... no: a path of length 0 is `[u]`.
    /// Returns `None` if `v` is unreachable from `u`.
    pub fn path(&self, u: NodeId, v: NodeId) -> Option<Vec<NodeId>> {
        if u == v {
            return Some(vec![u]);
        }
        let parents = self.parent.get(&u)?;
        let mut path = vec![v];
        let mut curr = v;
        loop {
            let prev = *parents.get(&curr)?;
            path.push(prev);
            if prev == u {
                break;
            }
            curr = prev;
        }
        path.reverse();
        Some(path)
    }
}

fn bfs_tree(topo: &Topology, src: NodeId) -> (HashMap<NodeId, u32>, HashMap<NodeId, NodeId>) {
    let mut dist = HashMap::new();
    let mut parent = HashMap::new();
    let mut queue = VecDeque::new();
    dist.insert(src, 0);
    queue.push_back(src);
    while let Some(u) = queue.pop_front() {
        let du = dist[&u];
        for v in topo.neighbors(u) {
            if !dist.contains_key(&v) {
                dist.insert(v, du + 1);
                parent.insert(v, u);
                queue.push_back(v);
            }
        }
    }
    (dist, parent)
}

/// Betweenness centrality of every node in an unweighted topology, computed
/// once via Brandes' algorithm (BFS variant). Ties among multiple shortest
/// paths are shared fractionally, as in the standard definition.
#[derive(Debug, Clone, Default)]
pub struct Betweenness {
    score: HashMap<NodeId, f64>,
}

impl Betweenness {
    /// Compute betweenness centrality for every node in `topo`.
    pub fn compute(topo: &Topology) -> Self {
        let mut score: HashMap<NodeId, f64> =
            topo.nodes().map(|n| (n, 0.0)).collect();

        for s in topo.nodes() {
            // BFS from s, tracking predecessors, sigma (path counts), and
            // visit order for the dependency-accumulation backward pass.
            let mut dist: HashMap<NodeId, i64> = HashMap::new();
            let mut sigma: HashMap<NodeId, f64> = HashMap::new();
            let mut preds: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
            let mut order = Vec::new();

            dist.insert(s, 0);
            sigma.insert(s, 1.0);
            let mut queue = VecDeque::new();
            queue.push_back(s);
            while let Some(v) = queue.pop_front() {
                order.push(v);
                let dv = dist[&v];
                for w in topo.neighbors(v) {
                    if !dist.contains_key(&w) {
                        dist.insert(w, dv + 1);
                        queue.push_back(w);
                    }
                    if dist[&w] == dv + 1 {
                        *sigma.entry(w).or_insert(0.0) += sigma[&v];
                        preds.entry(w).or_default().push(v);
                    }
                }
            }

            let mut delta: HashMap<NodeId, f64> = HashMap::new();
            while let Some(w) = order.pop() {
                let dw = *delta.get(&w).unwrap_or(&0.0);
                if let Some(ps) = preds.get(&w) {
                    for &v in ps {
                        let contrib = (sigma[&v] / sigma[&w]) * (1.0 + dw);
                        *delta.entry(v).or_insert(0.0) += contrib;
                    }
                }
                if w != s {
                    *score.entry(w).or_insert(0.0) += dw;
                }
            }
        }

        // Undirected graph: Brandes counts each pair twice (once per
        // direction of the s-loop).
        for v in score.values_mut() {
            *v /= 2.0;
        }

        Self { score }
    }

    /// Betweenness centrality of `node`, `0.0` if unknown.
    pub fn of(&self, node: NodeId) -> f64 {
        self.score.get(&node).copied().unwrap_or(0.0)
    }

    /// Among `candidates`, the node with maximum betweenness centrality.
    /// Ties broken by iteration order (first-seen wins), matching the
    /// spec's "node... with maximum betweenness centrality" without a
    /// specified tie-break.
    pub fn argmax(&self, candidates: impl Iterator<Item = NodeId>) -> Option<NodeId> {
        candidates
            .map(|n| (n, self.of(n)))
            .fold(None, |best: Option<(NodeId, f64)>, (n, s)| match best {
                Some((_, bs)) if bs >= s => best,
                _ => Some((n, s)),
            })
            .map(|(n, _)| n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::topology::LinkType;

    #[test]
    fn line_shortest_path_matches_hop_count() {
        let mut b = Topology::builder();
        let nodes: Vec<_> = (0..5).map(|_| b.add_router(None, None)).collect();
        for w in nodes.windows(2) {
            b.add_link(w[0], w[1], 1.0, LinkType::Internal);
        }
        let t = b.build();
        let sp = ShortestPaths::compute(&t);
        assert_eq!(sp.distance(nodes[0], nodes[4]), Some(4));
        assert_eq!(sp.path(nodes[0], nodes[4]).unwrap(), nodes);
    }

    #[test]
    fn middle_node_of_a_line_has_highest_betweenness() {
        let mut b = Topology::builder();
        let nodes: Vec<_> = (0..5).map(|_| b.add_router(None, None)).collect();
        for w in nodes.windows(2) {
            b.add_link(w[0], w[1], 1.0, LinkType::Internal);
        }
        let t = b.build();
        let bc = Betweenness::compute(&t);
        let max = bc.argmax(nodes.iter().copied()).unwrap();
        assert_eq!(max, nodes[2]);
    }

    #[test]
    fn three_node_path_center_has_betweenness_one() {
        use assert_approx_eq::assert_approx_eq;
        let mut b = Topology::builder();
        let a = b.add_router(None, None);
        let mid = b.add_router(None, None);
        let c = b.add_router(None, None);
        b.add_link(a, mid, 1.0, LinkType::Internal);
        b.add_link(mid, c, 1.0, LinkType::Internal);
        let bc = Betweenness::compute(&b.build());
        assert_approx_eq!(bc.of(mid), 1.0);
        assert_approx_eq!(bc.of(a), 0.0);
    }
}
