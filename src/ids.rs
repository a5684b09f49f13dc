//! Identifiers shared across the whole crate.

/// Router/node identification, and index into the topology graph.
///
/// Reusing the graph's own index type (rather than a separate opaque handle)
/// keeps node identifiers dense, `Copy`, and hashable for free.
pub type NodeId = petgraph::graph::NodeIndex<u32>;

/// Simulated time, in whatever unit the workload generator chooses (the
/// reference workloads in [`crate::workload`] treat it as seconds).
pub type Time = f64;

/// Opaque content identifier.
///
/// The content universe is finite and known at setup time, so a dense
/// integer id is the natural representation (mirrors the teacher's
/// `Prefix(pub u32)` newtype).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentId(pub u64);

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}
