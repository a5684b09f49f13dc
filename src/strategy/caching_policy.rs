//! Return-path caching policies (spec §4.4).
//!
//! `apply` is called once per return-path hop, in delivery order (serving
//! node towards the receiver), and decides whether `curr` should cache the
//! content it just forwarded.

use crate::collector::Collector;
use crate::config::CachingPolicy;
use crate::ids::NodeId;
use crate::model::Controller;
use rand::Rng;

/// Per-trail scratch the caching policies that need running counts
/// (`ProbCache`) accumulate as the return path is walked.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReturnPathCounters {
    /// Index of the current cache node among all caches visited so far on
    /// this return path (`x` in the ProbCache formula).
    pub caches_visited: u32,
}

/// Decide whether `curr` (the `index`-th cache-capable node encountered on
/// this return path, out of `total_caches` caches on the path) should store
/// the content, and if so, do it.
#[allow(clippy::too_many_arguments)]
pub fn apply<C: Collector>(
    policy: CachingPolicy,
    ctrl: &mut Controller<C>,
    rng: &mut impl Rng,
    curr: NodeId,
    is_one_hop_downstream_of_hit: bool,
    is_max_betweenness_on_return: bool,
    total_caches_on_path: u32,
    remaining_downstream_capacity: f64,
    counters: &mut ReturnPathCounters,
) -> Result<(), crate::error::ModelError> {
    let should_cache = match policy {
        CachingPolicy::NoCache => false,
        CachingPolicy::Lce => true,
        CachingPolicy::Lcd => is_one_hop_downstream_of_hit,
        CachingPolicy::Cl4M => is_max_betweenness_on_return,
        CachingPolicy::Bernoulli(p) => rng.gen_bool(p.clamp(0.0, 1.0)),
        CachingPolicy::Choice => {
            // Exactly one uniformly-chosen on-path cache: the caller drives
            // this by pre-selecting the winning node and passing
            // `is_one_hop_downstream_of_hit` style flags is not enough here,
            // so `Choice` is resolved by the caller via `choose_one_of`
            // below and this arm is never reached directly.
            false
        }
        CachingPolicy::ProbCache { t_tw } => {
            counters.caches_visited += 1;
            let x = counters.caches_visited as f64;
            let c = total_caches_on_path.max(1) as f64;
            let cap = ctrl.cache_at(curr).map(|c| c.capacity() as f64).unwrap_or(1.0);
            let p = (remaining_downstream_capacity / (t_tw * cap)) * (x / c).powf(c);
            rng.gen_bool(p.clamp(0.0, 1.0))
        }
    };
    if should_cache {
        ctrl.put_content(curr)?;
    }
    Ok(())
}

/// Resolve `Choice`'s "exactly one uniformly-chosen on-path cache" ahead of
/// the walk, since it needs the full candidate set up front rather than a
/// per-hop decision.
pub fn choose_one(rng: &mut impl Rng, candidates: &[NodeId]) -> Option<NodeId> {
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.gen_range(0..candidates.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choose_one_picks_from_candidates() {
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let nodes: Vec<NodeId> = (0..3).map(|i| petgraph::graph::NodeIndex::new(i)).collect();
        let chosen = choose_one(&mut rng, &nodes).unwrap();
        assert!(nodes.contains(&chosen));
    }

    #[test]
    fn choose_one_empty_is_none() {
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        assert!(choose_one(&mut rng, &[]).is_none());
    }
}
