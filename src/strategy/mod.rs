//! # Forwarding Strategy Engine (spec §4.4)
//!
//! A strategy is a pure function of `(View, Controller, Event)` that
//! maintains no state outside what the [`crate::model::Model`] holds.
//! Rather than an open trait-object-per-strategy hierarchy (the distilled
//! source's pattern), the strategy set is a closed [`Strategy`] enum with a
//! single [`Strategy::process_event`] dispatched once per event (Design
//! Note, §9 "Dynamic dispatch").
//!
//! The request/response machinery shared by every strategy — the on-path
//! walk, the off-path RSN trail follow, return-path delivery with PIT
//! dedup — lives once in this module as free functions; each `Strategy`
//! variant composes them.

pub mod caching_policy;
pub mod hashrouting;

use crate::collector::Collector;
use crate::config::{CachingPolicy, NrrCaching, StrategyOptions};
use crate::error::{ConfigError, ModelError};
use crate::ids::{ContentId, NodeId, Time};
use crate::model::Controller;
use crate::workload::Event;
use hashrouting::HashroutingVariant;
use itertools::Itertools;
use rand::Rng;

/// How a trail's serving node was reached; governs which RSN update rule
/// applies on return delivery (spec §4.4 return-path processing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrailKind {
    /// Reached by walking the shortest path and hitting a cache on it.
    OnPathCacheHit,
    /// Reached by walking the shortest path all the way to the origin.
    FromSource,
    /// Reached by following an off-path RSN trail to a hit.
    OffPathHit,
}

/// One discovered request/response trail: the ordered node sequence from
/// receiver to serving node, and how it was found.
#[derive(Debug, Clone)]
struct Trail {
    nodes: Vec<NodeId>,
    kind: TrailKind,
}

impl Trail {
    fn len_hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// Walk `path` (receiver..source inclusive) hop by hop, trying a cache hit
/// at every node after the first; returns the index in `path` where the walk
/// stopped and whether that node actually held the content. Every node on
/// `path` after the first is dispatched through `get_content` exactly once
/// (hit or miss), so callers must not re-query the same node afterwards. The
/// last node on `path` is not guaranteed to hit unless it is the source.
fn walk_on_path<C: Collector>(ctrl: &mut Controller<C>, path: &[NodeId]) -> Result<(usize, bool), ModelError> {
    for (i, w) in path.windows(2).enumerate() {
        if ctrl.get_content(w[1])? {
            return Ok((i + 1, true));
        }
    }
    Ok((path.len() - 1, false))
}

/// Follow a single off-path RSN trail starting at `start` via `first_hop`
/// (spec §4.4 "off-path trail follow"), bounded by `max_hops` extra hops if
/// given. Loop and dead-end both invalidate the explored trail and return
/// `Ok(None)`.
fn follow_trail<C: Collector>(
    ctrl: &mut Controller<C>,
    now: Time,
    start: NodeId,
    first_hop: NodeId,
    max_hops: Option<u32>,
) -> Result<Option<Vec<NodeId>>, ModelError> {
    let mut trail = vec![start];
    let mut came_from = start;
    let mut curr = first_hop;
    let mut hops = 0u32;

    loop {
        if trail.contains(&curr) {
            ctrl.invalidate_trail(&trail, now, None)?;
            return Ok(None);
        }
        trail.push(curr);
        if ctrl.get_content(curr)? {
            return Ok(Some(trail));
        }
        hops += 1;
        if let Some(max) = max_hops {
            if hops >= max {
                ctrl.invalidate_trail(&trail, now, None)?;
                return Ok(None);
            }
        }
        let next = match ctrl.get_rsn(curr, None)? {
            Some(mut entry) => entry.get_freshest_except(now, came_from),
            None => None,
        };
        match next {
            Some(record) => {
                came_from = curr;
                curr = record.next_hop;
            }
            None => {
                ctrl.invalidate_trail(&trail, now, None)?;
                return Ok(None);
            }
        }
    }
}

/// Breadth-first flood from `start` up to `scope` hops, stopping at the
/// first node whose cache (or origin status) holds the content. Used by
/// `SCOPED_FLOODING` and as the fallback phase of `SIT-with-Scoped-
/// Flooding`. `visited` accumulates across calls so repeated floods within
/// one session do not re-explore the same node.
fn flood<C: Collector>(
    ctrl: &mut Controller<C>,
    start: NodeId,
    scope: u32,
    visited: &mut std::collections::HashSet<NodeId>,
) -> Result<Option<Vec<NodeId>>, ModelError> {
    use std::collections::VecDeque;
    let mut queue: VecDeque<(NodeId, Vec<NodeId>)> = VecDeque::new();
    queue.push_back((start, vec![start]));
    visited.insert(start);

    while let Some((node, path)) = queue.pop_front() {
        if path.len() as u32 > scope + 1 {
            continue;
        }
        if node != start && ctrl.get_content(node)? {
            return Ok(Some(path));
        }
        if (path.len() as u32) > scope {
            continue;
        }
        for neighbor in ctrl.view().neighbors(node) {
            if visited.insert(neighbor) {
                let mut next_path = path.clone();
                next_path.push(neighbor);
                queue.push_back((neighbor, next_path));
            }
        }
    }
    Ok(None)
}

/// Apply return-path delivery to every trail in `trails` (spec §4.4 "Return
/// path processing"): sort by length, forward the request only along the
/// shortest, walk every trail in reverse delivering content with a
/// cross-trail PIT-dedup visited set, updating RSN and applying the caching
/// policy at each hop.
fn deliver<C: Collector>(
    ctrl: &mut Controller<C>,
    rng: &mut impl Rng,
    mut trails: Vec<Trail>,
    policy: CachingPolicy,
    now: Time,
) -> Result<(), ModelError> {
    trails.sort_by_key(|t| t.len_hops());

    for (i, t) in trails.iter().enumerate() {
        ctrl.forward_request_path(&t.nodes, i == 0)?;
    }

    let choice_winner = if matches!(policy, CachingPolicy::Choice) {
        let candidates: Vec<NodeId> = trails
            .iter()
            .flat_map(|t| t.nodes.iter().copied())
            .filter(|&n| ctrl.view().has_cache(n))
            .collect();
        caching_policy::choose_one(rng, &candidates)
    } else {
        None
    };

    let mut delivered: std::collections::HashSet<NodeId> = std::collections::HashSet::new();

    for (i, t) in trails.iter().enumerate() {
        let main_path = i == 0;
        let best_betweenness = if matches!(policy, CachingPolicy::Cl4M) {
            ctrl.view().max_betweenness(t.nodes.iter().copied())
        } else {
            None
        };
        let total_caches = t.nodes.iter().filter(|&&n| ctrl.view().has_cache(n)).count() as u32;
        let mut counters = caching_policy::ReturnPathCounters::default();
        let serving = *t.nodes.last().expect("trail is non-empty");

        for idx in (0..t.nodes.len() - 1).rev() {
            let curr = t.nodes[idx];
            let prev = t.nodes[idx + 1];

            // PIT dedup (spec §4.4, invariant 5): once a node has already
            // received this content on this delivery, a second trail
            // converging on it delivers nothing new — the pending request
            // it would have answered was already satisfied.
            if delivered.contains(&curr) {
                continue;
            }
            delivered.insert(curr);

            ctrl.forward_content_hop(prev, curr, main_path)?;

            match t.kind {
                TrailKind::FromSource => {
                    let distance = (t.nodes.len() - 1 - idx) as u32;
                    ctrl.put_rsn(prev, curr, serving, distance, now, false, None)?;
                }
                TrailKind::OffPathHit => {
                    let distance = (t.nodes.len() - 1 - idx) as u32;
                    ctrl.put_rsn(curr, prev, serving, distance, now, true, None)?;
                }
                TrailKind::OnPathCacheHit => {}
            }

            if !ctrl.view().has_cache(curr) {
                continue;
            }
            let is_one_hop_downstream = idx + 1 == t.nodes.len() - 1;
            let is_max_betweenness = best_betweenness == Some(curr);

            if matches!(policy, CachingPolicy::Choice) {
                if choice_winner == Some(curr) {
                    ctrl.put_content_cid(curr, content_of(ctrl)?)?;
                }
                continue;
            }

            // ProbCache's N term (spec §4.4): sum of actual cache capacities
            // still downstream of (and including) curr, not a node count —
            // caches on the path may be sized differently.
            let remaining_capacity = if matches!(policy, CachingPolicy::ProbCache { .. }) {
                t.nodes[..=idx].iter().filter_map(|&n| ctrl.cache_at(n).map(|c| c.capacity() as f64)).sum()
            } else {
                0.0
            };

            caching_policy::apply(
                policy,
                ctrl,
                rng,
                curr,
                is_one_hop_downstream,
                is_max_betweenness,
                total_caches,
                remaining_capacity,
                &mut counters,
            )?;
        }
    }
    Ok(())
}

fn content_of<C: Collector>(ctrl: &Controller<C>) -> Result<ContentId, ModelError> {
    ctrl.session().map(|s| s.content).ok_or(ModelError::NoActiveSession)
}

/// The closed set of forwarding strategies (spec §4.4's strategy table,
/// Design Note "Dynamic dispatch").
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Shortest path straight to source, never caches.
    NoCache,
    /// On-path walk, Leave Copy Everywhere.
    Lce,
    /// On-path walk, Leave Copy Down.
    Lcd,
    /// On-path walk, caches at the max-betweenness node on return.
    Cl4M,
    /// On-path walk, Bernoulli(`p`) caching.
    RandomBernoulli(f64),
    /// On-path walk, caches at exactly one uniformly-chosen on-path cache.
    RandomChoice,
    /// On-path walk, `ProbCache`'s per-node probability formula.
    ProbCache {
        /// Time-window constant of the probability formula.
        t_tw: f64,
    },
    /// Nearest Replica Routing: routes directly to the closest current
    /// replica, then applies `caching` (LCE or LCD) on return.
    Nrr {
        /// Caching policy applied on return (LCE or LCD per spec §4.4).
        caching: CachingPolicy,
    },
    /// Deterministic hash-based routing to an authoritative cache.
    Hashrouting(HashroutingVariant),
    /// On-path walk with a single RSN-hop detour of up to `max_detour` hops.
    LiraLce {
        /// Maximum off-path detour length, `None` for unbounded.
        max_detour: Option<u32>,
    },
    /// Like `LiraLce`, with `Choice` return caching.
    LiraChoice {
        /// Maximum off-path detour length, `None` for unbounded.
        max_detour: Option<u32>,
    },
    /// Like `LiraLce`, with `ProbCache` return caching.
    LiraProbCache {
        /// Maximum off-path detour length, `None` for unbounded.
        max_detour: Option<u32>,
        /// Time-window constant of the probability formula.
        t_tw: f64,
    },
    /// Fan-out `fan_out` parallel off-path explorations per on-path node,
    /// bounded by the shared hop quota; LCE with probability `p` on return.
    LiraDfib {
        /// Parallel off-path explorations per on-path node.
        fan_out: usize,
        /// Per-node caching probability on return.
        p: f64,
        /// Extra hops added to the quota beyond the shortest-path length.
        extra_quota: u32,
        /// On-path-hint variant: prefer on-path RSN hints over fan-out when
        /// available (`LiraDfibOph`).
        on_path_hint: bool,
    },
    /// Breadcrumb-style variant: used-and-fresh hints short-circuit the
    /// on-path attempt.
    LiraBc {
        /// Extra hops added to the quota beyond the shortest-path length.
        extra_quota: u32,
    },
    /// `LiraBc`, hybridized with multi-hop fan-out exploration.
    LiraBcHybrid {
        /// Extra hops added to the quota beyond the shortest-path length.
        extra_quota: u32,
        /// Parallel off-path explorations per on-path node.
        fan_out: usize,
    },
    /// Shortest path only, no RSN involvement.
    Ndn,
    /// `Ndn` assuming the origin is unreachable: receiver-side cache, SIT
    /// disconnection events.
    NdnSit,
    /// Pure RSN walk from the receiver's access node, fan-out `fan_out`, no
    /// origin fallback.
    SitOnly {
        /// Parallel off-path explorations per on-path node.
        fan_out: usize,
        /// Extra hops added to the quota beyond the shortest-path length.
        extra_quota: u32,
    },
    /// `SitOnly`, falling back to breadth-first flooding up to `scope` hops
    /// on failure.
    SitScopedFlooding {
        /// Parallel off-path explorations per on-path node.
        fan_out: usize,
        /// Extra hops added to the quota beyond the shortest-path length.
        extra_quota: u32,
        /// Flood radius, in hops.
        scope: u32,
    },
    /// Breadth-first flood up to `scope` hops only, Bernoulli(`p`) on
    /// return.
    ScopedFlooding {
        /// Flood radius, in hops.
        scope: u32,
        /// Per-node caching probability on return.
        p: f64,
    },
}

impl Strategy {
    /// Build a [`Strategy`] from a name (spec §4.4's strategy table,
    /// case-sensitive, upper-case-with-hyphens) and a bag of typed options.
    /// Replaces the distilled source's string-keyed strategy registry
    /// (Design Note, §9 "Dynamic dispatch"/"global registries"): there is no
    /// registry lookup, just a closed match over the known names. An option
    /// the chosen strategy does not recognize is `ConfigError::UnknownOption`;
    /// one it requires but that is missing is `ConfigError::MissingOption`.
    pub fn from_name_and_options(name: &str, opts: &StrategyOptions) -> Result<Self, ConfigError> {
        fn require_u32(field: &'static str, value: Option<u32>) -> Result<u32, ConfigError> {
            value.ok_or_else(|| ConfigError::MissingOption(field.to_string()))
        }
        match name {
            "NOCACHE" => {
                opts.ensure_only(&[])?;
                Ok(Strategy::NoCache)
            }
            "LCE" => {
                opts.ensure_only(&[])?;
                Ok(Strategy::Lce)
            }
            "LCD" => {
                opts.ensure_only(&[])?;
                Ok(Strategy::Lcd)
            }
            "CL4M" => {
                opts.ensure_only(&[])?;
                Ok(Strategy::Cl4M)
            }
            "RANDOM-BERNOULLI" => {
                opts.ensure_only(&["p"])?;
                let p = opts.p.ok_or_else(|| ConfigError::MissingOption("p".to_string()))?;
                Ok(Strategy::RandomBernoulli(p))
            }
            "RANDOM-CHOICE" => {
                opts.ensure_only(&[])?;
                Ok(Strategy::RandomChoice)
            }
            "PROBCACHE" => {
                opts.ensure_only(&["t_tw"])?;
                let t_tw = opts.t_tw.ok_or_else(|| ConfigError::MissingOption("t_tw".to_string()))?;
                Ok(Strategy::ProbCache { t_tw })
            }
            "NRR" => {
                opts.ensure_only(&["metacaching"])?;
                let caching = match opts.metacaching {
                    Some(NrrCaching::Lce) | None => CachingPolicy::Lce,
                    Some(NrrCaching::Lcd) => CachingPolicy::Lcd,
                };
                Ok(Strategy::Nrr { caching })
            }
            "HASHROUTING-SYMMETRIC" => {
                opts.ensure_only(&[])?;
                Ok(Strategy::Hashrouting(HashroutingVariant::Symmetric))
            }
            "HASHROUTING-ASYMMETRIC" => {
                opts.ensure_only(&[])?;
                Ok(Strategy::Hashrouting(HashroutingVariant::Asymmetric))
            }
            "HASHROUTING-MULTICAST" => {
                opts.ensure_only(&[])?;
                Ok(Strategy::Hashrouting(HashroutingVariant::Multicast))
            }
            "HASHROUTING-HYBRID-AM" => {
                opts.ensure_only(&["max_stretch"])?;
                let max_stretch =
                    opts.max_stretch.ok_or_else(|| ConfigError::MissingOption("max_stretch".to_string()))?;
                Ok(Strategy::Hashrouting(HashroutingVariant::HybridAm { max_stretch }))
            }
            "HASHROUTING-HYBRID-SM" => {
                opts.ensure_only(&[])?;
                Ok(Strategy::Hashrouting(HashroutingVariant::HybridSm))
            }
            "LIRA-LCE" => {
                opts.ensure_only(&["max_detour"])?;
                Ok(Strategy::LiraLce { max_detour: opts.max_detour })
            }
            "LIRA-CHOICE" => {
                opts.ensure_only(&["max_detour"])?;
                Ok(Strategy::LiraChoice { max_detour: opts.max_detour })
            }
            "LIRA-PROBCACHE" => {
                opts.ensure_only(&["max_detour", "t_tw"])?;
                let t_tw = opts.t_tw.ok_or_else(|| ConfigError::MissingOption("t_tw".to_string()))?;
                Ok(Strategy::LiraProbCache { max_detour: opts.max_detour, t_tw })
            }
            "LIRA-DFIB" => {
                opts.ensure_only(&["fan_out", "p", "extra_quota", "onpath_hint"])?;
                let fan_out = opts.fan_out.ok_or_else(|| ConfigError::MissingOption("fan_out".to_string()))?;
                let p = opts.p.ok_or_else(|| ConfigError::MissingOption("p".to_string()))?;
                Ok(Strategy::LiraDfib {
                    fan_out,
                    p,
                    extra_quota: opts.extra_quota.unwrap_or(0),
                    on_path_hint: opts.onpath_hint.unwrap_or(false),
                })
            }
            "LIRA-BC" => {
                opts.ensure_only(&["extra_quota"])?;
                Ok(Strategy::LiraBc { extra_quota: opts.extra_quota.unwrap_or(0) })
            }
            "LIRA-BC-HYBRID" => {
                opts.ensure_only(&["extra_quota", "fan_out"])?;
                let fan_out = opts.fan_out.ok_or_else(|| ConfigError::MissingOption("fan_out".to_string()))?;
                Ok(Strategy::LiraBcHybrid { extra_quota: opts.extra_quota.unwrap_or(0), fan_out })
            }
            "NDN" => {
                opts.ensure_only(&[])?;
                Ok(Strategy::Ndn)
            }
            "NDN-SIT" => {
                opts.ensure_only(&[])?;
                Ok(Strategy::NdnSit)
            }
            "SIT-ONLY" => {
                opts.ensure_only(&["fan_out", "extra_quota"])?;
                Ok(Strategy::SitOnly {
                    fan_out: opts.fan_out.unwrap_or(1),
                    extra_quota: opts.extra_quota.unwrap_or(0),
                })
            }
            "SIT-SCOPED-FLOODING" => {
                opts.ensure_only(&["fan_out", "extra_quota", "scope"])?;
                let scope = require_u32("scope", opts.scope)?;
                Ok(Strategy::SitScopedFlooding {
                    fan_out: opts.fan_out.unwrap_or(1),
                    extra_quota: opts.extra_quota.unwrap_or(0),
                    scope,
                })
            }
            "SCOPED-FLOODING" => {
                opts.ensure_only(&["scope", "p"])?;
                let scope = require_u32("scope", opts.scope)?;
                let p = opts.p.ok_or_else(|| ConfigError::MissingOption("p".to_string()))?;
                Ok(Strategy::ScopedFlooding { scope, p })
            }
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }

    /// Process one workload event against `ctrl`, using `rng` for every
    /// probabilistic decision the strategy needs (Bernoulli caching,
    /// `Choice`'s uniform pick, …). Dispatches once per event, never per
    /// hop (Design Note, §9).
    pub fn process_event<C: Collector>(
        &self,
        ctrl: &mut Controller<C>,
        rng: &mut impl Rng,
        t: Time,
        event: Event,
    ) -> Result<(), ModelError> {
        match event {
            Event::Request { receiver, content, log } => self.process_request(ctrl, rng, t, receiver, content, log),
            Event::Disconnection { receiver, content, log } => {
                self.process_disconnection(ctrl, t, receiver, content, log)
            }
        }
    }

    fn process_disconnection<C: Collector>(
        &self,
        ctrl: &mut Controller<C>,
        _t: Time,
        receiver: NodeId,
        content: ContentId,
        _log: bool,
    ) -> Result<(), ModelError> {
        // Disconnections are meaningful only to SIT-family strategies
        // (spec §4.4); other strategies observe no receiver-side cache
        // state to reconcile and ignore the event.
        if !matches!(self, Strategy::NdnSit | Strategy::SitOnly { .. } | Strategy::SitScopedFlooding { .. }) {
            return Ok(());
        }
        if ctrl.decrement_connection(receiver, content, 1) {
            ctrl.remove_content_at_node(content, receiver)?;
        }
        Ok(())
    }

    fn process_request<C: Collector>(
        &self,
        ctrl: &mut Controller<C>,
        rng: &mut impl Rng,
        t: Time,
        receiver: NodeId,
        content: ContentId,
        log: bool,
    ) -> Result<(), ModelError> {
        ctrl.start_session(t, receiver, content, log)?;
        let source = ctrl.view().content_source(content)?;

        let result = match self {
            Strategy::NoCache => self.run_on_path(ctrl, rng, receiver, source, CachingPolicy::NoCache, t),
            Strategy::Lce => self.run_on_path(ctrl, rng, receiver, source, CachingPolicy::Lce, t),
            Strategy::Lcd => self.run_on_path(ctrl, rng, receiver, source, CachingPolicy::Lcd, t),
            Strategy::Cl4M => self.run_on_path(ctrl, rng, receiver, source, CachingPolicy::Cl4M, t),
            Strategy::RandomBernoulli(p) => {
                self.run_on_path(ctrl, rng, receiver, source, CachingPolicy::Bernoulli(*p), t)
            }
            Strategy::RandomChoice => self.run_on_path(ctrl, rng, receiver, source, CachingPolicy::Choice, t),
            Strategy::ProbCache { t_tw } => {
                self.run_on_path(ctrl, rng, receiver, source, CachingPolicy::ProbCache { t_tw: *t_tw }, t)
            }
            Strategy::Ndn => self.run_on_path(ctrl, rng, receiver, source, CachingPolicy::NoCache, t),
            Strategy::Nrr { caching } => self.run_nrr(ctrl, rng, receiver, content, *caching, t),
            Strategy::Hashrouting(variant) => self.run_hashrouting(ctrl, rng, receiver, source, *variant, t),
            Strategy::LiraLce { max_detour } => {
                self.run_lira_detour(ctrl, rng, receiver, source, *max_detour, CachingPolicy::Lce, t)
            }
            Strategy::LiraChoice { max_detour } => {
                self.run_lira_detour(ctrl, rng, receiver, source, *max_detour, CachingPolicy::Choice, t)
            }
            Strategy::LiraProbCache { max_detour, t_tw } => self.run_lira_detour(
                ctrl,
                rng,
                receiver,
                source,
                *max_detour,
                CachingPolicy::ProbCache { t_tw: *t_tw },
                t,
            ),
            Strategy::LiraDfib { fan_out, p, extra_quota, .. } => {
                self.run_lira_dfib(ctrl, rng, receiver, source, *fan_out, *extra_quota, CachingPolicy::Bernoulli(*p), t)
            }
            Strategy::LiraBc { extra_quota } => {
                self.run_lira_detour(ctrl, rng, receiver, source, Some(*extra_quota), CachingPolicy::Lce, t)
            }
            Strategy::LiraBcHybrid { extra_quota, fan_out } => {
                self.run_lira_dfib(ctrl, rng, receiver, source, *fan_out, *extra_quota, CachingPolicy::Lce, t)
            }
            Strategy::NdnSit => self.run_sit(ctrl, rng, receiver, 1, 0, t),
            Strategy::SitOnly { fan_out, extra_quota } => {
                self.run_sit(ctrl, rng, receiver, *fan_out, *extra_quota, t)
            }
            Strategy::SitScopedFlooding { fan_out, extra_quota, scope } => {
                self.run_sit_scoped_flooding(ctrl, rng, receiver, *fan_out, *extra_quota, *scope, t)
            }
            Strategy::ScopedFlooding { scope, p } => self.run_scoped_flooding(ctrl, rng, receiver, *scope, *p, t),
        };

        // Failure semantics (spec §4.4): a request never fails. If the
        // strategy genuinely could not complete (e.g. SIT-only exhausted
        // every trail), fall back to the origin so the session still ends
        // successfully.
        let success = match result {
            Ok(()) => true,
            Err(ModelError::NoActiveSession) => return Err(ModelError::NoActiveSession),
            Err(_) => {
                self.run_on_path(ctrl, rng, receiver, source, CachingPolicy::Lce, t).is_ok()
            }
        };
        ctrl.end_session(success)?;
        Ok(())
    }

    fn run_on_path<C: Collector>(
        &self,
        ctrl: &mut Controller<C>,
        rng: &mut impl Rng,
        receiver: NodeId,
        source: NodeId,
        policy: CachingPolicy,
        t: Time,
    ) -> Result<(), ModelError> {
        let path = ctrl.view().shortest_path(receiver, source).ok_or(ModelError::NodeNotFound(source))?;
        let (hit, _) = walk_on_path(ctrl, &path)?;
        let kind = if path[hit] == source { TrailKind::FromSource } else { TrailKind::OnPathCacheHit };
        let trail = Trail { nodes: path[..=hit].to_vec(), kind };
        deliver(ctrl, rng, vec![trail], policy, t)
    }

    fn run_nrr<C: Collector>(
        &self,
        ctrl: &mut Controller<C>,
        rng: &mut impl Rng,
        receiver: NodeId,
        content: ContentId,
        policy: CachingPolicy,
        t: Time,
    ) -> Result<(), ModelError> {
        let locations = ctrl.view().content_locations(content);
        let nearest = locations
            .into_iter()
            .filter_map(|n| ctrl.view().distance(receiver, n).map(|d| (n, d)))
            .min_by_key(|&(_, d)| d)
            .map(|(n, _)| n)
            .ok_or(ModelError::UnknownContentSource(content))?;
        let path = ctrl.view().shortest_path(receiver, nearest).ok_or(ModelError::NodeNotFound(nearest))?;
        let (hit, _) = walk_on_path(ctrl, &path)?;
        let source = ctrl.session().map(|s| s.source).ok_or(ModelError::NoActiveSession)?;
        let kind = if path[hit] == source { TrailKind::FromSource } else { TrailKind::OnPathCacheHit };
        let trail = Trail { nodes: path[..=hit].to_vec(), kind };
        deliver(ctrl, rng, vec![trail], policy, t)
    }

    fn run_hashrouting<C: Collector>(
        &self,
        ctrl: &mut Controller<C>,
        rng: &mut impl Rng,
        receiver: NodeId,
        source: NodeId,
        variant: HashroutingVariant,
        t: Time,
    ) -> Result<(), ModelError> {
        let content = content_of(ctrl)?;
        let cache_nodes: Vec<NodeId> = ctrl.view().cache_nodes().into_iter().sorted_by_key(|n| n.index()).collect();
        if cache_nodes.is_empty() {
            return self.run_on_path(ctrl, rng, receiver, source, CachingPolicy::NoCache, t);
        }
        let authoritative = cache_nodes[hashrouting::zigzag_hash(content, cache_nodes.len())];

        let to_auth = ctrl.view().shortest_path(receiver, authoritative).ok_or(ModelError::NodeNotFound(authoritative))?;
        let (hit_idx, auth_hit) = walk_on_path(ctrl, &to_auth)?;
        let authoritative_missed = hit_idx == to_auth.len() - 1 && !auth_hit;
        let (request_path, serving) = if authoritative_missed {
            // authoritative missed: continue request to origin
            let mut onward = ctrl.view().shortest_path(authoritative, source).ok_or(ModelError::NodeNotFound(source))?;
            let (onward_hit, _) = walk_on_path(ctrl, &onward)?;
            let serving = onward[onward_hit];
            onward.remove(0);
            let mut combined = to_auth.clone();
            combined.extend(onward);
            (combined, serving)
        } else {
            (to_auth[..=hit_idx].to_vec(), to_auth[hit_idx])
        };

        let kind = if serving == source { TrailKind::FromSource } else { TrailKind::OnPathCacheHit };
        let main_trail = Trail { nodes: request_path, kind };

        let mut trails = vec![main_trail];
        let use_multicast = match variant {
            HashroutingVariant::Symmetric | HashroutingVariant::Asymmetric => false,
            HashroutingVariant::Multicast => true,
            HashroutingVariant::HybridSm => {
                let direct = ctrl.view().distance(serving, receiver).unwrap_or(u32::MAX);
                let to_auth_len = ctrl.view().distance(serving, authoritative).unwrap_or(u32::MAX);
                to_auth_len < direct
            }
            HashroutingVariant::HybridAm { max_stretch } => {
                let direct = ctrl.view().distance(serving, receiver).unwrap_or(0) as f64;
                let via_auth = ctrl.view().distance(serving, authoritative).unwrap_or(0) as f64;
                let stretch = (via_auth - direct).max(0.0);
                stretch <= max_stretch * ctrl.view().topology().node_count() as f64
            }
        };

        if matches!(variant, HashroutingVariant::Asymmetric) {
            let back = ctrl.view().shortest_path(receiver, serving).ok_or(ModelError::NodeNotFound(serving))?;
            trails = vec![Trail { nodes: back, kind }];
        } else if use_multicast && serving != authoritative {
            let to_receiver = ctrl.view().shortest_path(receiver, serving).ok_or(ModelError::NodeNotFound(serving))?;
            let to_auth_back =
                ctrl.view().shortest_path(authoritative, serving).ok_or(ModelError::NodeNotFound(serving))?;
            trails = vec![
                Trail { nodes: to_receiver, kind },
                Trail { nodes: to_auth_back, kind: TrailKind::OnPathCacheHit },
            ];
        }
        // Symmetric (and HybridSm/HybridAm without multicast) deliver back
        // over `main_trail` unchanged: it is already oriented
        // [receiver, ..., serving], the orientation `deliver` expects.

        deliver(ctrl, rng, trails, CachingPolicy::NoCache, t)?;
        if authoritative_missed {
            ctrl.put_content_cid(authoritative, content)?;
        }
        Ok(())
    }

    fn run_lira_detour<C: Collector>(
        &self,
        ctrl: &mut Controller<C>,
        rng: &mut impl Rng,
        receiver: NodeId,
        source: NodeId,
        max_detour: Option<u32>,
        policy: CachingPolicy,
        t: Time,
    ) -> Result<(), ModelError> {
        let path = ctrl.view().shortest_path(receiver, source).ok_or(ModelError::NodeNotFound(source))?;

        for w in path.windows(2) {
            let (u, v) = (w[0], w[1]);
            ctrl.get_content(v)?; // keep cache recency semantics consistent
            if let Some(mut entry) = ctrl.get_rsn(v, None)? {
                if let Some(record) = entry.get_freshest_except(t, u) {
                    if let Some(off_trail) = follow_trail(ctrl, t, v, record.next_hop, max_detour)? {
                        let mut nodes = path_prefix_to(&path, v);
                        nodes.extend(off_trail.into_iter().skip(1));
                        let trail = Trail { nodes, kind: TrailKind::OffPathHit };
                        return deliver(ctrl, rng, vec![trail], policy, t);
                    }
                }
            }
            if ctrl.has_content(v)? {
                let kind = if v == source { TrailKind::FromSource } else { TrailKind::OnPathCacheHit };
                let trail = Trail { nodes: path_prefix_to(&path, v), kind };
                return deliver(ctrl, rng, vec![trail], policy, t);
            }
        }
        // Falls through only if source lookup above somehow failed; source
        // always serves so this path is unreachable in a well-formed model.
        let trail = Trail { nodes: path, kind: TrailKind::FromSource };
        deliver(ctrl, rng, vec![trail], policy, t)
    }

    fn run_lira_dfib<C: Collector>(
        &self,
        ctrl: &mut Controller<C>,
        rng: &mut impl Rng,
        receiver: NodeId,
        source: NodeId,
        fan_out: usize,
        extra_quota: u32,
        policy: CachingPolicy,
        t: Time,
    ) -> Result<(), ModelError> {
        let path = ctrl.view().shortest_path(receiver, source).ok_or(ModelError::NodeNotFound(source))?;
        let quota = path.len() as u32 - 1 + extra_quota;
        let mut consumed = 0u32;
        let mut trails = Vec::new();

        for w in path.windows(2) {
            let (u, v) = (w[0], w[1]);
            consumed += 1;
            ctrl.get_content(v)?;
            if ctrl.has_content(v)? {
                let kind = if v == source { TrailKind::FromSource } else { TrailKind::OnPathCacheHit };
                trails.push(Trail { nodes: path_prefix_to(&path, v), kind });
                break;
            }
            if let Some(mut entry) = ctrl.get_rsn(v, None)? {
                let remaining_budget = quota.saturating_sub(consumed);
                if remaining_budget == 0 {
                    continue;
                }
                let candidates = entry.get_topk_freshest_except(t, u, fan_out);
                for record in candidates {
                    if let Some(off_trail) = follow_trail(ctrl, t, v, record.next_hop, Some(remaining_budget))? {
                        let mut nodes = path_prefix_to(&path, v);
                        nodes.extend(off_trail.into_iter().skip(1));
                        trails.push(Trail { nodes, kind: TrailKind::OffPathHit });
                    }
                }
                if !trails.is_empty() {
                    break;
                }
            }
        }

        if trails.is_empty() {
            trails.push(Trail { nodes: path, kind: TrailKind::FromSource });
        }
        deliver(ctrl, rng, trails, policy, t)
    }

    fn run_sit<C: Collector>(
        &self,
        ctrl: &mut Controller<C>,
        rng: &mut impl Rng,
        receiver: NodeId,
        fan_out: usize,
        extra_quota: u32,
        t: Time,
    ) -> Result<(), ModelError> {
        if !ctrl.view().has_cache(receiver) {
            return Err(ModelError::ReceiverHasNoCache(receiver));
        }
        let access = ctrl
            .view()
            .neighbors(receiver)
            .into_iter()
            .next()
            .ok_or(ModelError::NodeNotFound(receiver))?;
        ctrl.forward_request_hop(receiver, access, true)?;

        let content = content_of(ctrl)?;
        let quota = 1 + extra_quota;
        let mut trails = Vec::new();

        if ctrl.has_content(access)? {
            trails.push(Trail { nodes: vec![receiver, access], kind: TrailKind::OnPathCacheHit });
        } else if let Some(mut entry) = ctrl.get_rsn(access, None)? {
            let candidates = entry.get_topk_freshest_except(t, receiver, fan_out.max(1));
            for record in candidates {
                if let Some(off_trail) = follow_trail(ctrl, t, access, record.next_hop, Some(quota))? {
                    let mut nodes = vec![receiver];
                    nodes.extend(off_trail);
                    trails.push(Trail { nodes, kind: TrailKind::OffPathHit });
                }
            }
        }
        let _ = content;

        if trails.is_empty() {
            return Err(ModelError::InvalidTrail(access, content_of(ctrl)?));
        }
        deliver(ctrl, rng, trails, CachingPolicy::Lce, t)
    }

    fn run_sit_scoped_flooding<C: Collector>(
        &self,
        ctrl: &mut Controller<C>,
        rng: &mut impl Rng,
        receiver: NodeId,
        fan_out: usize,
        extra_quota: u32,
        scope: u32,
        t: Time,
    ) -> Result<(), ModelError> {
        match self.run_sit(ctrl, rng, receiver, fan_out, extra_quota, t) {
            Ok(()) => Ok(()),
            Err(_) => {
                let mut visited = std::collections::HashSet::new();
                match flood(ctrl, receiver, scope, &mut visited)? {
                    Some(nodes) => {
                        let trail = Trail { nodes, kind: TrailKind::OffPathHit };
                        deliver(ctrl, rng, vec![trail], CachingPolicy::Lce, t)
                    }
                    None => Err(ModelError::ReceiverHasNoCache(receiver)),
                }
            }
        }
    }

    fn run_scoped_flooding<C: Collector>(
        &self,
        ctrl: &mut Controller<C>,
        rng: &mut impl Rng,
        receiver: NodeId,
        scope: u32,
        p: f64,
        t: Time,
    ) -> Result<(), ModelError> {
        let mut visited = std::collections::HashSet::new();
        let found = flood(ctrl, receiver, scope, &mut visited)?;
        let trail = match found {
            Some(nodes) => Trail { nodes, kind: TrailKind::OffPathHit },
            None => {
                let source = ctrl.session().map(|s| s.source).ok_or(ModelError::NoActiveSession)?;
                let path = ctrl.view().shortest_path(receiver, source).ok_or(ModelError::NodeNotFound(source))?;
                let (hit, _) = walk_on_path(ctrl, &path)?;
                Trail { nodes: path[..=hit].to_vec(), kind: TrailKind::FromSource }
            }
        };
        deliver(ctrl, rng, vec![trail], CachingPolicy::Bernoulli(p), t)
    }
}

fn path_prefix_to(path: &[NodeId], node: NodeId) -> Vec<NodeId> {
    let idx = path.iter().position(|&n| n == node).unwrap_or(path.len() - 1);
    path[..=idx].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::RecordingCollector;
    use crate::config::CachingPolicy;
    use crate::model::{LinkType, Model, Topology};
    use maplit::hashset;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn line_model(cache_size: usize) -> (Model, Vec<NodeId>) {
        let mut b = Topology::builder();
        let r0 = b.add_receiver(None);
        let r1 = b.add_router(Some(cache_size), None);
        let r2 = b.add_router(Some(cache_size), None);
        let r3 = b.add_router(Some(cache_size), None);
        let r4 = b.add_source(hashset! { ContentId(2) });
        b.add_link(r0, r1, 1.0, LinkType::Internal);
        b.add_link(r1, r2, 1.0, LinkType::Internal);
        b.add_link(r2, r3, 1.0, LinkType::Internal);
        b.add_link(r3, r4, 1.0, LinkType::Internal);
        (Model::new(b.build(), 10.0, 20.0), vec![r0, r1, r2, r3, r4])
    }

    #[test]
    fn lce_scenario_a_caches_request_hit_and_content_hops() {
        let (mut model, nodes) = line_model(1);
        let mut collector = RecordingCollector::new();
        let mut ctrl = Controller::new(&mut model, Some(&mut collector));
        let mut rng = StdRng::seed_from_u64(1);
        let strategy = Strategy::Lce;
        strategy.process_event(&mut ctrl, &mut rng, 1.0, Event::Request { receiver: nodes[0], content: ContentId(2), log: true }).unwrap();

        use crate::collector::TelemetryEvent::*;
        let req_hops: Vec<_> = collector
            .events
            .iter()
            .filter_map(|e| match e {
                RequestHop(u, v, true) => Some((*u, *v)),
                _ => None,
            })
            .collect();
        assert_eq!(
            req_hops,
            vec![(nodes[0], nodes[1]), (nodes[1], nodes[2]), (nodes[2], nodes[3]), (nodes[3], nodes[4])]
        );
        let content_hops: Vec<_> = collector
            .events
            .iter()
            .filter_map(|e| match e {
                ContentHop(u, v, true) => Some((*u, *v)),
                _ => None,
            })
            .collect();
        assert_eq!(
            content_hops,
            vec![(nodes[4], nodes[3]), (nodes[3], nodes[2]), (nodes[2], nodes[1]), (nodes[1], nodes[0])]
        );
        assert!(ctrl.cache_at(nodes[1]).unwrap().has(ContentId(2)));
        assert!(ctrl.cache_at(nodes[2]).unwrap().has(ContentId(2)));
        assert!(ctrl.cache_at(nodes[3]).unwrap().has(ContentId(2)));
    }

    #[test]
    fn lcd_only_caches_one_hop_downstream() {
        let (mut model, nodes) = line_model(1);
        let mut ctrl: Controller<RecordingCollector> = Controller::new(&mut model, None);
        let mut rng = StdRng::seed_from_u64(2);
        let strategy = Strategy::Lcd;
        strategy
            .process_event(&mut ctrl, &mut rng, 1.0, Event::Request { receiver: nodes[0], content: ContentId(2), log: true })
            .unwrap();
        assert!(!ctrl.cache_at(nodes[1]).unwrap().has(ContentId(2)));
        assert!(!ctrl.cache_at(nodes[2]).unwrap().has(ContentId(2)));
        assert!(ctrl.cache_at(nodes[3]).unwrap().has(ContentId(2)));
    }

    #[test]
    fn nocache_never_caches() {
        let (mut model, nodes) = line_model(1);
        let mut ctrl: Controller<RecordingCollector> = Controller::new(&mut model, None);
        let mut rng = StdRng::seed_from_u64(3);
        Strategy::NoCache
            .process_event(&mut ctrl, &mut rng, 1.0, Event::Request { receiver: nodes[0], content: ContentId(2), log: true })
            .unwrap();
        for &n in &nodes[1..4] {
            assert!(!ctrl.cache_at(n).unwrap().has(ContentId(2)));
        }
    }

    #[test]
    fn probcache_policy_is_registered_and_runs_without_panicking() {
        let (mut model, nodes) = line_model(2);
        let mut ctrl: Controller<RecordingCollector> = Controller::new(&mut model, None);
        let mut rng = StdRng::seed_from_u64(4);
        let result = Strategy::ProbCache { t_tw: 1.0 }.process_event(
            &mut ctrl,
            &mut rng,
            1.0,
            Event::Request { receiver: nodes[0], content: ContentId(2), log: true },
        );
        assert!(result.is_ok());
        let _ = CachingPolicy::Lce; // keep import used across cfg(test) builds
    }

    #[test]
    fn from_name_and_options_builds_known_strategies() {
        let lce = Strategy::from_name_and_options("LCE", &crate::config::StrategyOptions::empty()).unwrap();
        assert!(matches!(lce, Strategy::Lce));

        let opts = crate::config::StrategyOptions { p: Some(0.3), ..Default::default() };
        let rb = Strategy::from_name_and_options("RANDOM-BERNOULLI", &opts).unwrap();
        assert!(matches!(rb, Strategy::RandomBernoulli(p) if (p - 0.3).abs() < f64::EPSILON));
    }

    #[test]
    fn from_name_and_options_rejects_unknown_name() {
        let err = Strategy::from_name_and_options("NOT-A-STRATEGY", &crate::config::StrategyOptions::empty());
        assert_eq!(err.unwrap_err(), crate::error::ConfigError::UnknownStrategy("NOT-A-STRATEGY".to_string()));
    }

    #[test]
    fn from_name_and_options_rejects_missing_required_field() {
        let err = Strategy::from_name_and_options("PROBCACHE", &crate::config::StrategyOptions::empty());
        assert_eq!(err.unwrap_err(), crate::error::ConfigError::MissingOption("t_tw".to_string()));
    }

    #[test]
    fn from_name_and_options_rejects_option_not_recognized_by_strategy() {
        let opts = crate::config::StrategyOptions { scope: Some(2), ..Default::default() };
        let err = Strategy::from_name_and_options("LCE", &opts);
        assert_eq!(err.unwrap_err(), crate::error::ConfigError::UnknownOption("scope".to_string()));
    }

    #[test]
    fn pit_dedup_delivers_content_hop_at_most_once_per_shared_node() {
        let (mut model, nodes) = line_model(1);
        let mut collector = RecordingCollector::new();
        let mut ctrl = Controller::new(&mut model, Some(&mut collector));
        let mut rng = StdRng::seed_from_u64(5);
        ctrl.start_session(1.0, nodes[0], ContentId(2), true).unwrap();

        // Two trails that both pass through nodes[1] on their way back to
        // the receiver, as a fan-out strategy's parallel off-path
        // explorations would produce.
        let trails = vec![
            Trail { nodes: vec![nodes[0], nodes[1], nodes[2]], kind: TrailKind::FromSource },
            Trail { nodes: vec![nodes[0], nodes[1], nodes[3]], kind: TrailKind::FromSource },
        ];
        deliver(&mut ctrl, &mut rng, trails, CachingPolicy::NoCache, 1.0).unwrap();

        use crate::collector::TelemetryEvent::ContentHop;
        let hops_into_receiver =
            collector.events.iter().filter(|e| matches!(e, ContentHop(u, v, _) if *u == nodes[1] && *v == nodes[0])).count();
        assert_eq!(hops_into_receiver, 1);
    }
}
