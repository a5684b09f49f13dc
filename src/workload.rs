//! # Workload generators
//!
//! The external event-stream contract (spec §6) plus two reference
//! generators. Explicitly thin glue (spec §1): a caller may plug in any
//! other `Iterator<Item = (Time, Event)>`.

use crate::config::WorkloadConfig;
use crate::error::ConfigError;
use crate::ids::{ContentId, NodeId, Time};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp, Zipf};
use std::collections::HashMap;

/// A single workload event, timestamped by the iterator that produces it
/// (spec §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// A content request.
    Request {
        /// Node issuing the request.
        receiver: NodeId,
        /// Content requested.
        content: ContentId,
        /// Whether telemetry should be emitted for this request.
        log: bool,
    },
    /// A previously-connected user of `receiver` disconnects (SIT family,
    /// spec §4.4). `content` names which of the receiver's held contents
    /// loses a connection.
    Disconnection {
        /// Node whose connection count decreases.
        receiver: NodeId,
        /// The content whose connection count decreases.
        content: ContentId,
        /// Whether telemetry should be emitted.
        log: bool,
    },
}

/// The workload iterator contract: a finite, non-restartable, monotonically
/// timestamped stream of events (spec §6, §9 "a plain iterator suffices").
pub trait EventStream: Iterator<Item = (Time, Event)> {}

impl<T: Iterator<Item = (Time, Event)>> EventStream for T {}

/// IRM (independent reference model) workload: i.i.d. Zipf-distributed
/// content requests spread uniformly over a fixed receiver set, with
/// Poisson-process inter-arrival times (spec §6's `Workload` config).
pub struct Stationary {
    rng: StdRng,
    zipf: Zipf<f64>,
    interarrival: Exp<f64>,
    receivers: Vec<NodeId>,
    t: Time,
    emitted: u64,
    total: u64,
    n_warmup: u64,
}

impl Stationary {
    /// Build a generator over `receivers`, seeded deterministically by
    /// `seed` (determinism is a tested property, spec §8 invariant 7).
    pub fn new(cfg: &WorkloadConfig, receivers: Vec<NodeId>, seed: u64) -> Result<Self, ConfigError> {
        if receivers.is_empty() {
            return Err(ConfigError::PlacementMismatch("workload needs at least one receiver".into()));
        }
        let zipf = Zipf::new(cfg.n_contents as f64, cfg.alpha)
            .map_err(|_| ConfigError::NegativeParameter { field: "alpha", value: cfg.alpha })?;
        let interarrival = Exp::new(cfg.rate)
            .map_err(|_| ConfigError::NegativeParameter { field: "rate", value: cfg.rate })?;
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            zipf,
            interarrival,
            receivers,
            t: 0.0,
            emitted: 0,
            total: cfg.n_warmup + cfg.n_measured,
            n_warmup: cfg.n_warmup,
        })
    }
}

impl Iterator for Stationary {
    type Item = (Time, Event);

    fn next(&mut self) -> Option<Self::Item> {
        if self.emitted >= self.total {
            return None;
        }
        self.t += self.interarrival.sample(&mut self.rng);
        let receiver = *self.receivers.choose(&mut self.rng).expect("non-empty, checked in new()");
        let content = ContentId(self.zipf.sample(&mut self.rng) as u64);
        let log = self.emitted >= self.n_warmup;
        self.emitted += 1;
        Some((self.t, Event::Request { receiver, content, log }))
    }
}

/// SIT-aware variant of [`Stationary`]: adds disconnection events at
/// `disconnection_rate` and re-sorts receivers by `beta`-weighted rank
/// before assigning selection probability.
///
/// The re-sort is ascending by receiver degree (`sort_by_key`, no
/// `.rev()`) with a Zipf(`beta`) draw favoring low ranks — i.e. **lower**-
/// degree receivers end up issuing more requests. A stale comment in the
/// distilled source claims the opposite ("decreasing order... higher-degree
/// PoPs have a higher request rate"); this implementation preserves the
/// source's actual, shipped behavior rather than the comment's claim, per
/// the instruction to resolve this in favor of the code.
pub struct StationarySit {
    rng: StdRng,
    zipf: Zipf<f64>,
    interarrival: Exp<f64>,
    disconnect_interarrival: Option<Exp<f64>>,
    receiver_rank: Zipf<f64>,
    receivers: Vec<NodeId>,
    active: HashMap<NodeId, HashMap<ContentId, u32>>,
    t: Time,
    next_disconnect_at: Time,
    emitted: u64,
    total: u64,
    n_warmup: u64,
}

impl StationarySit {
    /// Build a generator over `receivers`, each paired with its topology
    /// degree for the beta-weighted re-sort.
    pub fn new(
        cfg: &WorkloadConfig,
        mut receivers_with_degree: Vec<(NodeId, usize)>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        if receivers_with_degree.is_empty() {
            return Err(ConfigError::PlacementMismatch("workload needs at least one receiver".into()));
        }
        receivers_with_degree.sort_by_key(|&(_, degree)| degree);
        let receivers: Vec<NodeId> = receivers_with_degree.into_iter().map(|(n, _)| n).collect();

        let beta = cfg.beta.unwrap_or(0.0);
        non_negative("beta", beta)?;
        let receiver_rank = Zipf::new(receivers.len() as f64, if beta == 0.0 { 0.01 } else { beta })
            .map_err(|_| ConfigError::NegativeParameter { field: "beta", value: beta })?;

        let zipf = Zipf::new(cfg.n_contents as f64, cfg.alpha)
            .map_err(|_| ConfigError::NegativeParameter { field: "alpha", value: cfg.alpha })?;
        let interarrival = Exp::new(cfg.rate)
            .map_err(|_| ConfigError::NegativeParameter { field: "rate", value: cfg.rate })?;
        let disconnect_interarrival = match cfg.disconnection_rate {
            Some(r) if r > 0.0 => {
                Some(Exp::new(r).map_err(|_| ConfigError::NegativeParameter {
                    field: "disconnection_rate",
                    value: r,
                })?)
            }
            _ => None,
        };

        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            zipf,
            interarrival,
            disconnect_interarrival,
            receiver_rank,
            receivers,
            active: HashMap::new(),
            t: 0.0,
            next_disconnect_at: f64::INFINITY,
            emitted: 0,
            total: cfg.n_warmup + cfg.n_measured,
            n_warmup: cfg.n_warmup,
        })
    }

    fn pick_receiver(&mut self) -> NodeId {
        let rank = (self.receiver_rank.sample(&mut self.rng) as usize - 1).min(self.receivers.len() - 1);
        self.receivers[rank]
    }

    fn try_disconnection(&mut self) -> Option<Event> {
        let dist = self.disconnect_interarrival?;
        if self.next_disconnect_at.is_infinite() {
            self.next_disconnect_at = self.t + dist.sample(&mut self.rng);
        }
        if self.t < self.next_disconnect_at {
            return None;
        }
        self.next_disconnect_at = self.t + dist.sample(&mut self.rng);
        let candidates: Vec<NodeId> =
            self.active.iter().filter(|(_, m)| !m.is_empty()).map(|(&n, _)| n).collect();
        let receiver = *candidates.choose(&mut self.rng)?;
        let contents: Vec<ContentId> = self.active[&receiver].keys().copied().collect();
        let content = *contents.choose(&mut self.rng)?;
        let counter = self.active.get_mut(&receiver).unwrap().get_mut(&content).unwrap();
        *counter -= 1;
        if *counter == 0 {
            self.active.get_mut(&receiver).unwrap().remove(&content);
        }
        Some(Event::Disconnection { receiver, content, log: true })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value < 0.0 {
        Err(ConfigError::NegativeParameter { field, value })
    } else {
        Ok(())
    }
}

impl Iterator for StationarySit {
    type Item = (Time, Event);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.try_disconnection() {
            return Some((self.t, event));
        }
        if self.emitted >= self.total {
            return None;
        }
        self.t += self.interarrival.sample(&mut self.rng);
        let receiver = self.pick_receiver();
        let content = ContentId(self.zipf.sample(&mut self.rng) as u64);
        let log = self.emitted >= self.n_warmup;
        self.emitted += 1;
        *self.active.entry(receiver).or_default().entry(content).or_insert(0) += 1;
        Some((self.t, Event::Request { receiver, content, log }))
    }
}
