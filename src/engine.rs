//! # Engine
//!
//! Wrapper tying [`Model`], [`Strategy`] and a workload [`EventStream`]
//! together into one run (spec §2, §5: "the engine reduces a finite event
//! stream over the model"). This is the crate's single entry point, the way
//! `snowcap::synthesize` is the teacher crate's.

use crate::collector::Collector;
use crate::error::ModelError;
use crate::ids::Time;
use crate::model::{Controller, Model};
use crate::strategy::Strategy;
use crate::workload::{Event, EventStream};
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Drives a [`Model`] through a workload, one event at a time, dispatching
/// every event to the active [`Strategy`] and routing telemetry to a
/// [`Collector`].
///
/// ## Usage
///
/// ```
/// use icnroute::collector::NullCollector;
/// use icnroute::config::WorkloadConfig;
/// use icnroute::engine::Engine;
/// use icnroute::model::{LinkType, Model, Topology};
/// use icnroute::strategy::Strategy;
/// use icnroute::workload::Stationary;
/// use maplit::hashset;
///
/// let mut builder = Topology::builder();
/// let receiver = builder.add_receiver(None);
/// let router = builder.add_router(Some(4), None);
/// let source = builder.add_source(hashset! { icnroute::ids::ContentId(1) });
/// builder.add_link(receiver, router, 1.0, LinkType::Internal);
/// builder.add_link(router, source, 1.0, LinkType::Internal);
/// let model = Model::new(builder.build(), 10.0, 20.0);
///
/// let cfg = WorkloadConfig {
///     alpha: 0.8,
///     n_contents: 10,
///     n_warmup: 5,
///     n_measured: 20,
///     rate: 1.0,
///     beta: None,
///     disconnection_rate: None,
/// };
/// let workload = Stationary::new(&cfg, vec![receiver], 1).unwrap();
///
/// let mut engine = Engine::new(model, Strategy::Lce, 1, NullCollector);
/// engine.run(workload).unwrap();
/// ```
pub struct Engine<C: Collector> {
    model: Model,
    strategy: Strategy,
    warmup_strategy: Option<Strategy>,
    rng: StdRng,
    collector: C,
}

impl<C: Collector> Engine<C> {
    /// Build an engine around `model`, dispatching every measured event to
    /// `strategy`. `seed` deterministically seeds every probabilistic
    /// decision the strategy makes (spec §8 invariant 7).
    pub fn new(model: Model, strategy: Strategy, seed: u64, collector: C) -> Self {
        Self { model, strategy, warmup_strategy: None, rng: StdRng::seed_from_u64(seed), collector }
    }

    /// Use a distinct strategy for events whose `log` flag is `false` (spec
    /// §6: an optional warmup strategy, e.g. to pre-populate caches with
    /// plain LCE before switching to the strategy under measurement).
    pub fn with_warmup_strategy(mut self, warmup_strategy: Strategy) -> Self {
        self.warmup_strategy = Some(warmup_strategy);
        self
    }

    /// Reduce `workload` over the model, one event at a time. Stops at the
    /// first error a strategy cannot itself recover from
    /// ([`ModelError::NoActiveSession`] only — every other strategy failure
    /// already falls back to the origin internally, spec §4.4).
    pub fn run(&mut self, workload: impl EventStream) -> Result<(), ModelError> {
        for (t, event) in workload {
            let log = match event {
                Event::Request { log, .. } => log,
                Event::Disconnection { log, .. } => log,
            };
            let strategy = if log { &self.strategy } else { self.warmup_strategy.as_ref().unwrap_or(&self.strategy) };
            trace!("t={:.3}: dispatching {:?} to {:?}", t, event, strategy);
            let mut ctrl = Controller::new(&mut self.model, Some(&mut self.collector));
            strategy.process_event(&mut ctrl, &mut self.rng, t, event)?;
        }
        debug!("workload exhausted");
        Ok(())
    }

    /// Read-only access to the underlying model (cache/RSN inspection after
    /// a run, e.g. in tests).
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Borrow the collector, to read back accumulated telemetry.
    pub fn collector(&self) -> &C {
        &self.collector
    }

    /// Mutably borrow the collector.
    pub fn collector_mut(&mut self) -> &mut C {
        &mut self.collector
    }

    /// Consume the engine, returning its collector.
    pub fn into_collector(self) -> C {
        self.collector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CacheHitRatioCollector, RecordingCollector};
    use crate::config::WorkloadConfig;
    use crate::ids::ContentId;
    use crate::model::{LinkType, Topology};
    use crate::workload::Stationary;
    use maplit::hashset;

    fn line_model() -> (Model, petgraph::graph::NodeIndex<u32>) {
        let mut b = Topology::builder();
        let r0 = b.add_receiver(None);
        let r1 = b.add_router(Some(2), None);
        let r2 = b.add_source(hashset! { ContentId(1), ContentId(2) });
        b.add_link(r0, r1, 1.0, LinkType::Internal);
        b.add_link(r1, r2, 1.0, LinkType::Internal);
        (Model::new(b.build(), 10.0, 20.0), r0)
    }

    fn cfg() -> WorkloadConfig {
        WorkloadConfig {
            alpha: 0.8,
            n_contents: 2,
            n_warmup: 3,
            n_measured: 7,
            rate: 2.0,
            beta: None,
            disconnection_rate: None,
        }
    }

    #[test]
    fn run_emits_telemetry_only_for_measured_events() {
        let (model, receiver) = line_model();
        let workload = Stationary::new(&cfg(), vec![receiver], 9).unwrap();
        let mut engine = Engine::new(model, Strategy::Lce, 9, RecordingCollector::new());
        engine.run(workload).unwrap();

        use crate::collector::TelemetryEvent::StartSession;
        let starts = engine.collector().events.iter().filter(|e| matches!(e, StartSession(..))).count();
        assert_eq!(starts, 7);
    }

    #[test]
    fn determinism_same_seed_same_workload_same_collector_stream() {
        let run_once = || {
            let (model, receiver) = line_model();
            let workload = Stationary::new(&cfg(), vec![receiver], 42).unwrap();
            let mut engine = Engine::new(model, Strategy::Lce, 42, RecordingCollector::new());
            engine.run(workload).unwrap();
            engine.into_collector().events
        };
        assert_eq!(run_once(), run_once());
    }

    #[test]
    fn warmup_strategy_used_only_before_measurement_starts() {
        let (model, receiver) = line_model();
        let workload = Stationary::new(&cfg(), vec![receiver], 3).unwrap();
        let mut engine = Engine::new(model, Strategy::NoCache, 3, CacheHitRatioCollector::default())
            .with_warmup_strategy(Strategy::Lce);
        engine.run(workload).unwrap();
        // Warmup (LCE) primed the cache, but the measured strategy is
        // NoCache, so no measured request should itself add a cache entry
        // beyond what warmup already left.
        assert!(engine.model().cache_nodes().len() >= 1);
    }
}
