//! End-to-end scenarios driven entirely through the crate's public surface:
//! build a topology, run one or two requests through a named strategy, and
//! check the resulting cache/RSN state and telemetry by hand. Each topology
//! is small enough to trace on paper; none of these reproduce a worked
//! example verbatim, they check the same underlying forwarding invariants
//! with simpler, self-contained graphs.

use icnroute::collector::{RecordingCollector, TelemetryEvent};
use icnroute::config::{StrategyOptions, WorkloadConfig};
use icnroute::engine::Engine;
use icnroute::ids::{ContentId, NodeId, Time};
use icnroute::model::{Controller, LinkType, Model, Topology};
use icnroute::strategy::Strategy;
use icnroute::workload::{Event, Stationary};
use lazy_static::lazy_static;
use maplit::hashset;
use petgraph::graph::NodeIndex;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn setup() {
    let _ = pretty_env_logger::try_init();
}

// A four-node chain shared by the on-path caching scenarios below. Each test
// rebuilds it from scratch (`Topology::builder` assigns indices in insertion
// order), so these constants stay valid across every test that uses it.
lazy_static! {
    static ref RECEIVER: NodeId = NodeIndex::new(0);
    static ref R1: NodeId = NodeIndex::new(1);
    static ref R2: NodeId = NodeIndex::new(2);
    static ref SOURCE: NodeId = NodeIndex::new(3);
}

const CHAIN_CONTENT: ContentId = ContentId(1);

fn chain_model() -> Model {
    let mut b = Topology::builder();
    let r0 = b.add_receiver(None);
    let r1 = b.add_router(Some(4), None);
    let r2 = b.add_router(Some(4), None);
    let source = b.add_source(hashset! { CHAIN_CONTENT });
    assert_eq!(r0, *RECEIVER);
    assert_eq!(r1, *R1);
    assert_eq!(r2, *R2);
    assert_eq!(source, *SOURCE);
    b.add_link(r0, r1, 1.0, LinkType::Internal);
    b.add_link(r1, r2, 1.0, LinkType::Internal);
    b.add_link(r2, source, 1.0, LinkType::Internal);
    Model::new(b.build(), 10.0, 20.0)
}

#[test]
fn lce_caches_at_every_on_path_node_then_hits_nearest() {
    setup();
    let mut model = chain_model();
    let mut collector = RecordingCollector::new();
    let mut rng = StdRng::seed_from_u64(1);
    let mut ctrl = Controller::new(&mut model, Some(&mut collector));

    let request = |r: NodeId, c: ContentId| Event::Request { receiver: r, content: c, log: true };
    Strategy::Lce.process_event(&mut ctrl, &mut rng, 0.0, request(*RECEIVER, CHAIN_CONTENT)).unwrap();

    assert!(ctrl.view().cache_lookup(*R1, CHAIN_CONTENT).unwrap());
    assert!(ctrl.view().cache_lookup(*R2, CHAIN_CONTENT).unwrap());
    assert!(collector.events.contains(&TelemetryEvent::ServerHit(*SOURCE)));

    collector.events.clear();
    Strategy::Lce.process_event(&mut ctrl, &mut rng, 1.0, request(*RECEIVER, CHAIN_CONTENT)).unwrap();

    // Second request hits at the nearest cache; it never reaches the source.
    assert!(collector.events.contains(&TelemetryEvent::CacheHit(*R1)));
    assert!(!collector.events.iter().any(|e| matches!(e, TelemetryEvent::ServerHit(_))));
}

#[test]
fn lcd_caches_only_one_hop_downstream_of_the_hit() {
    setup();
    let mut model = chain_model();
    let mut collector = RecordingCollector::new();
    let mut rng = StdRng::seed_from_u64(2);
    let mut ctrl = Controller::new(&mut model, Some(&mut collector));

    let request = Event::Request { receiver: *RECEIVER, content: CHAIN_CONTENT, log: true };
    Strategy::Lcd.process_event(&mut ctrl, &mut rng, 0.0, request).unwrap();

    assert!(ctrl.view().cache_lookup(*R2, CHAIN_CONTENT).unwrap());
    assert!(!ctrl.view().cache_lookup(*R1, CHAIN_CONTENT).unwrap());
}

#[test]
fn engine_run_is_deterministic_across_named_strategies() {
    setup();
    for name in ["LCE", "NDN", "HASHROUTING-MULTICAST", "RANDOM-CHOICE"] {
        let strategy = Strategy::from_name_and_options(name, &StrategyOptions::empty()).unwrap();
        let run = || {
            let model = chain_model();
            let cfg = WorkloadConfig {
                alpha: 0.8,
                n_contents: 1,
                n_warmup: 2,
                n_measured: 6,
                rate: 2.0,
                beta: None,
                disconnection_rate: None,
            };
            let workload = Stationary::new(&cfg, vec![*RECEIVER], 11).unwrap();
            let mut engine = Engine::new(model, strategy.clone(), 11, RecordingCollector::new());
            engine.run(workload).unwrap();
            engine.into_collector().events
        };
        assert_eq!(run(), run(), "strategy {name} was not deterministic");
    }
}

/// A receiver chained to an on-path router `v1`/`v2`, plus an off-path spur
/// `v1 - w1 - w2` used by the LIRA-LCE detour scenarios. `v1`/`w1` carry RSN
/// tables but no cache; `v2`/`w2` carry a cache but no RSN table.
fn lira_model() -> (Model, NodeId, NodeId, NodeId, NodeId, NodeId, NodeId) {
    let mut b = Topology::builder();
    let receiver = b.add_receiver(None);
    let v1 = b.add_router(None, Some(4));
    let v2 = b.add_router(Some(2), None);
    let source = b.add_source(hashset! { ContentId(9) });
    let w1 = b.add_router(None, Some(4));
    let w2 = b.add_router(Some(2), None);
    b.add_link(receiver, v1, 1.0, LinkType::Internal);
    b.add_link(v1, v2, 1.0, LinkType::Internal);
    b.add_link(v2, source, 1.0, LinkType::Internal);
    b.add_link(v1, w1, 1.0, LinkType::Internal);
    b.add_link(w1, w2, 1.0, LinkType::Internal);
    (Model::new(b.build(), 10.0, 20.0), receiver, v1, v2, source, w1, w2)
}

/// Pre-populate `w2`'s cache with `content` and point a two-hop RSN trail at
/// it from `v1` (`v1 -> w1 -> w2`), via a throwaway warmup session.
fn seed_lira_trail(
    ctrl: &mut Controller<RecordingCollector>,
    receiver: NodeId,
    v1: NodeId,
    w1: NodeId,
    w2: NodeId,
    content: ContentId,
) {
    ctrl.start_session(0.0, receiver, content, false).unwrap();
    ctrl.put_content_cid(w2, content).unwrap();
    ctrl.put_rsn(v1, w1, w2, 1, 0.0, false, Some(content)).unwrap();
    ctrl.put_rsn(w1, w2, w2, 1, 0.0, false, Some(content)).unwrap();
    ctrl.end_session(true).unwrap();
}

#[test]
fn lira_lce_detour_within_budget_reaches_off_path_copy() {
    setup();
    let (mut model, receiver, v1, v2, _source, w1, w2) = lira_model();
    let content = ContentId(9);
    let mut collector = RecordingCollector::new();
    let mut rng = StdRng::seed_from_u64(4);
    let mut ctrl = Controller::new(&mut model, Some(&mut collector));
    seed_lira_trail(&mut ctrl, receiver, v1, w1, w2, content);

    let strategy = Strategy::LiraLce { max_detour: Some(2) };
    let request = Event::Request { receiver, content, log: true };
    strategy.process_event(&mut ctrl, &mut rng, 1.0, request).unwrap();

    assert!(collector.events.contains(&TelemetryEvent::ContentHop(w2, w1, true)));
    assert!(collector.events.contains(&TelemetryEvent::ContentHop(w1, v1, true)));
    assert!(collector.events.contains(&TelemetryEvent::ContentHop(v1, receiver, true)));
    // The on-path router never saw this delivery: the detour served it.
    assert!(!ctrl.view().cache_lookup(v2, content).unwrap());
}

#[test]
fn lira_lce_detour_exceeding_budget_invalidates_and_falls_back_to_origin() {
    setup();
    let (mut model, receiver, v1, v2, source, w1, w2) = lira_model();
    let content = ContentId(9);
    let mut collector = RecordingCollector::new();
    let mut rng = StdRng::seed_from_u64(5);
    let mut ctrl = Controller::new(&mut model, Some(&mut collector));
    seed_lira_trail(&mut ctrl, receiver, v1, w1, w2, content);

    // Budget of 1 hop is not enough to reach w2 two hops away: the detour
    // is invalidated after the miss at w1 and the request falls back to the
    // shortest path, caching LCE-style at v2 on the way back.
    let strategy = Strategy::LiraLce { max_detour: Some(1) };
    let request = Event::Request { receiver, content, log: true };
    strategy.process_event(&mut ctrl, &mut rng, 1.0, request).unwrap();

    assert!(collector.events.contains(&TelemetryEvent::ServerHit(source)));
    assert!(ctrl.view().cache_lookup(v2, content).unwrap());
    assert!(!collector
        .events
        .iter()
        .any(|e| matches!(e, TelemetryEvent::ContentHop(u, v, _) if *u == w2 || *v == w1)));

    // The invalidated off-path hint is gone; a later run can't reuse it.
    assert!(ctrl.view().rsn_lookup(v1, content).is_none());
}

fn sit_model() -> (Model, NodeId, NodeId, NodeId) {
    let mut b = Topology::builder();
    let receiver = b.add_receiver(Some(2));
    let access = b.add_router(Some(2), None);
    let source = b.add_source(hashset! { ContentId(4) });
    b.add_link(receiver, access, 1.0, LinkType::Internal);
    b.add_link(access, source, 1.0, LinkType::Internal);
    (Model::new(b.build(), 10.0, 20.0), receiver, access, source)
}

#[test]
fn sit_only_disconnection_evicts_the_receivers_cached_copy() {
    setup();
    let (mut model, receiver, access, _source) = sit_model();
    let content = ContentId(4);
    let mut collector = RecordingCollector::new();
    let mut rng = StdRng::seed_from_u64(6);
    let mut ctrl = Controller::new(&mut model, Some(&mut collector));

    ctrl.start_session(0.0, receiver, content, false).unwrap();
    ctrl.put_content_cid(access, content).unwrap();
    ctrl.end_session(true).unwrap();

    let strategy = Strategy::SitOnly { fan_out: 1, extra_quota: 0 };
    strategy
        .process_event(&mut ctrl, &mut rng, 1.0, Event::Request { receiver, content, log: true })
        .unwrap();
    assert!(ctrl.view().cache_lookup(receiver, content).unwrap());

    strategy
        .process_event(&mut ctrl, &mut rng, 2.0, Event::Disconnection { receiver, content, log: true })
        .unwrap();
    assert_eq!(ctrl.view().cache_lookup(receiver, content), Some(false));
}

#[test]
fn hashrouting_symmetric_caches_only_at_the_authoritative_node() {
    setup();
    let mut b = Topology::builder();
    let receiver = b.add_receiver(None);
    let hub = b.add_router(None, None);
    let c0 = b.add_router(Some(4), None);
    let c1 = b.add_router(Some(4), None);
    let c2 = b.add_router(Some(4), None);
    let content = ContentId(2);
    let source = b.add_source(hashset! { content });
    b.add_link(receiver, hub, 1.0, LinkType::Internal);
    b.add_link(hub, c0, 1.0, LinkType::Internal);
    b.add_link(c0, c1, 1.0, LinkType::Internal);
    b.add_link(c1, c2, 1.0, LinkType::Internal);
    b.add_link(c2, source, 1.0, LinkType::Internal);
    let mut model = Model::new(b.build(), 10.0, 20.0);

    let mut collector = RecordingCollector::new();
    let mut rng = StdRng::seed_from_u64(3);
    let mut ctrl = Controller::new(&mut model, Some(&mut collector));
    let strategy = Strategy::from_name_and_options("HASHROUTING-SYMMETRIC", &StrategyOptions::empty()).unwrap();
    strategy
        .process_event(&mut ctrl, &mut rng, 0.0, Event::Request { receiver, content, log: true })
        .unwrap();

    // zigzag_hash(ContentId(2), 3) selects index 2 among the three cache
    // nodes sorted by node index (c0, c1, c2) -- c2 is authoritative.
    assert!(ctrl.view().cache_lookup(c2, content).unwrap());
    assert!(!ctrl.view().cache_lookup(c0, content).unwrap());
    assert!(!ctrl.view().cache_lookup(c1, content).unwrap());
}
