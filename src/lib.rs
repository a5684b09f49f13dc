#![deny(missing_docs)]

//! # icnroute
//!
//! A discrete-event simulator for forwarding and in-network caching in an
//! Information-Centric Network: content-addressed routers, opportunistic
//! caches, and RSN (Recently Served Name) hint tables that let a request
//! detour off the shortest path toward a recently-seen copy.
//!
//! ## Problem statement
//!
//! Given a topology of receivers, routers and content sources, and a
//! workload of content requests (and, for disconnection-aware strategies,
//! connection-loss events), simulate how each of ~20 named forwarding
//! strategies routes requests, discovers cached copies on- and off-path,
//! and updates cache/RSN state on the way back — one event at a time, with
//! no concurrency within a single run.
//!
//! ## Structure
//!
//! - **[`model`]**: the static [`model::Topology`] plus the per-run
//!   [`model::Model`] (owns every cache/RSN table), its mutating,
//!   telemetry-emitting [`model::Controller`] facade, and the read-only
//!   [`model::View`] query surface.
//! - **[`cache`]**: the bounded LRU store backing both per-node caches and
//!   RSN tables.
//! - **[`rsn`]**: RSN hint records and per-node RSN tables.
//! - **[`strategy`]**: the closed [`strategy::Strategy`] enum implementing
//!   every named forwarding strategy, the return-path delivery machinery
//!   (on-path walk, off-path trail follow, PIT-deduped multi-trail
//!   delivery), and the [`strategy::caching_policy`]/
//!   [`strategy::hashrouting`] helpers it composes.
//! - **[`workload`]**: the [`workload::EventStream`] contract plus two
//!   reference generators (thin glue — any `Iterator<Item = (Time, Event)>`
//!   works).
//! - **[`collector`]**: the telemetry bus [`collector::Collector`] trait and
//!   a few reference collectors.
//! - **[`config`]**: typed, eagerly-validated run configuration.
//! - **[`engine`]**: [`engine::Engine`], the entry point tying a model, a
//!   strategy and a workload together into one run.
//! - **[`error`]**: the crate's error taxonomy.
//! - **[`ids`]**: the small id/time newtypes used everywhere.
//!
//! ## Usage
//!
//! ```
//! use icnroute::config::WorkloadConfig;
//! use icnroute::collector::CacheHitRatioCollector;
//! use icnroute::engine::Engine;
//! use icnroute::ids::ContentId;
//! use icnroute::model::{LinkType, Model, Topology};
//! use icnroute::strategy::Strategy;
//! use icnroute::workload::Stationary;
//! use maplit::hashset;
//!
//! // Build the topology: a receiver, a caching router, a content source.
//! let mut builder = Topology::builder();
//! let receiver = builder.add_receiver(None);
//! let router = builder.add_router(Some(8), None);
//! let source = builder.add_source(hashset! { ContentId(1) });
//! builder.add_link(receiver, router, 1.0, LinkType::Internal);
//! builder.add_link(router, source, 1.0, LinkType::Internal);
//! let model = Model::new(builder.build(), 10.0, 20.0);
//!
//! // Drive a small IRM workload through Leave-Copy-Everywhere.
//! let cfg = WorkloadConfig {
//!     alpha: 0.8,
//!     n_contents: 1,
//!     n_warmup: 0,
//!     n_measured: 20,
//!     rate: 1.0,
//!     beta: None,
//!     disconnection_rate: None,
//! };
//! let workload = Stationary::new(&cfg, vec![receiver], 1).unwrap();
//! let mut engine = Engine::new(model, Strategy::Lce, 1, CacheHitRatioCollector::default());
//! engine.run(workload).unwrap();
//! println!("{:?}", engine.collector().content_ratio(ContentId(1)));
//! ```

pub mod cache;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod ids;
pub mod model;
pub mod rsn;
pub mod strategy;
pub mod workload;

pub use error::{ConfigError, EngineError, ModelError};
