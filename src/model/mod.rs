//! # Network Model / View / Controller (spec §4.3)
//!
//! `model` owns the topology and all per-node mutable state
//! ([`Model`]), exposes a read-only query facade ([`View`]), and a
//! mutating, telemetry-emitting facade ([`Controller`]). [`Session`] is the
//! per-request scratch record both facades operate against.

mod centrality;
mod controller;
mod model;
mod session;
mod topology;
mod view;

pub use centrality::{Betweenness, ShortestPaths};
pub use controller::Controller;
pub use model::Model;
pub use session::Session;
pub use topology::{LinkAttrs, LinkType, StackKind, Topology, TopologyBuilder};
pub use view::View;
