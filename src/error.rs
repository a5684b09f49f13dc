//! Module containing all error types.
//!
//! Errors split into one enum for setup-time configuration mistakes, one for
//! structural preconditions violated at request-processing time, and one
//! top-level enum tying both together.

use crate::ids::{ContentId, NodeId};
use thiserror::Error;

/// Errors raised while building or validating a typed configuration, before
/// any event is processed.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A configuration referenced a strategy name that does not exist.
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
    /// A configuration referenced a cache replacement policy that does not exist.
    #[error("unknown cache policy: {0}")]
    UnknownCachePolicy(String),
    /// A configuration carried an option that the chosen strategy/policy does
    /// not recognize.
    #[error("unknown configuration option: {0}")]
    UnknownOption(String),
    /// A workload parameter that must be non-negative was negative.
    #[error("{field} must be non-negative, got {value}")]
    NegativeParameter {
        /// Name of the offending field.
        field: &'static str,
        /// The value that was rejected.
        value: f64,
    },
    /// A placement configuration's target (cache/RSN budget split) does not
    /// match the topology it is meant to be applied to.
    #[error("placement target mismatch: {0}")]
    PlacementMismatch(String),
    /// `fresh_interval` was configured greater than `expiration_interval`
    /// (violates the invariant `F ≤ X`).
    #[error("fresh_interval ({fresh}) must be <= expiration_interval ({expiration})")]
    FreshAfterExpiration {
        /// Configured fresh interval `F`.
        fresh: f64,
        /// Configured expiration interval `X`.
        expiration: f64,
    },
    /// A strategy option that the chosen strategy requires was not supplied.
    #[error("missing required strategy option: {0}")]
    MissingOption(String),
}

/// Errors that indicate a structural precondition was violated: a strategy
/// or caller asked the model to do something that does not make sense given
/// the current topology or state. These are programmer/placement errors, not
/// recoverable runtime conditions.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// Referenced a node that does not exist in the topology.
    #[error("node not found in topology: {0:?}")]
    NodeNotFound(NodeId),
    /// Referenced a content id with no known origin.
    #[error("content has no known source: {0}")]
    UnknownContentSource(ContentId),
    /// A SIT-family strategy requires the receiver to own a cache, but it
    /// does not.
    #[error("receiver {0:?} has no cache, required by this strategy")]
    ReceiverHasNoCache(NodeId),
    /// `invalidate_trail` was asked to remove a hint record that does not
    /// exist. Per the spec this is a programmer error: every node on the
    /// trail must already have an RSN entry pointing to the next node.
    #[error("invalidate_trail: node {0:?} has no RSN entry for content {1}")]
    InvalidTrail(NodeId, ContentId),
    /// A mutating operation was attempted with no active session.
    #[error("no active session")]
    NoActiveSession,
    /// Two nodes that are assumed adjacent are not connected by a link.
    #[error("no link between {0:?} and {1:?}")]
    NotAdjacent(NodeId, NodeId),
}

/// Top-level crate error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Propagated from configuration validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Propagated from a structural precondition violation.
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}
