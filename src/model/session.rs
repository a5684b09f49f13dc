//! The lifetime-of-one-request-event session (spec §3).

use crate::ids::{ContentId, NodeId, Time};

/// State scoped to one request event. At most one is active on a [`super::Model`]
/// at a time (spec §3, §5).
#[derive(Debug, Clone)]
pub struct Session {
    /// Simulated time the request was issued.
    pub timestamp: Time,
    /// Node that issued the request.
    pub receiver: NodeId,
    /// Content being requested.
    pub content: ContentId,
    /// Whether telemetry should be emitted for this session (false during
    /// warmup).
    pub log: bool,
    /// Origin of `content`, resolved at session start.
    pub source: NodeId,
}

impl Session {
    /// Start a new session.
    pub fn new(timestamp: Time, receiver: NodeId, content: ContentId, log: bool, source: NodeId) -> Self {
        Self { timestamp, receiver, content, log, source }
    }
}
