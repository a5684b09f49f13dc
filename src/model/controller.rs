//! The mutating, telemetry-emitting facade over a [`Model`] (spec §4.3).
//!
//! `Controller` owns the one active [`Session`] and a borrowed [`Collector`]
//! for the run. Every mutation is guarded by "a session is active"; every
//! event except cache `put`/`evict` is suppressed when the session's `log`
//! flag is false (warmup), per §4.3's contract.

use crate::cache::Cache;
use crate::collector::Collector;
use crate::error::ModelError;
use crate::ids::{ContentId, NodeId, Time};
use crate::model::model::Model;
use crate::model::session::Session;
use crate::model::topology::StackKind;
use crate::model::view::View;
use crate::rsn::RsnEntry;

/// Mutation + telemetry facade over a [`Model`], scoped to one active
/// [`Session`] at a time.
pub struct Controller<'a, C: Collector> {
    model: &'a mut Model,
    session: Option<Session>,
    collector: Option<&'a mut C>,
}

impl<'a, C: Collector> Controller<'a, C> {
    /// Build a controller over `model`, optionally wired to `collector`.
    pub fn new(model: &'a mut Model, collector: Option<&'a mut C>) -> Self {
        Self { model, session: None, collector }
    }

    /// A short-lived, read-only view over the same model. Safe to
    /// interleave with mutating calls on `self`: it borrows `&self`
    /// immutably for the single expression that uses it and every method it
    /// exposes returns owned data, so the borrow never outlives that use.
    pub fn view(&self) -> View<'_> {
        View(self.model)
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn require_session(&self) -> Result<&Session, ModelError> {
        self.session.as_ref().ok_or(ModelError::NoActiveSession)
    }

    fn log_enabled(&self) -> bool {
        self.session.as_ref().map(|s| s.log).unwrap_or(false)
    }

    fn session_content(&self, cid: Option<ContentId>) -> Result<ContentId, ModelError> {
        match cid {
            Some(c) => Ok(c),
            None => Ok(self.require_session()?.content),
        }
    }

    /// Begin a new session. Fails if `content`'s origin cannot be resolved.
    pub fn start_session(
        &mut self,
        t: Time,
        receiver: NodeId,
        content: ContentId,
        log: bool,
    ) -> Result<(), ModelError> {
        let source = self.model.content_source(content)?;
        self.session = Some(Session::new(t, receiver, content, log, source));
        if log {
            if let Some(c) = self.collector.as_deref_mut() {
                c.start_session(t, receiver, content);
            }
        }
        Ok(())
    }

    /// End the active session, releasing its per-request scratch state
    /// (spec §5: "must be released at `end_session`" — trivially true here
    /// since `Session` holds nothing but fixed-size fields and all
    /// exploration scratch lives on the strategy's call stack).
    pub fn end_session(&mut self, success: bool) -> Result<(), ModelError> {
        let log = self.require_session()?.log;
        if log {
            if let Some(c) = self.collector.as_deref_mut() {
                c.end_session(success);
            }
        }
        self.session = None;
        Ok(())
    }

    /// Emit `request_hop(u, v, main_path)` telemetry only.
    pub fn forward_request_hop(&mut self, u: NodeId, v: NodeId, main_path: bool) -> Result<(), ModelError> {
        self.require_session()?;
        if self.log_enabled() {
            if let Some(c) = self.collector.as_deref_mut() {
                c.request_hop(u, v, main_path);
            }
        }
        Ok(())
    }

    /// Emit `content_hop(u, v, main_path)` telemetry only.
    pub fn forward_content_hop(&mut self, u: NodeId, v: NodeId, main_path: bool) -> Result<(), ModelError> {
        self.require_session()?;
        if self.log_enabled() {
            if let Some(c) = self.collector.as_deref_mut() {
                c.content_hop(u, v, main_path);
            }
        }
        Ok(())
    }

    /// `forward_request_hop` over every adjacent pair in `path`.
    pub fn forward_request_path(&mut self, path: &[NodeId], main_path: bool) -> Result<(), ModelError> {
        for w in path.windows(2) {
            self.forward_request_hop(w[0], w[1], main_path)?;
        }
        Ok(())
    }

    /// `forward_content_hop` over every adjacent pair in `path`, in the
    /// order given (callers pass the trail already oriented serving-node to
    /// receiver, per spec §4.4's "walks every trail in reverse").
    pub fn forward_content_path(&mut self, path: &[NodeId], main_path: bool) -> Result<(), ModelError> {
        for w in path.windows(2) {
            self.forward_content_hop(w[0], w[1], main_path)?;
        }
        Ok(())
    }

    /// If `v` has a cache, `cache.get(cid)` and emit `cache_hit`/
    /// `cache_miss`; else if `v` is the origin of `cid`, emit `server_hit`
    /// and return `true`. Operates on the active session's content.
    pub fn get_content(&mut self, v: NodeId) -> Result<bool, ModelError> {
        let cid = self.require_session()?.content;
        let log = self.log_enabled();
        if let Some(cache) = self.model.cache_mut(v) {
            let hit = cache.get(cid);
            if log {
                if let Some(c) = self.collector.as_deref_mut() {
                    if hit {
                        c.cache_hit(v);
                    } else {
                        c.cache_miss(v);
                    }
                }
            }
            if hit {
                return Ok(true);
            }
        }
        if self.is_origin_of(v, cid)? {
            if log {
                if let Some(c) = self.collector.as_deref_mut() {
                    c.server_hit(v);
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Identical semantics to [`Controller::get_content`] but never emits
    /// telemetry (spec §4.3: "used by warmup").
    pub fn has_content(&mut self, v: NodeId) -> Result<bool, ModelError> {
        let cid = self.require_session()?.content;
        if let Some(cache) = self.model.cache_mut(v) {
            if cache.get(cid) {
                return Ok(true);
            }
        }
        self.is_origin_of(v, cid)
    }

    fn is_origin_of(&self, v: NodeId, cid: ContentId) -> Result<bool, ModelError> {
        match self.model.topology().stack(v)? {
            StackKind::Source { .. } => Ok(self.model.content_source(cid)? == v),
            _ => Ok(false),
        }
    }

    /// Insert the active session's content into `v`'s cache, if `v` has
    /// one. `put_item`/`evict_item` always fire, warmup or not.
    pub fn put_content(&mut self, v: NodeId) -> Result<(), ModelError> {
        let cid = self.require_session()?.content;
        self.put_content_cid(v, cid)
    }

    /// Insert `cid` into `v`'s cache, if `v` has one.
    pub fn put_content_cid(&mut self, v: NodeId, cid: ContentId) -> Result<(), ModelError> {
        self.require_session()?;
        if let Some(cache) = self.model.cache_mut(v) {
            let evicted = cache.put(cid);
            if let Some(c) = self.collector.as_deref_mut() {
                c.put_item(cid);
                if let Some(evicted) = evicted {
                    c.evict_item(evicted);
                }
            }
        }
        Ok(())
    }

    /// Remove the active session's content from `v`'s cache.
    pub fn remove_content(&mut self, v: NodeId) -> Result<bool, ModelError> {
        let cid = self.require_session()?.content;
        self.remove_content_at_node(cid, v)
    }

    /// Remove `cid` from `v`'s cache, regardless of the active session's
    /// content.
    pub fn remove_content_at_node(&mut self, cid: ContentId, v: NodeId) -> Result<bool, ModelError> {
        self.require_session()?;
        Ok(self.model.cache_mut(v).map(|c| c.remove(cid)).unwrap_or(false))
    }

    /// Direct access to `v`'s cache, for strategies that need more than the
    /// single-item operations above (e.g. a caching policy scanning size).
    pub fn cache_at(&self, v: NodeId) -> Option<&Cache> {
        self.model.cache(v)
    }

    /// Fetch and refresh `v`'s RSN entry for `cid` (defaults to session
    /// content); does not create one if absent.
    pub fn get_rsn(&mut self, v: NodeId, cid: Option<ContentId>) -> Result<Option<RsnEntry>, ModelError> {
        let cid = self.session_content(cid)?;
        Ok(self.model.rsn_mut(v).and_then(|t| t.get(cid)).cloned())
    }

    /// Upsert a hint record at `v` for `cid` (defaults to session content).
    pub fn put_rsn(
        &mut self,
        v: NodeId,
        next_hop: NodeId,
        destination: NodeId,
        distance: u32,
        now: Time,
        used: bool,
        cid: Option<ContentId>,
    ) -> Result<(), ModelError> {
        let cid = self.session_content(cid)?;
        if let Some(table) = self.model.rsn_mut(v) {
            table.entry_mut(cid).insert(next_hop, destination, distance, now, used);
        }
        Ok(())
    }

    /// Remove the entire RSN entry at `v` for `cid` (defaults to session
    /// content).
    pub fn remove_rsn(&mut self, v: NodeId, cid: Option<ContentId>) -> Result<bool, ModelError> {
        let cid = self.session_content(cid)?;
        Ok(self.model.rsn_mut(v).map(|t| t.remove(cid)).unwrap_or(false))
    }

    /// Remove the hint record pointing at `next_hop` from `v`'s RSN entry
    /// for `cid` (defaults to session content); drop the entry if it
    /// becomes empty.
    pub fn delete_rsn_nexthop(
        &mut self,
        v: NodeId,
        next_hop: NodeId,
        now: Time,
        cid: Option<ContentId>,
    ) -> Result<(), ModelError> {
        let cid = self.session_content(cid)?;
        if let Some(table) = self.model.rsn_mut(v) {
            if let Some(entry) = table.get(cid) {
                entry.delete_nexthop(next_hop);
            }
            table.drop_if_empty(cid, now);
        }
        Ok(())
    }

    /// Invalidate every hop of `trail` for `cid` (defaults to session
    /// content): for each adjacent pair `(ni, ni+1)`, remove the hint record
    /// whose `next_hop = ni+1` from `rsn[ni][cid]`, dropping the entry if it
    /// becomes empty. Precondition (spec §4.2): every `ni` already has a
    /// matching record; violation surfaces as [`ModelError::InvalidTrail`]
    /// rather than panicking, since loop/dead-end invalidation is a
    /// recoverable runtime condition (spec §7), not a programmer error, even
    /// though a missing record at this point does indicate a strategy bug.
    pub fn invalidate_trail(
        &mut self,
        trail: &[NodeId],
        now: Time,
        cid: Option<ContentId>,
    ) -> Result<(), ModelError> {
        let cid = self.session_content(cid)?;
        for w in trail.windows(2) {
            let (ni, next) = (w[0], w[1]);
            let table = self.model.rsn_mut(ni).ok_or(ModelError::InvalidTrail(ni, cid))?;
            let had = table.get(cid).map(|e| e.delete_nexthop(next)).unwrap_or(false);
            if !had {
                return Err(ModelError::InvalidTrail(ni, cid));
            }
            table.drop_if_empty(cid, now);
        }
        Ok(())
    }

    /// Decrement `receiver`'s outstanding-connection counter for `content`;
    /// `true` once it reaches zero (spec §4.4 disconnection events).
    pub fn decrement_connection(&mut self, receiver: NodeId, content: ContentId, initial: u32) -> bool {
        self.model.decrement_connection(receiver, content, initial)
    }
}
