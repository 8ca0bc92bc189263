//! The chain itself: an arena of entries, a name index, the
//! register/deregister protocol (`spec.md` §4.1), and the eight-event
//! dispatch routing (`spec.md` §4.2).
//!
//! The structural lock is a `parking_lot::ReentrantMutex<RefCell<ChainState>>`
//! (`spec.md` §5: "the lock is reentrant because callbacks mutate the chain
//! on the same thread"). The `RefCell` gives us `&mut` access to the arena
//! from inside a `&self` method without a second, non-reentrant lock layer;
//! the discipline that keeps it sound is: every `RefCell` borrow is taken
//! fresh, mutates a handful of fields, and is dropped *before* any filter
//! callback runs. A filter's lifecycle hook or event method never executes
//! while a `RefCell` borrow is live, so a reentrant call from inside that
//! hook (e.g. `on_post_add` calling `chain.remove(...)`) takes its own fresh
//! borrow rather than panicking on `already borrowed`. The outer
//! `ReentrantMutexGuard` is held for the whole `register`/`deregister` call,
//! matching `spec.md` §4.1's "the add/remove sequence runs under the chain
//! lock" — a nested call from a callback re-enters the same mutex on the
//! same thread instead of blocking.
//!
//! Event dispatch (`spec.md` §4.2) deliberately does *not* hold the lock
//! across a filter invocation — only across the O(1) step of reading an
//! entry's filter handle and neighbor pointers, which are then released
//! before the filter runs. This keeps the "dispatch takes no lock" spirit of
//! `spec.md` §5 while staying sound in safe Rust: two threads are still
//! allowed to read the arena concurrently with a structural mutation, but
//! never through an aliased `&mut`.

use crate::entry::{Entry, EntryId};
use crate::proxy::EntryProxy;
use chainio_kernel::{
    AsAny, AttrKey, ChainError, ChainResult, ChainView, ConnectFuture, Filter, FilterResult,
    IdleStatus, IoMessage, LifecycleError, LifecyclePhase, Session, WriteRequest,
};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{trace, warn};

const HEAD: EntryId = EntryId(0);
const TAIL: EntryId = EntryId(1);

enum Slot {
    Occupied(Entry),
    Free,
}

pub(crate) struct ChainState {
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: HashMap<String, EntryId>,
}

impl ChainState {
    fn new(head_filter: Arc<dyn Filter>, tail_filter: Arc<dyn Filter>) -> Self {
        let mut head = Entry::new(None, head_filter);
        let mut tail = Entry::new(None, tail_filter);
        head.next = Some(TAIL);
        tail.prev = Some(HEAD);
        Self {
            slots: vec![Slot::Occupied(head), Slot::Occupied(tail)],
            free: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn entry(&self, id: EntryId) -> &Entry {
        match &self.slots[id.0 as usize] {
            Slot::Occupied(e) => e,
            Slot::Free => panic!("chainio: stale EntryId {id:?} resolved to a free slot"),
        }
    }

    fn entry_mut(&mut self, id: EntryId) -> &mut Entry {
        match &mut self.slots[id.0 as usize] {
            Slot::Occupied(e) => e,
            Slot::Free => panic!("chainio: stale EntryId {id:?} resolved to a free slot"),
        }
    }

    fn alloc(&mut self, entry: Entry) -> EntryId {
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Slot::Occupied(entry);
            EntryId(idx)
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot::Occupied(entry));
            EntryId(idx)
        }
    }

    fn dealloc(&mut self, id: EntryId) -> Entry {
        let slot = std::mem::replace(&mut self.slots[id.0 as usize], Slot::Free);
        self.free.push(id.0);
        match slot {
            Slot::Occupied(e) => e,
            Slot::Free => panic!("chainio: double-free of EntryId {id:?}"),
        }
    }

    fn resolve_name(&self, name: &str) -> ChainResult<EntryId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ChainError::UnknownName(name.to_string()))
    }

    fn find_by_predicate(&self, pred: impl Fn(&Entry) -> bool) -> Option<EntryId> {
        let mut current = self.entry(HEAD).next;
        while let Some(id) = current {
            if id == TAIL {
                break;
            }
            let entry = self.entry(id);
            if pred(entry) {
                return Some(id);
            }
            current = entry.next;
        }
        None
    }

    fn splice_between(&mut self, prev: EntryId, id: EntryId, next: EntryId) {
        self.entry_mut(prev).next = Some(id);
        self.entry_mut(next).prev = Some(prev);
        self.entry_mut(id).prev = Some(prev);
        self.entry_mut(id).next = Some(next);
    }

    fn unsplice(&mut self, id: EntryId) -> (EntryId, EntryId) {
        let entry = self.entry(id);
        let prev = entry.prev.expect("non-head entry always has a prev");
        let next = entry.next.expect("non-tail entry always has a next");
        self.entry_mut(prev).next = Some(next);
        self.entry_mut(next).prev = Some(prev);
        (prev, next)
    }

    fn names_head_to_tail(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = self.entry(HEAD).next;
        while let Some(id) = current {
            if id == TAIL {
                break;
            }
            let entry = self.entry(id);
            if let Some(name) = &entry.name {
                out.push(name.clone());
            }
            current = entry.next;
        }
        out
    }
}

/// Where a new entry is inserted relative to an existing one.
enum Anchor {
    First,
    Last,
    Before(String),
    After(String),
}

/// A bidirectional filter chain bound to one session.
///
/// Cheap to [`Clone`] — every clone shares the *same* arena through an
/// `Arc` (`spec.md` §3 "one chain instance per session", constructed once
/// and handed around by reference). This is distinct from [`Chain::copy_from`],
/// which builds a second, independent arena.
#[derive(Clone)]
pub struct Chain {
    inner: Arc<ChainShared>,
}

struct ChainShared {
    lock: ReentrantMutex<RefCell<ChainState>>,
    session: Arc<dyn Session>,
}

impl Chain {
    /// Build a fresh chain for `session`, already containing just the
    /// fixed head and tail entries (`spec.md` §3 invariant 1).
    pub fn new(
        session: Arc<dyn Session>,
        head_filter: Arc<dyn Filter>,
        tail_filter: Arc<dyn Filter>,
    ) -> Self {
        Chain {
            inner: Arc::new(ChainShared {
                lock: ReentrantMutex::new(RefCell::new(ChainState::new(head_filter, tail_filter))),
                session,
            }),
        }
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.inner.session
    }

    /// Builds a second, independent chain bound to `session`, pre-populated
    /// by iterating `source.get_all()` and splicing an equivalent entry in
    /// at the same relative position for each one — without invoking either
    /// filter's `on_pre_add`/`on_post_add` (`spec.md` §3 "Lifecycles": "a
    /// copy constructor exists... the copy does not invoke onPreAdd/
    /// onPostAdd"; §9 "a builder that iterates the source chain's
    /// `getAll()` and re-adds each filter without lifecycle callbacks").
    ///
    /// The two chains share nothing afterward: later mutations on one are
    /// invisible to the other.
    pub fn copy_from(
        session: Arc<dyn Session>,
        head_filter: Arc<dyn Filter>,
        tail_filter: Arc<dyn Filter>,
        source: &Chain,
    ) -> Self {
        let chain = Chain::new(session, head_filter, tail_filter);
        for (name, filter) in source.get_all() {
            chain.splice_last_no_lifecycle(name, filter);
        }
        chain
    }

    /// Splices a new entry onto the tail, bypassing `on_pre_add`/
    /// `on_post_add` entirely — the primitive [`Chain::copy_from`] needs and
    /// that ordinary [`Chain::insert`] deliberately does not expose.
    fn splice_last_no_lifecycle(&self, name: String, filter: Arc<dyn Filter>) {
        let guard = self.inner.lock.lock();
        let id = { guard.borrow_mut().alloc(Entry::new(Some(name.clone()), filter)) };
        let mut state = guard.borrow_mut();
        let prev = state.entry(TAIL).prev.unwrap();
        state.splice_between(prev, id, TAIL);
        state.index.insert(name, id);
    }

    fn proxy(&self, id: EntryId) -> EntryProxy {
        EntryProxy::new(self.clone(), id)
    }

    pub(crate) fn filter_at(&self, id: EntryId) -> Arc<dyn Filter> {
        let guard = self.inner.lock.lock();
        Arc::clone(&guard.borrow().entry(id).filter)
    }

    pub(crate) fn next_of(&self, id: EntryId) -> Option<EntryId> {
        let guard = self.inner.lock.lock();
        guard.borrow().entry(id).next
    }

    pub(crate) fn prev_of(&self, id: EntryId) -> Option<EntryId> {
        let guard = self.inner.lock.lock();
        guard.borrow().entry(id).prev
    }

    // ---- structural mutation (`spec.md` §4.1) -----------------------

    fn insert(&self, anchor: Anchor, name: String, filter: Arc<dyn Filter>) -> ChainResult<()> {
        if name.trim().is_empty() {
            return Err(ChainError::EmptyName);
        }
        let guard = self.inner.lock.lock();

        if guard.borrow().index.contains_key(&name) {
            return Err(ChainError::DuplicateName(name));
        }
        let (prev, next) = {
            let state = guard.borrow();
            match &anchor {
                Anchor::First => (HEAD, state.entry(HEAD).next.unwrap()),
                Anchor::Last => (state.entry(TAIL).prev.unwrap(), TAIL),
                Anchor::Before(base) => {
                    let id = state.resolve_name(base).map_err(|_| {
                        ChainError::UnknownBase(base.clone())
                    })?;
                    (state.entry(id).prev.unwrap(), id)
                }
                Anchor::After(base) => {
                    let id = state.resolve_name(base).map_err(|_| {
                        ChainError::UnknownBase(base.clone())
                    })?;
                    (id, state.entry(id).next.unwrap())
                }
            }
        };

        // Step 1: allocate a provisional, unspliced entry so the filter's
        // on_pre_add hook can be invoked without yet being visible to
        // traversal or the name index (`spec.md` §4.1 step 1-2).
        let id = { guard.borrow_mut().alloc(Entry::new(Some(name.clone()), Arc::clone(&filter))) };

        let view = ChainSnapshot { session_id: self.inner.session.id(), names: guard.borrow().names_head_to_tail() };
        if let Err(source) = filter.on_pre_add(&view, &name) {
            guard.borrow_mut().dealloc(id);
            return Err(ChainError::Lifecycle(LifecycleError {
                filter: name,
                session_id: self.inner.session.id(),
                phase: LifecyclePhase::PreAdd,
                source,
            }));
        }

        // Step 3: splice and index — now visible to traversal and lookup.
        {
            let mut state = guard.borrow_mut();
            state.splice_between(prev, id, next);
            state.index.insert(name.clone(), id);
        }
        trace!(filter = %name, session_id = self.inner.session.id(), "filter spliced in");

        // Step 4: on_post_add. Failure rolls the splice back; no further
        // lifecycle calls run on the rollback path (`spec.md` §4.1 step 4).
        let view = ChainSnapshot { session_id: self.inner.session.id(), names: guard.borrow().names_head_to_tail() };
        if let Err(source) = filter.on_post_add(&view, &name) {
            {
                let mut state = guard.borrow_mut();
                state.unsplice(id);
                state.index.remove(&name);
                state.dealloc(id);
            }
            warn!(filter = %name, session_id = self.inner.session.id(), "on_post_add failed, rolled back");
            return Err(ChainError::Lifecycle(LifecycleError {
                filter: name,
                session_id: self.inner.session.id(),
                phase: LifecyclePhase::PostAdd,
                source,
            }));
        }

        Ok(())
    }

    pub fn add_first(&self, name: impl Into<String>, filter: Arc<dyn Filter>) -> ChainResult<()> {
        self.insert(Anchor::First, name.into(), filter)
    }

    pub fn add_last(&self, name: impl Into<String>, filter: Arc<dyn Filter>) -> ChainResult<()> {
        self.insert(Anchor::Last, name.into(), filter)
    }

    pub fn add_before(
        &self,
        base_name: impl Into<String>,
        name: impl Into<String>,
        filter: Arc<dyn Filter>,
    ) -> ChainResult<()> {
        self.insert(Anchor::Before(base_name.into()), name.into(), filter)
    }

    pub fn add_after(
        &self,
        base_name: impl Into<String>,
        name: impl Into<String>,
        filter: Arc<dyn Filter>,
    ) -> ChainResult<()> {
        self.insert(Anchor::After(base_name.into()), name.into(), filter)
    }

    fn remove_id(&self, id: EntryId) -> ChainResult<()> {
        let guard = self.inner.lock.lock();
        let (name, filter) = {
            let state = guard.borrow();
            let entry = state.entry(id);
            (entry.name.clone().expect("head/tail are never removable"), Arc::clone(&entry.filter))
        };

        // Deregister step 1: on_pre_remove, still fully linked.
        let view = ChainSnapshot { session_id: self.inner.session.id(), names: guard.borrow().names_head_to_tail() };
        if let Err(source) = filter.on_pre_remove(&view, &name) {
            return Err(ChainError::Lifecycle(LifecycleError {
                filter: name,
                session_id: self.inner.session.id(),
                phase: LifecyclePhase::PreRemove,
                source,
            }));
        }

        // Step 2-3: unsplice, unindex, free the slot.
        {
            let mut state = guard.borrow_mut();
            state.unsplice(id);
            state.index.remove(&name);
            state.dealloc(id);
        }
        trace!(filter = %name, session_id = self.inner.session.id(), "filter unspliced");

        // Step 4: on_post_remove — the filter is already gone; failure here
        // is reported but changes nothing further (`spec.md` §4.1 deregister
        // step 3-4).
        let view = ChainSnapshot { session_id: self.inner.session.id(), names: guard.borrow().names_head_to_tail() };
        if let Err(source) = filter.on_post_remove(&view, &name) {
            return Err(ChainError::Lifecycle(LifecycleError {
                filter: name,
                session_id: self.inner.session.id(),
                phase: LifecyclePhase::PostRemove,
                source,
            }));
        }

        Ok(())
    }

    pub fn remove_by_name(&self, name: &str) -> ChainResult<()> {
        let id = {
            let guard = self.inner.lock.lock();
            guard.borrow().resolve_name(name)?
        };
        self.remove_id(id)
    }

    pub fn remove_by_filter(&self, filter: &Arc<dyn Filter>) -> ChainResult<()> {
        let id = {
            let guard = self.inner.lock.lock();
            guard
                .borrow()
                .find_by_predicate(|e| Arc::ptr_eq(&e.filter, filter))
                .ok_or(ChainError::NotFound)?
        };
        self.remove_id(id)
    }

    pub fn remove_by_type<T: 'static>(&self) -> ChainResult<()> {
        let id = {
            let guard = self.inner.lock.lock();
            guard
                .borrow()
                .find_by_predicate(|e| e.filter.as_any().is::<T>())
                .ok_or(ChainError::NotFound)?
        };
        self.remove_id(id)
    }

    /// Swaps the filter stored at `id` in place — the entry keeps its
    /// position, name, and index slot. No lifecycle hook runs on either
    /// filter (`spec.md` §4.1 "replace... does not invoke pre/post-add/
    /// remove callbacks").
    fn replace_id(&self, id: EntryId, new_filter: Arc<dyn Filter>) -> ChainResult<()> {
        let guard = self.inner.lock.lock();
        guard.borrow_mut().entry_mut(id).filter = new_filter;
        Ok(())
    }

    pub fn replace_by_name(&self, name: &str, new_filter: Arc<dyn Filter>) -> ChainResult<()> {
        let id = {
            let guard = self.inner.lock.lock();
            guard.borrow().resolve_name(name)?
        };
        self.replace_id(id, new_filter)
    }

    pub fn replace_by_filter(
        &self,
        old: &Arc<dyn Filter>,
        new_filter: Arc<dyn Filter>,
    ) -> ChainResult<()> {
        let id = {
            let guard = self.inner.lock.lock();
            guard
                .borrow()
                .find_by_predicate(|e| Arc::ptr_eq(&e.filter, old))
                .ok_or(ChainError::NotFound)?
        };
        self.replace_id(id, new_filter)
    }

    pub fn replace_by_type<T: 'static>(&self, new_filter: Arc<dyn Filter>) -> ChainResult<()> {
        let id = {
            let guard = self.inner.lock.lock();
            guard
                .borrow()
                .find_by_predicate(|e| e.filter.as_any().is::<T>())
                .ok_or(ChainError::NotFound)?
        };
        self.replace_id(id, new_filter)
    }

    /// Remove every user entry. Best-effort: a failure partway through does
    /// not stop the attempt on the remaining entries (`spec.md` §7 kind 6).
    /// Returns the first error encountered, wrapped with the total failure
    /// count.
    pub fn clear(&self) -> ChainResult<()> {
        let names = {
            let guard = self.inner.lock.lock();
            guard.borrow().names_head_to_tail()
        };
        let mut first: Option<ChainError> = None;
        let mut count = 0usize;
        for name in names {
            if let Err(e) = self.remove_by_name(&name) {
                count += 1;
                if first.is_none() {
                    first = Some(e);
                }
            }
        }
        match first {
            None => Ok(()),
            Some(first) => Err(ChainError::ClearFailed {
                count,
                first: Box::new(first),
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Filter>> {
        let guard = self.inner.lock.lock();
        let state = guard.borrow();
        state.index.get(name).map(|id| Arc::clone(&state.entry(*id).filter))
    }

    pub fn get_by_type<T: 'static>(&self) -> Option<Arc<dyn Filter>> {
        let guard = self.inner.lock.lock();
        let state = guard.borrow();
        state
            .find_by_predicate(|e| e.filter.as_any().is::<T>())
            .map(|id| Arc::clone(&state.entry(id).filter))
    }

    pub fn contains(&self, name: &str) -> bool {
        let guard = self.inner.lock.lock();
        guard.borrow().index.contains_key(name)
    }

    pub fn contains_type<T: 'static>(&self) -> bool {
        let guard = self.inner.lock.lock();
        guard.borrow().find_by_predicate(|e| e.filter.as_any().is::<T>()).is_some()
    }

    /// The filter immediately after `name`, or `None` if `name` is the last
    /// user entry (`spec.md` §4.1 `getNextFilter`).
    pub fn get_next_filter(&self, name: &str) -> ChainResult<Option<Arc<dyn Filter>>> {
        let guard = self.inner.lock.lock();
        let state = guard.borrow();
        let id = state.resolve_name(name)?;
        let next = state.entry(id).next.unwrap();
        Ok(if next == TAIL {
            None
        } else {
            Some(Arc::clone(&state.entry(next).filter))
        })
    }

    pub fn get_all(&self) -> Vec<(String, Arc<dyn Filter>)> {
        let guard = self.inner.lock.lock();
        let state = guard.borrow();
        let mut out = Vec::new();
        let mut current = state.entry(HEAD).next;
        while let Some(id) = current {
            if id == TAIL {
                break;
            }
            let entry = state.entry(id);
            out.push((entry.name.clone().unwrap(), Arc::clone(&entry.filter)));
            current = entry.next;
        }
        out
    }

    pub fn get_all_reversed(&self) -> Vec<(String, Arc<dyn Filter>)> {
        let mut out = self.get_all();
        out.reverse();
        out
    }

    // ---- event dispatch (`spec.md` §4.2) -----------------------------

    fn catch(&self, id: EntryId, result: FilterResult) -> FilterResult {
        match result {
            Ok(()) => Ok(()),
            Err(cause) => {
                let name = self.filter_name(id);
                warn!(filter = name.as_deref().unwrap_or("?"), session_id = self.inner.session.id(), error = %cause, "filter raised, redirecting to exception_caught");
                self.fire_exception_caught(cause);
                Ok(())
            }
        }
    }

    fn filter_name(&self, id: EntryId) -> Option<String> {
        let guard = self.inner.lock.lock();
        guard.borrow().entry(id).name.clone()
    }

    pub fn fire_session_created(&self) {
        let filter = self.filter_at(HEAD);
        let session = Arc::clone(&self.inner.session);
        let proxy = self.proxy(HEAD);
        let result = filter.session_created(session.as_ref(), &proxy);
        let _ = self.catch(HEAD, result);
    }

    pub fn fire_session_opened(&self) {
        let filter = self.filter_at(HEAD);
        let session = Arc::clone(&self.inner.session);
        let proxy = self.proxy(HEAD);
        let result = filter.session_opened(session.as_ref(), &proxy);
        let _ = self.catch(HEAD, result);
    }

    /// Marks the session's close future closed *before* propagation — the
    /// head-entry side effect the event table assigns to `sessionClosed`
    /// (`spec.md` §4.2) — dispatches through to the handler, then runs the
    /// four independently fault-tolerant finally-steps the tail's
    /// `sessionClosed` row describes (`spec.md` §4.4): dispose the write
    /// queue, dispose the attribute map, clear the chain, and — if the
    /// session polls for reads — offer a closed read future. A failure in
    /// one step never skips the rest.
    pub fn fire_session_closed(&self) {
        let _ = self.inner.session.close_future().mark_closed();

        let filter = self.filter_at(HEAD);
        let session = Arc::clone(&self.inner.session);
        let proxy = self.proxy(HEAD);
        let result = filter.session_closed(session.as_ref(), &proxy);
        let _ = self.catch(HEAD, result);

        session.write_queue().dispose();
        session.attributes().dispose();
        let _ = self.clear();
        if session.is_use_read_operation() {
            session.offer_closed_read_future();
        }
    }

    /// `session.increase_idle_count` is the head-entry side effect the
    /// event table assigns to `sessionIdle` (`spec.md` §4.2); it runs before
    /// the event ever reaches a filter.
    pub fn fire_session_idle(&self, status: IdleStatus) {
        self.inner.session.increase_idle_count(status, Instant::now());

        let filter = self.filter_at(HEAD);
        let session = Arc::clone(&self.inner.session);
        let proxy = self.proxy(HEAD);
        let result = filter.session_idle(session.as_ref(), &proxy, status);
        let _ = self.catch(HEAD, result);
    }

    /// `session.increase_read_bytes` is the head-entry side effect the
    /// event table assigns to `messageReceived` for byte-buffer payloads
    /// (`spec.md` §4.2, §8 invariant 11); it runs once, before the event
    /// ever reaches a filter.
    pub fn fire_message_received(&self, message: IoMessage) {
        if let Some(len) = message.buffer_len() {
            if len > 0 {
                self.inner.session.increase_read_bytes(len as u64, Instant::now());
            }
        }

        let filter = self.filter_at(HEAD);
        let session = Arc::clone(&self.inner.session);
        let proxy = self.proxy(HEAD);
        let result = filter.message_received(session.as_ref(), &proxy, message);
        let _ = self.catch(HEAD, result);
    }

    /// Marks the request's write future written *before* propagation — the
    /// head-entry side effect the event table assigns to `messageSent`
    /// (`spec.md` §4.2).
    pub fn fire_message_sent(&self, mut request: WriteRequest) {
        request.complete_written();

        let filter = self.filter_at(HEAD);
        let session = Arc::clone(&self.inner.session);
        let proxy = self.proxy(HEAD);
        let result = filter.message_sent(session.as_ref(), &proxy, &mut request);
        let _ = self.catch(HEAD, result);
    }

    /// Before propagating to any filter, atomically takes
    /// `AttrKey::SESSION_CREATED_FUTURE`. If it is still present — the
    /// session is still in the connect-pending phase — the exception never
    /// reaches a user filter at all: the chain force-closes the session and
    /// completes the connect future with the cause directly (`spec.md`
    /// §4.2.1). Only when the attribute is absent does the exception enter
    /// at head and walk forward, same as every other inbound event; a
    /// failure from *inside that call* (a filter's `exception_caught` itself
    /// throwing) is logged and swallowed rather than redirected again —
    /// redirecting would just re-enter this same dispatch (`spec.md` §7.5).
    pub fn fire_exception_caught(&self, cause: anyhow::Error) {
        if let Some(attr) = self.inner.session.attributes().take(AttrKey::SESSION_CREATED_FUTURE) {
            self.inner.session.close(true);
            if let Ok(future) = attr.downcast::<ConnectFuture>() {
                future.complete(Err(cause));
            }
            return;
        }

        let filter = self.filter_at(HEAD);
        let session = Arc::clone(&self.inner.session);
        let proxy = self.proxy(HEAD);
        if let Err(e) = filter.exception_caught(session.as_ref(), &proxy, cause) {
            warn!(session_id = self.inner.session.id(), error = %e, "exception_caught itself failed, swallowing");
        }
    }

    /// Outbound: entered at tail, walks toward head. On failure, the
    /// request's future is settled with the cause *before* redirecting to
    /// `fire_exception_caught` (`spec.md` §4.2 "filterWrite additionally
    /// settles the future").
    pub fn fire_filter_write(&self, mut request: WriteRequest) {
        let filter = self.filter_at(TAIL);
        let session = Arc::clone(&self.inner.session);
        let proxy = self.proxy(TAIL);
        let result = filter.filter_write(session.as_ref(), &proxy, &mut request);
        if let Err(cause) = result {
            request.complete_failed(anyhow::anyhow!("{cause}"));
            self.fire_exception_caught(cause);
        }
    }

    /// Outbound: entered at tail, walks toward head.
    pub fn fire_filter_close(&self) {
        let filter = self.filter_at(TAIL);
        let session = Arc::clone(&self.inner.session);
        let proxy = self.proxy(TAIL);
        let result = filter.filter_close(session.as_ref(), &proxy);
        let _ = self.catch(TAIL, result);
    }
}

/// A cheap, owned snapshot of entry names handed to lifecycle hooks —
/// avoids re-entering the structural lock from inside a callback that the
/// lock is already held across (`spec.md` §4.1 `ChainView`).
struct ChainSnapshot {
    session_id: u64,
    names: Vec<String>,
}

impl ChainView for ChainSnapshot {
    fn session_id(&self) -> u64 {
        self.session_id
    }

    fn contains_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    fn entry_names(&self) -> Vec<String> {
        self.names.clone()
    }
}
