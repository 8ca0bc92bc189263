//! The successor proxy a filter uses to continue traversal (`spec.md` §4.5).
//!
//! `EntryProxy` holds only a [`Chain`] handle and the [`EntryId`] of the
//! entry it was handed to — never a borrowed reference to the neighbor it
//! will call. Every `fire_*` re-reads the live `prev`/`next` pointer from
//! the chain's arena at call time, so a structural mutation earlier in the
//! same dispatch (an `on_post_add`/`on_pre_remove` callback, or a filter
//! adding/removing an entry while handling the event itself) is visible to
//! every later hop of that same dispatch (`spec.md` §3 invariant 5, §8
//! invariant 4).

use crate::chain::Chain;
use crate::entry::EntryId;
use chainio_kernel::{Filter, FilterResult, IdleStatus, IoMessage, Session, Successor, WriteRequest};

pub(crate) struct EntryProxy {
    chain: Chain,
    at: EntryId,
}

impl EntryProxy {
    pub(crate) fn new(chain: Chain, at: EntryId) -> Self {
        Self { chain, at }
    }

    fn forward(&self) -> Option<EntryId> {
        self.chain.next_of(self.at)
    }

    fn backward(&self) -> Option<EntryId> {
        self.chain.prev_of(self.at)
    }
}

impl Successor for EntryProxy {
    fn fire_session_created(&self, session: &dyn Session) -> FilterResult {
        let Some(next) = self.forward() else {
            return Ok(());
        };
        let filter = self.chain.filter_at(next);
        let proxy = EntryProxy::new(self.chain.clone(), next);
        filter.session_created(session, &proxy)
    }

    fn fire_session_opened(&self, session: &dyn Session) -> FilterResult {
        let Some(next) = self.forward() else {
            return Ok(());
        };
        let filter = self.chain.filter_at(next);
        let proxy = EntryProxy::new(self.chain.clone(), next);
        filter.session_opened(session, &proxy)
    }

    fn fire_session_closed(&self, session: &dyn Session) -> FilterResult {
        let Some(next) = self.forward() else {
            return Ok(());
        };
        let filter = self.chain.filter_at(next);
        let proxy = EntryProxy::new(self.chain.clone(), next);
        filter.session_closed(session, &proxy)
    }

    fn fire_session_idle(&self, session: &dyn Session, status: IdleStatus) -> FilterResult {
        let Some(next) = self.forward() else {
            return Ok(());
        };
        let filter = self.chain.filter_at(next);
        let proxy = EntryProxy::new(self.chain.clone(), next);
        filter.session_idle(session, &proxy, status)
    }

    fn fire_message_received(&self, session: &dyn Session, message: IoMessage) -> FilterResult {
        let Some(next) = self.forward() else {
            return Ok(());
        };
        let filter = self.chain.filter_at(next);
        let proxy = EntryProxy::new(self.chain.clone(), next);
        filter.message_received(session, &proxy, message)
    }

    fn fire_message_sent(&self, session: &dyn Session, request: &mut WriteRequest) -> FilterResult {
        let Some(next) = self.forward() else {
            return Ok(());
        };
        let filter = self.chain.filter_at(next);
        let proxy = EntryProxy::new(self.chain.clone(), next);
        filter.message_sent(session, &proxy, request)
    }

    fn fire_exception_caught(&self, session: &dyn Session, cause: anyhow::Error) -> FilterResult {
        let Some(next) = self.forward() else {
            return Ok(());
        };
        let filter = self.chain.filter_at(next);
        let proxy = EntryProxy::new(self.chain.clone(), next);
        filter.exception_caught(session, &proxy, cause)
    }

    fn fire_filter_write(&self, session: &dyn Session, request: &mut WriteRequest) -> FilterResult {
        let Some(prev) = self.backward() else {
            return Ok(());
        };
        let filter = self.chain.filter_at(prev);
        let proxy = EntryProxy::new(self.chain.clone(), prev);
        filter.filter_write(session, &proxy, request)
    }

    fn fire_filter_close(&self, session: &dyn Session) -> FilterResult {
        let Some(prev) = self.backward() else {
            return Ok(());
        };
        let filter = self.chain.filter_at(prev);
        let proxy = EntryProxy::new(self.chain.clone(), prev);
        filter.filter_close(session, &proxy)
    }
}
