//! The fixed tail filter (`spec.md` §4.4) — the inbound terminal. Every
//! event that walks forward without being stopped by a user filter ends up
//! here, where it is handed to the application [`Handler`].

use chainio_kernel::{
    AttrKey, ConnectFuture, Filter, FilterResult, Handler, IdleStatus, IoMessage, Session,
    Successor, WriteRequest,
};
use std::time::Instant;

/// Stateless, same as [`crate::head::HeadFilter`] — everything it touches
/// belongs to the [`Session`] it's handed.
#[derive(Default)]
pub struct TailFilter;

impl TailFilter {
    pub fn new() -> Self {
        Self
    }
}

impl Filter for TailFilter {
    /// Completes the pending connect future with `Ok(())` on success
    /// (`spec.md` §4.2.2). A failing handler is *not* handled here: the
    /// error propagates up to `Chain::fire_session_created`'s catch, which
    /// redirects into `exception_caught` — and it is `exception_caught`,
    /// not this method, that completes the future with the failure
    /// (`spec.md` §4.2.1, "whichever of the two wins the race").
    fn session_created(&self, session: &dyn Session, _next: &dyn Successor) -> FilterResult {
        let result = session.handler().session_created(session);
        if result.is_ok() {
            complete_connect_future(session, Ok(()));
        }
        result
    }

    fn session_opened(&self, session: &dyn Session, _next: &dyn Successor) -> FilterResult {
        session.handler().session_opened(session)
    }

    /// Just the handler call. The close-future mark, and the four
    /// fault-tolerant finally-steps (dispose write queue, dispose
    /// attributes, clear the chain, offer a closed read future), both run
    /// in `Chain::fire_session_closed` — the mark before this method is ever
    /// reached, the finally-steps after it returns, since clearing the
    /// chain is a structural operation only `Chain` can perform
    /// (`spec.md` §4.4).
    fn session_closed(&self, session: &dyn Session, _next: &dyn Successor) -> FilterResult {
        session.handler().session_closed(session)
    }

    /// `Chain::fire_session_idle` already ran `increase_idle_count` before
    /// this method was reached (`spec.md` §4.2 head-entry side effect);
    /// this is just the plain delegation (`spec.md` §4.4).
    fn session_idle(
        &self,
        session: &dyn Session,
        _next: &dyn Successor,
        status: IdleStatus,
    ) -> FilterResult {
        session.handler().session_idle(session, status)
    }

    /// Increments the read-messages counter for anything that isn't a
    /// non-empty buffer (`spec.md` §4.4, §8 invariant 11), offers the
    /// message to the session's read-future queue when the session polls
    /// for reads, then hands it to the handler.
    fn message_received(
        &self,
        session: &dyn Session,
        _next: &dyn Successor,
        message: IoMessage,
    ) -> FilterResult {
        if message.counts_as_message() {
            session.increase_read_messages(1, Instant::now());
        }
        if session.is_use_read_operation() {
            session.offer_read_future(message.clone());
        }
        session.handler().message_received(session, message)
    }

    /// Extracts the message from the write request and hands just that to
    /// the handler (`spec.md` §4.4 `messageSent`: "invoke handler with
    /// message extracted from write request").
    fn message_sent(
        &self,
        session: &dyn Session,
        _next: &dyn Successor,
        request: &mut WriteRequest,
    ) -> FilterResult {
        session.handler().message_sent(session, request.message().clone())
    }

    /// By the time an `exceptionCaught` reaches the tail, `Chain::
    /// fire_exception_caught` has already ruled out the connect-pending
    /// case (`spec.md` §4.2.1) — there is nothing left to steal here. Offers
    /// a failed read future when the session polls for reads, then invokes
    /// the handler (`spec.md` §4.4).
    fn exception_caught(
        &self,
        session: &dyn Session,
        _next: &dyn Successor,
        cause: anyhow::Error,
    ) -> FilterResult {
        if session.is_use_read_operation() {
            session.offer_failed_read_future(anyhow::anyhow!("{cause}"));
        }
        session.handler().exception_caught(session, cause)
    }
}

/// Atomically takes `AttrKey::SESSION_CREATED_FUTURE` out of the session's
/// attribute map and completes it, if it's still there. The other half of
/// the race — an exception arriving before `sessionCreated` ever succeeds —
/// is decided in `Chain::fire_exception_caught`, which takes the same
/// attribute before this filter is ever reached; whichever path takes it
/// first wins, the other finds it already gone and does nothing
/// (`spec.md` §4.2.1, §8 invariant 10).
fn complete_connect_future(session: &dyn Session, outcome: anyhow::Result<()>) {
    let Some(attr) = session.attributes().take(AttrKey::SESSION_CREATED_FUTURE) else {
        return;
    };
    if let Ok(future) = attr.downcast::<ConnectFuture>() {
        future.complete(outcome);
    }
}
