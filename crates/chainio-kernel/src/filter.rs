//! The filter contract and the successor-proxy contract it is driven
//! through.
//!
//! ```text
//! Inbound   head ──► e1 ──► e2 ──► … ──► tail ──► handler
//! Outbound  head ◄── e1 ◄── e2 ◄── … ◄── tail  (entered at tail)
//! ```
//!
//! A [`Filter`] never reaches for the entry after (or before) it directly —
//! it asks the [`Successor`] handle it was given to continue traversal.
//! `Successor` is deliberately a trait here, not a concrete struct: the
//! object that actually resolves "what's next" is an index into the
//! runtime's arena (`chainio-runtime::proxy::EntryProxy`), and this crate
//! has no business knowing about arenas. Every method on both traits
//! returns [`FilterResult`] instead of throwing — `spec.md` §7 describes a
//! try/catch around each filter call; the Rust analogue is the caller
//! (`chainio-runtime::chain::Chain`) matching on the `Result` each call
//! returns and redirecting `Err` into `fire_exception_caught`.

use crate::event::{IdleStatus, IoMessage};
use crate::session::Session;
use crate::write::WriteRequest;
use std::any::Any;

/// Lets `chainio-runtime` downcast a `dyn Filter` to a concrete type for
/// `remove`/`replace`/`contains` "by type" (`spec.md` §4.1, §9's note on
/// avoiding reflection-style lookup in favor of a tagged discriminator —
/// here a plain `Any` downcast, since Rust's `Any` already *is* the
/// non-reflective tagged-type mechanism the note is asking for).
///
/// Blanket-implemented for every `'static` type — a `Filter` impl never
/// writes this itself.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Result type for every event method on [`Filter`] and [`Successor`].
///
/// The error is an open `anyhow::Error` rather than a fixed enum because
/// filters are third-party: the chain only ever logs it, forwards it to
/// `fire_exception_caught`, or (for `filter_write`) uses it to settle a
/// write future. It never matches on filter-specific variants.
pub type FilterResult = anyhow::Result<()>;

/// Read-only facade over the chain, handed to a filter's lifecycle hooks
/// (`spec.md` §4.1 registration/deregistration protocol).
///
/// Deliberately narrow: a filter inspecting its neighbors during
/// `on_pre_add`/`on_post_add` should not be able to trigger a nested
/// structural mutation from inside the hook that is itself mutating the
/// chain (the reentrant lock would allow it, but the *protocol* does not
/// promise the result is sane), so this view exposes queries only.
pub trait ChainView: Send + Sync {
    /// The session this chain belongs to.
    fn session_id(&self) -> u64;
    /// Whether `name` is currently indexed.
    fn contains_name(&self, name: &str) -> bool;
    /// Snapshot of user-entry names, head→tail order.
    fn entry_names(&self) -> Vec<String>;
}

/// The "next filter" (or "previous filter", for outbound events) handle a
/// filter uses to resume traversal.
///
/// Implementations resolve the next/previous entry **lazily** — by reading
/// the owning entry's current pointer at call time — so a filter that adds
/// or removes entries earlier in the same dispatch changes what later
/// `fire_*` calls in that same dispatch will see (`spec.md` §3 invariant 5,
/// §8 invariant 4).
pub trait Successor: Send + Sync {
    fn fire_session_created(&self, session: &dyn Session) -> FilterResult;
    fn fire_session_opened(&self, session: &dyn Session) -> FilterResult;
    fn fire_session_closed(&self, session: &dyn Session) -> FilterResult;
    fn fire_session_idle(&self, session: &dyn Session, status: IdleStatus) -> FilterResult;
    fn fire_message_received(&self, session: &dyn Session, message: IoMessage) -> FilterResult;
    fn fire_message_sent(&self, session: &dyn Session, request: &mut WriteRequest) -> FilterResult;
    fn fire_exception_caught(&self, session: &dyn Session, cause: anyhow::Error) -> FilterResult;

    /// Outbound: resolves to the *previous* entry.
    fn fire_filter_write(&self, session: &dyn Session, request: &mut WriteRequest) -> FilterResult;
    /// Outbound: resolves to the *previous* entry.
    fn fire_filter_close(&self, session: &dyn Session) -> FilterResult;
}

/// A single filter threaded into a chain.
///
/// Every event method has a default body that simply forwards to `next`
/// (`spec.md` §6 "default-adapter semantics") — a concrete filter overrides
/// only the handful of events it cares about, the way
/// `GatewayFilter::on_response` is a no-op for filters with nothing to do
/// on the response path. The four lifecycle hooks default to `Ok(())`:
/// most filters have no add/remove-time setup.
pub trait Filter: Send + Sync + AsAny {
    fn session_created(&self, session: &dyn Session, next: &dyn Successor) -> FilterResult {
        next.fire_session_created(session)
    }
    fn session_opened(&self, session: &dyn Session, next: &dyn Successor) -> FilterResult {
        next.fire_session_opened(session)
    }
    fn session_closed(&self, session: &dyn Session, next: &dyn Successor) -> FilterResult {
        next.fire_session_closed(session)
    }
    fn session_idle(
        &self,
        session: &dyn Session,
        next: &dyn Successor,
        status: IdleStatus,
    ) -> FilterResult {
        next.fire_session_idle(session, status)
    }
    fn message_received(
        &self,
        session: &dyn Session,
        next: &dyn Successor,
        message: IoMessage,
    ) -> FilterResult {
        next.fire_message_received(session, message)
    }
    fn message_sent(
        &self,
        session: &dyn Session,
        next: &dyn Successor,
        request: &mut WriteRequest,
    ) -> FilterResult {
        next.fire_message_sent(session, request)
    }
    fn exception_caught(
        &self,
        session: &dyn Session,
        next: &dyn Successor,
        cause: anyhow::Error,
    ) -> FilterResult {
        next.fire_exception_caught(session, cause)
    }

    /// Outbound — entered at tail, walks toward head.
    fn filter_write(
        &self,
        session: &dyn Session,
        next: &dyn Successor,
        request: &mut WriteRequest,
    ) -> FilterResult {
        next.fire_filter_write(session, request)
    }
    /// Outbound — entered at tail, walks toward head.
    fn filter_close(&self, session: &dyn Session, next: &dyn Successor) -> FilterResult {
        next.fire_filter_close(session)
    }

    /// Called while the entry is linked provisionally but not yet spliced
    /// in. Failure aborts the add before any pointer or index changes
    /// (`spec.md` §4.1 step 2).
    fn on_pre_add(&self, chain: &dyn ChainView, name: &str) -> anyhow::Result<()> {
        let _ = (chain, name);
        Ok(())
    }
    /// Called after splicing; failure triggers an automatic structural
    /// rollback with no further lifecycle calls (`spec.md` §4.1 step 4).
    fn on_post_add(&self, chain: &dyn ChainView, name: &str) -> anyhow::Result<()> {
        let _ = (chain, name);
        Ok(())
    }
    /// Called while still linked; failure surfaces immediately and leaves
    /// the structure unchanged (`spec.md` §4.1 deregister step 1).
    fn on_pre_remove(&self, chain: &dyn ChainView, name: &str) -> anyhow::Result<()> {
        let _ = (chain, name);
        Ok(())
    }
    /// Called after unsplicing; the filter is already gone from the chain
    /// (`spec.md` §4.1 deregister step 3).
    fn on_post_remove(&self, chain: &dyn ChainView, name: &str) -> anyhow::Result<()> {
        let _ = (chain, name);
        Ok(())
    }
}
