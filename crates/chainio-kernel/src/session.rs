//! The session contract the chain consumes (`spec.md` §6 "Session contract
//! (consumed)"). Everything in this module is an external collaborator:
//! the concrete attribute map, write queue, and processor belong to the
//! transport layer, not to this crate.

use crate::event::{IdleStatus, IoMessage};
use crate::future::{AttrKey, CloseFuture};
use crate::handler::Handler;
use crate::write::WriteRequest;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

/// A value stored in a session's attribute map.
pub type AttrValue = Arc<dyn Any + Send + Sync>;

/// Session-scoped key/value store. Must be safe to read and write from any
/// thread; the chain never assumes it is the only accessor (`spec.md` §5
/// "Shared resources").
pub trait AttributeMap: Send + Sync {
    fn get(&self, key: AttrKey) -> Option<AttrValue>;

    /// Atomically remove and return the value — the primitive the
    /// connect-future race in `spec.md` §4.2.1 needs ("atomically takes
    /// the session attribute").
    fn take(&self, key: AttrKey) -> Option<AttrValue>;

    fn set(&self, key: AttrKey, value: AttrValue);

    /// Drop every stored attribute (`spec.md` §4.4 `sessionClosed`: "then
    /// dispose attribute map").
    fn dispose(&self);
}

/// The session's pending-write queue (`spec.md` §4.3 head filter:
/// "offer the request to the session's write queue").
pub trait WriteQueue: Send + Sync {
    fn offer(&self, request: WriteRequest);

    /// `spec.md` §4.4 `sessionClosed`: "dispose write-request queue".
    fn dispose(&self);
}

/// The transport-facing processor a session is bound to (`spec.md` §4.3).
pub trait Processor: Send + Sync {
    /// Flush queued writes to the transport, unless the session is
    /// write-suspended.
    fn flush(&self, session: &dyn Session);
    /// Tear the session down at the transport level (`spec.md` §4.3
    /// `filterClose`: "invoke processor.remove(session)").
    fn remove(&self, session: &dyn Session);
}

/// Everything the chain needs from the session object that owns it.
///
/// A chain is bound to exactly one session for its lifetime (`spec.md` §3
/// "Chain is created bound to a session"). This trait is the full surface
/// the chain reaches through; it never touches transport I/O directly.
pub trait Session: Send + Sync {
    /// Stable identifier, used only for diagnostics (error messages, log
    /// fields) — never for equality checks inside the chain.
    fn id(&self) -> u64;

    fn attributes(&self) -> &dyn AttributeMap;

    /// The one-shot future marked closed the first time `sessionClosed`
    /// enters the chain (`spec.md` §4.4).
    fn close_future(&self) -> &CloseFuture;

    fn write_queue(&self) -> &dyn WriteQueue;

    fn processor(&self) -> &dyn Processor;

    /// True if the transport has asked writes to pause.
    fn is_write_suspended(&self) -> bool;

    fn increase_idle_count(&self, status: IdleStatus, now: Instant);

    /// Scheduled-write-bytes counter (`spec.md` §4.3): incremented by the
    /// head filter when a non-empty buffer is queued for write.
    fn increase_scheduled_write_bytes(&self, n: u64);

    /// Read-bytes counter (`spec.md` §4.2 `messageReceived` row, §8
    /// invariant 11): incremented once at head entry for buffer messages.
    fn increase_read_bytes(&self, n: u64, now: Instant);

    /// Read-messages counter (`spec.md` §4.4 `messageReceived`, §8
    /// invariant 11): incremented once at tail entry for non-buffer or
    /// empty-buffer messages.
    fn increase_read_messages(&self, n: u64, now: Instant);

    /// Whether this session polls for read operations — gates the three
    /// `offer_*_read_future` calls (`spec.md` §4.4).
    fn is_use_read_operation(&self) -> bool;

    fn handler(&self) -> Arc<dyn Handler>;

    fn offer_read_future(&self, message: IoMessage);
    fn offer_closed_read_future(&self);
    fn offer_failed_read_future(&self, cause: anyhow::Error);

    /// Force-close the session (`spec.md` §4.2.1: "closes the session
    /// (force=true)" on a pre-creation exception).
    fn close(&self, force: bool);
}
