//! Event vocabulary shared by every filter in a chain.
//!
//! The chain mediates exactly eight events (`spec.md` §2): six inbound
//! (`session_created`, `session_opened`, `session_closed`, `session_idle`,
//! `message_received`, `message_sent`, `exception_caught` — that is seven,
//! plus the two outbound `filter_write`/`filter_close`). This module defines
//! the payload types those events carry; the trait methods themselves live
//! in [`crate::filter`].

use bytes::Bytes;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A message flowing through the chain in either direction.
///
/// Several event handlers (`spec.md` §4.2, §4.3, §4.4) special-case the
/// "message is a byte buffer" condition — for read-byte accounting, for
/// read-message accounting, and for write-byte accounting. `IoMessage`
/// makes that distinction a cheap pattern match instead of runtime type
/// introspection (`spec.md` §9 flags reflection-style lookups as a pattern
/// to avoid).
#[derive(Clone)]
pub enum IoMessage {
    /// A raw byte buffer — read/write byte counters only fire for this
    /// variant.
    Buffer(Bytes),
    /// Any other application-level message (a decoded protocol object,
    /// typically produced by an upstream codec filter).
    Object(Arc<dyn Any + Send + Sync>),
}

impl IoMessage {
    /// Wrap a byte buffer.
    pub fn buffer(bytes: impl Into<Bytes>) -> Self {
        IoMessage::Buffer(bytes.into())
    }

    /// Wrap an arbitrary application object.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        IoMessage::Object(Arc::new(value))
    }

    /// `Some(len)` iff this is a buffer, where `len` is the remaining byte
    /// count — used by read-byte / write-byte accounting (`spec.md` §4.2,
    /// §4.3).
    pub fn buffer_len(&self) -> Option<usize> {
        match self {
            IoMessage::Buffer(b) => Some(b.len()),
            IoMessage::Object(_) => None,
        }
    }

    /// True for a zero-length buffer, which `spec.md` §4.3 treats as an
    /// internal delimiter rather than real payload.
    pub fn is_empty_buffer(&self) -> bool {
        matches!(self, IoMessage::Buffer(b) if b.is_empty())
    }

    /// True for anything that is *not* a non-empty buffer — the condition
    /// `spec.md` §4.4 uses to decide whether `message_received` increments
    /// the read-messages counter.
    pub fn counts_as_message(&self) -> bool {
        match self {
            IoMessage::Buffer(b) => b.is_empty(),
            IoMessage::Object(_) => true,
        }
    }

    /// Downcast an `Object` payload.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            IoMessage::Object(obj) => obj.downcast_ref::<T>(),
            IoMessage::Buffer(_) => None,
        }
    }
}

impl fmt::Debug for IoMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoMessage::Buffer(b) => f.debug_tuple("Buffer").field(&b.len()).finish(),
            IoMessage::Object(_) => f.write_str("Object(..)"),
        }
    }
}

/// Reason a `session_idle` event fired (`spec.md` §4.2 row `sessionIdle`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdleStatus {
    /// No data has been read for the configured idle interval.
    ReaderIdle,
    /// No data has been written for the configured idle interval.
    WriterIdle,
    /// Neither reads nor writes have occurred for the configured interval.
    BothIdle,
}
