//! The fixed head filter (`spec.md` §4.3) — the outbound terminal. Every
//! `filterWrite`/`filterClose` that isn't intercepted by a user filter ends
//! up here, where it meets the real session.

use chainio_kernel::{Filter, FilterResult, Session, Successor, WriteRequest};

/// Stateless — all the bookkeeping it performs (write-byte accounting,
/// flush gating) reads and writes through the [`Session`] it's given, not
/// through any field of its own.
#[derive(Default)]
pub struct HeadFilter;

impl HeadFilter {
    pub fn new() -> Self {
        Self
    }
}

impl Filter for HeadFilter {
    fn filter_write(
        &self,
        session: &dyn Session,
        _next: &dyn Successor,
        request: &mut WriteRequest,
    ) -> FilterResult {
        // Zero-length buffers are internal delimiters, not payload — they
        // don't count toward scheduled-write-bytes (`spec.md` §4.3).
        if let Some(len) = request.message().buffer_len() {
            if len > 0 {
                session.increase_scheduled_write_bytes(len as u64);
            }
        }
        session
            .write_queue()
            .offer(WriteRequest::without_future(request.message().clone()));
        request.complete_written();

        if !session.is_write_suspended() {
            session.processor().flush(session);
        }
        Ok(())
    }

    fn filter_close(&self, session: &dyn Session, _next: &dyn Successor) -> FilterResult {
        session.processor().remove(session);
        Ok(())
    }

    // Inbound events never naturally reach the head filter in ordinary
    // traversal — it is entered only as the outbound terminal — so no
    // inbound method is overridden; the default forward-to-next bodies are
    // unreachable here in practice.
}
