//! In-memory fakes for `Session`, its collaborators, and `Handler`.
//!
//! Gated behind the `test-util` feature (on by default) so
//! `chainio-runtime`'s own test suite — and any downstream crate testing
//! its own filters — can exercise a real `Chain` without standing up an
//! actual transport, mirroring how `mofa-gateway`'s tests build a bare
//! `GatewayContext` (see `filter/auth.rs`'s `fn ctx(...)` helper) instead
//! of a live HTTP connection.

use crate::event::{IdleStatus, IoMessage};
use crate::future::{AttrKey, CloseFuture};
use crate::handler::Handler;
use crate::session::{AttrValue, AttributeMap, Processor, Session, WriteQueue};
use crate::write::WriteRequest;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A plain `HashMap`-backed attribute map guarded by a mutex.
#[derive(Default)]
pub struct MapAttributeMap {
    inner: Mutex<HashMap<&'static str, AttrValue>>,
}

impl AttributeMap for MapAttributeMap {
    fn get(&self, key: AttrKey) -> Option<AttrValue> {
        self.inner.lock().get(key.name()).cloned()
    }

    fn take(&self, key: AttrKey) -> Option<AttrValue> {
        self.inner.lock().remove(key.name())
    }

    fn set(&self, key: AttrKey, value: AttrValue) {
        self.inner.lock().insert(key.name(), value);
    }

    fn dispose(&self) {
        self.inner.lock().clear();
    }
}

/// Records offered writes instead of handing them to any transport.
#[derive(Default)]
pub struct RecordingWriteQueue {
    pub offered: Mutex<Vec<IoMessage>>,
    pub disposed: AtomicBool,
}

impl WriteQueue for RecordingWriteQueue {
    fn offer(&self, mut request: WriteRequest) {
        self.offered.lock().push(request.message().clone());
        request.complete_written();
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

/// Counts `flush`/`remove` calls instead of driving a real transport.
#[derive(Default)]
pub struct RecordingProcessor {
    pub flush_count: AtomicU64,
    pub remove_count: AtomicU64,
}

impl Processor for RecordingProcessor {
    fn flush(&self, _session: &dyn Session) {
        self.flush_count.fetch_add(1, Ordering::SeqCst);
    }

    fn remove(&self, _session: &dyn Session) {
        self.remove_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// A handler that records every call it receives, for assertions.
#[derive(Default)]
pub struct RecordingHandler {
    pub calls: Mutex<Vec<String>>,
}

impl Handler for RecordingHandler {
    fn session_created(&self, _session: &dyn Session) -> crate::filter::FilterResult {
        self.calls.lock().push("session_created".into());
        Ok(())
    }
    fn session_opened(&self, _session: &dyn Session) -> crate::filter::FilterResult {
        self.calls.lock().push("session_opened".into());
        Ok(())
    }
    fn session_closed(&self, _session: &dyn Session) -> crate::filter::FilterResult {
        self.calls.lock().push("session_closed".into());
        Ok(())
    }
    fn session_idle(
        &self,
        _session: &dyn Session,
        status: IdleStatus,
    ) -> crate::filter::FilterResult {
        self.calls.lock().push(format!("session_idle({status:?})"));
        Ok(())
    }
    fn message_received(
        &self,
        _session: &dyn Session,
        _message: IoMessage,
    ) -> crate::filter::FilterResult {
        self.calls.lock().push("message_received".into());
        Ok(())
    }
    fn message_sent(
        &self,
        _session: &dyn Session,
        _message: IoMessage,
    ) -> crate::filter::FilterResult {
        self.calls.lock().push("message_sent".into());
        Ok(())
    }
    fn exception_caught(
        &self,
        _session: &dyn Session,
        cause: anyhow::Error,
    ) -> crate::filter::FilterResult {
        self.calls.lock().push(format!("exception_caught({cause})"));
        Ok(())
    }
}

/// A minimal, fully in-memory `Session`.
pub struct FakeSession {
    id: u64,
    attributes: MapAttributeMap,
    close_future: CloseFuture,
    write_queue: RecordingWriteQueue,
    processor: RecordingProcessor,
    write_suspended: AtomicBool,
    use_read_operation: bool,
    handler: Arc<dyn Handler>,
    idle_counts: Mutex<Vec<IdleStatus>>,
    scheduled_write_bytes: AtomicU64,
    read_bytes: AtomicU64,
    read_messages: AtomicU64,
    read_futures: Mutex<Vec<IoMessage>>,
    closed_read_futures: AtomicU64,
    failed_read_futures: Mutex<Vec<String>>,
    close_calls: Mutex<Vec<bool>>,
}

impl FakeSession {
    pub fn new(id: u64, handler: Arc<dyn Handler>) -> Arc<Self> {
        Arc::new(Self {
            id,
            attributes: MapAttributeMap::default(),
            close_future: CloseFuture::new(),
            write_queue: RecordingWriteQueue::default(),
            processor: RecordingProcessor::default(),
            write_suspended: AtomicBool::new(false),
            use_read_operation: false,
            handler,
            idle_counts: Mutex::new(Vec::new()),
            scheduled_write_bytes: AtomicU64::new(0),
            read_bytes: AtomicU64::new(0),
            read_messages: AtomicU64::new(0),
            read_futures: Mutex::new(Vec::new()),
            closed_read_futures: AtomicU64::new(0),
            failed_read_futures: Mutex::new(Vec::new()),
            close_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_read_operation(mut self: Arc<Self>) -> Arc<Self> {
        Arc::get_mut(&mut self).unwrap().use_read_operation = true;
        self
    }

    pub fn scheduled_write_bytes(&self) -> u64 {
        self.scheduled_write_bytes.load(Ordering::SeqCst)
    }

    pub fn read_bytes(&self) -> u64 {
        self.read_bytes.load(Ordering::SeqCst)
    }

    pub fn read_messages(&self) -> u64 {
        self.read_messages.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> Vec<bool> {
        self.close_calls.lock().clone()
    }

    pub fn closed_read_future_count(&self) -> u64 {
        self.closed_read_futures.load(Ordering::SeqCst)
    }

    pub fn set_write_suspended(&self, suspended: bool) {
        self.write_suspended.store(suspended, Ordering::SeqCst);
    }

    pub fn flush_count(&self) -> u64 {
        self.processor.flush_count.load(Ordering::SeqCst)
    }

    pub fn write_queue_disposed(&self) -> bool {
        self.write_queue.disposed.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> u64 {
        self.processor.remove_count.load(Ordering::SeqCst)
    }
}

impl Session for FakeSession {
    fn id(&self) -> u64 {
        self.id
    }

    fn attributes(&self) -> &dyn AttributeMap {
        &self.attributes
    }

    fn close_future(&self) -> &CloseFuture {
        &self.close_future
    }

    fn write_queue(&self) -> &dyn WriteQueue {
        &self.write_queue
    }

    fn processor(&self) -> &dyn Processor {
        &self.processor
    }

    fn is_write_suspended(&self) -> bool {
        self.write_suspended.load(Ordering::SeqCst)
    }

    fn increase_idle_count(&self, status: IdleStatus, _now: Instant) {
        self.idle_counts.lock().push(status);
    }

    fn increase_scheduled_write_bytes(&self, n: u64) {
        self.scheduled_write_bytes.fetch_add(n, Ordering::SeqCst);
    }

    fn increase_read_bytes(&self, n: u64, _now: Instant) {
        self.read_bytes.fetch_add(n, Ordering::SeqCst);
    }

    fn increase_read_messages(&self, n: u64, _now: Instant) {
        self.read_messages.fetch_add(n, Ordering::SeqCst);
    }

    fn is_use_read_operation(&self) -> bool {
        self.use_read_operation
    }

    fn handler(&self) -> Arc<dyn Handler> {
        Arc::clone(&self.handler)
    }

    fn offer_read_future(&self, message: IoMessage) {
        self.read_futures.lock().push(message);
    }

    fn offer_closed_read_future(&self) {
        self.closed_read_futures.fetch_add(1, Ordering::SeqCst);
    }

    fn offer_failed_read_future(&self, cause: anyhow::Error) {
        self.failed_read_futures.lock().push(cause.to_string());
    }

    fn close(&self, force: bool) {
        self.close_calls.lock().push(force);
    }
}
