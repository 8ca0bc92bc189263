//! Integration tests for `Chain`'s structural API and event routing,
//! covering the quantified invariants and scenarios this crate is built
//! against: ordering after `add*`, duplicate/unknown-name errors,
//! remove/replace by name/reference/type, best-effort `clear`,
//! exception redirection, write-future settlement, the connect-future
//! race, and late-bound successor resolution.

use chainio_kernel::testutil::{FakeSession, RecordingHandler};
use chainio_kernel::{
    AsAny, AttrKey, AttributeMap, ChainError, ConnectFuture, Filter, FilterResult, IdleStatus,
    IoMessage, Session, Successor, WriteRequest,
};
use chainio_runtime::{Chain, HeadFilter, TailFilter};
use std::any::Any;
use std::sync::{Arc, Mutex};

/// Forwards every event, recording its own name into a shared log first.
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Filter for Recorder {
    fn message_received(
        &self,
        session: &dyn Session,
        next: &dyn Successor,
        message: IoMessage,
    ) -> FilterResult {
        self.log.lock().unwrap().push(self.name.to_string());
        next.fire_message_received(session, message)
    }
}

/// Errors on `message_received` so the chain's redirect-to-exception path
/// can be exercised.
struct Bomb;

impl Filter for Bomb {
    fn message_received(
        &self,
        _session: &dyn Session,
        _next: &dyn Successor,
        _message: IoMessage,
    ) -> FilterResult {
        Err(anyhow::anyhow!("bomb"))
    }
}

/// Fails `on_pre_remove` unconditionally, for exercising `clear()`'s
/// best-effort semantics.
struct StubbornOnRemove;
impl Filter for StubbornOnRemove {
    fn on_pre_remove(
        &self,
        _chain: &dyn chainio_kernel::ChainView,
        _name: &str,
    ) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("refuses to leave"))
    }
}

/// A no-op filter, for type-based lookup tests.
#[derive(Default)]
struct Marker;
impl Filter for Marker {}

/// Records every lifecycle hook invoked on it, for `replace`'s
/// no-callback contract.
struct LifecycleLogger {
    log: Arc<Mutex<Vec<String>>>,
}
impl Filter for LifecycleLogger {
    fn on_pre_add(&self, _chain: &dyn chainio_kernel::ChainView, _name: &str) -> anyhow::Result<()> {
        self.log.lock().unwrap().push("on_pre_add".into());
        Ok(())
    }
    fn on_post_add(&self, _chain: &dyn chainio_kernel::ChainView, _name: &str) -> anyhow::Result<()> {
        self.log.lock().unwrap().push("on_post_add".into());
        Ok(())
    }
    fn on_pre_remove(&self, _chain: &dyn chainio_kernel::ChainView, _name: &str) -> anyhow::Result<()> {
        self.log.lock().unwrap().push("on_pre_remove".into());
        Ok(())
    }
    fn on_post_remove(&self, _chain: &dyn chainio_kernel::ChainView, _name: &str) -> anyhow::Result<()> {
        self.log.lock().unwrap().push("on_post_remove".into());
        Ok(())
    }
}

/// Pushes into a shared log if `exception_caught` ever reaches it, then
/// forwards — used to prove a pre-connect exception never reaches a user
/// filter at all.
struct ExceptionSpy {
    log: Arc<Mutex<Vec<String>>>,
}
impl Filter for ExceptionSpy {
    fn exception_caught(
        &self,
        session: &dyn Session,
        next: &dyn Successor,
        cause: anyhow::Error,
    ) -> FilterResult {
        self.log.lock().unwrap().push("spy".into());
        next.fire_exception_caught(session, cause)
    }
}

fn new_chain(handler: Arc<RecordingHandler>) -> (Chain, Arc<FakeSession>) {
    let session = FakeSession::new(1, handler);
    let chain = Chain::new(
        session.clone(),
        Arc::new(HeadFilter::new()),
        Arc::new(TailFilter::new()),
    );
    (chain, session)
}

#[test]
fn add_first_last_before_after_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (chain, session) = new_chain(Arc::new(RecordingHandler::default()));

    chain
        .add_last("b", Arc::new(Recorder { name: "b", log: log.clone() }))
        .unwrap();
    chain
        .add_first("a", Arc::new(Recorder { name: "a", log: log.clone() }))
        .unwrap();
    chain
        .add_before("b", "ab", Arc::new(Recorder { name: "ab", log: log.clone() }))
        .unwrap();
    chain
        .add_after("b", "c", Arc::new(Recorder { name: "c", log: log.clone() }))
        .unwrap();

    let names: Vec<_> = chain.get_all().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["a", "ab", "b", "c"]);

    chain.fire_message_received(IoMessage::buffer(&b""[..]));
    assert_eq!(*log.lock().unwrap(), vec!["a", "ab", "b", "c"]);
    let _ = session;
}

#[test]
fn duplicate_and_unknown_name_errors() {
    let (chain, _session) = new_chain(Arc::new(RecordingHandler::default()));
    chain.add_last("a", Arc::new(Marker)).unwrap();

    assert!(matches!(
        chain.add_last("a", Arc::new(Marker)),
        Err(ChainError::DuplicateName(n)) if n == "a"
    ));
    assert!(matches!(
        chain.remove_by_name("missing"),
        Err(ChainError::UnknownName(n)) if n == "missing"
    ));
    assert!(matches!(
        chain.add_before("missing", "x", Arc::new(Marker)),
        Err(ChainError::UnknownBase(n)) if n == "missing"
    ));
}

#[test]
fn remove_by_name_reference_and_type() {
    let (chain, _session) = new_chain(Arc::new(RecordingHandler::default()));
    let marker: Arc<dyn Filter> = Arc::new(Marker);
    chain.add_last("a", Arc::new(Marker)).unwrap();
    chain.add_last("m", marker.clone()).unwrap();
    chain.add_last("z", Arc::new(Marker)).unwrap();

    chain.remove_by_name("a").unwrap();
    assert!(!chain.contains("a"));

    chain.remove_by_filter(&marker).unwrap();
    assert!(!chain.contains("m"));

    assert!(chain.contains_type::<Marker>());
    chain.remove_by_type::<Marker>().unwrap();
    assert!(!chain.contains("z"));
}

#[test]
fn replace_swaps_filter_in_place_without_lifecycle_callbacks() {
    let (chain, _session) = new_chain(Arc::new(RecordingHandler::default()));
    let log = Arc::new(Mutex::new(Vec::new()));
    chain.add_last("a", Arc::new(Marker)).unwrap();
    chain
        .add_last("b", Arc::new(LifecycleLogger { log: log.clone() }))
        .unwrap();
    chain.add_last("c", Arc::new(Marker)).unwrap();
    log.lock().unwrap().clear(); // drop "b"'s own on_pre_add/on_post_add from the add above

    let new_filter: Arc<dyn Filter> = Arc::new(LifecycleLogger { log: log.clone() });
    chain.replace_by_name("b", new_filter.clone()).unwrap();

    let names: Vec<_> = chain.get_all().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(Arc::ptr_eq(&chain.get("b").unwrap(), &new_filter));
    assert!(
        log.lock().unwrap().is_empty(),
        "replace must not invoke any lifecycle callback on either filter"
    );
}

#[test]
fn clear_is_best_effort_and_reports_first_failure() {
    let (chain, _session) = new_chain(Arc::new(RecordingHandler::default()));
    chain.add_last("a", Arc::new(Marker)).unwrap();
    chain.add_last("stubborn", Arc::new(StubbornOnRemove)).unwrap();
    chain.add_last("c", Arc::new(Marker)).unwrap();

    let result = chain.clear();
    match result {
        Err(ChainError::ClearFailed { count, .. }) => assert_eq!(count, 1),
        other => panic!("expected ClearFailed, got {other:?}"),
    }
    // The two cooperative entries were still removed despite the one that
    // refused (best-effort semantics).
    assert!(!chain.contains("a"));
    assert!(!chain.contains("c"));
    assert!(chain.contains("stubborn"));
}

#[test]
fn exception_from_a_filter_is_redirected_to_the_handler() {
    let handler = Arc::new(RecordingHandler::default());
    let (chain, _session) = new_chain(handler.clone());
    chain.add_last("bomb", Arc::new(Bomb)).unwrap();

    chain.fire_message_received(IoMessage::buffer(&b"x"[..]));

    let calls = handler.calls.lock().unwrap();
    assert!(calls.iter().any(|c| c.starts_with("exception_caught")));
    assert!(!calls.iter().any(|c| c == "message_received"));
}

#[test]
fn session_created_completes_the_connect_future_on_success() {
    let handler = Arc::new(RecordingHandler::default());
    let (chain, session) = new_chain(handler);
    let (future, waiter) = ConnectFuture::new();
    session
        .attributes()
        .set(AttrKey::SESSION_CREATED_FUTURE, future);

    chain.fire_session_created();

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let outcome = rt.block_on(waiter.wait());
    assert!(outcome.is_ok());
}

#[test]
fn session_created_failure_completes_the_connect_future_via_exception_caught() {
    let handler = Arc::new(RecordingHandler::default());
    let (chain, session) = new_chain(handler);
    chain.add_first("bomb", Arc::new(FailOnCreate)).unwrap();
    let (future, waiter) = ConnectFuture::new();
    session
        .attributes()
        .set(AttrKey::SESSION_CREATED_FUTURE, future);

    chain.fire_session_created();

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let outcome = rt.block_on(waiter.wait());
    assert!(outcome.is_err());
}

struct FailOnCreate;
impl Filter for FailOnCreate {
    fn session_created(&self, _session: &dyn Session, _next: &dyn Successor) -> FilterResult {
        Err(anyhow::anyhow!("connect failed"))
    }
}

#[test]
fn filter_write_settles_the_future_and_updates_scheduled_bytes() {
    let (chain, session) = new_chain(Arc::new(RecordingHandler::default()));
    let (request, future) = WriteRequest::new(IoMessage::buffer(&b"hello"[..]));

    chain.fire_filter_write(request);

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let outcome = rt.block_on(future.wait());
    assert!(outcome.is_ok());
    assert_eq!(session.scheduled_write_bytes(), 5);
    assert_eq!(session.flush_count(), 1);
}

#[test]
fn late_bound_successor_sees_entries_inserted_mid_dispatch() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (chain, _session) = new_chain(Arc::new(RecordingHandler::default()));

    struct Inserter {
        chain: Chain,
        log: Arc<Mutex<Vec<String>>>,
    }
    impl Filter for Inserter {
        fn message_received(
            &self,
            session: &dyn Session,
            next: &dyn Successor,
            message: IoMessage,
        ) -> FilterResult {
            self.log.lock().unwrap().push("inserter".into());
            self.chain
                .add_after(
                    "inserter",
                    "late",
                    Arc::new(Recorder { name: "late", log: self.log.clone() }),
                )
                .unwrap();
            next.fire_message_received(session, message)
        }
    }

    chain
        .add_first("inserter", Arc::new(Inserter { chain: chain.clone(), log: log.clone() }))
        .unwrap();

    chain.fire_message_received(IoMessage::buffer(&b""[..]));

    assert_eq!(*log.lock().unwrap(), vec!["inserter", "late"]);
}

#[test]
fn exception_before_connect_force_closes_without_reaching_filters() {
    let handler = Arc::new(RecordingHandler::default());
    let (chain, session) = new_chain(handler.clone());
    let log = Arc::new(Mutex::new(Vec::new()));
    chain
        .add_last("spy", Arc::new(ExceptionSpy { log: log.clone() }))
        .unwrap();
    let (future, waiter) = ConnectFuture::new();
    session
        .attributes()
        .set(AttrKey::SESSION_CREATED_FUTURE, future);

    chain.fire_exception_caught(anyhow::anyhow!("boom"));

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let outcome = rt.block_on(waiter.wait());
    assert!(outcome.is_err());
    assert_eq!(session.close_calls(), vec![true]);
    assert!(
        log.lock().unwrap().is_empty(),
        "no filter's exception_caught should run while the connect future is pending"
    );
    assert!(handler.calls.lock().unwrap().is_empty());
}

#[test]
fn message_received_increments_read_bytes_for_buffer_payload() {
    let (chain, session) = new_chain(Arc::new(RecordingHandler::default()));
    chain.fire_message_received(IoMessage::buffer(&b"hello"[..]));
    assert_eq!(session.read_bytes(), 5);
}

#[test]
fn message_sent_completes_the_write_future_before_dispatch() {
    let (chain, _session) = new_chain(Arc::new(RecordingHandler::default()));
    let (request, future) = WriteRequest::new(IoMessage::buffer(&b"hi"[..]));

    chain.fire_message_sent(request);

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let outcome = rt.block_on(future.wait());
    assert!(outcome.is_ok());
}

#[test]
fn session_closed_runs_finally_steps_after_handler() {
    let handler = Arc::new(RecordingHandler::default());
    let session = FakeSession::new(1, handler.clone()).with_read_operation();
    let chain = Chain::new(
        session.clone(),
        Arc::new(HeadFilter::new()),
        Arc::new(TailFilter::new()),
    );
    chain.add_last("a", Arc::new(Marker)).unwrap();

    chain.fire_session_closed();

    assert!(handler.calls.lock().unwrap().iter().any(|c| c == "session_closed"));
    assert!(session.close_future().is_closed());
    assert!(session.write_queue_disposed());
    assert!(!chain.contains("a"), "sessionClosed must clear the chain");
    assert_eq!(session.closed_read_future_count(), 1);
}

#[test]
fn copy_from_builds_an_independent_chain_without_lifecycle_callbacks() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (source, _session) = new_chain(Arc::new(RecordingHandler::default()));
    source
        .add_last("a", Arc::new(LifecycleLogger { log: log.clone() }))
        .unwrap();
    source.add_last("b", Arc::new(Marker)).unwrap();
    log.lock().unwrap().clear();

    let copy_handler = Arc::new(RecordingHandler::default());
    let copy_session = FakeSession::new(2, copy_handler);
    let copy = Chain::copy_from(
        copy_session,
        Arc::new(HeadFilter::new()),
        Arc::new(TailFilter::new()),
        &source,
    );

    assert!(
        log.lock().unwrap().is_empty(),
        "copy_from must not invoke on_pre_add/on_post_add"
    );
    let copy_names: Vec<_> = copy.get_all().into_iter().map(|(n, _)| n).collect();
    assert_eq!(copy_names, vec!["a", "b"]);

    // The two chains share nothing: removing from one leaves the other intact.
    copy.remove_by_name("a").unwrap();
    assert!(!copy.contains("a"));
    assert!(source.contains("a"));
}

#[test]
fn get_next_filter_and_idle_accounting() {
    let (chain, session) = new_chain(Arc::new(RecordingHandler::default()));
    chain.add_last("a", Arc::new(Marker)).unwrap();
    chain.add_last("b", Arc::new(Marker)).unwrap();

    let next = chain.get_next_filter("a").unwrap();
    assert!(next.unwrap().as_any().is::<Marker>());
    assert!(chain.get_next_filter("b").unwrap().is_none());

    chain.fire_session_idle(IdleStatus::ReaderIdle);
    let handler = session.handler();
    let _ = handler;
}
