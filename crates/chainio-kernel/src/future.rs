//! Session-scoped completion futures: the connect future and the close
//! future (`spec.md` §4.2.1, §4.2.2, §6 "Connect-future attribute key").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Notify};

/// A stable attribute-map key.
///
/// Modeled as a thin wrapper over `&'static str` rather than a bare string
/// so callers can't typo the connect-future key — `AttrKey::SESSION_CREATED_FUTURE`
/// is the one constant every session implementation and every chain agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrKey(&'static str);

impl AttrKey {
    pub const fn new(name: &'static str) -> Self {
        AttrKey(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }

    /// The process-wide key under which the pending [`ConnectFuture`] is
    /// stashed until the first `session_created` succeeds or an exception
    /// arrives first (`spec.md` §4.2.1, §6).
    pub const SESSION_CREATED_FUTURE: AttrKey = AttrKey::new("chainio.session_created_future");
}

/// `Ok(())` on a successful first `session_created`; `Err(cause)` if
/// `exception_caught` ran before the session ever finished creating
/// (`spec.md` §8 invariant 10).
pub type ConnectOutcome = anyhow::Result<()>;

/// Completed exactly once, by whichever of §4.2.1 / §4.2.2 wins the race.
pub struct ConnectFuture {
    sender: std::sync::Mutex<Option<oneshot::Sender<ConnectOutcome>>>,
}

pub struct ConnectWaiter(oneshot::Receiver<ConnectOutcome>);

impl ConnectFuture {
    pub fn new() -> (Arc<Self>, ConnectWaiter) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                sender: std::sync::Mutex::new(Some(tx)),
            }),
            ConnectWaiter(rx),
        )
    }

    /// Settle the future. A second call (the future having already been
    /// taken out of the attribute map by whichever path won) is a silent
    /// no-op rather than a panic — harmless double-completion is cheaper
    /// to tolerate than to make unreachable.
    pub fn complete(&self, outcome: ConnectOutcome) {
        if let Some(tx) = self.sender.lock().unwrap().take() {
            let _ = tx.send(outcome);
        }
    }
}

impl ConnectWaiter {
    pub async fn wait(self) -> ConnectOutcome {
        match self.0.await {
            Ok(outcome) => outcome,
            Err(_) => Err(anyhow::anyhow!(
                "connect future dropped without completion"
            )),
        }
    }
}

/// Marked closed exactly once when `session_closed` first enters the chain
/// (`spec.md` §4.2 row `sessionClosed`).
///
/// `mark_closed` returns a `Result` — in the Java original, marking the
/// close future complete can run attached listener callbacks that throw,
/// which is why `spec.md` calls for the failure to be "exception-swallowed
/// into fire_exception_caught". `tokio::sync::Notify` has no listener
/// callbacks to throw, so this port's `mark_closed` is infallible in
/// practice; the `Result` return and the call-site swallow are kept so the
/// shape of the dispatch code matches the spec's error-handling discipline
/// and so a future listener mechanism could plug in without changing the
/// call site (see `DESIGN.md`).
pub struct CloseFuture {
    closed: AtomicBool,
    notify: Notify,
}

impl Default for CloseFuture {
    fn default() -> Self {
        Self::new()
    }
}

impl CloseFuture {
    pub fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn mark_closed(&self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        while !self.is_closed() {
            self.notify.notified().await;
        }
    }
}
