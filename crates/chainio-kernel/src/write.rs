//! Write requests and the future a caller uses to learn whether a write
//! landed or failed (`spec.md` §4.3, §7 kind 4, §8 invariant 9).

use crate::event::IoMessage;
use tokio::sync::oneshot;

/// `Ok(())` once the head filter has handed the message to the transport;
/// `Err(cause)` if any filter on the outbound path failed while handling
/// this request.
pub type WriteOutcome = anyhow::Result<()>;

/// A message paired with a one-shot completion the caller can await.
///
/// Constructed by the caller of `fire_filter_write` (outside this crate's
/// concern — the session/application layer); consumed by exactly one of
/// [`WriteRequest::complete_written`] or [`WriteRequest::complete_failed`]
/// somewhere along the outbound path.
pub struct WriteRequest {
    pub message: IoMessage,
    completion: Option<oneshot::Sender<WriteOutcome>>,
}

/// The caller-side half of a [`WriteRequest`].
pub struct WriteFuture(oneshot::Receiver<WriteOutcome>);

impl WriteRequest {
    /// Build a request together with the future its eventual caller awaits.
    pub fn new(message: IoMessage) -> (Self, WriteFuture) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                message,
                completion: Some(tx),
            },
            WriteFuture(rx),
        )
    }

    /// Build a request with no one waiting on completion — used for
    /// internal delimiter writes and tests that don't care about the
    /// outcome.
    pub fn without_future(message: IoMessage) -> Self {
        Self {
            message,
            completion: None,
        }
    }

    /// Settle the future successfully. Idempotent: a second call is a
    /// no-op, since the sender is consumed on first use.
    pub fn complete_written(&mut self) {
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(Ok(()));
        }
    }

    /// Settle the future with a failure cause (`spec.md` §4.2 "filterWrite
    /// additionally settles the request's future with the cause before
    /// redirection").
    pub fn complete_failed(&mut self, cause: anyhow::Error) {
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(Err(cause));
        }
    }

    pub fn message(&self) -> &IoMessage {
        &self.message
    }

    pub fn into_message(self) -> IoMessage {
        self.message
    }
}

impl WriteFuture {
    /// Await the write's outcome. Resolves to an error if the request was
    /// dropped without ever being completed (a filter bug, not a protocol
    /// state this crate can reach on its own).
    pub async fn wait(self) -> WriteOutcome {
        match self.0.await {
            Ok(outcome) => outcome,
            Err(_) => Err(anyhow::anyhow!(
                "write request was dropped without completion"
            )),
        }
    }
}

impl std::fmt::Debug for WriteRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteRequest")
            .field("message", &self.message)
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}
