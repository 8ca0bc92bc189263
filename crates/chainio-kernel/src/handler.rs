//! The application handler contract invoked from the tail filter
//! (`spec.md` §4.4, §6 "Handler contract (invoked from tail)").

use crate::event::{IdleStatus, IoMessage};
use crate::filter::FilterResult;
use crate::session::Session;

/// Mirrors the six inbound events plus `exception_caught` — `filter_write`
/// and `filter_close` have no handler-side counterpart, since outbound
/// traversal never goes past the tail in the handler direction.
///
/// Every method defaults to a no-op so a handler implementation can
/// override only what it cares about, the same default-adapter shape
/// `Filter` itself uses (`spec.md` §6).
pub trait Handler: Send + Sync {
    fn session_created(&self, session: &dyn Session) -> FilterResult {
        let _ = session;
        Ok(())
    }
    fn session_opened(&self, session: &dyn Session) -> FilterResult {
        let _ = session;
        Ok(())
    }
    fn session_closed(&self, session: &dyn Session) -> FilterResult {
        let _ = session;
        Ok(())
    }
    fn session_idle(&self, session: &dyn Session, status: IdleStatus) -> FilterResult {
        let _ = (session, status);
        Ok(())
    }
    fn message_received(&self, session: &dyn Session, message: IoMessage) -> FilterResult {
        let _ = (session, message);
        Ok(())
    }
    /// Invoked with the message extracted from the write request
    /// (`spec.md` §4.4 `messageSent`).
    fn message_sent(&self, session: &dyn Session, message: IoMessage) -> FilterResult {
        let _ = (session, message);
        Ok(())
    }
    fn exception_caught(&self, session: &dyn Session, cause: anyhow::Error) -> FilterResult {
        let _ = (session, cause);
        Ok(())
    }
}
