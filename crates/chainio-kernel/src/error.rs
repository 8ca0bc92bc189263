//! Crate-level error types for `chainio-kernel`.
//!
//! [`ChainError`] is the synchronous, caller-facing error returned from
//! every mutation on the chain (`spec.md` §7, kind 1 "usage errors" and
//! kind 2 "lifecycle errors"). Event-handler errors (`spec.md` §7, kinds
//! 3–5) are *not* represented here: they are arbitrary `anyhow::Error`
//! values supplied by third-party filters and redirected into
//! `fire_exception_caught` rather than returned to a caller, so they stay
//! untyped at the chain boundary the way `mofa_kernel::error::KernelError`
//! keeps agent/config/io errors typed but lets truly foreign errors in
//! through `Internal(String)`.

use thiserror::Error;

/// Which of the four lifecycle hooks a filter failed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    PreAdd,
    PostAdd,
    PreRemove,
    PostRemove,
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecyclePhase::PreAdd => "on_pre_add",
            LifecyclePhase::PostAdd => "on_post_add",
            LifecyclePhase::PreRemove => "on_pre_remove",
            LifecyclePhase::PostRemove => "on_post_remove",
        };
        f.write_str(s)
    }
}

/// A filter threw from one of its four lifecycle hooks (`spec.md` §7, kind 2).
///
/// Identifies the filter's name, the session it belongs to, and the phase
/// that failed, so the caller (and the logs) can tell exactly where in the
/// add/remove protocol things went wrong.
#[derive(Debug, Error)]
#[error("filter '{filter}' (session {session_id}) failed in {phase}: {source}")]
pub struct LifecycleError {
    pub filter: String,
    pub session_id: u64,
    pub phase: LifecyclePhase,
    #[source]
    pub source: anyhow::Error,
}

/// Synchronous error surfaced directly from a `Chain` mutation call.
///
/// Never produced by event dispatch (`session_created`, `message_received`,
/// …) — those convert filter failures into `fire_exception_caught` instead
/// (`spec.md` §7, kind 3).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChainError {
    /// `add*` was called with a name already present in the index.
    #[error("filter name '{0}' is already registered")]
    DuplicateName(String),

    /// `remove`/`replace`/`get` by name found no matching entry.
    #[error("no filter named '{0}' is registered")]
    UnknownName(String),

    /// `addBefore`/`addAfter` referenced a `baseName` that isn't registered.
    #[error("no filter named '{0}' to anchor the insertion against")]
    UnknownBase(String),

    /// `remove`/`replace` by reference or by predicate matched nothing.
    #[error("no matching filter found")]
    NotFound,

    /// A name was empty or whitespace-only.
    #[error("filter name must not be empty")]
    EmptyName,

    /// A filter failed during `on_pre_add`/`on_post_add`/`on_pre_remove`/
    /// `on_post_remove`.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// `clear()` attempted every removal and is reporting the first failure
    /// it saw (`spec.md` §7, kind 6 — best-effort clear).
    #[error("clear() encountered {count} failure(s); first was: {first}")]
    ClearFailed {
        count: usize,
        #[source]
        first: Box<ChainError>,
    },
}

pub type ChainResult<T> = Result<T, ChainError>;
