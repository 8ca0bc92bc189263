//! Kernel contract for `chainio` — the trait/type vocabulary a bidirectional
//! I/O filter chain is built from.
//!
//! This crate defines interfaces only: [`Filter`], [`Successor`],
//! [`Handler`], [`Session`] and its collaborators, the event payload types,
//! and the error types a chain's mutation API returns. The chain itself —
//! the arena, the name index, the registration protocol, the two terminal
//! filters — lives in `chainio-runtime`, which depends on this crate the
//! way `mofa-gateway` depends on `mofa_kernel::gateway`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 chainio-kernel  (this crate)                 │
//! │  Filter / Successor / ChainView   Handler                    │
//! │  Session / AttributeMap / WriteQueue / Processor              │
//! │  IoMessage / IdleStatus   WriteRequest / WriteFuture           │
//! │  ConnectFuture / CloseFuture / AttrKey   ChainError            │
//! └───────────────────────────┬────────────────────────────────────┘
//!                             │ depends on
//! ┌───────────────────────────▼────────────────────────────────────┐
//! │                 chainio-runtime  (runtime crate)              │
//! │  Chain  (arena + name index + event routing)                  │
//! │  Entry / EntryProxy (impl Successor)                            │
//! │  HeadFilter / TailFilter (impl Filter)                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod event;
pub mod filter;
pub mod future;
pub mod handler;
pub mod session;
pub mod write;

#[cfg(feature = "test-util")]
pub mod testutil;

pub use error::{ChainError, ChainResult, LifecycleError, LifecyclePhase};
pub use event::{IdleStatus, IoMessage};
pub use filter::{AsAny, ChainView, Filter, FilterResult, Successor};
pub use future::{AttrKey, CloseFuture, ConnectFuture, ConnectOutcome, ConnectWaiter};
pub use handler::Handler;
pub use session::{AttrValue, AttributeMap, Processor, Session, WriteQueue};
pub use write::{WriteFuture, WriteOutcome, WriteRequest};
