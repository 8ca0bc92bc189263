//! `chainio-runtime` — the arena-backed `Chain`, its fixed head/tail
//! filters, and the successor proxy that drives traversal between them.
//!
//! ```text
//! Chain::new(session, HeadFilter, TailFilter)
//!   head ──► user filter ──► user filter ──► … ──► tail ──► Handler
//!   head ◄── user filter ◄── user filter ◄── … ◄── tail   (outbound)
//! ```
//!
//! Everything here implements the contracts `chainio-kernel` defines:
//! `Chain` owns the arena and the name index (`spec.md` §4.1, §4.2),
//! `EntryProxy` implements `Successor` (§4.5), and `HeadFilter`/`TailFilter`
//! implement `Filter` as the two fixed terminals (§4.3, §4.4).

mod chain;
mod entry;
mod head;
mod proxy;
mod tail;

pub use chain::Chain;
pub use entry::EntryId;
pub use head::HeadFilter;
pub use tail::TailFilter;
