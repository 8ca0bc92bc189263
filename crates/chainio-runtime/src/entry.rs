//! The arena-of-entries representation of the chain's linked structure
//! (`spec.md` §9: "the natural expression is an arena of entries with
//! indices head=0, tail=1, and prev/next indices; this avoids raw pointer
//! hazards and makes mutation-during-traversal safe").

use chainio_kernel::Filter;
use std::sync::Arc;

/// A stable handle to a slot in a `Chain`'s arena.
///
/// `head` is always `EntryId(0)`, `tail` is always `EntryId(1)`
/// (`spec.md` §3 invariant 1). Slots are reused after removal via a free
/// list, so an `EntryId` only stays meaningful for as long as the entry it
/// named has not been replaced by a later `register` — which is exactly
/// the "late-bound" property `spec.md` §3 invariant 5 asks for: a
/// `SuccessorProxy` stores an `EntryId`, not a borrowed reference, and
/// re-resolves through the arena on every `fire_*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) u32);

/// A node in the chain: a name (absent for head/tail), a filter, and the
/// two neighbor pointers.
pub(crate) struct Entry {
    pub name: Option<String>,
    pub filter: Arc<dyn Filter>,
    pub prev: Option<EntryId>,
    pub next: Option<EntryId>,
}

impl Entry {
    pub fn new(name: Option<String>, filter: Arc<dyn Filter>) -> Self {
        Self {
            name,
            filter,
            prev: None,
            next: None,
        }
    }
}
