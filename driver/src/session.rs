//! Open sessions: which open handle refers to which target.
//!
//! A session only borrows its target through a [HandleRef]; closing a session or losing the target
//! never transfers ownership.

use alloc::collections::btree_map::BTreeMap;
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::RwLock;
use utils::{handle::HandleRef, impl_basic, impl_hex_fmt};

/// Opaque handle of one open session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId {
    inner: usize,
}
impl_basic!(SessionId, usize);
impl_hex_fmt!(SessionId);

pub struct SessionTable<T> {
    next: AtomicUsize,
    open: RwLock<BTreeMap<SessionId, HandleRef<T>>>,
}

impl<T> Default for SessionTable<T> {
    fn default() -> Self {
        SessionTable::new()
    }
}

impl<T> SessionTable<T> {
    pub const fn new() -> SessionTable<T> {
        SessionTable {
            next: AtomicUsize::new(1),
            open: RwLock::new(BTreeMap::new()),
        }
    }

    /// Attach `target` to a fresh session.
    pub fn open(&self, target: HandleRef<T>) -> SessionId {
        let id = SessionId::from(self.next.fetch_add(1, Ordering::Relaxed));
        self.open.write().insert(id, target);
        id
    }

    pub fn get(&self, id: SessionId) -> Option<HandleRef<T>> {
        self.open.read().get(&id).cloned()
    }

    /// Forget the session. Return whether it was open.
    pub fn close(&self, id: SessionId) -> bool {
        self.open.write().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.open.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.read().is_empty()
    }
}
