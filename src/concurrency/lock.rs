use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Lock modes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared lock for read operations.
    Shared,
    /// Exclusive lock for write operations.
    Exclusive,
}

/// The four lock tables. Kept flat and cross-indexed: page-keyed maps
/// answer "who holds this page", transaction-keyed sets answer "what does
/// this transaction hold". All four are updated together under one mutex.
#[derive(Debug, Default)]
struct LockState {
    readers: HashMap<PageId, HashSet<TransactionId>>,
    writer: HashMap<PageId, TransactionId>,
    held_shared: HashMap<TransactionId, HashSet<PageId>>,
    held_exclusive: HashMap<TransactionId, HashSet<PageId>>,
}

/// Page-granularity S/X lock manager.
///
/// Grant rules are the classic compatibility matrix with self-upgrade: a
/// transaction that already holds the shared lock on a page may take the
/// exclusive lock without releasing it first, as long as no other reader
/// remains.
#[derive(Debug, Default)]
pub struct LockManager {
    state: Mutex<LockState>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to grant `mode` on `pid` to `tid` without blocking.
    /// Returns whether the lock was granted.
    pub fn try_grant(&self, pid: PageId, tid: TransactionId, mode: LockMode) -> bool {
        let mut state = self.state.lock();
        match mode {
            LockMode::Shared => {
                if matches!(state.writer.get(&pid), Some(writer) if *writer != tid) {
                    return false;
                }
                state.readers.entry(pid).or_default().insert(tid);
                state.held_shared.entry(tid).or_default().insert(pid);
                true
            }
            LockMode::Exclusive => {
                let no_other_reader = state
                    .readers
                    .get(&pid)
                    .map_or(true, |readers| readers.iter().all(|r| *r == tid));
                let no_other_writer =
                    state.writer.get(&pid).map_or(true, |writer| *writer == tid);
                if !(no_other_reader && no_other_writer) {
                    return false;
                }
                state.writer.insert(pid, tid);
                state.held_exclusive.entry(tid).or_default().insert(pid);
                true
            }
        }
    }

    /// True iff `tid` holds any lock on `pid`.
    pub fn holds(&self, tid: TransactionId, pid: PageId) -> bool {
        let state = self.state.lock();
        state
            .readers
            .get(&pid)
            .map_or(false, |readers| readers.contains(&tid))
            || state.writer.get(&pid) == Some(&tid)
    }

    /// Releases whatever `tid` holds on `pid` (shared, exclusive, or both).
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let mut state = self.state.lock();
        if let Some(readers) = state.readers.get_mut(&pid) {
            readers.remove(&tid);
            if readers.is_empty() {
                state.readers.remove(&pid);
            }
        }
        if state.writer.get(&pid) == Some(&tid) {
            state.writer.remove(&pid);
        }
        if let Some(pages) = state.held_shared.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                state.held_shared.remove(&tid);
            }
        }
        if let Some(pages) = state.held_exclusive.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                state.held_exclusive.remove(&tid);
            }
        }
    }

    /// Releases every lock held by `tid`.
    pub fn release_all(&self, tid: TransactionId) {
        let mut state = self.state.lock();
        if let Some(pages) = state.held_exclusive.remove(&tid) {
            for pid in pages {
                if state.writer.get(&pid) == Some(&tid) {
                    state.writer.remove(&pid);
                }
            }
        }
        if let Some(pages) = state.held_shared.remove(&tid) {
            for pid in pages {
                if let Some(readers) = state.readers.get_mut(&pid) {
                    readers.remove(&tid);
                    if readers.is_empty() {
                        state.readers.remove(&pid);
                    }
                }
            }
        }
    }

    /// Transactions currently holding the shared lock on `pid`.
    pub fn shared_holders(&self, pid: PageId) -> HashSet<TransactionId> {
        self.state
            .lock()
            .readers
            .get(&pid)
            .cloned()
            .unwrap_or_default()
    }

    /// The transaction currently holding the exclusive lock on `pid`.
    pub fn writer_of(&self, pid: PageId) -> Option<TransactionId> {
        self.state.lock().writer.get(&pid).copied()
    }
}
