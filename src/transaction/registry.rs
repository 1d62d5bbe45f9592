use dashmap::DashMap;
use std::time::Instant;

use super::id::TransactionId;

/// Tracks live transactions and their start times. A transaction becomes
/// live on its first page access and leaves on completion; the recorded
/// start time anchors the lock-acquisition deadlines.
#[derive(Debug, Default)]
pub struct TransactionRegistry {
    live: DashMap<TransactionId, Instant>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self {
            live: DashMap::new(),
        }
    }

    /// Records the transaction as live if it was not already, returning its
    /// start time. Re-registering keeps the original start.
    pub fn register(&self, tid: TransactionId) -> Instant {
        *self.live.entry(tid).or_insert_with(Instant::now)
    }

    pub fn lookup(&self, tid: TransactionId) -> Option<Instant> {
        self.live.get(&tid).map(|entry| *entry.value())
    }

    pub fn forget(&self, tid: TransactionId) {
        self.live.remove(&tid);
    }

    pub fn is_live(&self, tid: TransactionId) -> bool {
        self.live.contains_key(&tid)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_forget() {
        let registry = TransactionRegistry::new();
        let tid = TransactionId::new(1);

        assert!(!registry.is_live(tid));
        registry.register(tid);
        assert!(registry.is_live(tid));
        assert_eq!(registry.len(), 1);

        registry.forget(tid);
        assert!(!registry.is_live(tid));
        assert!(registry.is_empty());
    }

    #[test]
    fn re_register_keeps_the_original_start() {
        let registry = TransactionRegistry::new();
        let tid = TransactionId::new(2);

        let first = registry.register(tid);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = registry.register(tid);
        assert_eq!(first, second);
    }

    #[test]
    fn lookup_misses_for_unknown_transactions() {
        let registry = TransactionRegistry::new();
        assert!(registry.lookup(TransactionId::new(9)).is_none());
    }
}
