use super::lock::{LockManager, LockMode};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::transaction::{TransactionId, TransactionRegistry};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Deadlines and retry cadence for blocking lock acquisition.
///
/// A transaction blocking on its very first acquisition is cheap to restart,
/// so it gives up quickly but polls lazily; a transaction that already holds
/// work gets more latitude and polls tightly. Both deadlines are measured
/// from the transaction's recorded start time, not from the current
/// acquisition attempt.
#[derive(Debug, Clone, Copy)]
pub struct LockTimeouts {
    pub first_deadline: Duration,
    pub running_deadline: Duration,
    pub first_retry: Duration,
    pub running_retry: Duration,
}

impl Default for LockTimeouts {
    fn default() -> Self {
        Self {
            first_deadline: Duration::from_millis(250),
            running_deadline: Duration::from_millis(500),
            first_retry: Duration::from_millis(200),
            running_retry: Duration::from_millis(10),
        }
    }
}

/// Blocking lock acquisition with timeout-driven abort.
///
/// There is no waits-for graph; a deadline running out is the deadlock
/// signal, whether the cause was a real cycle or just contention. On
/// timeout the caller receives `TransactionAborted` and is responsible for
/// completing the transaction with abort; no locks are released here.
pub struct LockAcquirer {
    locks: Arc<LockManager>,
    registry: Arc<TransactionRegistry>,
    timeouts: LockTimeouts,
}

impl LockAcquirer {
    pub fn new(
        locks: Arc<LockManager>,
        registry: Arc<TransactionRegistry>,
        timeouts: LockTimeouts,
    ) -> Self {
        Self {
            locks,
            registry,
            timeouts,
        }
    }

    pub fn timeouts(&self) -> LockTimeouts {
        self.timeouts
    }

    /// Blocks until `mode` is granted on `pid`, or fails with
    /// `TransactionAborted` once the transaction's deadline has passed.
    /// Registers the transaction on its first acquisition.
    pub fn acquire(
        &self,
        tid: TransactionId,
        pid: PageId,
        mode: LockMode,
    ) -> StorageResult<()> {
        let (deadline, retry) = match self.registry.lookup(tid) {
            None => {
                let start = self.registry.register(tid);
                (
                    start + self.timeouts.first_deadline,
                    self.timeouts.first_retry,
                )
            }
            Some(start) => (
                start + self.timeouts.running_deadline,
                self.timeouts.running_retry,
            ),
        };

        loop {
            if self.locks.try_grant(pid, tid, mode) {
                return Ok(());
            }
            if Instant::now() > deadline {
                warn!(%tid, %pid, ?mode, "lock wait deadline exceeded, aborting");
                return Err(StorageError::TransactionAborted(tid));
            }
            trace!(%tid, %pid, ?mode, "lock busy, retrying");
            thread::sleep(retry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn fast_timeouts() -> LockTimeouts {
        LockTimeouts {
            first_deadline: Duration::from_millis(60),
            running_deadline: Duration::from_millis(120),
            first_retry: Duration::from_millis(5),
            running_retry: Duration::from_millis(5),
        }
    }

    fn acquirer() -> LockAcquirer {
        LockAcquirer::new(
            Arc::new(LockManager::new()),
            Arc::new(TransactionRegistry::new()),
            fast_timeouts(),
        )
    }

    fn pid(n: u32) -> PageId {
        PageId::new(crate::storage::page::TableId(1), n)
    }

    #[test]
    fn uncontended_acquire_succeeds_and_registers() {
        let acq = acquirer();
        let tid = TransactionId::new(1);

        acq.acquire(tid, pid(0), LockMode::Exclusive).unwrap();
        assert!(acq.registry.is_live(tid));
        assert!(acq.locks.holds(tid, pid(0)));
    }

    #[test]
    fn contended_acquire_times_out_with_abort() {
        let acq = acquirer();
        let (t1, t2) = (TransactionId::new(1), TransactionId::new(2));

        acq.acquire(t1, pid(0), LockMode::Exclusive).unwrap();
        let result = acq.acquire(t2, pid(0), LockMode::Shared);
        assert!(matches!(result, Err(StorageError::TransactionAborted(t)) if t == t2));

        // The holder is unaffected; the loser released nothing because it
        // held nothing.
        assert!(acq.locks.holds(t1, pid(0)));
        assert!(!acq.locks.holds(t2, pid(0)));
    }

    #[test]
    fn waiter_wins_once_the_holder_releases() {
        let acq = Arc::new(acquirer());
        let (t1, t2) = (TransactionId::new(1), TransactionId::new(2));
        let barrier = Arc::new(Barrier::new(2));

        acq.acquire(t1, pid(0), LockMode::Exclusive).unwrap();
        // Make t2 a running transaction so it gets the longer deadline.
        acq.acquire(t2, pid(1), LockMode::Shared).unwrap();

        let waiter = {
            let acq = Arc::clone(&acq);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                acq.acquire(t2, pid(0), LockMode::Exclusive)
            })
        };

        barrier.wait();
        thread::sleep(Duration::from_millis(20));
        acq.locks.release(t1, pid(0));

        waiter.join().unwrap().unwrap();
        assert!(acq.locks.holds(t2, pid(0)));
    }

    #[test]
    fn running_transaction_keeps_its_original_start() {
        let acq = acquirer();
        let tid = TransactionId::new(1);

        acq.acquire(tid, pid(0), LockMode::Shared).unwrap();
        let start = acq.registry.lookup(tid).unwrap();

        acq.acquire(tid, pid(1), LockMode::Shared).unwrap();
        assert_eq!(acq.registry.lookup(tid).unwrap(), start);
    }

    #[test]
    fn running_transaction_deadline_is_absolute() {
        // A transaction that has been running longer than running_deadline
        // aborts on the first failed grant without waiting further.
        let acq = acquirer();
        let (t1, t2) = (TransactionId::new(1), TransactionId::new(2));

        acq.acquire(t2, pid(1), LockMode::Shared).unwrap();
        thread::sleep(acq.timeouts().running_deadline + Duration::from_millis(10));

        acq.acquire(t1, pid(0), LockMode::Exclusive).unwrap();
        let before = Instant::now();
        let result = acq.acquire(t2, pid(0), LockMode::Shared);
        assert!(matches!(result, Err(StorageError::TransactionAborted(_))));
        assert!(before.elapsed() < acq.timeouts().running_deadline);
    }
}
