//! Concurrency control: two-phase page-granularity locking.
//!
//! - `lock`: shared/exclusive lock table with per-transaction ownership
//!   indices
//! - `acquire`: blocking acquisition with timeout-based deadlock avoidance

pub mod acquire;
pub mod lock;

pub use acquire::{LockAcquirer, LockTimeouts};
pub use lock::{LockManager, LockMode};
