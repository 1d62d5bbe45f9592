//! Access layer for tuple-oriented operations.
//!
//! - **HeapFile**: tuple insert/delete over slotted heap pages, always going
//!   through the buffer pool
//! - **SeqScan**: sequential scan of a table under shared locks
//! - **Tuple / RecordId / TupleDesc**: logical records and where they live

pub mod heap;
pub mod scan;
pub mod tuple;

pub use heap::HeapFile;
pub use scan::SeqScan;
pub use tuple::{ColumnType, RecordId, Tuple, TupleDesc};
