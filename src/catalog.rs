use crate::access::tuple::{Tuple, TupleDesc};
use crate::storage::buffer::BufferPool;
use crate::storage::error::StorageResult;
use crate::storage::page::{PageRef, TableId};
use crate::transaction::TransactionId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Tuple-level operations of one table. Implementations fetch and pin pages
/// by calling back into the buffer pool passed to each operation, so locks
/// and the cache stay in charge of every page touched.
pub trait TableFile: Send + Sync {
    fn id(&self) -> TableId;

    fn tuple_desc(&self) -> &TupleDesc;

    /// Inserts the tuple, filling in its record id. Returns every page the
    /// operation touched, in no particular order; the caller marks them
    /// dirty.
    fn insert(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> StorageResult<Vec<PageRef>>;

    /// Deletes the tuple at its record id. Returns the affected page.
    fn delete(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> StorageResult<PageRef>;
}

/// Registry of the tables in the database.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<TableId, Arc<dyn TableFile>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table, replacing any previous file with the same id.
    pub fn register(&self, file: Arc<dyn TableFile>) {
        self.tables.write().insert(file.id(), file);
    }

    pub fn table(&self, id: TableId) -> Option<Arc<dyn TableFile>> {
        self.tables.read().get(&id).cloned()
    }

    pub fn contains(&self, id: TableId) -> bool {
        self.tables.read().contains_key(&id)
    }

    pub fn tables(&self) -> Vec<Arc<dyn TableFile>> {
        self.tables.read().values().cloned().collect()
    }
}
