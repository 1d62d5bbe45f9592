use crate::access::{HeapFile, SeqScan, Tuple, TupleDesc};
use crate::catalog::Catalog;
use crate::storage::buffer::{BufferPool, BufferPoolConfig};
use crate::storage::disk::FilePageStore;
use crate::storage::error::StorageResult;
use crate::storage::page::TableId;
use crate::transaction::{TransactionId, TransactionIdGenerator};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// One database instance: the buffer pool, its catalog, and id generation,
/// created at startup and passed by reference. There is no ambient global;
/// everything reaches the pool through this graph.
pub struct Database {
    pool: Arc<BufferPool>,
    catalog: Arc<Catalog>,
    txn_ids: TransactionIdGenerator,
    next_table_id: AtomicU32,
}

impl Database {
    /// Opens (or creates) a database rooted at the given directory.
    pub fn open(dir: &Path, config: BufferPoolConfig) -> Result<Self> {
        let store = Arc::new(
            FilePageStore::open(dir)
                .with_context(|| format!("failed to open page store at {:?}", dir))?,
        );
        let catalog = Arc::new(Catalog::new());
        let pool = Arc::new(BufferPool::new(store, Arc::clone(&catalog), config));
        Ok(Self {
            pool,
            catalog,
            txn_ids: TransactionIdGenerator::new(),
            next_table_id: AtomicU32::new(1),
        })
    }

    /// Creates a heap table and registers it in the catalog.
    pub fn create_table(&self, desc: TupleDesc) -> TableId {
        let id = TableId(self.next_table_id.fetch_add(1, Ordering::SeqCst));
        self.catalog.register(Arc::new(HeapFile::new(id, desc)));
        id
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn begin(&self) -> TransactionId {
        self.txn_ids.next()
    }

    pub fn commit(&self, tid: TransactionId) -> Result<()> {
        self.pool
            .complete(tid, true)
            .with_context(|| format!("failed to commit {tid}"))
    }

    pub fn abort(&self, tid: TransactionId) -> Result<()> {
        self.pool
            .complete(tid, false)
            .with_context(|| format!("failed to abort {tid}"))
    }

    pub fn insert(&self, tid: TransactionId, table: TableId, tuple: &mut Tuple) -> Result<()> {
        self.pool
            .insert_tuple(tid, table, tuple)
            .with_context(|| format!("insert into {table} failed"))
    }

    pub fn delete(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        self.pool
            .delete_tuple(tid, tuple)
            .context("delete failed")
    }

    /// Collects every live tuple of the table, in scan order.
    pub fn scan(&self, tid: TransactionId, table: TableId) -> Result<Vec<Tuple>> {
        let tuples = SeqScan::new(&self.pool, tid, table)?
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(tuples)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Best effort flush on shutdown.
        let _ = self.pool.flush_all_pages();
    }
}
