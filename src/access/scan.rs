use super::tuple::{RecordId, Tuple};
use crate::storage::buffer::{BufferPool, Permission};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::heap_page::HeapPageView;
use crate::storage::page::{PageId, TableId};
use crate::transaction::TransactionId;

/// Sequential scan over a table's tuples under shared page locks.
///
/// Deleted slots are skipped. The scan holds each page's lock on behalf of
/// the transaction for the rest of the transaction, as two-phase locking
/// requires; errors (including lock timeouts) end the scan.
pub struct SeqScan<'a> {
    pool: &'a BufferPool,
    tid: TransactionId,
    table: TableId,
    page_count: u32,
    page_no: u32,
    slot: u16,
}

impl<'a> SeqScan<'a> {
    pub fn new(pool: &'a BufferPool, tid: TransactionId, table: TableId) -> StorageResult<Self> {
        let page_count = pool.page_count(table)?;
        Ok(Self {
            pool,
            tid,
            table,
            page_count,
            page_no: 0,
            slot: 0,
        })
    }
}

impl Iterator for SeqScan<'_> {
    type Item = StorageResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.page_no < self.page_count {
            let pid = PageId::new(self.table, self.page_no);
            let page = match self.pool.get_page(self.tid, pid, Permission::ReadOnly) {
                Ok(page) => page,
                Err(err) => {
                    self.page_no = self.page_count;
                    return Some(Err(err));
                }
            };

            let guard = page.read();
            let heap = HeapPageView::from_bytes(guard.data());
            while self.slot < heap.slot_count() {
                let slot = self.slot;
                self.slot += 1;
                match heap.tuple(slot) {
                    Ok(bytes) => {
                        return Some(Ok(Tuple::with_record_id(
                            RecordId::new(pid, slot),
                            bytes.to_vec(),
                        )));
                    }
                    Err(StorageError::TupleNotFound { .. }) => continue,
                    Err(err) => {
                        self.page_no = self.page_count;
                        return Some(Err(err));
                    }
                }
            }

            self.slot = 0;
            self.page_no += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::heap::HeapFile;
    use crate::access::tuple::TupleDesc;
    use crate::catalog::Catalog;
    use crate::storage::buffer::BufferPoolConfig;
    use crate::storage::disk::FilePageStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    const TABLE: TableId = TableId(1);

    fn setup() -> (TempDir, BufferPool) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FilePageStore::open(dir.path()).unwrap());
        let catalog = Arc::new(Catalog::new());
        catalog.register(Arc::new(HeapFile::new(TABLE, TupleDesc::empty())));
        let pool = BufferPool::new(store, catalog, BufferPoolConfig::default());
        (dir, pool)
    }

    fn collect(pool: &BufferPool, tid: TransactionId) -> Vec<Vec<u8>> {
        SeqScan::new(pool, tid, TABLE)
            .unwrap()
            .map(|t| t.unwrap().data().to_vec())
            .collect()
    }

    #[test]
    fn empty_table_yields_nothing() {
        let (_dir, pool) = setup();
        assert!(collect(&pool, TransactionId::new(1)).is_empty());
    }

    #[test]
    fn scan_sees_inserted_tuples() {
        let (_dir, pool) = setup();
        let tid = TransactionId::new(1);

        for text in ["alpha", "beta", "gamma"] {
            let mut tuple = Tuple::new(text.as_bytes().to_vec());
            pool.insert_tuple(tid, TABLE, &mut tuple).unwrap();
        }

        let found = collect(&pool, tid);
        assert_eq!(found.len(), 3);
        assert!(found.contains(&b"alpha".to_vec()));
        assert!(found.contains(&b"gamma".to_vec()));
    }

    #[test]
    fn scan_skips_deleted_tuples() {
        let (_dir, pool) = setup();
        let tid = TransactionId::new(1);

        let mut keep = Tuple::new(b"keep".to_vec());
        let mut drop_me = Tuple::new(b"drop".to_vec());
        pool.insert_tuple(tid, TABLE, &mut keep).unwrap();
        pool.insert_tuple(tid, TABLE, &mut drop_me).unwrap();
        pool.delete_tuple(tid, &drop_me).unwrap();

        let found = collect(&pool, tid);
        assert_eq!(found, vec![b"keep".to_vec()]);
    }

    #[test]
    fn scan_crosses_page_boundaries() {
        let (_dir, pool) = setup();
        let tid = TransactionId::new(1);

        let payload = vec![1u8; 1300];
        for _ in 0..5 {
            let mut tuple = Tuple::new(payload.clone());
            pool.insert_tuple(tid, TABLE, &mut tuple).unwrap();
        }
        assert!(pool.page_count(TABLE).unwrap() > 1);
        assert_eq!(collect(&pool, tid).len(), 5);
    }

    #[test]
    fn scanned_tuples_carry_their_record_ids() {
        let (_dir, pool) = setup();
        let tid = TransactionId::new(1);

        let mut tuple = Tuple::new(b"locate me".to_vec());
        pool.insert_tuple(tid, TABLE, &mut tuple).unwrap();

        let scanned: Vec<Tuple> = SeqScan::new(&pool, tid, TABLE)
            .unwrap()
            .map(|t| t.unwrap())
            .collect();
        assert_eq!(scanned[0].record_id(), tuple.record_id());
    }
}
