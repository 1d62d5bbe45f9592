use super::tuple::{RecordId, Tuple, TupleDesc};
use crate::catalog::TableFile;
use crate::storage::buffer::{BufferPool, Permission};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::heap_page::HeapPage;
use crate::storage::page::{PageId, PageRef, TableId};
use crate::transaction::TransactionId;

/// A table stored as an unordered collection of slotted heap pages.
///
/// All page access goes through the buffer pool handed to each operation,
/// so inserts and deletes take exclusive page locks on behalf of the
/// calling transaction like any other page write.
pub struct HeapFile {
    table: TableId,
    desc: TupleDesc,
}

impl HeapFile {
    pub fn new(table: TableId, desc: TupleDesc) -> Self {
        Self { table, desc }
    }
}

impl TableFile for HeapFile {
    fn id(&self) -> TableId {
        self.table
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn insert(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> StorageResult<Vec<PageRef>> {
        let required = HeapPage::required_space_for(tuple.data().len());

        // First fit: walk the existing pages for free space.
        let pages = pool.page_count(self.table)?;
        for page_no in 0..pages {
            let pid = PageId::new(self.table, page_no);
            let page = pool.get_page(tid, pid, Permission::ReadWrite)?;
            let inserted = {
                let mut guard = page.write();
                let mut heap = HeapPage::from_bytes(guard.data_mut());
                if heap.free_space() >= required {
                    Some(heap.insert(tuple.data())?)
                } else {
                    None
                }
            };
            if let Some(slot) = inserted {
                tuple.set_record_id(RecordId::new(pid, slot));
                return Ok(vec![page]);
            }
        }

        // Every existing page is full; extend the table by one page.
        let pid = pool.allocate_page(self.table)?;
        let page = pool.get_page(tid, pid, Permission::ReadWrite)?;
        let slot = {
            let mut guard = page.write();
            HeapPage::from_bytes(guard.data_mut()).insert(tuple.data())?
        };
        tuple.set_record_id(RecordId::new(pid, slot));
        Ok(vec![page])
    }

    fn delete(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> StorageResult<PageRef> {
        let rid = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        let page = pool.get_page(tid, rid.page_id, Permission::ReadWrite)?;
        {
            let mut guard = page.write();
            HeapPage::from_bytes(guard.data_mut()).delete(rid.slot)?;
        }
        Ok(page)
    }
}
