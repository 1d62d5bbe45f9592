pub mod cache;
pub mod eviction;

use crate::access::tuple::Tuple;
use crate::catalog::Catalog;
use crate::concurrency::acquire::{LockAcquirer, LockTimeouts};
use crate::concurrency::lock::{LockManager, LockMode};
use crate::storage::disk::PageStore;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, PageRef, TableId};
use crate::transaction::{TransactionId, TransactionRegistry};
use cache::PageCache;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, trace};

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Maximum number of resident pages.
    pub capacity: usize,
    pub timeouts: LockTimeouts,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            timeouts: LockTimeouts::default(),
        }
    }
}

/// Access permission requested for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    fn lock_mode(self) -> LockMode {
        match self {
            Permission::ReadOnly => LockMode::Shared,
            Permission::ReadWrite => LockMode::Exclusive,
        }
    }
}

/// The buffer pool mediates every page access: it checks transactional
/// locks, caches a bounded set of pages, and ties dirty pages,
/// before-images, and lock ownership together at commit and abort.
///
/// Locking discipline: the cache mutex guards only structural changes
/// (install, evict, discard, the completion and flush walks). Page content
/// is guarded by each page's own `RwLock`; a page guard may be taken while
/// holding the cache mutex, never the other way around. Store reads on a
/// miss happen outside the cache mutex.
pub struct BufferPool {
    cache: Mutex<PageCache>,
    locks: Arc<LockManager>,
    acquirer: LockAcquirer,
    registry: Arc<TransactionRegistry>,
    catalog: Arc<Catalog>,
    store: Arc<dyn PageStore>,
}

impl BufferPool {
    pub fn new(store: Arc<dyn PageStore>, catalog: Arc<Catalog>, config: BufferPoolConfig) -> Self {
        let locks = Arc::new(LockManager::new());
        let registry = Arc::new(TransactionRegistry::new());
        let acquirer = LockAcquirer::new(
            Arc::clone(&locks),
            Arc::clone(&registry),
            config.timeouts,
        );
        Self {
            cache: Mutex::new(PageCache::new(config.capacity)),
            locks,
            acquirer,
            registry,
            catalog,
            store,
        }
    }

    /// Fetches a page with the requested permission, blocking until the
    /// matching lock is granted or the transaction's deadline passes.
    ///
    /// On a miss the page is read from the store, evicting the least
    /// recently used clean page if the cache is full. Registers the
    /// transaction on its first call.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> StorageResult<PageRef> {
        self.acquirer.acquire(tid, pid, perm.lock_mode())?;

        if let Some(page) = self.cache.lock().get(pid) {
            trace!(%tid, %pid, "page hit");
            return Ok(page);
        }

        if !self.catalog.contains(pid.table) {
            return Err(StorageError::PageNotFound(pid));
        }

        debug!(%tid, %pid, "page miss, reading from store");
        let page = Arc::new(RwLock::new(self.store.read_page(pid)?));

        let mut cache = self.cache.lock();
        // Another thread may have installed the page while we were reading.
        if let Some(existing) = cache.get(pid) {
            return Ok(existing);
        }
        if cache.is_full() {
            let victim = eviction::select_victim(&cache)?;
            self.flush_locked(&cache, victim)?;
            cache.discard(victim);
            debug!(%victim, "evicted page");
        }
        cache.install(pid, Arc::clone(&page));
        Ok(page)
    }

    /// Inserts a tuple into the table, delegating the page-level work to the
    /// table's file. Every affected page is re-installed into the cache and
    /// marked dirty on behalf of `tid`. The tuple's record id is filled in.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table: TableId,
        tuple: &mut Tuple,
    ) -> StorageResult<()> {
        let file = self
            .catalog
            .table(table)
            .ok_or(StorageError::TableNotFound(table))?;
        let touched = file.insert(self, tid, tuple)?;

        let mut cache = self.cache.lock();
        for page in touched {
            let pid = {
                let mut guard = page.write();
                guard.mark_dirty(Some(tid));
                guard.id()
            };
            cache.install(pid, page);
        }
        Ok(())
    }

    /// Deletes a tuple through its record id and marks the affected page
    /// dirty. No re-install is needed: deletion never creates a page.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> StorageResult<()> {
        let rid = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        let table = rid.page_id.table;
        let file = self
            .catalog
            .table(table)
            .ok_or(StorageError::TableNotFound(table))?;
        let page = file.delete(self, tid, tuple)?;
        page.write().mark_dirty(Some(tid));
        Ok(())
    }

    /// Commits or aborts a transaction and releases all of its locks.
    ///
    /// Commit flushes every page the transaction dirtied and refreshes its
    /// before-image; pages that are currently clean also get a fresh
    /// before-image, so a later abort by another transaction rolls back to
    /// the state this commit made visible. Abort restores the
    /// transaction's dirty pages from their before-images in place.
    ///
    /// An I/O failure while flushing surfaces immediately; locks are then
    /// still held and it is the caller's job to complete with abort.
    pub fn complete(&self, tid: TransactionId, commit: bool) -> StorageResult<()> {
        debug!(%tid, commit, "completing transaction");
        self.registry.forget(tid);

        {
            let cache = self.cache.lock();
            for (pid, page) in cache.entries() {
                let owner = page.read().dirtied_by();
                match owner {
                    Some(owner) if owner == tid => {
                        if commit {
                            {
                                let guard = page.read();
                                self.store.write_page(&guard)?;
                            }
                            let mut guard = page.write();
                            guard.mark_dirty(None);
                            guard.set_before_image();
                            trace!(%tid, %pid, "flushed committed page");
                        } else {
                            page.write().restore_before_image();
                            trace!(%tid, %pid, "rolled back page");
                        }
                    }
                    Some(_) => {}
                    None => {
                        if commit {
                            page.write().set_before_image();
                        }
                    }
                }
            }
        }

        self.locks.release_all(tid);
        Ok(())
    }

    /// True iff the transaction holds a lock (either mode) on the page.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.locks.holds(tid, pid)
    }

    /// Releases the transaction's lock on one page. Calling this is risky:
    /// it breaks two-phase locking, and with it the isolation guarantees
    /// for anything the transaction read or wrote on that page.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.locks.release(tid, pid);
    }

    /// Writes the resident page to the store and marks it clean. A no-op if
    /// the page is not resident or not dirty.
    ///
    /// Note: flushing a page dirtied by a live transaction writes
    /// uncommitted data and breaks NO STEAL; only recovery-style callers
    /// should do that.
    pub fn flush_page(&self, pid: PageId) -> StorageResult<()> {
        let cache = self.cache.lock();
        self.flush_locked(&cache, pid)
    }

    pub fn flush_all_pages(&self) -> StorageResult<()> {
        let cache = self.cache.lock();
        for pid in cache.page_ids() {
            self.flush_locked(&cache, pid)?;
        }
        Ok(())
    }

    /// Drops a page from the cache without flushing. Used by recovery paths
    /// that must not keep a rolled-back page around.
    pub fn discard_page(&self, pid: PageId) {
        self.cache.lock().discard(pid);
    }

    /// Number of pages currently backing the table in the store.
    pub fn page_count(&self, table: TableId) -> StorageResult<u32> {
        self.store.num_pages(table)
    }

    /// Extends the table by one zeroed page. The new page still has to be
    /// fetched through `get_page` to become resident and locked.
    pub fn allocate_page(&self, table: TableId) -> StorageResult<PageId> {
        self.store.allocate_page(table)
    }

    fn flush_locked(&self, cache: &PageCache, pid: PageId) -> StorageResult<()> {
        if let Some(page) = cache.peek(pid) {
            if page.read().dirtied_by().is_some() {
                {
                    let guard = page.read();
                    self.store.write_page(&guard)?;
                }
                page.write().mark_dirty(None);
                trace!(%pid, "flushed page");
            }
        }
        Ok(())
    }
}
