use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{Page, PageId, TableId, PAGE_SIZE};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Synchronous fixed-size page I/O. The buffer pool is the only reader and
/// writer; implementations do not cache.
pub trait PageStore: Send + Sync {
    fn read_page(&self, pid: PageId) -> StorageResult<Page>;
    fn write_page(&self, page: &Page) -> StorageResult<()>;

    /// Extends the table by one zeroed page and returns its id.
    fn allocate_page(&self, table: TableId) -> StorageResult<PageId>;

    fn num_pages(&self, table: TableId) -> StorageResult<u32>;
}

/// Page store backed by one file per table under a directory.
pub struct FilePageStore {
    dir: PathBuf,
    files: Mutex<HashMap<TableId, File>>,
}

impl FilePageStore {
    pub fn open(dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            files: Mutex::new(HashMap::new()),
        })
    }

    fn with_file<T>(
        &self,
        table: TableId,
        op: impl FnOnce(&mut File) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut files = self.files.lock();
        if !files.contains_key(&table) {
            let path = self.dir.join(format!("table_{}.db", table.0));
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?;
            files.insert(table, file);
        }
        op(files.get_mut(&table).expect("file was just inserted"))
    }

    fn page_offset(pid: PageId) -> u64 {
        pid.page_no as u64 * PAGE_SIZE as u64
    }
}

impl PageStore for FilePageStore {
    fn read_page(&self, pid: PageId) -> StorageResult<Page> {
        self.with_file(pid.table, |file| {
            let offset = Self::page_offset(pid);
            if offset >= file.metadata()?.len() {
                return Err(StorageError::PageNotFound(pid));
            }
            let mut data = Box::new([0u8; PAGE_SIZE]);
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(data.as_mut())?;
            Ok(Page::new(pid, data))
        })
    }

    fn write_page(&self, page: &Page) -> StorageResult<()> {
        let pid = page.id();
        self.with_file(pid.table, |file| {
            let offset = Self::page_offset(pid);
            let end = offset + PAGE_SIZE as u64;
            if end > file.metadata()?.len() {
                file.set_len(end)?;
            }
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(page.data())?;
            file.sync_all()?;
            Ok(())
        })
    }

    fn allocate_page(&self, table: TableId) -> StorageResult<PageId> {
        self.with_file(table, |file| {
            let current = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;
            let pid = PageId::new(table, current);
            file.set_len((current as u64 + 1) * PAGE_SIZE as u64)?;
            debug!(%pid, "allocated page");
            Ok(pid)
        })
    }

    fn num_pages(&self, table: TableId) -> StorageResult<u32> {
        self.with_file(table, |file| {
            Ok((file.metadata()?.len() / PAGE_SIZE as u64) as u32)
        })
    }
}
