pub mod heap_page;

use crate::transaction::TransactionId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const PAGE_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(pub u32);

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

/// Identity of a page: the table that owns it plus its position in that
/// table's backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId {
    pub table: TableId,
    pub page_no: u32,
}

impl PageId {
    pub fn new(table: TableId, page_no: u32) -> Self {
        Self { table, page_no }
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PageId({}:{})", self.table.0, self.page_no)
    }
}

/// A resident page shared between the cache and its callers. Content access
/// goes through the `RwLock`; callers must hold the matching transactional
/// page lock before reading or writing through it.
pub type PageRef = Arc<RwLock<Page>>;

/// A fixed-size page plus the transactional bookkeeping that rides with it:
/// the transaction that dirtied it (if any) and the before-image used to
/// roll back on abort.
pub struct Page {
    id: PageId,
    data: Box<[u8; PAGE_SIZE]>,
    before_image: Box<[u8; PAGE_SIZE]>,
    dirtied_by: Option<TransactionId>,
}

impl Page {
    /// Wraps bytes read from disk. The before-image starts out equal to the
    /// on-disk bytes.
    pub fn new(id: PageId, data: Box<[u8; PAGE_SIZE]>) -> Self {
        let before_image = data.clone();
        Self {
            id,
            data,
            before_image,
            dirtied_by: None,
        }
    }

    pub fn zeroed(id: PageId) -> Self {
        Self::new(id, Box::new([0u8; PAGE_SIZE]))
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn data(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    /// The transaction that last dirtied this page, or `None` if the page
    /// matches its on-disk copy.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    pub fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirtied_by = tid;
    }

    /// A standalone copy of this page as of the last `set_before_image`.
    pub fn before_image(&self) -> Page {
        Page {
            id: self.id,
            data: self.before_image.clone(),
            before_image: self.before_image.clone(),
            dirtied_by: None,
        }
    }

    /// Snapshots the current bytes as the new before-image, so later aborts
    /// roll back to this state.
    pub fn set_before_image(&mut self) {
        self.before_image.copy_from_slice(self.data.as_ref());
    }

    /// Rolls the page content back to the before-image in place and clears
    /// the dirty tag. Used on abort.
    pub fn restore_before_image(&mut self) {
        self.data.copy_from_slice(self.before_image.as_ref());
        self.dirtied_by = None;
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("dirtied_by", &self.dirtied_by)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_starts_clean() {
        let page = Page::zeroed(PageId::new(TableId(1), 0));
        assert_eq!(page.dirtied_by(), None);
        assert_eq!(page.data()[0], 0);
    }

    #[test]
    fn dirty_tag_tracks_owner() {
        let mut page = Page::zeroed(PageId::new(TableId(1), 0));
        let tid = TransactionId::new(7);

        page.mark_dirty(Some(tid));
        assert_eq!(page.dirtied_by(), Some(tid));

        page.mark_dirty(None);
        assert_eq!(page.dirtied_by(), None);
    }

    #[test]
    fn before_image_snapshots_at_construction() {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        data[0] = 11;
        let mut page = Page::new(PageId::new(TableId(2), 3), data);

        page.data_mut()[0] = 99;
        let before = page.before_image();
        assert_eq!(before.data()[0], 11);
        assert_eq!(page.data()[0], 99);
    }

    #[test]
    fn restore_rolls_back_and_clears_dirty() {
        let mut page = Page::zeroed(PageId::new(TableId(1), 4));
        page.data_mut()[10] = 42;
        page.mark_dirty(Some(TransactionId::new(1)));

        page.restore_before_image();
        assert_eq!(page.data()[10], 0);
        assert_eq!(page.dirtied_by(), None);
    }

    #[test]
    fn set_before_image_moves_the_rollback_point() {
        let mut page = Page::zeroed(PageId::new(TableId(1), 0));
        page.data_mut()[0] = 5;
        page.set_before_image();

        page.data_mut()[0] = 6;
        page.restore_before_image();
        assert_eq!(page.data()[0], 5);
    }

    #[test]
    fn page_id_equality_is_by_fields() {
        let a = PageId::new(TableId(1), 2);
        let b = PageId::new(TableId(1), 2);
        let c = PageId::new(TableId(2), 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
