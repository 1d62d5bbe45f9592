use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, PageRef};
use std::collections::HashMap;

/// Bounded map of resident pages with a recency counter per page.
///
/// The counters approximate LRU without a linked list: every touch ages all
/// resident pages by one and zeroes the touched page, so the page with the
/// largest counter is the least recently used. Ties are broken arbitrarily.
#[derive(Debug)]
pub struct PageCache {
    resident: HashMap<PageId, PageRef>,
    recency: HashMap<PageId, u64>,
    capacity: usize,
}

impl PageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            resident: HashMap::with_capacity(capacity),
            recency: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.resident.len() >= self.capacity
    }

    pub fn contains(&self, pid: PageId) -> bool {
        self.resident.contains_key(&pid)
    }

    /// Returns the resident page and refreshes its recency.
    pub fn get(&mut self, pid: PageId) -> Option<PageRef> {
        if !self.resident.contains_key(&pid) {
            return None;
        }
        self.touch(pid);
        self.resident.get(&pid).cloned()
    }

    /// Returns the resident page without touching recency. Used by the
    /// flush and completion walks, which must not perturb eviction order.
    pub fn peek(&self, pid: PageId) -> Option<PageRef> {
        self.resident.get(&pid).cloned()
    }

    /// Inserts or replaces a resident page and refreshes its recency.
    pub fn install(&mut self, pid: PageId, page: PageRef) {
        self.resident.insert(pid, page);
        self.touch(pid);
    }

    /// Removes a page from both maps unconditionally.
    pub fn discard(&mut self, pid: PageId) -> Option<PageRef> {
        self.recency.remove(&pid);
        self.resident.remove(&pid)
    }

    pub fn page_ids(&self) -> Vec<PageId> {
        self.resident.keys().copied().collect()
    }

    /// Snapshot of the resident set; the `Arc`s are cheap clones.
    pub fn entries(&self) -> Vec<(PageId, PageRef)> {
        self.resident
            .iter()
            .map(|(pid, page)| (*pid, page.clone()))
            .collect()
    }

    pub fn pages(&self) -> impl Iterator<Item = (&PageId, &PageRef)> {
        self.resident.iter()
    }

    pub fn recency_of(&self, pid: PageId) -> Option<u64> {
        self.recency.get(&pid).copied()
    }

    /// The resident and recency maps must always cover the same pages.
    pub fn check_consistent(&self) -> StorageResult<()> {
        if self.resident.len() != self.recency.len()
            || !self.resident.keys().all(|pid| self.recency.contains_key(pid))
        {
            return Err(StorageError::InvariantViolation(
                "resident and recency key sets diverged".to_string(),
            ));
        }
        Ok(())
    }

    fn touch(&mut self, pid: PageId) {
        for age in self.recency.values_mut() {
            *age = age.saturating_add(1);
        }
        self.recency.insert(pid, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{Page, TableId};
    use parking_lot::RwLock;
    use std::sync::Arc;

    fn pid(n: u32) -> PageId {
        PageId::new(TableId(1), n)
    }

    fn page(n: u32) -> PageRef {
        Arc::new(RwLock::new(Page::zeroed(pid(n))))
    }

    #[test]
    fn miss_returns_none() {
        let mut cache = PageCache::new(4);
        assert!(cache.get(pid(0)).is_none());
    }

    #[test]
    fn install_then_get() {
        let mut cache = PageCache::new(4);
        cache.install(pid(0), page(0));

        let found = cache.get(pid(0)).unwrap();
        assert_eq!(found.read().id(), pid(0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn touch_ages_everyone_else() {
        let mut cache = PageCache::new(4);
        cache.install(pid(0), page(0));
        cache.install(pid(1), page(1));
        cache.install(pid(2), page(2));

        // Install order leaves pid(0) the oldest.
        assert_eq!(cache.recency_of(pid(0)), Some(2));
        assert_eq!(cache.recency_of(pid(1)), Some(1));
        assert_eq!(cache.recency_of(pid(2)), Some(0));

        // A hit moves the page to the front and ages the rest.
        cache.get(pid(0));
        assert_eq!(cache.recency_of(pid(0)), Some(0));
        assert_eq!(cache.recency_of(pid(1)), Some(2));
        assert_eq!(cache.recency_of(pid(2)), Some(1));
    }

    #[test]
    fn peek_does_not_touch() {
        let mut cache = PageCache::new(4);
        cache.install(pid(0), page(0));
        cache.install(pid(1), page(1));

        cache.peek(pid(0)).unwrap();
        assert_eq!(cache.recency_of(pid(0)), Some(1));
    }

    #[test]
    fn discard_removes_both_entries() {
        let mut cache = PageCache::new(4);
        cache.install(pid(0), page(0));

        cache.discard(pid(0)).unwrap();
        assert!(!cache.contains(pid(0)));
        assert_eq!(cache.recency_of(pid(0)), None);
        cache.check_consistent().unwrap();
    }

    #[test]
    fn reinstall_replaces_without_growing() {
        let mut cache = PageCache::new(2);
        cache.install(pid(0), page(0));
        cache.install(pid(0), page(0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn consistency_check_passes_for_normal_use() {
        let mut cache = PageCache::new(4);
        cache.install(pid(0), page(0));
        cache.install(pid(1), page(1));
        cache.get(pid(0));
        cache.discard(pid(1));
        cache.check_consistent().unwrap();
    }
}
