use super::cache::PageCache;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use tracing::debug;

/// Picks the eviction victim: the clean page with the largest recency
/// counter, i.e. the least recently used page that is safe to drop.
///
/// Dirty pages are never candidates (NO STEAL): an uncommitted page must
/// not reach disk, so when every resident page is dirty the caller gets
/// `NoEvictableVictim` and has to wait for a transaction to complete.
pub(crate) fn select_victim(cache: &PageCache) -> StorageResult<PageId> {
    cache.check_consistent()?;

    let mut victim: Option<(PageId, u64)> = None;
    let mut dirty = 0usize;
    for (pid, page) in cache.pages() {
        if page.read().dirtied_by().is_some() {
            dirty += 1;
            continue;
        }
        let age = cache.recency_of(*pid).ok_or_else(|| {
            StorageError::InvariantViolation(format!("resident page {pid} has no recency entry"))
        })?;
        if victim.map_or(true, |(_, best)| age > best) {
            victim = Some((*pid, age));
        }
    }

    match victim {
        Some((pid, age)) => {
            debug!(%pid, age, dirty, "selected eviction victim");
            Ok(pid)
        }
        None => Err(StorageError::NoEvictableVictim),
    }
}
