//! Slotted page layout for heap tables.
//!
//! The header keeps two watermarks: `lower`, the first free byte after the
//! slot array, and `upper`, the start of the tuple data region. Slots grow
//! down from the header, tuple bytes grow up from the end of the page. A
//! freshly allocated page is all zeroes; both watermarks read as zero then
//! and are normalized to an empty page on access.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PAGE_SIZE;

const HEADER_SIZE: usize = 8;
const LOWER_OFFSET: usize = 0;
const UPPER_OFFSET: usize = 2;

// Slot entry: 2 bytes tuple offset, 2 bytes tuple length. A zeroed entry
// marks a deleted slot; live tuples can never sit at offset 0.
const SLOT_SIZE: usize = 4;

fn read_u16(data: &[u8; PAGE_SIZE], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn write_u16(data: &mut [u8; PAGE_SIZE], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn lower(data: &[u8; PAGE_SIZE]) -> u16 {
    match read_u16(data, LOWER_OFFSET) {
        0 => HEADER_SIZE as u16,
        raw => raw,
    }
}

fn upper(data: &[u8; PAGE_SIZE]) -> u16 {
    match read_u16(data, UPPER_OFFSET) {
        0 => PAGE_SIZE as u16,
        raw => raw,
    }
}

fn slot_count(data: &[u8; PAGE_SIZE]) -> u16 {
    (lower(data) - HEADER_SIZE as u16) / SLOT_SIZE as u16
}

fn slot(data: &[u8; PAGE_SIZE], index: u16) -> (u16, u16) {
    let at = HEADER_SIZE + index as usize * SLOT_SIZE;
    (read_u16(data, at), read_u16(data, at + 2))
}

fn tuple_at(data: &[u8; PAGE_SIZE], index: u16) -> StorageResult<&[u8]> {
    let count = slot_count(data);
    if index >= count {
        return Err(StorageError::InvalidSlot {
            slot: index,
            max: count.saturating_sub(1),
        });
    }
    let (offset, len) = slot(data, index);
    if offset == 0 && len == 0 {
        return Err(StorageError::TupleNotFound { slot: index });
    }
    Ok(&data[offset as usize..offset as usize + len as usize])
}

/// Mutable view over a page's bytes.
pub struct HeapPage<'a> {
    data: &'a mut [u8; PAGE_SIZE],
}

impl<'a> HeapPage<'a> {
    pub fn from_bytes(data: &'a mut [u8; PAGE_SIZE]) -> Self {
        Self { data }
    }

    pub fn slot_count(&self) -> u16 {
        slot_count(self.data)
    }

    pub fn free_space(&self) -> usize {
        (upper(self.data) - lower(self.data)) as usize
    }

    pub fn required_space_for(tuple_len: usize) -> usize {
        tuple_len + SLOT_SIZE
    }

    pub fn tuple(&self, index: u16) -> StorageResult<&[u8]> {
        tuple_at(self.data, index)
    }

    /// Appends a tuple, returning its slot index.
    pub fn insert(&mut self, tuple: &[u8]) -> StorageResult<u16> {
        let required = Self::required_space_for(tuple.len());
        let available = self.free_space();
        if available < required {
            return Err(StorageError::PageFull {
                required,
                available,
            });
        }

        let old_lower = lower(self.data);
        let new_upper = upper(self.data) - tuple.len() as u16;
        self.data[new_upper as usize..new_upper as usize + tuple.len()].copy_from_slice(tuple);

        write_u16(self.data, old_lower as usize, new_upper);
        write_u16(self.data, old_lower as usize + 2, tuple.len() as u16);
        write_u16(self.data, LOWER_OFFSET, old_lower + SLOT_SIZE as u16);
        write_u16(self.data, UPPER_OFFSET, new_upper);

        Ok((old_lower - HEADER_SIZE as u16) / SLOT_SIZE as u16)
    }

    /// Tombstones a slot. The tuple bytes are left in place; the slot entry
    /// is zeroed.
    pub fn delete(&mut self, index: u16) -> StorageResult<()> {
        let count = self.slot_count();
        if index >= count {
            return Err(StorageError::InvalidSlot {
                slot: index,
                max: count.saturating_sub(1),
            });
        }
        let (offset, len) = slot(self.data, index);
        if offset == 0 && len == 0 {
            return Err(StorageError::TupleNotFound { slot: index });
        }
        let at = HEADER_SIZE + index as usize * SLOT_SIZE;
        self.data[at..at + SLOT_SIZE].fill(0);
        Ok(())
    }
}

/// Read-only view over a page's bytes, for scans.
pub struct HeapPageView<'a> {
    data: &'a [u8; PAGE_SIZE],
}

impl<'a> HeapPageView<'a> {
    pub fn from_bytes(data: &'a [u8; PAGE_SIZE]) -> Self {
        Self { data }
    }

    pub fn slot_count(&self) -> u16 {
        slot_count(self.data)
    }

    pub fn tuple(&self, index: u16) -> StorageResult<&[u8]> {
        tuple_at(self.data, index)
    }
}
