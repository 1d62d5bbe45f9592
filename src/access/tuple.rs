use crate::storage::page::PageId;

/// Location of a stored tuple: the page holding it and its slot there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

/// A row as the storage engine sees it: opaque bytes plus, once stored, the
/// record id saying where those bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    record_id: Option<RecordId>,
    data: Vec<u8>,
}

impl Tuple {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            record_id: None,
            data,
        }
    }

    pub fn with_record_id(record_id: RecordId, data: Vec<u8>) -> Self {
        Self {
            record_id: Some(record_id),
            data,
        }
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: RecordId) {
        self.record_id = Some(record_id);
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Text,
}

/// Column layout of a table. The storage layer treats tuples as opaque
/// bytes; the descriptor exists for catalog consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TupleDesc {
    columns: Vec<(String, ColumnType)>,
}

impl TupleDesc {
    pub fn new(columns: Vec<(String, ColumnType)>) -> Self {
        Self { columns }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::TableId;

    #[test]
    fn record_id_is_set_once_stored() {
        let mut tuple = Tuple::new(b"abc".to_vec());
        assert!(tuple.record_id().is_none());

        let rid = RecordId::new(PageId::new(TableId(1), 0), 3);
        tuple.set_record_id(rid);
        assert_eq!(tuple.record_id(), Some(rid));
        assert_eq!(tuple.data(), b"abc");
    }

    #[test]
    fn tuple_desc_reports_arity() {
        let desc = TupleDesc::new(vec![
            ("id".to_string(), ColumnType::Int),
            ("name".to_string(), ColumnType::Text),
        ]);
        assert_eq!(desc.arity(), 2);
        assert_eq!(TupleDesc::empty().arity(), 0);
    }
}
