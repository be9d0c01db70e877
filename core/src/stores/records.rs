//! Current page of records of one logical table

use log::debug;

use crate::models::{PageRequest, RecordId, ResolvedRecord, TableId};

use super::LoadStatus;

/// Page of records as last fetched, foreign keys already resolved
///
/// The store is only ever replaced as a whole after a fetch; mutations go to
/// the backend and are followed by a reload instead of a local patch.
#[derive(Debug, Clone)]
pub struct RecordStore {
    table_id: TableId,
    page: PageRequest,
    total: u64,
    records: Vec<ResolvedRecord>,
    status: LoadStatus,
}

impl RecordStore {
    /// Create an empty, not yet loaded store
    pub fn new(table_id: TableId, page: PageRequest) -> Self {
        RecordStore {
            table_id,
            page,
            total: 0,
            records: Vec::new(),
            status: LoadStatus::NotLoaded,
        }
    }

    /// Table the records belong to
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Page the store holds (or will hold on next load)
    pub fn page(&self) -> PageRequest {
        self.page
    }

    /// Change the page to load next; the held records are left as they are
    pub fn set_page(&mut self, page: PageRequest) {
        self.page = page;
    }

    /// Total number of records on the server
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Load state
    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Replace the held page after a successful fetch
    pub fn replace(&mut self, records: Vec<ResolvedRecord>, total: u64) {
        debug!(
            "Table {}: page {} holds {} of {} records",
            self.table_id,
            self.page.page,
            records.len(),
            total
        );
        self.records = records;
        self.total = total;
        self.status = LoadStatus::Loaded;
    }

    /// Record a failed fetch, leaving zero rows
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.records.clear();
        self.total = 0;
        self.status = LoadStatus::Failed(reason.into());
    }

    /// Records in fetch order
    pub fn records(&self) -> &[ResolvedRecord] {
        &self.records
    }

    /// Look up a record by id
    pub fn get(&self, id: RecordId) -> Option<&ResolvedRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Index of a record within the page
    pub fn index_of(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Position updates needed to move the record at `from` to index `to`
    ///
    /// Only the contiguous range between both indexes is affected. Every
    /// slot keeps the position value it had; records shift through the
    /// slots and only those that land on a different value are returned, in
    /// slot order. Records without a stored position use their absolute
    /// index on the table.
    pub fn reorder_plan(&self, from: usize, to: usize) -> Vec<(RecordId, i64)> {
        let len = self.records.len();
        if from >= len || to >= len || from == to {
            return Vec::new();
        }

        let (lo, hi) = (from.min(to), from.max(to));
        let offset = i64::from(self.page.page - 1) * i64::from(self.page.page_size);

        let current = |i: usize| self.records[i].position.unwrap_or(offset + i as i64);

        let mut order: Vec<usize> = (lo..=hi).collect();
        let moved = order.remove(from - lo);
        order.insert(to - lo, moved);

        order
            .into_iter()
            .zip(lo..=hi)
            .filter(|&(i, slot)| current(i) != current(slot))
            .map(|(i, slot)| (self.records[i].id, current(slot)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, RecordData};

    fn store(positions: &[Option<i64>]) -> RecordStore {
        let mut store = RecordStore::new(1, PageRequest::first(50));
        let records = positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut record = Record::new(i as RecordId + 1, RecordData::new());
                record.position = *p;
                ResolvedRecord::unresolved(record)
            })
            .collect();
        store.replace(records, positions.len() as u64);
        store
    }

    #[test]
    fn test_move_down_shifts_range() {
        let store = store(&[Some(10), Some(20), Some(30), Some(40), Some(50)]);

        // record 1 goes from index 0 to index 4
        let plan = store.reorder_plan(0, 4);
        assert_eq!(plan, vec![(2, 10), (3, 20), (4, 30), (5, 40), (1, 50)]);
    }

    #[test]
    fn test_move_up_only_touches_range() {
        let store = store(&[Some(1), Some(2), Some(3), Some(4), Some(5)]);

        let plan = store.reorder_plan(3, 1);
        assert_eq!(plan, vec![(4, 2), (2, 3), (3, 4)]);
    }

    #[test]
    fn test_missing_positions_use_absolute_index() {
        let mut store = store(&[None, None, None]);
        store.set_page(PageRequest::new(2, 50));

        let plan = store.reorder_plan(2, 0);
        assert_eq!(plan, vec![(3, 50), (1, 51), (2, 52)]);
    }

    #[test]
    fn test_noop_and_out_of_range() {
        let store = store(&[Some(1), Some(2)]);
        assert!(store.reorder_plan(1, 1).is_empty());
        assert!(store.reorder_plan(0, 5).is_empty());
    }

    #[test]
    fn test_mark_failed_keeps_page() {
        let mut store = store(&[Some(1)]);
        store.set_page(PageRequest::new(3, 10));
        store.mark_failed("boom");

        assert!(store.records().is_empty());
        assert_eq!(store.page().page, 3);
        assert_eq!(store.total(), 0);
    }
}
