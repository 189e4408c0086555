use crate::index::{IndexKey, SecondaryIndex};
use crate::StoreError;
use std::collections::{BTreeMap, BTreeSet};
use taskbook_core::{
    Category, FieldUpdate, ModelError, NewRecord, Record, RecordField, RecordId, Status,
};
use tracing::{debug, info, warn};

/// Primary id -> record mapping plus the secondary index over it.
///
/// Every mutation goes through this type, which keeps the index consistent
/// with the mapping. A failed call leaves both untouched.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: BTreeMap<RecordId, Record>,
    index: SecondaryIndex,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from loaded state, rebuilding the index when it is
    /// missing or disagrees with the records.
    pub fn restore(records: BTreeMap<RecordId, Record>, index: Option<SecondaryIndex>) -> Self {
        let index = match index {
            Some(index) if index.is_consistent_with(&records) => index,
            Some(_) => {
                warn!(
                    records = records.len(),
                    "index snapshot disagrees with records; rebuilding"
                );
                SecondaryIndex::rebuild(&records)
            }
            None => {
                if !records.is_empty() {
                    warn!(records = records.len(), "no index snapshot; rebuilding");
                }
                SecondaryIndex::rebuild(&records)
            }
        };
        Self { records, index }
    }

    pub fn records(&self) -> &BTreeMap<RecordId, Record> {
        &self.records
    }

    pub fn index(&self) -> &SecondaryIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `max + 1`. `RecordId::MAX` is never handed out; once the top of the
    /// range is reached the lowest free id is used instead.
    fn next_id(&self) -> RecordId {
        let Some((last, _)) = self.records.last_key_value() else {
            return 1;
        };
        match last.checked_add(1) {
            Some(next) if next < RecordId::MAX => next,
            _ => self.lowest_free_id(),
        }
    }

    fn lowest_free_id(&self) -> RecordId {
        let mut candidate: RecordId = 1;
        for id in self.records.keys().copied().filter(|id| *id >= 1) {
            if id != candidate {
                break;
            }
            candidate = candidate.saturating_add(1);
        }
        candidate
    }

    pub fn create(&mut self, draft: NewRecord) -> RecordId {
        let id = self.next_id();
        let record = draft.into_record();
        self.index.insert(id, record.category, record.status);
        debug!(id, category = %record.category, "record created");
        self.records.insert(id, record);
        id
    }

    pub fn delete(&mut self, id: RecordId) -> Result<Record, StoreError> {
        let record = self.records.remove(&id).ok_or(StoreError::NotFound(id))?;
        self.index.remove(id, record.category, record.status);
        debug!(id, "record deleted");
        Ok(record)
    }

    /// Removes every record filed under `category` and returns their ids.
    pub fn delete_by_category(&mut self, category: Category) -> Result<Vec<RecordId>, StoreError> {
        let key = IndexKey::Category(category);
        let ids: BTreeSet<RecordId> = self.index.bucket(key)?.clone();
        if ids.is_empty() {
            return Err(key.not_found());
        }
        for id in &ids {
            self.records.remove(id);
        }
        self.index.bulk_remove(&ids, category);
        info!(category = %category, removed = ids.len(), "category deleted");
        Ok(ids.into_iter().collect())
    }

    /// Parses `field_name` and `value` and applies them to record `id`.
    ///
    /// Checks run in order: the id must exist, the field must be editable,
    /// and the value must parse for that field.
    pub fn update_field(
        &mut self,
        id: RecordId,
        field_name: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        if !self.records.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        let field: RecordField = field_name.parse().map_err(|err| match err {
            ModelError::ReadOnlyField(name) => StoreError::ReadOnlyField(name),
            _ => StoreError::UnknownField(field_name.trim().to_string()),
        })?;
        let update = FieldUpdate::parse(field, value)
            .map_err(|source| StoreError::InvalidFieldValue { field, source })?;
        self.apply_update(id, update)
    }

    pub fn apply_update(&mut self, id: RecordId, update: FieldUpdate) -> Result<(), StoreError> {
        let record = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let field = update.field();
        let previous = record.category;
        record.apply(update);
        if field.is_indexed() {
            self.index.move_category(id, previous, record.category);
        }
        debug!(id, field = %field, "record updated");
        Ok(())
    }

    /// Marks `id` complete. Returns `false` when it already was.
    pub fn set_complete(&mut self, id: RecordId) -> Result<bool, StoreError> {
        let record = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if record.status.is_complete() {
            return Ok(false);
        }
        self.index.move_status(id, record.status, Status::Complete);
        record.status = Status::Complete;
        debug!(id, "record completed");
        Ok(true)
    }

    pub fn get(&self, id: RecordId) -> Result<&Record, StoreError> {
        self.records.get(&id).ok_or(StoreError::NotFound(id))
    }

    /// All records in ascending id order.
    pub fn list_all(&self) -> Vec<(RecordId, &Record)> {
        self.records.iter().map(|(id, record)| (*id, record)).collect()
    }

    pub fn list_by_category(&self, category: Category) -> Result<Vec<(RecordId, &Record)>, StoreError> {
        self.resolve(IndexKey::Category(category))
    }

    pub fn list_by_status(&self, status: Status) -> Result<Vec<(RecordId, &Record)>, StoreError> {
        self.resolve(IndexKey::Status(status))
    }

    /// Unindexed scan: a record matches when any field contains `text`.
    pub fn search_by_keyword(&self, text: &str) -> Vec<(RecordId, &Record)> {
        self.records
            .iter()
            .filter(|(_, record)| record.matches_keyword(text))
            .map(|(id, record)| (*id, record))
            .collect()
    }

    fn resolve(&self, key: IndexKey) -> Result<Vec<(RecordId, &Record)>, StoreError> {
        let ids = self.index.bucket(key)?;
        if ids.is_empty() {
            return Err(key.not_found());
        }
        Ok(ids
            .iter()
            .filter_map(|id| {
                let record = self.records.get(id);
                debug_assert!(record.is_some(), "index references missing record {id}");
                record.map(|record| (*id, record))
            })
            .collect())
    }
}
