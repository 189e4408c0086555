//! Category and status buckets kept in step with the primary mapping.
//!
//! Every stored id lives in exactly one category bucket and exactly one
//! status bucket. Buckets are created on first insert and are left in place
//! (possibly empty) after their last member goes away.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use taskbook_core::{Category, Record, RecordId, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Category,
    Status,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::Status => "status",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dimension together with one of its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Category(Category),
    Status(Status),
}

impl IndexKey {
    pub fn dimension(&self) -> Dimension {
        match self {
            IndexKey::Category(_) => Dimension::Category,
            IndexKey::Status(_) => Dimension::Status,
        }
    }

    pub fn value(&self) -> &'static str {
        match self {
            IndexKey::Category(category) => category.as_str(),
            IndexKey::Status(status) => status.as_str(),
        }
    }

    pub(crate) fn not_found(&self) -> StoreError {
        StoreError::DimensionValueNotFound {
            dimension: self.dimension(),
            value: self.value(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndex {
    #[serde(default, alias = "data_category")]
    by_category: BTreeMap<Category, BTreeSet<RecordId>>,
    #[serde(default, alias = "data_status")]
    by_status: BTreeMap<Status, BTreeSet<RecordId>>,
}

impl SecondaryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes both dimensions from a primary mapping.
    pub fn rebuild<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = (&'a RecordId, &'a Record)>,
    {
        let mut index = Self::new();
        for (id, record) in records {
            index.insert(*id, record.category, record.status);
        }
        index
    }

    pub fn insert(&mut self, id: RecordId, category: Category, status: Status) {
        self.by_category.entry(category).or_default().insert(id);
        self.by_status.entry(status).or_default().insert(id);
    }

    /// Missing ids are ignored.
    pub fn remove(&mut self, id: RecordId, category: Category, status: Status) {
        if let Some(bucket) = self.by_category.get_mut(&category) {
            bucket.remove(&id);
        }
        if let Some(bucket) = self.by_status.get_mut(&status) {
            bucket.remove(&id);
        }
    }

    pub fn move_category(&mut self, id: RecordId, old: Category, new: Category) {
        if old == new {
            return;
        }
        if let Some(bucket) = self.by_category.get_mut(&old) {
            bucket.remove(&id);
        }
        self.by_category.entry(new).or_default().insert(id);
    }

    pub fn move_status(&mut self, id: RecordId, old: Status, new: Status) {
        if old == new {
            return;
        }
        if let Some(bucket) = self.by_status.get_mut(&old) {
            bucket.remove(&id);
        }
        self.by_status.entry(new).or_default().insert(id);
    }

    pub fn bucket(&self, key: IndexKey) -> Result<&BTreeSet<RecordId>, StoreError> {
        let bucket = match key {
            IndexKey::Category(category) => self.by_category.get(&category),
            IndexKey::Status(status) => self.by_status.get(&status),
        };
        bucket.ok_or_else(|| key.not_found())
    }

    /// Drops `ids` from the category bucket and from every status bucket,
    /// since one category can hold records of both statuses.
    pub fn bulk_remove(&mut self, ids: &BTreeSet<RecordId>, category: Category) {
        if let Some(bucket) = self.by_category.get_mut(&category) {
            bucket.retain(|id| !ids.contains(id));
        }
        for bucket in self.by_status.values_mut() {
            bucket.retain(|id| !ids.contains(id));
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = (Category, &BTreeSet<RecordId>)> {
        self.by_category.iter().map(|(category, ids)| (*category, ids))
    }

    pub fn statuses(&self) -> impl Iterator<Item = (Status, &BTreeSet<RecordId>)> {
        self.by_status.iter().map(|(status, ids)| (*status, ids))
    }

    /// True when every record sits in the buckets of its current values and
    /// no bucket references anything else. Empty buckets are ignored.
    pub fn is_consistent_with(&self, records: &BTreeMap<RecordId, Record>) -> bool {
        let expected = Self::rebuild(records);
        non_empty(&self.by_category) == non_empty(&expected.by_category)
            && non_empty(&self.by_status) == non_empty(&expected.by_status)
    }
}

fn non_empty<K: Ord + Copy>(
    buckets: &BTreeMap<K, BTreeSet<RecordId>>,
) -> BTreeMap<K, &BTreeSet<RecordId>> {
    buckets
        .iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(key, ids)| (*key, ids))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskbook_core::NewRecord;

    fn record(category: &str, status: Status) -> Record {
        let mut record = NewRecord::parse("task", "", category, "2026.02.23", "middle")
            .expect("valid draft")
            .into_record();
        record.status = status;
        record
    }

    #[test]
    fn insert_creates_buckets_lazily() {
        let mut index = SecondaryIndex::new();
        assert!(index.bucket(IndexKey::Category(Category::Home)).is_err());

        index.insert(1, Category::Home, Status::Incomplete);
        index.insert(2, Category::Home, Status::Complete);

        let home = index.bucket(IndexKey::Category(Category::Home)).expect("home");
        assert_eq!(home.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(index.bucket(IndexKey::Category(Category::Work)).is_err());
        assert!(index
            .bucket(IndexKey::Status(Status::Complete))
            .expect("complete")
            .contains(&2));
    }

    #[test]
    fn missing_bucket_reports_dimension_and_value() {
        let index = SecondaryIndex::new();
        let err = index
            .bucket(IndexKey::Status(Status::Complete))
            .expect_err("no bucket yet");
        assert!(matches!(
            err,
            StoreError::DimensionValueNotFound {
                dimension: Dimension::Status,
                value: "complete"
            }
        ));
    }

    #[test]
    fn remove_tolerates_absent_ids_and_keeps_empty_bucket() {
        let mut index = SecondaryIndex::new();
        index.insert(1, Category::Work, Status::Incomplete);
        index.remove(1, Category::Work, Status::Incomplete);
        index.remove(1, Category::Work, Status::Incomplete);
        index.remove(7, Category::Study, Status::Complete);

        let work = index.bucket(IndexKey::Category(Category::Work)).expect("kept");
        assert!(work.is_empty());
    }

    #[test]
    fn moves_leave_id_in_exactly_one_bucket() {
        let mut index = SecondaryIndex::new();
        index.insert(3, Category::Home, Status::Incomplete);
        index.move_category(3, Category::Home, Category::Work);
        index.move_status(3, Status::Incomplete, Status::Complete);

        let holders: Vec<_> = index
            .categories()
            .filter(|(_, ids)| ids.contains(&3))
            .map(|(category, _)| category)
            .collect();
        assert_eq!(holders, vec![Category::Work]);
        let holders: Vec<_> = index
            .statuses()
            .filter(|(_, ids)| ids.contains(&3))
            .map(|(status, _)| status)
            .collect();
        assert_eq!(holders, vec![Status::Complete]);
    }

    #[test]
    fn bulk_remove_scrubs_every_status_bucket() {
        let mut index = SecondaryIndex::new();
        index.insert(1, Category::Study, Status::Incomplete);
        index.insert(2, Category::Study, Status::Complete);
        index.insert(3, Category::Work, Status::Complete);

        let ids: BTreeSet<RecordId> = [1, 2].into_iter().collect();
        index.bulk_remove(&ids, Category::Study);

        for (_, bucket) in index.statuses() {
            assert!(!bucket.contains(&1));
            assert!(!bucket.contains(&2));
        }
        assert!(index
            .bucket(IndexKey::Status(Status::Complete))
            .expect("complete")
            .contains(&3));
    }

    #[test]
    fn rebuild_matches_records_and_detects_stale_entries() {
        let mut records = BTreeMap::new();
        records.insert(1, record("home", Status::Incomplete));
        records.insert(4, record("personal", Status::Complete));

        let mut index = SecondaryIndex::rebuild(&records);
        assert!(index.is_consistent_with(&records));

        index.insert(9, Category::Home, Status::Incomplete);
        assert!(!index.is_consistent_with(&records));
    }

    #[test]
    fn empty_buckets_do_not_break_consistency() {
        let mut records = BTreeMap::new();
        records.insert(1, record("home", Status::Incomplete));
        let mut index = SecondaryIndex::rebuild(&records);
        index.insert(2, Category::Work, Status::Incomplete);
        index.remove(2, Category::Work, Status::Incomplete);
        assert!(index.is_consistent_with(&records));
    }

    #[test]
    fn serializes_buckets_as_arrays() {
        let mut index = SecondaryIndex::new();
        index.insert(2, Category::Home, Status::Incomplete);
        index.insert(1, Category::Home, Status::Incomplete);

        let value = serde_json::to_value(&index).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "by_category": { "home": [1, 2] },
                "by_status": { "incomplete": [1, 2] },
            })
        );
    }

    #[test]
    fn reads_legacy_key_names() {
        let index: SecondaryIndex = serde_json::from_str(
            r#"{"data_status": {"Not complete": [1], "Complete": [2]}, "data_category": {"work": [1, 2]}}"#,
        )
        .expect("legacy index");
        assert!(index
            .bucket(IndexKey::Status(Status::Incomplete))
            .expect("incomplete")
            .contains(&1));
        assert_eq!(
            index
                .bucket(IndexKey::Category(Category::Work))
                .expect("work")
                .len(),
            2
        );
    }
}
