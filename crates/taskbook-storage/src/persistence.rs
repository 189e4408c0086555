//! On-disk snapshots of the record mapping and the secondary index.
//!
//! Two JSON documents: the records file maps string-encoded ids to record
//! objects, the index file holds `by_category` and `by_status` bucket arrays.
//! A missing file means a first run. A file that does not parse is reported
//! and treated as empty so the store can still start.

use crate::index::SecondaryIndex;
use crate::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use taskbook_core::{Record, RecordId};
use tracing::{debug, warn};

pub const DEFAULT_STORE_FILE: &str = "data.json";
pub const DEFAULT_INDEX_FILE: &str = "index.json";

/// Everything recovered by a load. `index` is `None` when no usable index
/// snapshot was found.
#[derive(Debug, Default)]
pub struct LoadedState {
    pub records: BTreeMap<RecordId, Record>,
    pub index: Option<SecondaryIndex>,
    /// Non-fatal problems, currently only `MalformedPersistedState`.
    pub warnings: Vec<StoreError>,
}

pub trait PersistenceAdapter {
    fn load(&self) -> Result<LoadedState, StoreError>;
    fn save(
        &self,
        records: &BTreeMap<RecordId, Record>,
        index: &SecondaryIndex,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileAdapter {
    store_path: PathBuf,
    index_path: PathBuf,
}

impl JsonFileAdapter {
    pub fn new(store_path: impl Into<PathBuf>, index_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            index_path: index_path.into(),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(DEFAULT_STORE_FILE), dir.join(DEFAULT_INDEX_FILE))
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }
}

impl PersistenceAdapter for JsonFileAdapter {
    fn load(&self) -> Result<LoadedState, StoreError> {
        let mut state = LoadedState::default();

        match read_json::<BTreeMap<RecordId, Record>>(&self.store_path)? {
            Parsed::Missing => {
                debug!(path = %self.store_path.display(), "no records file; starting empty");
            }
            Parsed::Value(records) if records.contains_key(&0) => {
                state.warnings.push(malformed(&self.store_path, "record id 0 is not allowed"));
            }
            Parsed::Value(records) if records.contains_key(&RecordId::MAX) => {
                state.warnings.push(malformed(
                    &self.store_path,
                    format!("record id {} is out of range", RecordId::MAX),
                ));
            }
            Parsed::Value(records) => state.records = records,
            Parsed::Malformed(err) => state.warnings.push(err),
        }

        match read_json::<SecondaryIndex>(&self.index_path)? {
            Parsed::Missing => {
                debug!(path = %self.index_path.display(), "no index file");
            }
            Parsed::Value(index) => state.index = Some(index),
            Parsed::Malformed(err) => state.warnings.push(err),
        }

        for warning in &state.warnings {
            warn!(error = %warning, "ignoring unreadable persisted state");
        }
        Ok(state)
    }

    fn save(
        &self,
        records: &BTreeMap<RecordId, Record>,
        index: &SecondaryIndex,
    ) -> Result<(), StoreError> {
        write_json(&self.store_path, records)?;
        write_json(&self.index_path, index)?;
        debug!(
            records = records.len(),
            store = %self.store_path.display(),
            index = %self.index_path.display(),
            "state saved"
        );
        Ok(())
    }
}

enum Parsed<T> {
    Missing,
    Value(T),
    Malformed(StoreError),
}

fn malformed(path: &Path, message: impl Into<String>) -> StoreError {
    StoreError::MalformedPersistedState {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Parsed<T>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Parsed::Missing),
        Err(err) if err.kind() == ErrorKind::InvalidData => {
            return Ok(Parsed::Malformed(malformed(path, err.to_string())));
        }
        Err(err) => return Err(StoreError::io(path, err)),
    };
    Ok(match serde_json::from_str(&content) {
        Ok(value) => Parsed::Value(value),
        Err(err) => Parsed::Malformed(malformed(path, err.to_string())),
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
    }
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| StoreError::Serialization(err.to_string()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, payload).map_err(|err| StoreError::io(&tmp_path, err))?;
    fs::rename(&tmp_path, path).map_err(|err| StoreError::io(path, err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexKey;
    use taskbook_core::{Category, NewRecord, Status};
    use tempfile::TempDir;

    fn sample_state() -> (BTreeMap<RecordId, Record>, SecondaryIndex) {
        let mut records = BTreeMap::new();
        records.insert(
            1,
            NewRecord::parse("water plants", "", "home", "2026.04.01", "low")
                .expect("valid draft")
                .into_record(),
        );
        let mut done = NewRecord::parse("send invoice", "client a", "work", "2026.04.02", "high")
            .expect("valid draft")
            .into_record();
        done.status = Status::Complete;
        records.insert(3, done);
        let index = SecondaryIndex::rebuild(&records);
        (records, index)
    }

    #[test]
    fn missing_files_load_as_empty_first_run() {
        let dir = TempDir::new().expect("temp dir");
        let state = JsonFileAdapter::in_dir(dir.path()).load().expect("load");
        assert!(state.records.is_empty());
        assert!(state.index.is_none());
        assert!(state.warnings.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().expect("temp dir");
        let adapter = JsonFileAdapter::in_dir(dir.path());
        let (records, index) = sample_state();

        adapter.save(&records, &index).expect("save");
        let state = adapter.load().expect("load");

        assert_eq!(state.records, records);
        assert_eq!(state.index.as_ref(), Some(&index));
        assert!(state.warnings.is_empty());
        assert!(!dir.path().join("data.json.tmp").exists());
    }

    #[test]
    fn wire_format_uses_string_ids_and_bucket_arrays() {
        let dir = TempDir::new().expect("temp dir");
        let adapter = JsonFileAdapter::in_dir(dir.path());
        let (records, index) = sample_state();
        adapter.save(&records, &index).expect("save");

        let data: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(adapter.store_path()).expect("read data"),
        )
        .expect("json");
        assert_eq!(data["3"]["status"], "complete");
        assert_eq!(data["1"]["deadline"], "2026.04.01");

        let raw_index: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(adapter.index_path()).expect("read index"),
        )
        .expect("json");
        assert_eq!(raw_index["by_category"]["work"], serde_json::json!([3]));
        assert_eq!(raw_index["by_status"]["incomplete"], serde_json::json!([1]));
    }

    #[test]
    fn malformed_records_are_reported_and_treated_as_empty() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join(DEFAULT_STORE_FILE), "{not json").expect("write");
        let state = JsonFileAdapter::in_dir(dir.path()).load().expect("load");

        assert!(state.records.is_empty());
        assert_eq!(state.warnings.len(), 1);
        assert!(matches!(
            state.warnings[0],
            StoreError::MalformedPersistedState { .. }
        ));
    }

    #[test]
    fn malformed_index_is_dropped_but_records_survive() {
        let dir = TempDir::new().expect("temp dir");
        let adapter = JsonFileAdapter::in_dir(dir.path());
        let (records, index) = sample_state();
        adapter.save(&records, &index).expect("save");
        fs::write(adapter.index_path(), r#"{"by_category": 5}"#).expect("corrupt");

        let state = adapter.load().expect("load");
        assert_eq!(state.records, records);
        assert!(state.index.is_none());
        assert_eq!(state.warnings.len(), 1);
    }

    #[test]
    fn reads_files_written_by_older_versions() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(
            dir.path().join(DEFAULT_STORE_FILE),
            r#"{"2": {"name": "read", "description": "book", "category": "study", "deadline": "2026.01.15", "priority": "middle", "status": "Not complete"}}"#,
        )
        .expect("write data");
        fs::write(
            dir.path().join(DEFAULT_INDEX_FILE),
            r#"{"data_status": {"Not complete": [2]}, "data_category": {"study": [2]}}"#,
        )
        .expect("write index");

        let state = JsonFileAdapter::in_dir(dir.path()).load().expect("load");
        assert_eq!(state.records[&2].status, Status::Incomplete);
        let index = state.index.expect("index");
        assert!(index
            .bucket(IndexKey::Category(Category::Study))
            .expect("study")
            .contains(&2));
        assert!(index.is_consistent_with(&state.records));
    }

    #[test]
    fn zero_id_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(
            dir.path().join(DEFAULT_STORE_FILE),
            r#"{"0": {"name": "x", "description": "", "category": "home", "deadline": "2026.01.15", "priority": "low", "status": "incomplete"}}"#,
        )
        .expect("write data");
        let state = JsonFileAdapter::in_dir(dir.path()).load().expect("load");
        assert!(state.records.is_empty());
        assert_eq!(state.warnings.len(), 1);
    }

    #[test]
    fn max_id_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(
            dir.path().join(DEFAULT_STORE_FILE),
            r#"{"1": {"name": "a", "description": "", "category": "home", "deadline": "2026.01.15", "priority": "low", "status": "incomplete"}, "18446744073709551615": {"name": "b", "description": "", "category": "home", "deadline": "2026.01.15", "priority": "low", "status": "incomplete"}}"#,
        )
        .expect("write data");
        let state = JsonFileAdapter::in_dir(dir.path()).load().expect("load");
        assert!(state.records.is_empty());
        assert_eq!(state.warnings.len(), 1);
        assert!(state.warnings[0].to_string().contains("out of range"));
    }
}
