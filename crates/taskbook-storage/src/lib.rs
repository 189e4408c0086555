use std::path::PathBuf;
use taskbook_core::{ModelError, RecordField, RecordId};
use thiserror::Error;

pub mod index;
pub mod persistence;
pub mod session;
pub mod store;

pub use index::{Dimension, IndexKey, SecondaryIndex};
pub use persistence::{JsonFileAdapter, LoadedState, PersistenceAdapter};
pub use session::{StoreSession, LOCK_FILE};
pub use store::RecordStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(RecordId),
    #[error("no records under {dimension} `{value}`")]
    DimensionValueNotFound {
        dimension: Dimension,
        value: &'static str,
    },
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field `{0}` cannot be edited directly")]
    ReadOnlyField(String),
    #[error("invalid value for {field}: {source}")]
    InvalidFieldValue {
        field: RecordField,
        #[source]
        source: ModelError,
    },
    #[error("malformed persisted state in {}: {message}", path.display())]
    MalformedPersistedState { path: PathBuf, message: String },
    #[error("store at {} is held by another session", path.display())]
    SessionLocked { path: PathBuf },
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
