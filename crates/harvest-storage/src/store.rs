//! Checkpoint store abstraction.
//!
//! A store holds one record per target. `save` overwrites the whole record;
//! a missing record loads as the default `{mode: unknown}` checkpoint.

use std::path::Path;
use std::sync::Arc;

use harvest_types::{Checkpoint, CheckpointBackend};

use crate::error::StorageError;
use crate::file::FileCheckpointStore;

/// Durable per-target checkpoint persistence.
pub trait CheckpointStore: Send + Sync {
    /// Load the checkpoint for `target`, or the default when none exists.
    fn load(&self, target: &str) -> Result<Checkpoint, StorageError>;

    /// Overwrite the checkpoint for `target`.
    ///
    /// On error the previously stored record must still be intact.
    fn save(&self, target: &str, checkpoint: &Checkpoint) -> Result<(), StorageError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Open the configured backend at `path`.
pub fn open_store(
    backend: CheckpointBackend,
    path: &Path,
) -> Result<Arc<dyn CheckpointStore>, StorageError> {
    match backend {
        CheckpointBackend::File => Ok(Arc::new(FileCheckpointStore::open(path)?)),
        #[cfg(feature = "rocksdb")]
        CheckpointBackend::Rocksdb => Ok(Arc::new(crate::rocks::RocksCheckpointStore::open(
            path,
        )?)),
        #[cfg(not(feature = "rocksdb"))]
        CheckpointBackend::Rocksdb => Err(StorageError::Unsupported(
            "built without the rocksdb feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_types::HarvestMode;
    use tempfile::TempDir;

    #[test]
    fn test_open_file_store() {
        let temp = TempDir::new().unwrap();
        let store = open_store(CheckpointBackend::File, temp.path()).unwrap();
        assert_eq!(store.name(), "file");
        assert_eq!(store.load("enwiki").unwrap().mode, HarvestMode::Unknown);
    }
}
