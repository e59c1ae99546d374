//! RocksDB checkpoint backend.
//!
//! All targets share one database; records live in the `checkpoints`
//! column family keyed by `checkpoint:{target}`. A single `put_cf` is atomic.

use std::path::Path;

use rocksdb::{Options, DB};
use tracing::{debug, info};

use harvest_types::Checkpoint;

use crate::column_families::{build_cf_descriptors, CF_CHECKPOINTS};
use crate::error::StorageError;
use crate::keys::CheckpointKey;
use crate::store::CheckpointStore;

/// Checkpoint store backed by RocksDB.
pub struct RocksCheckpointStore {
    db: DB,
}

impl RocksCheckpointStore {
    /// Open the database at `path`, creating it and its column families.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening checkpoint database at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;
        Ok(Self { db })
    }
}

impl CheckpointStore for RocksCheckpointStore {
    fn load(&self, target: &str) -> Result<Checkpoint, StorageError> {
        let cf = self
            .db
            .cf_handle(CF_CHECKPOINTS)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(CF_CHECKPOINTS.to_string()))?;

        let key = CheckpointKey::new(target)?;
        match self.db.get_cf(&cf, key.to_bytes())? {
            Some(bytes) => Ok(Checkpoint::from_bytes(&bytes)?),
            None => Ok(Checkpoint::new()),
        }
    }

    fn save(&self, target: &str, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        let cf = self
            .db
            .cf_handle(CF_CHECKPOINTS)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(CF_CHECKPOINTS.to_string()))?;

        let key = CheckpointKey::new(target)?;
        self.db.put_cf(&cf, key.to_bytes(), checkpoint.to_bytes()?)?;
        debug!(target = %target, "Saved checkpoint");
        Ok(())
    }

    fn name(&self) -> &str {
        "rocksdb"
    }
}
