//! Status-file checkpoint backend.
//!
//! Each target gets `{checkpoint_dir}/{target}.status.json`. Writes go to a
//! temporary file in the same directory which is then renamed over the old
//! record, so a failed write never leaves a truncated checkpoint behind.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use harvest_types::Checkpoint;

use crate::error::StorageError;
use crate::keys::CheckpointKey;
use crate::store::CheckpointStore;

/// Directory of JSON status files.
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Open the store, creating the directory if necessary.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        info!("Opening checkpoint directory at {:?}", dir);
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Path of the status file for `target`.
    pub fn path_for(&self, target: &str) -> Result<PathBuf, StorageError> {
        let key = CheckpointKey::new(target)?;
        Ok(self.dir.join(key.file_name()))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, target: &str) -> Result<Checkpoint, StorageError> {
        let path = self.path_for(target)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Checkpoint::from_bytes(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(target = %target, "No status file, using default checkpoint");
                Ok(Checkpoint::new())
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn save(&self, target: &str, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        let path = self.path_for(target)?;
        let bytes = checkpoint.to_bytes()?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;

        debug!(target = %target, path = ?path, "Saved checkpoint");
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}
