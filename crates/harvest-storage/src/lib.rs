//! Durable checkpoint storage for the index harvester.
//!
//! Two backends implement [`CheckpointStore`]:
//! - one JSON status file per target, replaced atomically on save
//! - a RocksDB column family (feature `rocksdb`, on by default)

#[cfg(feature = "rocksdb")]
pub mod column_families;
pub mod error;
pub mod file;
pub mod keys;
#[cfg(feature = "rocksdb")]
pub mod rocks;
pub mod store;

pub use error::StorageError;
pub use file::FileCheckpointStore;
pub use keys::CheckpointKey;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksCheckpointStore;
pub use store::{open_store, CheckpointStore};
