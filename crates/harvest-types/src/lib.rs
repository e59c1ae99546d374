//! # harvest-types
//!
//! Shared domain types for the incremental index harvester.
//!
//! This crate defines the data structures used throughout the system:
//! - Targets: one logical index fed by one harvesting endpoint
//! - Cursors: opaque timestamp or sequence positions, and the harvesting mode
//! - Checkpoints: durable per-target harvesting position
//! - Records: harvested change records and harvest pages
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use harvest_types::{Checkpoint, HarvestMode};
//!
//! let checkpoint = Checkpoint::new();
//! assert_eq!(checkpoint.mode, HarvestMode::Unknown);
//! ```

pub mod checkpoint;
pub mod config;
pub mod control;
pub mod cursor;
pub mod error;
pub mod record;
pub mod target;

pub use checkpoint::Checkpoint;
pub use config::{
    CheckpointBackend, HarvesterSettings, MessengerSettings, Settings, TargetSettings,
};
pub use control::{FlushStatus, SnapshotRequest};
pub use cursor::{Cursor, HarvestMode, ResponseCursor, StartCursor};
pub use error::ConfigError;
pub use record::{HarvestPage, RecordAction, UpdateRecord};
pub use target::Target;
