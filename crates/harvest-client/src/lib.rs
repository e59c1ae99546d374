//! HTTP adapters for the index harvester.
//!
//! This crate provides:
//! - [`HttpHarvester`]: JSON client for a harvesting gateway
//! - [`HttpMessenger`]: JSON client for each index host's control endpoint
//!
//! Both implement the collaborator traits from `harvest-sync`; transport
//! and status failures surface as `SyncError::Harvest` or
//! `SyncError::Dispatch` respectively.
//!
//! # Example
//!
//! ```rust,no_run
//! use harvest_client::{HttpHarvester, HttpHarvesterConfig, HttpMessenger, HttpMessengerConfig};
//!
//! let harvester = HttpHarvester::new(HttpHarvesterConfig::default())?;
//! let messenger = HttpMessenger::new(HttpMessengerConfig::default())?;
//! # Ok::<(), harvest_client::ClientError>(())
//! ```

pub mod error;
pub mod harvester;
pub mod messenger;

pub use error::ClientError;
pub use harvester::{HttpHarvester, HttpHarvesterConfig};
pub use messenger::{HttpMessenger, HttpMessengerConfig};
