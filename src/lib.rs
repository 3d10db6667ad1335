//! # SharpSync - Embeddable, UI-Agnostic Bidirectional File-Synchronization Engine
//!
//! SharpSync keeps two `Storage` collaborators — a local filesystem and a
//! remote backend — synchronized against a durable state store, with
//! pluggable filtering, conflict resolution, and authentication. The engine
//! itself has no UI or CLI opinions: every observable action is either a
//! return value or an event on the `SyncEngine`'s event stream.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sharp_sync::executor::SyncEngine;
//! use sharp_sync::store::SyncStateStore;
//! use sharp_sync::filter::Filter;
//! use sharp_sync::change_tracker::ChangeTracker;
//! use sharp_sync::backends::LocalFilesystemStorage;
//! use sharp_sync::conflict::DefaultConflictResolver;
//! use sharp_sync::conflict::resolver::CancelToken;
//! use sharp_sync::options::SyncOptions;
//! use sharp_sync::types::ConflictResolution;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SyncStateStore::open(std::path::Path::new("state.redb"))?;
//!     store.initialize()?;
//!     let filter = Filter::with_defaults();
//!     let tracker = ChangeTracker::new(Filter::with_defaults());
//!     let local = Arc::new(LocalFilesystemStorage::new("./local"));
//!     let remote = Arc::new(LocalFilesystemStorage::new("./remote"));
//!     let resolver = Arc::new(DefaultConflictResolver::new(ConflictResolution::UseLocal));
//!     let (engine, _events) = SyncEngine::new(store, filter, tracker, local, remote, resolver);
//!
//!     let result = engine.synchronize(&SyncOptions::default(), &CancelToken::new()).await?;
//!     println!("synced {} files", result.files_synchronized);
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(dead_code)]

pub mod backends;
pub mod change_tracker;
pub mod conflict;
pub mod error;
pub mod events;
pub mod executor;
pub mod filter;
pub mod logging;
pub mod options;
pub mod path_util;
pub mod planner;
pub mod storage;
pub mod store;
pub mod token_provider;
pub mod types;
pub mod util;

// Re-export the pieces most host applications need without reaching into submodules.
pub use conflict::{ConflictResolver, DefaultConflictResolver, SmartConflictResolver};
pub use error::{FilterError, SharpSyncError, StoreError, TrackerError};
pub use executor::SyncEngine;
pub use options::{SyncOptions, SyncOptionsBuilder};
pub use storage::Storage;
pub use store::SyncStateStore;
pub use types::{
	ChangeType, ConflictResolution, ConflictType, SyncActionType, SyncPlanAction, SyncResult,
	SyncStatus,
};

// vim: ts=4
