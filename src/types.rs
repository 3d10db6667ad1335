//! Core data model (§3): `SyncState`, `OperationHistory`, `SyncItem`,
//! `PendingChange`, `SyncPlanAction`, `ConflictAnalysis`, and the
//! enumerations that tie them together.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Status of a tracked path relative to the last known-good sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
	Synced,
	LocalNew,
	RemoteNew,
	LocalModified,
	RemoteModified,
	LocalDeleted,
	RemoteDeleted,
	Conflict,
	Error,
	Ignored,
}

impl SyncStatus {
	/// `getPendingStates()` excludes `Synced` and `Ignored` (§4.1)
	pub fn is_pending(self) -> bool {
		!matches!(self, SyncStatus::Synced | SyncStatus::Ignored)
	}
}

/// Kind of conflict the Planner detected between the two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictType {
	BothModified,
	DeletedLocallyModifiedRemotely,
	ModifiedLocallyDeletedRemotely,
	TypeConflict,
}

/// A resolution a `ConflictResolver` can hand back to the Executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolution {
	Ask,
	UseLocal,
	UseRemote,
	Skip,
	RenameLocal,
	RenameRemote,
	Merge,
}

/// Kind of change a `PendingChange` or `OperationHistory` row represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
	Created,
	Deleted,
	Changed,
	Renamed,
}

/// Action type carried by a `SyncPlanAction`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncActionType {
	Upload,
	Download,
	DeleteLocal,
	DeleteRemote,
	Conflict,
	Move,
}

/// Which side produced a `PendingChange`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeSource {
	Local,
	Remote,
}

/// State of a placeholder file the engine may create after a Download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VirtualFileState {
	/// No placeholder involved; the full file is materialized locally
	Full,
	/// A sparse placeholder stands in for the remote file
	Placeholder,
}

/// Durable baseline the engine keeps for a single path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
	pub id: String,
	pub path: String,
	pub size: u64,
	pub local_hash: Option<String>,
	pub remote_hash: Option<String>,
	pub local_modified: Option<SystemTime>,
	pub remote_modified: Option<SystemTime>,
	pub last_sync_time: Option<SystemTime>,
	pub status: SyncStatus,
	pub is_directory: bool,
}

impl SyncState {
	/// A fresh baseline for a path that has never been observed before
	pub fn new(path: impl Into<String>, is_directory: bool) -> Self {
		SyncState {
			id: uuid::Uuid::new_v4().to_string(),
			path: crate::path_util::normalize(&path.into()),
			size: 0,
			local_hash: None,
			remote_hash: None,
			local_modified: None,
			remote_modified: None,
			last_sync_time: None,
			status: SyncStatus::LocalNew,
			is_directory,
		}
	}
}

/// One immutable row in the append-only operation history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationHistory {
	pub id: String,
	pub path: String,
	pub action_type: SyncActionType,
	pub is_directory: bool,
	pub size: u64,
	pub source: ChangeSource,
	pub started_at: SystemTime,
	pub completed_at: SystemTime,
	pub success: bool,
	pub error_message: Option<String>,
	pub renamed_from: Option<String>,
	pub renamed_to: Option<String>,
}

/// A point-in-time snapshot of one entry as reported by a `Storage` listing
///
/// `SyncItem`s are never persisted; they are produced fresh by every
/// `listItems`/`getItem` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItem {
	pub path: String,
	pub is_directory: bool,
	pub size: u64,
	pub last_modified: SystemTime,
	pub permissions: Option<String>,
	pub mime_type: Option<String>,
	pub etag: Option<String>,
	pub is_symlink: bool,
}

/// A change a watcher or poll observed but the engine has not yet incorporated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
	pub path: String,
	pub change_type: ChangeType,
	pub size: u64,
	pub is_directory: bool,
	pub renamed_from: Option<String>,
	pub renamed_to: Option<String>,
	pub detected_at: SystemTime,
	pub source: ChangeSource,
}

/// One step of an ordered `SyncPlan`, ready for the Executor to act on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPlanAction {
	pub action_type: SyncActionType,
	pub path: String,
	pub is_directory: bool,
	pub size: u64,
	pub last_modified: Option<SystemTime>,
	pub conflict_type: Option<ConflictType>,
	pub priority: u32,
	pub will_create_placeholder: bool,
	pub current_virtual_state: VirtualFileState,
	/// Populated for `Move`/rename-derived actions (§4.3 rename expansion)
	pub renamed_from: Option<String>,
	pub renamed_to: Option<String>,
}

/// Which side's timestamp is newer, derived fact only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewerVersion {
	Local,
	Remote,
}

/// Derived analysis of one conflict, built once per conflict event (§4.4)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictAnalysis {
	pub file_path: String,
	pub conflict_type: ConflictType,
	pub local_item: Option<SyncItem>,
	pub remote_item: Option<SyncItem>,
	pub local_size: u64,
	pub remote_size: u64,
	pub size_difference: i64,
	pub local_modified: Option<SystemTime>,
	pub remote_modified: Option<SystemTime>,
	/// Absolute difference between the two timestamps, in seconds
	pub time_difference_secs: Option<u64>,
	pub newer_version: Option<NewerVersion>,
	pub is_likely_binary: bool,
	pub is_likely_text_file: bool,
	pub recommended_resolution: ConflictResolution,
	pub reasoning: String,
}

/// Aggregate result of a single `synchronize*` call (§7)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResult {
	pub success: bool,
	pub files_synchronized: usize,
	pub files_skipped: usize,
	pub files_conflicted: usize,
	pub files_deleted: usize,
	pub elapsed: std::time::Duration,
	pub error: Option<String>,
	pub details: Vec<String>,
}

/// Totals returned by `SyncStateStore::stats()` (§4.1)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStoreStats {
	pub by_status: std::collections::BTreeMap<String, usize>,
	pub database_size_bytes: u64,
}

// vim: ts=4
