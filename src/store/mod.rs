//! The sync-state store (§4.1, §6.3)
//!
//! A durable `path -> SyncState` mapping plus an append-only operation
//! history, backed by `redb` — the embedded key-value store already used
//! by `szilu-syncr::cache::ChildCache` for its per-file incremental-scan
//! cache. An embedded key-value store stands in for a SQLite-backed
//! design as long as it offers atomic multi-key updates, prefix scans,
//! and the equivalent of the secondary indexes below.

mod txn;

pub use txn::StoreTransaction;

use crate::error::StoreError;
use crate::types::{OperationHistory, SyncState, SyncStatus};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// `path -> JSON(SyncState)`
const STATES: TableDefinition<&str, &[u8]> = TableDefinition::new("sync_states");

/// Secondary index: `"{status}\0{path}" -> ()`, enabling `get_pending_states`
/// and `stats` without a full table scan (§4.1 "indexes: by status")
const STATES_BY_STATUS: TableDefinition<&str, ()> = TableDefinition::new("sync_states_by_status");

/// `big-endian u64 sequence -> JSON(OperationHistory)`; insertion order is
/// time order, giving `get_recent_operations` its "newest first" index for
/// free via a reverse range scan (§4.1 "index: by completedAt DESC")
const HISTORY: TableDefinition<u64, &[u8]> = TableDefinition::new("operation_history");

fn status_key(status: SyncStatus, path: &str) -> String {
	format!("{:?}\0{}", status, path)
}

/// Durable mapping `path -> SyncState` plus the append-only history log
pub struct SyncStateStore {
	db: Arc<Database>,
	db_path: std::path::PathBuf,
	next_history_seq: AtomicU64,
	initialized: std::sync::atomic::AtomicBool,
}

impl SyncStateStore {
	/// Open (creating if absent) the redb database backing this store
	pub fn open(db_path: &Path) -> Result<Self, StoreError> {
		let db = Database::create(db_path).map_err(|e| StoreError::Io(Box::new(e)))?;
		Ok(SyncStateStore {
			db: Arc::new(db),
			db_path: db_path.to_path_buf(),
			next_history_seq: AtomicU64::new(0),
			initialized: std::sync::atomic::AtomicBool::new(false),
		})
	}

	/// Creates the table schema; must be called before any other method
	pub fn initialize(&self) -> Result<(), StoreError> {
		let write_txn = self.db.begin_write().map_err(|e| StoreError::Io(Box::new(e)))?;
		{
			let _ = write_txn.open_table(STATES).map_err(|e| StoreError::Io(Box::new(e)))?;
			let _ =
				write_txn.open_table(STATES_BY_STATUS).map_err(|e| StoreError::Io(Box::new(e)))?;
			let _ = write_txn.open_table(HISTORY).map_err(|e| StoreError::Io(Box::new(e)))?;
		}
		write_txn.commit().map_err(|e| StoreError::Io(Box::new(e)))?;

		// Resume the history sequence counter from whatever is already on disk.
		let read_txn = self.db.begin_read().map_err(|e| StoreError::Io(Box::new(e)))?;
		let table = read_txn.open_table(HISTORY).map_err(|e| StoreError::Io(Box::new(e)))?;
		if let Some(Ok((key, _))) = table.iter().map_err(|e| StoreError::Io(Box::new(e)))?.next_back() {
			self.next_history_seq.store(key.value() + 1, Ordering::SeqCst);
		}

		self.initialized.store(true, Ordering::SeqCst);
		Ok(())
	}

	fn check_initialized(&self) -> Result<(), StoreError> {
		if self.initialized.load(Ordering::SeqCst) {
			Ok(())
		} else {
			Err(StoreError::NotInitialized)
		}
	}

	pub fn get_state(&self, path: &str) -> Result<Option<SyncState>, StoreError> {
		self.check_initialized()?;
		let normalized = crate::path_util::normalize(path);
		let read_txn = self.db.begin_read().map_err(|e| StoreError::Io(Box::new(e)))?;
		let table = read_txn.open_table(STATES).map_err(|e| StoreError::Io(Box::new(e)))?;
		match table.get(normalized.as_str()).map_err(|e| StoreError::Io(Box::new(e)))? {
			Some(bytes) => {
				let state: SyncState = serde_json::from_slice(bytes.value())
					.map_err(|e| StoreError::Corrupted { message: e.to_string() })?;
				Ok(Some(state))
			}
			None => Ok(None),
		}
	}

	pub fn update_state(&self, state: &SyncState) -> Result<(), StoreError> {
		self.check_initialized()?;
		let write_txn = self.db.begin_write().map_err(|e| StoreError::Io(Box::new(e)))?;
		txn::write_state(&write_txn, state)?;
		write_txn.commit().map_err(|e| StoreError::Io(Box::new(e)))
	}

	pub fn delete_state(&self, path: &str) -> Result<(), StoreError> {
		self.check_initialized()?;
		let normalized = crate::path_util::normalize(path);
		let write_txn = self.db.begin_write().map_err(|e| StoreError::Io(Box::new(e)))?;
		txn::delete_state(&write_txn, &normalized)?;
		write_txn.commit().map_err(|e| StoreError::Io(Box::new(e)))
	}

	pub fn clear(&self) -> Result<(), StoreError> {
		self.check_initialized()?;
		let write_txn = self.db.begin_write().map_err(|e| StoreError::Io(Box::new(e)))?;
		{
			let mut states = write_txn.open_table(STATES).map_err(|e| StoreError::Io(Box::new(e)))?;
			let mut by_status =
				write_txn.open_table(STATES_BY_STATUS).map_err(|e| StoreError::Io(Box::new(e)))?;
			let keys: Vec<String> = states
				.iter()
				.map_err(|e| StoreError::Io(Box::new(e)))?
				.filter_map(|r| r.ok())
				.map(|(k, _)| k.value().to_string())
				.collect();
			for key in &keys {
				states.remove(key.as_str()).map_err(|e| StoreError::Io(Box::new(e)))?;
			}
			let index_keys: Vec<String> = by_status
				.iter()
				.map_err(|e| StoreError::Io(Box::new(e)))?
				.filter_map(|r| r.ok())
				.map(|(k, _)| k.value().to_string())
				.collect();
			for key in &index_keys {
				by_status.remove(key.as_str()).map_err(|e| StoreError::Io(Box::new(e)))?;
			}
		}
		write_txn.commit().map_err(|e| StoreError::Io(Box::new(e)))
	}

	pub fn get_all_states(&self) -> Result<Vec<SyncState>, StoreError> {
		self.check_initialized()?;
		let read_txn = self.db.begin_read().map_err(|e| StoreError::Io(Box::new(e)))?;
		let table = read_txn.open_table(STATES).map_err(|e| StoreError::Io(Box::new(e)))?;
		let mut out = Vec::new();
		for row in table.iter().map_err(|e| StoreError::Io(Box::new(e)))? {
			let (_, value) = row.map_err(|e| StoreError::Io(Box::new(e)))?;
			let state: SyncState = serde_json::from_slice(value.value())
				.map_err(|e| StoreError::Corrupted { message: e.to_string() })?;
			out.push(state);
		}
		Ok(out)
	}

	/// `status NOT IN (Synced, Ignored)` (§4.1)
	pub fn get_pending_states(&self) -> Result<Vec<SyncState>, StoreError> {
		Ok(self.get_all_states()?.into_iter().filter(|s| s.status.is_pending()).collect())
	}

	/// `path = prefix OR path LIKE prefix/%` (§4.1)
	pub fn get_states_by_prefix(&self, prefix: &str) -> Result<Vec<SyncState>, StoreError> {
		Ok(self
			.get_all_states()?
			.into_iter()
			.filter(|s| crate::path_util::is_prefix_or_self(prefix, &s.path))
			.collect())
	}

	pub fn begin_transaction(&self) -> Result<StoreTransaction<'_>, StoreError> {
		self.check_initialized()?;
		StoreTransaction::new(&self.db)
	}

	pub fn log_operation(&self, mut entry: OperationHistory) -> Result<(), StoreError> {
		self.check_initialized()?;
		let seq = self.next_history_seq.fetch_add(1, Ordering::SeqCst);
		if entry.id.is_empty() {
			entry.id = uuid::Uuid::new_v4().to_string();
		}
		let write_txn = self.db.begin_write().map_err(|e| StoreError::Io(Box::new(e)))?;
		{
			let mut table = write_txn.open_table(HISTORY).map_err(|e| StoreError::Io(Box::new(e)))?;
			let bytes = serde_json::to_vec(&entry)
				.map_err(|e| StoreError::Corrupted { message: e.to_string() })?;
			table.insert(seq, bytes.as_slice()).map_err(|e| StoreError::Io(Box::new(e)))?;
		}
		write_txn.commit().map_err(|e| StoreError::Io(Box::new(e)))
	}

	/// Newest first, optionally bounded by `since` (§4.1)
	pub fn get_recent_operations(
		&self,
		limit: usize,
		since: Option<SystemTime>,
	) -> Result<Vec<OperationHistory>, StoreError> {
		self.check_initialized()?;
		let read_txn = self.db.begin_read().map_err(|e| StoreError::Io(Box::new(e)))?;
		let table = read_txn.open_table(HISTORY).map_err(|e| StoreError::Io(Box::new(e)))?;
		let mut out = Vec::new();
		for row in table.iter().map_err(|e| StoreError::Io(Box::new(e)))?.rev() {
			let (_, value) = row.map_err(|e| StoreError::Io(Box::new(e)))?;
			let entry: OperationHistory = serde_json::from_slice(value.value())
				.map_err(|e| StoreError::Corrupted { message: e.to_string() })?;
			if let Some(since) = since {
				if entry.completed_at < since {
					continue;
				}
			}
			out.push(entry);
			if out.len() >= limit {
				break;
			}
		}
		Ok(out)
	}

	/// Returns the number of rows deleted (§4.1)
	pub fn clear_operation_history(&self, older_than: SystemTime) -> Result<usize, StoreError> {
		self.check_initialized()?;
		let write_txn = self.db.begin_write().map_err(|e| StoreError::Io(Box::new(e)))?;
		let mut deleted = 0usize;
		{
			let mut table = write_txn.open_table(HISTORY).map_err(|e| StoreError::Io(Box::new(e)))?;
			let stale_keys: Vec<u64> = table
				.iter()
				.map_err(|e| StoreError::Io(Box::new(e)))?
				.filter_map(|r| r.ok())
				.filter_map(|(k, v)| {
					let entry: OperationHistory = serde_json::from_slice(v.value()).ok()?;
					if entry.completed_at < older_than {
						Some(k.value())
					} else {
						None
					}
				})
				.collect();
			for key in stale_keys {
				table.remove(key).map_err(|e| StoreError::Io(Box::new(e)))?;
				deleted += 1;
			}
		}
		write_txn.commit().map_err(|e| StoreError::Io(Box::new(e)))?;
		Ok(deleted)
	}

	pub fn stats(&self) -> Result<crate::types::SyncStoreStats, StoreError> {
		let states = self.get_all_states()?;
		let mut by_status = std::collections::BTreeMap::new();
		for state in &states {
			*by_status.entry(format!("{:?}", state.status)).or_insert(0usize) += 1;
		}
		let database_size_bytes =
			std::fs::metadata(self.db_path.as_path()).map(|m| m.len()).unwrap_or(0);
		Ok(crate::types::SyncStoreStats { by_status, database_size_bytes })
	}
}


// vim: ts=4
