//! A multi-write transaction handle over the store's tables.
//!
//! Grounded on `szilu-syncr::state::StateLock`: a guard that must be
//! explicitly committed, and silently discards its writes if dropped without
//! one (e.g. an early `?` return partway through a batch of updates).

use crate::error::StoreError;
use crate::types::SyncState;
use redb::{Database, WriteTransaction};

const STATES: redb::TableDefinition<&str, &[u8]> = redb::TableDefinition::new("sync_states");
const STATES_BY_STATUS: redb::TableDefinition<&str, ()> =
	redb::TableDefinition::new("sync_states_by_status");

pub(super) fn write_state(txn: &WriteTransaction, state: &SyncState) -> Result<(), StoreError> {
	let mut states = txn.open_table(STATES).map_err(|e| StoreError::Io(Box::new(e)))?;
	let mut by_status = txn.open_table(STATES_BY_STATUS).map_err(|e| StoreError::Io(Box::new(e)))?;

	// Drop any stale status-index entry before writing the new one; the
	// previous status (if any) is unknown here, so sweep all index entries
	// whose suffix matches this path.
	let stale: Vec<String> = by_status
		.iter()
		.map_err(|e| StoreError::Io(Box::new(e)))?
		.filter_map(|r| r.ok())
		.map(|(k, _)| k.value().to_string())
		.filter(|k| k.ends_with(&format!("\0{}", state.path)))
		.collect();
	for key in stale {
		by_status.remove(key.as_str()).map_err(|e| StoreError::Io(Box::new(e)))?;
	}

	let bytes =
		serde_json::to_vec(state).map_err(|e| StoreError::Corrupted { message: e.to_string() })?;
	states.insert(state.path.as_str(), bytes.as_slice()).map_err(|e| StoreError::Io(Box::new(e)))?;
	let index_key = format!("{:?}\0{}", state.status, state.path);
	by_status.insert(index_key.as_str(), ()).map_err(|e| StoreError::Io(Box::new(e)))?;
	Ok(())
}

pub(super) fn delete_state(txn: &WriteTransaction, path: &str) -> Result<(), StoreError> {
	let mut states = txn.open_table(STATES).map_err(|e| StoreError::Io(Box::new(e)))?;
	let mut by_status = txn.open_table(STATES_BY_STATUS).map_err(|e| StoreError::Io(Box::new(e)))?;
	states.remove(path).map_err(|e| StoreError::Io(Box::new(e)))?;
	let stale: Vec<String> = by_status
		.iter()
		.map_err(|e| StoreError::Io(Box::new(e)))?
		.filter_map(|r| r.ok())
		.map(|(k, _)| k.value().to_string())
		.filter(|k| k.ends_with(&format!("\0{}", path)))
		.collect();
	for key in stale {
		by_status.remove(key.as_str()).map_err(|e| StoreError::Io(Box::new(e)))?;
	}
	Ok(())
}

/// A transaction spanning multiple state writes/deletes; call [`Self::commit`]
/// to persist them. Dropping without committing rolls the whole batch back.
pub struct StoreTransaction<'a> {
	inner: Option<WriteTransaction>,
	_db: &'a Database,
}

impl<'a> StoreTransaction<'a> {
	pub(super) fn new(db: &'a Database) -> Result<Self, StoreError> {
		let inner = db.begin_write().map_err(|e| StoreError::Io(Box::new(e)))?;
		Ok(StoreTransaction { inner: Some(inner), _db: db })
	}

	pub fn write_state(&self, state: &SyncState) -> Result<(), StoreError> {
		let txn = self.inner.as_ref().ok_or(StoreError::TransactionAlreadyClosed)?;
		write_state(txn, state)
	}

	pub fn delete_state(&self, path: &str) -> Result<(), StoreError> {
		let txn = self.inner.as_ref().ok_or(StoreError::TransactionAlreadyClosed)?;
		delete_state(txn, path)
	}

	pub fn commit(mut self) -> Result<(), StoreError> {
		let txn = self.inner.take().ok_or(StoreError::TransactionAlreadyClosed)?;
		txn.commit().map_err(|e| StoreError::Io(Box::new(e)))
	}

	/// Explicit rollback; equivalent to dropping without committing
	pub fn rollback(mut self) {
		self.inner.take();
	}
}

impl<'a> Drop for StoreTransaction<'a> {
	fn drop(&mut self) {
		// redb rolls an uncommitted WriteTransaction back when it is dropped,
		// so taking no action here is sufficient; inner is simply discarded.
	}
}

// vim: ts=4
