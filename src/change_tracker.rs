//! Thread-safe pending-change tracking (§4.3)
//!
//! Two maps — local and remote — each keyed by normalized path, guarded by
//! a `tokio::sync::RwLock` the way `szilu-syncr::chunk_tracker::ChunkTracker`
//! guards its chunk location maps. `notify*` takes the write side; `snapshot*`
//! takes the read side and clones out, so it never blocks writers for longer
//! than the copy itself.

use crate::error::TrackerError;
use crate::filter::Filter;
use crate::types::{ChangeSource, ChangeType, PendingChange};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use tokio::sync::RwLock;

/// Pending local and remote changes awaiting incorporation into a plan
pub struct ChangeTracker {
	local: RwLock<HashMap<String, PendingChange>>,
	remote: RwLock<HashMap<String, PendingChange>>,
	filter: Filter,
	disposed: AtomicBool,
}

impl ChangeTracker {
	pub fn new(filter: Filter) -> Self {
		ChangeTracker {
			local: RwLock::new(HashMap::new()),
			remote: RwLock::new(HashMap::new()),
			filter,
			disposed: AtomicBool::new(false),
		}
	}

	fn check_alive(&self) -> Result<(), TrackerError> {
		if self.disposed.load(Ordering::Acquire) {
			Err(TrackerError::Disposed)
		} else {
			Ok(())
		}
	}

	/// Tear the tracker down; every subsequent call fails `Disposed`
	pub fn dispose(&self) {
		self.disposed.store(true, Ordering::Release);
	}

	pub async fn notify_local(&self, change: PendingChange) -> Result<(), TrackerError> {
		self.notify(&self.local, change).await
	}

	pub async fn notify_remote(&self, change: PendingChange) -> Result<(), TrackerError> {
		self.notify(&self.remote, change).await
	}

	pub async fn notify_local_batch(
		&self,
		changes: Vec<PendingChange>,
	) -> Result<(), TrackerError> {
		for change in changes {
			self.notify_local(change).await?;
		}
		Ok(())
	}

	pub async fn notify_remote_batch(
		&self,
		changes: Vec<PendingChange>,
	) -> Result<(), TrackerError> {
		for change in changes {
			self.notify_remote(change).await?;
		}
		Ok(())
	}

	/// A rename expands to a paired delete+create (§4.3)
	pub async fn notify_local_rename(
		&self,
		old_path: &str,
		new_path: &str,
		size: u64,
		is_directory: bool,
	) -> Result<(), TrackerError> {
		self.notify_rename(&self.local, ChangeSource::Local, old_path, new_path, size, is_directory)
			.await
	}

	pub async fn notify_remote_rename(
		&self,
		old_path: &str,
		new_path: &str,
		size: u64,
		is_directory: bool,
	) -> Result<(), TrackerError> {
		self.notify_rename(
			&self.remote,
			ChangeSource::Remote,
			old_path,
			new_path,
			size,
			is_directory,
		)
		.await
	}

	async fn notify_rename(
		&self,
		map: &RwLock<HashMap<String, PendingChange>>,
		source: ChangeSource,
		old_path: &str,
		new_path: &str,
		size: u64,
		is_directory: bool,
	) -> Result<(), TrackerError> {
		self.check_alive()?;
		let old_norm = crate::path_util::normalize(old_path);
		let new_norm = crate::path_util::normalize(new_path);
		let now = SystemTime::now();

		if self.filter.should_sync(&old_norm) {
			let deleted = PendingChange {
				path: old_norm.clone(),
				change_type: ChangeType::Deleted,
				size: 0,
				is_directory,
				renamed_from: None,
				renamed_to: Some(new_norm.clone()),
				detected_at: now,
				source,
			};
			self.insert_merged(map, deleted).await;
		}

		if self.filter.should_sync(&new_norm) {
			let created = PendingChange {
				path: new_norm.clone(),
				change_type: ChangeType::Created,
				size,
				is_directory,
				renamed_from: Some(old_norm),
				renamed_to: None,
				detected_at: now,
				source,
			};
			self.insert_merged(map, created).await;
		}

		Ok(())
	}

	async fn notify(
		&self,
		map: &RwLock<HashMap<String, PendingChange>>,
		mut change: PendingChange,
	) -> Result<(), TrackerError> {
		self.check_alive()?;
		change.path = crate::path_util::normalize(&change.path);
		if !self.filter.should_sync(&change.path) {
			return Ok(());
		}
		self.insert_merged(map, change).await;
		Ok(())
	}

	/// Apply the merge rules from §4.3 and insert
	async fn insert_merged(&self, map: &RwLock<HashMap<String, PendingChange>>, change: PendingChange) {
		let mut guard = map.write().await;
		match guard.get(&change.path) {
			None => {
				guard.insert(change.path.clone(), change);
			}
			Some(existing) => {
				let merged = merge(existing, &change);
				guard.insert(change.path.clone(), merged);
			}
		}
	}

	pub async fn clear_local(&self) -> Result<(), TrackerError> {
		self.check_alive()?;
		self.local.write().await.clear();
		Ok(())
	}

	pub async fn clear_remote(&self) -> Result<(), TrackerError> {
		self.check_alive()?;
		self.remote.write().await.clear();
		Ok(())
	}

	pub async fn snapshot_local(&self) -> Result<Vec<PendingChange>, TrackerError> {
		self.check_alive()?;
		Ok(self.local.read().await.values().cloned().collect())
	}

	pub async fn snapshot_remote(&self) -> Result<Vec<PendingChange>, TrackerError> {
		self.check_alive()?;
		Ok(self.remote.read().await.values().cloned().collect())
	}

	/// Remove one incorporated entry from the local map (by normalized path)
	pub async fn remove_local(&self, path: &str) -> Result<(), TrackerError> {
		self.check_alive()?;
		self.local.write().await.remove(&crate::path_util::normalize(path));
		Ok(())
	}

	pub async fn remove_remote(&self, path: &str) -> Result<(), TrackerError> {
		self.check_alive()?;
		self.remote.write().await.remove(&crate::path_util::normalize(path));
		Ok(())
	}

	pub async fn local_pending_count(&self) -> Result<usize, TrackerError> {
		self.check_alive()?;
		Ok(self.local.read().await.len())
	}

	pub async fn remote_pending_count(&self) -> Result<usize, TrackerError> {
		self.check_alive()?;
		Ok(self.remote.read().await.len())
	}

	pub async fn is_empty(&self) -> Result<bool, TrackerError> {
		self.check_alive()?;
		Ok(self.local.read().await.is_empty() && self.remote.read().await.is_empty())
	}
}

/// The merge rules from §4.3, applied when a new notification arrives for
/// an already-pending path.
fn merge(existing: &PendingChange, incoming: &PendingChange) -> PendingChange {
	match (existing.change_type, incoming.change_type) {
		// Deleted always supersedes any prior pending entry.
		(_, ChangeType::Deleted) => incoming.clone(),
		// Created after a prior Deleted collapses to Changed: the path
		// existed, disappeared, and reappeared — treat as a modification.
		(ChangeType::Deleted, ChangeType::Created) => PendingChange {
			change_type: ChangeType::Changed,
			..incoming.clone()
		},
		// Two Created or two Changed: keep the latest detected_at.
		(ChangeType::Created, ChangeType::Created) | (ChangeType::Changed, ChangeType::Changed) => {
			if incoming.detected_at >= existing.detected_at {
				incoming.clone()
			} else {
				existing.clone()
			}
		}
		// Any other combination: the newest notification wins.
		_ => incoming.clone(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::filter::Filter;

	fn change(path: &str, kind: ChangeType) -> PendingChange {
		PendingChange {
			path: path.to_string(),
			change_type: kind,
			size: 10,
			is_directory: false,
			renamed_from: None,
			renamed_to: None,
			detected_at: SystemTime::now(),
			source: ChangeSource::Local,
		}
	}

	#[tokio::test]
	async fn created_then_deleted_yields_deleted() {
		let tracker = ChangeTracker::new(Filter::with_defaults());
		tracker.notify_local(change("a.txt", ChangeType::Created)).await.unwrap();
		tracker.notify_local(change("a.txt", ChangeType::Deleted)).await.unwrap();
		let snap = tracker.snapshot_local().await.unwrap();
		assert_eq!(snap.len(), 1);
		assert_eq!(snap[0].change_type, ChangeType::Deleted);
	}

	#[tokio::test]
	async fn deleted_then_created_yields_changed() {
		let tracker = ChangeTracker::new(Filter::with_defaults());
		tracker.notify_local(change("a.txt", ChangeType::Deleted)).await.unwrap();
		tracker.notify_local(change("a.txt", ChangeType::Created)).await.unwrap();
		let snap = tracker.snapshot_local().await.unwrap();
		assert_eq!(snap.len(), 1);
		assert_eq!(snap[0].change_type, ChangeType::Changed);
	}

	#[tokio::test]
	async fn rename_expands_to_delete_and_create() {
		let tracker = ChangeTracker::new(Filter::with_defaults());
		tracker.notify_local_rename("old.txt", "new.txt", 100, false).await.unwrap();
		let snap = tracker.snapshot_local().await.unwrap();
		assert_eq!(snap.len(), 2);
		let deleted = snap.iter().find(|c| c.path == "old.txt").unwrap();
		assert_eq!(deleted.change_type, ChangeType::Deleted);
		assert_eq!(deleted.renamed_to.as_deref(), Some("new.txt"));
		let created = snap.iter().find(|c| c.path == "new.txt").unwrap();
		assert_eq!(created.change_type, ChangeType::Created);
		assert_eq!(created.renamed_from.as_deref(), Some("old.txt"));
	}

	#[tokio::test]
	async fn excluded_paths_are_silently_dropped() {
		let filter = Filter::new(&[], &["*.tmp".to_string()]).unwrap();
		let tracker = ChangeTracker::new(filter);
		tracker.notify_local(change("scratch.tmp", ChangeType::Created)).await.unwrap();
		assert!(tracker.snapshot_local().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn operations_after_dispose_fail() {
		let tracker = ChangeTracker::new(Filter::with_defaults());
		tracker.dispose();
		let err = tracker.notify_local(change("a.txt", ChangeType::Created)).await;
		assert_eq!(err, Err(TrackerError::Disposed));
	}

	#[tokio::test]
	async fn paths_are_normalized_before_lookup() {
		let tracker = ChangeTracker::new(Filter::with_defaults());
		tracker.notify_local(change("a\\b.txt", ChangeType::Created)).await.unwrap();
		tracker.notify_local(change("/a/b.txt/", ChangeType::Changed)).await.unwrap();
		let snap = tracker.snapshot_local().await.unwrap();
		assert_eq!(snap.len(), 1);
		assert_eq!(snap[0].path, "a/b.txt");
	}

	#[tokio::test]
	async fn two_created_keep_latest() {
		let tracker = ChangeTracker::new(Filter::with_defaults());
		let mut first = change("a.txt", ChangeType::Created);
		first.detected_at = SystemTime::UNIX_EPOCH;
		let mut second = change("a.txt", ChangeType::Created);
		second.size = 999;
		second.detected_at = SystemTime::now();

		tracker.notify_local(first).await.unwrap();
		tracker.notify_local(second).await.unwrap();

		let snap = tracker.snapshot_local().await.unwrap();
		assert_eq!(snap[0].size, 999);
	}
}

// vim: ts=4
