//! End-to-end sync scenarios, driven entirely through the public
//! `SyncEngine` surface against two `LocalFilesystemStorage` roots — the
//! same "second local root stands in for remote" pattern the crate's own
//! unit tests use, scaled up to full scenario coverage.

use async_trait::async_trait;
use sharp_sync::backends::LocalFilesystemStorage;
use sharp_sync::change_tracker::ChangeTracker;
use sharp_sync::conflict::resolver::CancelToken;
use sharp_sync::conflict::{DefaultConflictResolver, SmartConflictResolver};
use sharp_sync::error::SharpSyncError;
use sharp_sync::filter::Filter;
use sharp_sync::options::SyncOptions;
use sharp_sync::storage::{ByteStream, ChangeInfo, Storage, StorageInfo, StorageType};
use sharp_sync::store::SyncStateStore;
use sharp_sync::types::{ChangeType, ConflictResolution, PendingChange, SyncActionType, SyncItem};
use sharp_sync::util;
use sharp_sync::SyncEngine;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn store_at(dir: &TempDir) -> SyncStateStore {
	let store = SyncStateStore::open(&dir.path().join("state.redb")).unwrap();
	store.initialize().unwrap();
	store
}

fn engine(
	local_root: &TempDir,
	remote_root: &TempDir,
	store_dir: &TempDir,
	resolver: Arc<dyn sharp_sync::ConflictResolver>,
) -> (SyncEngine, sharp_sync::events::EventReceiver) {
	let store = store_at(store_dir);
	let filter = Filter::with_defaults();
	let tracker = ChangeTracker::new(Filter::with_defaults());
	let local = Arc::new(LocalFilesystemStorage::new(local_root.path()));
	let remote = Arc::new(LocalFilesystemStorage::new(remote_root.path()));
	SyncEngine::new(store, filter, tracker, local, remote, resolver)
}

fn bump_mtime(path: &std::path::Path, ahead_by: Duration) {
	let target = SystemTime::now() + ahead_by;
	filetime::set_file_mtime(path, filetime::FileTime::from_system_time(target)).unwrap();
}

async fn drain(rx: &mut sharp_sync::events::EventReceiver) -> Vec<sharp_sync::events::SyncEvent> {
	let mut out = Vec::new();
	while let Ok(event) = rx.try_recv() {
		out.push(event);
	}
	out
}

/// S1: both sides modified, Smart resolver, remote strictly newer.
#[tokio::test]
async fn s1_both_modified_smart_resolver_remote_newer() {
	let local_dir = TempDir::new().unwrap();
	let remote_dir = TempDir::new().unwrap();
	let store_dir = TempDir::new().unwrap();

	tokio::fs::write(local_dir.path().join("conflict.txt"), "initial").await.unwrap();
	tokio::fs::write(remote_dir.path().join("conflict.txt"), "initial").await.unwrap();

	let resolver = Arc::new(SmartConflictResolver::new(ConflictResolution::UseLocal));
	let (engine, mut _rx) = engine(&local_dir, &remote_dir, &store_dir, resolver);
	let cancel = CancelToken::new();
	engine.synchronize(&SyncOptions::default(), &cancel).await.unwrap();

	tokio::fs::write(local_dir.path().join("conflict.txt"), "local wins").await.unwrap();
	bump_mtime(&local_dir.path().join("conflict.txt"), Duration::from_secs(5));
	tokio::fs::write(remote_dir.path().join("conflict.txt"), "remote loses").await.unwrap();
	bump_mtime(&remote_dir.path().join("conflict.txt"), Duration::from_secs(15));

	let options = SyncOptions { update_existing: true, ..Default::default() };
	let result = engine.synchronize(&options, &cancel).await.unwrap();

	assert_eq!(result.files_conflicted, 0);
	assert!(result.files_synchronized >= 1);
	let content = tokio::fs::read_to_string(local_dir.path().join("conflict.txt")).await.unwrap();
	assert_eq!(content, "remote loses");
}

/// S2: RenameLocal when the first candidate rename target already exists.
#[tokio::test]
async fn s2_rename_local_with_existing_conflict_named_file() {
	let local_dir = TempDir::new().unwrap();
	let remote_dir = TempDir::new().unwrap();
	let store_dir = TempDir::new().unwrap();
	let host = util::hostname();

	tokio::fs::write(local_dir.path().join("conflict.txt"), "local content").await.unwrap();
	tokio::fs::write(
		local_dir.path().join(format!("conflict ({}).txt", host)),
		"existing",
	)
	.await
	.unwrap();
	tokio::fs::write(remote_dir.path().join("conflict.txt"), "remote content").await.unwrap();
	bump_mtime(&remote_dir.path().join("conflict.txt"), Duration::from_secs(10));

	let resolver = Arc::new(DefaultConflictResolver::new(ConflictResolution::RenameLocal));
	let (engine, _rx) = engine(&local_dir, &remote_dir, &store_dir, resolver);
	let cancel = CancelToken::new();
	let result = engine.synchronize(&SyncOptions::default(), &cancel).await.unwrap();
	assert!(result.success);

	let conflict = tokio::fs::read_to_string(local_dir.path().join("conflict.txt")).await.unwrap();
	assert_eq!(conflict, "remote content");

	let preexisting =
		tokio::fs::read_to_string(local_dir.path().join(format!("conflict ({}).txt", host))).await.unwrap();
	assert_eq!(preexisting, "existing");

	let renamed =
		tokio::fs::read_to_string(local_dir.path().join(format!("conflict ({} 2).txt", host)))
			.await
			.unwrap();
	assert_eq!(renamed, "local content");
}

/// S3: a backend-reported change carrying rename metadata surfaces in the plan.
#[tokio::test]
async fn s3_poll_incorporated_change_with_rename_metadata() {
	let local_dir = TempDir::new().unwrap();
	let remote_dir = TempDir::new().unwrap();
	let store_dir = TempDir::new().unwrap();

	tokio::fs::write(remote_dir.path().join("new_name.txt"), vec![0u8; 100]).await.unwrap();

	let resolver = Arc::new(DefaultConflictResolver::new(ConflictResolution::Skip));
	let (engine, _rx) = engine(&local_dir, &remote_dir, &store_dir, resolver);
	engine
		.notify_remote(PendingChange {
			path: "new_name.txt".to_string(),
			change_type: ChangeType::Created,
			size: 100,
			is_directory: false,
			renamed_from: Some("old_name.txt".to_string()),
			renamed_to: None,
			detected_at: SystemTime::now(),
			source: sharp_sync::types::ChangeSource::Remote,
		})
		.await
		.unwrap();

	let plan = engine.get_pending_operations().await.unwrap();
	let download = plan.iter().find(|a| a.path == "new_name.txt").unwrap();
	assert_eq!(download.action_type, SyncActionType::Download);
	assert_eq!(download.renamed_from.as_deref(), Some("old_name.txt"));
}

/// S4: a locally-deleted, previously-synced file is also removed remotely
/// when `deleteExtraneous` is set.
#[tokio::test]
async fn s4_delete_extraneous() {
	let local_dir = TempDir::new().unwrap();
	let remote_dir = TempDir::new().unwrap();
	let store_dir = TempDir::new().unwrap();

	tokio::fs::write(local_dir.path().join("tracked.txt"), "content").await.unwrap();
	tokio::fs::write(remote_dir.path().join("tracked.txt"), "content").await.unwrap();

	let resolver = Arc::new(DefaultConflictResolver::new(ConflictResolution::Skip));
	let (engine, _rx) = engine(&local_dir, &remote_dir, &store_dir, resolver);
	let cancel = CancelToken::new();
	engine.synchronize(&SyncOptions::default(), &cancel).await.unwrap();

	tokio::fs::remove_file(local_dir.path().join("tracked.txt")).await.unwrap();

	let options = SyncOptions { delete_extraneous: true, ..Default::default() };
	let result = engine.synchronize(&options, &cancel).await.unwrap();

	assert!(!remote_dir.path().join("tracked.txt").exists());
	assert_eq!(result.files_deleted, 1);
	assert!(engine.get_stats().unwrap().by_status.values().sum::<usize>() == 0);
}

/// A `Storage` decorator that sleeps before every write, simulating a slow
/// backend so a concurrent second `synchronize()` call reliably overlaps.
struct SlowStorage {
	inner: LocalFilesystemStorage,
	delay: Duration,
}

#[async_trait]
impl Storage for SlowStorage {
	fn storage_type(&self) -> StorageType {
		self.inner.storage_type()
	}
	fn root_path(&self) -> &str {
		self.inner.root_path()
	}
	async fn test_connection(&self) -> Result<(), SharpSyncError> {
		self.inner.test_connection().await
	}
	async fn list_items(&self, prefix: &str) -> Result<Vec<SyncItem>, SharpSyncError> {
		self.inner.list_items(prefix).await
	}
	async fn get_item(&self, path: &str) -> Result<Option<SyncItem>, SharpSyncError> {
		self.inner.get_item(path).await
	}
	async fn exists(&self, path: &str) -> Result<bool, SharpSyncError> {
		self.inner.exists(path).await
	}
	async fn read_file(&self, path: &str) -> Result<ByteStream, SharpSyncError> {
		self.inner.read_file(path).await
	}
	async fn write_file(&self, path: &str, content: ByteStream) -> Result<(), SharpSyncError> {
		tokio::time::sleep(self.delay).await;
		self.inner.write_file(path, content).await
	}
	async fn create_directory(&self, path: &str) -> Result<(), SharpSyncError> {
		self.inner.create_directory(path).await
	}
	async fn delete(&self, path: &str) -> Result<(), SharpSyncError> {
		self.inner.delete(path).await
	}
	async fn move_item(&self, src: &str, dst: &str) -> Result<(), SharpSyncError> {
		self.inner.move_item(src, dst).await
	}
	async fn compute_hash(&self, path: &str) -> Result<String, SharpSyncError> {
		self.inner.compute_hash(path).await
	}
	async fn storage_info(&self) -> Result<StorageInfo, SharpSyncError> {
		self.inner.storage_info().await
	}
	async fn get_remote_changes(&self, _since: SystemTime) -> Result<Vec<ChangeInfo>, SharpSyncError> {
		Ok(Vec::new())
	}
}

/// S5: a second `synchronize()` call while one is in flight fails `Busy`;
/// once the first completes, a fresh call succeeds.
#[tokio::test]
async fn s5_concurrent_secondary_sync() {
	let local_dir = TempDir::new().unwrap();
	let remote_dir = TempDir::new().unwrap();
	let store_dir = TempDir::new().unwrap();

	for i in 0..10 {
		tokio::fs::write(local_dir.path().join(format!("f{}.bin", i)), vec![0u8; 10 * 1024])
			.await
			.unwrap();
	}

	let store = store_at(&store_dir);
	let filter = Filter::with_defaults();
	let tracker = ChangeTracker::new(Filter::with_defaults());
	let local = Arc::new(LocalFilesystemStorage::new(local_dir.path()));
	let remote: Arc<dyn Storage> = Arc::new(SlowStorage {
		inner: LocalFilesystemStorage::new(remote_dir.path()),
		delay: Duration::from_millis(50),
	});
	let resolver = Arc::new(DefaultConflictResolver::new(ConflictResolution::Skip));
	let (engine, _rx) = SyncEngine::new(store, filter, tracker, local, remote, resolver);
	let engine = Arc::new(engine);

	let background = {
		let engine = engine.clone();
		tokio::spawn(async move {
			let cancel = CancelToken::new();
			engine.synchronize(&SyncOptions::default(), &cancel).await
		})
	};

	tokio::time::sleep(Duration::from_millis(75)).await;
	let cancel = CancelToken::new();
	let busy = engine.synchronize(&SyncOptions::default(), &cancel).await;
	assert!(matches!(busy, Err(SharpSyncError::Busy)));

	let first = background.await.unwrap().unwrap();
	assert_eq!(first.files_synchronized, 10);

	let second = engine.synchronize(&SyncOptions::default(), &cancel).await.unwrap();
	assert_eq!(second.files_synchronized, 0);
}

/// S6: a pre-cancelled token fails fast and leaves the engine idle.
#[tokio::test]
async fn s6_pre_cancelled_token() {
	let local_dir = TempDir::new().unwrap();
	let remote_dir = TempDir::new().unwrap();
	let store_dir = TempDir::new().unwrap();
	let resolver = Arc::new(DefaultConflictResolver::new(ConflictResolution::Skip));
	let (engine, _rx) = engine(&local_dir, &remote_dir, &store_dir, resolver);

	let cancel = CancelToken::new();
	cancel.cancel();
	let result = engine.synchronize(&SyncOptions::default(), &cancel).await;
	assert!(matches!(result, Err(SharpSyncError::Cancelled)));
	assert!(!engine.is_synchronizing());
}

/// Round-trip law: writing locally then syncing yields identical bytes remotely.
#[tokio::test]
async fn round_trip_write_then_sync_then_read_is_identical() {
	let local_dir = TempDir::new().unwrap();
	let remote_dir = TempDir::new().unwrap();
	let store_dir = TempDir::new().unwrap();
	let resolver = Arc::new(DefaultConflictResolver::new(ConflictResolution::Skip));
	let (engine, _rx) = engine(&local_dir, &remote_dir, &store_dir, resolver);

	let content = b"the quick brown fox jumps over the lazy dog".to_vec();
	tokio::fs::write(local_dir.path().join("doc.txt"), &content).await.unwrap();

	let cancel = CancelToken::new();
	engine.synchronize(&SyncOptions::default(), &cancel).await.unwrap();

	let remote_content = tokio::fs::read(remote_dir.path().join("doc.txt")).await.unwrap();
	assert_eq!(remote_content, content);
}

/// Round-trip law: `computeHash` agrees on both sides after a transfer.
#[tokio::test]
async fn round_trip_hashes_match_after_upload() {
	let local_dir = TempDir::new().unwrap();
	let remote_dir = TempDir::new().unwrap();
	let store_dir = TempDir::new().unwrap();
	let resolver = Arc::new(DefaultConflictResolver::new(ConflictResolution::Skip));
	let (engine, _rx) = engine(&local_dir, &remote_dir, &store_dir, resolver);

	tokio::fs::write(local_dir.path().join("data.bin"), vec![7u8; 4096]).await.unwrap();
	let cancel = CancelToken::new();
	engine.synchronize(&SyncOptions::default(), &cancel).await.unwrap();

	let local_storage = LocalFilesystemStorage::new(local_dir.path());
	let remote_storage = LocalFilesystemStorage::new(remote_dir.path());
	let local_hash = local_storage.compute_hash("data.bin").await.unwrap();
	let remote_hash = remote_storage.compute_hash("data.bin").await.unwrap();
	assert_eq!(local_hash, remote_hash);
}

/// Round-trip law: a rename notification yields a paired DeleteRemote/Upload
/// with rename metadata on both entries.
#[tokio::test]
async fn round_trip_rename_notification_yields_paired_plan_entries() {
	let local_dir = TempDir::new().unwrap();
	let remote_dir = TempDir::new().unwrap();
	let store_dir = TempDir::new().unwrap();
	let resolver = Arc::new(DefaultConflictResolver::new(ConflictResolution::Skip));
	let (engine, _rx) = engine(&local_dir, &remote_dir, &store_dir, resolver);

	tokio::fs::write(local_dir.path().join("old_name.txt"), "payload").await.unwrap();
	tokio::fs::write(remote_dir.path().join("old_name.txt"), "payload").await.unwrap();
	let cancel = CancelToken::new();
	engine.synchronize(&SyncOptions::default(), &cancel).await.unwrap();

	tokio::fs::rename(local_dir.path().join("old_name.txt"), local_dir.path().join("new_name.txt"))
		.await
		.unwrap();
	engine.notify_local_rename("old_name.txt", "new_name.txt", 7, false).await.unwrap();

	let plan = engine.get_pending_operations().await.unwrap();
	let deleted = plan.iter().find(|a| a.path == "old_name.txt").unwrap();
	assert_eq!(deleted.action_type, SyncActionType::DeleteRemote);
	assert_eq!(deleted.renamed_to.as_deref(), Some("new_name.txt"));

	let created = plan.iter().find(|a| a.path == "new_name.txt").unwrap();
	assert_eq!(created.action_type, SyncActionType::Upload);
	assert_eq!(created.renamed_from.as_deref(), Some("old_name.txt"));
}

/// Boundary: empty file round-trips with size 0.
#[tokio::test]
async fn boundary_empty_file_roundtrips_with_zero_size() {
	let local_dir = TempDir::new().unwrap();
	let remote_dir = TempDir::new().unwrap();
	let store_dir = TempDir::new().unwrap();
	let resolver = Arc::new(DefaultConflictResolver::new(ConflictResolution::Skip));
	let (engine, _rx) = engine(&local_dir, &remote_dir, &store_dir, resolver);

	tokio::fs::write(local_dir.path().join("empty.txt"), b"").await.unwrap();
	let cancel = CancelToken::new();
	engine.synchronize(&SyncOptions::default(), &cancel).await.unwrap();

	let metadata = tokio::fs::metadata(remote_dir.path().join("empty.txt")).await.unwrap();
	assert_eq!(metadata.len(), 0);
}

/// Boundary: a 15 MB transfer fires `FileProgressChanged` at least twice,
/// with the final tick's `bytes_transferred` equal to the file's full size.
#[tokio::test]
async fn boundary_large_file_emits_multiple_progress_ticks() {
	let local_dir = TempDir::new().unwrap();
	let remote_dir = TempDir::new().unwrap();
	let store_dir = TempDir::new().unwrap();
	let resolver = Arc::new(DefaultConflictResolver::new(ConflictResolution::Skip));
	let (engine, mut rx) = engine(&local_dir, &remote_dir, &store_dir, resolver);

	const SIZE: usize = 15 * 1024 * 1024;
	tokio::fs::write(local_dir.path().join("large.bin"), vec![42u8; SIZE]).await.unwrap();

	let cancel = CancelToken::new();
	engine.synchronize(&SyncOptions::default(), &cancel).await.unwrap();

	let events = drain(&mut rx).await;
	let ticks: Vec<_> = events
		.into_iter()
		.filter_map(|e| match e {
			sharp_sync::events::SyncEvent::FileProgress(p) if p.path == "large.bin" => Some(p),
			_ => None,
		})
		.collect();

	assert!(ticks.len() >= 2, "expected at least two progress ticks, got {}", ticks.len());
	assert_eq!(ticks.last().unwrap().bytes_transferred, SIZE as u64);
	assert_eq!(ticks.last().unwrap().total_bytes, SIZE as u64);
}

// vim: ts=4
