//! The Executor (§4.6) — `SyncEngine`, the public surface hosts drive.
//!
//! Grounded on `szilu-syncr::sync_impl::mod` for the "walk a plan, dispatch
//! per action-type, update counters" shape, and on `szilu-syncr::delete` for
//! deletion-ordering bookkeeping (here folded into the Planner's priority
//! sort, which the Executor trusts rather than re-deriving).

use crate::change_tracker::ChangeTracker;
use crate::conflict::resolver::CancelToken;
use crate::conflict::ConflictResolver;
use crate::error::SharpSyncError;
use crate::events::{ConflictDetected, EventSender, FileProgressChanged, ProgressChanged, SyncEvent, SyncOperation};
use crate::filter::Filter;
use crate::options::SyncOptions;
use crate::planner;
use crate::storage::{Storage, TransferOperation};
use crate::store::SyncStateStore;
use crate::types::{
	ChangeSource, ConflictResolution, OperationHistory, PendingChange, SyncActionType, SyncPlanAction,
	SyncResult, SyncState, SyncStatus, SyncStoreStats,
};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant, SystemTime};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, warn};

fn operation_to_u8(op: SyncOperation) -> u8 {
	match op {
		SyncOperation::Idle => 0,
		SyncOperation::Scanning => 1,
		SyncOperation::Planning => 2,
		SyncOperation::Executing => 3,
		SyncOperation::Paused => 4,
		SyncOperation::Finalizing => 5,
	}
}

fn u8_to_operation(value: u8) -> SyncOperation {
	match value {
		1 => SyncOperation::Scanning,
		2 => SyncOperation::Planning,
		3 => SyncOperation::Executing,
		4 => SyncOperation::Paused,
		5 => SyncOperation::Finalizing,
		_ => SyncOperation::Idle,
	}
}

/// An `AsyncRead` wrapper that emits `FileProgressChanged` as bytes pass
/// through, used to report upload/download progress without the `Storage`
/// port itself needing a chunked-transfer API (§6.4).
struct ProgressReader {
	inner: Pin<Box<dyn AsyncRead + Send>>,
	path: String,
	total_bytes: u64,
	transferred: u64,
	operation: TransferOperation,
	events: EventSender,
}

impl AsyncRead for ProgressReader {
	fn poll_read(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &mut ReadBuf<'_>,
	) -> Poll<std::io::Result<()>> {
		let this = self.get_mut();
		let before = buf.filled().len();
		let result = this.inner.as_mut().poll_read(cx, buf);
		if let Poll::Ready(Ok(())) = &result {
			let read = buf.filled().len() - before;
			if read > 0 {
				this.transferred += read as u64;
				let percent_complete = if this.total_bytes == 0 {
					100.0
				} else {
					(this.transferred as f64 / this.total_bytes as f64) * 100.0
				};
				let _ = this.events.send(SyncEvent::FileProgress(FileProgressChanged {
					path: this.path.clone(),
					bytes_transferred: this.transferred,
					total_bytes: this.total_bytes,
					operation: this.operation,
					percent_complete,
				}));
			}
		}
		result
	}
}

/// The embeddable sync engine: owns the Store, Filter, ChangeTracker, the
/// two `Storage` collaborators, and the configured `ConflictResolver`.
pub struct SyncEngine {
	store: SyncStateStore,
	filter: Filter,
	tracker: ChangeTracker,
	local: Arc<dyn Storage>,
	remote: Arc<dyn Storage>,
	resolver: Arc<dyn ConflictResolver>,
	host_identity: String,
	sync_guard: Semaphore,
	paused: AtomicBool,
	resume_notify: Notify,
	disposed: AtomicBool,
	operation: AtomicU8,
	events: EventSender,
}

impl SyncEngine {
	pub fn new(
		store: SyncStateStore,
		filter: Filter,
		tracker: ChangeTracker,
		local: Arc<dyn Storage>,
		remote: Arc<dyn Storage>,
		resolver: Arc<dyn ConflictResolver>,
	) -> (Self, crate::events::EventReceiver) {
		let (tx, rx) = crate::events::channel();
		let engine = SyncEngine {
			store,
			filter,
			tracker,
			local,
			remote,
			resolver,
			host_identity: crate::util::hostname(),
			sync_guard: Semaphore::new(1),
			paused: AtomicBool::new(false),
			resume_notify: Notify::new(),
			disposed: AtomicBool::new(false),
			operation: AtomicU8::new(0),
			events: tx,
		};
		(engine, rx)
	}

	fn check_alive(&self) -> Result<(), SharpSyncError> {
		if self.disposed.load(Ordering::Acquire) {
			Err(SharpSyncError::Disposed)
		} else {
			Ok(())
		}
	}

	pub fn dispose(&self) {
		self.disposed.store(true, Ordering::Release);
		self.tracker.dispose();
	}

	pub fn is_synchronizing(&self) -> bool {
		!matches!(self.state(), SyncOperation::Idle)
	}

	pub fn is_paused(&self) -> bool {
		self.paused.load(Ordering::Acquire)
	}

	pub fn state(&self) -> SyncOperation {
		u8_to_operation(self.operation.load(Ordering::Acquire))
	}

	fn set_state(&self, op: SyncOperation) {
		self.operation.store(operation_to_u8(op), Ordering::Release);
		debug!(operation = ?op, "sync state transition");
	}

	fn emit_progress(&self, current_file: usize, total_files: usize, current_file_name: Option<String>) {
		let _ = self.events.send(SyncEvent::Progress(ProgressChanged {
			operation: self.state(),
			current_file,
			total_files,
			percentage: crate::events::percentage(current_file, total_files),
			current_file_name,
			is_cancelled: false,
		}));
	}

	pub fn pause(&self) {
		self.paused.store(true, Ordering::Release);
	}

	pub fn resume(&self) {
		self.paused.store(false, Ordering::Release);
		self.resume_notify.notify_waiters();
	}

	async fn wait_if_paused(&self) {
		while self.paused.load(Ordering::Acquire) {
			self.set_state(SyncOperation::Paused);
			self.resume_notify.notified().await;
		}
	}

	pub async fn reset_state(&self) -> Result<(), SharpSyncError> {
		self.check_alive()?;
		self.store.clear()?;
		self.tracker.clear_local().await?;
		self.tracker.clear_remote().await?;
		Ok(())
	}

	pub fn get_stats(&self) -> Result<SyncStoreStats, SharpSyncError> {
		self.check_alive()?;
		Ok(self.store.stats()?)
	}

	pub fn prune_history(&self, older_than: SystemTime) -> Result<usize, SharpSyncError> {
		self.check_alive()?;
		Ok(self.store.clear_operation_history(older_than)?)
	}

	pub async fn notify_local(&self, change: PendingChange) -> Result<(), SharpSyncError> {
		self.check_alive()?;
		Ok(self.tracker.notify_local(change).await?)
	}

	pub async fn notify_remote(&self, change: PendingChange) -> Result<(), SharpSyncError> {
		self.check_alive()?;
		Ok(self.tracker.notify_remote(change).await?)
	}

	pub async fn notify_local_rename(
		&self,
		old_path: &str,
		new_path: &str,
		size: u64,
		is_directory: bool,
	) -> Result<(), SharpSyncError> {
		self.check_alive()?;
		Ok(self.tracker.notify_local_rename(old_path, new_path, size, is_directory).await?)
	}

	pub async fn notify_remote_rename(
		&self,
		old_path: &str,
		new_path: &str,
		size: u64,
		is_directory: bool,
	) -> Result<(), SharpSyncError> {
		self.check_alive()?;
		Ok(self.tracker.notify_remote_rename(old_path, new_path, size, is_directory).await?)
	}

	pub async fn clear_pending_local(&self) -> Result<(), SharpSyncError> {
		self.check_alive()?;
		Ok(self.tracker.clear_local().await?)
	}

	pub async fn clear_pending_remote(&self) -> Result<(), SharpSyncError> {
		self.check_alive()?;
		Ok(self.tracker.clear_remote().await?)
	}

	/// `getPlan`/`getPendingOperations` (§4.6): a pure read, no guard needed
	pub async fn get_plan(&self, options: &SyncOptions) -> Result<Vec<SyncPlanAction>, SharpSyncError> {
		self.check_alive()?;
		planner::plan(&self.store, &self.filter, &self.tracker, &*self.local, &*self.remote, options)
			.await
	}

	pub async fn get_pending_operations(&self) -> Result<Vec<SyncPlanAction>, SharpSyncError> {
		self.get_plan(&SyncOptions::default()).await
	}

	pub async fn synchronize(
		&self,
		options: &SyncOptions,
		cancel: &CancelToken,
	) -> Result<SyncResult, SharpSyncError> {
		self.run(options, cancel, None).await
	}

	pub async fn sync_folder(
		&self,
		prefix: &str,
		options: &SyncOptions,
		cancel: &CancelToken,
	) -> Result<SyncResult, SharpSyncError> {
		self.run(options, cancel, Some(PathScope::Prefix(prefix.to_string()))).await
	}

	pub async fn sync_files(
		&self,
		paths: &[String],
		options: &SyncOptions,
		cancel: &CancelToken,
	) -> Result<SyncResult, SharpSyncError> {
		self.run(options, cancel, Some(PathScope::Paths(paths.to_vec()))).await
	}

	async fn run(
		&self,
		options: &SyncOptions,
		cancel: &CancelToken,
		scope: Option<PathScope>,
	) -> Result<SyncResult, SharpSyncError> {
		self.check_alive()?;
		if cancel.is_cancelled() {
			return Err(SharpSyncError::Cancelled);
		}

		let permit = self.sync_guard.try_acquire().map_err(|_| SharpSyncError::Busy)?;
		let started = Instant::now();

		let body = self.run_body(options, cancel, scope, started);
		let result = if options.timeout_seconds > 0 {
			match tokio::time::timeout(Duration::from_secs(options.timeout_seconds), body).await {
				Ok(result) => result,
				Err(_) => {
					cancel.cancel();
					self.set_state(SyncOperation::Idle);
					Err(SharpSyncError::Timeout)
				}
			}
		} else {
			body.await
		};

		drop(permit);
		result
	}

	async fn run_body(
		&self,
		options: &SyncOptions,
		cancel: &CancelToken,
		scope: Option<PathScope>,
		started: Instant,
	) -> Result<SyncResult, SharpSyncError> {
		self.set_state(SyncOperation::Scanning);
		let mut actions = self.get_plan(options).await?;
		if let Some(scope) = &scope {
			actions.retain(|a| scope.includes(&a.path));
		}

		self.set_state(SyncOperation::Planning);
		let total = actions.len();
		let mut result = SyncResult { success: true, ..Default::default() };

		self.set_state(SyncOperation::Executing);
		for (index, action) in actions.into_iter().enumerate() {
			self.wait_if_paused().await;
			if self.paused.load(Ordering::Acquire) {
				self.set_state(SyncOperation::Executing);
			}

			if cancel.is_cancelled() {
				self.emit_progress(index, total, None);
				self.set_state(SyncOperation::Idle);
				return Err(SharpSyncError::Cancelled);
			}

			self.emit_progress(index, total, Some(action.path.clone()));
			self.execute_action(&action, options, cancel, &mut result).await;
		}

		self.set_state(SyncOperation::Finalizing);
		result.elapsed = started.elapsed();
		self.set_state(SyncOperation::Idle);
		Ok(result)
	}

	async fn execute_action(
		&self,
		action: &SyncPlanAction,
		options: &SyncOptions,
		cancel: &CancelToken,
		result: &mut SyncResult,
	) {
		let started_at = SystemTime::now();
		let outcome = self.execute_action_inner(action, options, cancel, result).await;

		if let Err(e) = outcome {
			error!(path = %action.path, error = %e, "action failed");
			result.details.push(format!("{}: {}", action.path, e));
			if !options.dry_run {
				let mut state = self.store.get_state(&action.path).ok().flatten().unwrap_or_else(|| {
					SyncState::new(action.path.clone(), action.is_directory)
				});
				state.status = SyncStatus::Error;
				let _ = self.store.update_state(&state);
				let _ = self.store.log_operation(OperationHistory {
					id: String::new(),
					path: action.path.clone(),
					action_type: action.action_type,
					is_directory: action.is_directory,
					size: action.size,
					source: ChangeSource::Local,
					started_at,
					completed_at: SystemTime::now(),
					success: false,
					error_message: Some(e.to_string()),
					renamed_from: action.renamed_from.clone(),
					renamed_to: action.renamed_to.clone(),
				});
			}
			result.success = false;
		}
	}

	async fn execute_action_inner(
		&self,
		action: &SyncPlanAction,
		options: &SyncOptions,
		cancel: &CancelToken,
		result: &mut SyncResult,
	) -> Result<(), SharpSyncError> {
		match action.action_type {
			SyncActionType::Conflict => self.execute_conflict(action, options, cancel, result).await,
			SyncActionType::Upload => self.transfer(action, TransferOperation::Upload, options, result).await,
			SyncActionType::Download => {
				self.transfer(action, TransferOperation::Download, options, result).await
			}
			SyncActionType::DeleteLocal => {
				if !options.dry_run {
					self.local.delete(&action.path).await?;
					self.store.delete_state(&action.path)?;
				}
				result.files_deleted += 1;
				self.log_history(action, ChangeSource::Remote, true, None);
				Ok(())
			}
			SyncActionType::DeleteRemote => {
				if !options.dry_run {
					self.remote.delete(&action.path).await?;
					self.store.delete_state(&action.path)?;
				}
				result.files_deleted += 1;
				self.log_history(action, ChangeSource::Local, true, None);
				Ok(())
			}
			SyncActionType::Move => Ok(()),
		}
	}

	async fn execute_conflict(
		&self,
		action: &SyncPlanAction,
		options: &SyncOptions,
		cancel: &CancelToken,
		result: &mut SyncResult,
	) -> Result<(), SharpSyncError> {
		let local_item = self.local.get_item(&action.path).await?;
		let remote_item = self.remote.get_item(&action.path).await?;
		let conflict_type = action.conflict_type.expect("Conflict action always carries a conflict_type");

		let _ = self.events.send(SyncEvent::ConflictDetected(ConflictDetected {
			file_path: action.path.clone(),
			local_item: local_item.clone(),
			remote_item: remote_item.clone(),
			conflict_type,
		}));

		let resolution = if let Some(forced) = options.conflict_resolution {
			forced
		} else {
			self.resolver
				.resolve(&action.path, conflict_type, local_item.as_ref(), remote_item.as_ref(), cancel)
				.await?
		};

		match resolution {
			ConflictResolution::UseLocal => {
				self.transfer(action, TransferOperation::Upload, options, result).await
			}
			ConflictResolution::UseRemote => {
				self.transfer(action, TransferOperation::Download, options, result).await
			}
			ConflictResolution::Skip => {
				result.files_skipped += 1;
				self.log_history(action, ChangeSource::Local, true, None);
				Ok(())
			}
			ConflictResolution::RenameLocal => {
				if !options.dry_run {
					let renamed = allocate_rename_path(&*self.local, &action.path, &self.host_identity).await?;
					self.local.move_item(&action.path, &renamed).await?;
				}
				self.transfer(action, TransferOperation::Download, options, result).await
			}
			ConflictResolution::RenameRemote => {
				if !options.dry_run {
					let identity = remote_host_identity(&*self.remote);
					let renamed = allocate_rename_path(&*self.remote, &action.path, &identity).await?;
					self.remote.move_item(&action.path, &renamed).await?;
				}
				self.transfer(action, TransferOperation::Upload, options, result).await
			}
			ConflictResolution::Merge | ConflictResolution::Ask => {
				result.files_conflicted += 1;
				Err(SharpSyncError::ConflictUnresolved { path: action.path.clone() })
			}
		}
	}

	async fn transfer(
		&self,
		action: &SyncPlanAction,
		direction: TransferOperation,
		options: &SyncOptions,
		result: &mut SyncResult,
	) -> Result<(), SharpSyncError> {
		let (source, dest): (&dyn Storage, &dyn Storage) = match direction {
			TransferOperation::Upload => (&*self.local, &*self.remote),
			TransferOperation::Download => (&*self.remote, &*self.local),
		};

		if action.is_directory {
			if !options.dry_run {
				dest.create_directory(&action.path).await?;
			}
			result.files_synchronized += 1;
			self.log_history(action, ChangeSource::Local, true, None);
			return Ok(());
		}

		let source_item = source
			.get_item(&action.path)
			.await?
			.ok_or_else(|| SharpSyncError::NotFound { path: action.path.clone() })?;

		if !options.dry_run {
			let stream = source.read_file(&action.path).await?;
			let reader = ProgressReader {
				inner: stream,
				path: action.path.clone(),
				total_bytes: source_item.size,
				transferred: 0,
				operation: direction,
				events: self.events.clone(),
			};
			dest.write_file(&action.path, Box::pin(reader)).await?;

			if options.preserve_timestamps {
				if let Err(e) = dest.set_last_modified(&action.path, source_item.last_modified).await {
					warn!(path = %action.path, error = %e, "failed to preserve timestamp");
				}
			}
			if options.preserve_permissions {
				if let Some(permissions) = &source_item.permissions {
					if let Err(e) = dest.set_permissions(&action.path, permissions).await {
						warn!(path = %action.path, error = %e, "failed to preserve permissions");
					}
				}
			}

			if direction == TransferOperation::Download
				&& options.create_virtual_file_placeholders
			{
				if let Some(callback) = &options.virtual_file_callback {
					let absolute = format!("{}/{}", self.local.root_path(), action.path);
					if let Err(e) = callback.on_downloaded(&action.path, &absolute, &source_item) {
						warn!(path = %action.path, error = %e, "virtual file callback failed");
					}
				}
			}

			self.record_success(action, direction, &source_item).await?;
		}

		result.files_synchronized += 1;
		self.log_history(action, source_of(direction), true, None);
		Ok(())
	}

	async fn record_success(
		&self,
		action: &SyncPlanAction,
		direction: TransferOperation,
		source_item: &crate::types::SyncItem,
	) -> Result<(), SharpSyncError> {
		let mut state = self
			.store
			.get_state(&action.path)?
			.unwrap_or_else(|| SyncState::new(action.path.clone(), action.is_directory));

		let local_hash = self.local.compute_hash(&action.path).await.ok();
		let remote_hash = self.remote.compute_hash(&action.path).await.ok();

		state.size = source_item.size;
		state.local_hash = local_hash;
		state.remote_hash = remote_hash;
		match direction {
			TransferOperation::Upload => {
				state.local_modified = Some(source_item.last_modified);
				state.remote_modified = Some(source_item.last_modified);
			}
			TransferOperation::Download => {
				state.local_modified = Some(source_item.last_modified);
				state.remote_modified = Some(source_item.last_modified);
			}
		}
		state.status = SyncStatus::Synced;
		state.last_sync_time = Some(SystemTime::now());
		self.store.update_state(&state)?;
		Ok(())
	}

	fn log_history(&self, action: &SyncPlanAction, source: ChangeSource, success: bool, error: Option<String>) {
		let now = SystemTime::now();
		let _ = self.store.log_operation(OperationHistory {
			id: String::new(),
			path: action.path.clone(),
			action_type: action.action_type,
			is_directory: action.is_directory,
			size: action.size,
			source,
			started_at: now,
			completed_at: now,
			success,
			error_message: error,
			renamed_from: action.renamed_from.clone(),
			renamed_to: action.renamed_to.clone(),
		});
	}
}

fn source_of(direction: TransferOperation) -> ChangeSource {
	match direction {
		TransferOperation::Upload => ChangeSource::Local,
		TransferOperation::Download => ChangeSource::Remote,
	}
}

enum PathScope {
	Prefix(String),
	Paths(Vec<String>),
}

impl PathScope {
	fn includes(&self, path: &str) -> bool {
		match self {
			PathScope::Prefix(prefix) => crate::path_util::is_prefix_or_self(prefix, path),
			PathScope::Paths(paths) => paths.iter().any(|p| p == path),
		}
	}
}

/// `RenameLocal`/`RenameRemote` target-name allocation (§4.6 step 2): try
/// `name (<hostIdentity>).ext`, then `name (<hostIdentity> 2).ext`, ... until
/// a name that doesn't exist at the target is found (§8 invariant 8).
async fn allocate_rename_path(
	storage: &dyn Storage,
	path: &str,
	host_identity: &str,
) -> Result<String, SharpSyncError> {
	let (stem, ext) = split_extension(path);
	let mut attempt = 0u32;
	loop {
		let candidate = if attempt == 0 {
			match &ext {
				Some(ext) => format!("{} ({}).{}", stem, host_identity, ext),
				None => format!("{} ({})", stem, host_identity),
			}
		} else {
			match &ext {
				Some(ext) => format!("{} ({} {}).{}", stem, host_identity, attempt + 1, ext),
				None => format!("{} ({} {})", stem, host_identity, attempt + 1),
			}
		};
		if !storage.exists(&candidate).await? {
			return Ok(candidate);
		}
		attempt += 1;
	}
}

fn split_extension(path: &str) -> (String, Option<String>) {
	let (dir, name) = match path.rsplit_once('/') {
		Some((d, n)) => (Some(d), n),
		None => (None, path),
	};
	let (stem, ext) = match name.rsplit_once('.') {
		Some((s, e)) if !s.is_empty() => (s.to_string(), Some(e.to_string())),
		_ => (name.to_string(), None),
	};
	let full_stem = match dir {
		Some(d) => format!("{}/{}", d, stem),
		None => stem,
	};
	(full_stem, ext)
}

/// The remote side's host identity: the hostname of an `http(s)://` root
/// path, or the literal `"remote"` fallback for non-URL backends (§4.6 step
/// 2, §9 design note — asymmetric with the local side by design).
fn remote_host_identity(remote: &dyn Storage) -> String {
	let root = remote.root_path();
	if let Some(rest) = root.strip_prefix("http://").or_else(|| root.strip_prefix("https://")) {
		let host_and_port = rest.split('/').next().unwrap_or(rest);
		let host = host_and_port.split(':').next().unwrap_or(host_and_port);
		if !host.is_empty() {
			return host.to_string();
		}
	}
	"remote".to_string()
}


// vim: ts=4
