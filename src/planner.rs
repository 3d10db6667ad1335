//! The Planner (§4.5) — a pure function of a Store snapshot, a Filter,
//! ChangeTracker snapshots, and two `Storage` listings, producing an
//! ordered plan. Grounded on the sequential collect → diff →
//! conflict-detect → plan structure of `szilu-syncr::sync_impl`, restructured
//! here with no side effects: `plan()` never mutates the Store or Storage.

use crate::change_tracker::ChangeTracker;
use crate::error::SharpSyncError;
use crate::filter::Filter;
use crate::options::SyncOptions;
use crate::storage::Storage;
use crate::store::SyncStateStore;
use crate::types::{
	ChangeSource, ChangeType, ConflictType, PendingChange, SyncActionType, SyncItem,
	SyncPlanAction, SyncState, VirtualFileState,
};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tracing::warn;

const DIR_CREATE_PRIORITY: u32 = 0;
const MOVE_PRIORITY: u32 = 1;
const TRANSFER_PRIORITY: u32 = 2;
const DELETE_PRIORITY: u32 = 3;

/// Change-detection comparison strategy (§4.5 step 3), derived from options
fn has_changed(
	options: &SyncOptions,
	tracked_modified: Option<SystemTime>,
	tracked_size: u64,
	tracked_hash: Option<&str>,
	current_size: u64,
	current_modified: SystemTime,
	current_hash: Option<&str>,
) -> bool {
	if tracked_modified.is_none() {
		return true;
	}
	if options.size_only {
		return tracked_size != current_size;
	}
	if options.checksum_only {
		return match (tracked_hash, current_hash) {
			(Some(a), Some(b)) => a != b,
			_ => true,
		};
	}
	if tracked_size != current_size {
		return true;
	}
	let tracked = tracked_modified.unwrap();
	let diff = match current_modified.duration_since(tracked) {
		Ok(d) => d,
		Err(e) => e.duration(),
	};
	diff > Duration::from_secs(2)
}

/// Breadth-first, non-recursive-listing-driven tree collection (§4.5 step 1)
async fn list_tree(
	storage: &dyn Storage,
	follow_symlinks: bool,
) -> Result<HashMap<String, SyncItem>, SharpSyncError> {
	let mut out = HashMap::new();
	let mut queue = vec![String::new()];
	while let Some(prefix) = queue.pop() {
		let items = storage.list_items(&prefix).await?;
		for item in items {
			if item.is_symlink && !follow_symlinks {
				continue;
			}
			if item.is_directory {
				queue.push(item.path.clone());
			}
			out.insert(item.path.clone(), item);
		}
	}
	Ok(out)
}

/// Build the ordered sync plan (§4.5)
pub async fn plan(
	store: &SyncStateStore,
	filter: &Filter,
	tracker: &ChangeTracker,
	local: &dyn Storage,
	remote: &dyn Storage,
	options: &SyncOptions,
) -> Result<Vec<SyncPlanAction>, SharpSyncError> {
	let extra_filter = Filter::new(&[], &options.exclude_patterns)?;
	let passes_filter = |path: &str| filter.should_sync(path) && extra_filter.should_sync(path);

	let local_tree = list_tree(local, options.follow_symlinks).await?;
	let remote_tree = list_tree(remote, options.follow_symlinks).await?;

	let mut actions: HashMap<String, SyncPlanAction> = HashMap::new();
	let mut states_to_delete = Vec::new();

	let mut all_paths: Vec<String> = local_tree.keys().chain(remote_tree.keys()).cloned().collect();
	all_paths.sort();
	all_paths.dedup();

	for path in all_paths {
		if !passes_filter(&path) {
			continue;
		}
		let local_item = local_tree.get(&path);
		let remote_item = remote_tree.get(&path);
		let state = store.get_state(&path)?;

		if let Some(action) =
			classify(options, local, remote, &path, local_item, remote_item, state.as_ref()).await?
		{
			actions.insert(path.clone(), action);
		} else if local_item.is_none() && remote_item.is_none() {
			if store.get_state(&path)?.is_some() {
				states_to_delete.push(path.clone());
			}
		}
	}

	for path in &states_to_delete {
		store.delete_state(path)?;
	}

	poll_remote_changes(remote, tracker).await;

	fold_tracker(store, tracker, &passes_filter, &local_tree, &remote_tree, &mut actions).await?;

	let mut ordered: Vec<SyncPlanAction> = actions.into_values().collect();
	sort_actions(&mut ordered);

	for action in &mut ordered {
		if action.action_type == SyncActionType::Download {
			action.will_create_placeholder =
				options.create_virtual_file_placeholders && !action.is_directory;
		}
	}

	Ok(ordered)
}

/// Lazily compute a path's hash on the given side, only when checksum-only
/// comparison actually needs it (§4.5 step 3)
async fn hash_if_needed(
	options: &SyncOptions,
	storage: &dyn Storage,
	path: &str,
) -> Result<Option<String>, SharpSyncError> {
	if !options.checksum_only {
		return Ok(None);
	}
	Ok(Some(storage.compute_hash(path).await?))
}

/// The difference classifier from §4.5 step 2, using `hasChanged` (step 3)
async fn classify(
	options: &SyncOptions,
	local_storage: &dyn Storage,
	remote_storage: &dyn Storage,
	path: &str,
	local_item: Option<&SyncItem>,
	remote_item: Option<&SyncItem>,
	state: Option<&SyncState>,
) -> Result<Option<SyncPlanAction>, SharpSyncError> {
	let base = |action_type: SyncActionType, is_directory: bool, size: u64, last_modified: Option<SystemTime>| {
		SyncPlanAction {
			action_type,
			path: path.to_string(),
			is_directory,
			size,
			last_modified,
			conflict_type: None,
			priority: priority_of(action_type),
			will_create_placeholder: false,
			current_virtual_state: VirtualFileState::Full,
			renamed_from: None,
			renamed_to: None,
		}
	};

	let action = match (local_item, remote_item, state) {
		// New on one side only, no tracked baseline.
		(Some(l), None, None) => {
			Some(base(SyncActionType::Upload, l.is_directory, l.size, Some(l.last_modified)))
		}
		(None, Some(r), None) => {
			if options.delete_extraneous {
				Some(base(SyncActionType::DeleteRemote, r.is_directory, r.size, Some(r.last_modified)))
			} else {
				Some(base(SyncActionType::Download, r.is_directory, r.size, Some(r.last_modified)))
			}
		}

		// Present on both sides, tracked baseline may or may not exist.
		(Some(l), Some(r), state) => {
			let (tracked_local_mod, tracked_local_size, tracked_local_hash) = state
				.map(|s| (s.local_modified, s.size, s.local_hash.clone()))
				.unwrap_or((None, 0, None));
			let (tracked_remote_mod, tracked_remote_size, tracked_remote_hash) = state
				.map(|s| (s.remote_modified, s.size, s.remote_hash.clone()))
				.unwrap_or((None, 0, None));

			if l.is_directory != r.is_directory {
				Some(SyncPlanAction {
					conflict_type: Some(ConflictType::TypeConflict),
					..base(SyncActionType::Conflict, l.is_directory, l.size, Some(l.last_modified))
				})
			} else {
				let local_hash = hash_if_needed(options, local_storage, path).await?;
				let remote_hash = hash_if_needed(options, remote_storage, path).await?;

				let local_changed = has_changed(
					options,
					tracked_local_mod,
					tracked_local_size,
					tracked_local_hash.as_deref(),
					l.size,
					l.last_modified,
					local_hash.as_deref(),
				);
				let remote_changed = has_changed(
					options,
					tracked_remote_mod,
					tracked_remote_size,
					tracked_remote_hash.as_deref(),
					r.size,
					r.last_modified,
					remote_hash.as_deref(),
				);

				match (local_changed, remote_changed) {
					(true, true) => Some(SyncPlanAction {
						conflict_type: Some(ConflictType::BothModified),
						..base(SyncActionType::Conflict, l.is_directory, l.size, Some(l.last_modified))
					}),
					(true, false) => {
						Some(base(SyncActionType::Upload, l.is_directory, l.size, Some(l.last_modified)))
					}
					(false, true) => {
						Some(base(SyncActionType::Download, r.is_directory, r.size, Some(r.last_modified)))
					}
					(false, false) => None,
				}
			}
		}

		// Tracked locally, missing remotely: either a plain deletion to
		// propagate, or (if local changed since baseline too) a conflict.
		(Some(l), None, Some(state)) => {
			let local_hash = hash_if_needed(options, local_storage, path).await?;
			let local_changed = has_changed(
				options,
				state.local_modified,
				state.size,
				state.local_hash.as_deref(),
				l.size,
				l.last_modified,
				local_hash.as_deref(),
			);
			if local_changed {
				Some(SyncPlanAction {
					conflict_type: Some(ConflictType::ModifiedLocallyDeletedRemotely),
					..base(SyncActionType::Conflict, l.is_directory, l.size, Some(l.last_modified))
				})
			} else {
				Some(base(SyncActionType::DeleteLocal, l.is_directory, l.size, Some(l.last_modified)))
			}
		}

		// Tracked remotely, missing locally: symmetric case.
		(None, Some(r), Some(state)) => {
			let remote_hash = hash_if_needed(options, remote_storage, path).await?;
			let remote_changed = has_changed(
				options,
				state.remote_modified,
				state.size,
				state.remote_hash.as_deref(),
				r.size,
				r.last_modified,
				remote_hash.as_deref(),
			);
			if remote_changed {
				Some(SyncPlanAction {
					conflict_type: Some(ConflictType::DeletedLocallyModifiedRemotely),
					..base(SyncActionType::Conflict, r.is_directory, r.size, Some(r.last_modified))
				})
			} else {
				Some(base(SyncActionType::DeleteRemote, r.is_directory, r.size, Some(r.last_modified)))
			}
		}

		// Missing on both: nothing to do; caller removes the stale state.
		(None, None, _) => None,
	};

	Ok(action)
}

fn priority_of(action_type: SyncActionType) -> u32 {
	match action_type {
		SyncActionType::Move => MOVE_PRIORITY,
		SyncActionType::Upload | SyncActionType::Download | SyncActionType::Conflict => {
			TRANSFER_PRIORITY
		}
		SyncActionType::DeleteLocal | SyncActionType::DeleteRemote => DELETE_PRIORITY,
	}
}

/// Poll the remote backend for changes if it supports polling; failures are
/// logged and swallowed (§4.5 step 5). Interval gating is left to the
/// Executor, which only calls this when due.
async fn poll_remote_changes(remote: &dyn Storage, tracker: &ChangeTracker) {
	if !remote.supports_change_polling() {
		return;
	}
	match remote.get_remote_changes(SystemTime::UNIX_EPOCH).await {
		Ok(changes) => {
			for change in changes {
				let pending = PendingChange {
					path: change.path.clone(),
					change_type: change.change_type,
					size: change.size,
					is_directory: change.is_directory,
					renamed_from: change.renamed_from.clone(),
					renamed_to: None,
					detected_at: change.detected_at,
					source: ChangeSource::Remote,
				};
				if let Err(e) = tracker.notify_remote(pending).await {
					warn!(error = %e, "failed to fold polled remote change into tracker");
				}
			}
		}
		Err(e) => {
			warn!(error = %e, "remote change poll failed; continuing with tree diff only");
		}
	}
}

/// Fold ChangeTracker entries not already represented by the tree diff into
/// the action set (§4.5 step 4). Also propagates `renamedFrom`/`renamedTo`
/// metadata onto an already-classified action for the same path.
async fn fold_tracker(
	store: &SyncStateStore,
	tracker: &ChangeTracker,
	passes_filter: &impl Fn(&str) -> bool,
	local_tree: &HashMap<String, SyncItem>,
	remote_tree: &HashMap<String, SyncItem>,
	actions: &mut HashMap<String, SyncPlanAction>,
) -> Result<(), SharpSyncError> {
	let local_pending = tracker.snapshot_local().await?;
	let remote_pending = tracker.snapshot_remote().await?;

	for change in local_pending.iter().chain(remote_pending.iter()) {
		if !passes_filter(&change.path) {
			continue;
		}

		if let Some(existing) = actions.get_mut(&change.path) {
			if change.renamed_from.is_some() {
				existing.renamed_from = change.renamed_from.clone();
			}
			if change.renamed_to.is_some() {
				existing.renamed_to = change.renamed_to.clone();
			}
			continue;
		}

		let tracked = store.get_state(&change.path)?;
		if change.change_type == ChangeType::Deleted && tracked.is_none() {
			// Deleted + untracked: produce no action.
			continue;
		}

		let action = match change.change_type {
			ChangeType::Deleted => match change.source {
				ChangeSource::Local => SyncActionType::DeleteRemote,
				ChangeSource::Remote => SyncActionType::DeleteLocal,
			},
			ChangeType::Created | ChangeType::Changed => match change.source {
				ChangeSource::Local => SyncActionType::Upload,
				ChangeSource::Remote => SyncActionType::Download,
			},
			// Renamed arrives pre-expanded into Deleted+Created by the
			// tracker (§4.3); any other `Renamed` entry is ignored here.
			ChangeType::Renamed => continue,
		};

		let is_directory = change.is_directory
			|| local_tree.get(&change.path).map(|i| i.is_directory).unwrap_or(false)
			|| remote_tree.get(&change.path).map(|i| i.is_directory).unwrap_or(false);

		actions.insert(
			change.path.clone(),
			SyncPlanAction {
				action_type: action,
				path: change.path.clone(),
				is_directory,
				size: change.size,
				last_modified: Some(change.detected_at),
				conflict_type: None,
				priority: priority_of(action),
				will_create_placeholder: false,
				current_virtual_state: VirtualFileState::Full,
				renamed_from: change.renamed_from.clone(),
				renamed_to: change.renamed_to.clone(),
			},
		);
	}

	Ok(())
}

/// Priority sort (§4.5 step 7): directory creation first, then moves, then
/// file transfers, then deletions — children before parents for
/// `DeleteLocal`, parents before children for `DeleteRemote`.
fn sort_actions(actions: &mut [SyncPlanAction]) {
	actions.sort_by(|a, b| {
		let a_dir_create = a.is_directory && matches!(a.action_type, SyncActionType::Upload | SyncActionType::Download);
		let b_dir_create = b.is_directory && matches!(b.action_type, SyncActionType::Upload | SyncActionType::Download);
		let a_key = if a_dir_create { DIR_CREATE_PRIORITY } else { a.priority };
		let b_key = if b_dir_create { DIR_CREATE_PRIORITY } else { b.priority };

		a_key.cmp(&b_key).then_with(|| {
			if a.action_type == SyncActionType::DeleteLocal && b.action_type == SyncActionType::DeleteLocal {
				crate::path_util::depth(&b.path).cmp(&crate::path_util::depth(&a.path))
			} else if a.action_type == SyncActionType::DeleteRemote
				&& b.action_type == SyncActionType::DeleteRemote
			{
				crate::path_util::depth(&a.path).cmp(&crate::path_util::depth(&b.path))
			} else {
				a.path.cmp(&b.path)
			}
		})
	});
}


// vim: ts=4
