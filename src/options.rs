//! `SyncOptions` — per-call sync configuration (§6.5)
//!
//! Grouped by concern and documented the way `szilu-syncr::config::Config`
//! lays out its unified configuration struct, scoped to a sync engine's
//! own knobs rather than a CLI's broader surface.

use crate::types::ConflictResolution;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A host callback invoked after a file is downloaded when
/// `create_virtual_file_placeholders` is set (§4.6 step 6)
pub trait VirtualFileCallback: Send + Sync {
	fn on_downloaded(
		&self,
		relative_path: &str,
		absolute_local_path: &str,
		source: &crate::types::SyncItem,
	) -> Result<(), crate::error::SharpSyncError>;
}

/// Per-call options accepted by `SyncEngine::synchronize`/`get_plan` (§6.5)
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
	// ------------------------------------------------------------------
	// Metadata preservation
	// ------------------------------------------------------------------
	/// Apply the source item's permissions to the target after transfer
	pub preserve_permissions: bool,

	/// Apply the source item's modification time to the target after transfer
	pub preserve_timestamps: bool,

	// ------------------------------------------------------------------
	// Traversal behavior
	// ------------------------------------------------------------------
	/// Follow symlinks instead of skipping them during traversal (§4.5 step 1)
	pub follow_symlinks: bool,

	// ------------------------------------------------------------------
	// Execution mode
	// ------------------------------------------------------------------
	/// Walk the plan and report counters without mutating Storage or the Store
	pub dry_run: bool,

	/// Emit more granular progress/log output
	pub verbose: bool,

	// ------------------------------------------------------------------
	// Change detection (§4.5 step 3)
	// ------------------------------------------------------------------
	/// Compare only hashes when deciding whether a side changed
	pub checksum_only: bool,

	/// Compare only sizes when deciding whether a side changed
	pub size_only: bool,

	// ------------------------------------------------------------------
	// Deletion handling
	// ------------------------------------------------------------------
	/// Delete remote files with no local counterpart and no tracked state
	pub delete_extraneous: bool,

	/// Overwrite an existing target instead of treating it as untouched
	pub update_existing: bool,

	// ------------------------------------------------------------------
	// Conflict resolution
	// ------------------------------------------------------------------
	/// Overrides the engine's configured resolver's fallback for this call
	pub conflict_resolution: Option<ConflictResolution>,

	// ------------------------------------------------------------------
	// Timeout
	// ------------------------------------------------------------------
	/// Bound the whole sync by this many seconds; `0` means no timeout
	pub timeout_seconds: u64,

	// ------------------------------------------------------------------
	// Filtering
	// ------------------------------------------------------------------
	/// Additional exclusion glob patterns appended to the engine's filter
	/// for the duration of this call only
	pub exclude_patterns: Vec<String>,

	// ------------------------------------------------------------------
	// Virtual placeholders
	// ------------------------------------------------------------------
	/// Create sparse local placeholders after downloading a file
	pub create_virtual_file_placeholders: bool,

	/// Callback invoked per placeholder; ignored if placeholders are off
	#[serde(skip)]
	pub virtual_file_callback: Option<Arc<dyn VirtualFileCallback>>,
}

impl Default for SyncOptions {
	fn default() -> Self {
		SyncOptions {
			preserve_permissions: false,
			preserve_timestamps: true,
			follow_symlinks: false,
			dry_run: false,
			verbose: false,
			checksum_only: false,
			size_only: false,
			delete_extraneous: false,
			update_existing: true,
			conflict_resolution: None,
			timeout_seconds: 0,
			exclude_patterns: Vec::new(),
			create_virtual_file_placeholders: false,
			virtual_file_callback: None,
		}
	}
}

impl std::fmt::Debug for SyncOptions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncOptions")
			.field("preserve_permissions", &self.preserve_permissions)
			.field("preserve_timestamps", &self.preserve_timestamps)
			.field("follow_symlinks", &self.follow_symlinks)
			.field("dry_run", &self.dry_run)
			.field("verbose", &self.verbose)
			.field("checksum_only", &self.checksum_only)
			.field("size_only", &self.size_only)
			.field("delete_extraneous", &self.delete_extraneous)
			.field("update_existing", &self.update_existing)
			.field("conflict_resolution", &self.conflict_resolution)
			.field("timeout_seconds", &self.timeout_seconds)
			.field("exclude_patterns", &self.exclude_patterns)
			.field("create_virtual_file_placeholders", &self.create_virtual_file_placeholders)
			.field("virtual_file_callback", &self.virtual_file_callback.is_some())
			.finish()
	}
}

/// Builder for `SyncOptions`, mirroring the fluent setters on
/// `szilu-syncr`'s `SyncBuilder`
#[derive(Clone, Default)]
pub struct SyncOptionsBuilder {
	options: SyncOptions,
}

impl SyncOptionsBuilder {
	pub fn new() -> Self {
		SyncOptionsBuilder::default()
	}

	pub fn preserve_permissions(mut self, value: bool) -> Self {
		self.options.preserve_permissions = value;
		self
	}

	pub fn preserve_timestamps(mut self, value: bool) -> Self {
		self.options.preserve_timestamps = value;
		self
	}

	pub fn follow_symlinks(mut self, value: bool) -> Self {
		self.options.follow_symlinks = value;
		self
	}

	pub fn dry_run(mut self, value: bool) -> Self {
		self.options.dry_run = value;
		self
	}

	pub fn checksum_only(mut self, value: bool) -> Self {
		self.options.checksum_only = value;
		self
	}

	pub fn size_only(mut self, value: bool) -> Self {
		self.options.size_only = value;
		self
	}

	pub fn delete_extraneous(mut self, value: bool) -> Self {
		self.options.delete_extraneous = value;
		self
	}

	pub fn conflict_resolution(mut self, value: ConflictResolution) -> Self {
		self.options.conflict_resolution = Some(value);
		self
	}

	pub fn timeout_seconds(mut self, value: u64) -> Self {
		self.options.timeout_seconds = value;
		self
	}

	pub fn exclude_patterns(mut self, patterns: Vec<String>) -> Self {
		self.options.exclude_patterns = patterns;
		self
	}

	pub fn create_virtual_file_placeholders(mut self, value: bool) -> Self {
		self.options.create_virtual_file_placeholders = value;
		self
	}

	pub fn virtual_file_callback(mut self, callback: Arc<dyn VirtualFileCallback>) -> Self {
		self.options.virtual_file_callback = Some(callback);
		self
	}

	pub fn build(self) -> SyncOptions {
		self.options
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_spec_preserve_timestamps_on_by_default() {
		let opts = SyncOptions::default();
		assert!(opts.preserve_timestamps);
		assert!(!opts.preserve_permissions);
		assert_eq!(opts.timeout_seconds, 0);
	}

	#[test]
	fn builder_overrides_defaults() {
		let opts = SyncOptionsBuilder::new()
			.dry_run(true)
			.delete_extraneous(true)
			.conflict_resolution(ConflictResolution::UseLocal)
			.timeout_seconds(30)
			.build();
		assert!(opts.dry_run);
		assert!(opts.delete_extraneous);
		assert_eq!(opts.conflict_resolution, Some(ConflictResolution::UseLocal));
		assert_eq!(opts.timeout_seconds, 30);
	}
}

// vim: ts=4
