//! Conflict resolver variants: `Default` and `Smart` (§4.4)

use super::analyze;
use crate::types::{ConflictAnalysis, ConflictResolution, ConflictType, SyncItem};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

/// A host-supplied callback that gets the final say on a conflict
///
/// Per the design-note in §9, this replaces the reference implementation's
/// mutable `ConflictDetected` event handler with a single synchronous
/// capability: given the analysis, return the resolution to apply.
pub trait ConflictHandler: Send + Sync {
	fn decide(&self, analysis: &ConflictAnalysis) -> ConflictResolution;
}

/// A lightweight cancellation flag checked before and after any handler call
#[derive(Default)]
pub struct CancelToken(AtomicBool);

impl CancelToken {
	pub fn new() -> Self {
		CancelToken(AtomicBool::new(false))
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::Release);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}
}

/// Capability every resolver variant implements
#[async_trait]
pub trait ConflictResolver: Send + Sync {
	async fn resolve(
		&self,
		path: &str,
		conflict_type: ConflictType,
		local_item: Option<&SyncItem>,
		remote_item: Option<&SyncItem>,
		cancel: &CancelToken,
	) -> Result<ConflictResolution, crate::error::SharpSyncError>;
}

/// Always returns the configured fallback, regardless of input (§4.4)
pub struct DefaultConflictResolver {
	fallback: ConflictResolution,
}

impl DefaultConflictResolver {
	pub fn new(fallback: ConflictResolution) -> Self {
		DefaultConflictResolver { fallback }
	}
}

#[async_trait]
impl ConflictResolver for DefaultConflictResolver {
	async fn resolve(
		&self,
		_path: &str,
		_conflict_type: ConflictType,
		_local_item: Option<&SyncItem>,
		_remote_item: Option<&SyncItem>,
		cancel: &CancelToken,
	) -> Result<ConflictResolution, crate::error::SharpSyncError> {
		if cancel.is_cancelled() {
			return Err(crate::error::SharpSyncError::Cancelled);
		}
		Ok(self.fallback)
	}
}

/// Classifies the conflict, builds a `ConflictAnalysis`, recommends a
/// resolution, and optionally delegates the final choice to a host handler
pub struct SmartConflictResolver {
	fallback: ConflictResolution,
	handler: Option<Box<dyn ConflictHandler>>,
}

impl SmartConflictResolver {
	pub fn new(fallback: ConflictResolution) -> Self {
		SmartConflictResolver { fallback, handler: None }
	}

	pub fn with_handler(fallback: ConflictResolution, handler: Box<dyn ConflictHandler>) -> Self {
		SmartConflictResolver { fallback, handler: Some(handler) }
	}

	/// Build the analysis without resolving — useful for surfacing to a host UI
	pub fn analyze(
		&self,
		path: &str,
		conflict_type: ConflictType,
		local_item: Option<&SyncItem>,
		remote_item: Option<&SyncItem>,
	) -> ConflictAnalysis {
		analyze(path, conflict_type, local_item, remote_item, self.fallback)
	}
}

#[async_trait]
impl ConflictResolver for SmartConflictResolver {
	async fn resolve(
		&self,
		path: &str,
		conflict_type: ConflictType,
		local_item: Option<&SyncItem>,
		remote_item: Option<&SyncItem>,
		cancel: &CancelToken,
	) -> Result<ConflictResolution, crate::error::SharpSyncError> {
		if cancel.is_cancelled() {
			return Err(crate::error::SharpSyncError::Cancelled);
		}

		let analysis = self.analyze(path, conflict_type, local_item, remote_item);

		let resolution = match &self.handler {
			Some(handler) => handler.decide(&analysis),
			None => analysis.recommended_resolution,
		};

		if cancel.is_cancelled() {
			return Err(crate::error::SharpSyncError::Cancelled);
		}

		Ok(resolution)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::{Duration, SystemTime};

	fn item(size: u64, modified: SystemTime) -> SyncItem {
		SyncItem {
			path: "conflict.txt".to_string(),
			is_directory: false,
			size,
			last_modified: modified,
			permissions: None,
			mime_type: None,
			etag: None,
			is_symlink: false,
		}
	}

	#[tokio::test]
	async fn default_resolver_ignores_input() {
		let resolver = DefaultConflictResolver::new(ConflictResolution::RenameLocal);
		let cancel = CancelToken::new();
		let result = resolver
			.resolve("a.txt", ConflictType::BothModified, None, None, &cancel)
			.await
			.unwrap();
		assert_eq!(result, ConflictResolution::RenameLocal);
	}

	#[tokio::test]
	async fn default_resolver_honors_cancellation() {
		let resolver = DefaultConflictResolver::new(ConflictResolution::Skip);
		let cancel = CancelToken::new();
		cancel.cancel();
		let result = resolver.resolve("a.txt", ConflictType::BothModified, None, None, &cancel).await;
		assert!(matches!(result, Err(crate::error::SharpSyncError::Cancelled)));
	}

	#[tokio::test]
	async fn smart_resolver_recommends_without_handler() {
		let now = SystemTime::now();
		let local = item(10, now);
		let remote = item(20, now + Duration::from_secs(30));
		let resolver = SmartConflictResolver::new(ConflictResolution::Ask);
		let cancel = CancelToken::new();
		let result = resolver
			.resolve("conflict.txt", ConflictType::BothModified, Some(&local), Some(&remote), &cancel)
			.await
			.unwrap();
		assert_eq!(result, ConflictResolution::UseRemote);
	}

	struct AlwaysSkip;
	impl ConflictHandler for AlwaysSkip {
		fn decide(&self, _analysis: &ConflictAnalysis) -> ConflictResolution {
			ConflictResolution::Skip
		}
	}

	#[tokio::test]
	async fn smart_resolver_delegates_to_handler() {
		let now = SystemTime::now();
		let local = item(10, now);
		let remote = item(20, now + Duration::from_secs(30));
		let resolver =
			SmartConflictResolver::with_handler(ConflictResolution::Ask, Box::new(AlwaysSkip));
		let cancel = CancelToken::new();
		let result = resolver
			.resolve("conflict.txt", ConflictType::BothModified, Some(&local), Some(&remote), &cancel)
			.await
			.unwrap();
		assert_eq!(result, ConflictResolution::Skip);
	}
}

// vim: ts=4
