//! Events surfaced to the host (§6.4)
//!
//! Modeled as immutable records delivered over `tokio::sync::mpsc` channels
//! rather than mutable event objects, per the design note in §9 — the
//! `ConflictDetected` handler's "write a resolution back" pattern from the
//! reference implementation is replaced entirely by
//! [`crate::conflict::ConflictHandler::decide`].

use crate::types::{ConflictType, SyncItem};
use std::time::Duration;

/// Which phase of the state machine the engine is currently in (§4.6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
	Idle,
	Scanning,
	Planning,
	Executing,
	Paused,
	Finalizing,
}

/// Item-level progress (§6.4)
#[derive(Debug, Clone)]
pub struct ProgressChanged {
	pub operation: SyncOperation,
	pub current_file: usize,
	pub total_files: usize,
	pub percentage: f64,
	pub current_file_name: Option<String>,
	pub is_cancelled: bool,
}

/// Byte-level progress, emitted while a single file streams (§6.4)
#[derive(Debug, Clone)]
pub struct FileProgressChanged {
	pub path: String,
	pub bytes_transferred: u64,
	pub total_bytes: u64,
	pub operation: crate::storage::TransferOperation,
	pub percent_complete: f64,
}

/// A conflict was detected and is about to be resolved (§6.4)
#[derive(Debug, Clone)]
pub struct ConflictDetected {
	pub file_path: String,
	pub local_item: Option<SyncItem>,
	pub remote_item: Option<SyncItem>,
	pub conflict_type: ConflictType,
}

/// One event out of the engine's event stream
#[derive(Debug, Clone)]
pub enum SyncEvent {
	Progress(ProgressChanged),
	FileProgress(FileProgressChanged),
	ConflictDetected(ConflictDetected),
}

/// Sending half the engine holds; cloned into a receiver per subscriber
pub type EventSender = tokio::sync::mpsc::UnboundedSender<SyncEvent>;
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<SyncEvent>;

/// Create a fresh event channel pair for a `SyncEngine`
pub fn channel() -> (EventSender, EventReceiver) {
	tokio::sync::mpsc::unbounded_channel()
}

pub fn percentage(current: usize, total: usize) -> f64 {
	if total == 0 {
		100.0
	} else {
		(current as f64 / total as f64) * 100.0
	}
}

#[allow(dead_code)]
pub(crate) fn elapsed_since(start: std::time::Instant) -> Duration {
	start.elapsed()
}


// vim: ts=4
