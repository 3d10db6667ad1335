//! The `Storage` port (§6.1) — the abstract interface every concrete
//! backend (local filesystem, WebDAV, SFTP, FTP(S), S3, ...) implements.
//! The engine only ever talks to this trait; backends other than the
//! local-filesystem reference implementation in [`crate::backends::local`]
//! are out of scope for this crate.

use crate::error::SharpSyncError;
use crate::types::SyncItem;
use async_trait::async_trait;
use std::pin::Pin;
use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncWrite};

/// Identifies the kind of backend behind a `Storage` implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
	LocalFilesystem,
	WebDav,
	Sftp,
	Ftp,
	S3,
	Other,
}

/// Coarse capacity figures; `-1` (`None` here) means "unknown" (§6.1)
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageInfo {
	pub total_bytes: Option<u64>,
	pub used_bytes: Option<u64>,
	pub available_bytes: Option<u64>,
}

/// A change observed by a backend's own polling mechanism (§4.5 step 5, §6.1)
#[derive(Debug, Clone)]
pub struct ChangeInfo {
	pub path: String,
	pub change_type: crate::types::ChangeType,
	pub renamed_from: Option<String>,
	pub size: u64,
	pub is_directory: bool,
	pub detected_at: SystemTime,
}

/// Byte-level progress tick a backend may emit while streaming (§6.1, §6.4)
#[derive(Debug, Clone)]
pub struct ProgressEvent {
	pub path: String,
	pub bytes_transferred: u64,
	pub total_bytes: Option<u64>,
	pub operation: TransferOperation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOperation {
	Upload,
	Download,
}

pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;
pub type ByteSink = Pin<Box<dyn AsyncWrite + Send + Unpin>>;

/// The abstract storage port the engine drives (§6.1)
///
/// Every method is fallible with `SharpSyncError`; `NotFound` is used for
/// "required path missing", matching the taxonomy in §7. Optional
/// capabilities (`set_last_modified`, `set_permissions`, `poll_changes`)
/// default to no-ops/empty so a minimal backend only has to implement the
/// required subset.
#[async_trait]
pub trait Storage: Send + Sync {
	fn storage_type(&self) -> StorageType;

	fn root_path(&self) -> &str;

	async fn test_connection(&self) -> Result<(), SharpSyncError>;

	/// Non-recursive listing of one directory (§6.1)
	async fn list_items(&self, prefix: &str) -> Result<Vec<SyncItem>, SharpSyncError>;

	async fn get_item(&self, path: &str) -> Result<Option<SyncItem>, SharpSyncError>;

	async fn exists(&self, path: &str) -> Result<bool, SharpSyncError>;

	async fn read_file(&self, path: &str) -> Result<ByteStream, SharpSyncError>;

	/// Creates intermediate directories as required
	async fn write_file(&self, path: &str, content: ByteStream) -> Result<(), SharpSyncError>;

	/// Idempotent
	async fn create_directory(&self, path: &str) -> Result<(), SharpSyncError>;

	/// Recursive for directories; absent path is not an error
	async fn delete(&self, path: &str) -> Result<(), SharpSyncError>;

	/// Creates parent directories as needed; missing source is `NotFound`
	async fn move_item(&self, src: &str, dst: &str) -> Result<(), SharpSyncError>;

	/// A consistent content-derived digest, stable per instance; algorithm
	/// is implementation-defined and used only for checksum comparison
	async fn compute_hash(&self, path: &str) -> Result<String, SharpSyncError>;

	async fn storage_info(&self) -> Result<StorageInfo, SharpSyncError>;

	/// Optional: defaults to a no-op for backends without timestamp support
	async fn set_last_modified(
		&self,
		_path: &str,
		_modified: SystemTime,
	) -> Result<(), SharpSyncError> {
		Ok(())
	}

	/// Optional: defaults to a no-op for backends without permission support
	async fn set_permissions(&self, _path: &str, _permissions: &str) -> Result<(), SharpSyncError> {
		Ok(())
	}

	/// Optional: defaults to "not supported" / empty result
	fn supports_change_polling(&self) -> bool {
		false
	}

	/// Optional: defaults to empty for backends without a native change feed
	async fn get_remote_changes(&self, _since: SystemTime) -> Result<Vec<ChangeInfo>, SharpSyncError> {
		Ok(Vec::new())
	}
}


// vim: ts=4
