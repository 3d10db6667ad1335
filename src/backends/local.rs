//! Local-filesystem `Storage` implementation (§6.1)
//!
//! Serves as both the local and "remote" side of a sync in this crate's own
//! test suite — a second root on the same filesystem standing in for a
//! remote backend, the way `szilu-syncr`'s integration tests sync between
//! two temp directories rather than a live server.

use crate::error::SharpSyncError;
use crate::storage::{
	ByteStream, ChangeInfo, Storage, StorageInfo, StorageType,
};
use crate::types::SyncItem;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::AsyncReadExt;

/// A `Storage` backend rooted at a directory on the local filesystem
pub struct LocalFilesystemStorage {
	root: PathBuf,
}

impl LocalFilesystemStorage {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		LocalFilesystemStorage { root: root.into() }
	}

	fn resolve(&self, path: &str) -> PathBuf {
		let normalized = crate::path_util::normalize(path);
		if normalized.is_empty() {
			self.root.clone()
		} else {
			self.root.join(normalized)
		}
	}

	fn relative_path(&self, absolute: &Path) -> String {
		let relative = absolute.strip_prefix(&self.root).unwrap_or(absolute);
		crate::path_util::normalize(&relative.to_string_lossy())
	}

	async fn stat(&self, absolute: &Path) -> Result<SyncItem, SharpSyncError> {
		let metadata = tokio::fs::symlink_metadata(absolute).await?;
		let is_symlink = metadata.file_type().is_symlink();
		let metadata = if is_symlink { tokio::fs::metadata(absolute).await? } else { metadata };
		let last_modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

		#[cfg(unix)]
		let permissions = {
			use std::os::unix::fs::PermissionsExt;
			Some(format!("{:o}", metadata.permissions().mode() & 0o777))
		};
		#[cfg(not(unix))]
		let permissions = None;

		Ok(SyncItem {
			path: self.relative_path(absolute),
			is_directory: metadata.is_dir(),
			size: metadata.len(),
			last_modified,
			permissions,
			mime_type: None,
			etag: None,
			is_symlink,
		})
	}
}

#[async_trait]
impl Storage for LocalFilesystemStorage {
	fn storage_type(&self) -> StorageType {
		StorageType::LocalFilesystem
	}

	fn root_path(&self) -> &str {
		self.root.to_str().unwrap_or("")
	}

	async fn test_connection(&self) -> Result<(), SharpSyncError> {
		tokio::fs::metadata(&self.root).await?;
		Ok(())
	}

	async fn list_items(&self, prefix: &str) -> Result<Vec<SyncItem>, SharpSyncError> {
		let dir = self.resolve(prefix);
		let mut out = Vec::new();
		let mut entries = match tokio::fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
			Err(e) => return Err(e.into()),
		};
		while let Some(entry) = entries.next_entry().await? {
			out.push(self.stat(&entry.path()).await?);
		}
		Ok(out)
	}

	async fn get_item(&self, path: &str) -> Result<Option<SyncItem>, SharpSyncError> {
		let absolute = self.resolve(path);
		match self.stat(&absolute).await {
			Ok(item) => Ok(Some(item)),
			Err(SharpSyncError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e),
		}
	}

	async fn exists(&self, path: &str) -> Result<bool, SharpSyncError> {
		Ok(tokio::fs::try_exists(self.resolve(path)).await?)
	}

	async fn read_file(&self, path: &str) -> Result<ByteStream, SharpSyncError> {
		let absolute = self.resolve(path);
		let file = tokio::fs::File::open(&absolute).await.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				SharpSyncError::NotFound { path: path.to_string() }
			} else {
				SharpSyncError::Io(e)
			}
		})?;
		Ok(Box::pin(file))
	}

	async fn write_file(&self, path: &str, mut content: ByteStream) -> Result<(), SharpSyncError> {
		let absolute = self.resolve(path);
		if let Some(parent) = absolute.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		let mut buf = Vec::new();
		content.read_to_end(&mut buf).await.map_err(|e| SharpSyncError::TransferIO {
			path: path.to_string(),
			source: Box::new(e),
		})?;
		tokio::fs::write(&absolute, buf).await?;
		Ok(())
	}

	async fn create_directory(&self, path: &str) -> Result<(), SharpSyncError> {
		tokio::fs::create_dir_all(self.resolve(path)).await?;
		Ok(())
	}

	async fn delete(&self, path: &str) -> Result<(), SharpSyncError> {
		let absolute = self.resolve(path);
		match tokio::fs::symlink_metadata(&absolute).await {
			Ok(metadata) if metadata.is_dir() => {
				tokio::fs::remove_dir_all(&absolute).await?;
			}
			Ok(_) => {
				tokio::fs::remove_file(&absolute).await?;
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
			Err(e) => return Err(e.into()),
		}
		Ok(())
	}

	async fn move_item(&self, src: &str, dst: &str) -> Result<(), SharpSyncError> {
		let src_abs = self.resolve(src);
		let dst_abs = self.resolve(dst);
		if !tokio::fs::try_exists(&src_abs).await? {
			return Err(SharpSyncError::NotFound { path: src.to_string() });
		}
		if let Some(parent) = dst_abs.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::rename(&src_abs, &dst_abs).await?;
		Ok(())
	}

	async fn compute_hash(&self, path: &str) -> Result<String, SharpSyncError> {
		let absolute = self.resolve(path);
		let bytes = tokio::fs::read(&absolute).await.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				SharpSyncError::NotFound { path: path.to_string() }
			} else {
				SharpSyncError::Io(e)
			}
		})?;
		Ok(crate::util::hash(&bytes))
	}

	async fn storage_info(&self) -> Result<StorageInfo, SharpSyncError> {
		// No portable free-space API without an extra dependency; unknown
		// totals are represented as `None` per §6.1.
		Ok(StorageInfo::default())
	}

	async fn set_last_modified(&self, path: &str, modified: SystemTime) -> Result<(), SharpSyncError> {
		let absolute = self.resolve(path);
		let filetime = filetime::FileTime::from_system_time(modified);
		filetime::set_file_mtime(&absolute, filetime)
			.map_err(|e| SharpSyncError::Other { message: e.to_string() })
	}

	async fn set_permissions(&self, path: &str, permissions: &str) -> Result<(), SharpSyncError> {
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let mode = u32::from_str_radix(permissions, 8)
				.map_err(|e| SharpSyncError::Other { message: e.to_string() })?;
			let absolute = self.resolve(path);
			tokio::fs::set_permissions(&absolute, std::fs::Permissions::from_mode(mode)).await?;
			Ok(())
		}
		#[cfg(not(unix))]
		{
			let _ = (path, permissions);
			Ok(())
		}
	}

	fn supports_change_polling(&self) -> bool {
		false
	}

	async fn get_remote_changes(&self, _since: SystemTime) -> Result<Vec<ChangeInfo>, SharpSyncError> {
		Ok(Vec::new())
	}
}


// vim: ts=4
