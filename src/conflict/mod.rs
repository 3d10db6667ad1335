//! Conflict analysis and resolution (§4.4)

pub mod resolver;

pub use resolver::{ConflictResolver, DefaultConflictResolver, SmartConflictResolver};

use crate::types::{ConflictAnalysis, ConflictResolution, ConflictType, NewerVersion, SyncItem};
use std::time::SystemTime;

/// Extensions treated as binary, matched case-insensitively (§4.4 step 1)
const BINARY_EXTENSIONS: &[&str] = &[
	"exe", "dll", "so", "dylib", "bin", "zip", "tar", "gz", "7z", "rar", "jpg", "jpeg", "png",
	"gif", "bmp", "ico", "mp4", "mov", "avi", "mkv", "mp3", "wav", "flac", "pdf", "docx", "xlsx",
	"pptx", "sqlite", "db", "o", "a", "class", "jar", "wasm",
];

/// Extensions treated as text, matched case-insensitively (§4.4 step 1)
const TEXT_EXTENSIONS: &[&str] = &[
	"txt", "md", "json", "cs", "js", "ts", "py", "html", "htm", "xml", "yml", "yaml", "toml",
	"ini", "cfg", "conf", "csv", "tsv", "rs", "go", "java", "c", "h", "cpp", "hpp", "sh", "bat",
	"css", "scss", "sql", "log",
];

fn extension_of(path: &str) -> Option<String> {
	path.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

fn is_likely_binary(path: &str) -> bool {
	extension_of(path).is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
}

fn is_likely_text_file(path: &str) -> bool {
	extension_of(path).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
}

/// Build a `ConflictAnalysis` for a detected conflict (§4.4 step 1)
///
/// `fallback` is the resolver's configured strategy, used when `BothModified`
/// timestamps are exactly equal and no side can be called "newer".
pub fn analyze(
	path: &str,
	conflict_type: ConflictType,
	local_item: Option<&SyncItem>,
	remote_item: Option<&SyncItem>,
	fallback: ConflictResolution,
) -> ConflictAnalysis {
	let local_size = local_item.map(|i| i.size).unwrap_or(0);
	let remote_size = remote_item.map(|i| i.size).unwrap_or(0);
	let size_difference = local_size as i64 - remote_size as i64;

	let local_modified = local_item.map(|i| i.last_modified);
	let remote_modified = remote_item.map(|i| i.last_modified);

	let time_difference_secs = match (local_modified, remote_modified) {
		(Some(l), Some(r)) => Some(time_diff_secs(l, r)),
		_ => None,
	};

	let newer_version = newer_of(local_modified, remote_modified);

	let is_likely_binary = is_likely_binary(path);
	let is_likely_text_file = is_likely_text_file(path);

	let (recommended_resolution, reasoning) =
		recommend(conflict_type, newer_version, time_difference_secs, fallback);

	ConflictAnalysis {
		file_path: path.to_string(),
		conflict_type,
		local_item: local_item.cloned(),
		remote_item: remote_item.cloned(),
		local_size,
		remote_size,
		size_difference,
		local_modified,
		remote_modified,
		time_difference_secs,
		newer_version,
		is_likely_binary,
		is_likely_text_file,
		recommended_resolution,
		reasoning,
	}
}

fn time_diff_secs(a: SystemTime, b: SystemTime) -> u64 {
	match a.duration_since(b) {
		Ok(d) => d.as_secs(),
		Err(e) => e.duration().as_secs(),
	}
}

/// `null` (here `None`) when the two timestamps are equal (§3 `ConflictAnalysis`)
fn newer_of(local: Option<SystemTime>, remote: Option<SystemTime>) -> Option<NewerVersion> {
	match (local, remote) {
		(Some(l), Some(r)) if l > r => Some(NewerVersion::Local),
		(Some(l), Some(r)) if r > l => Some(NewerVersion::Remote),
		_ => None,
	}
}

/// The recommendation table from §4.4 step 2
fn recommend(
	conflict_type: ConflictType,
	newer_version: Option<NewerVersion>,
	_time_difference_secs: Option<u64>,
	fallback: ConflictResolution,
) -> (ConflictResolution, String) {
	match conflict_type {
		ConflictType::DeletedLocallyModifiedRemotely => (
			ConflictResolution::UseRemote,
			"deleted locally, modified remotely: keep the remote copy".to_string(),
		),
		ConflictType::ModifiedLocallyDeletedRemotely => (
			ConflictResolution::UseLocal,
			"modified locally, deleted remotely: keep the local copy".to_string(),
		),
		ConflictType::BothModified => match newer_version {
			Some(NewerVersion::Local) => {
				(ConflictResolution::UseLocal, "both modified: local copy is newer".to_string())
			}
			Some(NewerVersion::Remote) => {
				(ConflictResolution::UseRemote, "both modified: remote copy is newer".to_string())
			}
			None => (fallback, "both modified, timestamps tied: using fallback strategy".to_string()),
		},
		ConflictType::TypeConflict => {
			(ConflictResolution::Skip, "file/directory type conflict with no handler: skip".to_string())
		}
	}
}


// vim: ts=4
