//! Error types for SharpSync operations

use std::error::Error;
use std::fmt;
use std::io;

/// Unified error type returned by engine-level operations
///
/// This is the taxonomy from the design: most variants are fatal to the
/// call that produced them, while a handful (`AuthFailed`, `NotFound`,
/// `TransferIO`, `ConflictUnresolved`, `CallbackError`) are recorded
/// per-action during a sync and do not abort it.
#[derive(Debug)]
pub enum SharpSyncError {
	/// The store was used before `initialize()` was called
	NotInitialized,

	/// A public operation was called on a torn-down engine/tracker
	Disposed,

	/// A second `synchronize*` call was attempted while one was in flight
	Busy,

	/// The operation's cancellation token was tripped
	Cancelled,

	/// `timeoutSeconds` elapsed before the sync completed
	Timeout,

	/// Authentication or token refresh failed
	AuthFailed { message: String },

	/// A path required to exist did not
	NotFound { path: String },

	/// A byte-stream transfer failed
	TransferIO { path: String, source: Box<dyn Error + Send + Sync> },

	/// The conflict resolver returned `Ask` with no handler available
	ConflictUnresolved { path: String },

	/// A host-supplied callback (virtual placeholder, conflict resolver) erred
	CallbackError { message: String },

	/// The durable sync-state store failed in a way that is fatal to the sync
	StoreIO(Box<dyn Error + Send + Sync>),

	/// Plain I/O error bubbled up from a `Storage` implementation
	Io(io::Error),

	/// Catch-all for configuration/invariant violations
	Other { message: String },
}

impl fmt::Display for SharpSyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SharpSyncError::NotInitialized => write!(f, "sync state store is not initialized"),
			SharpSyncError::Disposed => write!(f, "operation on a disposed engine"),
			SharpSyncError::Busy => write!(f, "a synchronize operation is already in progress"),
			SharpSyncError::Cancelled => write!(f, "operation was cancelled"),
			SharpSyncError::Timeout => write!(f, "operation timed out"),
			SharpSyncError::AuthFailed { message } => write!(f, "authentication failed: {}", message),
			SharpSyncError::NotFound { path } => write!(f, "path not found: {}", path),
			SharpSyncError::TransferIO { path, source } => {
				write!(f, "transfer failed for {}: {}", path, source)
			}
			SharpSyncError::ConflictUnresolved { path } => {
				write!(f, "conflict at {} was not resolved (Ask with no handler)", path)
			}
			SharpSyncError::CallbackError { message } => write!(f, "callback error: {}", message),
			SharpSyncError::StoreIO(e) => write!(f, "sync state store I/O error: {}", e),
			SharpSyncError::Io(e) => write!(f, "I/O error: {}", e),
			SharpSyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SharpSyncError {}

impl From<io::Error> for SharpSyncError {
	fn from(e: io::Error) -> Self {
		SharpSyncError::Io(e)
	}
}

impl From<String> for SharpSyncError {
	fn from(message: String) -> Self {
		SharpSyncError::Other { message }
	}
}

/// Errors specific to the sync-state store (§4.1)
#[derive(Debug)]
pub enum StoreError {
	NotInitialized,
	Io(Box<dyn Error + Send + Sync>),
	Corrupted { message: String },
	TransactionAlreadyClosed,
}

impl fmt::Display for StoreError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StoreError::NotInitialized => write!(f, "store not initialized"),
			StoreError::Io(e) => write!(f, "store I/O error: {}", e),
			StoreError::Corrupted { message } => write!(f, "store corrupted: {}", message),
			StoreError::TransactionAlreadyClosed => {
				write!(f, "transaction already committed or rolled back")
			}
		}
	}
}

impl Error for StoreError {}

impl From<StoreError> for SharpSyncError {
	fn from(e: StoreError) -> Self {
		match e {
			StoreError::NotInitialized => SharpSyncError::NotInitialized,
			other => SharpSyncError::StoreIO(Box::new(other)),
		}
	}
}

/// Errors specific to the change tracker (§4.3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
	/// Operation attempted after `dispose()`
	Disposed,
}

impl fmt::Display for TrackerError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TrackerError::Disposed => write!(f, "change tracker has been disposed"),
		}
	}
}

impl Error for TrackerError {}

impl From<TrackerError> for SharpSyncError {
	fn from(_: TrackerError) -> Self {
		SharpSyncError::Disposed
	}
}

/// Errors specific to the exclusion/inclusion filter (§4.2)
#[derive(Debug)]
pub enum FilterError {
	InvalidPattern { pattern: String, message: String },
}

impl fmt::Display for FilterError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FilterError::InvalidPattern { pattern, message } => {
				write!(f, "invalid pattern '{}': {}", pattern, message)
			}
		}
	}
}

impl Error for FilterError {}

impl From<FilterError> for SharpSyncError {
	fn from(e: FilterError) -> Self {
		SharpSyncError::Other { message: e.to_string() }
	}
}

// vim: ts=4
