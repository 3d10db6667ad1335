//! Concrete `Storage` backends.
//!
//! Concrete backends beyond a local-filesystem reference are out of scope
//! for this crate; this module carries exactly one — a local-filesystem
//! implementation — used as the reference/test double for both the local
//! and remote side of a sync in this crate's own test suite.

pub mod local;

pub use local::LocalFilesystemStorage;
