//! Include/exclude glob filtering (§4.2)
//!
//! Matching is case-insensitive and folds `\` to `/` in both the pattern
//! and the candidate path before testing, mirroring the glob matching in
//! `szilu-syncr::exclusion::patterns` but restricted to a simpler
//! include/exclude contract.

use crate::error::FilterError;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

/// A compiled set of include/exclude patterns
pub struct Filter {
	include: Option<GlobSet>,
	exclude: GlobSet,
}

impl Filter {
	/// Build a filter from raw glob strings
	///
	/// An empty `include` set means "everything is included unless
	/// excluded" (§4.2 rule 2).
	pub fn new(include: &[String], exclude: &[String]) -> Result<Self, FilterError> {
		let include = if include.is_empty() {
			None
		} else {
			Some(build_set(include)?)
		};
		let exclude = build_set(exclude)?;
		Ok(Filter { include, exclude })
	}

	/// The standard factory: common VCS/editor/build-output noise (§4.2)
	pub fn default_patterns() -> Vec<String> {
		vec![
			".git/".to_string(),
			"node_modules/".to_string(),
			"bin/".to_string(),
			"obj/".to_string(),
			"*.tmp".to_string(),
			"~*".to_string(),
			"#*#".to_string(),
			".DS_Store".to_string(),
			"Thumbs.db".to_string(),
		]
	}

	/// Build a filter using the standard factory's exclude set and no includes
	pub fn with_defaults() -> Self {
		Filter::new(&[], &Self::default_patterns()).expect("default patterns are always valid")
	}

	/// `shouldSync(path) -> bool` (§4.2)
	pub fn should_sync(&self, path: &str) -> bool {
		let normalized = crate::path_util::normalize(path);
		if normalized.trim().is_empty() {
			return false;
		}

		let candidate = normalized.to_lowercase();

		if let Some(include) = &self.include {
			if !include.is_match(&candidate) && !matches_any_ancestor(include, &candidate) {
				return false;
			}
		}

		if self.exclude.is_match(&candidate) || matches_any_ancestor(&self.exclude, &candidate) {
			return false;
		}

		true
	}
}

/// Directory patterns ending in `/` must also match any descendant path,
/// which plain glob matching against a full relative path won't do for
/// `dir/` vs `dir/sub/file.txt` unless the pattern is `dir/**`. We check
/// every ancestor prefix of the candidate against the set as a fallback.
fn matches_any_ancestor(set: &GlobSet, candidate: &str) -> bool {
	let mut prefix_end = 0;
	for (i, ch) in candidate.char_indices() {
		if ch == '/' {
			prefix_end = i;
			if set.is_match(&candidate[..prefix_end]) {
				return true;
			}
		}
	}
	false
}

fn build_set(patterns: &[String]) -> Result<GlobSet, FilterError> {
	let mut builder = GlobSetBuilder::new();
	for raw in patterns {
		let folded = raw.replace('\\', "/").to_lowercase();
		let (pattern, is_dir_pattern) = match folded.strip_suffix('/') {
			Some(stripped) => (stripped.to_string(), true),
			None => (folded.clone(), false),
		};

		let glob = compile(&pattern).map_err(|e| FilterError::InvalidPattern {
			pattern: raw.clone(),
			message: e.to_string(),
		})?;
		builder.add(glob);

		if is_dir_pattern {
			let descendants = compile(&format!("{}/**", pattern)).map_err(|e| {
				FilterError::InvalidPattern { pattern: raw.clone(), message: e.to_string() }
			})?;
			builder.add(descendants);
		} else {
			// A bare pattern without a path separator should also match at any depth
			if !pattern.contains('/') {
				let any_depth = compile(&format!("**/{}", pattern)).map_err(|e| {
					FilterError::InvalidPattern { pattern: raw.clone(), message: e.to_string() }
				})?;
				builder.add(any_depth);
			}
		}
	}
	builder.build().map_err(|e| FilterError::InvalidPattern {
		pattern: patterns.join(", "),
		message: e.to_string(),
	})
}

fn compile(pattern: &str) -> Result<Glob, globset::Error> {
	GlobBuilder::new(pattern).literal_separator(false).case_insensitive(false).build()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_path_never_syncs() {
		let f = Filter::with_defaults();
		assert!(!f.should_sync(""));
		assert!(!f.should_sync("   "));
	}

	#[test]
	fn include_restricts_to_matches() {
		let f = Filter::new(&["*.rs".to_string()], &[]).unwrap();
		assert!(f.should_sync("main.rs"));
		assert!(f.should_sync("src/lib.rs"));
		assert!(!f.should_sync("README.md"));
	}

	#[test]
	fn exclude_wins_over_default_inclusion() {
		let f = Filter::new(&[], &["*.tmp".to_string()]).unwrap();
		assert!(!f.should_sync("scratch.tmp"));
		assert!(f.should_sync("scratch.txt"));
	}

	#[test]
	fn default_patterns_exclude_common_noise() {
		let f = Filter::with_defaults();
		assert!(!f.should_sync(".git/HEAD"));
		assert!(!f.should_sync("node_modules/pkg/index.js"));
		assert!(!f.should_sync(".DS_Store"));
		assert!(!f.should_sync("deep/nested/Thumbs.db"));
		assert!(f.should_sync("src/main.rs"));
	}

	#[test]
	fn matching_is_case_insensitive() {
		let f = Filter::new(&[], &["*.TMP".to_string()]).unwrap();
		assert!(!f.should_sync("file.tmp"));
		assert!(!f.should_sync("FILE.TMP"));
	}

	#[test]
	fn backslashes_fold_to_forward_slashes() {
		let f = Filter::new(&[], &["dir/".to_string()]).unwrap();
		assert!(!f.should_sync("dir\\file.txt"));
	}

	#[test]
	fn pure_function_of_patterns_and_path() {
		let f1 = Filter::new(&[], &["*.log".to_string()]).unwrap();
		let f2 = Filter::new(&[], &["*.log".to_string()]).unwrap();
		assert_eq!(f1.should_sync("a.log"), f2.should_sync("a.log"));
		assert_eq!(f1.should_sync("a.log"), f1.should_sync("a.log"));
	}
}

// vim: ts=4
