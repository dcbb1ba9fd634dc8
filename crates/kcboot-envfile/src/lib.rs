// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Line-oriented `KEY=value` env files.
//!
//! Env files are the only state kcboot persists between runs: operator
//! settings (admin credentials, realm name) and generated client secrets both
//! live in them. This crate keeps the file's lines intact, including comments
//! and duplicate assignments, and derives a key/value view from them.
//!
//! - [`load`] returns the key/value view, or an empty map for a missing file
//! - [`set`] rewrites a single key and writes the whole file back at once
//! - [`merge`] overlays several files in the order they are declared
//! - [`EnvFile`] is an in-memory snapshot with write-through [`EnvFile::set`]

mod error;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

pub use error::EnvFileError;

/// Prefix marking a comment line.
pub const COMMENT_MARKER: char = '#';

/// Snapshot of an env file: the raw lines as found on disk.
///
/// Lookups resolve to the last assignment of a key. Updates replace the first
/// assignment line in place and keep every other line and its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFile {
	path: PathBuf,
	lines: Vec<String>,
}

impl EnvFile {
	/// Read `path`, treating a missing file as empty.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, EnvFileError> {
		let path = path.into();
		let lines = match fs::read_to_string(&path) {
			Ok(content) => content.lines().map(str::to_string).collect(),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!(path = %path.display(), "env file not found, starting empty");
				Vec::new()
			}
			Err(source) => return Err(EnvFileError::Read { path, source }),
		};

		trace!(path = %path.display(), lines = lines.len(), "opened env file");
		Ok(Self { path, lines })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn lines(&self) -> &[String] {
		&self.lines
	}

	/// Value of the last assignment of `key`, if any.
	pub fn get(&self, key: &str) -> Option<&str> {
		self
			.lines
			.iter()
			.rev()
			.filter_map(|line| parse_assignment(line))
			.find(|(k, _)| *k == key)
			.map(|(_, v)| v)
	}

	/// Key/value projection of the snapshot.
	pub fn values(&self) -> BTreeMap<String, String> {
		self
			.lines
			.iter()
			.filter_map(|line| parse_assignment(line))
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	/// Assign `key=value` and write the file back immediately.
	///
	/// The first line assigning `key` is replaced in place; later duplicate
	/// assignments are rewritten to the same value so they cannot shadow it.
	/// Without an existing assignment the line is appended.
	pub fn set(&mut self, key: &str, value: &str) -> Result<(), EnvFileError> {
		let assignment = format!("{key}={value}");
		let mut replaced = 0usize;

		for line in self.lines.iter_mut() {
			if assigns(line, key) {
				*line = assignment.clone();
				replaced += 1;
			}
		}

		if replaced == 0 {
			self.lines.push(assignment);
		}

		debug!(
			path = %self.path.display(),
			key = %key,
			replaced,
			"updated env file key"
		);

		self.persist()
	}

	fn persist(&self) -> Result<(), EnvFileError> {
		fs::write(&self.path, render(&self.lines)).map_err(|source| EnvFileError::Write {
			path: self.path.clone(),
			source,
		})
	}
}

/// Load the key/value view of `path`. A missing file yields an empty map.
pub fn load(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>, EnvFileError> {
	Ok(EnvFile::open(path.as_ref())?.values())
}

/// Read `path`, assign `key=value`, and write the file back in one call.
pub fn set(path: impl AsRef<Path>, key: &str, value: &str) -> Result<(), EnvFileError> {
	EnvFile::open(path.as_ref())?.set(key, value)
}

/// Load several env files, later files overriding earlier ones.
pub fn merge<P: AsRef<Path>>(paths: &[P]) -> Result<BTreeMap<String, String>, EnvFileError> {
	let mut merged = BTreeMap::new();
	for path in paths {
		let values = load(path)?;
		debug!(path = %path.as_ref().display(), keys = values.len(), "merging env file");
		merged.extend(values);
	}
	Ok(merged)
}

/// Split an assignment line into key and value.
///
/// Blank lines, comments and lines without `=` are not assignments.
pub fn parse_assignment(line: &str) -> Option<(&str, &str)> {
	let line = line.trim();
	if line.is_empty() || line.starts_with(COMMENT_MARKER) {
		return None;
	}
	line.split_once('=')
}

fn assigns(line: &str, key: &str) -> bool {
	matches!(parse_assignment(line), Some((k, _)) if k == key)
}

fn render(lines: &[String]) -> String {
	let end = lines
		.iter()
		.rposition(|line| !line.trim().is_empty())
		.map_or(0, |i| i + 1);

	let mut out = lines[..end].join("\n");
	out.push('\n');
	out
}
