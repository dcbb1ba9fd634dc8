// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redaction of sensitive fields in structured data.
//!
//! Realm exports contain client secrets, hashed credentials and signing keys.
//! Before an export is shared, every string field whose name looks sensitive
//! is replaced with [`PLACEHOLDER`]. Structure is preserved: objects keep
//! their keys and arrays their length.
//!
//! The same field-name rule is used to mask assignments on logged command
//! lines (see [`is_sensitive_key`]).

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Replacement for redacted values. Also a recognised secret placeholder,
/// so a redacted export re-imported by kcboot triggers regeneration.
pub const PLACEHOLDER: &str = "__PLACEHOLDER__";

static SENSITIVE_KEY: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)(secret|password|private[_-]?key|token|credential)").unwrap()
});

#[derive(Debug, Error)]
pub enum RedactError {
	#[error("failed to read {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("{path} is not valid JSON: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("failed to render redacted document: {0}")]
	Render(#[source] serde_json::Error),

	#[error("failed to write {path}: {source}")]
	Write {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// True when a field named `key` holds sensitive data.
pub fn is_sensitive_key(key: &str) -> bool {
	SENSITIVE_KEY.is_match(key)
}

/// Redact `value`, returning the number of fields replaced.
///
/// Only non-empty strings under a sensitive key are replaced; anything else
/// under such a key (objects, arrays, numbers) is walked like any other value.
pub fn redact_in_place(value: &mut Value) -> usize {
	match value {
		Value::Object(map) => map
			.iter_mut()
			.map(|(key, child)| {
				let replace =
					matches!(child, Value::String(s) if !s.is_empty()) && is_sensitive_key(key);
				if replace {
					*child = Value::String(PLACEHOLDER.to_string());
					1
				} else {
					redact_in_place(child)
				}
			})
			.sum(),
		Value::Array(items) => items.iter_mut().map(redact_in_place).sum(),
		_ => 0,
	}
}

/// Redacted copy of `value`.
pub fn redact(value: &Value) -> Value {
	let mut copy = value.clone();
	redact_in_place(&mut copy);
	copy
}

/// Redact the JSON document at `input` and write it pretty-printed to
/// `output`, followed by a newline. Returns the number of fields replaced.
pub fn redact_file(input: &Path, output: &Path) -> Result<usize, RedactError> {
	let text = std::fs::read_to_string(input).map_err(|source| RedactError::Read {
		path: input.to_path_buf(),
		source,
	})?;

	let mut document: Value = serde_json::from_str(&text).map_err(|source| RedactError::Parse {
		path: input.to_path_buf(),
		source,
	})?;

	let replaced = redact_in_place(&mut document);

	let mut rendered = serde_json::to_string_pretty(&document).map_err(RedactError::Render)?;
	rendered.push('\n');

	std::fs::write(output, rendered).map_err(|source| RedactError::Write {
		path: output.to_path_buf(),
		source,
	})?;

	debug!(
		input = %input.display(),
		output = %output.display(),
		replaced,
		"redacted document"
	);
	Ok(replaced)
}
