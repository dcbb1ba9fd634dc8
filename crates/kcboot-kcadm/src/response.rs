// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interpretation of `--format json` output.

use std::fmt;

use serde_json::{Map, Value};

/// Directory-assigned identifier of a resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ResourceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Parse command output as JSON. Empty output reads as `null`.
pub fn parse_json(stdout: &str) -> Result<Value, serde_json::Error> {
	let trimmed = stdout.trim();
	if trimmed.is_empty() {
		return Ok(Value::Null);
	}
	serde_json::from_str(trimmed)
}

/// Id of the first entry of a listing, or of a single object.
///
/// Anything without a non-empty `id` means "no match".
pub fn first_id(payload: &Value) -> Option<ResourceId> {
	let entry = match payload {
		Value::Array(items) => items.first()?,
		Value::Object(_) => payload,
		_ => return None,
	};

	match entry.get("id")? {
		Value::String(id) if !id.is_empty() => Some(ResourceId::new(id.clone())),
		Value::Number(n) => Some(ResourceId::new(n.to_string())),
		_ => None,
	}
}

/// Object entries of a listing. Non-array payloads hold no entries.
pub fn entries(payload: Value) -> Vec<Map<String, Value>> {
	match payload {
		Value::Array(items) => items
			.into_iter()
			.filter_map(|item| match item {
				Value::Object(map) => Some(map),
				_ => None,
			})
			.collect(),
		_ => Vec::new(),
	}
}
