// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use kcboot_common_secret::SecretString;

/// One `-s field=value` assignment on a create or update call.
#[derive(Clone, PartialEq, Eq)]
pub struct Assignment {
	field: String,
	value: String,
}

impl Assignment {
	pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			value: value.into(),
		}
	}

	/// Boolean field, rendered as `true` / `false`.
	pub fn flag(field: impl Into<String>, value: bool) -> Self {
		Self::new(field, if value { "true" } else { "false" })
	}

	/// List field, rendered as a JSON array of strings (`["/Members"]`).
	pub fn list<S: AsRef<str>>(field: impl Into<String>, items: &[S]) -> Self {
		let items: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
		let rendered = serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string());
		Self::new(field, rendered)
	}

	pub fn secret(field: impl Into<String>, value: &SecretString) -> Self {
		Self::new(field, value.expose().clone())
	}

	pub fn field(&self) -> &str {
		&self.field
	}

	pub fn value(&self) -> &str {
		&self.value
	}

	/// Argument following `-s`.
	pub fn to_arg(&self) -> String {
		format!("{}={}", self.field, self.value)
	}
}

impl fmt::Debug for Assignment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if kcboot_redact::is_sensitive_key(&self.field) {
			write!(f, "{}={}", self.field, kcboot_common_secret::REDACTED)
		} else {
			write!(f, "{}={}", self.field, self.value)
		}
	}
}

/// Append `-s field=value` pairs to `args`.
pub fn push_assignments(args: &mut Vec<String>, assignments: &[Assignment]) {
	for assignment in assignments {
		args.push("-s".to_string());
		args.push(assignment.to_arg());
	}
}
