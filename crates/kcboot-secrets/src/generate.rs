// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

/// Length of newly generated client secrets.
pub const DEFAULT_SECRET_LENGTH: usize = 48;

/// Shortest generated secret written by earlier deployments.
pub const LEGACY_MIN_LENGTH: usize = 32;

/// Values that mark a secret as "not filled in yet".
///
/// Compared verbatim against the trimmed value, never as substrings.
pub const PLACEHOLDERS: [&str; 3] = ["REPLACE_ME", "PASTE_FROM_KEYCLOAK_UI", "__PLACEHOLDER__"];

/// True when `value` cannot be used as a secret: blank or a known placeholder.
pub fn is_missing(value: &str) -> bool {
	let value = value.trim();
	value.is_empty() || PLACEHOLDERS.contains(&value)
}

/// Generate `length` characters from `[A-Za-z0-9]` using the OS CSPRNG.
pub fn generate(length: usize) -> String {
	OsRng
		.sample_iter(&Alphanumeric)
		.take(length)
		.map(char::from)
		.collect()
}

/// How a stored, non-missing secret looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretShape {
	/// Alphanumeric and of the current generated length.
	Generated,
	/// Alphanumeric, at least [`LEGACY_MIN_LENGTH`], other length.
	LegacyGenerated,
	/// Anything else; supplied by an operator and used as-is.
	OperatorSupplied,
}

impl SecretShape {
	pub fn classify(value: &str) -> Self {
		let alphanumeric = !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric());
		match value.len() {
			DEFAULT_SECRET_LENGTH if alphanumeric => Self::Generated,
			n if alphanumeric && n >= LEGACY_MIN_LENGTH => Self::LegacyGenerated,
			_ => Self::OperatorSupplied,
		}
	}
}
