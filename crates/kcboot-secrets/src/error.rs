// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use kcboot_envfile::EnvFileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretsError {
	/// The `require` policy found missing or placeholder secrets.
	#[error(
		"missing client secrets in {path}: {} (set them, or use the generate policy)",
		keys.join(", ")
	)]
	Missing { path: PathBuf, keys: Vec<String> },

	#[error("unknown secret policy '{0}', expected 'generate' or 'require'")]
	UnknownPolicy(String),

	#[error(transparent)]
	Store(#[from] EnvFileError),
}
