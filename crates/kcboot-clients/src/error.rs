// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientsError {
	#[error("missing client definition file: {path}")]
	Missing { path: PathBuf },

	#[error("failed to read {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The document is not a valid set of client definitions.
	#[error("malformed client definitions: {0}")]
	MalformedInput(String),

	/// A client was selected by name but is not declared.
	#[error("unknown client '{name}' in client definitions")]
	UnknownClient { name: String },
}

impl ClientsError {
	pub fn malformed(msg: impl Into<String>) -> Self {
		Self::MalformedInput(msg.into())
	}
}
