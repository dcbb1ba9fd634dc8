// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for admin CLI operations.
pub type KcadmResult<T> = Result<T, KcadmError>;

/// Errors from running the admin CLI or interpreting its output.
#[derive(Error, Debug)]
pub enum KcadmError {
	/// The executable could not be found at all.
	#[error("Missing dependency: {program}")]
	DependencyMissing { program: String },

	#[error("Container '{container}' is not running. Start your compose stack first.")]
	ContainerNotRunning { container: String },

	/// The command ran and exited non-zero.
	#[error("{message}")]
	CommandFailed { message: String, status: i32 },

	#[error("{message}")]
	AuthenticationFailed { message: String },

	/// Output that should have been JSON was not.
	#[error("Unexpected JSON from Keycloak admin command `{command}`: {source}")]
	MalformedResponse {
		command: String,
		#[source]
		source: serde_json::Error,
	},

	#[error("refusing to run an empty command")]
	EmptyCommand,

	#[error("I/O error running {program}: {source}")]
	Io {
		program: String,
		#[source]
		source: std::io::Error,
	},
}
