// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use kcboot_clients::ClientsError;
use kcboot_config::ConfigError;
use kcboot_envfile::EnvFileError;
use kcboot_kcadm::KcadmError;
use kcboot_secrets::SecretsError;
use thiserror::Error;

use crate::resource::ResourceKind;

/// Exit code for a run aborted by the operator (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Exit code for every other handled failure.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Coarse failure class reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
	ConfigurationError,
	DependencyMissing,
	CommandFailed,
	MalformedResponse,
	ResolutionFailed,
	UnknownResource,
	Interrupted,
}

impl ErrorCategory {
	pub fn exit_code(self) -> i32 {
		match self {
			Self::Interrupted => INTERRUPTED_EXIT_CODE,
			_ => FAILURE_EXIT_CODE,
		}
	}
}

impl fmt::Display for ErrorCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::ConfigurationError => "configuration error",
			Self::DependencyMissing => "dependency missing",
			Self::CommandFailed => "command failed",
			Self::MalformedResponse => "malformed response",
			Self::ResolutionFailed => "resolution failed",
			Self::UnknownResource => "unknown resource",
			Self::Interrupted => "interrupted",
		};
		f.write_str(name)
	}
}

/// Any failure that aborts a bootstrap run.
#[derive(Debug, Error)]
pub enum ReconcileError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Clients(#[from] ClientsError),

	#[error(transparent)]
	Secrets(#[from] SecretsError),

	#[error(transparent)]
	EnvFile(#[from] EnvFileError),

	#[error(transparent)]
	Kcadm(#[from] KcadmError),

	/// Created, but a fresh lookup still cannot find it.
	#[error("Unable to resolve {kind} id for '{key}'")]
	ResolutionFailed { kind: ResourceKind, key: String },

	#[error("Interrupted")]
	Interrupted,
}

impl ReconcileError {
	pub fn category(&self) -> ErrorCategory {
		match self {
			Self::Config(_) | Self::EnvFile(_) | Self::Secrets(_) => {
				ErrorCategory::ConfigurationError
			}
			Self::Clients(ClientsError::UnknownClient { .. }) => ErrorCategory::UnknownResource,
			Self::Clients(_) => ErrorCategory::ConfigurationError,
			Self::Kcadm(err) => match err {
				KcadmError::DependencyMissing { .. } | KcadmError::ContainerNotRunning { .. } => {
					ErrorCategory::DependencyMissing
				}
				KcadmError::MalformedResponse { .. } => ErrorCategory::MalformedResponse,
				KcadmError::CommandFailed { .. }
				| KcadmError::AuthenticationFailed { .. }
				| KcadmError::EmptyCommand
				| KcadmError::Io { .. } => ErrorCategory::CommandFailed,
			},
			Self::ResolutionFailed { .. } => ErrorCategory::ResolutionFailed,
			Self::Interrupted => ErrorCategory::Interrupted,
		}
	}

	pub fn exit_code(&self) -> i32 {
		self.category().exit_code()
	}
}
