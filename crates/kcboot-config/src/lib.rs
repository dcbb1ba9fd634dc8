// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session configuration for kcboot.
//!
//! This crate provides:
//! - Layered configuration from defaults, env files, the environment and CLI
//! - Validation into an immutable [`SessionConfig`]
//! - The [`RealmLayout`] of roles, groups and scopes, optionally from TOML

pub mod error;
pub mod layer;
pub mod layout;
pub mod registry;
pub mod session;
pub mod sources;

use std::path::PathBuf;

pub use error::ConfigError;
pub use layer::SessionConfigLayer;
pub use layout::RealmLayout;
pub use registry::ConfigRegistry;
pub use session::{SessionConfig, DEFAULT_ENV_FILE};
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load the session configuration with the default source stack.
///
/// The first env file is required; later ones are optional overlays.
pub fn load_session(
	env_files: &[PathBuf],
	cli: CliOverrides,
) -> Result<SessionConfig, ConfigError> {
	let env_files: Vec<PathBuf> = if env_files.is_empty() {
		vec![PathBuf::from(DEFAULT_ENV_FILE)]
	} else {
		env_files.to_vec()
	};

	let mut registry = ConfigRegistry::new();
	registry.register(Box::new(sources::DefaultsSource));
	for (index, path) in env_files.iter().enumerate() {
		let source = if index == 0 {
			sources::EnvFileSource::required(path)
		} else {
			sources::EnvFileSource::optional(path)
		};
		registry.register(Box::new(source));
	}
	registry.register(Box::new(sources::EnvSource::process()));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(&env_files)
}
