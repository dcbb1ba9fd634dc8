// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, env files, process environment, CLI.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::layer::SessionConfigLayer;
use crate::ConfigError;

pub const DEFAULT_REALM: &str = "merveilles";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_CONTAINER: &str = "chat-idp";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	EnvFile = 20,
	Environment = 30,
	Cli = 40,
}

/// Trait for configuration sources.
pub trait ConfigSource {
	/// Name for logging
	fn name(&self) -> &'static str;

	/// Precedence level
	fn precedence(&self) -> Precedence;

	/// Load configuration layer from this source
	fn load(&self) -> Result<SessionConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<SessionConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(SessionConfigLayer {
			realm: Some(DEFAULT_REALM.to_string()),
			server_url: Some(DEFAULT_SERVER_URL.to_string()),
			container: Some(DEFAULT_CONTAINER.to_string()),
			..Default::default()
		})
	}
}

/// A `KEY=value` env file.
///
/// Relative paths inside the file are resolved against the file's directory.
pub struct EnvFileSource {
	path: PathBuf,
	required: bool,
}

impl EnvFileSource {
	/// An env file that must exist.
	pub fn required(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: true,
		}
	}

	/// An env file that is skipped when absent.
	pub fn optional(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: false,
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl ConfigSource for EnvFileSource {
	fn name(&self) -> &'static str {
		"env-file"
	}
	fn precedence(&self) -> Precedence {
		Precedence::EnvFile
	}

	fn load(&self) -> Result<SessionConfigLayer, ConfigError> {
		if !self.path.exists() {
			if self.required {
				return Err(ConfigError::MissingEnvFile {
					path: self.path.clone(),
				});
			}
			debug!(path = %self.path.display(), "env file not found, skipping");
			return Ok(SessionConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading env file");
		let values = kcboot_envfile::load(&self.path)?;
		let mut layer = SessionConfigLayer::from_pairs(values);
		if let Some(dir) = self.path.parent() {
			layer.anchor_paths(dir);
		}
		Ok(layer)
	}
}

/// Process environment, `KC_*` variables only.
pub struct EnvSource {
	vars: Vec<(String, String)>,
}

impl EnvSource {
	/// Snapshot the current process environment.
	pub fn process() -> Self {
		Self::from_vars(std::env::vars())
	}

	pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
		Self {
			vars: vars.into_iter().filter(|(k, _)| k.starts_with("KC_")).collect(),
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<SessionConfigLayer, ConfigError> {
		debug!(count = self.vars.len(), "loading environment variables");
		Ok(SessionConfigLayer::from_pairs(
			self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())),
		))
	}
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub realm: Option<String>,
	pub secret_store: Option<PathBuf>,
	pub secret_policy: Option<String>,
	pub layout: Option<PathBuf>,
}

/// CLI argument source.
pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<SessionConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let overrides = self.overrides.clone();
		Ok(SessionConfigLayer {
			realm: overrides.realm,
			secret_store: overrides.secret_store,
			secret_policy: overrides.secret_policy,
			layout_file: overrides.layout,
			..Default::default()
		})
	}
}
