// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration registry - manages sources and merges layers.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::layer::SessionConfigLayer;
use crate::session::SessionConfig;
use crate::sources::ConfigSource;
use crate::ConfigError;

/// Registry that manages configuration sources and merges them.
#[derive(Default)]
pub struct ConfigRegistry {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigRegistry {
	/// Create a new empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a configuration source.
	pub fn register(&mut self, source: Box<dyn ConfigSource>) {
		debug!(
			source = source.name(),
			precedence = ?source.precedence(),
			"registering config source"
		);
		self.sources.push(source);
	}

	/// Merge all sources, lowest precedence first, then finalize.
	///
	/// Sources of equal precedence merge in registration order. Unlike missing
	/// optional files, a source that fails to load aborts the whole load.
	pub fn load(&self, env_files: &[PathBuf]) -> Result<SessionConfig, ConfigError> {
		let mut sorted_sources: Vec<_> = self.sources.iter().collect();
		sorted_sources.sort_by_key(|s| s.precedence());

		info!(
			source_count = sorted_sources.len(),
			"loading configuration from sources"
		);

		let mut merged = SessionConfigLayer::default();
		for source in &sorted_sources {
			let layer = source.load()?;
			debug!(source = source.name(), "merging config layer");
			merged.merge(layer);
		}

		let config = SessionConfig::from_layer(merged, env_files)?;

		info!(
			realm = %config.realm,
			server = %config.server_url,
			secret_policy = %config.secret_policy,
			clients_file = %config.clients_file.display(),
			"configuration loaded successfully"
		);

		Ok(config)
	}

	/// Get the number of registered sources.
	pub fn source_count(&self) -> usize {
		self.sources.len()
	}
}
