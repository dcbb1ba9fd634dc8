// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixed realm resources reconciled around the declared clients.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::ConfigError;

pub const DEFAULT_ROLES: &[&str] = &["community-member", "community-admin"];
pub const DEFAULT_GROUPS: &[&str] = &["Members", "Admins"];
pub const DEFAULT_DEFAULT_GROUPS: &[&str] = &["/Members"];
pub const DEFAULT_CLIENT_SCOPES: &[&str] = &["community-profile", "xmpp-access", "forum-access"];
pub const DEFAULT_SCOPE_PROTOCOL: &str = "openid-connect";

/// Roles, groups and client scopes every realm gets.
///
/// Loaded from TOML; omitted fields keep their defaults.
///
/// ```toml
/// roles = ["community-member", "community-admin"]
/// groups = ["Members", "Admins"]
/// default_groups = ["/Members"]
/// client_scopes = ["community-profile"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RealmLayout {
	pub roles: Vec<String>,
	pub groups: Vec<String>,
	/// Group paths new users join, e.g. `/Members`.
	pub default_groups: Vec<String>,
	pub client_scopes: Vec<String>,
	pub scope_protocol: String,
}

impl Default for RealmLayout {
	fn default() -> Self {
		Self {
			roles: owned(DEFAULT_ROLES),
			groups: owned(DEFAULT_GROUPS),
			default_groups: owned(DEFAULT_DEFAULT_GROUPS),
			client_scopes: owned(DEFAULT_CLIENT_SCOPES),
			scope_protocol: DEFAULT_SCOPE_PROTOCOL.to_string(),
		}
	}
}

impl RealmLayout {
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		debug!(path = %path.display(), "loading realm layout");
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		let layout: RealmLayout = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
			path: path.to_path_buf(),
			source,
		})?;
		layout.validate()?;
		Ok(layout)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		for (field, names) in [
			("roles", &self.roles),
			("groups", &self.groups),
			("default_groups", &self.default_groups),
			("client_scopes", &self.client_scopes),
		] {
			if names.iter().any(|n| n.trim().is_empty()) {
				return Err(ConfigError::invalid_value(
					format!("layout.{field}"),
					"entries cannot be blank",
				));
			}
		}

		if let Some(path) = self.default_groups.iter().find(|p| !p.starts_with('/')) {
			return Err(ConfigError::invalid_value(
				"layout.default_groups",
				format!("'{path}' must be a group path starting with '/'"),
			));
		}

		if self.scope_protocol.trim().is_empty() {
			return Err(ConfigError::invalid_value(
				"layout.scope_protocol",
				"scope_protocol cannot be empty",
			));
		}

		Ok(())
	}
}

fn owned(items: &[&str]) -> Vec<String> {
	items.iter().map(|s| s.to_string()).collect()
}
