// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use std::path::{Path, PathBuf};

use kcboot_common_secret::SecretString;
use tracing::trace;

pub const KC_ADMIN: &str = "KC_ADMIN";
pub const KC_ADMIN_PASSWORD: &str = "KC_ADMIN_PASSWORD";
pub const KC_REALM: &str = "KC_REALM";
pub const KC_SERVER_URL: &str = "KC_SERVER_URL";
pub const KC_CONTAINER: &str = "KC_CONTAINER";
pub const KC_ADMIN_CLI: &str = "KC_ADMIN_CLI";
pub const KC_CLIENTS_FILE: &str = "KC_CLIENTS_FILE";
pub const KC_SECRET_POLICY: &str = "KC_SECRET_POLICY";
pub const KC_REALM_LAYOUT: &str = "KC_REALM_LAYOUT";

/// Partial session configuration - all fields are Option for merging.
#[derive(Debug, Clone, Default)]
pub struct SessionConfigLayer {
	pub server_url: Option<String>,
	pub realm: Option<String>,
	pub admin_user: Option<String>,
	pub admin_password: Option<SecretString>,
	pub container: Option<String>,
	pub admin_cli: Option<PathBuf>,
	pub clients_file: Option<PathBuf>,
	pub secret_store: Option<PathBuf>,
	pub secret_policy: Option<String>,
	pub layout_file: Option<PathBuf>,
}

impl SessionConfigLayer {
	/// Build a layer from `KEY=value` pairs. Unrecognised keys and blank
	/// values are ignored.
	pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let mut layer = Self::default();

		for (key, value) in pairs {
			let key = key.as_ref().trim();
			let value = value.as_ref().trim();
			if value.is_empty() {
				continue;
			}

			match key {
				KC_ADMIN => layer.admin_user = Some(value.to_string()),
				KC_ADMIN_PASSWORD => layer.admin_password = Some(SecretString::from(value)),
				KC_REALM => layer.realm = Some(value.to_string()),
				KC_SERVER_URL => layer.server_url = Some(value.to_string()),
				KC_CONTAINER => layer.container = Some(value.to_string()),
				KC_ADMIN_CLI => layer.admin_cli = Some(PathBuf::from(value)),
				KC_CLIENTS_FILE => layer.clients_file = Some(PathBuf::from(value)),
				KC_SECRET_POLICY => layer.secret_policy = Some(value.to_string()),
				KC_REALM_LAYOUT => layer.layout_file = Some(PathBuf::from(value)),
				_ => continue,
			}
			trace!(key = %key, "applied config key");
		}

		layer
	}

	/// Resolve relative paths in this layer against `base`.
	pub fn anchor_paths(&mut self, base: &Path) {
		for path in [
			&mut self.admin_cli,
			&mut self.clients_file,
			&mut self.secret_store,
			&mut self.layout_file,
		]
		.into_iter()
		.flatten()
		{
			if path.is_relative() {
				*path = base.join(&*path);
			}
		}
	}

	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: SessionConfigLayer) {
		merge_field(&mut self.server_url, other.server_url);
		merge_field(&mut self.realm, other.realm);
		merge_field(&mut self.admin_user, other.admin_user);
		merge_field(&mut self.admin_password, other.admin_password);
		merge_field(&mut self.container, other.container);
		merge_field(&mut self.admin_cli, other.admin_cli);
		merge_field(&mut self.clients_file, other.clients_file);
		merge_field(&mut self.secret_store, other.secret_store);
		merge_field(&mut self.secret_policy, other.secret_policy);
		merge_field(&mut self.layout_file, other.layout_file);
	}
}

fn merge_field<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}
