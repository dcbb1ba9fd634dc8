// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Finalized, validated session configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use kcboot_common_secret::SecretString;
use kcboot_kcadm::KcadmInvocation;
use kcboot_secrets::SecretPolicy;

use crate::layer::{SessionConfigLayer, KC_CONTAINER, KC_REALM, KC_SECRET_POLICY, KC_SERVER_URL};
use crate::layout::RealmLayout;
use crate::ConfigError;

/// Env file used when none is given.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Settings for one bootstrap run. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	pub server_url: String,
	pub realm: String,
	pub admin_user: String,
	pub admin_password: SecretString,
	pub invocation: KcadmInvocation,
	pub clients_file: PathBuf,
	/// Env file generated secrets are written to.
	pub secret_store: PathBuf,
	/// Env files in merge order.
	pub env_files: Vec<PathBuf>,
	pub secret_policy: SecretPolicy,
	pub layout: RealmLayout,
}

impl SessionConfig {
	/// Build the runtime config from a merged layer.
	///
	/// `env_files` is the declared env file list; the first entry anchors the
	/// default clients file and is the default secret store.
	pub fn from_layer(
		layer: SessionConfigLayer,
		env_files: &[PathBuf],
	) -> Result<Self, ConfigError> {
		let admin_user = layer.admin_user.filter(|u| !u.trim().is_empty());
		let admin_password = layer.admin_password.filter(|p| !p.is_blank());
		let (admin_user, admin_password) = match (admin_user, admin_password) {
			(Some(user), Some(password)) => (user, password),
			_ => return Err(ConfigError::MissingCredentials),
		};

		let realm = layer
			.realm
			.ok_or_else(|| ConfigError::missing_field(KC_REALM))?
			.trim()
			.to_string();
		if realm.is_empty() {
			return Err(ConfigError::invalid_value(KC_REALM, "realm cannot be empty"));
		}

		let server_url = layer
			.server_url
			.ok_or_else(|| ConfigError::missing_field(KC_SERVER_URL))?;

		let invocation = match layer.admin_cli {
			Some(path) => KcadmInvocation::Local { path },
			None => {
				let container = layer
					.container
					.ok_or_else(|| ConfigError::missing_field(KC_CONTAINER))?;
				KcadmInvocation::docker(container)
			}
		};

		let primary = env_files
			.first()
			.cloned()
			.unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE));
		let env_dir = primary.parent().unwrap_or(Path::new("")).to_path_buf();

		let clients_file = layer
			.clients_file
			.unwrap_or_else(|| env_dir.join("keycloak-config").join("clients.json"));
		let secret_store = layer.secret_store.unwrap_or(primary);

		let secret_policy = match layer.secret_policy {
			Some(raw) => raw
				.parse::<SecretPolicy>()
				.map_err(|e| ConfigError::invalid_value(KC_SECRET_POLICY, e.to_string()))?,
			None => SecretPolicy::default(),
		};

		let layout = match layer.layout_file {
			Some(path) => RealmLayout::load(&path)?,
			None => RealmLayout::default(),
		};

		Ok(Self {
			server_url,
			realm,
			admin_user,
			admin_password,
			invocation,
			clients_file,
			secret_store,
			env_files: env_files.to_vec(),
			secret_policy,
			layout,
		})
	}

	/// Container the admin CLI runs in, when invoked through `docker exec`.
	pub fn container_name(&self) -> Option<&str> {
		match &self.invocation {
			KcadmInvocation::Docker { container } => Some(container.as_str()),
			KcadmInvocation::Local { .. } => None,
		}
	}

	/// Values of all env files, later files overriding earlier ones.
	pub fn merged_env(&self) -> Result<BTreeMap<String, String>, ConfigError> {
		Ok(kcboot_envfile::merge(self.env_files.as_slice())?)
	}
}
