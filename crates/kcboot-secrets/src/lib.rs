// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client secret provisioning.
//!
//! Every declared OAuth client needs a secret. The secret lives in an env file
//! under the key named by the client definition. A stored value is used as-is
//! unless it is blank or a placeholder; what happens then depends on the
//! configured [`SecretPolicy`].

mod error;
mod generate;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use kcboot_clients::ClientDefinition;
use kcboot_common_secret::SecretString;
use kcboot_envfile::EnvFile;
use tracing::{debug, info};

pub use error::SecretsError;
pub use generate::{
	generate, is_missing, SecretShape, DEFAULT_SECRET_LENGTH, LEGACY_MIN_LENGTH, PLACEHOLDERS,
};

/// What to do when a client's secret is missing or a placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecretPolicy {
	/// Generate a secret and persist it to the secret store.
	#[default]
	Generate,
	/// Fail the run; an operator must supply the secret.
	Require,
}

impl FromStr for SecretPolicy {
	type Err = SecretsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"generate" => Ok(Self::Generate),
			"require" => Ok(Self::Require),
			other => Err(SecretsError::UnknownPolicy(other.to_string())),
		}
	}
}

impl fmt::Display for SecretPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Generate => f.write_str("generate"),
			Self::Require => f.write_str("require"),
		}
	}
}

/// Secrets resolved for one run, keyed by client name.
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
	pub by_client: BTreeMap<String, SecretString>,
	/// Env keys written during this run, in resolution order.
	pub generated: Vec<String>,
}

impl ResolvedSecrets {
	pub fn get(&self, client: &str) -> Option<&SecretString> {
		self.by_client.get(client)
	}
}

/// Resolve a secret for every definition.
///
/// Lookup order for a key is the secret store, then `inherited` (values merged
/// from the other env files and the environment). The first non-missing value
/// is used unchanged and nothing is written. Otherwise, under
/// [`SecretPolicy::Generate`] a new secret is written to `store` right away so
/// it survives a failure later in the run; under [`SecretPolicy::Require`] the
/// call fails listing every missing key, before anything is written.
pub fn resolve_client_secrets(
	store: &mut EnvFile,
	inherited: &BTreeMap<String, String>,
	definitions: &[ClientDefinition],
	policy: SecretPolicy,
) -> Result<ResolvedSecrets, SecretsError> {
	if policy == SecretPolicy::Require {
		let mut missing: Vec<String> = Vec::new();
		for definition in definitions {
			let key = &definition.secret_env_key;
			if lookup(store, inherited, key).is_none() && !missing.contains(key) {
				missing.push(key.clone());
			}
		}
		if !missing.is_empty() {
			return Err(SecretsError::Missing {
				path: store.path().to_path_buf(),
				keys: missing,
			});
		}
	}

	let mut resolved = ResolvedSecrets::default();

	for definition in definitions {
		let key = &definition.secret_env_key;

		let value = match lookup(store, inherited, key) {
			Some(existing) => {
				debug!(
					client = %definition.name,
					key = %key,
					shape = ?SecretShape::classify(existing),
					"using stored client secret"
				);
				existing.to_string()
			}
			None => {
				let value = generate(DEFAULT_SECRET_LENGTH);
				store.set(key, &value)?;
				info!(
					client = %definition.name,
					key = %key,
					path = %store.path().display(),
					"generated client secret"
				);
				resolved.generated.push(key.clone());
				value
			}
		};

		resolved
			.by_client
			.insert(definition.name.clone(), SecretString::from(value));
	}

	Ok(resolved)
}

fn lookup<'a>(
	store: &'a EnvFile,
	inherited: &'a BTreeMap<String, String>,
	key: &str,
) -> Option<&'a str> {
	store
		.get(key)
		.filter(|v| !is_missing(v))
		.or_else(|| inherited.get(key).map(String::as_str).filter(|v| !is_missing(v)))
}
