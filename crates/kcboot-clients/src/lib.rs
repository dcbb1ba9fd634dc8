// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Declared OAuth client definitions.
//!
//! The definition document is a JSON object keyed by client name:
//!
//! ```json
//! {
//!   "chat-web": { "secretEnvKey": "CHAT_WEB_CLIENT_SECRET" },
//!   "forum": {
//!     "directAccessGrants": true,
//!     "standardFlow": true,
//!     "serviceAccounts": false,
//!     "secretEnvKey": "FORUM_CLIENT_SECRET"
//!   }
//! }
//! ```
//!
//! Omitted flags default to a confidential, browser-login-only client.

mod error;

use std::fmt;
use std::path::Path;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

pub use error::ClientsError;

pub const DEFAULT_DIRECT_ACCESS_GRANTS: bool = false;
pub const DEFAULT_STANDARD_FLOW: bool = true;
pub const DEFAULT_SERVICE_ACCOUNTS: bool = false;

/// One declared OAuth client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDefinition {
	/// Unique name, used as the directory's `clientId`.
	pub name: String,
	pub direct_access_grants: bool,
	pub standard_flow: bool,
	pub service_accounts: bool,
	/// Env key holding this client's secret.
	pub secret_env_key: String,
}

/// All client definitions of a document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientCatalog {
	clients: Vec<ClientDefinition>,
}

impl ClientCatalog {
	pub fn get(&self, name: &str) -> Option<&ClientDefinition> {
		self.clients.iter().find(|c| c.name == name)
	}

	pub fn iter(&self) -> impl Iterator<Item = &ClientDefinition> {
		self.clients.iter()
	}

	pub fn names(&self) -> Vec<&str> {
		self.clients.iter().map(|c| c.name.as_str()).collect()
	}

	pub fn len(&self) -> usize {
		self.clients.len()
	}

	pub fn is_empty(&self) -> bool {
		self.clients.is_empty()
	}

	/// Every client, or only `name` when given.
	pub fn select(&self, name: Option<&str>) -> Result<Vec<ClientDefinition>, ClientsError> {
		match name {
			None => Ok(self.clients.clone()),
			Some(name) => self
				.get(name)
				.cloned()
				.map(|c| vec![c])
				.ok_or_else(|| ClientsError::UnknownClient {
					name: name.to_string(),
				}),
		}
	}
}

/// Load and validate the definition document at `path`.
pub fn parse_file(path: &Path) -> Result<ClientCatalog, ClientsError> {
	if !path.exists() {
		return Err(ClientsError::Missing {
			path: path.to_path_buf(),
		});
	}

	let text = std::fs::read_to_string(path).map_err(|source| ClientsError::Read {
		path: path.to_path_buf(),
		source,
	})?;

	let catalog = parse_str(&text)?;
	debug!(
		path = %path.display(),
		clients = catalog.len(),
		"loaded client definitions"
	);
	Ok(catalog)
}

/// Validate a definition document held in memory.
pub fn parse_str(text: &str) -> Result<ClientCatalog, ClientsError> {
	let RawDocument(entries) =
		serde_json::from_str(text).map_err(|e| ClientsError::malformed(e.to_string()))?;

	let clients = entries
		.into_iter()
		.map(|(name, value)| definition(name, value))
		.collect::<Result<Vec<_>, _>>()?;

	Ok(ClientCatalog { clients })
}

fn definition(name: String, value: Value) -> Result<ClientDefinition, ClientsError> {
	if name.trim().is_empty() {
		return Err(ClientsError::malformed("document contains an empty client name"));
	}

	let Value::Object(fields) = value else {
		return Err(ClientsError::malformed(format!(
			"entry '{name}' must be an object"
		)));
	};

	let secret_env_key = match fields.get("secretEnvKey") {
		Some(Value::String(key)) if !key.trim().is_empty() => key.trim().to_string(),
		_ => {
			return Err(ClientsError::malformed(format!(
				"entry '{name}' requires a non-empty secretEnvKey"
			)))
		}
	};

	Ok(ClientDefinition {
		direct_access_grants: flag(
			&fields,
			&name,
			"directAccessGrants",
			DEFAULT_DIRECT_ACCESS_GRANTS,
		)?,
		standard_flow: flag(&fields, &name, "standardFlow", DEFAULT_STANDARD_FLOW)?,
		service_accounts: flag(&fields, &name, "serviceAccounts", DEFAULT_SERVICE_ACCOUNTS)?,
		secret_env_key,
		name,
	})
}

fn flag(
	fields: &Map<String, Value>,
	client: &str,
	field: &str,
	default: bool,
) -> Result<bool, ClientsError> {
	match fields.get(field) {
		None | Some(Value::Null) => Ok(default),
		Some(Value::Bool(value)) => Ok(*value),
		Some(other) => Err(ClientsError::malformed(format!(
			"entry '{client}' field {field} must be a boolean, got {other}"
		))),
	}
}

/// Top-level entries in document order, rejecting duplicate names.
struct RawDocument(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for RawDocument {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct DocumentVisitor;

		impl<'de> Visitor<'de> for DocumentVisitor {
			type Value = RawDocument;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a JSON object keyed by client name")
			}

			fn visit_map<A>(self, mut map: A) -> Result<RawDocument, A::Error>
			where
				A: MapAccess<'de>,
			{
				let mut entries: Vec<(String, Value)> = Vec::new();
				while let Some((name, value)) = map.next_entry::<String, Value>()? {
					if entries.iter().any(|(seen, _)| *seen == name) {
						return Err(de::Error::custom(format!("duplicate client name '{name}'")));
					}
					entries.push((name, value));
				}
				Ok(RawDocument(entries))
			}
		}

		deserializer.deserialize_map(DocumentVisitor)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use tempfile::TempDir;

	fn malformed(text: &str) -> String {
		match parse_str(text) {
			Err(ClientsError::MalformedInput(msg)) => msg,
			other => panic!("expected MalformedInput, got {other:?}"),
		}
	}

	#[test]
	fn defaults_describe_a_confidential_browser_client() {
		let catalog = parse_str(r#"{"app": {"secretEnvKey": "APP_SECRET"}}"#).unwrap();
		let app = catalog.get("app").unwrap();

		assert_eq!(
			app,
			&ClientDefinition {
				name: "app".to_string(),
				direct_access_grants: false,
				standard_flow: true,
				service_accounts: false,
				secret_env_key: "APP_SECRET".to_string(),
			}
		);
	}

	#[test]
	fn explicit_flags_override_defaults() {
		let catalog = parse_str(
			r#"{"svc": {
				"directAccessGrants": true,
				"standardFlow": false,
				"serviceAccounts": true,
				"secretEnvKey": " SVC_SECRET "
			}}"#,
		)
		.unwrap();
		let svc = catalog.get("svc").unwrap();

		assert!(svc.direct_access_grants);
		assert!(!svc.standard_flow);
		assert!(svc.service_accounts);
		assert_eq!(svc.secret_env_key, "SVC_SECRET");
	}

	/// Clients are reconciled in the order they are declared, so the loader
	/// must not sort or hash them.
	#[test]
	fn document_order_is_preserved() {
		let catalog = parse_str(
			r#"{
				"zeta": {"secretEnvKey": "Z"},
				"alpha": {"secretEnvKey": "A"},
				"mid": {"secretEnvKey": "M"}
			}"#,
		)
		.unwrap();
		assert_eq!(catalog.names(), vec!["zeta", "alpha", "mid"]);
	}

	#[test]
	fn unknown_fields_are_ignored() {
		let catalog =
			parse_str(r#"{"app": {"secretEnvKey": "K", "description": "chat web"}}"#).unwrap();
		assert_eq!(catalog.len(), 1);
	}

	#[test]
	fn invalid_json_is_malformed() {
		malformed("{not json");
	}

	#[test]
	fn non_object_root_is_malformed() {
		let msg = malformed(r#"[{"secretEnvKey": "K"}]"#);
		assert!(msg.contains("keyed by client name"), "{msg}");
		malformed(r#""app""#);
	}

	#[test]
	fn empty_name_is_malformed() {
		malformed(r#"{"": {"secretEnvKey": "K"}}"#);
		malformed(r#"{"  ": {"secretEnvKey": "K"}}"#);
	}

	#[test]
	fn duplicate_name_is_malformed() {
		let msg = malformed(r#"{"app": {"secretEnvKey": "A"}, "app": {"secretEnvKey": "B"}}"#);
		assert!(msg.contains("duplicate client name 'app'"), "{msg}");
	}

	#[test]
	fn non_object_entry_is_malformed() {
		let msg = malformed(r#"{"app": "APP_SECRET"}"#);
		assert!(msg.contains("'app' must be an object"), "{msg}");
	}

	#[test]
	fn missing_or_blank_secret_key_is_malformed() {
		malformed(r#"{"app": {}}"#);
		malformed(r#"{"app": {"secretEnvKey": ""}}"#);
		malformed(r#"{"app": {"secretEnvKey": "   "}}"#);
		malformed(r#"{"app": {"secretEnvKey": 42}}"#);
	}

	#[test]
	fn non_boolean_flag_is_malformed() {
		let msg = malformed(r#"{"app": {"secretEnvKey": "K", "standardFlow": "yes"}}"#);
		assert!(msg.contains("standardFlow"), "{msg}");
	}

	#[test]
	fn empty_document_has_no_clients() {
		assert!(parse_str("{}").unwrap().is_empty());
	}

	#[test]
	fn select_unknown_client_fails() {
		let catalog = parse_str(r#"{"app": {"secretEnvKey": "K"}}"#).unwrap();

		assert_eq!(catalog.select(None).unwrap().len(), 1);
		assert_eq!(catalog.select(Some("app")).unwrap()[0].name, "app");
		assert!(matches!(
			catalog.select(Some("other")),
			Err(ClientsError::UnknownClient { name }) if name == "other"
		));
	}

	#[test]
	fn parse_file_reports_missing_file() {
		let dir = TempDir::new().unwrap();
		let err = parse_file(&dir.path().join("clients.json")).unwrap_err();
		assert!(matches!(err, ClientsError::Missing { .. }));
	}

	#[test]
	fn parse_file_reads_document() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("clients.json");
		std::fs::write(&path, r#"{"app": {"secretEnvKey": "APP_SECRET"}}"#).unwrap();

		let catalog = parse_file(&path).unwrap();
		assert_eq!(catalog.names(), vec!["app"]);
	}

	proptest! {
		#[test]
		fn prop_flags_roundtrip(
			dag in proptest::option::of(any::<bool>()),
			sf in proptest::option::of(any::<bool>()),
			sa in proptest::option::of(any::<bool>()),
		) {
			let mut fields = Map::new();
			fields.insert("secretEnvKey".into(), Value::from("K"));
			if let Some(v) = dag { fields.insert("directAccessGrants".into(), Value::from(v)); }
			if let Some(v) = sf { fields.insert("standardFlow".into(), Value::from(v)); }
			if let Some(v) = sa { fields.insert("serviceAccounts".into(), Value::from(v)); }
			let mut root = Map::new();
			root.insert("c".into(), Value::Object(fields));

			let catalog = parse_str(&Value::Object(root).to_string()).unwrap();
			let c = catalog.get("c").unwrap();
			prop_assert_eq!(c.direct_access_grants, dag.unwrap_or(DEFAULT_DIRECT_ACCESS_GRANTS));
			prop_assert_eq!(c.standard_flow, sf.unwrap_or(DEFAULT_STANDARD_FLOW));
			prop_assert_eq!(c.service_accounts, sa.unwrap_or(DEFAULT_SERVICE_ACCOUNTS));
		}
	}
}
