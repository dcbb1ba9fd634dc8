// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource kinds the engine converges, described as data.
//!
//! Each type answers three questions: how to find an existing instance, what
//! to send when creating one, and which fields to re-assert afterwards. The
//! engine in [`crate::reconciler`] owns the control flow.

use std::fmt;

use kcboot_clients::ClientDefinition;
use kcboot_common_secret::SecretString;
use kcboot_kcadm::{Assignment, ResourceId, Scope};

/// Protocol every managed client speaks.
pub const CLIENT_PROTOCOL: &str = "openid-connect";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
	Realm,
	Role,
	Group,
	ClientScope,
	Client,
	User,
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Realm => "realm",
			Self::Role => "role",
			Self::Group => "group",
			Self::ClientScope => "client scope",
			Self::Client => "client",
			Self::User => "user",
		};
		f.write_str(name)
	}
}

/// How an existing instance is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
	/// `get <path>`; a zero exit means it exists and the natural key is its id.
	Probe { path: String, scope: Scope },
	/// `get <resource> -q field=<key> --fields id`.
	QueryId {
		resource: &'static str,
		field: &'static str,
	},
	/// Listing filtered by `filter_field=<key>`, then an exact `name` match
	/// here, since the server-side filter may be a prefix or substring search.
	ExactName {
		resource: &'static str,
		filter_field: &'static str,
	},
}

/// A `create` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creation {
	pub resource: &'static str,
	pub scope: Scope,
	pub assignments: Vec<Assignment>,
}

/// An `update` call re-asserting managed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
	pub path: String,
	pub scope: Scope,
	pub assignments: Vec<Assignment>,
}

/// One kind of directory object the engine can converge.
pub trait ManagedResource {
	fn kind(&self) -> ResourceKind;

	/// Value the resource is identified by (realm name, clientId, username...).
	fn natural_key(&self) -> &str;

	fn lookup(&self) -> Lookup;

	/// Baseline fields for a new instance.
	fn create(&self) -> Creation;

	/// Managed fields to re-assert on every run; `None` for kinds that are
	/// only ever created.
	fn converge(&self, id: &ResourceId) -> Option<Update>;
}

#[derive(Debug, Clone)]
pub struct RealmResource {
	pub name: String,
}

impl ManagedResource for RealmResource {
	fn kind(&self) -> ResourceKind {
		ResourceKind::Realm
	}

	fn natural_key(&self) -> &str {
		&self.name
	}

	fn lookup(&self) -> Lookup {
		Lookup::Probe {
			path: format!("realms/{}", self.name),
			scope: Scope::Server,
		}
	}

	fn create(&self) -> Creation {
		Creation {
			resource: "realms",
			scope: Scope::Server,
			assignments: vec![
				Assignment::new("realm", self.name.as_str()),
				Assignment::flag("enabled", true),
			],
		}
	}

	fn converge(&self, _id: &ResourceId) -> Option<Update> {
		Some(Update {
			path: format!("realms/{}", self.name),
			scope: Scope::Server,
			assignments: vec![
				Assignment::flag("enabled", true),
				Assignment::flag("verifyEmail", false),
				Assignment::flag("loginWithEmailAllowed", true),
			],
		})
	}
}

/// Realm-wide default group assignment, applied as its own step.
pub fn realm_defaults(realm: &str, default_groups: &[String]) -> Update {
	Update {
		path: format!("realms/{realm}"),
		scope: Scope::Server,
		assignments: vec![Assignment::list("defaultGroups", default_groups)],
	}
}

#[derive(Debug, Clone)]
pub struct RoleResource {
	pub name: String,
}

impl ManagedResource for RoleResource {
	fn kind(&self) -> ResourceKind {
		ResourceKind::Role
	}

	fn natural_key(&self) -> &str {
		&self.name
	}

	fn lookup(&self) -> Lookup {
		Lookup::Probe {
			path: format!("roles/{}", self.name),
			scope: Scope::Realm,
		}
	}

	fn create(&self) -> Creation {
		Creation {
			resource: "roles",
			scope: Scope::Realm,
			assignments: vec![
				Assignment::new("name", self.name.as_str()),
				Assignment::flag("composite", false),
			],
		}
	}

	fn converge(&self, _id: &ResourceId) -> Option<Update> {
		None
	}
}

#[derive(Debug, Clone)]
pub struct GroupResource {
	pub name: String,
}

impl ManagedResource for GroupResource {
	fn kind(&self) -> ResourceKind {
		ResourceKind::Group
	}

	fn natural_key(&self) -> &str {
		&self.name
	}

	fn lookup(&self) -> Lookup {
		Lookup::ExactName {
			resource: "groups",
			filter_field: "search",
		}
	}

	fn create(&self) -> Creation {
		Creation {
			resource: "groups",
			scope: Scope::Realm,
			assignments: vec![Assignment::new("name", self.name.as_str())],
		}
	}

	fn converge(&self, _id: &ResourceId) -> Option<Update> {
		None
	}
}

#[derive(Debug, Clone)]
pub struct ClientScopeResource {
	pub name: String,
	pub protocol: String,
}

impl ManagedResource for ClientScopeResource {
	fn kind(&self) -> ResourceKind {
		ResourceKind::ClientScope
	}

	fn natural_key(&self) -> &str {
		&self.name
	}

	fn lookup(&self) -> Lookup {
		Lookup::ExactName {
			resource: "client-scopes",
			filter_field: "name",
		}
	}

	fn create(&self) -> Creation {
		Creation {
			resource: "client-scopes",
			scope: Scope::Realm,
			assignments: vec![
				Assignment::new("name", self.name.as_str()),
				Assignment::new("protocol", self.protocol.as_str()),
			],
		}
	}

	fn converge(&self, _id: &ResourceId) -> Option<Update> {
		None
	}
}

/// A confidential OpenID Connect client.
#[derive(Debug, Clone)]
pub struct ClientResource {
	pub definition: ClientDefinition,
	pub secret: Option<SecretString>,
}

impl ClientResource {
	fn managed_fields(&self) -> Vec<Assignment> {
		let d = &self.definition;
		vec![
			Assignment::new("protocol", CLIENT_PROTOCOL),
			Assignment::flag("enabled", true),
			Assignment::flag("publicClient", false),
			Assignment::flag("directAccessGrantsEnabled", d.direct_access_grants),
			Assignment::flag("standardFlowEnabled", d.standard_flow),
			Assignment::flag("serviceAccountsEnabled", d.service_accounts),
		]
	}
}

impl ManagedResource for ClientResource {
	fn kind(&self) -> ResourceKind {
		ResourceKind::Client
	}

	fn natural_key(&self) -> &str {
		&self.definition.name
	}

	fn lookup(&self) -> Lookup {
		Lookup::QueryId {
			resource: "clients",
			field: "clientId",
		}
	}

	fn create(&self) -> Creation {
		let mut assignments = vec![Assignment::new("clientId", self.definition.name.as_str())];
		assignments.extend(self.managed_fields());
		Creation {
			resource: "clients",
			scope: Scope::Realm,
			assignments,
		}
	}

	fn converge(&self, id: &ResourceId) -> Option<Update> {
		let mut assignments = self.managed_fields();
		if let Some(secret) = self.secret.as_ref().filter(|s| !s.expose().is_empty()) {
			assignments.push(Assignment::secret("secret", secret));
		}
		Some(Update {
			path: format!("clients/{id}"),
			scope: Scope::Realm,
			assignments,
		})
	}
}

/// A human user. The password is set by a separate call after convergence.
#[derive(Debug, Clone)]
pub struct UserResource {
	pub username: String,
	pub default_groups: Vec<String>,
}

impl UserResource {
	/// `username` when it already looks like an address, else `username@localhost`.
	pub fn email(&self) -> String {
		if self.username.contains('@') {
			self.username.clone()
		} else {
			format!("{}@localhost", self.username)
		}
	}
}

impl ManagedResource for UserResource {
	fn kind(&self) -> ResourceKind {
		ResourceKind::User
	}

	fn natural_key(&self) -> &str {
		&self.username
	}

	fn lookup(&self) -> Lookup {
		Lookup::QueryId {
			resource: "users",
			field: "username",
		}
	}

	fn create(&self) -> Creation {
		Creation {
			resource: "users",
			scope: Scope::Realm,
			assignments: vec![
				Assignment::new("username", self.username.as_str()),
				Assignment::flag("enabled", true),
			],
		}
	}

	fn converge(&self, id: &ResourceId) -> Option<Update> {
		Some(Update {
			path: format!("users/{id}"),
			scope: Scope::Realm,
			assignments: vec![
				Assignment::flag("enabled", true),
				Assignment::new("email", self.email()),
				Assignment::flag("emailVerified", true),
				Assignment::list::<&str>("requiredActions", &[]),
				Assignment::list("groups", self.default_groups.as_slice()),
			],
		})
	}
}
