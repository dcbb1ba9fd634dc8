// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kcboot_clients::ClientDefinition;
use kcboot_common_secret::SecretString;
use kcboot_config::RealmLayout;
use kcboot_kcadm::{first_id, CommandRunner, Kcadm, ResourceId};
use kcboot_secrets::ResolvedSecrets;
use tracing::{debug, info, instrument, warn};

use crate::error::ReconcileError;
use crate::resource::{
	realm_defaults, ClientResource, ClientScopeResource, GroupResource, Lookup, ManagedResource,
	RealmResource, ResourceKind, RoleResource, Update, UserResource,
};

/// Shared flag raised by the Ctrl+C handler and polled between steps.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn trigger(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_triggered(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	/// `Err(Interrupted)` once triggered.
	pub fn check(&self) -> Result<(), ReconcileError> {
		if self.is_triggered() {
			return Err(ReconcileError::Interrupted);
		}
		Ok(())
	}
}

/// Outcome of converging one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence {
	pub id: ResourceId,
	/// Whether this run created it.
	pub created: bool,
}

/// Optional user to create or update.
#[derive(Debug, Clone)]
pub struct UserSpec {
	pub username: String,
	pub password: SecretString,
}

/// Everything one run asserts.
#[derive(Debug)]
pub struct RunPlan {
	pub server_url: String,
	pub admin_user: String,
	pub admin_password: SecretString,
	pub layout: RealmLayout,
	pub clients: Vec<ClientDefinition>,
	pub secrets: ResolvedSecrets,
	pub user: Option<UserSpec>,
}

/// A resource created during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedResource {
	pub kind: ResourceKind,
	pub key: String,
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
	pub realm: String,
	pub clients: Vec<String>,
	pub user: Option<String>,
	/// Env keys whose secrets were generated this run.
	pub generated: Vec<String>,
	pub created: Vec<CreatedResource>,
}

impl RunReport {
	/// Operator-facing summary, one line each.
	pub fn summary_lines(&self) -> Vec<String> {
		let mut lines = vec![
			"Done".to_string(),
			format!("Realm: {}", self.realm),
			format!("Clients: {}", self.clients.join(", ")),
		];
		if let Some(user) = &self.user {
			lines.push(format!("User: {user}"));
		}
		if !self.generated.is_empty() {
			lines.push(format!("Generated env keys: {}", self.generated.join(", ")));
			lines.push("Recreate chat-server to load updated env".to_string());
		}
		lines
	}
}

/// Converges one realm through a [`Kcadm`] client.
///
/// Every step either succeeds or aborts the run; nothing is retried and
/// nothing already converged is rolled back.
pub struct Reconciler<'a, R> {
	kcadm: &'a Kcadm<R>,
	interrupt: Interrupt,
	created: Vec<CreatedResource>,
}

impl<'a, R: CommandRunner> Reconciler<'a, R> {
	pub fn new(kcadm: &'a Kcadm<R>, interrupt: Interrupt) -> Self {
		Self {
			kcadm,
			interrupt,
			created: Vec::new(),
		}
	}

	pub fn realm(&self) -> &str {
		self.kcadm.realm()
	}

	/// Resources created so far by this reconciler.
	pub fn created(&self) -> &[CreatedResource] {
		&self.created
	}

	/// Run the full sequence: runtime check, login, realm, roles, groups,
	/// realm defaults, client scopes, clients, then the optional user.
	#[instrument(skip_all, fields(realm = %self.kcadm.realm()))]
	pub fn run(&mut self, plan: &RunPlan) -> Result<RunReport, ReconcileError> {
		self.interrupt.check()?;
		self.kcadm.validate_runtime()?;

		self.authenticate(&plan.server_url, &plan.admin_user, &plan.admin_password)?;
		self.ensure_realm()?;

		for role in &plan.layout.roles {
			self.ensure_role(role)?;
		}
		for group in &plan.layout.groups {
			self.ensure_group(group)?;
		}
		self.ensure_realm_defaults(&plan.layout.default_groups)?;
		for scope in &plan.layout.client_scopes {
			self.ensure_client_scope(scope, &plan.layout.scope_protocol)?;
		}
		for definition in &plan.clients {
			self.ensure_client(definition, plan.secrets.get(&definition.name))?;
		}
		if let Some(user) = &plan.user {
			self.ensure_user(&user.username, &user.password, &plan.layout.default_groups)?;
		}

		Ok(RunReport {
			realm: self.realm().to_string(),
			clients: plan.clients.iter().map(|c| c.name.clone()).collect(),
			user: plan.user.as_ref().map(|u| u.username.clone()),
			generated: plan.secrets.generated.clone(),
			created: self.created.clone(),
		})
	}

	pub fn authenticate(
		&self,
		server_url: &str,
		admin_user: &str,
		admin_password: &SecretString,
	) -> Result<(), ReconcileError> {
		self.interrupt.check()?;
		self.kcadm.authenticate(server_url, admin_user, admin_password)?;
		Ok(())
	}

	pub fn ensure_realm(&mut self) -> Result<Convergence, ReconcileError> {
		let realm = RealmResource {
			name: self.realm().to_string(),
		};
		self.ensure(&realm)
	}

	/// Set the realm's default groups. Kept apart from [`Self::ensure_realm`]
	/// as a realm-wide side effect.
	pub fn ensure_realm_defaults(&self, default_groups: &[String]) -> Result<(), ReconcileError> {
		self.interrupt.check()?;
		info!(groups = ?default_groups, "applying realm default groups");
		self.apply(&realm_defaults(self.realm(), default_groups))
	}

	pub fn ensure_role(&mut self, name: &str) -> Result<Convergence, ReconcileError> {
		self.ensure(&RoleResource {
			name: name.to_string(),
		})
	}

	pub fn ensure_group(&mut self, name: &str) -> Result<Convergence, ReconcileError> {
		self.ensure(&GroupResource {
			name: name.to_string(),
		})
	}

	pub fn ensure_client_scope(
		&mut self,
		name: &str,
		protocol: &str,
	) -> Result<Convergence, ReconcileError> {
		self.ensure(&ClientScopeResource {
			name: name.to_string(),
			protocol: protocol.to_string(),
		})
	}

	pub fn ensure_client(
		&mut self,
		definition: &ClientDefinition,
		secret: Option<&SecretString>,
	) -> Result<Convergence, ReconcileError> {
		self.ensure(&ClientResource {
			definition: definition.clone(),
			secret: secret.cloned(),
		})
	}

	/// Converge the user, then set a permanent password.
	pub fn ensure_user(
		&mut self,
		username: &str,
		password: &SecretString,
		default_groups: &[String],
	) -> Result<Convergence, ReconcileError> {
		let convergence = self.ensure(&UserResource {
			username: username.to_string(),
			default_groups: default_groups.to_vec(),
		})?;

		self.interrupt.check()?;
		info!(user = %username, "setting password");
		self.kcadm.set_password(username, password)?;
		Ok(convergence)
	}

	/// Resolve, create if absent, re-resolve, converge.
	pub fn ensure(
		&mut self,
		resource: &dyn ManagedResource,
	) -> Result<Convergence, ReconcileError> {
		self.interrupt.check()?;
		let kind = resource.kind();
		let key = resource.natural_key();
		info!(kind = %kind, key = %key, "checking");

		let (id, created) = match self.resolve(resource)? {
			Some(id) => {
				debug!(kind = %kind, key = %key, id = %id, "already exists");
				(id, false)
			}
			None => {
				self.interrupt.check()?;
				info!(kind = %kind, key = %key, "creating");
				let creation = resource.create();
				self.kcadm
					.create(creation.resource, creation.scope, &creation.assignments)?;
				self.created.push(CreatedResource {
					kind,
					key: key.to_string(),
				});

				match self.resolve(resource)? {
					Some(id) => (id, true),
					None => {
						warn!(kind = %kind, key = %key, "created but not found on re-resolve");
						return Err(ReconcileError::ResolutionFailed {
							kind,
							key: key.to_string(),
						});
					}
				}
			}
		};

		if let Some(update) = resource.converge(&id) {
			self.interrupt.check()?;
			info!(kind = %kind, key = %key, "syncing managed fields");
			self.apply(&update)?;
		}

		Ok(Convergence { id, created })
	}

	fn resolve(
		&self,
		resource: &dyn ManagedResource,
	) -> Result<Option<ResourceId>, ReconcileError> {
		let kind = resource.kind();
		let key = resource.natural_key();
		let id = match resource.lookup() {
			Lookup::Probe { path, scope } => self
				.kcadm
				.probe(&path, scope)?
				.then(|| ResourceId::new(key)),
			Lookup::QueryId { resource, field } => self.kcadm.query_id(resource, field, key)?,
			Lookup::ExactName {
				resource,
				filter_field,
			} => {
				let entry = self
					.kcadm
					.list(resource, filter_field, key)?
					.into_iter()
					.find(|entry| entry.get("name").and_then(|n| n.as_str()) == Some(key));
				match entry {
					Some(entry) => Some(first_id(&entry.into()).unwrap_or_else(|| {
						warn!(
							kind = %kind,
							key = %key,
							"listing entry has no id, keying it by name"
						);
						ResourceId::new(key)
					})),
					None => None,
				}
			}
		};
		Ok(id)
	}

	fn apply(&self, update: &Update) -> Result<(), ReconcileError> {
		self.kcadm
			.update(&update.path, update.scope, &update.assignments)?;
		Ok(())
	}
}
