// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use kcboot_common_secret::SecretString;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::assignment::{push_assignments, Assignment};
use crate::error::{KcadmError, KcadmResult};
use crate::response::{self, ResourceId};
use crate::runner::{display_command, CommandOutput, CommandRunner};

/// Location of the admin CLI inside the official container image.
pub const CONTAINER_KCADM_PATH: &str = "/opt/keycloak/bin/kcadm.sh";

/// Realm the administrator authenticates against.
pub const ADMIN_REALM: &str = "master";

const DOCKER: &str = "docker";

/// How the admin CLI is reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KcadmInvocation {
	/// `docker exec <container> /opt/keycloak/bin/kcadm.sh ...`
	Docker { container: String },
	/// A `kcadm.sh` on the local filesystem.
	Local { path: PathBuf },
}

impl KcadmInvocation {
	pub fn docker(container: impl Into<String>) -> Self {
		Self::Docker {
			container: container.into(),
		}
	}

	fn prefix(&self) -> Vec<String> {
		match self {
			Self::Docker { container } => vec![
				DOCKER.to_string(),
				"exec".to_string(),
				container.clone(),
				CONTAINER_KCADM_PATH.to_string(),
			],
			Self::Local { path } => vec![path.display().to_string()],
		}
	}
}

/// Whether a call is issued against the target realm (`-r <realm>`) or the
/// server as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
	Server,
	Realm,
}

/// Typed front end to `kcadm.sh` for one target realm.
#[derive(Debug)]
pub struct Kcadm<R> {
	runner: R,
	invocation: KcadmInvocation,
	realm: String,
}

impl<R: CommandRunner> Kcadm<R> {
	pub fn new(runner: R, invocation: KcadmInvocation, realm: impl Into<String>) -> Self {
		Self {
			runner,
			invocation,
			realm: realm.into(),
		}
	}

	pub fn realm(&self) -> &str {
		&self.realm
	}

	pub fn invocation(&self) -> &KcadmInvocation {
		&self.invocation
	}

	pub fn runner(&self) -> &R {
		&self.runner
	}

	/// Run one admin CLI command.
	///
	/// With `check`, a non-zero exit becomes [`KcadmError::CommandFailed`];
	/// without it the caller inspects [`CommandOutput::status`].
	pub fn execute(&self, args: &[String], check: bool) -> KcadmResult<CommandOutput> {
		let mut argv = self.invocation.prefix();
		argv.extend(args.iter().cloned());
		self.run(&argv, check)
	}

	fn run(&self, argv: &[String], check: bool) -> KcadmResult<CommandOutput> {
		info!(command = %display_command(argv), "running");

		let output = self.runner.run(argv)?;
		if !output.stdout.is_empty() {
			debug!(stdout = %output.stdout, "command stdout");
		}
		if !output.stderr.is_empty() {
			debug!(stderr = %output.stderr, "command stderr");
		}

		if check && !output.success() {
			return Err(KcadmError::CommandFailed {
				message: output.failure_message(argv),
				status: output.status,
			});
		}
		Ok(output)
	}

	/// Confirm the admin CLI is reachable before touching the directory.
	#[instrument(skip(self))]
	pub fn validate_runtime(&self) -> KcadmResult<()> {
		match &self.invocation {
			KcadmInvocation::Docker { container } => {
				let argv = args([DOCKER, "ps", "--format", "{{.Names}}"]);
				let ps = self.run(&argv, true)?;
				let running = ps.stdout.lines().map(str::trim).any(|name| name == container);
				if !running {
					return Err(KcadmError::ContainerNotRunning {
						container: container.clone(),
					});
				}
				info!(container = %container, "found running Keycloak container");
			}
			KcadmInvocation::Local { path } => {
				if !path.exists() {
					return Err(KcadmError::DependencyMissing {
						program: path.display().to_string(),
					});
				}
				info!(path = %path.display(), "using local admin CLI");
			}
		}
		Ok(())
	}

	/// Store admin credentials for subsequent calls.
	#[instrument(skip(self, password), fields(server = %server_url, user = %user))]
	pub fn authenticate(
		&self,
		server_url: &str,
		user: &str,
		password: &SecretString,
	) -> KcadmResult<()> {
		info!("authenticating to Keycloak admin API");
		let argv = args([
			"config",
			"credentials",
			"--server",
			server_url,
			"--realm",
			ADMIN_REALM,
			"--user",
			user,
			"--password",
			password.expose().as_str(),
		]);

		let output = self.execute(&argv, false)?;
		if output.success() {
			return Ok(());
		}

		let message = [output.stderr.trim(), output.stdout.trim()]
			.into_iter()
			.find(|s| !s.is_empty())
			.unwrap_or("Keycloak auth failed")
			.to_string();
		Err(KcadmError::AuthenticationFailed { message })
	}

	/// `get <path>`; the exit status alone decides existence.
	pub fn probe(&self, path: &str, scope: Scope) -> KcadmResult<bool> {
		let mut argv = args(["get", path]);
		self.push_scope(&mut argv, scope);
		Ok(self.execute(&argv, false)?.success())
	}

	/// Id of the first `resource` whose `field` equals `value`, if any.
	pub fn query_id(
		&self,
		resource: &str,
		field: &str,
		value: &str,
	) -> KcadmResult<Option<ResourceId>> {
		let query = format!("{field}={value}");
		let argv = args([
			"get",
			resource,
			"-r",
			self.realm.as_str(),
			"-q",
			query.as_str(),
			"--fields",
			"id",
			"--format",
			"json",
		]);
		let payload = self.execute_json(&argv)?;
		Ok(response::first_id(&payload))
	}

	/// Filtered listing of `resource` as JSON objects.
	pub fn list(
		&self,
		resource: &str,
		field: &str,
		value: &str,
	) -> KcadmResult<Vec<Map<String, Value>>> {
		let query = format!("{field}={value}");
		let argv = args([
			"get",
			resource,
			"-r",
			self.realm.as_str(),
			"-q",
			query.as_str(),
			"--format",
			"json",
		]);
		Ok(response::entries(self.execute_json(&argv)?))
	}

	pub fn create(
		&self,
		resource: &str,
		scope: Scope,
		assignments: &[Assignment],
	) -> KcadmResult<()> {
		let mut argv = args(["create", resource]);
		self.push_scope(&mut argv, scope);
		push_assignments(&mut argv, assignments);
		self.execute(&argv, true).map(drop)
	}

	pub fn update(&self, path: &str, scope: Scope, assignments: &[Assignment]) -> KcadmResult<()> {
		let mut argv = args(["update", path]);
		self.push_scope(&mut argv, scope);
		push_assignments(&mut argv, assignments);
		self.execute(&argv, true).map(drop)
	}

	/// Set a permanent password for `username`.
	pub fn set_password(&self, username: &str, password: &SecretString) -> KcadmResult<()> {
		let argv = args([
			"set-password",
			"-r",
			self.realm.as_str(),
			"--username",
			username,
			"--new-password",
			password.expose().as_str(),
			"--temporary",
			"false",
		]);
		self.execute(&argv, true).map(drop)
	}

	fn execute_json(&self, argv: &[String]) -> KcadmResult<Value> {
		let output = self.execute(argv, true)?;
		response::parse_json(&output.stdout).map_err(|source| KcadmError::MalformedResponse {
			command: display_command(argv),
			source,
		})
	}

	fn push_scope(&self, argv: &mut Vec<String>, scope: Scope) {
		if scope == Scope::Realm {
			argv.push("-r".to_string());
			argv.push(self.realm.clone());
		}
	}
}

fn args<'a>(parts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
	parts.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;
	use std::collections::VecDeque;

	/// Replays canned outputs and records every argv it receives.
	#[derive(Default)]
	struct Scripted {
		outputs: RefCell<VecDeque<CommandOutput>>,
		calls: RefCell<Vec<Vec<String>>>,
	}

	impl Scripted {
		fn with(outputs: Vec<CommandOutput>) -> Self {
			Self {
				outputs: RefCell::new(outputs.into()),
				calls: RefCell::default(),
			}
		}

		fn calls(&self) -> Vec<Vec<String>> {
			self.calls.borrow().clone()
		}
	}

	impl CommandRunner for Scripted {
		fn run(&self, argv: &[String]) -> KcadmResult<CommandOutput> {
			self.calls.borrow_mut().push(argv.to_vec());
			Ok(self.outputs.borrow_mut().pop_front().unwrap_or_default())
		}
	}

	fn ok(stdout: &str) -> CommandOutput {
		CommandOutput {
			status: 0,
			stdout: stdout.to_string(),
			stderr: String::new(),
		}
	}

	fn failed(status: i32, stderr: &str) -> CommandOutput {
		CommandOutput {
			status,
			stdout: String::new(),
			stderr: stderr.to_string(),
		}
	}

	fn kcadm(outputs: Vec<CommandOutput>) -> Kcadm<Scripted> {
		Kcadm::new(Scripted::with(outputs), KcadmInvocation::docker("chat-idp"), "merveilles")
	}

	#[test]
	fn execute_prefixes_docker_exec() {
		let client = kcadm(vec![ok("")]);
		client.execute(&args(["get", "realms/merveilles"]), true).unwrap();
		assert_eq!(
			client.runner().calls()[0],
			["docker", "exec", "chat-idp", CONTAINER_KCADM_PATH, "get", "realms/merveilles"]
		);
	}

	#[test]
	fn execute_prefixes_local_path() {
		let client = Kcadm::new(
			Scripted::with(vec![ok("")]),
			KcadmInvocation::Local {
				path: PathBuf::from("/usr/local/bin/kcadm.sh"),
			},
			"merveilles",
		);
		client.execute(&args(["get", "realms"]), true).unwrap();
		assert_eq!(client.runner().calls()[0], ["/usr/local/bin/kcadm.sh", "get", "realms"]);
	}

	#[test]
	fn checked_failure_carries_stderr() {
		let client = kcadm(vec![failed(1, "Resource not found for url")]);
		let err = client.execute(&args(["get", "realms/x"]), true).unwrap_err();
		match err {
			KcadmError::CommandFailed { message, status } => {
				assert_eq!(message, "Resource not found for url");
				assert_eq!(status, 1);
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn unchecked_failure_is_returned_not_raised() {
		let client = kcadm(vec![failed(1, "nope")]);
		let output = client.execute(&args(["get", "realms/x"]), false).unwrap();
		assert_eq!(output.status, 1);
	}

	#[test]
	fn query_id_zero_matches_is_none() {
		for stdout in ["[]", "", "null", "[{}]"] {
			let client = kcadm(vec![ok(stdout)]);
			assert_eq!(
				client.query_id("clients", "clientId", "app").unwrap(),
				None,
				"stdout={stdout:?}"
			);
		}
	}

	#[test]
	fn query_id_one_match() {
		let client = kcadm(vec![ok(r#"[{"id":"5f1c"}]"#)]);
		assert_eq!(
			client.query_id("clients", "clientId", "app").unwrap(),
			Some(ResourceId::new("5f1c"))
		);
		assert_eq!(
			client.runner().calls()[0][4..],
			[
				"get",
				"clients",
				"-r",
				"merveilles",
				"-q",
				"clientId=app",
				"--fields",
				"id",
				"--format",
				"json"
			]
		);
	}

	/// Unparseable output must never be mistaken for "no such resource",
	/// otherwise the engine would create a duplicate.
	#[test]
	fn query_id_malformed_output_is_an_error() {
		let client = kcadm(vec![ok("Logging into http://localhost:8080 as user admin")]);
		let err = client.query_id("users", "username", "alice").unwrap_err();
		assert!(matches!(err, KcadmError::MalformedResponse { .. }));
	}

	#[test]
	fn list_parses_objects() {
		let client = kcadm(vec![ok(
			r#"[{"id":"1","name":"Members"},{"id":"2","name":"MembersX"}]"#,
		)]);
		let entries = client.list("groups", "search", "Members").unwrap();
		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0]["name"], "Members");
	}

	#[test]
	fn list_malformed_output_is_an_error() {
		let client = kcadm(vec![ok("<html>")]);
		assert!(matches!(
			client.list("groups", "search", "Members"),
			Err(KcadmError::MalformedResponse { .. })
		));
	}

	#[test]
	fn authenticate_targets_master_realm() {
		let client = kcadm(vec![ok("")]);
		client
			.authenticate("http://localhost:8080", "admin", &SecretString::from("pw"))
			.unwrap();
		let call = &client.runner().calls()[0];
		assert!(call.windows(2).any(|w| w == ["--realm", ADMIN_REALM]));
		assert!(call.windows(2).any(|w| w == ["--password", "pw"]));
	}

	#[test]
	fn authenticate_failure_falls_back_to_fixed_message() {
		let client = kcadm(vec![failed(1, "")]);
		let err = client
			.authenticate("http://localhost:8080", "admin", &SecretString::from("pw"))
			.unwrap_err();
		assert!(matches!(
			err,
			KcadmError::AuthenticationFailed { message } if message == "Keycloak auth failed"
		));
	}

	#[test]
	fn authenticate_failure_prefers_stderr() {
		let client = kcadm(vec![failed(1, "Invalid user credentials")]);
		let err = client
			.authenticate("http://localhost:8080", "admin", &SecretString::from("pw"))
			.unwrap_err();
		assert_eq!(err.to_string(), "Invalid user credentials");
	}

	#[test]
	fn probe_reports_exit_status() {
		let client = kcadm(vec![ok("{}"), failed(1, "not found")]);
		assert!(client.probe("roles/community-member", Scope::Realm).unwrap());
		assert!(!client.probe("realms/merveilles", Scope::Server).unwrap());

		let calls = client.runner().calls();
		assert_eq!(calls[0][4..], ["get", "roles/community-member", "-r", "merveilles"]);
		assert_eq!(calls[1][4..], ["get", "realms/merveilles"]);
	}

	#[test]
	fn create_and_update_render_assignments() {
		let client = kcadm(vec![ok(""), ok("")]);
		client
			.create("realms", Scope::Server, &[Assignment::new("realm", "merveilles")])
			.unwrap();
		client
			.update("clients/42", Scope::Realm, &[Assignment::flag("enabled", true)])
			.unwrap();

		let calls = client.runner().calls();
		assert_eq!(calls[0][4..], ["create", "realms", "-s", "realm=merveilles"]);
		assert_eq!(
			calls[1][4..],
			["update", "clients/42", "-r", "merveilles", "-s", "enabled=true"]
		);
	}

	#[test]
	fn set_password_is_never_temporary() {
		let client = kcadm(vec![ok("")]);
		client.set_password("alice", &SecretString::from("pw")).unwrap();
		assert_eq!(
			client.runner().calls()[0][4..],
			[
				"set-password",
				"-r",
				"merveilles",
				"--username",
				"alice",
				"--new-password",
				"pw",
				"--temporary",
				"false"
			]
		);
	}

	#[test]
	fn validate_runtime_requires_running_container() {
		let client = kcadm(vec![ok("postgres\nchat-idp\nprosody")]);
		client.validate_runtime().unwrap();
		assert_eq!(client.runner().calls()[0], ["docker", "ps", "--format", "{{.Names}}"]);

		let client = kcadm(vec![ok("postgres\nchat-idp-old")]);
		let err = client.validate_runtime().unwrap_err();
		assert!(matches!(
			err,
			KcadmError::ContainerNotRunning { container } if container == "chat-idp"
		));
	}

	#[test]
	fn validate_runtime_local_path_must_exist() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("kcadm.sh");
		let client = Kcadm::new(
			Scripted::default(),
			KcadmInvocation::Local { path: missing.clone() },
			"merveilles",
		);
		assert!(matches!(
			client.validate_runtime(),
			Err(KcadmError::DependencyMissing { .. })
		));

		std::fs::write(&missing, "#!/bin/sh\n").unwrap();
		client.validate_runtime().unwrap();
		assert!(client.runner().calls().is_empty());
	}
}
