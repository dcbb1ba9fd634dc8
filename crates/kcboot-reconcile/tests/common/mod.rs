// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory stand-in for a Keycloak server reached through `kcadm.sh`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use kcboot_common_secret::SecretString;
use kcboot_config::{RealmLayout, SessionConfig};
use kcboot_kcadm::{
	CommandOutput, CommandRunner, KcadmInvocation, KcadmResult, CONTAINER_KCADM_PATH,
};
use kcboot_secrets::SecretPolicy;
use serde_json::{json, Value};

pub const CONTAINER: &str = "chat-idp";
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-pw";
pub const REALM: &str = "merveilles";

type Fields = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct Object {
	pub id: String,
	pub fields: Fields,
}

impl Object {
	pub fn field(&self, name: &str) -> Option<&str> {
		self.fields.get(name).map(String::as_str)
	}
}

#[derive(Debug, Default, Clone)]
pub struct Realm {
	pub fields: Fields,
	pub roles: Vec<Object>,
	pub groups: Vec<Object>,
	pub client_scopes: Vec<Object>,
	pub clients: Vec<Object>,
	pub users: Vec<Object>,
	pub passwords: BTreeMap<String, String>,
}

impl Realm {
	fn collection(&mut self, resource: &str) -> Option<&mut Vec<Object>> {
		match resource {
			"roles" => Some(&mut self.roles),
			"groups" => Some(&mut self.groups),
			"client-scopes" => Some(&mut self.client_scopes),
			"clients" => Some(&mut self.clients),
			"users" => Some(&mut self.users),
			_ => None,
		}
	}

	pub fn object_count(&self) -> usize {
		self.roles.len()
			+ self.groups.len()
			+ self.client_scopes.len()
			+ self.clients.len()
			+ self.users.len()
	}
}

#[derive(Debug, Default)]
struct State {
	running: Vec<String>,
	logged_in: bool,
	realms: BTreeMap<String, Realm>,
	next_id: u32,
	calls: Vec<Vec<String>>,
	/// Resources whose creates are acknowledged but never stored.
	swallow_creates: Vec<String>,
	/// Resources whose listings return non-JSON text.
	garbage_listings: Vec<String>,
	/// Resources whose listings omit the `id` field.
	idless_listings: Vec<String>,
}

/// Fake directory implementing [`CommandRunner`].
#[derive(Debug)]
pub struct FakeDirectory {
	state: RefCell<State>,
}

impl Default for FakeDirectory {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeDirectory {
	/// A server with the container running and no realms.
	pub fn new() -> Self {
		Self {
			state: RefCell::new(State {
				running: vec!["postgres".to_string(), CONTAINER.to_string()],
				..Default::default()
			}),
		}
	}

	pub fn stopped() -> Self {
		let fake = Self::new();
		fake.state.borrow_mut().running.retain(|c| c != CONTAINER);
		fake
	}

	pub fn swallow_creates(&self, resource: &str) {
		self.state.borrow_mut().swallow_creates.push(resource.to_string());
	}

	pub fn garbage_listings(&self, resource: &str) {
		self.state.borrow_mut().garbage_listings.push(resource.to_string());
	}

	pub fn idless_listings(&self, resource: &str) {
		self.state.borrow_mut().idless_listings.push(resource.to_string());
	}

	/// Seed an object, bypassing the command interface.
	pub fn seed(&self, realm_name: &str, resource: &str, fields: &[(&str, &str)]) -> String {
		let mut state = self.state.borrow_mut();
		state.next_id += 1;
		let id = format!("seed-{}", state.next_id);
		let realm = state.realms.entry(realm_name.to_string()).or_default();
		realm.fields.insert("realm".to_string(), realm_name.to_string());
		if let Some(collection) = realm.collection(resource) {
			collection.push(Object {
				id: id.clone(),
				fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
			});
		}
		id
	}

	pub fn realm(&self, name: &str) -> Option<Realm> {
		self.state.borrow().realms.get(name).cloned()
	}

	pub fn calls(&self) -> Vec<Vec<String>> {
		self.state.borrow().calls.clone()
	}

	/// Calls with the `docker exec` prefix stripped, as joined strings.
	pub fn kcadm_calls(&self) -> Vec<String> {
		self.calls()
			.iter()
			.filter(|argv| argv.get(1).map(String::as_str) == Some("exec"))
			.map(|argv| argv[4..].join(" "))
			.collect()
	}

	pub fn clear_calls(&self) {
		self.state.borrow_mut().calls.clear();
	}

	fn handle(&self, argv: &[String]) -> CommandOutput {
		let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
		match argv.as_slice() {
			["docker", "ps", "--format", "{{.Names}}"] => {
				ok(self.state.borrow().running.join("\n"))
			}
			["docker", "exec", container, kcadm, rest @ ..] => {
				if !self.state.borrow().running.iter().any(|c| c == container) {
					return fail(
						1,
						&format!("Error response from daemon: No such container: {container}"),
					);
				}
				if *kcadm != CONTAINER_KCADM_PATH {
					return fail(127, "exec: not found");
				}
				self.kcadm(rest)
			}
			_ => fail(127, "unsupported command"),
		}
	}

	fn kcadm(&self, args: &[&str]) -> CommandOutput {
		let opts = Options::parse(args);
		match args {
			["config", "credentials", ..] => {
				if opts.flag("--realm") == Some("master")
					&& opts.flag("--user") == Some(ADMIN_USER)
					&& opts.flag("--password") == Some(ADMIN_PASSWORD)
				{
					self.state.borrow_mut().logged_in = true;
					ok(String::new())
				} else {
					fail(1, "Invalid user credentials [invalid_grant]")
				}
			}
			_ if !self.state.borrow().logged_in => fail(
				1,
				"No server specified. Use --server, or 'kcadm.sh config credentials'",
			),
			["get", path, ..] => self.get(path, &opts),
			["create", resource, ..] => self.create(resource, &opts),
			["update", path, ..] => self.update(path, &opts),
			["set-password", ..] => self.set_password(&opts),
			_ => fail(1, "Invalid command"),
		}
	}

	fn get(&self, path: &str, opts: &Options) -> CommandOutput {
		let state = self.state.borrow();
		if let Some(name) = path.strip_prefix("realms/") {
			return match state.realms.get(name) {
				Some(realm) => ok(json!(realm.fields).to_string()),
				None => fail(1, "Resource not found for url"),
			};
		}

		let Some(realm) = state.realms.get(opts.realm.unwrap_or_default()) else {
			return fail(1, "Realm not found.");
		};

		if let Some(name) = path.strip_prefix("roles/") {
			return match realm.roles.iter().find(|r| r.field("name") == Some(name)) {
				Some(role) => ok(render(role).to_string()),
				None => fail(1, "Could not find role"),
			};
		}

		if state.garbage_listings.iter().any(|r| r == path) {
			return ok(
				"Logging into http://localhost:8080 as user admin of realm master".to_string(),
			);
		}

		let objects: &[Object] = match path {
			"groups" => &realm.groups,
			"client-scopes" => &realm.client_scopes,
			"clients" => &realm.clients,
			"users" => &realm.users,
			_ => return fail(1, "Resource not found for url"),
		};

		let matches: Vec<&Object> = match opts.query {
			// Server-side search is a case-insensitive substring match.
			Some(("search", needle)) => objects
				.iter()
				.filter(|o| {
					o.field("name")
						.is_some_and(|n| n.to_lowercase().contains(&needle.to_lowercase()))
				})
				.collect(),
			// The client-scopes endpoint ignores the filter entirely.
			Some(_) if path == "client-scopes" => objects.iter().collect(),
			Some((field, value)) => objects
				.iter()
				.filter(|o| o.field(field) == Some(value))
				.collect(),
			None => objects.iter().collect(),
		};

		let mut rendered: Vec<Value> = if opts.fields == Some("id") {
			matches.iter().map(|o| json!({ "id": o.id })).collect()
		} else {
			matches.iter().map(|o| render(o)).collect()
		};
		if state.idless_listings.iter().any(|r| r == path) {
			for value in &mut rendered {
				if let Some(object) = value.as_object_mut() {
					object.remove("id");
				}
			}
		}
		ok(Value::Array(rendered).to_string())
	}

	fn create(&self, resource: &str, opts: &Options) -> CommandOutput {
		let mut state = self.state.borrow_mut();
		let fields = opts.assignments();

		if resource == "realms" {
			let Some(name) = fields.get("realm").cloned() else {
				return fail(1, "realm is required");
			};
			if state.realms.contains_key(&name) {
				return fail(1, &format!("Conflict detected. See logs for details: realm {name}"));
			}
			state.realms.insert(name, Realm { fields, ..Default::default() });
			return ok(String::new());
		}

		if state.swallow_creates.iter().any(|r| r == resource) {
			return ok(String::new());
		}

		state.next_id += 1;
		let id = format!("{resource}-{}", state.next_id);
		let Some(realm) = state.realms.get_mut(opts.realm.unwrap_or_default()) else {
			return fail(1, "Realm not found.");
		};
		let Some(collection) = realm.collection(resource) else {
			return fail(1, "Resource not found for url");
		};
		let natural_key = ["name", "clientId", "username"]
			.iter()
			.find_map(|k| fields.get(*k).map(|v| (*k, v.clone())));
		if let Some((key, value)) = &natural_key {
			if collection.iter().any(|o| o.field(key) == Some(value.as_str())) {
				return fail(409, &format!("Conflict: {resource} with {key} {value} exists"));
			}
		}
		collection.push(Object { id: id.clone(), fields });
		ok(format!("Created new {resource} with id '{id}'"))
	}

	fn update(&self, path: &str, opts: &Options) -> CommandOutput {
		let mut state = self.state.borrow_mut();
		let fields = opts.assignments();

		if let Some(name) = path.strip_prefix("realms/") {
			return match state.realms.get_mut(name) {
				Some(realm) => {
					realm.fields.extend(fields);
					ok(String::new())
				}
				None => fail(1, "Resource not found for url"),
			};
		}

		let Some((resource, id)) = path.split_once('/') else {
			return fail(1, "Resource not found for url");
		};
		let Some(realm) = state.realms.get_mut(opts.realm.unwrap_or_default()) else {
			return fail(1, "Realm not found.");
		};
		let Some(object) = realm
			.collection(resource)
			.and_then(|c| c.iter_mut().find(|o| o.id == id))
		else {
			return fail(1, "Resource not found for url");
		};
		object.fields.extend(fields);
		ok(String::new())
	}

	fn set_password(&self, opts: &Options) -> CommandOutput {
		let mut state = self.state.borrow_mut();
		let (Some(username), Some(password)) =
			(opts.flag("--username"), opts.flag("--new-password"))
		else {
			return fail(1, "missing arguments");
		};
		if opts.flag("--temporary") != Some("false") {
			return fail(1, "expected a permanent password");
		}
		let Some(realm) = state.realms.get_mut(opts.realm.unwrap_or_default()) else {
			return fail(1, "Realm not found.");
		};
		if !realm.users.iter().any(|u| u.field("username") == Some(username)) {
			return fail(1, "User not found");
		}
		realm.passwords.insert(username.to_string(), password.to_string());
		ok(String::new())
	}
}

impl CommandRunner for FakeDirectory {
	fn run(&self, argv: &[String]) -> KcadmResult<CommandOutput> {
		self.state.borrow_mut().calls.push(argv.to_vec());
		Ok(self.handle(argv))
	}
}

/// Parsed trailing options of one kcadm call.
struct Options<'a> {
	realm: Option<&'a str>,
	query: Option<(&'a str, &'a str)>,
	fields: Option<&'a str>,
	sets: Vec<&'a str>,
	flags: Vec<(&'a str, &'a str)>,
}

impl<'a> Options<'a> {
	fn parse(args: &[&'a str]) -> Self {
		let mut opts = Options {
			realm: None,
			query: None,
			fields: None,
			sets: Vec::new(),
			flags: Vec::new(),
		};
		let mut iter = args.iter().copied();
		while let Some(arg) = iter.next() {
			match arg {
				"-r" => opts.realm = iter.next(),
				"-q" => opts.query = iter.next().and_then(|q| q.split_once('=')),
				"--fields" => opts.fields = iter.next(),
				"-s" => opts.sets.extend(iter.next()),
				flag if flag.starts_with("--") => {
					if let Some(value) = iter.next() {
						opts.flags.push((flag, value));
					}
				}
				_ => {}
			}
		}
		opts
	}

	fn flag(&self, name: &str) -> Option<&'a str> {
		self.flags.iter().find(|(f, _)| *f == name).map(|(_, v)| *v)
	}

	fn assignments(&self) -> Fields {
		self.sets
			.iter()
			.filter_map(|s| s.split_once('='))
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}
}

fn render(object: &Object) -> Value {
	let mut value = json!(object.fields);
	value["id"] = json!(object.id);
	value
}

fn ok(stdout: String) -> CommandOutput {
	CommandOutput {
		status: 0,
		stdout,
		stderr: String::new(),
	}
}

fn fail(status: i32, stderr: &str) -> CommandOutput {
	CommandOutput {
		status,
		stdout: String::new(),
		stderr: stderr.to_string(),
	}
}

/// On-disk inputs for one test: an env file and a clients document.
pub struct Workspace {
	pub dir: tempfile::TempDir,
}

impl Workspace {
	pub fn new(env: &str, clients: &str) -> Self {
		let dir = tempfile::tempdir().expect("tempdir");
		std::fs::write(dir.path().join(".env"), env).expect("write env");
		std::fs::create_dir_all(dir.path().join("keycloak-config")).expect("mkdir");
		std::fs::write(dir.path().join("keycloak-config/clients.json"), clients)
			.expect("write clients");
		Self { dir }
	}

	pub fn env_path(&self) -> PathBuf {
		self.dir.path().join(".env")
	}

	pub fn env_contents(&self) -> String {
		std::fs::read_to_string(self.env_path()).expect("read env")
	}

	pub fn config(&self, policy: SecretPolicy) -> SessionConfig {
		session_config(self.dir.path(), policy)
	}
}

pub fn session_config(dir: &Path, policy: SecretPolicy) -> SessionConfig {
	let env = dir.join(".env");
	SessionConfig {
		server_url: "http://localhost:8080".to_string(),
		realm: REALM.to_string(),
		admin_user: ADMIN_USER.to_string(),
		admin_password: SecretString::from(ADMIN_PASSWORD),
		invocation: KcadmInvocation::docker(CONTAINER),
		clients_file: dir.join("keycloak-config/clients.json"),
		secret_store: env.clone(),
		env_files: vec![env],
		secret_policy: policy,
		layout: RealmLayout::default(),
	}
}
