// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use kcboot_config::SessionConfig;
use kcboot_envfile::EnvFile;
use kcboot_kcadm::{CommandRunner, Kcadm};
use kcboot_secrets::resolve_client_secrets;
use tracing::{info, instrument};

use crate::error::ReconcileError;
use crate::reconciler::{Interrupt, Reconciler, RunPlan, RunReport, UserSpec};

/// What the operator asked for on top of the session configuration.
#[derive(Debug, Clone, Default)]
pub struct Selection {
	/// Only this client; all declared clients when `None`.
	pub client: Option<String>,
	pub user: Option<UserSpec>,
}

/// One complete bootstrap run.
///
/// Inputs are loaded and validated before the first directory call, so a
/// malformed document, an unknown client name or a missing required secret
/// never reaches the server. Secrets generated here are persisted before the
/// run starts and stay on disk if it later fails.
#[instrument(skip_all, fields(realm = %config.realm))]
pub fn bootstrap<R: CommandRunner>(
	config: &SessionConfig,
	selection: &Selection,
	runner: R,
	interrupt: &Interrupt,
) -> Result<RunReport, ReconcileError> {
	interrupt.check()?;

	let catalog = kcboot_clients::parse_file(&config.clients_file)?;
	let clients = catalog.select(selection.client.as_deref())?;
	info!(count = clients.len(), "selected clients");

	let mut store = EnvFile::open(&config.secret_store)?;
	let inherited = config.merged_env()?;
	let secrets = resolve_client_secrets(&mut store, &inherited, &clients, config.secret_policy)?;

	let plan = RunPlan {
		server_url: config.server_url.clone(),
		admin_user: config.admin_user.clone(),
		admin_password: config.admin_password.clone(),
		layout: config.layout.clone(),
		clients,
		secrets,
		user: selection.user.clone(),
	};

	let kcadm = Kcadm::new(runner, config.invocation.clone(), config.realm.as_str());
	let mut reconciler = Reconciler::new(&kcadm, interrupt.clone());

	// A Ctrl+C also kills the child command, which surfaces as a failure.
	reconciler.run(&plan).map_err(|err| {
		if interrupt.is_triggered() {
			ReconcileError::Interrupted
		} else {
			err
		}
	})
}
