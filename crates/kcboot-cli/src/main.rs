// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kcboot_common_secret::SecretString;
use kcboot_config::CliOverrides;
use kcboot_kcadm::ProcessRunner;
use kcboot_reconcile::{
	bootstrap, Interrupt, ReconcileError, Selection, UserSpec, FAILURE_EXIT_CODE,
	INTERRUPTED_EXIT_CODE,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATE_TARGETS: &[&str] = &[
	"kcboot",
	"kcboot_clients",
	"kcboot_config",
	"kcboot_envfile",
	"kcboot_kcadm",
	"kcboot_reconcile",
	"kcboot_redact",
	"kcboot_secrets",
];

#[derive(Parser, Debug)]
#[command(name = "kcboot")]
#[command(about = "Bootstrap a Keycloak realm, its clients and their secrets")]
#[command(version)]
struct Args {
	/// Log output format
	#[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
	log_format: LogFormat,

	/// Log level used when RUST_LOG is unset
	#[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
	log_level: LogLevel,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Converge the realm, its clients and an optional user
	Bootstrap(BootstrapArgs),

	/// Mask secret values in an exported realm document
	Redact {
		/// Exported JSON document
		input: PathBuf,

		/// Where to write the redacted copy
		output: PathBuf,
	},
}

#[derive(clap::Args, Debug)]
struct BootstrapArgs {
	/// Env file to load; repeat to merge several, later files win
	#[arg(long = "env-file", value_name = "PATH")]
	env_files: Vec<PathBuf>,

	/// Env file that receives generated client secrets
	#[arg(long, value_name = "PATH")]
	secret_store: Option<PathBuf>,

	/// Realm to converge
	#[arg(long)]
	realm: Option<String>,

	/// Only converge this client
	#[arg(long)]
	client: Option<String>,

	/// Username to create or update
	#[arg(long)]
	user: Option<String>,

	/// Permanent password for --user
	#[arg(long)]
	password: Option<String>,

	/// What to do when a client secret is missing: generate or require
	#[arg(long)]
	secret_policy: Option<String>,

	/// TOML file overriding the realm layout
	#[arg(long, value_name = "PATH")]
	layout: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
	Pretty,
	Compact,
	Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
	Debug,
	Info,
	Warn,
	Error,
}

impl LogLevel {
	fn as_str(self) -> &'static str {
		match self {
			LogLevel::Debug => "debug",
			LogLevel::Info => "info",
			LogLevel::Warn => "warn",
			LogLevel::Error => "error",
		}
	}
}

fn default_directives(level: LogLevel) -> String {
	CRATE_TARGETS
		.iter()
		.map(|target| format!("{target}={}", level.as_str()))
		.collect::<Vec<_>>()
		.join(",")
}

fn init_tracing(format: LogFormat, level: LogLevel) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

	match format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json())
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact())
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer())
				.init();
		}
	}
}

fn main() -> ExitCode {
	let args = Args::parse();
	init_tracing(args.log_format, args.log_level);

	let interrupt = Interrupt::new();
	let outcome = setup_ctrlc_handler(interrupt.clone()).and_then(|()| match args.command {
		Command::Bootstrap(bootstrap_args) => run_bootstrap(bootstrap_args, &interrupt),
		Command::Redact { input, output } => run_redact(&input, &output),
	});

	match outcome {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			let code = exit_code(&err, &interrupt);
			if code == INTERRUPTED_EXIT_CODE {
				warn!("interrupted");
			} else if let Some(reconcile) = err.downcast_ref::<ReconcileError>() {
				error!(category = %reconcile.category(), error = %err, "run failed");
			} else {
				error!(error = %err, "run failed");
			}
			ExitCode::from(u8::try_from(code).unwrap_or(1))
		}
	}
}

fn exit_code(err: &anyhow::Error, interrupt: &Interrupt) -> i32 {
	if interrupt.is_triggered() {
		return INTERRUPTED_EXIT_CODE;
	}
	err.downcast_ref::<ReconcileError>()
		.map(ReconcileError::exit_code)
		.unwrap_or(FAILURE_EXIT_CODE)
}

fn selection(args: &BootstrapArgs) -> Result<Selection> {
	let user = match (&args.user, &args.password) {
		(Some(username), Some(password)) => Some(UserSpec {
			username: username.clone(),
			password: SecretString::new(password.clone()),
		}),
		(Some(_), None) => anyhow::bail!("--password is required when --user is provided"),
		(None, _) => None,
	};

	Ok(Selection {
		client: args.client.clone(),
		user,
	})
}

fn run_bootstrap(args: BootstrapArgs, interrupt: &Interrupt) -> Result<()> {
	let selection = selection(&args)?;

	let overrides = CliOverrides {
		realm: args.realm,
		secret_store: args.secret_store,
		secret_policy: args.secret_policy,
		layout: args.layout,
	};
	let config =
		kcboot_config::load_session(&args.env_files, overrides).map_err(ReconcileError::from)?;

	info!(
		realm = %config.realm,
		server_url = %config.server_url,
		clients_file = %config.clients_file.display(),
		"loaded session configuration"
	);

	let report = bootstrap(&config, &selection, ProcessRunner, interrupt)?;
	for line in report.summary_lines() {
		info!("{line}");
	}
	Ok(())
}

fn run_redact(input: &std::path::Path, output: &std::path::Path) -> Result<()> {
	let replaced = kcboot_redact::redact_file(input, output)?;
	info!(
		input = %input.display(),
		output = %output.display(),
		replaced,
		"wrote redacted document"
	);
	Ok(())
}

fn setup_ctrlc_handler(interrupt: Interrupt) -> Result<()> {
	ctrlc::set_handler(move || {
		info!("received Ctrl+C, stopping after the current command");
		interrupt.trigger();
	})
	.context("failed to set Ctrl+C handler")?;
	Ok(())
}
