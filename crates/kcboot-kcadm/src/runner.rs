// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::ErrorKind;
use std::process::Command;

use kcboot_common_secret::REDACTED;
use kcboot_redact::is_sensitive_key;
use tracing::warn;

use crate::error::{KcadmError, KcadmResult};

/// Captured result of one command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
	/// Exit code; `-1` when the process was killed by a signal.
	pub status: i32,
	pub stdout: String,
	pub stderr: String,
}

impl CommandOutput {
	pub fn success(&self) -> bool {
		self.status == 0
	}

	/// Best diagnostic for a failed command: stderr, then stdout, then a
	/// synthesized message naming the command.
	pub fn failure_message(&self, argv: &[String]) -> String {
		let stderr = self.stderr.trim();
		if !stderr.is_empty() {
			return stderr.to_string();
		}
		let stdout = self.stdout.trim();
		if !stdout.is_empty() {
			return stdout.to_string();
		}
		format!("Command failed ({}): {}", self.status, display_command(argv))
	}
}

/// Runs an argument vector to completion.
///
/// The only seam between kcboot and the outside world; tests substitute a
/// scripted implementation.
pub trait CommandRunner {
	/// Run `argv` (program first). A non-zero exit is not an error here.
	fn run(&self, argv: &[String]) -> KcadmResult<CommandOutput>;
}

impl<R> CommandRunner for &R
where
	R: CommandRunner + ?Sized,
{
	fn run(&self, argv: &[String]) -> KcadmResult<CommandOutput> {
		(**self).run(argv)
	}
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
	fn run(&self, argv: &[String]) -> KcadmResult<CommandOutput> {
		let (program, args) = argv.split_first().ok_or(KcadmError::EmptyCommand)?;

		let output = Command::new(program).args(args).output().map_err(|e| {
			if e.kind() == ErrorKind::NotFound {
				warn!(program = %program, "executable not found in PATH");
				KcadmError::DependencyMissing {
					program: program.clone(),
				}
			} else {
				KcadmError::Io {
					program: program.clone(),
					source: e,
				}
			}
		})?;

		Ok(CommandOutput {
			status: output.status.code().unwrap_or(-1),
			stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
			stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		})
	}
}

/// Render `argv` for logs with credentials masked.
///
/// Masks the value following a sensitive long flag (`--password`,
/// `--new-password`) and the value of any sensitive `field=value` assignment.
pub fn display_command(argv: &[String]) -> String {
	let mut out: Vec<String> = Vec::with_capacity(argv.len());
	let mut mask_next = false;

	for arg in argv {
		if mask_next {
			out.push(REDACTED.to_string());
			mask_next = false;
			continue;
		}

		if let Some(flag) = arg.strip_prefix("--") {
			mask_next = is_sensitive_key(flag);
			out.push(arg.clone());
			continue;
		}

		match arg.split_once('=') {
			Some((field, _)) if is_sensitive_key(field) => out.push(format!("{field}={REDACTED}")),
			_ => out.push(arg.clone()),
		}
	}

	out.join(" ")
}
