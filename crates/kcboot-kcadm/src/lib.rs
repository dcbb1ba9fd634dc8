// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Synchronous wrapper around the Keycloak admin CLI.
//!
//! Every directory operation is an argument vector handed to a
//! [`CommandRunner`]. [`Kcadm`] adds the invocation prefix, the target realm
//! and JSON interpretation on top. Absence of a resource is `None`, never an
//! error; output that is not JSON always is.

mod assignment;
mod client;
mod error;
mod response;
mod runner;

pub use assignment::{push_assignments, Assignment};
pub use client::{Kcadm, KcadmInvocation, Scope, ADMIN_REALM, CONTAINER_KCADM_PATH};
pub use error::{KcadmError, KcadmResult};
pub use response::{entries, first_id, parse_json, ResourceId};
pub use runner::{display_command, CommandOutput, CommandRunner, ProcessRunner};
