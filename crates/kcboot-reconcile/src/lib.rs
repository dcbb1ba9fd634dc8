// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Declarative reconciliation of a Keycloak realm.
//!
//! Every resource goes through the same steps: resolve by natural key, create
//! if absent, re-resolve, then re-assert managed fields. Runs are idempotent;
//! nothing absent from the desired state is ever deleted.

mod bootstrap;
mod error;
mod reconciler;
pub mod resource;

pub use bootstrap::{bootstrap, Selection};
pub use error::{ErrorCategory, ReconcileError, FAILURE_EXIT_CODE, INTERRUPTED_EXIT_CODE};
pub use reconciler::{
	Convergence, CreatedResource, Interrupt, Reconciler, RunPlan, RunReport, UserSpec,
};
pub use resource::{ManagedResource, ResourceKind};
