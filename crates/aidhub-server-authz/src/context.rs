// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use aidhub_server_auth::{Identity, Organization, Receipt};

use crate::error::ResolveError;
use crate::slot::RouteParams;

/// The per-request result of a pipeline run. Never persisted.
#[derive(Debug, Clone)]
pub struct AuthorizationContext {
	caller: Identity,
	params: RouteParams,
	pub(crate) organization: Option<Organization>,
	pub(crate) target_user: Option<Identity>,
	pub(crate) receipt: Option<Receipt>,
}

impl AuthorizationContext {
	pub fn new(caller: Identity, params: RouteParams) -> Self {
		Self {
			caller,
			params,
			organization: None,
			target_user: None,
			receipt: None,
		}
	}

	pub fn caller(&self) -> &Identity {
		&self.caller
	}

	pub fn params(&self) -> &RouteParams {
		&self.params
	}

	/// A required route parameter, or a validation error naming it.
	pub fn require_param(&self, name: &str) -> Result<&str, ResolveError> {
		self.params
			.get(name)
			.ok_or_else(|| ResolveError::Validation(format!("missing route parameter '{name}'")))
	}

	pub fn organization(&self) -> Option<&Organization> {
		self.organization.as_ref()
	}

	pub fn target_user(&self) -> Option<&Identity> {
		self.target_user.as_ref()
	}

	pub fn receipt(&self) -> Option<&Receipt> {
		self.receipt.as_ref()
	}
}
