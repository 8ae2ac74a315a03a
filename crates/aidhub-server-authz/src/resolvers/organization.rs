// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use aidhub_server_auth::PublicId;
use async_trait::async_trait;
use tracing::instrument;

use crate::context::AuthorizationContext;
use crate::error::ResolveError;
use crate::policy::{can_access_organization, can_manage_organization};
use crate::resolver::{Lookups, Resolver};
use crate::slot::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationAccess {
	/// Manager only.
	Managed,
	/// Manager or employee.
	Member,
}

/// Loads the organization named by a route parameter.
#[derive(Debug, Clone)]
pub struct OrganizationResolver {
	param: String,
	access: OrganizationAccess,
}

impl OrganizationResolver {
	pub fn managed(param: impl Into<String>) -> Self {
		Self {
			param: param.into(),
			access: OrganizationAccess::Managed,
		}
	}

	pub fn member(param: impl Into<String>) -> Self {
		Self {
			param: param.into(),
			access: OrganizationAccess::Member,
		}
	}
}

#[async_trait]
impl Resolver for OrganizationResolver {
	fn name(&self) -> &'static str {
		match self.access {
			OrganizationAccess::Managed => "organization.managed",
			OrganizationAccess::Member => "organization.member",
		}
	}

	fn produces(&self) -> Slot {
		Slot::Organization
	}

	#[instrument(skip_all, fields(resolver = self.name()))]
	async fn resolve(
		&self,
		ctx: &mut AuthorizationContext,
		lookups: &Lookups,
	) -> Result<(), ResolveError> {
		let public_id = PublicId::new(ctx.require_param(&self.param)?);
		let org = lookups
			.directory
			.find_organization_by_public_id(&public_id)
			.await?
			.ok_or_else(|| ResolveError::NotFound(format!("organization {public_id}")))?;

		let allowed = match self.access {
			OrganizationAccess::Managed => can_manage_organization(ctx.caller(), &org),
			OrganizationAccess::Member => can_access_organization(ctx.caller(), &org),
		};
		if !allowed {
			return Err(ResolveError::Forbidden(format!("organization {public_id}")));
		}

		ctx.organization = Some(org);
		Ok(())
	}
}
