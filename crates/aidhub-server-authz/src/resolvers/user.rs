// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use aidhub_server_auth::{Identity, PublicId};
use async_trait::async_trait;
use tracing::instrument;

use crate::context::AuthorizationContext;
use crate::error::ResolveError;
use crate::policy::{can_manage_organization, can_target_user};
use crate::resolver::{Lookups, Resolver};
use crate::slot::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTarget {
	/// The caller when the parameter is absent; anyone else needs ADMIN.
	SelfOrAdmin,
	/// The caller, or anyone when the caller manages the resolved organization.
	OrganizationStaff,
}

/// Loads the identity named by a route parameter.
#[derive(Debug, Clone)]
pub struct UserResolver {
	param: String,
	target: UserTarget,
}

impl UserResolver {
	pub fn self_or_admin(param: impl Into<String>) -> Self {
		Self {
			param: param.into(),
			target: UserTarget::SelfOrAdmin,
		}
	}

	pub fn organization_staff(param: impl Into<String>) -> Self {
		Self {
			param: param.into(),
			target: UserTarget::OrganizationStaff,
		}
	}

	async fn load(&self, public_id: &str, lookups: &Lookups) -> Result<Identity, ResolveError> {
		let public_id = PublicId::new(public_id);
		lookups
			.directory
			.find_identity_by_public_id(&public_id)
			.await?
			.ok_or_else(|| ResolveError::NotFound(format!("user {public_id}")))
	}
}

#[async_trait]
impl Resolver for UserResolver {
	fn name(&self) -> &'static str {
		match self.target {
			UserTarget::SelfOrAdmin => "user.self_or_admin",
			UserTarget::OrganizationStaff => "user.organization_staff",
		}
	}

	fn requires(&self) -> &'static [Slot] {
		match self.target {
			UserTarget::SelfOrAdmin => &[],
			UserTarget::OrganizationStaff => &[Slot::Organization],
		}
	}

	fn produces(&self) -> Slot {
		Slot::TargetUser
	}

	#[instrument(skip_all, fields(resolver = self.name()))]
	async fn resolve(
		&self,
		ctx: &mut AuthorizationContext,
		lookups: &Lookups,
	) -> Result<(), ResolveError> {
		let target = match self.target {
			UserTarget::SelfOrAdmin => {
				let target = match ctx.params().get(&self.param) {
					Some(public_id) => self.load(public_id, lookups).await?,
					None => ctx.caller().clone(),
				};
				if !can_target_user(ctx.caller(), &target) {
					return Err(ResolveError::Forbidden(format!("user {}", target.public_id)));
				}
				target
			}
			UserTarget::OrganizationStaff => {
				let public_id = ctx.require_param(&self.param)?;
				let target = self.load(public_id, lookups).await?;
				let manages = ctx
					.organization()
					.is_some_and(|org| can_manage_organization(ctx.caller(), org));
				if !(manages || can_target_user(ctx.caller(), &target)) {
					return Err(ResolveError::Forbidden(format!("user {}", target.public_id)));
				}
				target
			}
		};

		ctx.target_user = Some(target);
		Ok(())
	}
}
