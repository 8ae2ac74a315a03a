// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hiring, dismissal and blocking.
//!
//! [`EmploymentService`] is the only mutation entry point for the
//! employment and block relations. Operations on one (identity,
//! organization) pair are serialized by a per-pair async mutex, and each one
//! ends in a single [`RelationStore::commit`].

use std::sync::Arc;

use aidhub_server_auth::{Directory, Identity, OrgId, Organization, PublicId, Role, UserId};
use aidhub_server_authz::AuthorizationContext;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument};

use crate::error::EmploymentError;
use crate::relation::{CommitOutcome, EdgeChange, EdgeUpdate, RelationStore};

/// Per-pair locks. Entries are dropped once nobody holds or waits on them.
#[derive(Debug, Default)]
struct PairLocks {
	locks: DashMap<(UserId, OrgId), Arc<Mutex<()>>>,
}

/// Holds one pair's mutex. Dropping it unlocks and releases the map entry,
/// including when the owning future is cancelled mid-commit.
struct PairGuard<'a> {
	locks: &'a PairLocks,
	key: (UserId, OrgId),
	held: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairGuard<'_> {
	fn drop(&mut self) {
		self.held.take();
		self.locks.release(self.key);
	}
}

impl PairLocks {
	async fn lock(&self, key: (UserId, OrgId)) -> PairGuard<'_> {
		let mutex = self.locks.entry(key).or_default().clone();
		let mut pair = PairGuard {
			locks: self,
			key,
			held: None,
		};
		pair.held = Some(mutex.lock_owned().await);
		pair
	}

	fn release(&self, key: (UserId, OrgId)) {
		self.locks
			.remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
	}
}

/// A successful employment mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmploymentChange {
	pub user_id: UserId,
	pub organization_id: OrgId,
	pub role: Role,
	pub employed: bool,
	pub blocked: bool,
	pub changed: bool,
}

impl EmploymentChange {
	fn from_outcome(user_id: UserId, organization_id: OrgId, outcome: CommitOutcome) -> Self {
		Self {
			user_id,
			organization_id,
			role: outcome.role,
			employed: outcome.employed,
			blocked: outcome.blocked,
			changed: outcome.changed,
		}
	}

	/// No content: the change carries no response body.
	pub fn status_code(&self) -> u16 {
		204
	}
}

pub struct EmploymentService {
	directory: Arc<dyn Directory>,
	relations: Arc<dyn RelationStore>,
	locks: PairLocks,
}

impl std::fmt::Debug for EmploymentService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EmploymentService")
			.field("pending_pairs", &self.locks.locks.len())
			.finish_non_exhaustive()
	}
}

impl EmploymentService {
	pub fn new(directory: Arc<dyn Directory>, relations: Arc<dyn RelationStore>) -> Self {
		Self {
			directory,
			relations,
			locks: PairLocks::default(),
		}
	}

	async fn load_user(&self, user_public_id: Option<&str>) -> Result<Identity, EmploymentError> {
		let public_id = user_public_id
			.map(str::trim)
			.filter(|id| !id.is_empty())
			.ok_or_else(|| EmploymentError::Validation("user id is required".to_string()))?;
		let public_id = PublicId::new(public_id);
		self.directory
			.find_identity_by_public_id(&public_id)
			.await?
			.ok_or_else(|| EmploymentError::NotFound(format!("user {public_id}")))
	}

	async fn commit_locked(
		&self,
		user: UserId,
		org: OrgId,
		change: EdgeChange,
	) -> Result<EmploymentChange, EmploymentError> {
		let _pair = self.locks.lock((user, org)).await;
		let outcome = self.relations.commit(EdgeUpdate::new(user, org, change)).await?;
		Ok(EmploymentChange::from_outcome(user, org, outcome))
	}

	/// Employ a user at `org` with the organization kind's employee role.
	/// Hiring an existing employee succeeds without change.
	#[instrument(skip(self, org), fields(org_id = %org.id))]
	pub async fn hire(
		&self,
		org: &Organization,
		user_public_id: Option<&str>,
		new_role: Role,
	) -> Result<EmploymentChange, EmploymentError> {
		let user = self.load_user(user_public_id).await?;
		if new_role != org.kind.employee_role() {
			return Err(EmploymentError::Validation(format!(
				"role {new_role} cannot be granted by a {} organization",
				org.kind
			)));
		}

		let change = self
			.commit_locked(user.id, org.id, EdgeChange::Employ { role: new_role })
			.await?;
		if change.changed {
			info!(user_id = %user.id, role = %change.role, "user hired");
		}
		Ok(change)
	}

	/// Remove a user from `org`. The user, the organization's manager or an
	/// administrator may do this.
	#[instrument(skip(self, org, requester), fields(org_id = %org.id, requester_id = %requester.id))]
	pub async fn dismiss(
		&self,
		org: &Organization,
		user_public_id: Option<&str>,
		requester: &Identity,
	) -> Result<EmploymentChange, EmploymentError> {
		let user = self.load_user(user_public_id).await?;
		let permitted =
			requester.id == user.id || requester.is_admin() || org.is_managed_by(requester.id);
		if !permitted {
			return Err(EmploymentError::Forbidden(
				"only the user, the organization manager or an administrator may dismiss".to_string(),
			));
		}

		let change = self
			.commit_locked(user.id, org.id, EdgeChange::Dismiss)
			.await?;
		if change.changed {
			info!(user_id = %user.id, role = %change.role, "user dismissed");
		}
		Ok(change)
	}

	/// Toggle whether `requester` blocks `org`, ending any employment there.
	#[instrument(skip(self, org, requester), fields(org_id = %org.id, user_id = %requester.id))]
	pub async fn block(
		&self,
		org: &Organization,
		requester: &Identity,
	) -> Result<EmploymentChange, EmploymentError> {
		let change = self
			.commit_locked(requester.id, org.id, EdgeChange::ToggleBlock)
			.await?;
		info!(blocked = change.blocked, "organization block toggled");
		Ok(change)
	}

	/// [`hire`](Self::hire) for the organization and user resolved by a pipeline.
	pub async fn hire_resolved(
		&self,
		ctx: &AuthorizationContext,
		new_role: Role,
	) -> Result<EmploymentChange, EmploymentError> {
		let (org, user) = resolved_pair(ctx)?;
		self.hire(org, Some(user.public_id.as_str()), new_role).await
	}

	/// [`dismiss`](Self::dismiss) for the organization and user resolved by a
	/// pipeline, requested by its caller.
	pub async fn dismiss_resolved(
		&self,
		ctx: &AuthorizationContext,
	) -> Result<EmploymentChange, EmploymentError> {
		let (org, user) = resolved_pair(ctx)?;
		self.dismiss(org, Some(user.public_id.as_str()), ctx.caller())
			.await
	}

	/// [`block`](Self::block) for the organization resolved by a pipeline.
	pub async fn block_resolved(
		&self,
		ctx: &AuthorizationContext,
	) -> Result<EmploymentChange, EmploymentError> {
		let org = ctx
			.organization()
			.ok_or_else(|| EmploymentError::Validation("organization is required".to_string()))?;
		self.block(org, ctx.caller()).await
	}
}

fn resolved_pair(ctx: &AuthorizationContext) -> Result<(&Organization, &Identity), EmploymentError> {
	let org = ctx
		.organization()
		.ok_or_else(|| EmploymentError::Validation("organization is required".to_string()))?;
	let user = ctx
		.target_user()
		.ok_or_else(|| EmploymentError::Validation("user id is required".to_string()))?;
	Ok((org, user))
}
