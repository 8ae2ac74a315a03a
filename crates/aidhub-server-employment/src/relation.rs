// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Atomic two-sided updates of the employment and block relations.
//!
//! An employment edge is stored on both sides: `Identity::employed_at` and
//! `Organization::employees`. A [`RelationStore`] applies one [`EdgeUpdate`]
//! to both sides, re-derives the identity's role and checks that the
//! identity is not both employed by and blocking the organization, all as
//! one unit. Nothing is written when any step fails.

use std::sync::Arc;

use aidhub_server_auth::{
	DirectoryError, DirectoryState, Identity, InMemoryDirectory, OrgId, Organization,
	OrganizationKind, Role, UserId,
};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
	/// Add the employment edge and take `role`.
	Employ { role: Role },
	/// Remove the employment edge.
	Dismiss,
	/// Remove any employment edge, then flip the block entry.
	ToggleBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeUpdate {
	pub user: UserId,
	pub organization: OrgId,
	pub change: EdgeChange,
}

impl EdgeUpdate {
	pub fn new(user: UserId, organization: OrgId, change: EdgeChange) -> Self {
		Self {
			user,
			organization,
			change,
		}
	}
}

/// The relation between the pair after a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
	pub role: Role,
	pub employed: bool,
	pub blocked: bool,
	/// False when the commit left everything as it was.
	pub changed: bool,
}

#[derive(Debug, Error)]
pub enum RelationError {
	#[error("identity {0} not found")]
	UnknownIdentity(UserId),

	#[error("organization {0} not found")]
	UnknownOrganization(OrgId),

	#[error("organization is blocked by the identity")]
	Blocked,

	#[error("update would leave identity both employed by and blocking the organization")]
	Conflict,

	#[error("relation store error: {0}")]
	Store(#[from] DirectoryError),
}

#[async_trait]
pub trait RelationStore: Send + Sync {
	async fn commit(&self, update: EdgeUpdate) -> Result<CommitOutcome, RelationError>;
}

/// The role an identity ends up with after an edge change.
///
/// Employee roles follow employment: taking a job grants the kind's employee
/// role, and a role is kept only while an edge of its kind remains. Losing the
/// last edge of one kind falls back to the employee role of another kind the
/// identity still works for, and to USER when no edge is left. ADMIN and
/// manager roles are never changed here.
pub fn derive_role(
	state: &DirectoryState,
	identity: &Identity,
	kind: OrganizationKind,
	granted: Option<Role>,
) -> Role {
	let current = identity.role;
	if current.is_admin() || matches!(current, Role::NgoManager | Role::SupplierManager) {
		return current;
	}
	if let Some(role) = granted {
		return role;
	}

	let employed_kinds: Vec<OrganizationKind> = identity
		.employed_at
		.iter()
		.filter_map(|id| state.organization(*id))
		.map(|org| org.kind)
		.collect();

	if let Some(held) = current.employee_of() {
		if employed_kinds.contains(&held) {
			return current;
		}
	}
	if employed_kinds.contains(&kind) {
		return kind.employee_role();
	}
	employed_kinds
		.first()
		.map(|other| other.employee_role())
		.unwrap_or(Role::User)
}

fn apply(state: &mut DirectoryState, update: EdgeUpdate) -> Result<CommitOutcome, RelationError> {
	let mut identity = state
		.identity(update.user)
		.cloned()
		.ok_or(RelationError::UnknownIdentity(update.user))?;
	let mut org: Organization = state
		.organization(update.organization)
		.cloned()
		.ok_or(RelationError::UnknownOrganization(update.organization))?;
	let before = (identity.clone(), org.clone());

	match update.change {
		EdgeChange::Employ { role } => {
			if identity.has_blocked(org.id) {
				return Err(RelationError::Blocked);
			}
			identity.employed_at.insert(org.id);
			org.employees.insert(identity.id);
			identity.role = derive_role(state, &identity, org.kind, Some(role));
		}
		EdgeChange::Dismiss => {
			identity.employed_at.remove(&org.id);
			org.employees.remove(&identity.id);
			identity.role = derive_role(state, &identity, org.kind, None);
		}
		EdgeChange::ToggleBlock => {
			identity.employed_at.remove(&org.id);
			org.employees.remove(&identity.id);
			identity.role = derive_role(state, &identity, org.kind, None);
			if !identity.blocked_organizations.remove(&org.id) {
				identity.blocked_organizations.insert(org.id);
			}
		}
	}

	let employed = identity.is_employed_at(org.id);
	let blocked = identity.has_blocked(org.id);
	if employed && blocked {
		return Err(RelationError::Conflict);
	}

	let outcome = CommitOutcome {
		role: identity.role,
		employed,
		blocked,
		changed: before != (identity.clone(), org.clone()),
	};
	if let Some((stored_identity, stored_org)) = state.pair_mut(update.user, update.organization) {
		*stored_identity = identity;
		*stored_org = org;
	}
	Ok(outcome)
}

/// Relation store over the in-memory directory. The whole commit runs under
/// the directory's write lock.
#[derive(Debug, Clone)]
pub struct InMemoryRelationStore {
	directory: Arc<InMemoryDirectory>,
}

impl InMemoryRelationStore {
	pub fn new(directory: Arc<InMemoryDirectory>) -> Self {
		Self { directory }
	}
}

#[async_trait]
impl RelationStore for InMemoryRelationStore {
	#[instrument(skip(self), fields(user_id = %update.user, org_id = %update.organization))]
	async fn commit(&self, update: EdgeUpdate) -> Result<CommitOutcome, RelationError> {
		let outcome = self.directory.write_state(|state| apply(state, update)).await?;
		debug!(?outcome, "relation committed");
		Ok(outcome)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use aidhub_server_auth::Directory;

	struct Fixture {
		directory: Arc<InMemoryDirectory>,
		store: InMemoryRelationStore,
		user: Identity,
		ngo: Organization,
		other_ngo: Organization,
		supplier: Organization,
	}

	async fn fixture() -> Fixture {
		let directory = Arc::new(InMemoryDirectory::new());
		let manager = Identity::new("manager@example.org").with_role(Role::NgoManager);
		let user = Identity::new("worker@example.org");
		let ngo = Organization::new("Shelter", OrganizationKind::Ngo, manager.id);
		let other_ngo = Organization::new("Kitchen", OrganizationKind::Ngo, manager.id);
		let supplier = Organization::new("Grocer", OrganizationKind::Supplier, manager.id);

		directory.save_identity(manager).await.unwrap();
		directory.save_identity(user.clone()).await.unwrap();
		for org in [&ngo, &other_ngo, &supplier] {
			directory.save_organization(org.clone()).await.unwrap();
		}

		Fixture {
			store: InMemoryRelationStore::new(directory.clone()),
			directory,
			user,
			ngo,
			other_ngo,
			supplier,
		}
	}

	fn employ(user: &Identity, org: &Organization) -> EdgeUpdate {
		EdgeUpdate::new(
			user.id,
			org.id,
			EdgeChange::Employ {
				role: org.kind.employee_role(),
			},
		)
	}

	async fn stored(f: &Fixture, org: &Organization) -> (Identity, Organization) {
		let identity = f.directory.find_identity_by_id(f.user.id).await.unwrap().unwrap();
		let org = f.directory.find_organization_by_id(org.id).await.unwrap().unwrap();
		(identity, org)
	}

	mod employment {
		use super::*;

		#[tokio::test]
		async fn employ_writes_both_sides() {
			let f = fixture().await;
			let outcome = f.store.commit(employ(&f.user, &f.ngo)).await.unwrap();
			assert!(outcome.employed);
			assert!(outcome.changed);
			assert_eq!(outcome.role, Role::NgoEmployer);

			let (identity, org) = stored(&f, &f.ngo).await;
			assert!(identity.is_employed_at(f.ngo.id));
			assert!(org.has_employee(f.user.id));
		}

		#[tokio::test]
		async fn employ_is_idempotent() {
			let f = fixture().await;
			f.store.commit(employ(&f.user, &f.ngo)).await.unwrap();
			let again = f.store.commit(employ(&f.user, &f.ngo)).await.unwrap();
			assert!(!again.changed);

			let (identity, org) = stored(&f, &f.ngo).await;
			assert_eq!(identity.employed_at.len(), 1);
			assert_eq!(org.employees.len(), 1);
		}

		#[tokio::test]
		async fn dismiss_keeps_role_while_employed_elsewhere_of_same_kind() {
			let f = fixture().await;
			f.store.commit(employ(&f.user, &f.ngo)).await.unwrap();
			f.store.commit(employ(&f.user, &f.other_ngo)).await.unwrap();

			let outcome = f
				.store
				.commit(EdgeUpdate::new(f.user.id, f.ngo.id, EdgeChange::Dismiss))
				.await
				.unwrap();
			assert_eq!(outcome.role, Role::NgoEmployer);

			let outcome = f
				.store
				.commit(EdgeUpdate::new(f.user.id, f.other_ngo.id, EdgeChange::Dismiss))
				.await
				.unwrap();
			assert_eq!(outcome.role, Role::User);
		}

		#[tokio::test]
		async fn dismissal_falls_back_to_remaining_kind() {
			let f = fixture().await;
			f.store.commit(employ(&f.user, &f.supplier)).await.unwrap();
			let hired = f.store.commit(employ(&f.user, &f.ngo)).await.unwrap();
			assert_eq!(hired.role, Role::NgoEmployer);

			let outcome = f
				.store
				.commit(EdgeUpdate::new(f.user.id, f.ngo.id, EdgeChange::Dismiss))
				.await
				.unwrap();
			assert_eq!(outcome.role, Role::SupplierEmployer);

			let (identity, _) = stored(&f, &f.supplier).await;
			assert!(identity.is_employed_at(f.supplier.id));
			assert_eq!(identity.role, Role::SupplierEmployer);

			let outcome = f
				.store
				.commit(EdgeUpdate::new(f.user.id, f.supplier.id, EdgeChange::Dismiss))
				.await
				.unwrap();
			assert_eq!(outcome.role, Role::User);
		}

		#[tokio::test]
		async fn blocking_one_kind_keeps_role_of_the_other() {
			let f = fixture().await;
			f.store.commit(employ(&f.user, &f.supplier)).await.unwrap();
			f.store.commit(employ(&f.user, &f.ngo)).await.unwrap();

			let outcome = f
				.store
				.commit(EdgeUpdate::new(f.user.id, f.ngo.id, EdgeChange::ToggleBlock))
				.await
				.unwrap();
			assert!(outcome.blocked);
			assert_eq!(outcome.role, Role::SupplierEmployer);
		}

		#[tokio::test]
		async fn unknown_parties_are_reported() {
			let f = fixture().await;
			let stranger = Identity::new("nobody@example.org");
			let err = f.store.commit(employ(&stranger, &f.ngo)).await.unwrap_err();
			assert!(matches!(err, RelationError::UnknownIdentity(_)));
		}
	}

	mod blocking {
		use super::*;

		#[tokio::test]
		async fn employ_is_refused_while_blocked() {
			let f = fixture().await;
			f.store
				.commit(EdgeUpdate::new(f.user.id, f.ngo.id, EdgeChange::ToggleBlock))
				.await
				.unwrap();

			let err = f.store.commit(employ(&f.user, &f.ngo)).await.unwrap_err();
			assert!(matches!(err, RelationError::Blocked));

			let (identity, org) = stored(&f, &f.ngo).await;
			assert!(!identity.is_employed_at(f.ngo.id));
			assert!(!org.has_employee(f.user.id));
		}

		#[tokio::test]
		async fn block_severs_employment_and_demotes() {
			let f = fixture().await;
			f.store.commit(employ(&f.user, &f.ngo)).await.unwrap();

			let outcome = f
				.store
				.commit(EdgeUpdate::new(f.user.id, f.ngo.id, EdgeChange::ToggleBlock))
				.await
				.unwrap();
			assert!(outcome.blocked);
			assert!(!outcome.employed);
			assert_eq!(outcome.role, Role::User);

			let (_, org) = stored(&f, &f.ngo).await;
			assert!(!org.has_employee(f.user.id));
		}

		#[tokio::test]
		async fn toggling_twice_restores() {
			let f = fixture().await;
			let update = EdgeUpdate::new(f.user.id, f.ngo.id, EdgeChange::ToggleBlock);
			f.store.commit(update).await.unwrap();
			let outcome = f.store.commit(update).await.unwrap();
			assert!(!outcome.blocked);

			let (identity, _) = stored(&f, &f.ngo).await;
			assert_eq!(identity, f.user);
		}
	}

	mod roles {
		use super::*;

		#[tokio::test]
		async fn admin_keeps_admin_when_hired_and_dismissed() {
			let f = fixture().await;
			let admin = Identity::new("admin@example.org").with_role(Role::Admin);
			f.directory.save_identity(admin.clone()).await.unwrap();

			let hired = f.store.commit(employ(&admin, &f.ngo)).await.unwrap();
			assert_eq!(hired.role, Role::Admin);
			let dismissed = f
				.store
				.commit(EdgeUpdate::new(admin.id, f.ngo.id, EdgeChange::Dismiss))
				.await
				.unwrap();
			assert_eq!(dismissed.role, Role::Admin);
		}
	}

	mod sequences {
		use super::*;
		use proptest::prelude::*;

		fn change() -> impl Strategy<Value = EdgeChange> {
			prop_oneof![
				Just(EdgeChange::Employ {
					role: Role::NgoEmployer
				}),
				Just(EdgeChange::Dismiss),
				Just(EdgeChange::ToggleBlock),
			]
		}

		proptest! {
			#[test]
			fn both_sides_agree_and_never_employed_while_blocked(
				changes in proptest::collection::vec(change(), 1..12)
			) {
				tokio_test::block_on(async {
					let f = fixture().await;
					for change in changes {
						let _ = f
							.store
							.commit(EdgeUpdate::new(f.user.id, f.ngo.id, change))
							.await;

						let (identity, org) = stored(&f, &f.ngo).await;
						assert_eq!(identity.is_employed_at(org.id), org.has_employee(identity.id));
						assert!(!(identity.is_employed_at(org.id) && identity.has_blocked(org.id)));
						let expected = if identity.is_employed_at(org.id) {
							Role::NgoEmployer
						} else {
							Role::User
						};
						assert_eq!(identity.role, expected);
					}
				});
			}
		}
	}
}
