// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identities, organizations and user-owned resources.
//!
//! These are loaded from the [`Directory`](crate::Directory) on every request.
//! Nothing here is cached across requests, so the role seen by a check is
//! always the one currently stored.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{OrgId, OrganizationKind, PublicId, ReceiptId, Role, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	pub id: UserId,
	pub public_id: PublicId,
	pub email: String,
	pub role: Role,
	pub employed_at: BTreeSet<OrgId>,
	pub blocked_organizations: BTreeSet<OrgId>,
	pub managed_organization: Option<OrgId>,
}

impl Identity {
	/// A fresh identity with the generic role and no relations.
	pub fn new(email: impl Into<String>) -> Self {
		Self {
			id: UserId::generate(),
			public_id: PublicId::generate(),
			email: email.into(),
			role: Role::User,
			employed_at: BTreeSet::new(),
			blocked_organizations: BTreeSet::new(),
			managed_organization: None,
		}
	}

	pub fn with_role(mut self, role: Role) -> Self {
		self.role = role;
		self
	}

	pub fn is_admin(&self) -> bool {
		self.role.is_admin()
	}

	pub fn is_employed_at(&self, org: OrgId) -> bool {
		self.employed_at.contains(&org)
	}

	pub fn has_blocked(&self, org: OrgId) -> bool {
		self.blocked_organizations.contains(&org)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
	pub id: OrgId,
	pub public_id: PublicId,
	pub name: String,
	pub kind: OrganizationKind,
	pub manager_id: UserId,
	pub employees: BTreeSet<UserId>,
}

impl Organization {
	pub fn new(name: impl Into<String>, kind: OrganizationKind, manager_id: UserId) -> Self {
		Self {
			id: OrgId::generate(),
			public_id: PublicId::generate(),
			name: name.into(),
			kind,
			manager_id,
			employees: BTreeSet::new(),
		}
	}

	pub fn is_managed_by(&self, user: UserId) -> bool {
		self.manager_id == user
	}

	pub fn has_employee(&self, user: UserId) -> bool {
		self.employees.contains(&user)
	}

	/// Manager or employee.
	pub fn has_member(&self, user: UserId) -> bool {
		self.is_managed_by(user) || self.has_employee(user)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
	pub id: ReceiptId,
	pub public_id: PublicId,
	pub creator_id: UserId,
	pub organization_id: Option<OrgId>,
}

impl Receipt {
	pub fn new(creator_id: UserId, organization_id: Option<OrgId>) -> Self {
		Self {
			id: ReceiptId::generate(),
			public_id: PublicId::generate(),
			creator_id,
			organization_id,
		}
	}
}
