// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions shared by authentication and authorization.
//!
//! - **ID newtypes**: internal identifiers ([`UserId`], [`OrgId`], [`ReceiptId`])
//!   wrapping UUIDs, plus the opaque [`PublicId`] used in routes
//! - **Roles**: the single global [`Role`] an identity holds
//! - **Organization kinds**: [`OrganizationKind`] and the roles each kind grants

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			pub fn into_inner(self) -> Uuid {
				self.0
			}

			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Internal identifier of an identity.");
define_id_type!(OrgId, "Internal identifier of an organization.");
define_id_type!(ReceiptId, "Internal identifier of a receipt.");

impl std::str::FromStr for UserId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Uuid::parse_str(s).map(Self)
	}
}

/// Externally visible identifier carried in route parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicId(String);

impl PublicId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn generate() -> Self {
		Self(Uuid::new_v4().simple().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for PublicId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for PublicId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

// =============================================================================
// Roles
// =============================================================================

/// The role an identity holds. Employee roles are derived from employment
/// and never assigned directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
	#[default]
	User,
	Admin,
	NgoManager,
	NgoEmployer,
	SupplierManager,
	SupplierEmployer,
}

impl Role {
	pub fn all() -> &'static [Role] {
		&[
			Role::User,
			Role::Admin,
			Role::NgoManager,
			Role::NgoEmployer,
			Role::SupplierManager,
			Role::SupplierEmployer,
		]
	}

	pub fn is_admin(&self) -> bool {
		matches!(self, Role::Admin)
	}

	/// The organization kind an employee role belongs to.
	pub fn employee_of(&self) -> Option<OrganizationKind> {
		match self {
			Role::NgoEmployer => Some(OrganizationKind::Ngo),
			Role::SupplierEmployer => Some(OrganizationKind::Supplier),
			_ => None,
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Role::User => "USER",
			Role::Admin => "ADMIN",
			Role::NgoManager => "NGO_MANAGER",
			Role::NgoEmployer => "NGO_EMPLOYER",
			Role::SupplierManager => "SUPPLIER_MANAGER",
			Role::SupplierEmployer => "SUPPLIER_EMPLOYER",
		};
		f.write_str(s)
	}
}

// =============================================================================
// Organization kinds
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationKind {
	Ngo,
	Supplier,
}

impl OrganizationKind {
	pub fn employee_role(&self) -> Role {
		match self {
			OrganizationKind::Ngo => Role::NgoEmployer,
			OrganizationKind::Supplier => Role::SupplierEmployer,
		}
	}

	pub fn manager_role(&self) -> Role {
		match self {
			OrganizationKind::Ngo => Role::NgoManager,
			OrganizationKind::Supplier => Role::SupplierManager,
		}
	}
}

impl fmt::Display for OrganizationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrganizationKind::Ngo => f.write_str("NGO"),
			OrganizationKind::Supplier => f.write_str("SUPPLIER"),
		}
	}
}
