// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ownership checks applied after a resource has been loaded.
//!
//! ADMIN passes every check.

use aidhub_server_auth::{Identity, Organization, Receipt};

/// The caller manages `org`.
pub fn can_manage_organization(caller: &Identity, org: &Organization) -> bool {
	caller.is_admin() || org.is_managed_by(caller.id)
}

/// The caller manages or works for `org`.
pub fn can_access_organization(caller: &Identity, org: &Organization) -> bool {
	can_manage_organization(caller, org) || org.has_member(caller.id) || caller.is_employed_at(org.id)
}

/// The caller may act on `target` as themself or as an administrator.
pub fn can_target_user(caller: &Identity, target: &Identity) -> bool {
	caller.is_admin() || caller.id == target.id
}

/// The caller created `receipt`, or manages or works for the owning
/// organization, passed as `owner` when the receipt has one.
pub fn can_access_receipt(
	caller: &Identity,
	receipt: &Receipt,
	owner: Option<&Organization>,
) -> bool {
	if caller.is_admin() || receipt.creator_id == caller.id {
		return true;
	}
	owner.is_some_and(|org| can_access_organization(caller, org))
}
