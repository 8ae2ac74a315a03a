// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Entity lookup collaborators.
//!
//! Persistence of identities, organizations and receipts lives outside this
//! core. [`Directory`] and [`ReceiptLookup`] describe what the core needs from
//! it. [`InMemoryDirectory`] backs tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::model::{Identity, Organization, Receipt};
use crate::types::{OrgId, PublicId, UserId};

#[derive(Debug, Error)]
pub enum DirectoryError {
	#[error("directory backend unavailable: {0}")]
	Unavailable(String),

	#[error("directory record inconsistent: {0}")]
	Inconsistent(String),
}

/// Identity and organization lookups.
///
/// Identities returned by `find_identity_by_public_id` carry their employment
/// and management relations.
#[async_trait]
pub trait Directory: Send + Sync {
	async fn find_identity_by_id(&self, id: UserId) -> Result<Option<Identity>, DirectoryError>;

	async fn find_identity_by_public_id(
		&self,
		id: &PublicId,
	) -> Result<Option<Identity>, DirectoryError>;

	async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, DirectoryError>;

	async fn find_organization_by_id(
		&self,
		id: OrgId,
	) -> Result<Option<Organization>, DirectoryError>;

	async fn find_organization_by_public_id(
		&self,
		id: &PublicId,
	) -> Result<Option<Organization>, DirectoryError>;

	async fn save_identity(&self, identity: Identity) -> Result<(), DirectoryError>;

	async fn remove_identity(&self, id: UserId) -> Result<bool, DirectoryError>;

	async fn save_organization(&self, organization: Organization) -> Result<(), DirectoryError>;

	async fn remove_organization(&self, id: OrgId) -> Result<bool, DirectoryError>;
}

#[async_trait]
pub trait ReceiptLookup: Send + Sync {
	async fn find_receipt_by_public_id(
		&self,
		id: &PublicId,
	) -> Result<Option<Receipt>, DirectoryError>;
}

/// Everything the in-memory directory holds.
#[derive(Debug, Default)]
pub struct DirectoryState {
	identities: HashMap<UserId, Identity>,
	organizations: HashMap<OrgId, Organization>,
	receipts: HashMap<PublicId, Receipt>,
}

impl DirectoryState {
	pub fn identity(&self, id: UserId) -> Option<&Identity> {
		self.identities.get(&id)
	}

	pub fn identity_mut(&mut self, id: UserId) -> Option<&mut Identity> {
		self.identities.get_mut(&id)
	}

	pub fn organization(&self, id: OrgId) -> Option<&Organization> {
		self.organizations.get(&id)
	}

	pub fn organization_mut(&mut self, id: OrgId) -> Option<&mut Organization> {
		self.organizations.get_mut(&id)
	}

	/// Both sides of a relation at once.
	pub fn pair_mut(
		&mut self,
		user: UserId,
		org: OrgId,
	) -> Option<(&mut Identity, &mut Organization)> {
		let identity = self.identities.get_mut(&user)?;
		let organization = self.organizations.get_mut(&org)?;
		Some((identity, organization))
	}

	/// Iterate organizations, used to derive kind-specific employment.
	pub fn organizations(&self) -> impl Iterator<Item = &Organization> {
		self.organizations.values()
	}
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
	state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn save_receipt(&self, receipt: Receipt) {
		let mut state = self.state.write().await;
		state.receipts.insert(receipt.public_id.clone(), receipt);
	}

	/// Run `f` with exclusive access. `f` is synchronous, so the whole update
	/// is applied without yielding.
	pub async fn write_state<R>(&self, f: impl FnOnce(&mut DirectoryState) -> R) -> R {
		let mut state = self.state.write().await;
		f(&mut state)
	}

	pub async fn read_state<R>(&self, f: impl FnOnce(&DirectoryState) -> R) -> R {
		let state = self.state.read().await;
		f(&state)
	}
}

#[async_trait]
impl Directory for InMemoryDirectory {
	async fn find_identity_by_id(&self, id: UserId) -> Result<Option<Identity>, DirectoryError> {
		Ok(self.state.read().await.identities.get(&id).cloned())
	}

	async fn find_identity_by_public_id(
		&self,
		id: &PublicId,
	) -> Result<Option<Identity>, DirectoryError> {
		let state = self.state.read().await;
		Ok(state
			.identities
			.values()
			.find(|identity| &identity.public_id == id)
			.cloned())
	}

	async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, DirectoryError> {
		let state = self.state.read().await;
		Ok(state
			.identities
			.values()
			.find(|identity| identity.email.eq_ignore_ascii_case(email))
			.cloned())
	}

	async fn find_organization_by_id(
		&self,
		id: OrgId,
	) -> Result<Option<Organization>, DirectoryError> {
		Ok(self.state.read().await.organizations.get(&id).cloned())
	}

	async fn find_organization_by_public_id(
		&self,
		id: &PublicId,
	) -> Result<Option<Organization>, DirectoryError> {
		let state = self.state.read().await;
		Ok(state
			.organizations
			.values()
			.find(|org| &org.public_id == id)
			.cloned())
	}

	async fn save_identity(&self, identity: Identity) -> Result<(), DirectoryError> {
		self.state
			.write()
			.await
			.identities
			.insert(identity.id, identity);
		Ok(())
	}

	async fn remove_identity(&self, id: UserId) -> Result<bool, DirectoryError> {
		Ok(self.state.write().await.identities.remove(&id).is_some())
	}

	async fn save_organization(&self, organization: Organization) -> Result<(), DirectoryError> {
		self.state
			.write()
			.await
			.organizations
			.insert(organization.id, organization);
		Ok(())
	}

	async fn remove_organization(&self, id: OrgId) -> Result<bool, DirectoryError> {
		Ok(self.state.write().await.organizations.remove(&id).is_some())
	}
}

#[async_trait]
impl ReceiptLookup for InMemoryDirectory {
	async fn find_receipt_by_public_id(
		&self,
		id: &PublicId,
	) -> Result<Option<Receipt>, DirectoryError> {
		Ok(self.state.read().await.receipts.get(id).cloned())
	}
}
