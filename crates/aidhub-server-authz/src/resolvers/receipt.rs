// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use aidhub_server_auth::PublicId;
use async_trait::async_trait;
use tracing::instrument;

use crate::context::AuthorizationContext;
use crate::error::ResolveError;
use crate::policy::can_access_receipt;
use crate::resolver::{Lookups, Resolver};
use crate::slot::Slot;

/// Loads a receipt; its creator and the owning organization's staff may act
/// on it.
#[derive(Debug, Clone)]
pub struct ReceiptResolver {
	param: String,
}

impl ReceiptResolver {
	pub fn new(param: impl Into<String>) -> Self {
		Self {
			param: param.into(),
		}
	}
}

#[async_trait]
impl Resolver for ReceiptResolver {
	fn name(&self) -> &'static str {
		"receipt"
	}

	fn produces(&self) -> Slot {
		Slot::Receipt
	}

	#[instrument(skip_all, fields(resolver = self.name()))]
	async fn resolve(
		&self,
		ctx: &mut AuthorizationContext,
		lookups: &Lookups,
	) -> Result<(), ResolveError> {
		let public_id = PublicId::new(ctx.require_param(&self.param)?);
		let receipt = lookups
			.receipts
			.find_receipt_by_public_id(&public_id)
			.await?
			.ok_or_else(|| ResolveError::NotFound(format!("receipt {public_id}")))?;

		let owner = match receipt.organization_id {
			Some(org_id) if !ctx.caller().is_admin() && receipt.creator_id != ctx.caller().id => {
				lookups.directory.find_organization_by_id(org_id).await?
			}
			_ => None,
		};
		if !can_access_receipt(ctx.caller(), &receipt, owner.as_ref()) {
			return Err(ResolveError::Forbidden(format!("receipt {public_id}")));
		}

		ctx.receipt = Some(receipt);
		Ok(())
	}
}
