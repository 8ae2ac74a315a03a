// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use aidhub_server_auth::{Directory, ReceiptLookup};
use async_trait::async_trait;

use crate::context::AuthorizationContext;
use crate::error::ResolveError;
use crate::slot::Slot;

/// The collaborators resolvers load entities through.
#[derive(Clone)]
pub struct Lookups {
	pub directory: Arc<dyn Directory>,
	pub receipts: Arc<dyn ReceiptLookup>,
}

impl Lookups {
	pub fn new(directory: Arc<dyn Directory>, receipts: Arc<dyn ReceiptLookup>) -> Self {
		Self {
			directory,
			receipts,
		}
	}
}

impl std::fmt::Debug for Lookups {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Lookups").finish_non_exhaustive()
	}
}

/// One step of a [`ResolverPipeline`](crate::ResolverPipeline).
///
/// `resolve` first loads its entity (404 when absent) and only then checks
/// the caller's right to it (403).
#[async_trait]
pub trait Resolver: Send + Sync {
	/// Stable name used in logs and composition errors.
	fn name(&self) -> &'static str;

	/// Slots that must be filled before this resolver runs. The caller slot
	/// is always filled.
	fn requires(&self) -> &'static [Slot] {
		&[]
	}

	fn produces(&self) -> Slot;

	async fn resolve(
		&self,
		ctx: &mut AuthorizationContext,
		lookups: &Lookups,
	) -> Result<(), ResolveError>;
}
