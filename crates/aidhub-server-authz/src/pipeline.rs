// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ordered resolver composition.
//!
//! ```text
//! builder().then(org).then(user).build()
//!     │
//!     ├── every requires() produced earlier?   else CompositionError::MissingSlot
//!     └── every produces() new?                else CompositionError::DuplicateSlot
//!
//! run(caller, params, lookups)
//!     └── resolvers in order, first error wins
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use aidhub_server_auth::Identity;
use tracing::{debug, instrument};

use crate::context::AuthorizationContext;
use crate::error::{CompositionError, ResolveError};
use crate::resolver::{Lookups, Resolver};
use crate::slot::{RouteParams, Slot};

#[derive(Clone)]
pub struct ResolverPipeline {
	resolvers: Vec<Arc<dyn Resolver>>,
}

impl std::fmt::Debug for ResolverPipeline {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list()
			.entries(self.resolvers.iter().map(|r| r.name()))
			.finish()
	}
}

#[derive(Default)]
pub struct ResolverPipelineBuilder {
	resolvers: Vec<Arc<dyn Resolver>>,
}

impl ResolverPipelineBuilder {
	pub fn then(mut self, resolver: impl Resolver + 'static) -> Self {
		self.resolvers.push(Arc::new(resolver));
		self
	}

	pub fn build(self) -> Result<ResolverPipeline, CompositionError> {
		let mut available = HashSet::from([Slot::Caller]);
		for resolver in &self.resolvers {
			if let Some(&slot) = resolver
				.requires()
				.iter()
				.find(|slot| !available.contains(*slot))
			{
				return Err(CompositionError::MissingSlot {
					resolver: resolver.name(),
					slot,
				});
			}

			let produced = resolver.produces();
			if !available.insert(produced) {
				return Err(CompositionError::DuplicateSlot {
					resolver: resolver.name(),
					slot: produced,
				});
			}
		}

		Ok(ResolverPipeline {
			resolvers: self.resolvers,
		})
	}
}

impl ResolverPipeline {
	pub fn builder() -> ResolverPipelineBuilder {
		ResolverPipelineBuilder::default()
	}

	pub fn len(&self) -> usize {
		self.resolvers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.resolvers.is_empty()
	}

	/// Run every resolver against a fresh context for `caller`.
	#[instrument(skip_all, fields(user_id = %caller.id))]
	pub async fn run(
		&self,
		caller: Identity,
		params: RouteParams,
		lookups: &Lookups,
	) -> Result<AuthorizationContext, ResolveError> {
		let mut ctx = AuthorizationContext::new(caller, params);
		for resolver in &self.resolvers {
			if let Err(e) = resolver.resolve(&mut ctx, lookups).await {
				debug!(resolver = resolver.name(), error = %e, "resolution stopped");
				return Err(e);
			}
		}
		Ok(ctx)
	}
}
