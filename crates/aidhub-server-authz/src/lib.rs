// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource resolution and authorization for AidHub.
//!
//! A [`ResolverPipeline`] turns an authenticated identity plus route
//! parameters into an [`AuthorizationContext`] holding permission-checked
//! entities, before any business handler runs.
//!
//! # Resolution Flow
//!
//! ```text
//! pipeline.run(caller, params, lookups)
//!     │
//!     └── for each resolver, in order:
//!         ├── route parameter present?      else Validation (400)
//!         ├── entity exists?                else NotFound   (404)
//!         └── caller may act on it?         else Forbidden  (403)
//!             (ADMIN always may)
//! ```
//!
//! # Example
//!
//! ```
//! use aidhub_server_authz::{OrganizationResolver, ResolverPipeline, UserResolver};
//!
//! // Dismissing a user: load the organization, then the user to dismiss.
//! let pipeline = ResolverPipeline::builder()
//!     .then(OrganizationResolver::member("org"))
//!     .then(UserResolver::organization_staff("user"))
//!     .build()
//!     .unwrap();
//! assert_eq!(pipeline.len(), 2);
//!
//! // The user resolver needs an organization, so this cannot be built.
//! assert!(ResolverPipeline::builder()
//!     .then(UserResolver::organization_staff("user"))
//!     .build()
//!     .is_err());
//! ```

pub mod context;
pub mod error;
pub mod pipeline;
pub mod policy;
pub mod resolver;
pub mod resolvers;
pub mod slot;

pub use context::AuthorizationContext;
pub use error::{CompositionError, ResolveError};
pub use pipeline::{ResolverPipeline, ResolverPipelineBuilder};
pub use resolver::{Lookups, Resolver};
pub use resolvers::{
	OrganizationAccess, OrganizationResolver, ReceiptResolver, UserResolver, UserTarget,
};
pub use slot::{RouteParams, Slot};
