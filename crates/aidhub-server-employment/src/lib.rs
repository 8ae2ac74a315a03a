// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Employment and block relations between identities and organizations.
//!
//! Roles of employees follow their employment: hiring grants the
//! organization kind's employee role and losing the last such job returns
//! the identity to USER. An identity never both works for and blocks the
//! same organization.

pub mod error;
pub mod relation;
pub mod service;

pub use error::EmploymentError;
pub use relation::{
	derive_role, CommitOutcome, EdgeChange, EdgeUpdate, InMemoryRelationStore, RelationError,
	RelationStore,
};
pub use service::{EmploymentChange, EmploymentService};
