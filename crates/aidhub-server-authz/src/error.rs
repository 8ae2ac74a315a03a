// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use aidhub_server_auth::DirectoryError;
use thiserror::Error;

use crate::slot::Slot;

/// Why a pipeline refused a request.
#[derive(Debug, Error)]
pub enum ResolveError {
	#[error("not found: {0}")]
	NotFound(String),

	#[error("forbidden: {0}")]
	Forbidden(String),

	#[error("validation error: {0}")]
	Validation(String),

	#[error("lookup failed: {0}")]
	Lookup(#[from] DirectoryError),
}

impl ResolveError {
	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		matches!(self, ResolveError::Lookup(_))
	}

	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ResolveError::NotFound(_) => 404,
			ResolveError::Forbidden(_) => 403,
			ResolveError::Validation(_) => 400,
			ResolveError::Lookup(_) => 500,
		}
	}
}

/// A pipeline that could never run successfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
	#[error("resolver '{resolver}' requires {slot} but no earlier resolver produces it")]
	MissingSlot { resolver: &'static str, slot: Slot },

	#[error("resolver '{resolver}' produces {slot} which is already available")]
	DuplicateSlot { resolver: &'static str, slot: Slot },
}
