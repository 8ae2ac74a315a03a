// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use aidhub_server_auth::DirectoryError;
use thiserror::Error;

use crate::relation::RelationError;

#[derive(Debug, Error)]
pub enum EmploymentError {
	#[error("validation error: {0}")]
	Validation(String),

	#[error("forbidden: {0}")]
	Forbidden(String),

	#[error("not found: {0}")]
	NotFound(String),

	#[error("relation store error: {0}")]
	Store(String),
}

impl EmploymentError {
	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		matches!(self, EmploymentError::Store(_))
	}

	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			EmploymentError::Validation(_) => 400,
			EmploymentError::Forbidden(_) => 403,
			EmploymentError::NotFound(_) => 404,
			EmploymentError::Store(_) => 500,
		}
	}

	pub fn message(&self) -> String {
		self.to_string()
	}
}

impl From<DirectoryError> for EmploymentError {
	fn from(err: DirectoryError) -> Self {
		EmploymentError::Store(err.to_string())
	}
}

impl From<RelationError> for EmploymentError {
	fn from(err: RelationError) -> Self {
		match err {
			RelationError::UnknownIdentity(_) | RelationError::UnknownOrganization(_) => {
				EmploymentError::NotFound(err.to_string())
			}
			RelationError::Blocked => EmploymentError::Forbidden(err.to_string()),
			RelationError::Conflict | RelationError::Store(_) => {
				EmploymentError::Store(err.to_string())
			}
		}
	}
}
