// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use aidhub_server_auth::SessionStoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for SessionStoreError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::Sqlx(e) => SessionStoreError::Backend(e.to_string()),
			DbError::Internal(msg) => SessionStoreError::Corrupt(msg),
			DbError::Serialization(e) => SessionStoreError::Corrupt(e.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decode_failures_are_corrupt() {
		let err: SessionStoreError = DbError::Internal("bad uuid".into()).into();
		assert!(matches!(err, SessionStoreError::Corrupt(_)));

		let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
		let err: SessionStoreError = DbError::Serialization(json_err).into();
		assert!(matches!(err, SessionStoreError::Corrupt(_)));
	}

	#[test]
	fn driver_failures_are_backend() {
		let err: SessionStoreError = DbError::Sqlx(sqlx::Error::PoolTimedOut).into();
		assert!(matches!(err, SessionStoreError::Backend(_)));
	}
}
