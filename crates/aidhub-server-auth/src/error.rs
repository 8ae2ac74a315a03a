// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication error types.
//!
//! Credential problems detected by [`AuthService::check`](crate::AuthService::check)
//! are reported as an [`AuthStatus`](crate::AuthStatus), not as errors. The
//! variants here cover explicit operations that can be refused and
//! infrastructure failures.

use thiserror::Error;

use crate::directory::DirectoryError;
use crate::session_store::SessionStoreError;
use crate::token::TokenError;

#[derive(Debug, Error)]
pub enum AuthError {
	/// The refresh token is invalid, reused or revoked. Requires a fresh login.
	#[error("refresh token rejected")]
	RefreshRejected,

	/// The identity named by a token no longer exists.
	#[error("identity not found")]
	IdentityNotFound,

	#[error("token error: {0}")]
	Token(#[from] TokenError),

	#[error("directory error: {0}")]
	Directory(#[from] DirectoryError),

	#[error("session store error: {0}")]
	SessionStore(#[from] SessionStoreError),

	/// A cookie could not be encoded as a header value.
	#[error("invalid header value: {0}")]
	InvalidHeader(String),
}

impl AuthError {
	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		matches!(
			self,
			AuthError::Directory(_)
				| AuthError::SessionStore(_)
				| AuthError::InvalidHeader(_)
				| AuthError::Token(TokenError::Encoding(_))
		)
	}

	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			AuthError::RefreshRejected | AuthError::IdentityNotFound => 403,
			AuthError::Token(TokenError::Encoding(_)) => 500,
			AuthError::Token(_) => 401,
			AuthError::Directory(_) | AuthError::SessionStore(_) | AuthError::InvalidHeader(_) => 500,
		}
	}
}
