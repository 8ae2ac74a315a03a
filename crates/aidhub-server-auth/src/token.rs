// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access and refresh token signing.
//!
//! Both tokens are HS256 JWTs signed with independent keys. Access tokens are
//! stateless and carry the identity id and email. Refresh tokens carry only
//! the identity id and a random `jti`, and are additionally gated by the
//! session store.
//!
//! Validation uses zero leeway: a token is rejected the second after its
//! `exp`.

use std::fmt;
use std::time::Duration;

use aidhub_common_config::SecretString;
use aidhub_server_config::AuthConfig;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::model::Identity;
use crate::types::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
	#[error("token signature is invalid")]
	InvalidSignature,

	#[error("token has expired")]
	Expired,

	#[error("token is malformed: {0}")]
	Malformed(String),

	#[error("failed to sign token: {0}")]
	Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
	fn from(e: jsonwebtoken::errors::Error) -> Self {
		match e.kind() {
			ErrorKind::InvalidSignature => TokenError::InvalidSignature,
			ErrorKind::ExpiredSignature => TokenError::Expired,
			_ => TokenError::Malformed(e.to_string()),
		}
	}
}

/// Claims of an access token.
///
/// `sub` and `email` are optional on the way in so that a validly signed
/// token without them can be told apart from a forged one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	pub iat: i64,
	pub exp: i64,
}

impl AccessClaims {
	/// The identity id, if present and well formed.
	pub fn identity_id(&self) -> Option<UserId> {
		self.sub.as_deref().and_then(|s| s.parse().ok())
	}
}

/// Claims of a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
	pub sub: String,
	pub jti: String,
	pub iat: i64,
	pub exp: i64,
}

impl RefreshClaims {
	pub fn identity_id(&self) -> Option<UserId> {
		self.sub.parse().ok()
	}
}

/// A freshly minted pair.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
	pub access_token: String,
	pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TokenPair")
			.field("access_token", &aidhub_common_config::REDACTED)
			.field("refresh_token", &aidhub_common_config::REDACTED)
			.finish()
	}
}

pub struct TokenService {
	access_encoding: EncodingKey,
	access_decoding: DecodingKey,
	refresh_encoding: EncodingKey,
	refresh_decoding: DecodingKey,
	access_ttl: Duration,
	refresh_ttl: Duration,
	validation: Validation,
}

impl fmt::Debug for TokenService {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TokenService")
			.field("access_ttl", &self.access_ttl)
			.field("refresh_ttl", &self.refresh_ttl)
			.finish_non_exhaustive()
	}
}

impl TokenService {
	pub fn new(
		access_secret: &SecretString,
		refresh_secret: &SecretString,
		access_ttl: Duration,
		refresh_ttl: Duration,
	) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 0;
		validation.validate_aud = false;

		Self {
			access_encoding: EncodingKey::from_secret(access_secret.expose().as_bytes()),
			access_decoding: DecodingKey::from_secret(access_secret.expose().as_bytes()),
			refresh_encoding: EncodingKey::from_secret(refresh_secret.expose().as_bytes()),
			refresh_decoding: DecodingKey::from_secret(refresh_secret.expose().as_bytes()),
			access_ttl,
			refresh_ttl,
			validation,
		}
	}

	pub fn from_config(config: &AuthConfig) -> Self {
		Self::new(
			&config.access_token_secret,
			&config.refresh_token_secret,
			Duration::from_secs(config.access_token_ttl_secs),
			Duration::from_secs(config.refresh_token_ttl_secs),
		)
	}

	pub fn access_ttl(&self) -> Duration {
		self.access_ttl
	}

	pub fn refresh_ttl(&self) -> Duration {
		self.refresh_ttl
	}

	pub fn generate_token_pair(&self, identity: &Identity) -> Result<TokenPair, TokenError> {
		self.generate_token_pair_at(identity, Utc::now())
	}

	/// Mint a pair as if issued at `issued_at`.
	#[instrument(level = "debug", skip(self, identity), fields(user_id = %identity.id))]
	pub fn generate_token_pair_at(
		&self,
		identity: &Identity,
		issued_at: DateTime<Utc>,
	) -> Result<TokenPair, TokenError> {
		let iat = issued_at.timestamp();
		let header = Header::new(Algorithm::HS256);

		let access = AccessClaims {
			sub: Some(identity.id.to_string()),
			email: Some(identity.email.clone()),
			iat,
			exp: iat + ttl_secs(self.access_ttl),
		};
		let refresh = RefreshClaims {
			sub: identity.id.to_string(),
			jti: Uuid::new_v4().to_string(),
			iat,
			exp: iat + ttl_secs(self.refresh_ttl),
		};

		let access_token = encode(&header, &access, &self.access_encoding)
			.map_err(|e| TokenError::Encoding(e.to_string()))?;
		let refresh_token = encode(&header, &refresh, &self.refresh_encoding)
			.map_err(|e| TokenError::Encoding(e.to_string()))?;

		debug!(access_exp = access.exp, refresh_exp = refresh.exp, "issued token pair");
		Ok(TokenPair {
			access_token,
			refresh_token,
		})
	}

	/// Sign arbitrary access claims. Used for tokens this service would not
	/// mint itself, e.g. in tests of claim handling.
	pub fn sign_access_claims(&self, claims: &AccessClaims) -> Result<String, TokenError> {
		encode(&Header::new(Algorithm::HS256), claims, &self.access_encoding)
			.map_err(|e| TokenError::Encoding(e.to_string()))
	}

	pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
		let data = decode::<AccessClaims>(token, &self.access_decoding, &self.validation)?;
		Ok(data.claims)
	}

	pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
		let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)?;
		Ok(data.claims)
	}
}

fn ttl_secs(ttl: Duration) -> i64 {
	i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2)
}
