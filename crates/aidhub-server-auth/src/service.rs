// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The authentication state machine and session operations.
//!
//! [`AuthService::check`] turns the three request credentials into an
//! [`AuthStatus`]. The rules are applied in a fixed order and the first one
//! that fires decides the outcome:
//!
//! | # | Condition                                   | Status          |
//! |---|---------------------------------------------|-----------------|
//! | 1 | no access token                             | UNAUTHENTICATED |
//! | 2 | access token fails verification             | EXPIRED         |
//! | 3 | token carries no identity id                | FORBIDDEN       |
//! | 4 | identity id does not resolve                | FORBIDDEN       |
//! | 5 | email claim differs from stored email       | FORBIDDEN       |
//! | 6 | no session id                               | FORBIDDEN       |
//! | 7 | no refresh token                            | FORBIDDEN       |
//! | 8 | session store rejects the refresh token     | EXPIRED         |
//! | 9 | session-binding policy rejects              | FORBIDDEN       |
//! |10 | otherwise                                   | AUTHENTICATED   |
//!
//! FORBIDDEN means the client must drop every credential and log in again.
//! EXPIRED means a refresh exchange may recover the session.

use std::fmt;
use std::sync::Arc;

use aidhub_server_fingerprint::{AsnLookup, Fingerprint, NoAsnLookup};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::binding::{BindingDecision, InertBinding, SessionBindingPolicy};
use crate::directory::Directory;
use crate::error::AuthError;
use crate::middleware::{ClientInfo, Credentials};
use crate::model::Identity;
use crate::session::generate_session_id;
use crate::session_store::{RefreshSessionStore, SessionSummary};
use crate::token::{TokenPair, TokenService};
use crate::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatus {
	Authenticated,
	Unauthenticated,
	Expired,
	Forbidden,
}

impl AuthStatus {
	/// Whether the client must discard all three credentials.
	pub fn clears_credentials(&self) -> bool {
		matches!(self, AuthStatus::Forbidden)
	}

	pub fn is_authenticated(&self) -> bool {
		matches!(self, AuthStatus::Authenticated)
	}
}

impl fmt::Display for AuthStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AuthStatus::Authenticated => f.write_str("AUTHENTICATED"),
			AuthStatus::Unauthenticated => f.write_str("UNAUTHENTICATED"),
			AuthStatus::Expired => f.write_str("EXPIRED"),
			AuthStatus::Forbidden => f.write_str("FORBIDDEN"),
		}
	}
}

/// Outcome of [`AuthService::check`].
///
/// `identity` is present when the status is AUTHENTICATED, and when an
/// otherwise valid access token was refused by the session store (EXPIRED
/// at rule 8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCheck {
	pub status: AuthStatus,
	pub identity: Option<Identity>,
}

impl AuthCheck {
	fn status(status: AuthStatus) -> Self {
		Self {
			status,
			identity: None,
		}
	}

	fn with_identity(status: AuthStatus, identity: Identity) -> Self {
		Self {
			status,
			identity: Some(identity),
		}
	}
}

/// Result of a login: the pair plus the session id it is bound to.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
	pub tokens: TokenPair,
	pub session_id: String,
}

pub struct AuthService {
	directory: Arc<dyn Directory>,
	tokens: Arc<TokenService>,
	sessions: RefreshSessionStore,
	binding: Arc<dyn SessionBindingPolicy>,
	asn_lookup: Arc<dyn AsnLookup>,
}

impl fmt::Debug for AuthService {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AuthService")
			.field("tokens", &self.tokens)
			.field("binding", &self.binding.name())
			.finish_non_exhaustive()
	}
}

impl AuthService {
	/// Inert binding and no ASN lookups until configured otherwise.
	pub fn new(
		directory: Arc<dyn Directory>,
		tokens: Arc<TokenService>,
		sessions: RefreshSessionStore,
	) -> Self {
		Self {
			directory,
			tokens,
			sessions,
			binding: Arc::new(InertBinding),
			asn_lookup: Arc::new(NoAsnLookup),
		}
	}

	pub fn with_binding_policy(mut self, binding: Arc<dyn SessionBindingPolicy>) -> Self {
		self.binding = binding;
		self
	}

	pub fn with_asn_lookup(mut self, asn_lookup: Arc<dyn AsnLookup>) -> Self {
		self.asn_lookup = asn_lookup;
		self
	}

	pub fn tokens(&self) -> &TokenService {
		&self.tokens
	}

	pub fn session_store(&self) -> &RefreshSessionStore {
		&self.sessions
	}

	fn capture(&self, client: &ClientInfo) -> Fingerprint {
		Fingerprint::capture(
			client.ip.as_deref(),
			client.user_agent.as_deref(),
			self.asn_lookup.as_ref(),
		)
	}

	#[instrument(skip_all, fields(session_id = credentials.session_id.as_deref()))]
	pub async fn check(
		&self,
		credentials: &Credentials,
		client: &ClientInfo,
	) -> Result<AuthCheck, AuthError> {
		// 1
		let Some(access_token) = credentials.access_token.as_ref() else {
			return Ok(AuthCheck::status(AuthStatus::Unauthenticated));
		};

		// 2
		let claims = match self.tokens.verify_access(access_token.expose()) {
			Ok(claims) => claims,
			Err(e) => {
				debug!(error = %e, "access token rejected");
				return Ok(AuthCheck::status(AuthStatus::Expired));
			}
		};

		// 3
		let Some(identity_id) = claims.identity_id() else {
			warn!("signed access token without identity id");
			return Ok(AuthCheck::status(AuthStatus::Forbidden));
		};

		// 4
		let Some(identity) = self.directory.find_identity_by_id(identity_id).await? else {
			warn!(user_id = %identity_id, "access token for unknown identity");
			return Ok(AuthCheck::status(AuthStatus::Forbidden));
		};

		// 5
		if claims.email.as_deref() != Some(identity.email.as_str()) {
			info!(user_id = %identity.id, "access token email is stale");
			return Ok(AuthCheck::status(AuthStatus::Forbidden));
		}

		// 6
		let Some(session_id) = credentials.session_id.as_deref() else {
			return Ok(AuthCheck::status(AuthStatus::Forbidden));
		};

		// 7
		let Some(refresh_token) = credentials.refresh_token.as_ref() else {
			return Ok(AuthCheck::status(AuthStatus::Forbidden));
		};

		// 8
		if !self
			.sessions
			.is_valid(identity.id, refresh_token.expose(), session_id)
			.await?
		{
			debug!(user_id = %identity.id, "refresh session not valid");
			return Ok(AuthCheck::with_identity(AuthStatus::Expired, identity));
		}

		// 9
		let observed = self.capture(client);
		let stored = self.sessions.fingerprint(identity.id, session_id).await?;
		if self.binding.evaluate(stored.as_ref(), &observed) == BindingDecision::Mismatch {
			return Ok(AuthCheck::status(AuthStatus::Forbidden));
		}
		if let Some(mut refreshed) = stored {
			if refreshed.matches(&observed) {
				self.sessions
					.update_fingerprint(identity.id, refresh_token.expose(), session_id, refreshed)
					.await?;
			}
		}

		// 10
		Ok(AuthCheck::with_identity(AuthStatus::Authenticated, identity))
	}

	/// Issue and persist a fresh pair. A new session id is generated when
	/// none is given.
	#[instrument(skip(self, identity, client), fields(user_id = %identity.id))]
	pub async fn login(
		&self,
		identity: &Identity,
		session_id: Option<String>,
		client: &ClientInfo,
	) -> Result<LoginOutcome, AuthError> {
		let session_id = session_id.unwrap_or_else(generate_session_id);
		let tokens = self.tokens.generate_token_pair(identity)?;

		let fingerprint = Some(self.capture(client)).filter(|fp| !fp.is_empty());
		self.sessions
			.save(identity.id, &tokens.refresh_token, &session_id, fingerprint)
			.await?;

		info!(session_id = %session_id, "login issued new session");
		Ok(LoginOutcome { tokens, session_id })
	}

	/// Exchange `old_token` for a new pair. The old token stops working.
	#[instrument(skip(self, identity, old_token), fields(user_id = %identity.id))]
	pub async fn refresh(
		&self,
		identity: &Identity,
		old_token: &str,
		session_id: &str,
	) -> Result<TokenPair, AuthError> {
		let claims = self.tokens.verify_refresh(old_token).map_err(|e| {
			debug!(error = %e, "refresh token failed verification");
			AuthError::RefreshRejected
		})?;
		if claims.identity_id() != Some(identity.id) {
			warn!("refresh token subject does not match identity");
			return Err(AuthError::RefreshRejected);
		}

		let tokens = self.tokens.generate_token_pair(identity)?;
		if !self
			.sessions
			.rotate(identity.id, old_token, &tokens.refresh_token, session_id)
			.await?
		{
			return Err(AuthError::RefreshRejected);
		}

		debug!("refresh token rotated");
		Ok(tokens)
	}

	/// Resolve the identity from the refresh token, then [`refresh`](Self::refresh).
	pub async fn exchange(
		&self,
		refresh_token: &str,
		session_id: &str,
	) -> Result<(Identity, TokenPair), AuthError> {
		let identity_id = self
			.tokens
			.verify_refresh(refresh_token)
			.ok()
			.and_then(|claims| claims.identity_id())
			.ok_or(AuthError::RefreshRejected)?;
		let identity = self
			.directory
			.find_identity_by_id(identity_id)
			.await?
			.ok_or(AuthError::IdentityNotFound)?;

		let tokens = self.refresh(&identity, refresh_token, session_id).await?;
		Ok((identity, tokens))
	}

	/// Best effort: anything unusable is ignored and failures are only logged.
	#[instrument(skip_all, fields(session_id))]
	pub async fn logout(&self, refresh_token: Option<&str>, session_id: Option<&str>) {
		let (Some(token), Some(session_id)) = (refresh_token, session_id) else {
			return;
		};
		tracing::Span::current().record("session_id", session_id);

		let Some(identity_id) = self
			.tokens
			.verify_refresh(token)
			.ok()
			.and_then(|claims| claims.identity_id())
		else {
			debug!("logout with unusable refresh token ignored");
			return;
		};

		match self.sessions.is_valid(identity_id, token, session_id).await {
			Ok(true) => {
				if let Err(e) = self.sessions.revoke(identity_id, Some(session_id)).await {
					warn!(error = %e, "logout revoke failed");
				}
			}
			Ok(false) => debug!("logout for session that is no longer live"),
			Err(e) => warn!(error = %e, "logout lookup failed"),
		}
	}

	/// Revoke every session, e.g. after a password change or deletion.
	pub async fn logout_everywhere(&self, identity_id: UserId) -> Result<u64, AuthError> {
		Ok(self.sessions.revoke(identity_id, None).await?)
	}

	pub async fn sessions(&self, identity_id: UserId) -> Result<Vec<SessionSummary>, AuthError> {
		Ok(self.sessions.sessions(identity_id).await?)
	}
}
