// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication for AidHub.
//!
//! This crate provides:
//! - Short-lived access tokens and rotating refresh tokens (HS256 JWT)
//! - Per-device refresh sessions with single-use rotation
//! - The request authentication state machine ([`AuthService::check`])
//! - Session binding against client fingerprints
//! - Cookie transport for the three request credentials
//! - The identity, organization and receipt model shared with authorization
//!
//! # Security Considerations
//!
//! - Refresh tokens are stored as SHA-256 hashes, never plaintext
//! - Signing secrets and request tokens use [`aidhub_common_config::SecretString`]
//! - A refresh token can be exchanged at most once

pub mod binding;
pub mod directory;
pub mod error;
pub mod middleware;
pub mod model;
pub mod service;
pub mod session;
pub mod session_store;
pub mod token;
pub mod types;

pub use binding::{binding_policy, BindingDecision, InertBinding, SessionBindingPolicy, StrictBinding};
pub use directory::{Directory, DirectoryError, DirectoryState, InMemoryDirectory, ReceiptLookup};
pub use error::AuthError;
pub use middleware::{
	clear_cookies, extract_client_info, extract_cookie, extract_credentials,
	extract_credentials_with_names, issue_cookies, ClientInfo, Credentials, FORWARDED_FOR,
};
pub use model::{Identity, Organization, Receipt};
pub use service::{AuthCheck, AuthService, AuthStatus, LoginOutcome};
pub use session::{generate_session_id, SESSION_ID_BYTES};
pub use session_store::{
	InMemorySessionKv, RefreshSessionStore, SessionKey, SessionKv, SessionRecord,
	SessionStoreError, SessionSummary,
};
pub use token::{AccessClaims, RefreshClaims, TokenError, TokenPair, TokenService};
pub use types::*;

/// Hash a token using SHA-256 and return the hex-encoded result.
///
/// Refresh tokens are hashed before they reach a session store, so a leaked
/// store does not yield usable tokens.
pub fn hash_token(token: &str) -> String {
	use sha2::{Digest, Sha256};
	let mut hasher = Sha256::new();
	hasher.update(token.as_bytes());
	hex::encode(hasher.finalize())
}
