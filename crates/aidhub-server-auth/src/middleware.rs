// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cookie transport for the three credentials.
//!
//! The reference deployment carries the access token, refresh token and
//! session id in three HttpOnly cookies. This module reads them from request
//! headers and builds the `Set-Cookie` values for issuing and clearing them.
//!
//! ```text
//! Request → extract_credentials → AuthService::check → AuthStatus
//!                                                        │
//!                                  FORBIDDEN ────────────┴── clear_cookies()
//! ```
//!
//! Token values are wrapped in [`SecretString`] as soon as they are read.

use std::net::IpAddr;
use std::time::Duration;

use aidhub_common_config::{Secret, SecretString};
use aidhub_server_config::CookieNames;
use http::header::{COOKIE, USER_AGENT};
use http::{HeaderMap, HeaderValue};
use tracing::instrument;

use crate::error::AuthError;
use crate::token::TokenPair;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// The three opaque credentials of a request.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
	pub access_token: Option<SecretString>,
	pub refresh_token: Option<SecretString>,
	pub session_id: Option<String>,
}

impl Credentials {
	pub fn new(
		access_token: Option<&str>,
		refresh_token: Option<&str>,
		session_id: Option<&str>,
	) -> Self {
		Self {
			access_token: access_token.map(|t| Secret::new(t.to_string())),
			refresh_token: refresh_token.map(|t| Secret::new(t.to_string())),
			session_id: session_id.map(str::to_string),
		}
	}
}

/// Where a request came from, for fingerprinting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
	pub ip: Option<String>,
	pub user_agent: Option<String>,
}

impl ClientInfo {
	pub fn new(ip: Option<&str>, user_agent: Option<&str>) -> Self {
		Self {
			ip: ip.map(str::to_string),
			user_agent: user_agent.map(str::to_string),
		}
	}
}

/// Read a cookie value by name from the Cookie header.
pub fn extract_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|value| value.split(';'))
		.find_map(|cookie| {
			let (name, value) = cookie.trim().split_once('=')?;
			(name == cookie_name && !value.is_empty()).then(|| value.to_string())
		})
}

/// Read credentials using the default cookie names.
pub fn extract_credentials(headers: &HeaderMap) -> Credentials {
	extract_credentials_with_names(headers, &CookieNames::default())
}

#[instrument(level = "trace", skip_all)]
pub fn extract_credentials_with_names(headers: &HeaderMap, names: &CookieNames) -> Credentials {
	Credentials {
		access_token: extract_cookie(headers, &names.access).map(Secret::new),
		refresh_token: extract_cookie(headers, &names.refresh).map(Secret::new),
		session_id: extract_cookie(headers, &names.session),
	}
}

/// Client address and user agent. The first `X-Forwarded-For` hop wins over
/// the socket peer.
pub fn extract_client_info(headers: &HeaderMap, peer: Option<IpAddr>) -> ClientInfo {
	let forwarded = headers
		.get(FORWARDED_FOR)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.split(',').next())
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(str::to_string);

	ClientInfo {
		ip: forwarded.or_else(|| peer.map(|ip| ip.to_string())),
		user_agent: headers
			.get(USER_AGENT)
			.and_then(|v| v.to_str().ok())
			.map(str::to_string),
	}
}

fn cookie(name: &str, value: &str, max_age: u64, secure: bool) -> Result<HeaderValue, AuthError> {
	let secure = if secure { "; Secure" } else { "" };
	let raw = format!("{name}={value}; Path=/; HttpOnly{secure}; SameSite=Lax; Max-Age={max_age}");
	HeaderValue::from_str(&raw).map_err(|e| AuthError::InvalidHeader(e.to_string()))
}

/// `Set-Cookie` values for a freshly issued pair.
///
/// The access cookie lives as long as the refresh cookie so that an expired
/// access token still reaches the server and yields EXPIRED rather than
/// UNAUTHENTICATED.
pub fn issue_cookies(
	pair: &TokenPair,
	session_id: &str,
	names: &CookieNames,
	refresh_ttl: Duration,
) -> Result<Vec<HeaderValue>, AuthError> {
	let max_age = refresh_ttl.as_secs();
	Ok(vec![
		cookie(&names.access, &pair.access_token, max_age, names.secure)?,
		cookie(&names.refresh, &pair.refresh_token, max_age, names.secure)?,
		cookie(&names.session, session_id, max_age, names.secure)?,
	])
}

/// `Set-Cookie` values that remove all three credentials.
pub fn clear_cookies(names: &CookieNames) -> Result<Vec<HeaderValue>, AuthError> {
	Ok(vec![
		cookie(&names.access, "", 0, names.secure)?,
		cookie(&names.refresh, "", 0, names.secure)?,
		cookie(&names.session, "", 0, names.secure)?,
	])
}

#[cfg(test)]
mod tests {
	use super::*;

	fn headers_with_cookie(cookie: &str) -> HeaderMap {
		let mut headers = HeaderMap::new();
		headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
		headers
	}

	mod extraction {
		use super::*;

		#[test]
		fn reads_all_three_credentials() {
			let headers = headers_with_cookie(
				"theme=dark; aidhub_access=at.jwt; aidhub_refresh=rt.jwt; aidhub_session=abc123",
			);
			let creds = extract_credentials(&headers);

			assert_eq!(creds.access_token.unwrap().expose(), "at.jwt");
			assert_eq!(creds.refresh_token.unwrap().expose(), "rt.jwt");
			assert_eq!(creds.session_id.as_deref(), Some("abc123"));
		}

		#[test]
		fn missing_and_empty_cookies_are_none() {
			let creds = extract_credentials(&headers_with_cookie("aidhub_access=; other=1"));
			assert!(creds.access_token.is_none());
			assert!(creds.refresh_token.is_none());
			assert!(creds.session_id.is_none());

			assert!(extract_credentials(&HeaderMap::new()).access_token.is_none());
		}

		#[test]
		fn custom_names_are_honoured() {
			let names = CookieNames {
				access: "at".to_string(),
				..CookieNames::default()
			};
			let headers = headers_with_cookie("at=x; aidhub_access=y");
			let creds = extract_credentials_with_names(&headers, &names);
			assert_eq!(creds.access_token.unwrap().expose(), "x");
		}

		#[test]
		fn cookies_split_over_several_headers() {
			let mut headers = HeaderMap::new();
			headers.append(COOKIE, HeaderValue::from_static("aidhub_access=a"));
			headers.append(COOKIE, HeaderValue::from_static("aidhub_session=s"));
			let creds = extract_credentials(&headers);
			assert!(creds.access_token.is_some());
			assert_eq!(creds.session_id.as_deref(), Some("s"));
		}

		#[test]
		fn debug_redacts_tokens() {
			let creds = Credentials::new(Some("secret-at"), Some("secret-rt"), Some("sid"));
			let debug = format!("{creds:?}");
			assert!(!debug.contains("secret-at"));
			assert!(!debug.contains("secret-rt"));
		}
	}

	mod client_info {
		use super::*;

		#[test]
		fn forwarded_for_wins() {
			let mut headers = HeaderMap::new();
			headers.insert(FORWARDED_FOR, HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
			headers.insert(USER_AGENT, HeaderValue::from_static("curl/8.0"));

			let info = extract_client_info(&headers, Some("10.0.0.1".parse().unwrap()));
			assert_eq!(info.ip.as_deref(), Some("203.0.113.9"));
			assert_eq!(info.user_agent.as_deref(), Some("curl/8.0"));
		}

		#[test]
		fn falls_back_to_peer() {
			let info = extract_client_info(&HeaderMap::new(), Some("10.0.0.1".parse().unwrap()));
			assert_eq!(info.ip.as_deref(), Some("10.0.0.1"));
			assert!(info.user_agent.is_none());
		}
	}

	mod set_cookie {
		use super::*;

		#[test]
		fn issued_cookies_are_http_only_and_lax() {
			let pair = TokenPair {
				access_token: "at".to_string(),
				refresh_token: "rt".to_string(),
			};
			let cookies = issue_cookies(
				&pair,
				"sid",
				&CookieNames::default(),
				Duration::from_secs(604_800),
			)
			.unwrap();

			assert_eq!(cookies.len(), 3);
			let access = cookies[0].to_str().unwrap();
			assert!(access.starts_with("aidhub_access=at;"));
			assert!(access.contains("HttpOnly"));
			assert!(access.contains("Secure"));
			assert!(access.contains("SameSite=Lax"));
			assert!(access.contains("Max-Age=604800"));
			assert!(cookies[2].to_str().unwrap().starts_with("aidhub_session=sid;"));
		}

		#[test]
		fn insecure_cookies_omit_secure() {
			let names = CookieNames {
				secure: false,
				..CookieNames::default()
			};
			let cookies = clear_cookies(&names).unwrap();
			assert!(!cookies[0].to_str().unwrap().contains("Secure"));
		}

		#[test]
		fn cleared_cookies_expire_immediately() {
			let cookies = clear_cookies(&CookieNames::default()).unwrap();
			assert_eq!(cookies.len(), 3);
			for c in &cookies {
				assert!(c.to_str().unwrap().contains("Max-Age=0"));
			}
		}

		#[test]
		fn control_characters_are_rejected() {
			let pair = TokenPair {
				access_token: "bad\nvalue".to_string(),
				refresh_token: "rt".to_string(),
			};
			let result = issue_cookies(&pair, "sid", &CookieNames::default(), Duration::from_secs(1));
			assert!(matches!(result, Err(AuthError::InvalidHeader(_))));
		}
	}
}
