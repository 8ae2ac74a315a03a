// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication configuration: signing keys, token lifetimes, cookies and
//! the session-binding mode.

use std::fmt;
use std::str::FromStr;

use aidhub_common_config::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const MIN_SECRET_LEN: usize = 32;

pub const DEFAULT_ACCESS_COOKIE: &str = "aidhub_access";
pub const DEFAULT_REFRESH_COOKIE: &str = "aidhub_refresh";
pub const DEFAULT_SESSION_COOKIE: &str = "aidhub_session";

/// How a fingerprint mismatch affects an authentication check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBindingMode {
	/// Mismatches are logged, the status is unaffected.
	#[default]
	Inert,
	/// Mismatches reject the request.
	Strict,
}

impl FromStr for SessionBindingMode {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"inert" => Ok(Self::Inert),
			"strict" => Ok(Self::Strict),
			other => Err(ConfigError::InvalidValue {
				key: "auth.session_binding".to_string(),
				message: format!("expected 'inert' or 'strict', got '{other}'"),
			}),
		}
	}
}

impl fmt::Display for SessionBindingMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Inert => f.write_str("inert"),
			Self::Strict => f.write_str("strict"),
		}
	}
}

/// Cookie names used by the reference transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNames {
	pub access: String,
	pub refresh: String,
	pub session: String,
	pub secure: bool,
}

impl Default for CookieNames {
	fn default() -> Self {
		Self {
			access: DEFAULT_ACCESS_COOKIE.to_string(),
			refresh: DEFAULT_REFRESH_COOKIE.to_string(),
			session: DEFAULT_SESSION_COOKIE.to_string(),
			secure: true,
		}
	}
}

/// Authentication configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct AuthConfig {
	pub access_token_secret: SecretString,
	pub refresh_token_secret: SecretString,
	pub access_token_ttl_secs: u64,
	pub refresh_token_ttl_secs: u64,
	pub session_binding: SessionBindingMode,
	pub cookies: CookieNames,
}

impl AuthConfig {
	/// Check the cross-field rules on keys and lifetimes.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.access_token_secret.len() < MIN_SECRET_LEN {
			return Err(ConfigError::Validation(format!(
				"access token secret must be at least {MIN_SECRET_LEN} bytes"
			)));
		}
		if self.refresh_token_secret.len() < MIN_SECRET_LEN {
			return Err(ConfigError::Validation(format!(
				"refresh token secret must be at least {MIN_SECRET_LEN} bytes"
			)));
		}
		if self.access_token_secret == self.refresh_token_secret {
			return Err(ConfigError::Validation(
				"access and refresh token secrets must differ".to_string(),
			));
		}
		if self.access_token_ttl_secs == 0 {
			return Err(ConfigError::Validation(
				"access token TTL must be positive".to_string(),
			));
		}
		if self.access_token_ttl_secs >= self.refresh_token_ttl_secs {
			return Err(ConfigError::Validation(format!(
				"access token TTL ({}s) must be shorter than refresh token TTL ({}s)",
				self.access_token_ttl_secs, self.refresh_token_ttl_secs
			)));
		}
		Ok(())
	}
}

/// Authentication configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub access_token_secret: Option<SecretString>,
	#[serde(default)]
	pub refresh_token_secret: Option<SecretString>,
	#[serde(default)]
	pub access_token_ttl_secs: Option<u64>,
	#[serde(default)]
	pub refresh_token_ttl_secs: Option<u64>,
	#[serde(default)]
	pub session_binding: Option<SessionBindingMode>,
	#[serde(default)]
	pub access_cookie: Option<String>,
	#[serde(default)]
	pub refresh_cookie: Option<String>,
	#[serde(default)]
	pub session_cookie: Option<String>,
	#[serde(default)]
	pub secure_cookies: Option<bool>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.access_token_secret.is_some() {
			self.access_token_secret = other.access_token_secret;
		}
		if other.refresh_token_secret.is_some() {
			self.refresh_token_secret = other.refresh_token_secret;
		}
		if other.access_token_ttl_secs.is_some() {
			self.access_token_ttl_secs = other.access_token_ttl_secs;
		}
		if other.refresh_token_ttl_secs.is_some() {
			self.refresh_token_ttl_secs = other.refresh_token_ttl_secs;
		}
		if other.session_binding.is_some() {
			self.session_binding = other.session_binding;
		}
		if other.access_cookie.is_some() {
			self.access_cookie = other.access_cookie;
		}
		if other.refresh_cookie.is_some() {
			self.refresh_cookie = other.refresh_cookie;
		}
		if other.session_cookie.is_some() {
			self.session_cookie = other.session_cookie;
		}
		if other.secure_cookies.is_some() {
			self.secure_cookies = other.secure_cookies;
		}
	}

	/// Resolve the layer. Both signing keys are mandatory.
	pub fn finalize(self) -> Result<AuthConfig, ConfigError> {
		let access_token_secret = self.access_token_secret.ok_or_else(|| {
			ConfigError::MissingSecret("AIDHUB_SERVER_ACCESS_TOKEN_SECRET".to_string())
		})?;
		let refresh_token_secret = self.refresh_token_secret.ok_or_else(|| {
			ConfigError::MissingSecret("AIDHUB_SERVER_REFRESH_TOKEN_SECRET".to_string())
		})?;

		let defaults = CookieNames::default();
		Ok(AuthConfig {
			access_token_secret,
			refresh_token_secret,
			access_token_ttl_secs: self
				.access_token_ttl_secs
				.unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECS),
			refresh_token_ttl_secs: self
				.refresh_token_ttl_secs
				.unwrap_or(DEFAULT_REFRESH_TOKEN_TTL_SECS),
			session_binding: self.session_binding.unwrap_or_default(),
			cookies: CookieNames {
				access: self.access_cookie.unwrap_or(defaults.access),
				refresh: self.refresh_cookie.unwrap_or(defaults.refresh),
				session: self.session_cookie.unwrap_or(defaults.session),
				secure: self.secure_cookies.unwrap_or(defaults.secure),
			},
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use aidhub_common_config::Secret;

	fn secrets() -> AuthConfigLayer {
		AuthConfigLayer {
			access_token_secret: Some(Secret::new("a".repeat(32))),
			refresh_token_secret: Some(Secret::new("r".repeat(32))),
			..Default::default()
		}
	}

	#[test]
	fn defaults_apply() {
		let config = secrets().finalize().unwrap();
		assert_eq!(config.access_token_ttl_secs, 900);
		assert_eq!(config.refresh_token_ttl_secs, 604_800);
		assert_eq!(config.session_binding, SessionBindingMode::Inert);
		assert_eq!(config.cookies, CookieNames::default());
		config.validate().unwrap();
	}

	#[test]
	fn missing_secret_is_an_error() {
		let layer = AuthConfigLayer {
			refresh_token_secret: None,
			..secrets()
		};
		assert!(matches!(
			layer.finalize(),
			Err(ConfigError::MissingSecret(var)) if var == "AIDHUB_SERVER_REFRESH_TOKEN_SECRET"
		));
	}

	#[test]
	fn short_secret_fails_validation() {
		let layer = AuthConfigLayer {
			access_token_secret: Some(Secret::new("short".to_string())),
			..secrets()
		};
		assert!(layer.finalize().unwrap().validate().is_err());
	}

	#[test]
	fn identical_secrets_fail_validation() {
		let layer = AuthConfigLayer {
			refresh_token_secret: Some(Secret::new("a".repeat(32))),
			..secrets()
		};
		let err = layer.finalize().unwrap().validate().unwrap_err();
		assert!(err.to_string().contains("must differ"));
	}

	#[test]
	fn access_ttl_must_be_shorter() {
		let layer = AuthConfigLayer {
			access_token_ttl_secs: Some(3600),
			refresh_token_ttl_secs: Some(3600),
			..secrets()
		};
		assert!(layer.finalize().unwrap().validate().is_err());
	}

	#[test]
	fn merge_overwrites_only_present_fields() {
		let mut base = secrets();
		base.access_token_ttl_secs = Some(60);
		base.merge(AuthConfigLayer {
			session_binding: Some(SessionBindingMode::Strict),
			access_cookie: Some("at".to_string()),
			..Default::default()
		});

		let config = base.finalize().unwrap();
		assert_eq!(config.access_token_ttl_secs, 60);
		assert_eq!(config.session_binding, SessionBindingMode::Strict);
		assert_eq!(config.cookies.access, "at");
		assert_eq!(config.cookies.refresh, DEFAULT_REFRESH_COOKIE);
	}

	#[test]
	fn binding_mode_parses_case_insensitively() {
		assert_eq!(
			"STRICT".parse::<SessionBindingMode>().unwrap(),
			SessionBindingMode::Strict
		);
		assert_eq!(
			" inert ".parse::<SessionBindingMode>().unwrap(),
			SessionBindingMode::Inert
		);
		assert!("paranoid".parse::<SessionBindingMode>().is_err());
	}

	#[test]
	fn deserializes_from_toml() {
		let layer: AuthConfigLayer = toml::from_str(
			r#"
access_token_ttl_secs = 300
session_binding = "strict"
secure_cookies = false
"#,
		)
		.unwrap();
		assert_eq!(layer.access_token_ttl_secs, Some(300));
		assert_eq!(layer.session_binding, Some(SessionBindingMode::Strict));
		assert_eq!(layer.secure_cookies, Some(false));
		assert!(layer.access_token_secret.is_none());
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let config = secrets().finalize().unwrap();
		let debug = format!("{config:?}");
		assert!(!debug.contains(&"a".repeat(32)));
		assert!(debug.contains("[REDACTED]"));
	}
}
