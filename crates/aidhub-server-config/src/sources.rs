// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use aidhub_common_config::load_secret_env;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuthConfigLayer, GeoIpConfigLayer, LoggingConfigLayer, SessionBindingMode,
	SessionStoreConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/aidhub/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: AIDHUB_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			auth: Some(load_auth_from_env()?),
			session_store: Some(load_session_store_from_env()?),
			geoip: Some(load_geoip_from_env()),
			logging: Some(load_logging_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_binding_mode(name: &str) -> Result<Option<SessionBindingMode>, ConfigError> {
	env_var(name).map(|v| v.parse()).transpose()
}

fn load_auth_from_env() -> Result<AuthConfigLayer, ConfigError> {
	Ok(AuthConfigLayer {
		access_token_secret: load_secret_env("AIDHUB_SERVER_ACCESS_TOKEN_SECRET")?,
		refresh_token_secret: load_secret_env("AIDHUB_SERVER_REFRESH_TOKEN_SECRET")?,
		access_token_ttl_secs: env_u64("AIDHUB_SERVER_ACCESS_TOKEN_TTL_SECS")?,
		refresh_token_ttl_secs: env_u64("AIDHUB_SERVER_REFRESH_TOKEN_TTL_SECS")?,
		session_binding: env_binding_mode("AIDHUB_SERVER_AUTH_SESSION_BINDING")?,
		access_cookie: env_var("AIDHUB_SERVER_AUTH_ACCESS_COOKIE"),
		refresh_cookie: env_var("AIDHUB_SERVER_AUTH_REFRESH_COOKIE"),
		session_cookie: env_var("AIDHUB_SERVER_AUTH_SESSION_COOKIE"),
		secure_cookies: env_bool("AIDHUB_SERVER_AUTH_SECURE_COOKIES"),
	})
}

fn load_session_store_from_env() -> Result<SessionStoreConfigLayer, ConfigError> {
	Ok(SessionStoreConfigLayer {
		url: env_var("AIDHUB_SERVER_SESSION_STORE_URL"),
		purge_interval_secs: env_u64("AIDHUB_SERVER_SESSION_PURGE_INTERVAL_SECS")?,
	})
}

fn load_geoip_from_env() -> GeoIpConfigLayer {
	GeoIpConfigLayer {
		asn_database_path: env_var("AIDHUB_SERVER_GEOIP_ASN_DATABASE_PATH"),
	}
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("AIDHUB_SERVER_LOG_LEVEL"),
		json: env_bool("AIDHUB_SERVER_LOG_JSON"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.auth.is_none());
		assert!(layer.logging.is_none());
	}

	#[test]
	fn toml_source_missing_file_returns_empty() {
		let layer = TomlSource::new("/nonexistent/aidhub.toml").load().unwrap();
		assert!(layer.auth.is_none());
	}

	#[test]
	fn toml_source_reads_sections() {
		let mut file = NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
[auth]
session_binding = "strict"
refresh_token_ttl_secs = 86400

[session_store]
url = "sqlite:/tmp/sessions.db"

[logging]
json = true
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		let auth = layer.auth.unwrap();
		assert_eq!(auth.session_binding, Some(SessionBindingMode::Strict));
		assert_eq!(auth.refresh_token_ttl_secs, Some(86400));
		assert_eq!(
			layer.session_store.unwrap().url.as_deref(),
			Some("sqlite:/tmp/sessions.db")
		);
		assert_eq!(layer.logging.unwrap().json, Some(true));
	}

	#[test]
	fn toml_source_reports_parse_errors() {
		let mut file = NamedTempFile::new().unwrap();
		write!(file, "[auth\nbroken").unwrap();

		assert!(matches!(
			TomlSource::new(file.path()).load(),
			Err(ConfigError::TomlParse { .. })
		));
	}

	#[test]
	fn env_u64_rejects_garbage() {
		let var = "AIDHUB_TEST_CONFIG_U64_GARBAGE";
		std::env::set_var(var, "soon");
		assert!(matches!(
			env_u64(var),
			Err(ConfigError::InvalidValue { key, .. }) if key == var
		));
		std::env::remove_var(var);
	}

	#[test]
	fn env_binding_mode_parses() {
		let var = "AIDHUB_TEST_CONFIG_BINDING_MODE";
		std::env::set_var(var, "strict");
		assert_eq!(
			env_binding_mode(var).unwrap(),
			Some(SessionBindingMode::Strict)
		);
		std::env::remove_var(var);
		assert_eq!(env_binding_mode(var).unwrap(), None);
	}

	#[test]
	fn empty_env_values_are_ignored() {
		let var = "AIDHUB_TEST_CONFIG_EMPTY";
		std::env::set_var(var, "");
		assert!(env_var(var).is_none());
		std::env::remove_var(var);
	}
}
