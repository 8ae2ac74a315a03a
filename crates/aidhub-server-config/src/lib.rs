// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration for the AidHub identity and authorization core.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Validation of token signing keys and lifetimes
//! - Consistent environment variable naming (`AIDHUB_SERVER_*`)
//! - Tracing subscriber installation from the `logging` section
//!
//! # Usage
//!
//! ```ignore
//! use aidhub_server_config::{init_tracing, load_config};
//!
//! let config = load_config()?;
//! init_tracing(&config.logging)?;
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;
pub mod telemetry;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};
pub use telemetry::init_tracing;

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub auth: AuthConfig,
	pub session_store: SessionStoreConfig,
	pub geoip: Option<GeoIpConfig>,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`AIDHUB_SERVER_*`)
/// 2. Config file (`/etc/aidhub/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize a merged layer into validated configuration.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let auth = layer.auth.unwrap_or_default().finalize()?;
	let session_store = layer.session_store.unwrap_or_default().finalize()?;
	let geoip = layer.geoip.and_then(|l| l.finalize());
	let logging = layer.logging.unwrap_or_default().finalize();

	auth.validate()?;

	info!(
		access_token_ttl_secs = auth.access_token_ttl_secs,
		refresh_token_ttl_secs = auth.refresh_token_ttl_secs,
		session_binding = %auth.session_binding,
		session_store = ?session_store.backend,
		geoip_configured = geoip.is_some(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		auth,
		session_store,
		geoip,
		logging,
	})
}
