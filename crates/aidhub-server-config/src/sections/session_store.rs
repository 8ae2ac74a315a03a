// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session store backend selection.

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 3600;

/// Where refresh-session records live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionStoreBackend {
	/// Process-local map. Sessions do not survive a restart.
	#[default]
	Memory,
	/// Shared SQLite database, e.g. `sqlite:/var/lib/aidhub/sessions.db`.
	Sqlite { url: String },
}

impl SessionStoreBackend {
	pub fn parse(url: &str) -> Result<Self, ConfigError> {
		let url = url.trim();
		if url.eq_ignore_ascii_case("memory") {
			return Ok(Self::Memory);
		}
		if url.starts_with("sqlite:") {
			return Ok(Self::Sqlite {
				url: url.to_string(),
			});
		}
		Err(ConfigError::InvalidValue {
			key: "session_store.url".to_string(),
			message: format!("expected 'memory' or a 'sqlite:' URL, got '{url}'"),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStoreConfig {
	pub backend: SessionStoreBackend,
	pub purge_interval_secs: u64,
}

impl Default for SessionStoreConfig {
	fn default() -> Self {
		Self {
			backend: SessionStoreBackend::Memory,
			purge_interval_secs: DEFAULT_PURGE_INTERVAL_SECS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SessionStoreConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub purge_interval_secs: Option<u64>,
}

impl SessionStoreConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.purge_interval_secs.is_some() {
			self.purge_interval_secs = other.purge_interval_secs;
		}
	}

	pub fn finalize(self) -> Result<SessionStoreConfig, ConfigError> {
		let backend = match self.url {
			Some(url) => SessionStoreBackend::parse(&url)?,
			None => SessionStoreBackend::Memory,
		};
		Ok(SessionStoreConfig {
			backend,
			purge_interval_secs: self
				.purge_interval_secs
				.unwrap_or(DEFAULT_PURGE_INTERVAL_SECS),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_to_memory() {
		let config = SessionStoreConfigLayer::default().finalize().unwrap();
		assert_eq!(config, SessionStoreConfig::default());
	}

	#[test]
	fn parses_sqlite_url() {
		let layer = SessionStoreConfigLayer {
			url: Some("sqlite:/var/lib/aidhub/sessions.db".to_string()),
			purge_interval_secs: Some(60),
		};
		let config = layer.finalize().unwrap();
		assert_eq!(
			config.backend,
			SessionStoreBackend::Sqlite {
				url: "sqlite:/var/lib/aidhub/sessions.db".to_string()
			}
		);
		assert_eq!(config.purge_interval_secs, 60);
	}

	#[test]
	fn rejects_unknown_backend() {
		let layer = SessionStoreConfigLayer {
			url: Some("redis://localhost".to_string()),
			..Default::default()
		};
		assert!(matches!(
			layer.finalize(),
			Err(ConfigError::InvalidValue { .. })
		));
	}

	#[test]
	fn merge_prefers_overlay() {
		let mut base = SessionStoreConfigLayer {
			url: Some("memory".to_string()),
			purge_interval_secs: Some(10),
		};
		base.merge(SessionStoreConfigLayer {
			url: Some("sqlite::memory:".to_string()),
			purge_interval_secs: None,
		});
		assert_eq!(base.url.as_deref(), Some("sqlite::memory:"));
		assert_eq!(base.purge_interval_secs, Some(10));
	}
}
