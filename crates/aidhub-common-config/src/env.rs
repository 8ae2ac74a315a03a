// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret loading from the environment.
//!
//! Signing keys may be given inline (`VAR=value`) or mounted as a file
//! (`VAR_FILE=/run/secrets/...`). The file form wins when both are set.

use std::path::PathBuf;
use std::{env, fs};

use thiserror::Error;
use tracing::debug;

use crate::secret::Secret;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },

	#[error("required secret not found: set either {var} or {var}_FILE")]
	Missing { var: String },
}

/// Load `var` from the environment, preferring `{var}_FILE`.
///
/// A single trailing newline in a secret file is dropped.
pub fn load_secret_env(var: &str) -> Result<Option<Secret<String>>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(path_str);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;
		debug!(var, path = %path.display(), "loaded secret from file");

		let value = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(Secret::new(value)));
	}

	Ok(env::var(var).ok().map(Secret::new))
}

/// Like [`load_secret_env`] but absence is an error.
pub fn require_secret_env(var: &str) -> Result<Secret<String>, SecretEnvError> {
	load_secret_env(var)?.ok_or_else(|| SecretEnvError::Missing {
		var: var.to_string(),
	})
}
