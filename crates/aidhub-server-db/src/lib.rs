// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for AidHub.
//!
//! Holds the SQLite-backed refresh session store and the selection between
//! it and the in-process store based on [`SessionStoreConfig`].

pub mod error;
pub mod pool;
pub mod session;

use std::sync::Arc;

use aidhub_server_auth::{InMemorySessionKv, SessionKv};
use aidhub_server_config::{SessionStoreBackend, SessionStoreConfig};

pub use error::{DbError, Result};
pub use pool::{create_pool, run_migrations};
pub use session::SqliteSessionKv;

/// Build the session storage named by the configuration.
///
/// SQLite databases are created if missing and migrated before use.
#[tracing::instrument(skip(config))]
pub async fn session_kv_from_config(config: &SessionStoreConfig) -> Result<Arc<dyn SessionKv>> {
	match &config.backend {
		SessionStoreBackend::Memory => {
			tracing::info!("using in-memory refresh session store");
			Ok(Arc::new(InMemorySessionKv::new()))
		}
		SessionStoreBackend::Sqlite { url } => {
			let pool = create_pool(url).await?;
			run_migrations(&pool).await?;
			tracing::info!("using sqlite refresh session store");
			Ok(Arc::new(SqliteSessionKv::new(pool)))
		}
	}
}
