// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Refresh session repository.
//!
//! Each row holds the hash of the one live refresh token for a device.
//! Rotation is a conditional `UPDATE ... WHERE token_hash = ?`, so two
//! concurrent exchanges of the same token cannot both succeed.

use aidhub_server_auth::{SessionKey, SessionKv, SessionRecord, SessionStoreError, UserId};
use aidhub_server_fingerprint::Fingerprint;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;

/// Fixed-width timestamps so that text comparison orders them correctly.
fn format_timestamp(at: DateTime<Utc>) -> String {
	at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Repository for refresh session rows.
#[derive(Clone)]
pub struct SqliteSessionKv {
	pool: SqlitePool,
}

impl std::fmt::Debug for SqliteSessionKv {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SqliteSessionKv").finish_non_exhaustive()
	}
}

impl SqliteSessionKv {
	/// Create a new repository with the given pool.
	///
	/// # Arguments
	/// * `pool` - SQLite connection pool, already migrated
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self), fields(user_id = %key.identity_id))]
	pub async fn get_session(&self, key: &SessionKey) -> Result<Option<SessionRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT identity_id, session_id, token_hash, fingerprint, created_at
			FROM refresh_sessions
			WHERE identity_id = ? AND session_id = ?
			"#,
		)
		.bind(key.identity_id.to_string())
		.bind(&key.session_id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|row| parse_session_row(&row)).transpose()
	}

	/// Insert or replace a session.
	///
	/// # Database Constraints
	/// - `(identity_id, session_id)` is the primary key
	#[tracing::instrument(skip(self, record), fields(user_id = %record.identity_id))]
	pub async fn upsert_session(&self, record: &SessionRecord) -> Result<(), DbError> {
		let fingerprint = record
			.fingerprint
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		sqlx::query(
			r#"
			INSERT INTO refresh_sessions (
				identity_id, session_id, token_hash, fingerprint, created_at
			) VALUES (?, ?, ?, ?, ?)
			ON CONFLICT(identity_id, session_id) DO UPDATE SET
				token_hash = excluded.token_hash,
				fingerprint = excluded.fingerprint,
				created_at = excluded.created_at
			"#,
		)
		.bind(record.identity_id.to_string())
		.bind(&record.session_id)
		.bind(&record.refresh_token_hash)
		.bind(fingerprint)
		.bind(format_timestamp(record.created_at))
		.execute(&self.pool)
		.await?;

		tracing::debug!("refresh session upserted");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(user_id = %key.identity_id))]
	pub async fn delete_session(&self, key: &SessionKey) -> Result<bool, DbError> {
		let result =
			sqlx::query("DELETE FROM refresh_sessions WHERE identity_id = ? AND session_id = ?")
				.bind(key.identity_id.to_string())
				.bind(&key.session_id)
				.execute(&self.pool)
				.await?;

		Ok(result.rows_affected() > 0)
	}

	/// Overwrite the session only if its stored hash is still `expected_hash`.
	///
	/// # Returns
	/// `false` when the row is gone or holds a different hash.
	#[tracing::instrument(skip(self, expected_hash, record), fields(user_id = %key.identity_id))]
	pub async fn replace_session_if(
		&self,
		key: &SessionKey,
		expected_hash: &str,
		record: &SessionRecord,
	) -> Result<bool, DbError> {
		let fingerprint = record
			.fingerprint
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		let result = sqlx::query(
			r#"
			UPDATE refresh_sessions
			SET token_hash = ?, fingerprint = ?, created_at = ?
			WHERE identity_id = ? AND session_id = ? AND token_hash = ?
			"#,
		)
		.bind(&record.refresh_token_hash)
		.bind(fingerprint)
		.bind(format_timestamp(record.created_at))
		.bind(key.identity_id.to_string())
		.bind(&key.session_id)
		.bind(expected_hash)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() == 1)
	}

	#[tracing::instrument(skip(self), fields(user_id = %identity_id))]
	pub async fn delete_sessions_for_identity(&self, identity_id: UserId) -> Result<u64, DbError> {
		let result = sqlx::query("DELETE FROM refresh_sessions WHERE identity_id = ?")
			.bind(identity_id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected())
	}

	/// # Returns
	/// Sessions ordered by creation time, oldest first.
	#[tracing::instrument(skip(self), fields(user_id = %identity_id))]
	pub async fn list_sessions_for_identity(
		&self,
		identity_id: UserId,
	) -> Result<Vec<SessionRecord>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT identity_id, session_id, token_hash, fingerprint, created_at
			FROM refresh_sessions
			WHERE identity_id = ?
			ORDER BY created_at ASC
			"#,
		)
		.bind(identity_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(parse_session_row).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_sessions_created_before(
		&self,
		cutoff: DateTime<Utc>,
	) -> Result<u64, DbError> {
		let result = sqlx::query("DELETE FROM refresh_sessions WHERE created_at < ?")
			.bind(format_timestamp(cutoff))
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected())
	}
}

#[async_trait]
impl SessionKv for SqliteSessionKv {
	async fn get(&self, key: &SessionKey) -> Result<Option<SessionRecord>, SessionStoreError> {
		Ok(self.get_session(key).await?)
	}

	async fn set(&self, record: SessionRecord) -> Result<(), SessionStoreError> {
		Ok(self.upsert_session(&record).await?)
	}

	async fn delete(&self, key: &SessionKey) -> Result<bool, SessionStoreError> {
		Ok(self.delete_session(key).await?)
	}

	async fn replace_if(
		&self,
		key: &SessionKey,
		expected_hash: &str,
		record: SessionRecord,
	) -> Result<bool, SessionStoreError> {
		Ok(self.replace_session_if(key, expected_hash, &record).await?)
	}

	async fn delete_identity(&self, identity_id: UserId) -> Result<u64, SessionStoreError> {
		Ok(self.delete_sessions_for_identity(identity_id).await?)
	}

	async fn list_identity(
		&self,
		identity_id: UserId,
	) -> Result<Vec<SessionRecord>, SessionStoreError> {
		Ok(self.list_sessions_for_identity(identity_id).await?)
	}

	async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionStoreError> {
		Ok(self.delete_sessions_created_before(cutoff).await?)
	}
}

fn parse_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, DbError> {
	let identity_id_str: String = row.try_get("identity_id")?;
	let session_id: String = row.try_get("session_id")?;
	let refresh_token_hash: String = row.try_get("token_hash")?;
	let fingerprint_json: Option<String> = row.try_get("fingerprint")?;
	let created_at_str: String = row.try_get("created_at")?;

	let identity_id = Uuid::parse_str(&identity_id_str)
		.map_err(|e| DbError::Internal(format!("Invalid identity_id UUID: {e}")))?;

	let fingerprint = fingerprint_json
		.map(|json| serde_json::from_str::<Fingerprint>(&json))
		.transpose()?;

	let created_at = DateTime::parse_from_rfc3339(&created_at_str)
		.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
		.with_timezone(&Utc);

	Ok(SessionRecord {
		identity_id: UserId::new(identity_id),
		session_id,
		refresh_token_hash,
		fingerprint,
		created_at,
	})
}
