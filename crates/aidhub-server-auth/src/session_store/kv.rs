// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use aidhub_server_fingerprint::Fingerprint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::error::SessionStoreError;
use crate::types::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
	pub identity_id: UserId,
	pub session_id: String,
}

impl SessionKey {
	pub fn new(identity_id: UserId, session_id: impl Into<String>) -> Self {
		Self {
			identity_id,
			session_id: session_id.into(),
		}
	}
}

/// One live refresh token for one device.
///
/// `created_at` is when the current token was stored; rotation resets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
	pub identity_id: UserId,
	pub session_id: String,
	pub refresh_token_hash: String,
	pub fingerprint: Option<Fingerprint>,
	pub created_at: DateTime<Utc>,
}

impl SessionRecord {
	pub fn key(&self) -> SessionKey {
		SessionKey::new(self.identity_id, self.session_id.clone())
	}
}

/// Key-value storage for session records.
///
/// Every operation is atomic with respect to its key.
#[async_trait]
pub trait SessionKv: Send + Sync {
	async fn get(&self, key: &SessionKey) -> Result<Option<SessionRecord>, SessionStoreError>;

	/// Insert or replace the record at `record.key()`.
	async fn set(&self, record: SessionRecord) -> Result<(), SessionStoreError>;

	/// Returns whether a record was removed.
	async fn delete(&self, key: &SessionKey) -> Result<bool, SessionStoreError>;

	/// Replace the record at `key` only if it currently stores `expected_hash`.
	async fn replace_if(
		&self,
		key: &SessionKey,
		expected_hash: &str,
		record: SessionRecord,
	) -> Result<bool, SessionStoreError>;

	/// Remove every record of one identity, returning how many went.
	async fn delete_identity(&self, identity_id: UserId) -> Result<u64, SessionStoreError>;

	async fn list_identity(&self, identity_id: UserId)
		-> Result<Vec<SessionRecord>, SessionStoreError>;

	async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionStoreError>;
}

/// Process-local session storage.
///
/// Records live in a sharded map, so operations on different
/// (identity, session) keys do not contend. Each operation holds the shard
/// guard for its key only while it runs.
#[derive(Debug, Default)]
pub struct InMemorySessionKv {
	records: DashMap<SessionKey, SessionRecord>,
}

impl InMemorySessionKv {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}

#[async_trait]
impl SessionKv for InMemorySessionKv {
	async fn get(&self, key: &SessionKey) -> Result<Option<SessionRecord>, SessionStoreError> {
		Ok(self.records.get(key).map(|entry| entry.value().clone()))
	}

	async fn set(&self, record: SessionRecord) -> Result<(), SessionStoreError> {
		self.records.insert(record.key(), record);
		Ok(())
	}

	async fn delete(&self, key: &SessionKey) -> Result<bool, SessionStoreError> {
		Ok(self.records.remove(key).is_some())
	}

	async fn replace_if(
		&self,
		key: &SessionKey,
		expected_hash: &str,
		record: SessionRecord,
	) -> Result<bool, SessionStoreError> {
		match self.records.get_mut(key) {
			Some(mut current) if current.refresh_token_hash == expected_hash => {
				*current = record;
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	async fn delete_identity(&self, identity_id: UserId) -> Result<u64, SessionStoreError> {
		let mut removed = 0u64;
		self.records.retain(|key, _| {
			let keep = key.identity_id != identity_id;
			if !keep {
				removed += 1;
			}
			keep
		});
		Ok(removed)
	}

	async fn list_identity(
		&self,
		identity_id: UserId,
	) -> Result<Vec<SessionRecord>, SessionStoreError> {
		let mut sessions: Vec<_> = self
			.records
			.iter()
			.filter(|entry| entry.key().identity_id == identity_id)
			.map(|entry| entry.value().clone())
			.collect();
		sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
		Ok(sessions)
	}

	async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionStoreError> {
		let mut removed = 0u64;
		self.records.retain(|_, record| {
			let keep = record.created_at >= cutoff;
			if !keep {
				removed += 1;
			}
			keep
		});
		Ok(removed)
	}
}
