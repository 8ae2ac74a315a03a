// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use aidhub_server_fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::error::SessionStoreError;
use super::kv::{SessionKey, SessionKv, SessionRecord};
use crate::hash_token;
use crate::types::UserId;

/// A live session as shown on a device-management page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
	pub session_id: String,
	pub created_at: DateTime<Utc>,
	pub fingerprint: Option<Fingerprint>,
}

impl From<SessionRecord> for SessionSummary {
	fn from(record: SessionRecord) -> Self {
		Self {
			session_id: record.session_id,
			created_at: record.created_at,
			fingerprint: record.fingerprint,
		}
	}
}

/// Refresh-token bookkeeping over a [`SessionKv`].
#[derive(Clone)]
pub struct RefreshSessionStore {
	kv: Arc<dyn SessionKv>,
}

impl std::fmt::Debug for RefreshSessionStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RefreshSessionStore").finish_non_exhaustive()
	}
}

impl RefreshSessionStore {
	pub fn new(kv: Arc<dyn SessionKv>) -> Self {
		Self { kv }
	}

	/// Store `token` as the only live refresh token for this device.
	#[instrument(skip(self, token, fingerprint), fields(user_id = %identity_id))]
	pub async fn save(
		&self,
		identity_id: UserId,
		token: &str,
		session_id: &str,
		fingerprint: Option<Fingerprint>,
	) -> Result<(), SessionStoreError> {
		self.kv
			.set(SessionRecord {
				identity_id,
				session_id: session_id.to_string(),
				refresh_token_hash: hash_token(token),
				fingerprint,
				created_at: Utc::now(),
			})
			.await?;
		debug!("refresh session saved");
		Ok(())
	}

	/// True iff `token` is the refresh token currently stored for the device.
	#[instrument(level = "debug", skip(self, token), fields(user_id = %identity_id))]
	pub async fn is_valid(
		&self,
		identity_id: UserId,
		token: &str,
		session_id: &str,
	) -> Result<bool, SessionStoreError> {
		let key = SessionKey::new(identity_id, session_id);
		Ok(self
			.kv
			.get(&key)
			.await?
			.is_some_and(|record| record.refresh_token_hash == hash_token(token)))
	}

	/// Swap `old_token` for `new_token`. Returns false when the stored token is
	/// no longer `old_token`, i.e. it was already rotated or revoked.
	#[instrument(skip(self, old_token, new_token), fields(user_id = %identity_id))]
	pub async fn rotate(
		&self,
		identity_id: UserId,
		old_token: &str,
		new_token: &str,
		session_id: &str,
	) -> Result<bool, SessionStoreError> {
		let key = SessionKey::new(identity_id, session_id);
		let Some(current) = self.kv.get(&key).await? else {
			debug!("no session to rotate");
			return Ok(false);
		};

		let old_hash = hash_token(old_token);
		if current.refresh_token_hash != old_hash {
			warn!("refresh token reuse detected");
			return Ok(false);
		}

		let replacement = SessionRecord {
			refresh_token_hash: hash_token(new_token),
			created_at: Utc::now(),
			..current
		};
		let rotated = self.kv.replace_if(&key, &old_hash, replacement).await?;
		if !rotated {
			warn!("lost refresh rotation race");
		}
		Ok(rotated)
	}

	/// Revoke one session, or every session of the identity when
	/// `session_id` is `None`.
	#[instrument(skip(self), fields(user_id = %identity_id))]
	pub async fn revoke(
		&self,
		identity_id: UserId,
		session_id: Option<&str>,
	) -> Result<u64, SessionStoreError> {
		let revoked = match session_id {
			Some(session_id) => {
				u64::from(self.kv.delete(&SessionKey::new(identity_id, session_id)).await?)
			}
			None => self.kv.delete_identity(identity_id).await?,
		};
		info!(revoked, "refresh sessions revoked");
		Ok(revoked)
	}

	pub async fn sessions(
		&self,
		identity_id: UserId,
	) -> Result<Vec<SessionSummary>, SessionStoreError> {
		Ok(self
			.kv
			.list_identity(identity_id)
			.await?
			.into_iter()
			.map(SessionSummary::from)
			.collect())
	}

	/// Drop records whose tokens can no longer verify.
	#[instrument(skip(self))]
	pub async fn purge_expired(&self, refresh_ttl: Duration) -> Result<u64, SessionStoreError> {
		let ttl = chrono::Duration::from_std(refresh_ttl)
			.map_err(|e| SessionStoreError::Backend(format!("refresh TTL out of range: {e}")))?;
		let purged = self.kv.purge_created_before(Utc::now() - ttl).await?;
		if purged > 0 {
			info!(purged, "purged expired refresh sessions");
		}
		Ok(purged)
	}

	pub async fn fingerprint(
		&self,
		identity_id: UserId,
		session_id: &str,
	) -> Result<Option<Fingerprint>, SessionStoreError> {
		let key = SessionKey::new(identity_id, session_id);
		Ok(self.kv.get(&key).await?.and_then(|r| r.fingerprint))
	}

	/// Replace the stored fingerprint, provided `token` is still the live
	/// refresh token for the device.
	#[instrument(level = "debug", skip(self, token, fingerprint), fields(user_id = %identity_id))]
	pub async fn update_fingerprint(
		&self,
		identity_id: UserId,
		token: &str,
		session_id: &str,
		fingerprint: Fingerprint,
	) -> Result<bool, SessionStoreError> {
		let key = SessionKey::new(identity_id, session_id);
		let Some(current) = self.kv.get(&key).await? else {
			return Ok(false);
		};

		let hash = hash_token(token);
		if current.refresh_token_hash != hash {
			return Ok(false);
		}

		let updated = SessionRecord {
			fingerprint: Some(fingerprint),
			..current
		};
		self.kv.replace_if(&key, &hash, updated).await
	}

	/// Purge expired sessions every `interval` until the handle is aborted.
	pub fn spawn_purge_task(&self, refresh_ttl: Duration, interval: Duration) -> JoinHandle<()> {
		let store = self.clone();
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			loop {
				ticker.tick().await;
				if let Err(e) = store.purge_expired(refresh_ttl).await {
					warn!(error = %e, "session purge failed");
				}
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session_store::InMemorySessionKv;
	use aidhub_server_fingerprint::NoAsnLookup;
	use proptest::prelude::*;

	fn store() -> RefreshSessionStore {
		RefreshSessionStore::new(Arc::new(InMemorySessionKv::new()))
	}

	mod validity {
		use super::*;

		#[tokio::test]
		async fn saved_token_is_valid_and_others_are_not() {
			let store = store();
			let user = UserId::generate();
			store.save(user, "rt-1", "dev-a", None).await.unwrap();

			assert!(store.is_valid(user, "rt-1", "dev-a").await.unwrap());
			assert!(!store.is_valid(user, "rt-2", "dev-a").await.unwrap());
			assert!(!store.is_valid(user, "rt-1", "dev-b").await.unwrap());
			assert!(!store
				.is_valid(UserId::generate(), "rt-1", "dev-a")
				.await
				.unwrap());
		}

		#[tokio::test]
		async fn save_replaces_previous_token_for_device() {
			let store = store();
			let user = UserId::generate();
			store.save(user, "rt-1", "dev-a", None).await.unwrap();
			store.save(user, "rt-2", "dev-a", None).await.unwrap();

			assert!(!store.is_valid(user, "rt-1", "dev-a").await.unwrap());
			assert!(store.is_valid(user, "rt-2", "dev-a").await.unwrap());
			assert_eq!(store.sessions(user).await.unwrap().len(), 1);
		}
	}

	mod rotation {
		use super::*;

		#[tokio::test]
		async fn rotation_is_single_use() {
			let store = store();
			let user = UserId::generate();
			store.save(user, "old", "dev-a", None).await.unwrap();

			assert!(store.rotate(user, "old", "new", "dev-a").await.unwrap());
			assert!(!store.is_valid(user, "old", "dev-a").await.unwrap());
			assert!(store.is_valid(user, "new", "dev-a").await.unwrap());

			assert!(!store.rotate(user, "old", "newer", "dev-a").await.unwrap());
			assert!(store.is_valid(user, "new", "dev-a").await.unwrap());
		}

		#[tokio::test]
		async fn rotation_of_revoked_session_fails() {
			let store = store();
			let user = UserId::generate();
			store.save(user, "old", "dev-a", None).await.unwrap();
			store.revoke(user, Some("dev-a")).await.unwrap();

			assert!(!store.rotate(user, "old", "new", "dev-a").await.unwrap());
			assert!(!store.is_valid(user, "new", "dev-a").await.unwrap());
		}

		#[tokio::test]
		async fn rotation_keeps_fingerprint() {
			let store = store();
			let user = UserId::generate();
			let fp = Fingerprint::capture(Some("10.1.2.3"), Some("ua"), &NoAsnLookup);
			store.save(user, "old", "dev-a", Some(fp.clone())).await.unwrap();
			store.rotate(user, "old", "new", "dev-a").await.unwrap();

			assert_eq!(store.fingerprint(user, "dev-a").await.unwrap(), Some(fp));
		}

		#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
		async fn concurrent_rotations_have_one_winner() {
			let store = store();
			let user = UserId::generate();
			store.save(user, "old", "dev-a", None).await.unwrap();

			let attempts = (0..8).map(|i| {
				let store = store.clone();
				tokio::spawn(async move {
					store
						.rotate(user, "old", &format!("new-{i}"), "dev-a")
						.await
						.unwrap()
				})
			});
			let results = futures::future::join_all(attempts).await;
			let winners = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();
			assert_eq!(winners, 1);
		}
	}

	mod races {
		use super::*;

		#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
		async fn concurrent_saves_leave_one_record() {
			let kv = Arc::new(InMemorySessionKv::new());
			let store = RefreshSessionStore::new(kv.clone());
			let user = UserId::generate();
			let tokens: Vec<String> = (0..8).map(|i| format!("rt-{i}")).collect();

			let saves = tokens.iter().cloned().map(|token| {
				let store = store.clone();
				tokio::spawn(async move { store.save(user, &token, "dev-a", None).await.unwrap() })
			});
			for result in futures::future::join_all(saves).await {
				result.unwrap();
			}

			assert_eq!(store.sessions(user).await.unwrap().len(), 1);
			let stored = kv
				.get(&SessionKey::new(user, "dev-a"))
				.await
				.unwrap()
				.unwrap();
			assert!(tokens
				.iter()
				.any(|token| hash_token(token) == stored.refresh_token_hash));

			let mut valid = 0;
			for token in &tokens {
				if store.is_valid(user, token, "dev-a").await.unwrap() {
					valid += 1;
				}
			}
			assert_eq!(valid, 1);
		}

		#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
		async fn save_racing_revoke_leaves_at_most_one_record() {
			for round in 0..16 {
				let kv = Arc::new(InMemorySessionKv::new());
				let store = RefreshSessionStore::new(kv.clone());
				let user = UserId::generate();
				let token = format!("rt-{round}");

				let saver = {
					let store = store.clone();
					let token = token.clone();
					tokio::spawn(async move { store.save(user, &token, "dev-a", None).await })
				};
				let revoker = {
					let store = store.clone();
					tokio::spawn(async move {
						let session = (round % 2 == 0).then_some("dev-a");
						store.revoke(user, session).await
					})
				};
				saver.await.unwrap().unwrap();
				revoker.await.unwrap().unwrap();

				assert!(store.sessions(user).await.unwrap().len() <= 1);
				match kv.get(&SessionKey::new(user, "dev-a")).await.unwrap() {
					Some(record) => {
						assert_eq!(record.refresh_token_hash, hash_token(&token));
						assert!(store.is_valid(user, &token, "dev-a").await.unwrap());
					}
					None => assert!(!store.is_valid(user, &token, "dev-a").await.unwrap()),
				}
			}
		}
	}

	mod revocation {
		use super::*;

		#[tokio::test]
		async fn revoke_one_session_leaves_others() {
			let store = store();
			let user = UserId::generate();
			store.save(user, "t1", "dev-a", None).await.unwrap();
			store.save(user, "t2", "dev-b", None).await.unwrap();

			assert_eq!(store.revoke(user, Some("dev-a")).await.unwrap(), 1);
			assert!(!store.is_valid(user, "t1", "dev-a").await.unwrap());
			assert!(store.is_valid(user, "t2", "dev-b").await.unwrap());
		}

		#[tokio::test]
		async fn revoke_all_sessions() {
			let store = store();
			let user = UserId::generate();
			store.save(user, "t1", "dev-a", None).await.unwrap();
			store.save(user, "t2", "dev-b", None).await.unwrap();

			assert_eq!(store.revoke(user, None).await.unwrap(), 2);
			assert!(!store.is_valid(user, "t1", "dev-a").await.unwrap());
			assert!(!store.is_valid(user, "t2", "dev-b").await.unwrap());
			assert!(store.sessions(user).await.unwrap().is_empty());
		}

		#[tokio::test]
		async fn revoking_unknown_session_counts_zero() {
			let store = store();
			assert_eq!(
				store.revoke(UserId::generate(), Some("nope")).await.unwrap(),
				0
			);
		}
	}

	mod fingerprints {
		use super::*;

		#[tokio::test]
		async fn update_requires_live_token() {
			let store = store();
			let user = UserId::generate();
			let first = Fingerprint::capture(Some("10.1.2.3"), Some("ua"), &NoAsnLookup);
			let second = Fingerprint::capture(Some("10.1.2.9"), Some("ua"), &NoAsnLookup);
			store.save(user, "rt", "dev-a", Some(first)).await.unwrap();

			assert!(!store
				.update_fingerprint(user, "stale", "dev-a", second.clone())
				.await
				.unwrap());
			assert!(store
				.update_fingerprint(user, "rt", "dev-a", second.clone())
				.await
				.unwrap());
			assert_eq!(store.fingerprint(user, "dev-a").await.unwrap(), Some(second));
		}
	}

	#[tokio::test]
	async fn purge_expired_uses_ttl() {
		let kv = Arc::new(InMemorySessionKv::new());
		let store = RefreshSessionStore::new(kv.clone());
		let user = UserId::generate();
		kv.set(SessionRecord {
			identity_id: user,
			session_id: "stale".to_string(),
			refresh_token_hash: hash_token("t"),
			fingerprint: None,
			created_at: Utc::now() - chrono::Duration::hours(2),
		})
		.await
		.unwrap();
		store.save(user, "t", "fresh", None).await.unwrap();

		assert_eq!(
			store.purge_expired(Duration::from_secs(3600)).await.unwrap(),
			1
		);
		let sessions = store.sessions(user).await.unwrap();
		assert_eq!(sessions.len(), 1);
		assert_eq!(sessions[0].session_id, "fresh");
	}

	#[tokio::test]
	async fn purge_task_runs_on_interval() {
		let kv = Arc::new(InMemorySessionKv::new());
		let store = RefreshSessionStore::new(kv.clone());
		kv.set(SessionRecord {
			identity_id: UserId::generate(),
			session_id: "stale".to_string(),
			refresh_token_hash: hash_token("t"),
			fingerprint: None,
			created_at: Utc::now() - chrono::Duration::hours(2),
		})
		.await
		.unwrap();

		let handle = store.spawn_purge_task(Duration::from_secs(60), Duration::from_millis(10));
		tokio::time::sleep(Duration::from_millis(50)).await;
		handle.abort();

		assert!(kv.is_empty());
	}

	proptest! {
		#[test]
		fn sessions_are_isolated_per_key(
			sessions in proptest::collection::hash_set("[a-z0-9]{4,12}", 2..6)
		) {
			tokio_test::block_on(async {
				let store = store();
				let user = UserId::generate();
				let ids: Vec<_> = sessions.into_iter().collect();
				for id in &ids {
					store.save(user, &format!("token-{id}"), id, None).await.unwrap();
				}

				let (revoked, kept) = ids.split_at(1);
				store.revoke(user, Some(revoked[0].as_str())).await.unwrap();

				assert!(!store
					.is_valid(user, &format!("token-{}", revoked[0]), &revoked[0])
					.await
					.unwrap());
				for id in kept {
					assert!(store.is_valid(user, &format!("token-{id}"), id).await.unwrap());
				}
			});
		}
	}
}
