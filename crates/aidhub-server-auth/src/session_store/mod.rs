// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server-side refresh sessions.
//!
//! A session is one device or browser of one identity, keyed by
//! `(identity_id, session_id)`. The record holds the SHA-256 of the refresh
//! token currently valid for that device. A refresh token is accepted only
//! while its hash is stored, so deleting the record revokes it immediately
//! regardless of the token's own expiry.
//!
//! Storage is behind [`SessionKv`] so the same contract can be served from
//! process memory or from a shared database.

mod error;
mod kv;
mod store;

pub use error::SessionStoreError;
pub use kv::{InMemorySessionKv, SessionKey, SessionKv, SessionRecord};
pub use store::{RefreshSessionStore, SessionSummary};
