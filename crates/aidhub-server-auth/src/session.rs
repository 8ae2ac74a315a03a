// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Device session identifiers.

/// Number of random bytes in a generated session id.
pub const SESSION_ID_BYTES: usize = 32;

/// Generate a session id for a device that did not supply one.
///
/// 32 random bytes, hex-encoded (64 characters).
pub fn generate_session_id() -> String {
	use rand::Rng;
	let mut rng = rand::thread_rng();
	let bytes: [u8; SESSION_ID_BYTES] = rng.gen();
	hex::encode(bytes)
}
