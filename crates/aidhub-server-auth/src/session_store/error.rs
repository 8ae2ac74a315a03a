// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
	/// The backing store could not be reached or rejected the operation.
	#[error("session store backend error: {0}")]
	Backend(String),

	/// A stored record could not be decoded.
	#[error("session record is corrupt: {0}")]
	Corrupt(String),
}
