// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Network and device fingerprints for refresh sessions.
//!
//! A [`Fingerprint`] summarises where a request came from: the coarse IP
//! range, a hash of the user agent and the autonomous system number. Two
//! captures are treated as the same logical session when those agree, so
//! DHCP or NAT churn inside one range does not break a session.
//!
//! ```
//! use aidhub_server_fingerprint::{Fingerprint, NoAsnLookup};
//!
//! let mut stored = Fingerprint::capture(Some("192.168.1.10"), Some("curl/8.0"), &NoAsnLookup);
//! let observed = Fingerprint::capture(Some("192.168.1.77"), Some("curl/8.0"), &NoAsnLookup);
//! assert!(stored.matches(&observed));
//! assert_eq!(stored.ip(), "192.168.1.77");
//! ```

mod asn;
mod fingerprint;
mod range;

pub use asn::{asn_lookup_from_path, AsnLookup, FixedAsnLookup, MaxMindAsnLookup, NoAsnLookup};
pub use fingerprint::Fingerprint;
pub use range::{ip_range, UNKNOWN_RANGE};

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
	#[error("ASN database not found at path: {0}")]
	DatabaseNotFound(String),

	#[error("Failed to open ASN database: {0}")]
	DatabaseOpen(#[source] maxminddb::MaxMindDBError),
}
