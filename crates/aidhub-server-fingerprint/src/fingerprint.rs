// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::asn::AsnLookup;
use crate::range::{ip_range, UNKNOWN_RANGE};

/// A coarse capture of the network and client a request came from.
///
/// The integrity check is a SHA-512 digest over the stable fields (range,
/// user-agent hash, ASN). The raw IP is excluded because it is expected to
/// change within a range and is overwritten on every accepted match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
	ip: String,
	ip_range: String,
	user_agent_hash: String,
	asn: Option<u32>,
	integrity_check: String,
	captured_at: DateTime<Utc>,
}

impl Fingerprint {
	/// Sentinel for requests without a client address.
	pub fn empty() -> Self {
		Self {
			ip: String::new(),
			ip_range: String::new(),
			user_agent_hash: String::new(),
			asn: None,
			integrity_check: String::new(),
			captured_at: DateTime::<Utc>::UNIX_EPOCH,
		}
	}

	pub fn capture(ip: Option<&str>, user_agent: Option<&str>, asn_lookup: &dyn AsnLookup) -> Self {
		let ip = match ip.map(str::trim) {
			Some(ip) if !ip.is_empty() => ip,
			_ => return Self::empty(),
		};

		let (ip_range, asn) = match ip.parse::<IpAddr>() {
			Ok(addr) => (ip_range(addr), asn_lookup.lookup_asn(addr)),
			Err(_) => {
				tracing::debug!(ip, "unparseable client address, using permissive range");
				(UNKNOWN_RANGE.to_string(), None)
			}
		};

		let user_agent_hash = hex::encode(Sha256::digest(user_agent.unwrap_or("").as_bytes()));
		let integrity_check = integrity(&ip_range, &user_agent_hash, asn);

		Self {
			ip: ip.to_string(),
			ip_range,
			user_agent_hash,
			asn,
			integrity_check,
			captured_at: Utc::now(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.ip.is_empty()
	}

	/// Whether `other` belongs to the same logical session as `self`.
	///
	/// On acceptance the latest observed address and capture time are copied
	/// into `self`.
	pub fn matches(&mut self, other: &Fingerprint) -> bool {
		match (self.is_empty(), other.is_empty()) {
			(true, true) => return true,
			(true, false) | (false, true) => return false,
			(false, false) => {}
		}

		if self.asn != other.asn
			|| self.ip_range != other.ip_range
			|| self.user_agent_hash != other.user_agent_hash
		{
			return false;
		}

		let ours = integrity(&self.ip_range, &self.user_agent_hash, self.asn);
		let theirs = integrity(&other.ip_range, &other.user_agent_hash, other.asn);
		if ours != self.integrity_check || theirs != self.integrity_check {
			tracing::warn!(ip_range = %self.ip_range, "fingerprint integrity check failed");
			return false;
		}

		self.ip = other.ip.clone();
		self.captured_at = other.captured_at;
		true
	}

	pub fn ip(&self) -> &str {
		&self.ip
	}

	pub fn ip_range(&self) -> &str {
		&self.ip_range
	}

	pub fn user_agent_hash(&self) -> &str {
		&self.user_agent_hash
	}

	pub fn asn(&self) -> Option<u32> {
		self.asn
	}

	pub fn integrity_check(&self) -> &str {
		&self.integrity_check
	}

	pub fn captured_at(&self) -> DateTime<Utc> {
		self.captured_at
	}
}

fn integrity(ip_range: &str, user_agent_hash: &str, asn: Option<u32>) -> String {
	let mut hasher = Sha512::new();
	hasher.update(ip_range.as_bytes());
	hasher.update(b"|");
	hasher.update(user_agent_hash.as_bytes());
	hasher.update(b"|");
	if let Some(asn) = asn {
		hasher.update(asn.to_be_bytes());
	}
	hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::asn::{FixedAsnLookup, NoAsnLookup};

	const UA: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0";

	fn capture(ip: &str, asn: Option<u32>) -> Fingerprint {
		Fingerprint::capture(Some(ip), Some(UA), &FixedAsnLookup(asn))
	}

	mod capture {
		use super::*;

		#[test]
		fn absent_ip_gives_sentinel() {
			assert!(Fingerprint::capture(None, Some(UA), &NoAsnLookup).is_empty());
			assert!(Fingerprint::capture(Some("  "), Some(UA), &NoAsnLookup).is_empty());
		}

		#[test]
		fn records_range_hash_and_asn() {
			let fp = capture("192.168.1.10", Some(64512));
			assert_eq!(fp.ip(), "192.168.1.10");
			assert_eq!(fp.ip_range(), "192.168.1.0/24");
			assert_eq!(fp.asn(), Some(64512));
			assert_eq!(fp.user_agent_hash().len(), 64);
			assert_eq!(fp.integrity_check().len(), 128);
		}

		#[test]
		fn unparseable_ip_uses_permissive_range() {
			let fp = capture("not-an-ip", Some(1));
			assert_eq!(fp.ip_range(), UNKNOWN_RANGE);
			assert_eq!(fp.asn(), None);
			assert!(!fp.is_empty());
		}
	}

	mod matching {
		use super::*;

		#[test]
		fn same_24_same_agent_same_asn_matches_and_updates_ip() {
			let mut stored = capture("192.168.1.10", Some(64512));
			let observed = capture("192.168.1.99", Some(64512));

			assert!(stored.matches(&observed));
			assert_eq!(stored.ip(), "192.168.1.99");
			assert_eq!(stored.captured_at(), observed.captured_at());
		}

		#[test]
		fn integrity_ignores_raw_ip_and_survives_write_back() {
			let mut stored = capture("192.168.1.10", Some(64512));
			let observed = capture("192.168.1.99", Some(64512));
			assert_eq!(stored.integrity_check(), observed.integrity_check());

			assert!(stored.matches(&observed));
			assert!(stored.matches(&capture("192.168.1.200", Some(64512))));
			assert_eq!(stored.ip(), "192.168.1.200");
		}

		#[test]
		fn different_asn_does_not_match() {
			let mut stored = capture("192.168.1.10", Some(64512));
			let observed = capture("192.168.1.99", Some(64513));

			assert!(!stored.matches(&observed));
			assert_eq!(stored.ip(), "192.168.1.10");
		}

		#[test]
		fn different_range_does_not_match() {
			let mut stored = capture("192.168.1.10", None);
			assert!(!stored.matches(&capture("192.168.2.10", None)));
		}

		#[test]
		fn different_agent_does_not_match() {
			let mut stored = capture("10.0.0.1", None);
			let observed = Fingerprint::capture(Some("10.0.0.2"), Some("curl/8.0"), &NoAsnLookup);
			assert!(!stored.matches(&observed));
		}

		#[test]
		fn sentinels_match_each_other_only() {
			let mut empty = Fingerprint::empty();
			assert!(empty.matches(&Fingerprint::empty()));
			assert!(!empty.matches(&capture("10.0.0.1", None)));

			let mut real = capture("10.0.0.1", None);
			assert!(!real.matches(&Fingerprint::empty()));
		}

		#[test]
		fn tampered_integrity_is_rejected() {
			let mut stored = capture("192.168.1.10", None);
			stored.integrity_check = "0".repeat(128);
			assert!(!stored.matches(&capture("192.168.1.11", None)));
		}

		#[test]
		fn survives_serde() {
			let stored = capture("203.0.113.5", Some(64500));
			let json = serde_json::to_string(&stored).unwrap();
			let mut restored: Fingerprint = serde_json::from_str(&json).unwrap();
			assert!(restored.matches(&capture("203.0.113.200", Some(64500))));
		}
	}
}
