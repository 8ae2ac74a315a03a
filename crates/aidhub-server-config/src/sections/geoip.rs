// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! GeoIP ASN database section.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GeoIpConfigLayer {
	pub asn_database_path: Option<String>,
}

impl GeoIpConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.asn_database_path.is_some() {
			self.asn_database_path = other.asn_database_path;
		}
	}

	/// `None` when no database is configured; fingerprints then carry no ASN.
	pub fn finalize(self) -> Option<GeoIpConfig> {
		self
			.asn_database_path
			.map(|asn_database_path| GeoIpConfig { asn_database_path })
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoIpConfig {
	pub asn_database_path: String,
}
