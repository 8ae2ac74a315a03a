// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Autonomous system lookups.

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use maxminddb::{geoip2, Reader};

use crate::FingerprintError;

/// Resolves an address to its autonomous system number.
pub trait AsnLookup: Send + Sync {
	fn lookup_asn(&self, ip: IpAddr) -> Option<u32>;
}

/// Lookup used when no ASN database is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAsnLookup;

impl AsnLookup for NoAsnLookup {
	fn lookup_asn(&self, _ip: IpAddr) -> Option<u32> {
		None
	}
}

/// Returns the same ASN for every address. Handy for tests and single-homed
/// deployments.
#[derive(Debug, Clone, Copy)]
pub struct FixedAsnLookup(pub Option<u32>);

impl AsnLookup for FixedAsnLookup {
	fn lookup_asn(&self, _ip: IpAddr) -> Option<u32> {
		self.0
	}
}

/// GeoLite2-ASN backed lookup.
pub struct MaxMindAsnLookup {
	reader: Reader<Vec<u8>>,
	database_path: String,
}

impl std::fmt::Debug for MaxMindAsnLookup {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MaxMindAsnLookup")
			.field("database_path", &self.database_path)
			.finish()
	}
}

impl MaxMindAsnLookup {
	#[tracing::instrument(level = "info", skip(database_path), fields(path))]
	pub fn open<P: AsRef<Path>>(database_path: P) -> Result<Self, FingerprintError> {
		let path = database_path.as_ref();
		let path_str = path.display().to_string();
		tracing::Span::current().record("path", path_str.as_str());

		if !path.exists() {
			return Err(FingerprintError::DatabaseNotFound(path_str));
		}

		let reader = Reader::open_readfile(path).map_err(FingerprintError::DatabaseOpen)?;
		tracing::info!("ASN database loaded");

		Ok(Self {
			reader,
			database_path: path_str,
		})
	}

	pub fn database_path(&self) -> &str {
		&self.database_path
	}
}

impl AsnLookup for MaxMindAsnLookup {
	fn lookup_asn(&self, ip: IpAddr) -> Option<u32> {
		match self.reader.lookup::<geoip2::Asn>(ip) {
			Ok(record) => record.autonomous_system_number,
			Err(e) => {
				tracing::debug!(%ip, error = %e, "ASN lookup failed");
				None
			}
		}
	}
}

/// Build the lookup for an optional database path.
pub fn asn_lookup_from_path(path: Option<&str>) -> Result<Arc<dyn AsnLookup>, FingerprintError> {
	match path {
		Some(path) if !path.is_empty() => Ok(Arc::new(MaxMindAsnLookup::open(path)?)),
		_ => {
			tracing::debug!("no ASN database configured, fingerprints carry no ASN");
			Ok(Arc::new(NoAsnLookup))
		}
	}
}
