// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Range used when the address cannot be parsed. Matches everything.
pub const UNKNOWN_RANGE: &str = "0.0.0.0/0";

/// Coarsen an address to the range a session may roam within.
///
/// Private IPv4 keeps /24, public IPv4 /20, unique-local IPv6 /64 and any
/// other IPv6 /48. IPv4-mapped IPv6 addresses are treated as IPv4.
pub fn ip_range(ip: IpAddr) -> String {
	match ip {
		IpAddr::V4(v4) => v4_range(v4),
		IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
			Some(v4) => v4_range(v4),
			None => v6_range(v6),
		},
	}
}

fn v4_range(ip: Ipv4Addr) -> String {
	let prefix = if ip.is_private() || ip.is_loopback() {
		24
	} else {
		20
	};
	let mask = u32::MAX << (32 - prefix);
	let network = Ipv4Addr::from(u32::from(ip) & mask);
	format!("{network}/{prefix}")
}

fn v6_range(ip: Ipv6Addr) -> String {
	let unique_local = (ip.segments()[0] & 0xfe00) == 0xfc00;
	let prefix = if unique_local { 64 } else { 48 };
	let mask = u128::MAX << (128 - prefix);
	let network = Ipv6Addr::from(u128::from(ip) & mask);
	format!("{network}/{prefix}")
}
