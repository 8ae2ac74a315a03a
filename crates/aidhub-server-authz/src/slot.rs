// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::fmt;

/// A piece of the [`AuthorizationContext`](crate::AuthorizationContext) that a
/// resolver reads or fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
	/// The authenticated identity. Always present.
	Caller,
	Organization,
	TargetUser,
	Receipt,
}

impl fmt::Display for Slot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Slot::Caller => f.write_str("caller"),
			Slot::Organization => f.write_str("organization"),
			Slot::TargetUser => f.write_str("target user"),
			Slot::Receipt => f.write_str("receipt"),
		}
	}
}

/// Path and query parameters of the request, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(HashMap<String, String>);

impl RouteParams {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.0.insert(name.into(), value.into());
		self
	}

	/// Blank values count as absent.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0
			.get(name)
			.map(|v| v.trim())
			.filter(|v| !v.is_empty())
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		)
	}
}
