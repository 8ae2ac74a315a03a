// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! What a fingerprint mismatch means for an authentication check.

use std::sync::Arc;

use aidhub_server_config::SessionBindingMode;
use aidhub_server_fingerprint::Fingerprint;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingDecision {
	Accept,
	Mismatch,
}

pub trait SessionBindingPolicy: Send + Sync {
	fn name(&self) -> &'static str;

	/// Judge `observed` against the fingerprint stored with the session.
	/// Sessions stored without a fingerprint always pass.
	fn evaluate(&self, stored: Option<&Fingerprint>, observed: &Fingerprint) -> BindingDecision;
}

fn same_session(stored: Option<&Fingerprint>, observed: &Fingerprint) -> bool {
	match stored {
		Some(stored) => stored.clone().matches(observed),
		None => true,
	}
}

/// Compare and log, never reject.
#[derive(Debug, Clone, Copy, Default)]
pub struct InertBinding;

impl SessionBindingPolicy for InertBinding {
	fn name(&self) -> &'static str {
		"inert"
	}

	fn evaluate(&self, stored: Option<&Fingerprint>, observed: &Fingerprint) -> BindingDecision {
		if !same_session(stored, observed) {
			warn!(
				observed_range = observed.ip_range(),
				observed_asn = ?observed.asn(),
				"session fingerprint mismatch (not enforced)"
			);
		}
		BindingDecision::Accept
	}
}

/// Reject any mismatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictBinding;

impl SessionBindingPolicy for StrictBinding {
	fn name(&self) -> &'static str {
		"strict"
	}

	fn evaluate(&self, stored: Option<&Fingerprint>, observed: &Fingerprint) -> BindingDecision {
		if same_session(stored, observed) {
			BindingDecision::Accept
		} else {
			warn!(
				observed_range = observed.ip_range(),
				observed_asn = ?observed.asn(),
				"session fingerprint mismatch"
			);
			BindingDecision::Mismatch
		}
	}
}

pub fn binding_policy(mode: SessionBindingMode) -> Arc<dyn SessionBindingPolicy> {
	match mode {
		SessionBindingMode::Inert => Arc::new(InertBinding),
		SessionBindingMode::Strict => Arc::new(StrictBinding),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use aidhub_server_fingerprint::FixedAsnLookup;

	fn capture(ip: &str, asn: u32) -> Fingerprint {
		Fingerprint::capture(Some(ip), Some("Firefox"), &FixedAsnLookup(Some(asn)))
	}

	#[test]
	fn inert_accepts_mismatch() {
		let stored = capture("192.168.1.1", 1);
		let observed = capture("192.168.1.1", 2);
		assert_eq!(
			InertBinding.evaluate(Some(&stored), &observed),
			BindingDecision::Accept
		);
	}

	#[test]
	fn strict_rejects_mismatch() {
		let stored = capture("192.168.1.1", 1);
		assert_eq!(
			StrictBinding.evaluate(Some(&stored), &capture("192.168.1.1", 2)),
			BindingDecision::Mismatch
		);
		assert_eq!(
			StrictBinding.evaluate(Some(&stored), &capture("192.168.1.50", 1)),
			BindingDecision::Accept
		);
	}

	#[test]
	fn sessions_without_fingerprint_pass() {
		let observed = capture("8.8.8.8", 1);
		assert_eq!(
			StrictBinding.evaluate(None, &observed),
			BindingDecision::Accept
		);
	}

	#[test]
	fn evaluation_does_not_mutate_stored() {
		let stored = capture("192.168.1.1", 1);
		StrictBinding.evaluate(Some(&stored), &capture("192.168.1.2", 1));
		assert_eq!(stored.ip(), "192.168.1.1");
	}

	#[test]
	fn mode_selects_policy() {
		assert_eq!(binding_policy(SessionBindingMode::Inert).name(), "inert");
		assert_eq!(binding_policy(SessionBindingMode::Strict).name(), "strict");
	}
}
