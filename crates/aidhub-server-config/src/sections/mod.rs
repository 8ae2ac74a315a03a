// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for the AidHub server.

pub mod auth;
pub mod geoip;
pub mod logging;
pub mod session_store;

pub use auth::{AuthConfig, AuthConfigLayer, CookieNames, SessionBindingMode};
pub use geoip::{GeoIpConfig, GeoIpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use session_store::{SessionStoreBackend, SessionStoreConfig, SessionStoreConfigLayer};
