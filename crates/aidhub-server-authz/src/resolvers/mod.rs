// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod organization;
mod receipt;
mod user;

pub use organization::{OrganizationAccess, OrganizationResolver};
pub use receipt::ReceiptResolver;
pub use user::{UserResolver, UserTarget};
