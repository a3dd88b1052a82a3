// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for Warden.
//!
//! Repositories own a [`SqlitePool`](sqlx::SqlitePool) and expose async
//! methods returning [`DbError`]. [`AccessRepository`] adapts them to the
//! engine's [`AccessStore`](warden_auth::AccessStore) and
//! [`GrantStore`](warden_auth::GrantStore) traits.

pub mod access;
pub mod error;
pub mod grant;
pub mod org;
pub mod pool;
pub mod resource;
mod row;
pub mod schema;

#[cfg(test)]
mod testing;

pub use access::AccessRepository;
pub use error::{DbError, Result};
pub use grant::GrantRepository;
pub use org::{OrgRepository, OrgStore};
pub use pool::create_pool;
pub use resource::{ResourceRecord, ResourceRepository, ResourceStore};
pub use schema::run_migrations;
