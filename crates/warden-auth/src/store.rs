// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage seams consumed by the resolver and the sharing service.
//!
//! The engine never talks to a database directly. Implementations live in
//! `warden-db`; unit tests use an in-memory store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grant::{AccessibleResource, GrantRecord, GrantScope, OrgMembership};
use crate::types::{ResourceId, ResourceType, UserId, Visibility};

/// Owner and visibility of a resource instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
	pub id: ResourceId,
	pub resource_type: ResourceType,
	pub owner_id: UserId,
	pub visibility: Visibility,
}

/// Read-only lookups the resolver needs.
#[async_trait]
pub trait AccessStore: Send + Sync {
	/// Owner and visibility of a resource, or `None` if it does not exist.
	async fn get_resource(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
	) -> Result<Option<ResourceRef>>;

	/// The first organization membership of a user.
	async fn get_membership(&self, user_id: UserId) -> Result<Option<OrgMembership>>;

	/// The grant for a resource and scope, if any.
	async fn get_grant(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
		scope: GrantScope,
	) -> Result<Option<GrantRecord>>;

	/// Owned, organization-granted and user-granted resources of one type,
	/// tagged with how they are accessible.
	async fn list_accessible(
		&self,
		user_id: UserId,
		resource_type: ResourceType,
	) -> Result<Vec<AccessibleResource>>;
}

/// Write operations for grant records.
///
/// Implementations must make `upsert_grant` atomic with respect to the
/// resource's existence and keep at most one grant per resource and scope.
#[async_trait]
pub trait GrantStore: Send + Sync {
	/// Creates or replaces the grant for `grant.scope`.
	async fn upsert_grant(&self, grant: &GrantRecord) -> Result<()>;

	/// Removes a grant. Returns false if none existed.
	async fn revoke_grant(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
		scope: GrantScope,
	) -> Result<bool>;

	/// All grants on a resource.
	async fn list_grants(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
	) -> Result<Vec<GrantRecord>>;
}
