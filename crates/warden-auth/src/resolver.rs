// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant resolution.
//!
//! [`GrantResolver::resolve_access`] checks, in order and stopping at the first
//! match:
//!
//! 1. ownership of the resource
//! 2. a grant to the actor's (first) organization with `can_use`
//! 3. a grant to the actor directly with `can_use`
//!
//! Edit, delete and share checks are ownership only. A grant's `can_edit`,
//! `can_delete` and `can_share` flags are stored and reported but never
//! widen those checks: sharing conveys usage, not mutation.
//!
//! Every call reads the store; nothing is cached.

use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::error::Result;
use crate::grant::{AccessResult, AccessType, AccessibleResource, GrantScope};
use crate::store::{AccessStore, ResourceRef};
use crate::types::{ResourceId, ResourceType, UserId};
use crate::visibility::{VisibilityAccess, VisibilityPolicy};

/// Resolves instance-level access against an [`AccessStore`].
#[derive(Clone)]
pub struct GrantResolver {
	store: Arc<dyn AccessStore>,
	visibility: VisibilityPolicy,
}

impl GrantResolver {
	pub fn new(store: Arc<dyn AccessStore>) -> Self {
		Self {
			store,
			visibility: VisibilityPolicy::standard(),
		}
	}

	pub fn with_visibility_policy(mut self, visibility: VisibilityPolicy) -> Self {
		self.visibility = visibility;
		self
	}

	pub fn visibility_policy(&self) -> &VisibilityPolicy {
		&self.visibility
	}

	/// Looks up owner and visibility; visibility outside the type's allowed
	/// set is read as private.
	pub async fn resource(
		&self,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<Option<ResourceRef>> {
		let resource = self.store.get_resource(resource_type, resource_id).await?;
		Ok(resource.map(|mut r| {
			if !self.visibility.allows(resource_type, r.visibility) {
				r.visibility = Default::default();
			}
			r
		}))
	}

	/// Computes the access type and permission flags of `actor_id` on a resource.
	///
	/// A missing resource resolves to [`AccessType::None`].
	#[instrument(
		level = "debug",
		skip(self),
		fields(actor_id = %actor_id, resource_id = %resource_id, resource_type = %resource_type)
	)]
	pub async fn resolve_access(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<AccessResult> {
		let Some(resource) = self.resource(resource_id, resource_type).await? else {
			debug!("resource not found");
			return Ok(AccessResult::none());
		};

		if resource.owner_id == actor_id {
			debug!(access_type = "owned", "access resolved");
			return Ok(AccessResult::owned());
		}

		if let Some(membership) = self.store.get_membership(actor_id).await? {
			let scope = GrantScope::Organization(membership.organization_id);
			if let Some(grant) = self
				.store
				.get_grant(resource_type, resource_id, scope)
				.await?
			{
				if grant.permissions.can_use {
					debug!(
						access_type = "organization",
						organization_id = %membership.organization_id,
						"access resolved"
					);
					return Ok(AccessResult {
						access_type: AccessType::Organization,
						permissions: grant.permissions,
					});
				}
			}
		}

		if let Some(grant) = self
			.store
			.get_grant(resource_type, resource_id, GrantScope::User(actor_id))
			.await?
		{
			if grant.permissions.can_use {
				debug!(access_type = "shared", "access resolved");
				return Ok(AccessResult {
					access_type: AccessType::Shared,
					permissions: grant.permissions,
				});
			}
		}

		debug!(access_type = "none", "access resolved");
		Ok(AccessResult::none())
	}

	/// Like [`Self::resolve_access`], but a store failure resolves to no access.
	pub async fn resolve_access_or_deny(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> AccessResult {
		match self.resolve_access(actor_id, resource_id, resource_type).await {
			Ok(result) => result,
			Err(e) => {
				error!(
					error = %e,
					actor_id = %actor_id,
					resource_id = %resource_id,
					"access resolution failed, denying"
				);
				AccessResult::none()
			}
		}
	}

	/// Ownership, or a grant with `can_use`.
	pub async fn can_access(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<bool> {
		let result = self
			.resolve_access(actor_id, resource_id, resource_type)
			.await?;
		Ok(result.has_access() && result.permissions.can_use)
	}

	/// Ownership only.
	pub async fn can_edit(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<bool> {
		self.is_owner(actor_id, resource_id, resource_type).await
	}

	/// Ownership only.
	pub async fn can_delete(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<bool> {
		self.is_owner(actor_id, resource_id, resource_type).await
	}

	/// Ownership only.
	pub async fn can_share(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<bool> {
		self.is_owner(actor_id, resource_id, resource_type).await
	}

	#[instrument(level = "debug", skip(self), fields(actor_id = %actor_id, resource_id = %resource_id))]
	pub async fn is_owner(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<bool> {
		Ok(self
			.store
			.get_resource(resource_type, resource_id)
			.await?
			.is_some_and(|r| r.owner_id == actor_id))
	}

	/// Read/write access granted by ownership or visibility alone.
	pub async fn visibility_access(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<VisibilityAccess> {
		Ok(match self.resource(resource_id, resource_type).await? {
			Some(r) => self
				.visibility
				.access_for(actor_id, r.owner_id, resource_type, r.visibility),
			None => VisibilityAccess::NONE,
		})
	}

	/// Whether the actor may see and use the resource: ownership, a
	/// non-private visibility, or a grant with `can_use`.
	pub async fn can_view(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<bool> {
		if self
			.visibility_access(actor_id, resource_id, resource_type)
			.await?
			.read
		{
			return Ok(true);
		}
		self.can_access(actor_id, resource_id, resource_type).await
	}

	/// Owned, organization-granted and user-granted resources of one type.
	#[instrument(level = "debug", skip(self), fields(actor_id = %actor_id, resource_type = %resource_type))]
	pub async fn list_accessible(
		&self,
		actor_id: UserId,
		resource_type: ResourceType,
	) -> Result<Vec<AccessibleResource>> {
		let resources = self.store.list_accessible(actor_id, resource_type).await?;
		debug!(count = resources.len(), "accessible resources listed");
		Ok(resources)
	}
}
