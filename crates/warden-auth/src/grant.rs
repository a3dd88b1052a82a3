// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant records, organization memberships and resolved access.
//!
//! A grant shares one resource with exactly one organization or exactly one
//! user. [`GrantScope`] makes "both" and "neither" unrepresentable; the
//! database enforces the same rule with a CHECK constraint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{GrantId, OrgId, OrgRole, ResourceId, ResourceType, UserId};

/// Permission flags stored on a grant.
///
/// Missing fields deserialize to `can_use = true` and `false` for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissions {
	#[serde(default = "default_can_use")]
	pub can_use: bool,
	#[serde(default)]
	pub can_edit: bool,
	#[serde(default)]
	pub can_delete: bool,
	#[serde(default)]
	pub can_share: bool,
}

fn default_can_use() -> bool {
	true
}

impl Default for GrantPermissions {
	fn default() -> Self {
		Self::use_only()
	}
}

impl GrantPermissions {
	/// Usage only; the default for new grants.
	pub fn use_only() -> Self {
		Self {
			can_use: true,
			can_edit: false,
			can_delete: false,
			can_share: false,
		}
	}

	/// Every flag set; what owners resolve to.
	pub fn all() -> Self {
		Self {
			can_use: true,
			can_edit: true,
			can_delete: true,
			can_share: true,
		}
	}

	/// Every flag cleared; what unrelated actors resolve to.
	pub fn none() -> Self {
		Self {
			can_use: false,
			can_edit: false,
			can_delete: false,
			can_share: false,
		}
	}
}

/// Who a grant is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum GrantScope {
	Organization(OrgId),
	User(UserId),
}

impl GrantScope {
	pub fn organization_id(&self) -> Option<OrgId> {
		match self {
			GrantScope::Organization(id) => Some(*id),
			GrantScope::User(_) => None,
		}
	}

	pub fn user_id(&self) -> Option<UserId> {
		match self {
			GrantScope::User(id) => Some(*id),
			GrantScope::Organization(_) => None,
		}
	}

	/// Rebuilds a scope from the two nullable storage columns.
	///
	/// Returns `None` when both or neither are set.
	pub fn from_columns(organization_id: Option<OrgId>, user_id: Option<UserId>) -> Option<Self> {
		match (organization_id, user_id) {
			(Some(org), None) => Some(GrantScope::Organization(org)),
			(None, Some(user)) => Some(GrantScope::User(user)),
			_ => None,
		}
	}
}

impl fmt::Display for GrantScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GrantScope::Organization(id) => write!(f, "organization:{id}"),
			GrantScope::User(id) => write!(f, "user:{id}"),
		}
	}
}

/// A persisted sharing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
	pub id: GrantId,
	pub resource_type: ResourceType,
	pub resource_id: ResourceId,
	pub scope: GrantScope,
	pub permissions: GrantPermissions,
	pub granted_by: UserId,
	pub granted_at: DateTime<Utc>,
}

impl GrantRecord {
	/// Creates a new grant stamped with the current time.
	pub fn new(
		resource_type: ResourceType,
		resource_id: ResourceId,
		scope: GrantScope,
		permissions: GrantPermissions,
		granted_by: UserId,
	) -> Self {
		Self {
			id: GrantId::generate(),
			resource_type,
			resource_id,
			scope,
			permissions,
			granted_by,
			granted_at: Utc::now(),
		}
	}
}

/// A user's membership in an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMembership {
	pub organization_id: OrgId,
	pub user_id: UserId,
	pub role: OrgRole,
	/// Organization-level capabilities such as `invite_members`.
	#[serde(default)]
	pub permissions: Vec<String>,
}

impl OrgMembership {
	pub fn has_permission(&self, permission: &str) -> bool {
		self.role == OrgRole::AccountOwner || self.permissions.iter().any(|p| p == permission)
	}
}

/// How an actor came to have access to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
	Owned,
	Organization,
	Shared,
	None,
}

impl AccessType {
	pub fn as_str(&self) -> &'static str {
		match self {
			AccessType::Owned => "owned",
			AccessType::Organization => "organization",
			AccessType::Shared => "shared",
			AccessType::None => "none",
		}
	}
}

impl fmt::Display for AccessType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Resolved access of one actor to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResult {
	pub access_type: AccessType,
	pub permissions: GrantPermissions,
}

impl AccessResult {
	pub fn owned() -> Self {
		Self {
			access_type: AccessType::Owned,
			permissions: GrantPermissions::all(),
		}
	}

	pub fn none() -> Self {
		Self {
			access_type: AccessType::None,
			permissions: GrantPermissions::none(),
		}
	}

	pub fn has_access(&self) -> bool {
		self.access_type != AccessType::None
	}
}

/// One entry of an accessible-resources listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibleResource {
	pub resource_id: ResourceId,
	pub resource_type: ResourceType,
	pub owner_id: UserId,
	pub access_type: AccessType,
	pub permissions: GrantPermissions,
}
