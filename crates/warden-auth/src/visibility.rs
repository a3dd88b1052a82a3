// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Visibility model.
//!
//! Visibility controls what non-owners may do with a resource before any
//! grant is consulted. Owners always have read and write access.
//!
//! | type               | `private`  | `public`          | `readonly`        |
//! |--------------------|------------|-------------------|-------------------|
//! | agent, workflow    | owner only | anyone read/write | anyone read       |
//! | mcp (connector)    | owner only | anyone read       | not allowed       |
//! | everything else    | owner only | not allowed       | not allowed       |
//!
//! A public connector is called "featured" in user-facing copy; only admins
//! may set it (see [`can_set_visibility`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::decision::{Decision, DenyReason};
use crate::types::{ResourceType, Role, UserId, Visibility};

/// Access a visibility level grants to non-owners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityAccess {
	pub read: bool,
	pub write: bool,
}

impl VisibilityAccess {
	pub const NONE: Self = Self {
		read: false,
		write: false,
	};
	pub const READ: Self = Self {
		read: true,
		write: false,
	};
	pub const READ_WRITE: Self = Self {
		read: true,
		write: true,
	};
}

/// Per-type table of allowed visibility values and what they grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityPolicy {
	rules: HashMap<ResourceType, HashMap<Visibility, VisibilityAccess>>,
}

impl Default for VisibilityPolicy {
	fn default() -> Self {
		Self::standard()
	}
}

impl VisibilityPolicy {
	pub fn standard() -> Self {
		let mut rules = HashMap::new();

		let content = HashMap::from([
			(Visibility::Private, VisibilityAccess::NONE),
			(Visibility::Public, VisibilityAccess::READ_WRITE),
			(Visibility::Readonly, VisibilityAccess::READ),
		]);
		rules.insert(ResourceType::Agent, content.clone());
		rules.insert(ResourceType::Workflow, content);

		rules.insert(
			ResourceType::Mcp,
			HashMap::from([
				(Visibility::Private, VisibilityAccess::NONE),
				(Visibility::Public, VisibilityAccess::READ),
			]),
		);

		for resource_type in ResourceType::all()
			.iter()
			.filter(|t| !t.is_shareable())
		{
			rules.insert(
				*resource_type,
				HashMap::from([(Visibility::Private, VisibilityAccess::NONE)]),
			);
		}

		Self { rules }
	}

	/// Returns true if `visibility` is a legal value for `resource_type`.
	pub fn allows(&self, resource_type: ResourceType, visibility: Visibility) -> bool {
		self
			.rules
			.get(&resource_type)
			.is_some_and(|values| values.contains_key(&visibility))
	}

	/// Allowed visibility values for a resource type.
	pub fn values(&self, resource_type: ResourceType) -> Vec<Visibility> {
		let mut values: Vec<Visibility> = self
			.rules
			.get(&resource_type)
			.map(|values| values.keys().copied().collect())
			.unwrap_or_default();
		values.sort_by_key(|v| v.as_str());
		values
	}

	/// Access granted to non-owners. Illegal combinations grant nothing.
	pub fn access(&self, resource_type: ResourceType, visibility: Visibility) -> VisibilityAccess {
		self
			.rules
			.get(&resource_type)
			.and_then(|values| values.get(&visibility))
			.copied()
			.unwrap_or(VisibilityAccess::NONE)
	}

	/// Access granted to `actor` on a resource owned by `owner`.
	pub fn access_for(
		&self,
		actor: UserId,
		owner: UserId,
		resource_type: ResourceType,
		visibility: Visibility,
	) -> VisibilityAccess {
		if actor == owner {
			return VisibilityAccess::READ_WRITE;
		}
		self.access(resource_type, visibility)
	}

	/// Parses a stored visibility value, falling back to `private` for
	/// anything the resource type does not recognize.
	pub fn parse_for(&self, resource_type: ResourceType, raw: Option<&str>) -> Visibility {
		let parsed = match raw.map(|r| r.trim().to_lowercase()).as_deref() {
			Some("public") => Visibility::Public,
			Some("readonly") => Visibility::Readonly,
			_ => Visibility::Private,
		};
		if self.allows(resource_type, parsed) {
			parsed
		} else {
			Visibility::Private
		}
	}
}

impl Visibility {
	/// Parses against the standard policy.
	pub fn parse_for(resource_type: ResourceType, raw: Option<&str>) -> Visibility {
		VisibilityPolicy::standard().parse_for(resource_type, raw)
	}
}

/// Listing predicate for "all resources visible to an actor".
///
/// A resource is listed when the actor owns it or its visibility is anything
/// other than private. Database queries embed [`VisibilityFilter::sql`], which
/// must stay equivalent to [`VisibilityFilter::matches`] over parsed rows.
pub struct VisibilityFilter;

impl VisibilityFilter {
	/// SQL fragment for one resource type; binds the actor id once.
	///
	/// Only the type's legal non-private values match, normalized the way
	/// [`VisibilityPolicy::parse_for`] reads them. Anything else is private.
	pub fn sql(policy: &VisibilityPolicy, resource_type: ResourceType) -> String {
		let listed: Vec<String> = policy
			.values(resource_type)
			.into_iter()
			.filter(|v| *v != Visibility::Private)
			.map(|v| format!("'{}'", v.as_str()))
			.collect();
		if listed.is_empty() {
			return "(owner_id = ?)".to_string();
		}
		format!(
			"(owner_id = ? OR lower(trim(visibility)) IN ({}))",
			listed.join(", ")
		)
	}

	pub fn matches(actor: UserId, owner: UserId, visibility: Visibility) -> bool {
		owner == actor || visibility != Visibility::Private
	}

	/// Applies the predicate to any collection of `(owner, visibility, item)`.
	pub fn apply<T, I>(actor: UserId, items: I) -> Vec<T>
	where
		I: IntoIterator<Item = (UserId, Visibility, T)>,
	{
		items
			.into_iter()
			.filter(|(owner, visibility, _)| Self::matches(actor, *owner, *visibility))
			.map(|(_, _, item)| item)
			.collect()
	}
}

/// Decides whether `role` may set `visibility` on a resource it may modify.
///
/// Ownership is checked by the caller; this covers the value itself:
/// the value must be legal for the type, and featuring a connector requires
/// an admin.
pub fn can_set_visibility(
	policy: &VisibilityPolicy,
	role: Role,
	resource_type: ResourceType,
	visibility: Visibility,
) -> Decision {
	if !policy.allows(resource_type, visibility) {
		return Decision::Deny(DenyReason::StatementDenied);
	}
	if resource_type == ResourceType::Mcp && visibility == Visibility::Public && !role.is_admin() {
		return Decision::Deny(DenyReason::FeaturedRequiresAdmin);
	}
	Decision::Allow
}
