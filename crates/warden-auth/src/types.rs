// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for access control.
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs ([`UserId`], [`OrgId`],
//!   [`ResourceId`], [`GrantId`]) preventing accidental mixing
//! - **Roles**: the closed set of application roles ([`Role`]) and the
//!   organization membership roles ([`OrgRole`])
//! - **Resource types and actions**: the vocabulary statements are written in
//!   ([`ResourceType`], [`Action`])
//! - **Visibility**: per-resource default access for non-owners ([`Visibility`])
//!
//! Every enum has a stable wire name used by serde, `Display` and `FromStr`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AuthzError;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user (an actor).");
define_id_type!(OrgId, "Unique identifier for an organization.");
define_id_type!(ResourceId, "Unique identifier for a shareable resource.");
define_id_type!(GrantId, "Unique identifier for a grant record.");

// =============================================================================
// Roles
// =============================================================================

/// Application-wide role of an actor.
///
/// Decided once, at normalization time; downstream code matches on the enum
/// instead of re-validating role strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Full access, including user and session management.
	Admin,
	/// Full access to application resources, no identity management.
	Editor,
	/// Read and use shared resources, full control over own chats.
	#[default]
	User,
}

impl Role {
	/// Returns all roles.
	pub fn all() -> &'static [Role] {
		&[Role::Admin, Role::Editor, Role::User]
	}

	/// Wire name of the role.
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Admin => "admin",
			Role::Editor => "editor",
			Role::User => "user",
		}
	}

	pub fn is_admin(&self) -> bool {
		matches!(self, Role::Admin)
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Role of a user inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
	/// The account holder that created the organization.
	AccountOwner,
	/// A member invited by the account owner.
	Subuser,
}

impl OrgRole {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrgRole::AccountOwner => "account_owner",
			OrgRole::Subuser => "subuser",
		}
	}
}

impl fmt::Display for OrgRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrgRole {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"account_owner" => Ok(OrgRole::AccountOwner),
			"subuser" => Ok(OrgRole::Subuser),
			other => Err(AuthzError::MalformedInput(format!(
				"unknown organization role '{other}'"
			))),
		}
	}
}

// =============================================================================
// Resource Types
// =============================================================================

/// Types of resources statements are written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
	#[serde(rename = "agent")]
	Agent,
	#[serde(rename = "workflow")]
	Workflow,
	/// An MCP connector.
	#[serde(rename = "mcp")]
	Mcp,
	#[serde(rename = "chat")]
	Chat,
	#[serde(rename = "temporaryChat")]
	TemporaryChat,
	/// Identity management: other users.
	#[serde(rename = "user")]
	User,
	/// Identity management: sessions.
	#[serde(rename = "session")]
	Session,
}

impl ResourceType {
	/// Returns all resource types.
	pub fn all() -> &'static [ResourceType] {
		&[
			ResourceType::Agent,
			ResourceType::Workflow,
			ResourceType::Mcp,
			ResourceType::Chat,
			ResourceType::TemporaryChat,
			ResourceType::User,
			ResourceType::Session,
		]
	}

	/// Resource types whose instances carry an owner, a visibility and grants.
	pub fn shareable() -> &'static [ResourceType] {
		&[ResourceType::Agent, ResourceType::Workflow, ResourceType::Mcp]
	}

	pub fn is_shareable(&self) -> bool {
		Self::shareable().contains(self)
	}

	/// Identity-management types, only ever populated for admins.
	pub fn is_identity(&self) -> bool {
		matches!(self, ResourceType::User | ResourceType::Session)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			ResourceType::Agent => "agent",
			ResourceType::Workflow => "workflow",
			ResourceType::Mcp => "mcp",
			ResourceType::Chat => "chat",
			ResourceType::TemporaryChat => "temporaryChat",
			ResourceType::User => "user",
			ResourceType::Session => "session",
		}
	}
}

impl fmt::Display for ResourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ResourceType {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ResourceType::all()
			.iter()
			.copied()
			.find(|t| t.as_str() == s)
			.ok_or_else(|| AuthzError::MalformedInput(format!("unknown resource type '{s}'")))
	}
}

// =============================================================================
// Actions
// =============================================================================

/// Actions that statements allow.
///
/// The first seven are application actions; the rest belong to the identity
/// layer and only appear in the admin's `user`/`session` statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
	Use,
	Create,
	List,
	Delete,
	Update,
	View,
	Share,
	SetRole,
	Ban,
	Impersonate,
	SetPassword,
	Revoke,
}

impl Action {
	/// The application action set, granted in full to admins and editors.
	pub fn application() -> &'static [Action] {
		&[
			Action::Use,
			Action::Create,
			Action::List,
			Action::Delete,
			Action::Update,
			Action::View,
			Action::Share,
		]
	}

	/// Returns all actions.
	pub fn all() -> &'static [Action] {
		&[
			Action::Use,
			Action::Create,
			Action::List,
			Action::Delete,
			Action::Update,
			Action::View,
			Action::Share,
			Action::SetRole,
			Action::Ban,
			Action::Impersonate,
			Action::SetPassword,
			Action::Revoke,
		]
	}

	/// Returns true for actions that modify an existing instance.
	pub fn is_mutation(&self) -> bool {
		matches!(self, Action::Update | Action::Delete | Action::Share)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Action::Use => "use",
			Action::Create => "create",
			Action::List => "list",
			Action::Delete => "delete",
			Action::Update => "update",
			Action::View => "view",
			Action::Share => "share",
			Action::SetRole => "set-role",
			Action::Ban => "ban",
			Action::Impersonate => "impersonate",
			Action::SetPassword => "set-password",
			Action::Revoke => "revoke",
		}
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Action {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Action::all()
			.iter()
			.copied()
			.find(|a| a.as_str() == s)
			.ok_or_else(|| AuthzError::MalformedInput(format!("unknown action '{s}'")))
	}
}

// =============================================================================
// Visibility
// =============================================================================

/// Visibility level of a shareable resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
	/// Only the owner can access.
	#[default]
	Private,
	/// Anyone can use; agents and workflows are also editable by anyone.
	Public,
	/// Anyone can view and use, only the owner can modify.
	Readonly,
}

impl Visibility {
	pub fn as_str(&self) -> &'static str {
		match self {
			Visibility::Private => "private",
			Visibility::Public => "public",
			Visibility::Readonly => "readonly",
		}
	}
}

impl fmt::Display for Visibility {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
