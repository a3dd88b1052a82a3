// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed policy outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an action was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
	/// The actor's role has no statement for the action on the resource type.
	StatementDenied,
	/// The action requires ownership of the resource.
	NotOwner,
	/// The resource does not exist (or is not visible to the actor).
	NotFound,
	/// The actor attempted a privileged action on itself.
	SelfActionForbidden,
	/// The action requires the admin role.
	AdminRequired,
	/// Changing one's own password requires the current password.
	CurrentPasswordRequired,
	/// Only admins may feature (make public) a connector.
	FeaturedRequiresAdmin,
	/// A resource cannot be shared with its own owner.
	CannotShareWithOwner,
	/// The store failed and the decision failed closed.
	StorageUnavailable,
}

impl DenyReason {
	/// Stable error code.
	pub fn code(&self) -> &'static str {
		match self {
			DenyReason::StatementDenied => "statement_denied",
			DenyReason::NotOwner => "not_owner",
			DenyReason::NotFound => "not_found",
			DenyReason::SelfActionForbidden => "self_action_forbidden",
			DenyReason::AdminRequired => "admin_required",
			DenyReason::CurrentPasswordRequired => "current_password_required",
			DenyReason::FeaturedRequiresAdmin => "featured_requires_admin",
			DenyReason::CannotShareWithOwner => "cannot_share_with_owner",
			DenyReason::StorageUnavailable => "storage_unavailable",
		}
	}
}

impl fmt::Display for DenyReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.code())
	}
}

/// Result of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
	Allow,
	Deny(DenyReason),
}

impl Decision {
	pub fn is_allowed(&self) -> bool {
		matches!(self, Decision::Allow)
	}

	pub fn is_denied(&self) -> bool {
		!self.is_allowed()
	}

	/// Allow when `condition` holds, otherwise deny with `reason`.
	pub fn allow_if(condition: bool, reason: DenyReason) -> Self {
		if condition {
			Decision::Allow
		} else {
			Decision::Deny(reason)
		}
	}

	/// The denial reason, if any.
	pub fn reason(&self) -> Option<DenyReason> {
		match self {
			Decision::Allow => None,
			Decision::Deny(reason) => Some(*reason),
		}
	}

	/// Chains a further check onto an allowed decision.
	pub fn and_then(self, next: impl FnOnce() -> Decision) -> Decision {
		match self {
			Decision::Allow => next(),
			denied => denied,
		}
	}
}
