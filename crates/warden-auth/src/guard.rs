// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Self-action guard for user-management actions.
//!
//! Two rules live here:
//!
//! - actors may always manage themselves (profile, password with the current
//!   password, stats, own sessions) regardless of `user` statements
//! - privileged attributes (role, ban status, existence) can never be changed
//!   on oneself, even by an admin; acting on *other* users requires the
//!   matching admin statement
//!
//! No configuration re-enables self role changes.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actor::Actor;
use crate::audit::{AuditEventType, AuditLogEntry, AuditSink, TracingAuditSink};
use crate::decision::{Decision, DenyReason};
use crate::statements::RoleRegistry;
use crate::types::{Action, ResourceType, UserId};

/// A user-management action aimed at a target user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UserAction {
	UpdateProfile,
	/// Self-service changes must carry proof of the current password.
	ChangePassword {
		current_password_verified: bool,
	},
	ViewStats,
	ChangeRole,
	Ban,
	Unban,
	DeleteUser,
	/// Administrative reset; never requires the target's current password.
	ResetPassword,
	Impersonate,
	RevokeSessions,
}

impl UserAction {
	/// The statement required to perform this action on another user.
	pub fn required_statement(&self) -> (Action, ResourceType) {
		match self {
			UserAction::UpdateProfile => (Action::Update, ResourceType::User),
			UserAction::ChangePassword { .. } | UserAction::ResetPassword => {
				(Action::SetPassword, ResourceType::User)
			}
			UserAction::ViewStats => (Action::View, ResourceType::User),
			UserAction::ChangeRole => (Action::SetRole, ResourceType::User),
			UserAction::Ban | UserAction::Unban => (Action::Ban, ResourceType::User),
			UserAction::DeleteUser => (Action::Delete, ResourceType::User),
			UserAction::Impersonate => (Action::Impersonate, ResourceType::User),
			UserAction::RevokeSessions => (Action::Revoke, ResourceType::Session),
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			UserAction::UpdateProfile => "update_profile",
			UserAction::ChangePassword { .. } => "change_password",
			UserAction::ViewStats => "view_stats",
			UserAction::ChangeRole => "change_role",
			UserAction::Ban => "ban",
			UserAction::Unban => "unban",
			UserAction::DeleteUser => "delete_user",
			UserAction::ResetPassword => "reset_password",
			UserAction::Impersonate => "impersonate",
			UserAction::RevokeSessions => "revoke_sessions",
		}
	}
}

impl fmt::Display for UserAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Checks user-management actions against the actor's identity and role.
///
/// Refused self-targeted privileged actions are recorded as
/// [`AuditEventType::SelfActionBlocked`].
#[derive(Clone)]
pub struct SelfActionGuard {
	registry: Arc<RoleRegistry>,
	audit: Arc<dyn AuditSink>,
}

impl SelfActionGuard {
	pub fn new(registry: Arc<RoleRegistry>) -> Self {
		Self {
			registry,
			audit: Arc::new(TracingAuditSink),
		}
	}

	pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
		self.audit = audit;
		self
	}

	pub fn guard(&self, actor: &Actor, target_user_id: UserId, action: UserAction) -> Decision {
		let decision = if actor.id == target_user_id {
			Self::guard_self(action)
		} else {
			let (statement_action, resource_type) = action.required_statement();
			Decision::allow_if(
				self
					.registry
					.has_permission(actor.role, statement_action, resource_type),
				DenyReason::AdminRequired,
			)
		};

		match decision.reason() {
			Some(DenyReason::SelfActionForbidden) => {
				warn!(
					actor_id = %actor.id,
					action = %action,
					"actor attempted privileged action on itself"
				);
				self.audit.record(
					AuditLogEntry::builder(AuditEventType::SelfActionBlocked)
						.actor(actor.id)
						.target(target_user_id)
						.resource(ResourceType::User, target_user_id.to_string())
						.action(format!("Blocked {action} on self"))
						.reason(DenyReason::SelfActionForbidden)
						.build(),
				);
			}
			Some(reason) => debug!(
				actor_id = %actor.id,
				target_user_id = %target_user_id,
				action = %action,
				reason = %reason,
				"user-management action denied"
			),
			None => {}
		}
		decision
	}

	fn guard_self(action: UserAction) -> Decision {
		match action {
			UserAction::UpdateProfile | UserAction::ViewStats | UserAction::RevokeSessions => {
				Decision::Allow
			}
			UserAction::ChangePassword {
				current_password_verified,
			} => Decision::allow_if(
				current_password_verified,
				DenyReason::CurrentPasswordRequired,
			),
			// Resetting skips the current password, which self-service must not.
			UserAction::ResetPassword => Decision::Deny(DenyReason::CurrentPasswordRequired),
			UserAction::ChangeRole
			| UserAction::Ban
			| UserAction::Unban
			| UserAction::DeleteUser
			| UserAction::Impersonate => Decision::Deny(DenyReason::SelfActionForbidden),
		}
	}
}
