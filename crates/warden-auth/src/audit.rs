// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit records for access decisions and sharing changes.
//!
//! Entries are built with [`AuditLogEntry::builder`] and handed to an
//! [`AuditSink`]. The default sink, [`TracingAuditSink`], emits each entry as a
//! structured `info` event on the `warden::audit` target so any subscriber can
//! route it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::DenyReason;
use crate::types::{ResourceType, UserId};

/// Types of events recorded by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
	/// A sharing operation was refused.
	AccessDenied,
	/// A grant was created or replaced.
	ResourceShared,
	/// A grant was removed.
	ResourceUnshared,
	/// A self-targeted action was refused.
	SelfActionBlocked,
}

impl std::fmt::Display for AuditEventType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			AuditEventType::AccessDenied => "access_denied",
			AuditEventType::ResourceShared => "resource_shared",
			AuditEventType::ResourceUnshared => "resource_unshared",
			AuditEventType::SelfActionBlocked => "self_action_blocked",
		};
		write!(f, "{s}")
	}
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
	pub id: Uuid,
	pub timestamp: DateTime<Utc>,
	pub event_type: AuditEventType,
	/// The user who performed the action, if known.
	pub actor_user_id: Option<UserId>,
	/// The user the action targeted, for identity actions and shares.
	pub target_user_id: Option<UserId>,
	pub resource_type: Option<ResourceType>,
	pub resource_id: Option<String>,
	/// Human-readable description; defaults to the event type.
	pub action: String,
	/// Stable deny code when the event records a refusal.
	pub reason: Option<DenyReason>,
	/// Additional event-specific details.
	pub details: serde_json::Value,
}

impl AuditLogEntry {
	pub fn builder(event_type: AuditEventType) -> AuditLogBuilder {
		AuditLogBuilder::new(event_type)
	}
}

/// Fluent builder for [`AuditLogEntry`].
#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
	event_type: AuditEventType,
	actor_user_id: Option<UserId>,
	target_user_id: Option<UserId>,
	resource_type: Option<ResourceType>,
	resource_id: Option<String>,
	action: Option<String>,
	reason: Option<DenyReason>,
	details: serde_json::Value,
}

impl AuditLogBuilder {
	pub fn new(event_type: AuditEventType) -> Self {
		Self {
			event_type,
			actor_user_id: None,
			target_user_id: None,
			resource_type: None,
			resource_id: None,
			action: None,
			reason: None,
			details: serde_json::Value::Null,
		}
	}

	pub fn actor(mut self, user_id: UserId) -> Self {
		self.actor_user_id = Some(user_id);
		self
	}

	pub fn target(mut self, user_id: UserId) -> Self {
		self.target_user_id = Some(user_id);
		self
	}

	pub fn resource(mut self, resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
		self.resource_type = Some(resource_type);
		self.resource_id = Some(resource_id.into());
		self
	}

	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn reason(mut self, reason: DenyReason) -> Self {
		self.reason = Some(reason);
		self
	}

	pub fn details(mut self, details: serde_json::Value) -> Self {
		self.details = details;
		self
	}

	/// Stamps the entry with a fresh id and the current time.
	pub fn build(self) -> AuditLogEntry {
		AuditLogEntry {
			id: Uuid::new_v4(),
			timestamp: Utc::now(),
			event_type: self.event_type,
			actor_user_id: self.actor_user_id,
			target_user_id: self.target_user_id,
			resource_type: self.resource_type,
			resource_id: self.resource_id,
			action: self.action.unwrap_or_else(|| self.event_type.to_string()),
			reason: self.reason,
			details: self.details,
		}
	}
}

/// Destination for audit entries.
///
/// Recording must not fail the operation being audited; implementations
/// swallow and log their own errors.
pub trait AuditSink: Send + Sync {
	fn record(&self, entry: AuditLogEntry);
}

/// Emits audit entries as tracing events on the `warden::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
	fn record(&self, entry: AuditLogEntry) {
		tracing::info!(
			target: "warden::audit",
			audit_id = %entry.id,
			event_type = %entry.event_type,
			actor_user_id = ?entry.actor_user_id.map(|id| id.to_string()),
			target_user_id = ?entry.target_user_id.map(|id| id.to_string()),
			resource_type = ?entry.resource_type.map(|t| t.as_str()),
			resource_id = ?entry.resource_id,
			reason = ?entry.reason.map(|r| r.code()),
			details = %entry.details,
			"{}",
			entry.action
		);
	}
}
