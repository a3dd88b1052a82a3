// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access control and resource-sharing resolution for Warden.
//!
//! This crate provides:
//! - Role normalization from provider-prefixed claims ([`RoleNormalizer`])
//! - A static role to statement table ([`RoleRegistry`])
//! - Per-type visibility rules ([`VisibilityPolicy`], [`VisibilityFilter`])
//! - Ownership, organization and user grant resolution ([`GrantResolver`])
//! - The self-action guard for user management ([`SelfActionGuard`])
//! - Grant lifecycle with audit events ([`ShareService`])
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use warden_auth::{AccessEngine, Action, Actor, ResourceType, RoleRegistry};
//!
//! let engine = AccessEngine::new(Arc::new(RoleRegistry::standard()), store);
//! let actor = Actor::from_claims(user_id, Some("google:editor"), &Default::default());
//! let decision = engine
//! 	.authorize(&actor, Action::Update, ResourceType::Agent, Some(agent_id))
//! 	.await?;
//! ```

pub mod actor;
pub mod audit;
pub mod decision;
pub mod engine;
pub mod error;
pub mod grant;
pub mod guard;
pub mod resolver;
pub mod role;
pub mod sharing;
pub mod statements;
pub mod store;
pub mod types;
pub mod visibility;

#[cfg(test)]
pub mod testing;

pub use actor::{Actor, ActorSource};
pub use audit::{AuditEventType, AuditLogBuilder, AuditLogEntry, AuditSink, TracingAuditSink};
pub use decision::{Decision, DenyReason};
pub use engine::AccessEngine;
pub use error::{AuthzError, Result};
pub use grant::{
	AccessResult, AccessType, AccessibleResource, GrantPermissions, GrantRecord, GrantScope,
	OrgMembership,
};
pub use guard::{SelfActionGuard, UserAction};
pub use resolver::GrantResolver;
pub use role::{normalize_role, RoleNormalizer, DEFAULT_ROLE_DELIMITER};
pub use sharing::{ShareOutcome, ShareService};
pub use statements::{RoleRegistry, Statement};
pub use store::{AccessStore, GrantStore, ResourceRef};
pub use types::{Action, GrantId, OrgId, OrgRole, ResourceId, ResourceType, Role, UserId, Visibility};
pub use visibility::{can_set_visibility, VisibilityAccess, VisibilityFilter, VisibilityPolicy};
