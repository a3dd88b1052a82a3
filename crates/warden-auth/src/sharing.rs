// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant lifecycle: sharing and unsharing resources.
//!
//! Only the owner of a resource, or an admin, may create, revoke or list its
//! grants, and only if their role holds the `share` statement for the type.
//! Every change and every refusal is audited.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::actor::Actor;
use crate::audit::{AuditEventType, AuditLogEntry, AuditSink};
use crate::decision::DenyReason;
use crate::error::Result;
use crate::grant::{GrantPermissions, GrantRecord, GrantScope};
use crate::resolver::GrantResolver;
use crate::statements::RoleRegistry;
use crate::store::{AccessStore, GrantStore, ResourceRef};
use crate::types::{Action, ResourceId, ResourceType};

/// Outcome of a sharing operation that passed input validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome<T> {
	Done(T),
	Denied(DenyReason),
}

impl<T> ShareOutcome<T> {
	pub fn is_done(&self) -> bool {
		matches!(self, ShareOutcome::Done(_))
	}

	pub fn denied_reason(&self) -> Option<DenyReason> {
		match self {
			ShareOutcome::Done(_) => None,
			ShareOutcome::Denied(reason) => Some(*reason),
		}
	}

	pub fn done(self) -> Option<T> {
		match self {
			ShareOutcome::Done(value) => Some(value),
			ShareOutcome::Denied(_) => None,
		}
	}
}

pub struct ShareService {
	registry: Arc<RoleRegistry>,
	resolver: GrantResolver,
	grants: Arc<dyn GrantStore>,
	audit: Arc<dyn AuditSink>,
}

impl ShareService {
	pub fn new(
		registry: Arc<RoleRegistry>,
		store: Arc<dyn AccessStore>,
		grants: Arc<dyn GrantStore>,
		audit: Arc<dyn AuditSink>,
	) -> Self {
		Self {
			registry,
			resolver: GrantResolver::new(store),
			grants,
			audit,
		}
	}

	/// Creates or replaces the grant for `target`.
	#[instrument(
		skip(self, permissions),
		fields(actor_id = %actor.id, resource_type = %resource_type, resource_id = %resource_id, target = %target)
	)]
	pub async fn share(
		&self,
		actor: &Actor,
		resource_type: ResourceType,
		resource_id: ResourceId,
		target: GrantScope,
		permissions: GrantPermissions,
	) -> Result<ShareOutcome<GrantRecord>> {
		let resource = match self
			.authorize_owner_or_admin(actor, resource_type, resource_id)
			.await?
		{
			Ok(resource) => resource,
			Err(reason) => return Ok(self.deny(actor, resource_type, resource_id, "share", reason)),
		};

		if target == GrantScope::User(resource.owner_id) {
			return Ok(self.deny(
				actor,
				resource_type,
				resource_id,
				"share",
				DenyReason::CannotShareWithOwner,
			));
		}

		let grant = GrantRecord::new(resource_type, resource_id, target, permissions, actor.id);
		self.grants.upsert_grant(&grant).await?;

		info!(grant_id = %grant.id, "resource shared");
		let mut entry = AuditLogEntry::builder(AuditEventType::ResourceShared)
			.actor(actor.id)
			.resource(resource_type, resource_id.to_string())
			.action(format!("Shared {resource_type} with {target}"))
			.details(serde_json::json!({
				"canUse": permissions.can_use,
				"canEdit": permissions.can_edit,
				"canDelete": permissions.can_delete,
				"canShare": permissions.can_share,
			}));
		if let Some(user_id) = target.user_id() {
			entry = entry.target(user_id);
		}
		self.audit.record(entry.build());

		Ok(ShareOutcome::Done(grant))
	}

	/// Revokes the grant for `target`. Returns `Done(false)` if none existed.
	#[instrument(
		skip(self),
		fields(actor_id = %actor.id, resource_type = %resource_type, resource_id = %resource_id, target = %target)
	)]
	pub async fn unshare(
		&self,
		actor: &Actor,
		resource_type: ResourceType,
		resource_id: ResourceId,
		target: GrantScope,
	) -> Result<ShareOutcome<bool>> {
		if let Err(reason) = self
			.authorize_owner_or_admin(actor, resource_type, resource_id)
			.await?
		{
			return Ok(self.deny(actor, resource_type, resource_id, "unshare", reason));
		}

		let removed = self
			.grants
			.revoke_grant(resource_type, resource_id, target)
			.await?;

		if removed {
			info!("resource unshared");
			let mut entry = AuditLogEntry::builder(AuditEventType::ResourceUnshared)
				.actor(actor.id)
				.resource(resource_type, resource_id.to_string())
				.action(format!("Unshared {resource_type} from {target}"));
			if let Some(user_id) = target.user_id() {
				entry = entry.target(user_id);
			}
			self.audit.record(entry.build());
		}

		Ok(ShareOutcome::Done(removed))
	}

	/// Lists every grant on a resource.
	#[instrument(
		skip(self),
		fields(actor_id = %actor.id, resource_type = %resource_type, resource_id = %resource_id)
	)]
	pub async fn list_shares(
		&self,
		actor: &Actor,
		resource_type: ResourceType,
		resource_id: ResourceId,
	) -> Result<ShareOutcome<Vec<GrantRecord>>> {
		if let Err(reason) = self
			.authorize_owner_or_admin(actor, resource_type, resource_id)
			.await?
		{
			return Ok(self.deny(actor, resource_type, resource_id, "list_shares", reason));
		}

		Ok(ShareOutcome::Done(
			self.grants.list_grants(resource_type, resource_id).await?,
		))
	}

	async fn authorize_owner_or_admin(
		&self,
		actor: &Actor,
		resource_type: ResourceType,
		resource_id: ResourceId,
	) -> Result<std::result::Result<ResourceRef, DenyReason>> {
		if !resource_type.is_shareable()
			|| !self
				.registry
				.has_permission(actor.role, Action::Share, resource_type)
		{
			return Ok(Err(DenyReason::StatementDenied));
		}

		let Some(resource) = self.resolver.resource(resource_id, resource_type).await? else {
			return Ok(Err(DenyReason::NotFound));
		};

		if resource.owner_id == actor.id || actor.is_admin() {
			return Ok(Ok(resource));
		}

		if self
			.resolver
			.can_view(actor.id, resource_id, resource_type)
			.await?
		{
			Ok(Err(DenyReason::NotOwner))
		} else {
			Ok(Err(DenyReason::NotFound))
		}
	}

	fn deny<T>(
		&self,
		actor: &Actor,
		resource_type: ResourceType,
		resource_id: ResourceId,
		operation: &str,
		reason: DenyReason,
	) -> ShareOutcome<T> {
		self.audit.record(
			AuditLogEntry::builder(AuditEventType::AccessDenied)
				.actor(actor.id)
				.resource(resource_type, resource_id.to_string())
				.action(format!("Denied {operation} on {resource_type}"))
				.reason(reason)
				.build(),
		);
		ShareOutcome::Denied(reason)
	}
}
