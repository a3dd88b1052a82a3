// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory store and audit sink for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::audit::{AuditEventType, AuditLogEntry, AuditSink};
use crate::error::{AuthzError, Result};
use crate::grant::{
	AccessType, AccessibleResource, GrantPermissions, GrantRecord, GrantScope, OrgMembership,
};
use crate::store::{AccessStore, GrantStore, ResourceRef};
use crate::types::{OrgId, OrgRole, ResourceId, ResourceType, UserId, Visibility};

#[derive(Default)]
pub struct MemoryStore {
	resources: RwLock<HashMap<(ResourceType, ResourceId), ResourceRef>>,
	memberships: RwLock<Vec<OrgMembership>>,
	grants: RwLock<Vec<GrantRecord>>,
	failing: AtomicBool,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_resource(
		&self,
		resource_type: ResourceType,
		owner_id: UserId,
		visibility: Visibility,
	) -> ResourceId {
		let id = ResourceId::generate();
		self.resources.write().unwrap().insert(
			(resource_type, id),
			ResourceRef {
				id,
				resource_type,
				owner_id,
				visibility,
			},
		);
		id
	}

	pub fn add_membership(&self, organization_id: OrgId, user_id: UserId) {
		self.memberships.write().unwrap().push(OrgMembership {
			organization_id,
			user_id,
			role: OrgRole::Subuser,
			permissions: Vec::new(),
		});
	}

	pub fn add_grant(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
		scope: GrantScope,
		permissions: GrantPermissions,
		granted_by: UserId,
	) {
		self.grants.write().unwrap().push(GrantRecord::new(
			resource_type,
			resource_id,
			scope,
			permissions,
			granted_by,
		));
	}

	/// Makes every subsequent call fail with a storage error.
	pub fn fail(&self) {
		self.failing.store(true, Ordering::SeqCst);
	}

	fn check(&self) -> Result<()> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(AuthzError::Storage("store offline".to_string()));
		}
		Ok(())
	}

	fn first_membership(&self, user_id: UserId) -> Option<OrgMembership> {
		self
			.memberships
			.read()
			.unwrap()
			.iter()
			.find(|m| m.user_id == user_id)
			.cloned()
	}
}

#[async_trait]
impl AccessStore for MemoryStore {
	async fn get_resource(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
	) -> Result<Option<ResourceRef>> {
		self.check()?;
		Ok(self
			.resources
			.read()
			.unwrap()
			.get(&(resource_type, resource_id))
			.copied())
	}

	async fn get_membership(&self, user_id: UserId) -> Result<Option<OrgMembership>> {
		self.check()?;
		Ok(self.first_membership(user_id))
	}

	async fn get_grant(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
		scope: GrantScope,
	) -> Result<Option<GrantRecord>> {
		self.check()?;
		Ok(self
			.grants
			.read()
			.unwrap()
			.iter()
			.find(|g| {
				g.resource_type == resource_type && g.resource_id == resource_id && g.scope == scope
			})
			.cloned())
	}

	async fn list_accessible(
		&self,
		user_id: UserId,
		resource_type: ResourceType,
	) -> Result<Vec<AccessibleResource>> {
		self.check()?;
		let resources = self.resources.read().unwrap();
		let grants = self.grants.read().unwrap();
		let org = self.first_membership(user_id).map(|m| m.organization_id);

		let mut out: Vec<AccessibleResource> = resources
			.values()
			.filter(|r| r.resource_type == resource_type && r.owner_id == user_id)
			.map(|r| AccessibleResource {
				resource_id: r.id,
				resource_type,
				owner_id: r.owner_id,
				access_type: AccessType::Owned,
				permissions: GrantPermissions::all(),
			})
			.collect();

		for (wanted, access_type) in [
			(org.map(GrantScope::Organization), AccessType::Organization),
			(Some(GrantScope::User(user_id)), AccessType::Shared),
		] {
			let Some(wanted) = wanted else { continue };
			for grant in grants
				.iter()
				.filter(|g| g.resource_type == resource_type && g.scope == wanted)
				.filter(|g| g.permissions.can_use)
			{
				if out.iter().any(|r| r.resource_id == grant.resource_id) {
					continue;
				}
				if let Some(resource) = resources.get(&(resource_type, grant.resource_id)) {
					out.push(AccessibleResource {
						resource_id: resource.id,
						resource_type,
						owner_id: resource.owner_id,
						access_type,
						permissions: grant.permissions,
					});
				}
			}
		}

		Ok(out)
	}
}

#[async_trait]
impl GrantStore for MemoryStore {
	async fn upsert_grant(&self, grant: &GrantRecord) -> Result<()> {
		self.check()?;
		if !self
			.resources
			.read()
			.unwrap()
			.contains_key(&(grant.resource_type, grant.resource_id))
		{
			return Err(AuthzError::Storage(format!(
				"resource {} not found",
				grant.resource_id
			)));
		}
		let mut grants = self.grants.write().unwrap();
		grants.retain(|g| {
			!(g.resource_type == grant.resource_type
				&& g.resource_id == grant.resource_id
				&& g.scope == grant.scope)
		});
		grants.push(grant.clone());
		Ok(())
	}

	async fn revoke_grant(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
		scope: GrantScope,
	) -> Result<bool> {
		self.check()?;
		let mut grants = self.grants.write().unwrap();
		let before = grants.len();
		grants.retain(|g| {
			!(g.resource_type == resource_type && g.resource_id == resource_id && g.scope == scope)
		});
		Ok(grants.len() != before)
	}

	async fn list_grants(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
	) -> Result<Vec<GrantRecord>> {
		self.check()?;
		Ok(self
			.grants
			.read()
			.unwrap()
			.iter()
			.filter(|g| g.resource_type == resource_type && g.resource_id == resource_id)
			.cloned()
			.collect())
	}
}

/// Keeps every audit entry for later assertions.
#[derive(Default)]
pub struct RecordingAuditSink {
	entries: RwLock<Vec<AuditLogEntry>>,
}

impl RecordingAuditSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn entries(&self) -> Vec<AuditLogEntry> {
		self.entries.read().unwrap().clone()
	}

	pub fn event_types(&self) -> Vec<AuditEventType> {
		self
			.entries
			.read()
			.unwrap()
			.iter()
			.map(|e| e.event_type)
			.collect()
	}
}

impl AuditSink for RecordingAuditSink {
	fn record(&self, entry: AuditLogEntry) {
		self.entries.write().unwrap().push(entry);
	}
}
