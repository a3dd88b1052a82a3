// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite-backed [`AccessStore`] for the grant resolver.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};
use warden_auth::{
	AccessStore, AccessType, AccessibleResource, AuthzError, GrantPermissions, GrantRecord,
	GrantScope, GrantStore, OrgMembership, ResourceId, ResourceRef, ResourceType, UserId,
};

use crate::error::DbError;
use crate::grant::{row_to_permissions, GrantRepository};
use crate::org::OrgRepository;
use crate::resource::ResourceRepository;
use crate::row::parse_id;

/// Read side of access control over the three tables, plus grant writes.
#[derive(Clone)]
pub struct AccessRepository {
	pool: SqlitePool,
	resources: ResourceRepository,
	orgs: OrgRepository,
	grants: GrantRepository,
}

impl AccessRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			resources: ResourceRepository::new(pool.clone()),
			orgs: OrgRepository::new(pool.clone()),
			grants: GrantRepository::new(pool.clone()),
			pool,
		}
	}

	/// Owned, organization-granted and user-granted resources of one type.
	///
	/// Three disjoint sets, concatenated in that order. Grants without
	/// `can_use` are excluded, grants on the actor's own resources are
	/// ignored, and a resource reachable through both the organization and a
	/// direct grant is listed once, as organization access.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, resource_type = %resource_type))]
	pub async fn list_accessible(
		&self,
		user_id: UserId,
		resource_type: ResourceType,
	) -> Result<Vec<AccessibleResource>, DbError> {
		let owned = sqlx::query(
			r#"
			SELECT id, owner_id
			FROM resources
			WHERE resource_type = ? AND owner_id = ?
			ORDER BY created_at, id
			"#,
		)
		.bind(resource_type.as_str())
		.bind(user_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut out = Vec::with_capacity(owned.len());
		for row in &owned {
			let id: String = row.get("id");
			let owner_id: String = row.get("owner_id");
			out.push(AccessibleResource {
				resource_id: parse_id(&id, "resource id")?,
				resource_type,
				owner_id: parse_id(&owner_id, "owner_id")?,
				access_type: AccessType::Owned,
				permissions: GrantPermissions::all(),
			});
		}

		if let Some(membership) = self.orgs.get_first_membership(user_id).await? {
			out.extend(
				self
					.granted(
						user_id,
						resource_type,
						"organization_id",
						membership.organization_id.to_string(),
						AccessType::Organization,
					)
					.await?,
			);
		}

		let shared = self
			.granted(
				user_id,
				resource_type,
				"user_id",
				user_id.to_string(),
				AccessType::Shared,
			)
			.await?;
		let seen: HashSet<ResourceId> = out.iter().map(|r| r.resource_id).collect();
		out.extend(shared.into_iter().filter(|r| !seen.contains(&r.resource_id)));

		tracing::debug!(count = out.len(), "accessible resources listed");
		Ok(out)
	}

	async fn granted(
		&self,
		user_id: UserId,
		resource_type: ResourceType,
		scope_column: &str,
		scope_value: String,
		access_type: AccessType,
	) -> Result<Vec<AccessibleResource>, DbError> {
		let sql = format!(
			r#"
			SELECT r.id, r.owner_id, g.can_use, g.can_edit, g.can_delete, g.can_share
			FROM resource_grants g
			JOIN resources r ON r.id = g.resource_id AND r.resource_type = g.resource_type
			WHERE g.resource_type = ? AND g.{scope_column} = ? AND g.can_use = 1
				AND r.owner_id != ?
			ORDER BY g.granted_at, r.id
			"#
		);
		let rows = sqlx::query(&sql)
			.bind(resource_type.as_str())
			.bind(scope_value)
			.bind(user_id.to_string())
			.fetch_all(&self.pool)
			.await?;

		rows
			.iter()
			.map(|row| {
				let id: String = row.get("id");
				let owner_id: String = row.get("owner_id");
				Ok(AccessibleResource {
					resource_id: parse_id(&id, "resource id")?,
					resource_type,
					owner_id: parse_id(&owner_id, "owner_id")?,
					access_type,
					permissions: row_to_permissions(row),
				})
			})
			.collect()
	}
}

#[async_trait]
impl AccessStore for AccessRepository {
	async fn get_resource(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
	) -> Result<Option<ResourceRef>, AuthzError> {
		Ok(self
			.resources
			.get_resource(resource_type, resource_id)
			.await?
			.map(|r| r.to_ref()))
	}

	async fn get_membership(&self, user_id: UserId) -> Result<Option<OrgMembership>, AuthzError> {
		Ok(self.orgs.get_first_membership(user_id).await?)
	}

	async fn get_grant(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
		scope: GrantScope,
	) -> Result<Option<GrantRecord>, AuthzError> {
		Ok(self.grants.get_grant(resource_type, resource_id, scope).await?)
	}

	async fn list_accessible(
		&self,
		user_id: UserId,
		resource_type: ResourceType,
	) -> Result<Vec<AccessibleResource>, AuthzError> {
		Ok(self.list_accessible(user_id, resource_type).await?)
	}
}

#[async_trait]
impl GrantStore for AccessRepository {
	async fn upsert_grant(&self, grant: &GrantRecord) -> Result<(), AuthzError> {
		GrantStore::upsert_grant(&self.grants, grant).await
	}

	async fn revoke_grant(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
		scope: GrantScope,
	) -> Result<bool, AuthzError> {
		GrantStore::revoke_grant(&self.grants, resource_type, resource_id, scope).await
	}

	async fn list_grants(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
	) -> Result<Vec<GrantRecord>, AuthzError> {
		GrantStore::list_grants(&self.grants, resource_type, resource_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::resource::ResourceRecord;
	use crate::testing::create_test_pool;
	use warden_auth::{OrgId, OrgRole, Visibility};

	struct Fixture {
		access: AccessRepository,
		resources: ResourceRepository,
		orgs: OrgRepository,
		grants: GrantRepository,
	}

	async fn fixture() -> Fixture {
		let pool = create_test_pool().await;
		Fixture {
			access: AccessRepository::new(pool.clone()),
			resources: ResourceRepository::new(pool.clone()),
			orgs: OrgRepository::new(pool.clone()),
			grants: GrantRepository::new(pool),
		}
	}

	async fn agent(f: &Fixture, owner: UserId) -> ResourceRecord {
		let record = ResourceRecord::new(ResourceType::Agent, owner, "agent", Visibility::Private);
		f.resources.create_resource(&record).await.unwrap();
		record
	}

	#[tokio::test]
	async fn test_get_resource_maps_to_ref() {
		let f = fixture().await;
		let owner = UserId::generate();
		let record = agent(&f, owner).await;

		let r = AccessStore::get_resource(&f.access, ResourceType::Agent, record.id)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(r.owner_id, owner);
		assert_eq!(r.visibility, Visibility::Private);
	}

	#[tokio::test]
	async fn test_list_accessible_tags_sources() {
		let f = fixture().await;
		let actor = UserId::generate();
		let owner = UserId::generate();
		let org = OrgId::generate();
		f.orgs
			.add_member(&OrgMembership {
				organization_id: org,
				user_id: actor,
				role: OrgRole::Subuser,
				permissions: Vec::new(),
			})
			.await
			.unwrap();

		let owned = agent(&f, actor).await;
		let via_org = agent(&f, owner).await;
		let via_user = agent(&f, owner).await;
		let unusable = agent(&f, owner).await;
		let _hidden = agent(&f, owner).await;

		for (record, scope, perms) in [
			(&via_org, GrantScope::Organization(org), GrantPermissions::use_only()),
			(&via_user, GrantScope::User(actor), GrantPermissions::all()),
			(&unusable, GrantScope::User(actor), GrantPermissions::none()),
		] {
			f.grants
				.upsert_grant(&GrantRecord::new(
					ResourceType::Agent,
					record.id,
					scope,
					perms,
					owner,
				))
				.await
				.unwrap();
		}

		let listed = f
			.access
			.list_accessible(actor, ResourceType::Agent)
			.await
			.unwrap();
		let tags: Vec<(ResourceId, AccessType)> =
			listed.iter().map(|r| (r.resource_id, r.access_type)).collect();
		assert_eq!(
			tags,
			vec![
				(owned.id, AccessType::Owned),
				(via_org.id, AccessType::Organization),
				(via_user.id, AccessType::Shared),
			]
		);
		assert_eq!(listed[2].permissions, GrantPermissions::all());
	}

	#[tokio::test]
	async fn test_list_accessible_sets_are_disjoint() {
		let f = fixture().await;
		let actor = UserId::generate();
		let owner = UserId::generate();
		let org = OrgId::generate();
		f.orgs
			.add_member(&OrgMembership {
				organization_id: org,
				user_id: actor,
				role: OrgRole::AccountOwner,
				permissions: Vec::new(),
			})
			.await
			.unwrap();

		let own = agent(&f, actor).await;
		let both = agent(&f, owner).await;
		for (record, scope, granted_by) in [
			(&own, GrantScope::Organization(org), actor),
			(&own, GrantScope::User(actor), actor),
			(&both, GrantScope::Organization(org), owner),
			(&both, GrantScope::User(actor), owner),
		] {
			f.grants
				.upsert_grant(&GrantRecord::new(
					ResourceType::Agent,
					record.id,
					scope,
					GrantPermissions::use_only(),
					granted_by,
				))
				.await
				.unwrap();
		}

		let listed = f
			.access
			.list_accessible(actor, ResourceType::Agent)
			.await
			.unwrap();
		let tags: Vec<(ResourceId, AccessType)> =
			listed.iter().map(|r| (r.resource_id, r.access_type)).collect();
		assert_eq!(
			tags,
			vec![
				(own.id, AccessType::Owned),
				(both.id, AccessType::Organization),
			]
		);
	}

	#[tokio::test]
	async fn test_storage_errors_map_to_authz_storage() {
		let f = fixture().await;
		sqlx::query("DROP TABLE resource_grants")
			.execute(&f.access.pool)
			.await
			.unwrap();

		let err = AccessStore::get_grant(
			&f.access,
			ResourceType::Agent,
			ResourceId::generate(),
			GrantScope::User(UserId::generate()),
		)
		.await
		.unwrap_err();
		assert_eq!(err.code(), "storage_unavailable");
	}
}
