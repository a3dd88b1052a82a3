// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant repository.
//!
//! A grant row is keyed by resource and scope. Writes for the same key are
//! last-writer-wins; a grant is never written for a missing resource.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};
use warden_auth::{
	AuthzError, GrantPermissions, GrantRecord, GrantScope, GrantStore, ResourceId, ResourceType,
};

use crate::error::DbError;
use crate::row::{parse_id, parse_optional_id, parse_resource_type, parse_timestamp};

const GRANT_COLUMNS: &str = "id, resource_type, resource_id, organization_id, user_id, \
	can_use, can_edit, can_delete, can_share, granted_by, granted_at";

#[derive(Clone)]
pub struct GrantRepository {
	pool: SqlitePool,
}

impl GrantRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create or replace the grant for `grant.scope`.
	///
	/// Runs in one transaction with the existence check, so a grant never
	/// outlives its resource.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if the resource does not exist.
	#[tracing::instrument(
		skip(self, grant),
		fields(resource_id = %grant.resource_id, resource_type = %grant.resource_type, scope = %grant.scope)
	)]
	pub async fn upsert_grant(&self, grant: &GrantRecord) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;

		let exists = sqlx::query("SELECT 1 FROM resources WHERE id = ? AND resource_type = ?")
			.bind(grant.resource_id.to_string())
			.bind(grant.resource_type.as_str())
			.fetch_optional(&mut *tx)
			.await?
			.is_some();
		if !exists {
			return Err(DbError::NotFound("Resource not found".to_string()));
		}

		let conflict_target = match grant.scope {
			GrantScope::Organization(_) => "organization_id",
			GrantScope::User(_) => "user_id",
		};
		let sql = format!(
			r#"
			INSERT INTO resource_grants ({GRANT_COLUMNS})
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT (resource_type, resource_id, {conflict_target}) DO UPDATE SET
				id = excluded.id,
				can_use = excluded.can_use,
				can_edit = excluded.can_edit,
				can_delete = excluded.can_delete,
				can_share = excluded.can_share,
				granted_by = excluded.granted_by,
				granted_at = excluded.granted_at
			"#
		);
		sqlx::query(&sql)
			.bind(grant.id.to_string())
			.bind(grant.resource_type.as_str())
			.bind(grant.resource_id.to_string())
			.bind(grant.scope.organization_id().map(|id| id.to_string()))
			.bind(grant.scope.user_id().map(|id| id.to_string()))
			.bind(grant.permissions.can_use as i32)
			.bind(grant.permissions.can_edit as i32)
			.bind(grant.permissions.can_delete as i32)
			.bind(grant.permissions.can_share as i32)
			.bind(grant.granted_by.to_string())
			.bind(grant.granted_at.to_rfc3339())
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;
		tracing::debug!(grant_id = %grant.id, "grant upserted");
		Ok(())
	}

	/// Remove the grant for a scope. Returns false if none existed.
	#[tracing::instrument(skip(self), fields(resource_id = %resource_id, scope = %scope))]
	pub async fn revoke_grant(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
		scope: GrantScope,
	) -> Result<bool, DbError> {
		let (column, value) = scope_column(scope);
		let sql = format!(
			"DELETE FROM resource_grants WHERE resource_type = ? AND resource_id = ? AND {column} = ?"
		);
		let result = sqlx::query(&sql)
			.bind(resource_type.as_str())
			.bind(resource_id.to_string())
			.bind(value)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self), fields(resource_id = %resource_id, scope = %scope))]
	pub async fn get_grant(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
		scope: GrantScope,
	) -> Result<Option<GrantRecord>, DbError> {
		let (column, value) = scope_column(scope);
		let sql = format!(
			"SELECT {GRANT_COLUMNS} FROM resource_grants \
			 WHERE resource_type = ? AND resource_id = ? AND {column} = ?"
		);
		let row = sqlx::query(&sql)
			.bind(resource_type.as_str())
			.bind(resource_id.to_string())
			.bind(value)
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| row_to_grant(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(resource_id = %resource_id))]
	pub async fn list_grants(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
	) -> Result<Vec<GrantRecord>, DbError> {
		let sql = format!(
			"SELECT {GRANT_COLUMNS} FROM resource_grants \
			 WHERE resource_type = ? AND resource_id = ? \
			 ORDER BY granted_at, id"
		);
		let rows = sqlx::query(&sql)
			.bind(resource_type.as_str())
			.bind(resource_id.to_string())
			.fetch_all(&self.pool)
			.await?;

		rows.iter().map(row_to_grant).collect()
	}
}

fn scope_column(scope: GrantScope) -> (&'static str, String) {
	match scope {
		GrantScope::Organization(id) => ("organization_id", id.to_string()),
		GrantScope::User(id) => ("user_id", id.to_string()),
	}
}

pub(crate) fn row_to_permissions(row: &sqlx::sqlite::SqliteRow) -> GrantPermissions {
	let can_use: i32 = row.get("can_use");
	let can_edit: i32 = row.get("can_edit");
	let can_delete: i32 = row.get("can_delete");
	let can_share: i32 = row.get("can_share");
	GrantPermissions {
		can_use: can_use != 0,
		can_edit: can_edit != 0,
		can_delete: can_delete != 0,
		can_share: can_share != 0,
	}
}

fn row_to_grant(row: &sqlx::sqlite::SqliteRow) -> Result<GrantRecord, DbError> {
	let id: String = row.get("id");
	let resource_type: String = row.get("resource_type");
	let resource_id: String = row.get("resource_id");
	let organization_id: Option<String> = row.get("organization_id");
	let user_id: Option<String> = row.get("user_id");
	let granted_by: String = row.get("granted_by");
	let granted_at: String = row.get("granted_at");

	let scope = GrantScope::from_columns(
		parse_optional_id(organization_id, "organization_id")?,
		parse_optional_id(user_id, "user_id")?,
	)
	.ok_or_else(|| DbError::Internal(format!("Grant {id} has no single scope")))?;

	Ok(GrantRecord {
		id: parse_id(&id, "grant id")?,
		resource_type: parse_resource_type(&resource_type)?,
		resource_id: parse_id(&resource_id, "resource_id")?,
		scope,
		permissions: row_to_permissions(row),
		granted_by: parse_id(&granted_by, "granted_by")?,
		granted_at: parse_timestamp(&granted_at, "granted_at")?,
	})
}

#[async_trait]
impl GrantStore for GrantRepository {
	async fn upsert_grant(&self, grant: &GrantRecord) -> Result<(), AuthzError> {
		Ok(self.upsert_grant(grant).await?)
	}

	async fn revoke_grant(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
		scope: GrantScope,
	) -> Result<bool, AuthzError> {
		Ok(self.revoke_grant(resource_type, resource_id, scope).await?)
	}

	async fn list_grants(
		&self,
		resource_type: ResourceType,
		resource_id: ResourceId,
	) -> Result<Vec<GrantRecord>, AuthzError> {
		Ok(self.list_grants(resource_type, resource_id).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::resource::{ResourceRecord, ResourceRepository};
	use crate::testing::create_test_pool;
	use warden_auth::{OrgId, UserId, Visibility};

	async fn setup() -> (GrantRepository, ResourceRepository, ResourceRecord) {
		let pool = create_test_pool().await;
		let resources = ResourceRepository::new(pool.clone());
		let agent = ResourceRecord::new(ResourceType::Agent, UserId::generate(), "a", Visibility::Private);
		resources.create_resource(&agent).await.unwrap();
		(GrantRepository::new(pool), resources, agent)
	}

	fn grant(agent: &ResourceRecord, scope: GrantScope, permissions: GrantPermissions) -> GrantRecord {
		GrantRecord::new(agent.resource_type, agent.id, scope, permissions, agent.owner_id)
	}

	#[tokio::test]
	async fn test_upsert_and_get_grant() {
		let (repo, _, agent) = setup().await;
		let user = UserId::generate();
		let record = grant(&agent, GrantScope::User(user), GrantPermissions::use_only());
		repo.upsert_grant(&record).await.unwrap();

		let fetched = repo
			.get_grant(ResourceType::Agent, agent.id, GrantScope::User(user))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(fetched, record);
	}

	#[tokio::test]
	async fn test_upsert_replaces_existing_scope() {
		let (repo, _, agent) = setup().await;
		let org = OrgId::generate();
		repo
			.upsert_grant(&grant(&agent, GrantScope::Organization(org), GrantPermissions::use_only()))
			.await
			.unwrap();
		let replacement = grant(&agent, GrantScope::Organization(org), GrantPermissions::all());
		repo.upsert_grant(&replacement).await.unwrap();

		let grants = repo.list_grants(ResourceType::Agent, agent.id).await.unwrap();
		assert_eq!(grants.len(), 1);
		assert_eq!(grants[0].id, replacement.id);
		assert_eq!(grants[0].permissions, GrantPermissions::all());
	}

	#[tokio::test]
	async fn test_org_and_user_grants_coexist() {
		let (repo, _, agent) = setup().await;
		repo
			.upsert_grant(&grant(
				&agent,
				GrantScope::Organization(OrgId::generate()),
				GrantPermissions::use_only(),
			))
			.await
			.unwrap();
		repo
			.upsert_grant(&grant(
				&agent,
				GrantScope::User(UserId::generate()),
				GrantPermissions::use_only(),
			))
			.await
			.unwrap();

		assert_eq!(
			repo.list_grants(ResourceType::Agent, agent.id).await.unwrap().len(),
			2
		);
	}

	#[tokio::test]
	async fn test_upsert_for_missing_resource_is_not_found() {
		let (repo, _, agent) = setup().await;
		let mut record = grant(&agent, GrantScope::User(UserId::generate()), GrantPermissions::use_only());
		record.resource_id = ResourceId::generate();

		let err = repo.upsert_grant(&record).await.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_revoke_grant() {
		let (repo, _, agent) = setup().await;
		let user = UserId::generate();
		repo
			.upsert_grant(&grant(&agent, GrantScope::User(user), GrantPermissions::use_only()))
			.await
			.unwrap();

		assert!(repo
			.revoke_grant(ResourceType::Agent, agent.id, GrantScope::User(user))
			.await
			.unwrap());
		assert!(!repo
			.revoke_grant(ResourceType::Agent, agent.id, GrantScope::User(user))
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn test_deleting_resource_cascades_to_grants() {
		let (repo, resources, agent) = setup().await;
		let user = UserId::generate();
		repo
			.upsert_grant(&grant(&agent, GrantScope::User(user), GrantPermissions::use_only()))
			.await
			.unwrap();

		resources
			.delete_resource(ResourceType::Agent, agent.id)
			.await
			.unwrap();
		assert!(repo
			.list_grants(ResourceType::Agent, agent.id)
			.await
			.unwrap()
			.is_empty());
	}

	#[tokio::test]
	async fn test_stored_edit_flag_round_trips() {
		let (repo, _, agent) = setup().await;
		let user = UserId::generate();
		let perms = GrantPermissions {
			can_use: true,
			can_edit: true,
			can_delete: false,
			can_share: false,
		};
		repo
			.upsert_grant(&grant(&agent, GrantScope::User(user), perms))
			.await
			.unwrap();

		let fetched = repo
			.get_grant(ResourceType::Agent, agent.id, GrantScope::User(user))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(fetched.permissions, perms);
	}
}
