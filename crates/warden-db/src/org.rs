// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organization membership repository.
//!
//! Grant resolution consults only a user's earliest membership; see
//! [`OrgRepository::get_first_membership`].

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use warden_auth::{OrgId, OrgMembership, UserId};

use crate::error::DbError;
use crate::row::{parse_id, parse_org_role};

#[async_trait]
pub trait OrgStore: Send + Sync {
	async fn add_member(&self, membership: &OrgMembership) -> Result<(), DbError>;
	async fn remove_member(&self, org_id: OrgId, user_id: UserId) -> Result<(), DbError>;
	async fn get_first_membership(&self, user_id: UserId) -> Result<Option<OrgMembership>, DbError>;
	async fn list_members(&self, org_id: OrgId) -> Result<Vec<OrgMembership>, DbError>;
}

#[derive(Clone)]
pub struct OrgRepository {
	pool: SqlitePool,
}

impl OrgRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Add a user to an organization.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the user is already a member.
	#[tracing::instrument(skip(self, membership), fields(org_id = %membership.organization_id, user_id = %membership.user_id))]
	pub async fn add_member(&self, membership: &OrgMembership) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO organization_members (organization_id, user_id, role, permissions, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(membership.organization_id.to_string())
		.bind(membership.user_id.to_string())
		.bind(membership.role.as_str())
		.bind(serde_json::to_string(&membership.permissions)?)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
				DbError::Conflict("User is already a member".to_string())
			}
			_ => DbError::Sqlx(e),
		})?;

		tracing::debug!("member added");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id))]
	pub async fn remove_member(&self, org_id: OrgId, user_id: UserId) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM organization_members
			WHERE organization_id = ? AND user_id = ?
			"#,
		)
		.bind(org_id.to_string())
		.bind(user_id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound("Membership not found".to_string()));
		}

		Ok(())
	}

	/// The user's earliest membership, by join time.
	///
	/// Users are assumed to belong to at most one organization; later
	/// memberships are ignored by grant resolution.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn get_first_membership(
		&self,
		user_id: UserId,
	) -> Result<Option<OrgMembership>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT organization_id, user_id, role, permissions
			FROM organization_members
			WHERE user_id = ?
			ORDER BY created_at ASC, rowid ASC
			LIMIT 1
			"#,
		)
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_membership(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	pub async fn list_members(&self, org_id: OrgId) -> Result<Vec<OrgMembership>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT organization_id, user_id, role, permissions
			FROM organization_members
			WHERE organization_id = ?
			ORDER BY created_at ASC, rowid ASC
			"#,
		)
		.bind(org_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_membership).collect()
	}
}

fn row_to_membership(row: &sqlx::sqlite::SqliteRow) -> Result<OrgMembership, DbError> {
	let org_id: String = row.get("organization_id");
	let user_id: String = row.get("user_id");
	let role: String = row.get("role");
	let permissions: String = row.get("permissions");

	Ok(OrgMembership {
		organization_id: parse_id(&org_id, "organization_id")?,
		user_id: parse_id(&user_id, "user_id")?,
		role: parse_org_role(&role)?,
		permissions: serde_json::from_str(&permissions)?,
	})
}

#[async_trait]
impl OrgStore for OrgRepository {
	async fn add_member(&self, membership: &OrgMembership) -> Result<(), DbError> {
		self.add_member(membership).await
	}

	async fn remove_member(&self, org_id: OrgId, user_id: UserId) -> Result<(), DbError> {
		self.remove_member(org_id, user_id).await
	}

	async fn get_first_membership(&self, user_id: UserId) -> Result<Option<OrgMembership>, DbError> {
		self.get_first_membership(user_id).await
	}

	async fn list_members(&self, org_id: OrgId) -> Result<Vec<OrgMembership>, DbError> {
		self.list_members(org_id).await
	}
}
