// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource repository.
//!
//! Only the columns access control needs are modelled: type, owner, name and
//! visibility. Deleting a resource removes its grants through the foreign key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use warden_auth::{
	ResourceId, ResourceRef, ResourceType, UserId, Visibility, VisibilityFilter, VisibilityPolicy,
};

use crate::error::DbError;
use crate::row::{parse_id, parse_resource_type, parse_timestamp};

/// A stored resource row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
	pub id: ResourceId,
	pub resource_type: ResourceType,
	pub owner_id: UserId,
	pub name: String,
	pub visibility: Visibility,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
	pub fn new(
		resource_type: ResourceType,
		owner_id: UserId,
		name: impl Into<String>,
		visibility: Visibility,
	) -> Self {
		let now = Utc::now();
		Self {
			id: ResourceId::generate(),
			resource_type,
			owner_id,
			name: name.into(),
			visibility,
			created_at: now,
			updated_at: now,
		}
	}

	pub fn to_ref(&self) -> ResourceRef {
		ResourceRef {
			id: self.id,
			resource_type: self.resource_type,
			owner_id: self.owner_id,
			visibility: self.visibility,
		}
	}
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
	async fn create_resource(&self, resource: &ResourceRecord) -> Result<(), DbError>;
	async fn get_resource(
		&self,
		resource_type: ResourceType,
		id: ResourceId,
	) -> Result<Option<ResourceRecord>, DbError>;
	async fn update_visibility(
		&self,
		resource_type: ResourceType,
		id: ResourceId,
		visibility: Visibility,
	) -> Result<(), DbError>;
	async fn delete_resource(&self, resource_type: ResourceType, id: ResourceId)
		-> Result<(), DbError>;
	async fn list_visible(
		&self,
		actor_id: UserId,
		resource_type: ResourceType,
	) -> Result<Vec<ResourceRecord>, DbError>;
}

#[derive(Clone)]
pub struct ResourceRepository {
	pool: SqlitePool,
}

impl ResourceRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert a resource. Visibility values the type does not allow are
	/// stored as `private`.
	#[tracing::instrument(skip(self, resource), fields(resource_id = %resource.id, resource_type = %resource.resource_type))]
	pub async fn create_resource(&self, resource: &ResourceRecord) -> Result<(), DbError> {
		let visibility =
			Visibility::parse_for(resource.resource_type, Some(resource.visibility.as_str()));
		sqlx::query(
			r#"
			INSERT INTO resources (id, resource_type, owner_id, name, visibility, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(resource.id.to_string())
		.bind(resource.resource_type.as_str())
		.bind(resource.owner_id.to_string())
		.bind(&resource.name)
		.bind(visibility.as_str())
		.bind(resource.created_at.to_rfc3339())
		.bind(resource.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
				DbError::Conflict("Resource already exists".to_string())
			}
			_ => DbError::Sqlx(e),
		})?;

		tracing::debug!(resource_id = %resource.id, "resource created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(resource_id = %id))]
	pub async fn get_resource(
		&self,
		resource_type: ResourceType,
		id: ResourceId,
	) -> Result<Option<ResourceRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, resource_type, owner_id, name, visibility, created_at, updated_at
			FROM resources
			WHERE id = ? AND resource_type = ?
			"#,
		)
		.bind(id.to_string())
		.bind(resource_type.as_str())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_resource(&r)).transpose()
	}

	/// Set a resource's visibility.
	///
	/// # Errors
	/// `DbError::Conflict` if the value is not legal for the type,
	/// `DbError::NotFound` if the resource does not exist.
	#[tracing::instrument(skip(self), fields(resource_id = %id, visibility = %visibility))]
	pub async fn update_visibility(
		&self,
		resource_type: ResourceType,
		id: ResourceId,
		visibility: Visibility,
	) -> Result<(), DbError> {
		if Visibility::parse_for(resource_type, Some(visibility.as_str())) != visibility {
			return Err(DbError::Conflict(format!(
				"Visibility '{visibility}' is not allowed for {resource_type}"
			)));
		}

		let result = sqlx::query(
			r#"
			UPDATE resources
			SET visibility = ?, updated_at = ?
			WHERE id = ? AND resource_type = ?
			"#,
		)
		.bind(visibility.as_str())
		.bind(Utc::now().to_rfc3339())
		.bind(id.to_string())
		.bind(resource_type.as_str())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound("Resource not found".to_string()));
		}

		Ok(())
	}

	#[tracing::instrument(skip(self), fields(resource_id = %id))]
	pub async fn delete_resource(
		&self,
		resource_type: ResourceType,
		id: ResourceId,
	) -> Result<(), DbError> {
		let result = sqlx::query("DELETE FROM resources WHERE id = ? AND resource_type = ?")
			.bind(id.to_string())
			.bind(resource_type.as_str())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound("Resource not found".to_string()));
		}

		tracing::debug!(resource_id = %id, "resource deleted");
		Ok(())
	}

	/// Resources of one type the actor owns or that are not private.
	///
	/// Stored values the type does not recognize count as private.
	#[tracing::instrument(skip(self), fields(actor_id = %actor_id, resource_type = %resource_type))]
	pub async fn list_visible(
		&self,
		actor_id: UserId,
		resource_type: ResourceType,
	) -> Result<Vec<ResourceRecord>, DbError> {
		let sql = format!(
			r#"
			SELECT id, resource_type, owner_id, name, visibility, created_at, updated_at
			FROM resources
			WHERE resource_type = ? AND {}
			ORDER BY created_at, id
			"#,
			VisibilityFilter::sql(&VisibilityPolicy::standard(), resource_type)
		);
		let rows = sqlx::query(&sql)
			.bind(resource_type.as_str())
			.bind(actor_id.to_string())
			.fetch_all(&self.pool)
			.await?;

		rows.iter().map(row_to_resource).collect()
	}
}

fn row_to_resource(row: &sqlx::sqlite::SqliteRow) -> Result<ResourceRecord, DbError> {
	let id: String = row.get("id");
	let resource_type: String = row.get("resource_type");
	let owner_id: String = row.get("owner_id");
	let visibility: String = row.get("visibility");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	let resource_type = parse_resource_type(&resource_type)?;
	Ok(ResourceRecord {
		id: parse_id(&id, "resource id")?,
		resource_type,
		owner_id: parse_id(&owner_id, "owner_id")?,
		name: row.get("name"),
		visibility: Visibility::parse_for(resource_type, Some(&visibility)),
		created_at: parse_timestamp(&created_at, "created_at")?,
		updated_at: parse_timestamp(&updated_at, "updated_at")?,
	})
}

#[async_trait]
impl ResourceStore for ResourceRepository {
	async fn create_resource(&self, resource: &ResourceRecord) -> Result<(), DbError> {
		self.create_resource(resource).await
	}

	async fn get_resource(
		&self,
		resource_type: ResourceType,
		id: ResourceId,
	) -> Result<Option<ResourceRecord>, DbError> {
		self.get_resource(resource_type, id).await
	}

	async fn update_visibility(
		&self,
		resource_type: ResourceType,
		id: ResourceId,
		visibility: Visibility,
	) -> Result<(), DbError> {
		self.update_visibility(resource_type, id, visibility).await
	}

	async fn delete_resource(
		&self,
		resource_type: ResourceType,
		id: ResourceId,
	) -> Result<(), DbError> {
		self.delete_resource(resource_type, id).await
	}

	async fn list_visible(
		&self,
		actor_id: UserId,
		resource_type: ResourceType,
	) -> Result<Vec<ResourceRecord>, DbError> {
		self.list_visible(actor_id, resource_type).await
	}
}
