// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Table definitions.
//!
//! `resource_grants` carries the sharing invariants at the storage layer:
//! exactly one of `organization_id` / `user_id`, one grant per resource and
//! scope, and removal together with the resource.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const RESOURCES: &str = r#"
	CREATE TABLE IF NOT EXISTS resources (
		id TEXT PRIMARY KEY,
		resource_type TEXT NOT NULL,
		owner_id TEXT NOT NULL,
		name TEXT NOT NULL,
		visibility TEXT NOT NULL DEFAULT 'private',
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL
	)
"#;

const RESOURCES_OWNER_INDEX: &str = r#"
	CREATE INDEX IF NOT EXISTS idx_resources_type_owner
	ON resources (resource_type, owner_id)
"#;

const ORGANIZATION_MEMBERS: &str = r#"
	CREATE TABLE IF NOT EXISTS organization_members (
		organization_id TEXT NOT NULL,
		user_id TEXT NOT NULL,
		role TEXT NOT NULL DEFAULT 'subuser',
		permissions TEXT NOT NULL DEFAULT '[]',
		created_at TEXT NOT NULL,
		PRIMARY KEY (organization_id, user_id)
	)
"#;

const ORGANIZATION_MEMBERS_USER_INDEX: &str = r#"
	CREATE INDEX IF NOT EXISTS idx_organization_members_user
	ON organization_members (user_id, created_at)
"#;

const RESOURCE_GRANTS: &str = r#"
	CREATE TABLE IF NOT EXISTS resource_grants (
		id TEXT PRIMARY KEY,
		resource_type TEXT NOT NULL,
		resource_id TEXT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
		organization_id TEXT,
		user_id TEXT,
		can_use INTEGER NOT NULL DEFAULT 1,
		can_edit INTEGER NOT NULL DEFAULT 0,
		can_delete INTEGER NOT NULL DEFAULT 0,
		can_share INTEGER NOT NULL DEFAULT 0,
		granted_by TEXT NOT NULL,
		granted_at TEXT NOT NULL,
		CHECK ((organization_id IS NULL) <> (user_id IS NULL)),
		UNIQUE (resource_type, resource_id, organization_id),
		UNIQUE (resource_type, resource_id, user_id)
	)
"#;

/// Creates every table and index if missing.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for statement in [
		RESOURCES,
		RESOURCES_OWNER_INDEX,
		ORGANIZATION_MEMBERS,
		ORGANIZATION_MEMBERS_USER_INDEX,
		RESOURCE_GRANTS,
	] {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!("migrations applied");
	Ok(())
}
