// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Column decoding shared by the repositories.
//!
//! IDs are UUIDs stored as TEXT, timestamps are RFC 3339 TEXT, booleans are
//! INTEGER 0/1.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use warden_auth::{OrgRole, ResourceType};

use crate::error::DbError;

pub(crate) fn parse_id<T: From<Uuid>>(value: &str, column: &str) -> Result<T, DbError> {
	Uuid::parse_str(value)
		.map(T::from)
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

pub(crate) fn parse_optional_id<T: From<Uuid>>(
	value: Option<String>,
	column: &str,
) -> Result<Option<T>, DbError> {
	value.map(|v| parse_id(&v, column)).transpose()
}

pub(crate) fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

pub(crate) fn parse_resource_type(value: &str) -> Result<ResourceType, DbError> {
	value
		.parse()
		.map_err(|e| DbError::Internal(format!("Invalid resource_type: {e}")))
}

pub(crate) fn parse_org_role(value: &str) -> Result<OrgRole, DbError> {
	value
		.parse()
		.map_err(|e| DbError::Internal(format!("Invalid role: {e}")))
}
