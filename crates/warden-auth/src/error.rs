// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Errors raised by the access engine.
//!
//! Policy outcomes are never errors; see [`crate::Decision`]. These variants
//! cover the conditions a caller must handle differently from a denial.

/// Exceptional conditions surfaced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
	/// No actor could be resolved for the request.
	#[error("Unauthenticated")]
	Unauthenticated,

	/// An unrecognized resource type, action or role value reached the engine.
	#[error("Malformed input: {0}")]
	MalformedInput(String),

	/// The backing store could not answer a lookup.
	#[error("Storage unavailable: {0}")]
	Storage(String),
}

impl AuthzError {
	/// Wraps any displayable store error.
	pub fn storage(err: impl std::fmt::Display) -> Self {
		AuthzError::Storage(err.to_string())
	}

	/// Stable code for callers mapping errors to responses.
	pub fn code(&self) -> &'static str {
		match self {
			AuthzError::Unauthenticated => "unauthenticated",
			AuthzError::MalformedInput(_) => "malformed_input",
			AuthzError::Storage(_) => "storage_unavailable",
		}
	}
}

pub type Result<T> = std::result::Result<T, AuthzError>;
