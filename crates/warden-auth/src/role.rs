// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role string normalization.
//!
//! Federated logins round-trip role claims through a delimited namespace
//! (`google:editor`, `tenant:sso:admin`). Normalization reduces any raw value
//! to a [`Role`] exactly once, before any permission check runs.
//!
//! Normalization is total: malformed, empty and unknown values become
//! [`Role::User`]. It never fails open to an elevated role.

use tracing::warn;

use crate::types::Role;

/// Default separator between a provider prefix and the role name.
pub const DEFAULT_ROLE_DELIMITER: char = ':';

/// Parses raw role identifiers into [`Role`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleNormalizer {
	delimiter: char,
}

impl Default for RoleNormalizer {
	fn default() -> Self {
		Self::new(DEFAULT_ROLE_DELIMITER)
	}
}

impl RoleNormalizer {
	pub fn new(delimiter: char) -> Self {
		Self { delimiter }
	}

	pub fn delimiter(&self) -> char {
		self.delimiter
	}

	/// Normalizes a raw role value.
	///
	/// Only the segment after the last delimiter is considered.
	pub fn normalize(&self, raw: Option<&str>) -> Role {
		let Some(raw) = raw else {
			return Role::User;
		};

		let segment = match raw.rfind(self.delimiter) {
			Some(idx) => &raw[idx + self.delimiter.len_utf8()..],
			None => raw,
		};

		match segment.trim().to_lowercase().as_str() {
			"admin" => Role::Admin,
			"editor" => Role::Editor,
			"user" => Role::User,
			"" if raw.trim().is_empty() => Role::User,
			_ => {
				warn!(raw_role = %raw, "unrecognized role, falling back to user");
				Role::User
			}
		}
	}
}

/// Normalizes with the default `:` delimiter.
pub fn normalize_role(raw: Option<&str>) -> Role {
	RoleNormalizer::default().normalize(raw)
}
