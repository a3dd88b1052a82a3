// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization engine configuration.

use serde::Deserialize;

const DEFAULT_ROLE_DELIMITER: &str = ":";
const DEFAULT_ENVIRONMENT: &str = "development";

/// Authorization configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct AuthzConfig {
	/// Separator between a role prefix and the role name in identity claims.
	pub role_delimiter: String,
	/// Reject malformed action or resource-type strings instead of denying them.
	pub strict_input: bool,
	pub environment: String,
}

impl AuthzConfig {
	/// First character of the configured delimiter.
	///
	/// Validation guarantees exactly one non-whitespace character.
	pub fn delimiter(&self) -> char {
		self.role_delimiter.chars().next().unwrap_or(':')
	}

	pub fn is_production(&self) -> bool {
		self.environment == "production"
	}
}

impl Default for AuthzConfig {
	fn default() -> Self {
		Self {
			role_delimiter: DEFAULT_ROLE_DELIMITER.to_string(),
			strict_input: cfg!(debug_assertions),
			environment: DEFAULT_ENVIRONMENT.to_string(),
		}
	}
}

/// Authorization configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthzConfigLayer {
	#[serde(default)]
	pub role_delimiter: Option<String>,
	#[serde(default)]
	pub strict_input: Option<bool>,
	#[serde(default)]
	pub environment: Option<String>,
}

impl AuthzConfigLayer {
	pub fn merge(&mut self, other: AuthzConfigLayer) {
		if other.role_delimiter.is_some() {
			self.role_delimiter = other.role_delimiter;
		}
		if other.strict_input.is_some() {
			self.strict_input = other.strict_input;
		}
		if other.environment.is_some() {
			self.environment = other.environment;
		}
	}

	/// Unset `strict_input` follows the build profile, except in production
	/// where it is off.
	pub fn finalize(self) -> AuthzConfig {
		let defaults = AuthzConfig::default();
		let environment = self.environment.unwrap_or(defaults.environment);
		let strict_input = self
			.strict_input
			.unwrap_or(defaults.strict_input && environment != "production");
		AuthzConfig {
			role_delimiter: self.role_delimiter.unwrap_or(defaults.role_delimiter),
			strict_input,
			environment,
		}
	}
}
