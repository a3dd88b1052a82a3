// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The authenticated principal a decision is made for.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::role::RoleNormalizer;
use crate::types::{Role, UserId};

/// An authenticated user with a normalized role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
	pub id: UserId,
	pub role: Role,
}

impl Actor {
	pub fn new(id: UserId, role: Role) -> Self {
		Self { id, role }
	}

	/// Builds an actor from session claims, normalizing the raw role string.
	pub fn from_claims(id: UserId, raw_role: Option<&str>, normalizer: &RoleNormalizer) -> Self {
		Self {
			id,
			role: normalizer.normalize(raw_role),
		}
	}

	pub fn is_admin(&self) -> bool {
		self.role.is_admin()
	}
}

/// Resolves the actor for the current request.
///
/// Returning `None` means the request is unauthenticated.
#[async_trait]
pub trait ActorSource: Send + Sync {
	async fn current_actor(&self) -> Option<Actor>;
}

#[async_trait]
impl ActorSource for Option<Actor> {
	async fn current_actor(&self) -> Option<Actor> {
		*self
	}
}
