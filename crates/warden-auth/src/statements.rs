// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role registry and statement evaluation.
//!
//! The registry maps each [`Role`] to the set of [`Action`]s it may perform on
//! each [`ResourceType`]. It is built once at startup, never mutated, and
//! shared by reference (usually as `Arc<RoleRegistry>`) with whatever needs
//! it. There is no global instance.
//!
//! Statements answer the coarse question "may this role do X to things of
//! type Y". Instance-level questions go through [`crate::GrantResolver`].

use std::collections::{BTreeSet, HashMap};

use tracing::instrument;

use crate::types::{Action, ResourceType, Role};

/// Set of actions a role may perform on one resource type.
pub type Statement = BTreeSet<Action>;

const USER_MANAGEMENT: &[Action] = &[
	Action::Create,
	Action::List,
	Action::View,
	Action::Update,
	Action::Delete,
	Action::SetRole,
	Action::Ban,
	Action::Impersonate,
	Action::SetPassword,
];

const SESSION_MANAGEMENT: &[Action] = &[Action::List, Action::Revoke, Action::Delete];

const READ_AND_USE: &[Action] = &[Action::View, Action::Use, Action::List];

/// Immutable role to statement table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRegistry {
	statements: HashMap<Role, HashMap<ResourceType, Statement>>,
}

impl Default for RoleRegistry {
	fn default() -> Self {
		Self::standard()
	}
}

impl RoleRegistry {
	/// Builds the standard statement table.
	///
	/// - `admin`: every application action on every application type, plus
	///   user and session management
	/// - `editor`: every application action, no identity management
	/// - `user`: view/use/list on agents, workflows and connectors; full
	///   control over chats, which are self-owned
	pub fn standard() -> Self {
		let app_types = [
			ResourceType::Agent,
			ResourceType::Workflow,
			ResourceType::Mcp,
			ResourceType::Chat,
			ResourceType::TemporaryChat,
		];

		let mut admin = HashMap::new();
		let mut editor = HashMap::new();
		let mut user = HashMap::new();

		for resource_type in app_types {
			admin.insert(resource_type, statement(Action::application()));
			editor.insert(resource_type, statement(Action::application()));
			let user_actions = if resource_type.is_shareable() {
				READ_AND_USE
			} else {
				Action::application()
			};
			user.insert(resource_type, statement(user_actions));
		}

		admin.insert(ResourceType::User, statement(USER_MANAGEMENT));
		admin.insert(ResourceType::Session, statement(SESSION_MANAGEMENT));

		Self {
			statements: HashMap::from([
				(Role::Admin, admin),
				(Role::Editor, editor),
				(Role::User, user),
			]),
		}
	}

	/// Builds a registry from an explicit table. Missing entries deny.
	pub fn from_statements(
		statements: impl IntoIterator<Item = (Role, ResourceType, Statement)>,
	) -> Self {
		let mut table: HashMap<Role, HashMap<ResourceType, Statement>> = HashMap::new();
		for (role, resource_type, actions) in statements {
			table
				.entry(role)
				.or_default()
				.entry(resource_type)
				.or_default()
				.extend(actions);
		}
		Self { statements: table }
	}

	/// Returns true iff `role` may perform `action` on `resource_type`.
	#[instrument(level = "trace", skip(self), ret)]
	pub fn has_permission(&self, role: Role, action: Action, resource_type: ResourceType) -> bool {
		self
			.statement(role, resource_type)
			.is_some_and(|actions| actions.contains(&action))
	}

	/// The statement for a role and resource type, if any.
	pub fn statement(&self, role: Role, resource_type: ResourceType) -> Option<&Statement> {
		self
			.statements
			.get(&role)
			.and_then(|by_type| by_type.get(&resource_type))
	}

	/// The allowed actions for a role and resource type; empty when absent.
	pub fn statements(&self, role: Role, resource_type: ResourceType) -> Vec<Action> {
		self
			.statement(role, resource_type)
			.map(|actions| actions.iter().copied().collect())
			.unwrap_or_default()
	}

	/// Roles that may perform `action` on `resource_type`.
	pub fn roles_with(&self, action: Action, resource_type: ResourceType) -> Vec<Role> {
		Role::all()
			.iter()
			.copied()
			.filter(|role| self.has_permission(*role, action, resource_type))
			.collect()
	}
}

fn statement(actions: &[Action]) -> Statement {
	actions.iter().copied().collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn registry() -> RoleRegistry {
		RoleRegistry::standard()
	}

	mod user_role {
		use super::*;

		#[test]
		fn can_view_use_and_list_agents() {
			let registry = registry();
			assert!(registry.has_permission(Role::User, Action::View, ResourceType::Agent));
			assert!(registry.has_permission(Role::User, Action::Use, ResourceType::Agent));
			assert!(registry.has_permission(Role::User, Action::List, ResourceType::Agent));
		}

		#[test]
		fn cannot_mutate_agents() {
			let registry = registry();
			for action in [Action::Create, Action::Update, Action::Delete, Action::Share] {
				assert!(
					!registry.has_permission(Role::User, action, ResourceType::Agent),
					"user should not {action} agents"
				);
			}
		}

		#[test]
		fn has_full_control_over_chats() {
			let registry = registry();
			for action in Action::application() {
				assert!(registry.has_permission(Role::User, *action, ResourceType::Chat));
				assert!(registry.has_permission(Role::User, *action, ResourceType::TemporaryChat));
			}
		}

		#[test]
		fn has_no_identity_statements() {
			let registry = registry();
			assert!(registry.statements(Role::User, ResourceType::User).is_empty());
			assert!(registry.statements(Role::User, ResourceType::Session).is_empty());
		}
	}

	mod editor_role {
		use super::*;

		#[test]
		fn can_use_connectors() {
			assert!(registry().has_permission(Role::Editor, Action::Use, ResourceType::Mcp));
		}

		#[test]
		fn has_full_application_statements() {
			let registry = registry();
			for resource_type in ResourceType::all().iter().filter(|t| !t.is_identity()) {
				for action in Action::application() {
					assert!(registry.has_permission(Role::Editor, *action, *resource_type));
				}
			}
		}

		#[test]
		fn has_no_identity_statements() {
			let registry = registry();
			assert!(registry.statements(Role::Editor, ResourceType::User).is_empty());
			assert!(registry.statements(Role::Editor, ResourceType::Session).is_empty());
			assert!(!registry.has_permission(Role::Editor, Action::Delete, ResourceType::User));
		}
	}

	mod admin_role {
		use super::*;

		#[test]
		fn allows_every_defined_pair() {
			let registry = registry();
			for resource_type in ResourceType::all() {
				let actions = registry.statements(Role::Admin, *resource_type);
				assert!(!actions.is_empty(), "admin has no {resource_type} statement");
				for action in actions {
					assert!(registry.has_permission(Role::Admin, action, *resource_type));
				}
			}
		}

		#[test]
		fn manages_users_and_sessions() {
			let registry = registry();
			assert!(registry.has_permission(Role::Admin, Action::SetRole, ResourceType::User));
			assert!(registry.has_permission(Role::Admin, Action::Ban, ResourceType::User));
			assert!(registry.has_permission(Role::Admin, Action::Delete, ResourceType::User));
			assert!(registry.has_permission(Role::Admin, Action::Revoke, ResourceType::Session));
		}

		#[test]
		fn session_statements_exclude_user_only_actions() {
			assert!(!registry().has_permission(Role::Admin, Action::Ban, ResourceType::Session));
		}
	}

	#[test]
	fn missing_entries_deny() {
		let registry = RoleRegistry::from_statements([(
			Role::Editor,
			ResourceType::Agent,
			statement(&[Action::View]),
		)]);
		assert!(registry.has_permission(Role::Editor, Action::View, ResourceType::Agent));
		assert!(!registry.has_permission(Role::Editor, Action::Use, ResourceType::Agent));
		assert!(!registry.has_permission(Role::Admin, Action::View, ResourceType::Agent));
	}

	#[test]
	fn roles_with_lists_every_holder() {
		let registry = registry();
		assert_eq!(
			registry.roles_with(Action::Create, ResourceType::Agent),
			vec![Role::Admin, Role::Editor]
		);
		assert_eq!(
			registry.roles_with(Action::SetRole, ResourceType::User),
			vec![Role::Admin]
		);
	}

	fn arb_role() -> impl Strategy<Value = Role> {
		prop_oneof![Just(Role::Admin), Just(Role::Editor), Just(Role::User)]
	}

	fn arb_action() -> impl Strategy<Value = Action> {
		proptest::sample::select(Action::all().to_vec())
	}

	fn arb_resource_type() -> impl Strategy<Value = ResourceType> {
		proptest::sample::select(ResourceType::all().to_vec())
	}

	proptest! {
			#[test]
			fn evaluation_is_deterministic(
					role in arb_role(),
					action in arb_action(),
					resource_type in arb_resource_type(),
			) {
					let registry = registry();
					let first = registry.has_permission(role, action, resource_type);
					let second = registry.has_permission(role, action, resource_type);
					prop_assert_eq!(first, second);
			}

			#[test]
			fn roles_are_monotonic(
					action in arb_action(),
					resource_type in arb_resource_type(),
			) {
					let registry = registry();
					if registry.has_permission(Role::User, action, resource_type) {
							prop_assert!(registry.has_permission(Role::Editor, action, resource_type));
					}
					if registry.has_permission(Role::Editor, action, resource_type) {
							prop_assert!(registry.has_permission(Role::Admin, action, resource_type));
					}
			}

			#[test]
			fn only_admin_touches_identity_types(
					role in arb_role(),
					action in arb_action(),
			) {
					let registry = registry();
					if role != Role::Admin {
							prop_assert!(!registry.has_permission(role, action, ResourceType::User));
							prop_assert!(!registry.has_permission(role, action, ResourceType::Session));
					}
			}
	}
}
