// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The access engine: the single entry point request handlers consult.
//!
//! A check runs in two stages:
//!
//! 1. **Statements** decide whether the actor's role may perform the class of
//!    action on the resource type at all.
//! 2. **Instance resolution** runs only when a specific resource is named. It
//!    combines ownership, visibility and grants.
//!
//! | action               | instance rule                                      |
//! |----------------------|----------------------------------------------------|
//! | `view`, `use`        | owner, non-private visibility, or usable grant     |
//! | `update`             | owner, or visibility granting write (`public`)     |
//! | `delete`, `share`    | owner only                                         |
//! | `create`, `list`     | statement only                                     |
//!
//! A mutation on an instance the actor cannot even see is reported as
//! [`DenyReason::NotFound`] so private resources do not leak through the error.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use crate::actor::{Actor, ActorSource};
use crate::audit::AuditSink;
use crate::decision::{Decision, DenyReason};
use crate::error::{AuthzError, Result};
use crate::grant::{AccessResult, AccessibleResource};
use crate::guard::{SelfActionGuard, UserAction};
use crate::resolver::GrantResolver;
use crate::role::RoleNormalizer;
use crate::statements::RoleRegistry;
use crate::store::AccessStore;
use crate::types::{Action, ResourceId, ResourceType, Role, UserId, Visibility};
use crate::visibility::{can_set_visibility, VisibilityPolicy};

#[derive(Clone)]
pub struct AccessEngine {
	registry: Arc<RoleRegistry>,
	resolver: GrantResolver,
	normalizer: RoleNormalizer,
	guard: SelfActionGuard,
	strict_input: bool,
}

impl AccessEngine {
	/// Builds an engine with the standard visibility policy, the default role
	/// delimiter and strict input handling in debug builds only.
	pub fn new(registry: Arc<RoleRegistry>, store: Arc<dyn AccessStore>) -> Self {
		Self {
			guard: SelfActionGuard::new(registry.clone()),
			registry,
			resolver: GrantResolver::new(store),
			normalizer: RoleNormalizer::default(),
			strict_input: cfg!(debug_assertions),
		}
	}

	pub fn with_normalizer(mut self, normalizer: RoleNormalizer) -> Self {
		self.normalizer = normalizer;
		self
	}

	pub fn with_strict_input(mut self, strict_input: bool) -> Self {
		self.strict_input = strict_input;
		self
	}

	/// Sink for refused self-targeted actions.
	pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
		self.guard = self.guard.with_audit_sink(audit);
		self
	}

	pub fn with_visibility_policy(mut self, policy: VisibilityPolicy) -> Self {
		self.resolver = self.resolver.with_visibility_policy(policy);
		self
	}

	pub fn registry(&self) -> &RoleRegistry {
		&self.registry
	}

	pub fn resolver(&self) -> &GrantResolver {
		&self.resolver
	}

	pub fn strict_input(&self) -> bool {
		self.strict_input
	}

	pub fn normalize_role(&self, raw: Option<&str>) -> Role {
		self.normalizer.normalize(raw)
	}

	pub fn has_statement_permission(
		&self,
		role: Role,
		action: Action,
		resource_type: ResourceType,
	) -> bool {
		self.registry.has_permission(role, action, resource_type)
	}

	pub async fn resolve_access(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<AccessResult> {
		self
			.resolver
			.resolve_access(actor_id, resource_id, resource_type)
			.await
	}

	pub async fn can_access(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<bool> {
		self
			.resolver
			.can_access(actor_id, resource_id, resource_type)
			.await
	}

	pub async fn can_view(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<bool> {
		self
			.resolver
			.can_view(actor_id, resource_id, resource_type)
			.await
	}

	pub async fn can_edit(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<bool> {
		self
			.resolver
			.can_edit(actor_id, resource_id, resource_type)
			.await
	}

	pub async fn can_delete(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<bool> {
		self
			.resolver
			.can_delete(actor_id, resource_id, resource_type)
			.await
	}

	pub async fn can_share(
		&self,
		actor_id: UserId,
		resource_id: ResourceId,
		resource_type: ResourceType,
	) -> Result<bool> {
		self
			.resolver
			.can_share(actor_id, resource_id, resource_type)
			.await
	}

	pub fn guard_self_action(
		&self,
		actor: &Actor,
		target_user_id: UserId,
		action: UserAction,
	) -> Decision {
		self.guard.guard(actor, target_user_id, action)
	}

	/// Decides whether `actor` may perform `action` on `resource_type`, and on
	/// the named instance if one is given.
	///
	/// Denials are values; only storage failures are errors.
	#[instrument(
		level = "debug",
		skip(self, actor),
		fields(actor_id = %actor.id, role = %actor.role, action = %action, resource_type = %resource_type)
	)]
	pub async fn authorize(
		&self,
		actor: &Actor,
		action: Action,
		resource_type: ResourceType,
		resource_id: Option<ResourceId>,
	) -> Result<Decision> {
		if !self
			.registry
			.has_permission(actor.role, action, resource_type)
		{
			debug!(reason = "statement_denied", "authorization denied");
			return Ok(Decision::Deny(DenyReason::StatementDenied));
		}

		let Some(resource_id) = resource_id else {
			return Ok(Decision::Allow);
		};
		if resource_type.is_identity() || matches!(action, Action::Create | Action::List) {
			return Ok(Decision::Allow);
		}

		let decision = self
			.authorize_instance(actor.id, action, resource_type, resource_id)
			.await?;
		debug!(resource_id = %resource_id, decision = ?decision, "authorization decided");
		Ok(decision)
	}

	async fn authorize_instance(
		&self,
		actor_id: UserId,
		action: Action,
		resource_type: ResourceType,
		resource_id: ResourceId,
	) -> Result<Decision> {
		let viewable = self
			.resolver
			.can_view(actor_id, resource_id, resource_type)
			.await?;
		if !viewable {
			return Ok(Decision::Deny(DenyReason::NotFound));
		}

		let allowed = match action {
			Action::Use | Action::View => true,
			Action::Update => {
				self
					.resolver
					.visibility_access(actor_id, resource_id, resource_type)
					.await?
					.write
			}
			Action::Delete => {
				self
					.resolver
					.can_delete(actor_id, resource_id, resource_type)
					.await?
			}
			Action::Share => {
				self
					.resolver
					.can_share(actor_id, resource_id, resource_type)
					.await?
			}
			_ => {
				self
					.resolver
					.is_owner(actor_id, resource_id, resource_type)
					.await?
			}
		};
		Ok(Decision::allow_if(allowed, DenyReason::NotOwner))
	}

	/// Like [`Self::authorize`], but storage failures deny.
	pub async fn authorize_or_deny(
		&self,
		actor: &Actor,
		action: Action,
		resource_type: ResourceType,
		resource_id: Option<ResourceId>,
	) -> Decision {
		match self
			.authorize(actor, action, resource_type, resource_id)
			.await
		{
			Ok(decision) => decision,
			Err(e) => {
				error!(
					error = %e,
					actor_id = %actor.id,
					action = %action,
					resource_type = %resource_type,
					"authorization failed, denying"
				);
				Decision::Deny(DenyReason::StorageUnavailable)
			}
		}
	}

	/// Authorizes from wire names.
	///
	/// Unknown names are [`AuthzError::MalformedInput`] in strict mode and a
	/// logged denial otherwise.
	pub async fn authorize_raw(
		&self,
		actor: &Actor,
		action: &str,
		resource_type: &str,
		resource_id: Option<ResourceId>,
	) -> Result<Decision> {
		let parsed = Action::from_str(action)
			.and_then(|a| ResourceType::from_str(resource_type).map(|t| (a, t)));
		match parsed {
			Ok((action, resource_type)) => {
				self
					.authorize(actor, action, resource_type, resource_id)
					.await
			}
			Err(e) if self.strict_input => Err(e),
			Err(e) => {
				warn!(error = %e, actor_id = %actor.id, "malformed authorization input, denying");
				Ok(Decision::Deny(DenyReason::StatementDenied))
			}
		}
	}

	/// Authorizes the actor of the current request.
	pub async fn authorize_current(
		&self,
		source: &dyn ActorSource,
		action: Action,
		resource_type: ResourceType,
		resource_id: Option<ResourceId>,
	) -> Result<Decision> {
		let actor = source
			.current_actor()
			.await
			.ok_or(AuthzError::Unauthenticated)?;
		self
			.authorize(&actor, action, resource_type, resource_id)
			.await
	}

	/// Decides whether `actor` may set `visibility` on a resource: the update
	/// statement, ownership (or admin), a legal value, and admin for featuring
	/// a connector.
	#[instrument(
		level = "debug",
		skip(self, actor),
		fields(actor_id = %actor.id, resource_id = %resource_id, visibility = %visibility)
	)]
	pub async fn authorize_visibility_change(
		&self,
		actor: &Actor,
		resource_type: ResourceType,
		resource_id: ResourceId,
		visibility: Visibility,
	) -> Result<Decision> {
		if !self
			.registry
			.has_permission(actor.role, Action::Update, resource_type)
		{
			return Ok(Decision::Deny(DenyReason::StatementDenied));
		}

		let Some(resource) = self.resolver.resource(resource_id, resource_type).await? else {
			return Ok(Decision::Deny(DenyReason::NotFound));
		};

		if resource.owner_id != actor.id && !actor.is_admin() {
			let viewable = self
				.resolver
				.can_view(actor.id, resource_id, resource_type)
				.await?;
			return Ok(Decision::Deny(if viewable {
				DenyReason::NotOwner
			} else {
				DenyReason::NotFound
			}));
		}

		Ok(can_set_visibility(
			self.resolver.visibility_policy(),
			actor.role,
			resource_type,
			visibility,
		))
	}

	/// Resources of one type the actor owns or holds a usable grant on.
	/// Empty when the role lacks the `list` statement.
	pub async fn list_accessible(
		&self,
		actor: &Actor,
		resource_type: ResourceType,
	) -> Result<Vec<AccessibleResource>> {
		if !self
			.registry
			.has_permission(actor.role, Action::List, resource_type)
		{
			return Ok(Vec::new());
		}
		self.resolver.list_accessible(actor.id, resource_type).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::grant::{AccessType, GrantPermissions, GrantScope};
	use crate::testing::MemoryStore;

	fn engine(store: &Arc<MemoryStore>) -> AccessEngine {
		AccessEngine::new(Arc::new(RoleRegistry::standard()), store.clone())
	}

	fn actor(role: Role) -> Actor {
		Actor::new(UserId::generate(), role)
	}

	mod statements {
		use super::*;

		#[tokio::test]
		async fn user_role_cannot_create_agents() {
			let store = Arc::new(MemoryStore::new());
			let decision = engine(&store)
				.authorize(&actor(Role::User), Action::Create, ResourceType::Agent, None)
				.await
				.unwrap();
			assert_eq!(decision, Decision::Deny(DenyReason::StatementDenied));
		}

		#[tokio::test]
		async fn type_level_check_allows_without_instance() {
			let store = Arc::new(MemoryStore::new());
			let decision = engine(&store)
				.authorize(&actor(Role::User), Action::List, ResourceType::Workflow, None)
				.await
				.unwrap();
			assert!(decision.is_allowed());
		}

		#[tokio::test]
		async fn editor_cannot_manage_users() {
			let store = Arc::new(MemoryStore::new());
			let decision = engine(&store)
				.authorize(&actor(Role::Editor), Action::Ban, ResourceType::User, None)
				.await
				.unwrap();
			assert_eq!(decision.reason(), Some(DenyReason::StatementDenied));
		}
	}

	mod instances {
		use super::*;

		#[tokio::test]
		async fn editor_uses_public_connector_but_cannot_edit() {
			let store = Arc::new(MemoryStore::new());
			let owner = UserId::generate();
			let mcp = store.add_resource(ResourceType::Mcp, owner, Visibility::Public);
			let editor = actor(Role::Editor);
			let engine = engine(&store);

			assert!(engine
				.authorize(&editor, Action::Use, ResourceType::Mcp, Some(mcp))
				.await
				.unwrap()
				.is_allowed());
			assert_eq!(
				engine
					.authorize(&editor, Action::Update, ResourceType::Mcp, Some(mcp))
					.await
					.unwrap(),
				Decision::Deny(DenyReason::NotOwner)
			);
			assert!(!engine.can_edit(editor.id, mcp, ResourceType::Mcp).await.unwrap());
		}

		#[tokio::test]
		async fn public_agent_is_editable_but_not_deletable() {
			let store = Arc::new(MemoryStore::new());
			let agent = store.add_resource(ResourceType::Agent, UserId::generate(), Visibility::Public);
			let editor = actor(Role::Editor);
			let engine = engine(&store);

			assert!(engine
				.authorize(&editor, Action::Update, ResourceType::Agent, Some(agent))
				.await
				.unwrap()
				.is_allowed());
			assert_eq!(
				engine
					.authorize(&editor, Action::Delete, ResourceType::Agent, Some(agent))
					.await
					.unwrap(),
				Decision::Deny(DenyReason::NotOwner)
			);
		}

		#[tokio::test]
		async fn private_resource_reports_not_found() {
			let store = Arc::new(MemoryStore::new());
			let agent =
				store.add_resource(ResourceType::Agent, UserId::generate(), Visibility::Private);

			let decision = engine(&store)
				.authorize(&actor(Role::Admin), Action::Delete, ResourceType::Agent, Some(agent))
				.await
				.unwrap();
			assert_eq!(decision, Decision::Deny(DenyReason::NotFound));
		}

		#[tokio::test]
		async fn grantee_can_use_but_not_share() {
			let store = Arc::new(MemoryStore::new());
			let owner = UserId::generate();
			let grantee = actor(Role::Editor);
			let workflow = store.add_resource(ResourceType::Workflow, owner, Visibility::Private);
			store.add_grant(
				ResourceType::Workflow,
				workflow,
				GrantScope::User(grantee.id),
				GrantPermissions::all(),
				owner,
			);
			let engine = engine(&store);

			assert!(engine
				.authorize(&grantee, Action::Use, ResourceType::Workflow, Some(workflow))
				.await
				.unwrap()
				.is_allowed());
			assert_eq!(
				engine
					.authorize(&grantee, Action::Share, ResourceType::Workflow, Some(workflow))
					.await
					.unwrap()
					.reason(),
				Some(DenyReason::NotOwner)
			);
		}

		#[tokio::test]
		async fn owner_may_do_everything_their_role_allows() {
			let store = Arc::new(MemoryStore::new());
			let owner = actor(Role::Editor);
			let agent = store.add_resource(ResourceType::Agent, owner.id, Visibility::Private);
			let engine = engine(&store);

			for action in Action::application() {
				assert!(
					engine
						.authorize(&owner, *action, ResourceType::Agent, Some(agent))
						.await
						.unwrap()
						.is_allowed(),
					"{action}"
				);
			}
		}

		#[tokio::test]
		async fn storage_failure_fails_closed() {
			let store = Arc::new(MemoryStore::new());
			let owner = actor(Role::Editor);
			let agent = store.add_resource(ResourceType::Agent, owner.id, Visibility::Private);
			store.fail();

			let decision = engine(&store)
				.authorize_or_deny(&owner, Action::View, ResourceType::Agent, Some(agent))
				.await;
			assert_eq!(decision, Decision::Deny(DenyReason::StorageUnavailable));
		}
	}

	mod input {
		use super::*;

		#[tokio::test]
		async fn strict_mode_rejects_unknown_resource_type() {
			let store = Arc::new(MemoryStore::new());
			let err = engine(&store)
				.with_strict_input(true)
				.authorize_raw(&actor(Role::Admin), "view", "dashboard", None)
				.await
				.unwrap_err();
			assert!(matches!(err, AuthzError::MalformedInput(_)));
		}

		#[tokio::test]
		async fn lenient_mode_denies_unknown_action() {
			let store = Arc::new(MemoryStore::new());
			let decision = engine(&store)
				.with_strict_input(false)
				.authorize_raw(&actor(Role::Admin), "explode", "agent", None)
				.await
				.unwrap();
			assert_eq!(decision, Decision::Deny(DenyReason::StatementDenied));
		}

		#[tokio::test]
		async fn wire_names_are_accepted() {
			let store = Arc::new(MemoryStore::new());
			let decision = engine(&store)
				.authorize_raw(&actor(Role::User), "create", "temporaryChat", None)
				.await
				.unwrap();
			assert!(decision.is_allowed());
		}

		#[tokio::test]
		async fn missing_actor_is_unauthenticated() {
			let store = Arc::new(MemoryStore::new());
			let err = engine(&store)
				.authorize_current(&None::<Actor>, Action::View, ResourceType::Agent, None)
				.await
				.unwrap_err();
			assert!(matches!(err, AuthzError::Unauthenticated));
		}

		#[test]
		fn custom_delimiter_is_used() {
			let store = Arc::new(MemoryStore::new());
			let engine = engine(&store).with_normalizer(RoleNormalizer::new('/'));
			assert_eq!(engine.normalize_role(Some("okta/editor")), Role::Editor);
			assert_eq!(engine.normalize_role(Some("okta:editor")), Role::User);
		}
	}

	mod visibility_changes {
		use super::*;

		#[tokio::test]
		async fn owner_editor_cannot_feature_connector() {
			let store = Arc::new(MemoryStore::new());
			let owner = actor(Role::Editor);
			let mcp = store.add_resource(ResourceType::Mcp, owner.id, Visibility::Private);

			let decision = engine(&store)
				.authorize_visibility_change(&owner, ResourceType::Mcp, mcp, Visibility::Public)
				.await
				.unwrap();
			assert_eq!(decision, Decision::Deny(DenyReason::FeaturedRequiresAdmin));
		}

		#[tokio::test]
		async fn admin_features_any_connector() {
			let store = Arc::new(MemoryStore::new());
			let mcp = store.add_resource(ResourceType::Mcp, UserId::generate(), Visibility::Private);

			let decision = engine(&store)
				.authorize_visibility_change(
					&actor(Role::Admin),
					ResourceType::Mcp,
					mcp,
					Visibility::Public,
				)
				.await
				.unwrap();
			assert!(decision.is_allowed());
		}

		#[tokio::test]
		async fn non_owner_cannot_change_public_agent_visibility() {
			let store = Arc::new(MemoryStore::new());
			let agent = store.add_resource(ResourceType::Agent, UserId::generate(), Visibility::Public);

			let decision = engine(&store)
				.authorize_visibility_change(
					&actor(Role::Editor),
					ResourceType::Agent,
					agent,
					Visibility::Private,
				)
				.await
				.unwrap();
			assert_eq!(decision, Decision::Deny(DenyReason::NotOwner));
		}
	}

	#[tokio::test]
	async fn list_accessible_requires_list_statement() {
		let store = Arc::new(MemoryStore::new());
		let admin = actor(Role::Admin);
		store.add_resource(ResourceType::User, admin.id, Visibility::Private);
		let user = actor(Role::User);
		store.add_resource(ResourceType::User, user.id, Visibility::Private);
		store.add_resource(ResourceType::Agent, user.id, Visibility::Private);
		let engine = engine(&store);

		assert_eq!(
			engine.list_accessible(&admin, ResourceType::User).await.unwrap().len(),
			1
		);
		assert!(engine
			.list_accessible(&user, ResourceType::User)
			.await
			.unwrap()
			.is_empty());
		let agents = engine.list_accessible(&user, ResourceType::Agent).await.unwrap();
		assert_eq!(agents.len(), 1);
		assert_eq!(agents[0].access_type, AccessType::Owned);
	}

	#[test]
	fn guard_is_reachable_through_engine() {
		let store = Arc::new(MemoryStore::new());
		let audit = Arc::new(crate::testing::RecordingAuditSink::new());
		let admin = actor(Role::Admin);
		let engine = engine(&store).with_audit_sink(audit.clone());
		assert_eq!(
			engine.guard_self_action(&admin, admin.id, UserAction::ChangeRole),
			Decision::Deny(DenyReason::SelfActionForbidden)
		);
		assert_eq!(
			audit.event_types(),
			vec![crate::audit::AuditEventType::SelfActionBlocked]
		);
	}
}
