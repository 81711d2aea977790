use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ApiError;
use crate::store::ConfigStore;
use crate::types::{MemberRole, OwnerKind};

use super::auth::AuthIdentity;
use super::hierarchy::{scope_owner, SecretScope};

/// Decides who may mutate variables and secrets of a scope.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when ownership cannot be determined. A negative
    /// answer is `Ok(false)`, never an error.
    async fn is_variable_owner(
        &self,
        identity: &AuthIdentity,
        scope: &SecretScope,
    ) -> Result<bool, ApiError>;
}

/// Ownership resolved from the store: admins own everything, user owned
/// scopes belong to their user, organization owned scopes to the
/// organization's owners.
#[derive(Clone)]
pub struct StoreAuthorizer {
    store: Arc<dyn ConfigStore>,
}

impl StoreAuthorizer {
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authorizer for StoreAuthorizer {
    async fn is_variable_owner(
        &self,
        identity: &AuthIdentity,
        scope: &SecretScope,
    ) -> Result<bool, ApiError> {
        let Some(user_id) = identity.user_id.as_deref() else {
            return Ok(false);
        };
        if identity.admin {
            return Ok(true);
        }

        let owner = scope_owner(self.store.as_ref(), scope).await?;
        match owner.kind {
            OwnerKind::User => Ok(owner.id == user_id),
            OwnerKind::Organization => {
                let orgs = self.store.get_user_orgs(user_id).await.map_err(|error| {
                    ApiError::from_remote(error, format!("failed to get user {user_id:?} orgs"))
                })?;
                Ok(orgs
                    .iter()
                    .any(|org| org.organization_id == owner.id && org.role == MemberRole::Owner))
            }
        }
    }
}

/// Shared gate for every secret mutation.
///
/// # Errors
///
/// Returns a forbidden error for non owners and propagates resolution failures.
pub async fn ensure_variable_owner(
    authorizer: &dyn Authorizer,
    identity: &AuthIdentity,
    scope: &SecretScope,
) -> Result<(), ApiError> {
    let is_owner = authorizer
        .is_variable_owner(identity, scope)
        .await
        .map_err(|error| error.context("failed to determine ownership"))?;

    if !is_owner {
        return Err(ApiError::forbidden("user not authorized"));
    }

    Ok(())
}
