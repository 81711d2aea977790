//! Resolution of the scope (project or project group) a secret belongs to.
//!
//! Projects are leaves of the project group tree. Reads with `tree` set ask
//! the store for the secrets of the scope and of every ancestor group.

use std::fmt;

use crate::errors::{ApiError, RemoteError};
use crate::store::ConfigStore;
use crate::types::{OwnerKind, ParentKind, Secret};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretScope {
    pub kind: ParentKind,
    pub reference: String,
}

impl SecretScope {
    #[must_use]
    pub fn project(reference: &str) -> Self {
        Self {
            kind: ParentKind::Project,
            reference: reference.to_string(),
        }
    }

    #[must_use]
    pub fn project_group(reference: &str) -> Self {
        Self {
            kind: ParentKind::ProjectGroup,
            reference: reference.to_string(),
        }
    }

    /// Builds a scope from an API path collection segment.
    ///
    /// # Errors
    ///
    /// Returns a bad request error for unknown collections.
    pub fn from_path(collection: &str, reference: &str) -> Result<Self, ApiError> {
        let kind = ParentKind::from_collection(collection).ok_or_else(|| {
            ApiError::bad_request(format!("unknown secret parent kind {collection:?}"))
        })?;

        Ok(Self {
            kind,
            reference: reference.to_string(),
        })
    }
}

impl fmt::Display for SecretScope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {:?}", self.kind, self.reference)
    }
}

/// Owner of a scope, as recorded by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeOwner {
    pub kind: OwnerKind,
    pub id: String,
}

/// # Errors
///
/// Returns a dependency error when the scope cannot be fetched.
pub async fn scope_owner(store: &dyn ConfigStore, scope: &SecretScope) -> Result<ScopeOwner, ApiError> {
    let (kind, id) = match scope.kind {
        ParentKind::ProjectGroup => {
            let project_group = store
                .get_project_group(&scope.reference)
                .await
                .map_err(|error| {
                    ApiError::from_remote(
                        error,
                        format!("failed to get project group {:?}", scope.reference),
                    )
                })?;
            (project_group.owner_kind, project_group.owner_id)
        }
        ParentKind::Project => {
            let project = store.get_project(&scope.reference).await.map_err(|error| {
                ApiError::from_remote(error, format!("failed to get project {:?}", scope.reference))
            })?;
            (project.owner_kind, project.owner_id)
        }
    };

    Ok(ScopeOwner { kind, id })
}

/// Secrets visible at `scope`. With `tree` the result also contains the
/// secrets declared on every ancestor project group.
///
/// # Errors
///
/// Returns the store failure unchanged.
pub async fn scope_secrets(
    store: &dyn ConfigStore,
    scope: &SecretScope,
    tree: bool,
) -> Result<Vec<Secret>, RemoteError> {
    store.get_secrets(scope.kind, &scope.reference, tree).await
}
