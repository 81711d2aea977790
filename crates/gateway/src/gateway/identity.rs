use std::sync::Arc;

use crate::errors::{ApiError, ErrorKind};
use crate::gitsource::GitSource;
use crate::types::{Project, RemoteSource};

use super::GatewayState;

/// Trust material needed to parse and authenticate a project's webhooks.
#[derive(Debug, Clone)]
pub struct ProjectIdentity {
    pub project: Project,
    pub remote_source: RemoteSource,
    pub git_source: Arc<dyn GitSource>,
}

/// Resolves project, owning user, linked account and remote source, then
/// builds the provider client for them.
///
/// # Errors
///
/// Lookup failures are dependency errors; a linked account missing from its
/// user's set and client construction failures are internal errors.
pub async fn resolve_project_identity(
    state: &GatewayState,
    project_ref: &str,
) -> Result<ProjectIdentity, ApiError> {
    let project = state
        .store
        .get_project(project_ref)
        .await
        .map_err(|error| ApiError::from_remote(error, format!("failed to get project {project_ref}")))?;

    let user = state
        .store
        .get_user_by_linked_account(&project.linked_account_id)
        .await
        .map_err(|error| {
            ApiError::from_remote(
                error,
                format!(
                    "failed to get user by linked account {:?}",
                    project.linked_account_id
                ),
            )
        })?;

    let linked_accounts = state
        .store
        .get_user_linked_accounts(&user.id)
        .await
        .map_err(|error| {
            ApiError::from_remote(error, format!("failed to get user {:?} linked accounts", user.id))
        })?;

    let linked_account = linked_accounts
        .into_iter()
        .find(|linked_account| linked_account.id == project.linked_account_id)
        .ok_or_else(|| {
            ApiError::internal(format!(
                "linked account {:?} for user {:?} doesn't exist",
                project.linked_account_id, user.name
            ))
        })?;

    let remote_source = state
        .store
        .get_remote_source(&linked_account.remote_source_id)
        .await
        .map_err(|error| {
            ApiError::from_remote(
                error,
                format!(
                    "failed to get remote source {:?}",
                    linked_account.remote_source_id
                ),
            )
        })?;

    let git_source = state
        .git_sources
        .git_source(&remote_source, &user.name, &linked_account)
        .map_err(|error| {
            ApiError::wrap(
                ErrorKind::Internal,
                error,
                format!("failed to create {:?} client", remote_source.name),
            )
        })?;

    Ok(ProjectIdentity {
        project,
        remote_source,
        git_source,
    })
}
