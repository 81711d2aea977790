use async_trait::async_trait;

use crate::errors::RemoteError;
use crate::types::{
    CreateUpdateSecretRequest, LinkedAccount, ParentKind, Project, ProjectGroup, RemoteSource,
    Secret, User, UserOrg,
};

mod client;

pub use client::ConfigstoreClient;

/// Read access to the configuration store plus the secret mutations the
/// gateway delegates to it. Every call is a single remote request.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_project(&self, project_ref: &str) -> Result<Project, RemoteError>;

    async fn get_project_group(&self, project_group_ref: &str)
        -> Result<ProjectGroup, RemoteError>;

    async fn get_user_by_linked_account(&self, linked_account_id: &str)
        -> Result<User, RemoteError>;

    async fn get_user_linked_accounts(&self, user_ref: &str)
        -> Result<Vec<LinkedAccount>, RemoteError>;

    async fn get_user_orgs(&self, user_ref: &str) -> Result<Vec<UserOrg>, RemoteError>;

    async fn get_remote_source(&self, remote_source_ref: &str)
        -> Result<RemoteSource, RemoteError>;

    /// Secrets of the scope; with `tree` also those of every ancestor group.
    async fn get_secrets(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        tree: bool,
    ) -> Result<Vec<Secret>, RemoteError>;

    async fn create_secret(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        request: &CreateUpdateSecretRequest,
    ) -> Result<Secret, RemoteError>;

    async fn update_secret(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        secret_name: &str,
        request: &CreateUpdateSecretRequest,
    ) -> Result<Secret, RemoteError>;

    async fn delete_secret(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        secret_name: &str,
    ) -> Result<(), RemoteError>;
}
