use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::{ErrorKind, RemoteError};
use crate::types::{
    CreateUpdateSecretRequest, LinkedAccount, ParentKind, Project, ProjectGroup, RemoteSource,
    Secret, User, UserOrg,
};

use super::ConfigStore;

/// HTTP client for the configstore REST API.
#[derive(Debug, Clone)]
pub struct ConfigstoreClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    message: String,
}

impl ConfigstoreClient {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = checked(request).await?;
        Ok(response.json::<T>().await?)
    }
}

async fn checked(request: RequestBuilder) -> Result<reqwest::Response, RemoteError> {
    let response = request.send().await?;
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::api(
        ErrorKind::from_status(status),
        remote_error_message(status, &body),
    ))
}

fn remote_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<RemoteErrorBody>(body) {
        return parsed.message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("configstore returned {status}");
    }
    trimmed.to_string()
}

#[async_trait]
impl ConfigStore for ConfigstoreClient {
    async fn get_project(&self, project_ref: &str) -> Result<Project, RemoteError> {
        self.fetch(self.http.get(self.url(&["projects", project_ref])))
            .await
    }

    async fn get_project_group(
        &self,
        project_group_ref: &str,
    ) -> Result<ProjectGroup, RemoteError> {
        self.fetch(self.http.get(self.url(&["projectgroups", project_group_ref])))
            .await
    }

    async fn get_user_by_linked_account(
        &self,
        linked_account_id: &str,
    ) -> Result<User, RemoteError> {
        let users: Vec<User> = self
            .fetch(self.http.get(self.url(&["users"])).query(&[
                ("query_type", "bylinkedaccount"),
                ("linkedaccountid", linked_account_id),
            ]))
            .await?;

        users.into_iter().next().ok_or_else(|| {
            RemoteError::not_exist(format!(
                "user with linked account {linked_account_id:?} doesn't exist"
            ))
        })
    }

    async fn get_user_linked_accounts(
        &self,
        user_ref: &str,
    ) -> Result<Vec<LinkedAccount>, RemoteError> {
        self.fetch(self.http.get(self.url(&["users", user_ref, "linkedaccounts"])))
            .await
    }

    async fn get_user_orgs(&self, user_ref: &str) -> Result<Vec<UserOrg>, RemoteError> {
        self.fetch(self.http.get(self.url(&["users", user_ref, "orgs"])))
            .await
    }

    async fn get_remote_source(
        &self,
        remote_source_ref: &str,
    ) -> Result<RemoteSource, RemoteError> {
        self.fetch(self.http.get(self.url(&["remotesources", remote_source_ref])))
            .await
    }

    async fn get_secrets(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        tree: bool,
    ) -> Result<Vec<Secret>, RemoteError> {
        let mut request = self
            .http
            .get(self.url(&[parent_kind.collection(), parent_ref, "secrets"]));
        if tree {
            request = request.query(&[("tree", "")]);
        }
        self.fetch(request).await
    }

    async fn create_secret(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        request: &CreateUpdateSecretRequest,
    ) -> Result<Secret, RemoteError> {
        self.fetch(
            self.http
                .post(self.url(&[parent_kind.collection(), parent_ref, "secrets"]))
                .json(request),
        )
        .await
    }

    async fn update_secret(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        secret_name: &str,
        request: &CreateUpdateSecretRequest,
    ) -> Result<Secret, RemoteError> {
        self.fetch(
            self.http
                .put(self.url(&[
                    parent_kind.collection(),
                    parent_ref,
                    "secrets",
                    secret_name,
                ]))
                .json(request),
        )
        .await
    }

    async fn delete_secret(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        secret_name: &str,
    ) -> Result<(), RemoteError> {
        checked(self.http.delete(self.url(&[
            parent_kind.collection(),
            parent_ref,
            "secrets",
            secret_name,
        ])))
        .await?;
        Ok(())
    }
}
