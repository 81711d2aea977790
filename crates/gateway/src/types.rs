use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::gitsource::GitSource;

/// Kind of the scope a secret is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentKind {
    Project,
    ProjectGroup,
}

impl ParentKind {
    /// Collection segment used in API paths (`projects`, `projectgroups`).
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::ProjectGroup => "projectgroups",
        }
    }

    #[must_use]
    pub fn from_collection(segment: &str) -> Option<Self> {
        match segment {
            "projects" => Some(Self::Project),
            "projectgroups" => Some(Self::ProjectGroup),
            _ => None,
        }
    }
}

impl fmt::Display for ParentKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => formatter.write_str("project"),
            Self::ProjectGroup => formatter.write_str("project group"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    #[default]
    User,
    #[serde(rename = "org")]
    Organization,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub owner_kind: OwnerKind,
    #[serde(default)]
    pub owner_id: String,
    pub linked_account_id: String,
    #[serde(default)]
    pub ssh_private_key: String,
    #[serde(default, skip_serializing)]
    pub webhook_secret: String,
    #[serde(default)]
    pub skip_ssh_host_key_check: bool,
}

impl fmt::Debug for Project {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Project")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("owner_kind", &self.owner_kind)
            .field("owner_id", &self.owner_id)
            .field("linked_account_id", &self.linked_account_id)
            .field("ssh_private_key", &"***")
            .field("webhook_secret", &"***")
            .field("skip_ssh_host_key_check", &self.skip_ssh_host_key_check)
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProjectGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub owner_kind: OwnerKind,
    #[serde(default)]
    pub owner_id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LinkedAccount {
    pub id: String,
    pub remote_source_id: String,
    #[serde(default)]
    pub remote_user_id: String,
    #[serde(default)]
    pub remote_user_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteSourceType {
    Gitea,
    Github,
    Gitlab,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RemoteSource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: RemoteSourceType,
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub ssh_host_key: String,
    #[serde(default)]
    pub skip_ssh_host_key_check: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Member,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserOrg {
    pub organization_id: String,
    pub role: MemberRole,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretType {
    #[default]
    Internal,
    External,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Secret {
    pub id: String,
    pub name: String,
    pub parent_kind: ParentKind,
    pub parent_id: String,
    /// Slash separated path of the owning scope, e.g. `org/acme/backend/api`.
    #[serde(default)]
    pub parent_path: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Secret {
    /// Depth of the owning scope in the project group tree. Projects are
    /// always deeper than the groups that contain them.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parent_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .count()
    }
}

/// Body sent to the store for both secret creation and update. Only the
/// fields meaningful for `secret_type` are populated.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CreateUpdateSecretRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookEvent {
    #[default]
    Push,
    Tag,
    #[serde(rename = "pull_request")]
    PullRequest,
    #[serde(other)]
    Unknown,
}

/// Provider agnostic view of a parsed webhook delivery.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebhookData {
    pub event: WebhookEvent,
    pub ssh_url: String,
    pub repo_path: String,
    pub commit_sha: String,
    pub message: String,
    pub branch: String,
    pub tag: String,
    pub pull_request_id: String,
    pub pr_from_same_repo: bool,
    #[serde(rename = "ref")]
    pub r#ref: String,

    pub commit_link: String,
    pub branch_link: String,
    pub tag_link: String,
    pub pull_request_link: String,
    pub compare_link: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Project,
    User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunRefType {
    Branch,
    Tag,
    #[serde(rename = "pull_request")]
    PullRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunCreationTriggerType {
    Manual,
    Webhook,
}

#[derive(Clone, Serialize)]
pub struct CreateRunRequest {
    pub run_type: RunType,
    pub ref_type: RunRefType,
    pub run_creation_trigger: RunCreationTriggerType,

    pub project: Project,
    pub user: Option<User>,
    #[serde(skip)]
    pub git_source: Arc<dyn GitSource>,
    pub repo_path: String,
    pub commit_sha: String,
    pub message: String,
    pub branch: String,
    pub tag: String,
    pub pull_request_id: String,
    pub pr_from_same_repo: bool,
    #[serde(rename = "ref")]
    pub r#ref: String,
    pub ssh_priv_key: String,
    pub ssh_host_key: String,
    pub skip_ssh_host_key_check: bool,
    pub clone_url: String,

    pub commit_link: String,
    pub branch_link: String,
    pub tag_link: String,
    pub pull_request_link: String,
    pub compare_link: String,
}

impl fmt::Debug for CreateRunRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CreateRunRequest")
            .field("run_type", &self.run_type)
            .field("ref_type", &self.ref_type)
            .field("run_creation_trigger", &self.run_creation_trigger)
            .field("project", &self.project)
            .field("user", &self.user)
            .field("git_source", &self.git_source)
            .field("repo_path", &self.repo_path)
            .field("commit_sha", &self.commit_sha)
            .field("branch", &self.branch)
            .field("tag", &self.tag)
            .field("pull_request_id", &self.pull_request_id)
            .field("pr_from_same_repo", &self.pr_from_same_repo)
            .field("ref", &self.r#ref)
            .field("ssh_priv_key", &"***")
            .field("ssh_host_key", &self.ssh_host_key)
            .field("skip_ssh_host_key_check", &self.skip_ssh_host_key_check)
            .field("clone_url", &self.clone_url)
            .finish_non_exhaustive()
    }
}
