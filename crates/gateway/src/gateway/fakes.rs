use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::errors::{ErrorKind, RemoteError};
use crate::gitsource::{GitSource, GitSourceFactory, WebhookRequest};
use crate::runservice::RunCreator;
use crate::store::ConfigStore;
use crate::types::{
    CreateRunRequest, CreateUpdateSecretRequest, LinkedAccount, MemberRole, OwnerKind, ParentKind,
    Project, ProjectGroup, RemoteSource, RemoteSourceType, Secret, SecretType, User, UserOrg,
    WebhookData, WebhookEvent,
};

use super::ownership::StoreAuthorizer;
use super::GatewayState;

#[derive(Default)]
pub struct FakeData {
    pub projects: HashMap<String, Project>,
    pub project_groups: HashMap<String, ProjectGroup>,
    pub users: HashMap<String, User>,
    /// Keyed by user id.
    pub linked_accounts: HashMap<String, Vec<LinkedAccount>>,
    /// Linked account id to user id.
    pub user_by_linked_account: HashMap<String, String>,
    pub user_orgs: HashMap<String, Vec<UserOrg>>,
    pub remote_sources: HashMap<String, RemoteSource>,
    pub secrets: Vec<Secret>,
    failing: HashSet<String>,
    calls: Vec<String>,
    next_secret_id: usize,
}

/// In memory configstore recording every call it receives.
#[derive(Default)]
pub struct FakeStore {
    data: Mutex<FakeData>,
}

impl FakeStore {
    /// `org/acme` > `org/acme/backend` > project `org/acme/backend/api`,
    /// all owned by organization `acme` (u1 owner, u2 member).
    pub fn with_hierarchy() -> Self {
        let mut data = FakeData::default();

        for (id, path) in [("pg-root", "org/acme"), ("pg-backend", "org/acme/backend")] {
            data.project_groups.insert(
                id.to_string(),
                ProjectGroup {
                    id: id.to_string(),
                    name: path.rsplit('/').next().unwrap_or(path).to_string(),
                    path: path.to_string(),
                    owner_kind: OwnerKind::Organization,
                    owner_id: "acme".to_string(),
                },
            );
        }

        data.projects.insert(
            "p1".to_string(),
            Project {
                id: "p1".to_string(),
                name: "api".to_string(),
                path: "org/acme/backend/api".to_string(),
                owner_kind: OwnerKind::Organization,
                owner_id: "acme".to_string(),
                linked_account_id: "la1".to_string(),
                ssh_private_key: "PRIVKEY".to_string(),
                webhook_secret: "hook-secret".to_string(),
                skip_ssh_host_key_check: false,
            },
        );

        data.users.insert(
            "u1".to_string(),
            User {
                id: "u1".to_string(),
                name: "alice".to_string(),
            },
        );
        data.linked_accounts.insert(
            "u1".to_string(),
            vec![
                linked_account("la0", "rs0", "alice-gitea"),
                linked_account("la1", "rs1", "alice"),
            ],
        );
        data.user_by_linked_account
            .insert("la1".to_string(), "u1".to_string());

        data.user_orgs.insert(
            "u1".to_string(),
            vec![UserOrg {
                organization_id: "acme".to_string(),
                role: MemberRole::Owner,
            }],
        );
        data.user_orgs.insert(
            "u2".to_string(),
            vec![UserOrg {
                organization_id: "acme".to_string(),
                role: MemberRole::Member,
            }],
        );

        data.remote_sources.insert(
            "rs1".to_string(),
            RemoteSource {
                id: "rs1".to_string(),
                name: "github".to_string(),
                source_type: RemoteSourceType::Github,
                api_url: "https://api.github.com".to_string(),
                ssh_host_key: "HOSTKEY".to_string(),
                skip_ssh_host_key_check: false,
            },
        );

        Self {
            data: Mutex::new(data),
        }
    }

    pub fn update<R>(&self, change: impl FnOnce(&mut FakeData) -> R) -> R {
        change(&mut self.lock())
    }

    /// Makes every later call to `method` fail with an internal error.
    pub fn fail(&self, method: &str) {
        self.lock().failing.insert(method.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn insert_secret(&self, parent_kind: ParentKind, parent_id: &str, parent_path: &str, name: &str) {
        self.lock().secrets.push(Secret {
            id: format!("{parent_id}/{name}"),
            name: name.to_string(),
            parent_kind,
            parent_id: parent_id.to_string(),
            parent_path: parent_path.to_string(),
            secret_type: SecretType::Internal,
            data: BTreeMap::from([("value".to_string(), format!("{parent_path}/{name}"))]),
            secret_provider_id: None,
            path: None,
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeData> {
        self.data.lock().expect("fake store lock")
    }

    fn record(&self, method: &str) -> Result<std::sync::MutexGuard<'_, FakeData>, RemoteError> {
        let mut data = self.lock();
        data.calls.push(method.to_string());
        if data.failing.contains(method) {
            return Err(RemoteError::api(
                ErrorKind::Internal,
                format!("{method}: configstore unavailable"),
            ));
        }
        Ok(data)
    }
}

fn linked_account(id: &str, remote_source_id: &str, remote_user_name: &str) -> LinkedAccount {
    LinkedAccount {
        id: id.to_string(),
        remote_source_id: remote_source_id.to_string(),
        remote_user_id: format!("{id}-remote"),
        remote_user_name: remote_user_name.to_string(),
    }
}

impl FakeData {
    fn project(&self, project_ref: &str) -> Result<Project, RemoteError> {
        self.projects
            .values()
            .find(|project| project.id == project_ref || project.path == project_ref)
            .cloned()
            .ok_or_else(|| RemoteError::not_exist(format!("project {project_ref:?} doesn't exist")))
    }

    fn project_group(&self, project_group_ref: &str) -> Result<ProjectGroup, RemoteError> {
        self.project_groups
            .values()
            .find(|group| group.id == project_group_ref || group.path == project_group_ref)
            .cloned()
            .ok_or_else(|| {
                RemoteError::not_exist(format!(
                    "project group {project_group_ref:?} doesn't exist"
                ))
            })
    }

    /// Id and path of the scope a secret request targets.
    fn scope(&self, parent_kind: ParentKind, parent_ref: &str) -> Result<(String, String), RemoteError> {
        match parent_kind {
            ParentKind::Project => self.project(parent_ref).map(|project| (project.id, project.path)),
            ParentKind::ProjectGroup => self
                .project_group(parent_ref)
                .map(|group| (group.id, group.path)),
        }
    }

    fn secret_index(&self, parent_kind: ParentKind, parent_id: &str, name: &str) -> Option<usize> {
        self.secrets.iter().position(|secret| {
            secret.parent_kind == parent_kind && secret.parent_id == parent_id && secret.name == name
        })
    }
}

fn apply_request(secret: &mut Secret, request: &CreateUpdateSecretRequest) {
    secret.name.clone_from(&request.name);
    secret.secret_type = request.secret_type;
    secret.data = request.data.clone().unwrap_or_default();
    secret.secret_provider_id.clone_from(&request.secret_provider_id);
    secret.path.clone_from(&request.path);
}

#[async_trait]
impl ConfigStore for FakeStore {
    async fn get_project(&self, project_ref: &str) -> Result<Project, RemoteError> {
        self.record("get_project")?.project(project_ref)
    }

    async fn get_project_group(&self, project_group_ref: &str) -> Result<ProjectGroup, RemoteError> {
        self.record("get_project_group")?.project_group(project_group_ref)
    }

    async fn get_user_by_linked_account(&self, linked_account_id: &str) -> Result<User, RemoteError> {
        let data = self.record("get_user_by_linked_account")?;
        data.user_by_linked_account
            .get(linked_account_id)
            .and_then(|user_id| data.users.get(user_id))
            .cloned()
            .ok_or_else(|| {
                RemoteError::not_exist(format!(
                    "user with linked account {linked_account_id:?} doesn't exist"
                ))
            })
    }

    async fn get_user_linked_accounts(&self, user_ref: &str) -> Result<Vec<LinkedAccount>, RemoteError> {
        let data = self.record("get_user_linked_accounts")?;
        Ok(data.linked_accounts.get(user_ref).cloned().unwrap_or_default())
    }

    async fn get_user_orgs(&self, user_ref: &str) -> Result<Vec<UserOrg>, RemoteError> {
        let data = self.record("get_user_orgs")?;
        Ok(data.user_orgs.get(user_ref).cloned().unwrap_or_default())
    }

    async fn get_remote_source(&self, remote_source_ref: &str) -> Result<RemoteSource, RemoteError> {
        let data = self.record("get_remote_source")?;
        data.remote_sources
            .values()
            .find(|source| source.id == remote_source_ref || source.name == remote_source_ref)
            .cloned()
            .ok_or_else(|| {
                RemoteError::not_exist(format!("remote source {remote_source_ref:?} doesn't exist"))
            })
    }

    async fn get_secrets(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        tree: bool,
    ) -> Result<Vec<Secret>, RemoteError> {
        let data = self.record("get_secrets")?;
        let (parent_id, parent_path) = data.scope(parent_kind, parent_ref)?;

        Ok(data
            .secrets
            .iter()
            .filter(|secret| {
                let own = secret.parent_kind == parent_kind && secret.parent_id == parent_id;
                let ancestor = secret.parent_kind == ParentKind::ProjectGroup
                    && parent_path.starts_with(&format!("{}/", secret.parent_path));
                own || (tree && ancestor)
            })
            .cloned()
            .collect())
    }

    async fn create_secret(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        request: &CreateUpdateSecretRequest,
    ) -> Result<Secret, RemoteError> {
        let mut data = self.record("create_secret")?;
        let (parent_id, parent_path) = data.scope(parent_kind, parent_ref)?;
        if data.secret_index(parent_kind, &parent_id, &request.name).is_some() {
            return Err(RemoteError::api(
                ErrorKind::AlreadyExists,
                format!("secret with name {:?} already exists", request.name),
            ));
        }

        data.next_secret_id += 1;
        let mut secret = Secret {
            id: format!("secret-{}", data.next_secret_id),
            name: String::new(),
            parent_kind,
            parent_id,
            parent_path,
            secret_type: SecretType::Internal,
            data: BTreeMap::new(),
            secret_provider_id: None,
            path: None,
        };
        apply_request(&mut secret, request);
        data.secrets.push(secret.clone());
        Ok(secret)
    }

    async fn update_secret(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        secret_name: &str,
        request: &CreateUpdateSecretRequest,
    ) -> Result<Secret, RemoteError> {
        let mut data = self.record("update_secret")?;
        let (parent_id, _) = data.scope(parent_kind, parent_ref)?;
        let index = data
            .secret_index(parent_kind, &parent_id, secret_name)
            .ok_or_else(|| RemoteError::not_exist(format!("secret {secret_name:?} doesn't exist")))?;

        let secret = &mut data.secrets[index];
        apply_request(secret, request);
        Ok(secret.clone())
    }

    async fn delete_secret(
        &self,
        parent_kind: ParentKind,
        parent_ref: &str,
        secret_name: &str,
    ) -> Result<(), RemoteError> {
        let mut data = self.record("delete_secret")?;
        let (parent_id, _) = data.scope(parent_kind, parent_ref)?;
        let index = data
            .secret_index(parent_kind, &parent_id, secret_name)
            .ok_or_else(|| RemoteError::not_exist(format!("secret {secret_name:?} doesn't exist")))?;
        data.secrets.remove(index);
        Ok(())
    }
}

/// What fake git sources answer to `parse_webhook`.
#[derive(Clone, Debug)]
pub enum FakeParse {
    Skip,
    Event(WebhookData),
    Fail(String),
}

#[derive(Debug, Default)]
struct GitSourceState {
    parse: Option<FakeParse>,
    fail_build: bool,
    built_for: Vec<(String, String, String)>,
    secrets_seen: Vec<String>,
}

#[derive(Default)]
pub struct FakeGitSources {
    state: Arc<Mutex<GitSourceState>>,
}

impl FakeGitSources {
    pub fn set_parse(&self, parse: FakeParse) {
        self.lock().parse = Some(parse);
    }

    pub fn fail_build(&self) {
        self.lock().fail_build = true;
    }

    /// `(remote source id, user name, linked account id)` per built client.
    pub fn built_for(&self) -> Vec<(String, String, String)> {
        self.lock().built_for.clone()
    }

    pub fn secrets_seen(&self) -> Vec<String> {
        self.lock().secrets_seen.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GitSourceState> {
        self.state.lock().expect("git source lock")
    }
}

impl GitSourceFactory for FakeGitSources {
    fn git_source(
        &self,
        remote_source: &RemoteSource,
        user_name: &str,
        linked_account: &LinkedAccount,
    ) -> Result<Arc<dyn GitSource>> {
        let mut state = self.lock();
        if state.fail_build {
            bail!("no client for remote source {:?}", remote_source.name);
        }
        state.built_for.push((
            remote_source.id.clone(),
            user_name.to_string(),
            linked_account.id.clone(),
        ));

        Ok(Arc::new(FakeGitSource {
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct FakeGitSource {
    state: Arc<Mutex<GitSourceState>>,
}

impl GitSource for FakeGitSource {
    fn parse_webhook(&self, _request: &WebhookRequest, secret: &str) -> Result<Option<WebhookData>> {
        let mut state = self.state.lock().expect("git source lock");
        state.secrets_seen.push(secret.to_string());

        match state.parse.clone().unwrap_or(FakeParse::Skip) {
            FakeParse::Skip => Ok(None),
            FakeParse::Event(data) => Ok(Some(data)),
            FakeParse::Fail(message) => Err(anyhow!(message)),
        }
    }
}

#[derive(Default)]
pub struct FakeRunCreator {
    requests: Mutex<Vec<CreateRunRequest>>,
    failing: AtomicBool,
}

impl FakeRunCreator {
    pub fn requests(&self) -> Vec<CreateRunRequest> {
        self.requests.lock().expect("run requests lock").clone()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RunCreator for FakeRunCreator {
    async fn create_runs(&self, request: &CreateRunRequest) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("runservice returned 503 Service Unavailable");
        }
        self.requests
            .lock()
            .expect("run requests lock")
            .push(request.clone());
        Ok(())
    }
}

pub fn sample_webhook_data() -> WebhookData {
    WebhookData {
        event: WebhookEvent::Push,
        ssh_url: "git@github.com:acme/api.git".to_string(),
        repo_path: "acme/api".to_string(),
        commit_sha: "abc123".to_string(),
        message: "fix build".to_string(),
        branch: "main".to_string(),
        r#ref: "refs/heads/main".to_string(),
        commit_link: "https://github.com/acme/api/commit/abc123".to_string(),
        branch_link: "https://github.com/acme/api/tree/main".to_string(),
        ..WebhookData::default()
    }
}

/// Gateway state wired to in memory collaborators.
pub struct Harness {
    pub store: Arc<FakeStore>,
    pub git_sources: Arc<FakeGitSources>,
    pub runs: Arc<FakeRunCreator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(FakeStore::with_hierarchy())
    }

    pub fn with_store(store: FakeStore) -> Self {
        Self {
            store: Arc::new(store),
            git_sources: Arc::new(FakeGitSources::default()),
            runs: Arc::new(FakeRunCreator::default()),
        }
    }

    pub fn state(&self) -> GatewayState {
        let store: Arc<dyn ConfigStore> = Arc::clone(&self.store) as Arc<dyn ConfigStore>;

        GatewayState {
            authorizer: Arc::new(StoreAuthorizer::new(Arc::clone(&store))),
            store,
            git_sources: Arc::clone(&self.git_sources) as Arc<dyn GitSourceFactory>,
            runs: Arc::clone(&self.runs) as Arc<dyn RunCreator>,
            webhook_body_limit: 64 * 1024,
        }
    }

    /// Edits the fixture project `p1`.
    pub fn update_project(&self, change: impl FnOnce(&mut Project)) {
        self.store.update(|data| {
            if let Some(project) = data.projects.get_mut("p1") {
                change(project);
            }
        });
    }
}
