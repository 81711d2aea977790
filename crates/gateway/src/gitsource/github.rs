use anyhow::{bail, Context, Result};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::types::{LinkedAccount, RemoteSource, WebhookData, WebhookEvent};

use super::{GitSource, WebhookRequest};

const EVENT_HEADER: &str = "X-GitHub-Event";
const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct GitHubSource {
    api_url: String,
    user_name: String,
    linked_account_id: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
    html_url: String,
    ssh_url: String,
}

#[derive(Debug, Deserialize)]
struct HeadCommit {
    id: String,
    message: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    r#ref: String,
    #[serde(default)]
    after: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    compare: String,
    head_commit: Option<HeadCommit>,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    action: String,
    number: u64,
    pull_request: PullRequest,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    title: String,
    html_url: String,
    head: PullRequestRef,
    base: PullRequestRef,
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    r#ref: String,
    sha: String,
    repo: Option<PullRequestRepo>,
}

#[derive(Debug, Deserialize)]
struct PullRequestRepo {
    full_name: String,
}

impl GitHubSource {
    #[must_use]
    pub fn new(remote_source: &RemoteSource, user_name: &str, linked_account: &LinkedAccount) -> Self {
        Self {
            api_url: remote_source.api_url.clone(),
            user_name: user_name.to_string(),
            linked_account_id: linked_account.id.clone(),
        }
    }
}

impl GitSource for GitHubSource {
    fn parse_webhook(&self, request: &WebhookRequest, secret: &str) -> Result<Option<WebhookData>> {
        if !secret.is_empty() {
            let signature = header(request, SIGNATURE_HEADER).unwrap_or_default();
            if !verify_webhook_signature(signature, secret, &request.body) {
                bail!("webhook signature mismatch");
            }
        }

        let event = header(request, EVENT_HEADER)
            .with_context(|| format!("missing {EVENT_HEADER} header"))?;
        tracing::debug!(
            api_url = %self.api_url,
            user = %self.user_name,
            linked_account_id = %self.linked_account_id,
            event,
            "parsing github webhook"
        );

        match event {
            "push" => {
                let payload = serde_json::from_slice::<PushPayload>(&request.body)
                    .context("invalid push payload")?;
                Ok(push_webhook_data(payload))
            }
            "pull_request" => {
                let payload = serde_json::from_slice::<PullRequestPayload>(&request.body)
                    .context("invalid pull request payload")?;
                Ok(pull_request_webhook_data(payload))
            }
            _ => Ok(None),
        }
    }
}

fn header<'a>(request: &'a WebhookRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

fn push_webhook_data(payload: PushPayload) -> Option<WebhookData> {
    if payload.deleted {
        return None;
    }

    let repository = payload.repository;
    let (commit_sha, message, commit_link) = match payload.head_commit {
        Some(commit) => (commit.id, commit.message, commit.url),
        None => (payload.after, String::new(), String::new()),
    };

    let mut data = WebhookData {
        ssh_url: repository.ssh_url,
        repo_path: repository.full_name,
        commit_sha,
        message,
        commit_link,
        compare_link: payload.compare,
        r#ref: payload.r#ref.clone(),
        ..WebhookData::default()
    };

    if let Some(branch) = payload.r#ref.strip_prefix("refs/heads/") {
        data.event = WebhookEvent::Push;
        data.branch_link = format!("{}/tree/{branch}", repository.html_url);
        data.branch = branch.to_string();
    } else if let Some(tag) = payload.r#ref.strip_prefix("refs/tags/") {
        data.event = WebhookEvent::Tag;
        data.tag_link = format!("{}/tree/{tag}", repository.html_url);
        data.tag = tag.to_string();
    } else {
        return None;
    }

    Some(data)
}

fn pull_request_webhook_data(payload: PullRequestPayload) -> Option<WebhookData> {
    if !matches!(
        payload.action.as_str(),
        "opened" | "synchronize" | "reopened"
    ) {
        return None;
    }

    let pull_request = payload.pull_request;
    let head_repo = pull_request.head.repo.as_ref().map(|repo| &repo.full_name);
    let base_repo = pull_request.base.repo.as_ref().map(|repo| &repo.full_name);
    let pr_from_same_repo = head_repo.is_some() && head_repo == base_repo;

    Some(WebhookData {
        event: WebhookEvent::PullRequest,
        ssh_url: payload.repository.ssh_url,
        repo_path: payload.repository.full_name,
        commit_sha: pull_request.head.sha,
        message: pull_request.title,
        branch: pull_request.base.r#ref,
        pull_request_id: payload.number.to_string(),
        pr_from_same_repo,
        r#ref: format!("refs/pull/{}/head", payload.number),
        pull_request_link: pull_request.html_url,
        compare_link: format!(
            "{}/compare/{}",
            payload.repository.html_url, pull_request.head.r#ref
        ),
        ..WebhookData::default()
    })
}

fn verify_webhook_signature(signature_header: &str, secret: &str, body: &[u8]) -> bool {
    let Some(provided) = signature_header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(provided) = hex::decode(provided) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}
