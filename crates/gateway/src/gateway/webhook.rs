use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};

use crate::errors::{ApiError, ErrorKind};
use crate::gitsource::WebhookRequest;
use crate::types::{
    CreateRunRequest, Project, RemoteSource, RunCreationTriggerType, RunRefType, RunType,
    WebhookEvent,
};

use super::api_types::first_query_value;
use super::identity::resolve_project_identity;
use super::GatewayState;

/// Result of a successfully handled delivery.
#[derive(Debug)]
pub enum WebhookOutcome {
    /// A run creation request was built and accepted by the run service.
    Processed(Box<CreateRunRequest>),
    /// The provider reported an event that should not trigger a run.
    Skipped,
}

/// Host key verification is skipped when the remote source says so; a
/// project can additionally turn the check off but never back on.
#[must_use]
pub fn effective_skip_ssh_host_key_check(remote_source: &RemoteSource, project: &Project) -> bool {
    remote_source.skip_ssh_host_key_check || project.skip_ssh_host_key_check
}

#[must_use]
pub fn run_ref_type(event: WebhookEvent) -> RunRefType {
    match event {
        WebhookEvent::Push | WebhookEvent::Unknown => RunRefType::Branch,
        WebhookEvent::Tag => RunRefType::Tag,
        WebhookEvent::PullRequest => RunRefType::PullRequest,
    }
}

/// Turns a delivery for `project_id` into a run creation request.
///
/// # Errors
///
/// Missing project id and unparsable deliveries are bad requests; identity
/// resolution errors are propagated; run service failures are internal.
pub async fn process_webhook(
    state: &GatewayState,
    project_id: Option<&str>,
    request: &WebhookRequest,
) -> Result<WebhookOutcome, ApiError> {
    let Some(project_id) = project_id.filter(|id| !id.is_empty()) else {
        return Err(ApiError::bad_request("bad webhook url. Missing projectid"));
    };

    let identity = resolve_project_identity(state, project_id).await?;
    let project = identity.project;
    let remote_source = identity.remote_source;
    let skip_ssh_host_key_check = effective_skip_ssh_host_key_check(&remote_source, &project);

    let webhook_data = identity
        .git_source
        .parse_webhook(request, &project.webhook_secret)
        .map_err(|error| ApiError::wrap(ErrorKind::BadRequest, error, "failed to parse webhook"))?;

    // TODO: report the provider's reason for skipping once parsers expose it.
    let Some(webhook_data) = webhook_data else {
        tracing::info!(project_id = %project.id, "skipping webhook: no actionable event");
        return Ok(WebhookOutcome::Skipped);
    };

    let ref_type = run_ref_type(webhook_data.event);
    let run_request = CreateRunRequest {
        run_type: RunType::Project,
        ref_type,
        run_creation_trigger: RunCreationTriggerType::Webhook,

        user: None,
        git_source: identity.git_source,
        repo_path: webhook_data.repo_path,
        commit_sha: webhook_data.commit_sha,
        message: webhook_data.message,
        branch: webhook_data.branch,
        tag: webhook_data.tag,
        pull_request_id: webhook_data.pull_request_id,
        pr_from_same_repo: webhook_data.pr_from_same_repo,
        r#ref: webhook_data.r#ref,
        ssh_priv_key: project.ssh_private_key.clone(),
        ssh_host_key: remote_source.ssh_host_key,
        skip_ssh_host_key_check,
        clone_url: webhook_data.ssh_url,

        commit_link: webhook_data.commit_link,
        branch_link: webhook_data.branch_link,
        tag_link: webhook_data.tag_link,
        pull_request_link: webhook_data.pull_request_link,
        compare_link: webhook_data.compare_link,

        project,
    };

    tracing::info!(
        project_id = %run_request.project.id,
        ref_type = ?run_request.ref_type,
        commit_sha = %run_request.commit_sha,
        "creating run from webhook"
    );
    state
        .runs
        .create_runs(&run_request)
        .await
        .map_err(|error| ApiError::wrap(ErrorKind::Internal, error, "failed to create run"))?;

    Ok(WebhookOutcome::Processed(Box::new(run_request)))
}

/// The first `projectid` wins when the parameter is repeated.
pub(super) async fn webhooks(
    State(state): State<GatewayState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, ApiError> {
    let Query(params) = query
        .map_err(|error| ApiError::wrap(ErrorKind::BadRequest, error, "bad webhook url"))?;
    let body = body.map_err(|error| {
        ApiError::wrap(ErrorKind::BadRequest, error, "failed to read webhook body")
    })?;

    let request = WebhookRequest { headers, body };
    process_webhook(&state, first_query_value(&params, "projectid"), &request).await?;
    Ok(StatusCode::OK)
}
