use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use anyhow::{anyhow, Result};
use axum::Json;
use regex::Regex;

use crate::errors::{ApiError, ErrorCode, ErrorKind};
use crate::types::{CreateUpdateSecretRequest, Secret, SecretType};

use super::api_types::{CreateUpdateSecretBody, SecretsQuery};
use super::auth::AuthIdentity;
use super::hierarchy::{scope_secrets, SecretScope};
use super::ownership::ensure_variable_owner;
use super::shadowing::filter_overridden_secrets;
use super::GatewayState;

#[derive(Clone, Debug)]
pub struct GetSecretsRequest {
    pub scope: SecretScope,
    pub tree: bool,
    pub remove_overridden: bool,
}

#[derive(Clone, Debug)]
pub struct CreateSecretRequest {
    pub scope: SecretScope,
    pub name: String,
    pub secret_type: SecretType,

    pub data: BTreeMap<String, String>,

    pub secret_provider_id: Option<String>,
    pub path: Option<String>,
}

#[derive(Clone, Debug)]
pub struct UpdateSecretRequest {
    pub scope: SecretScope,
    /// Current name of the secret being updated.
    pub secret_name: String,
    pub name: String,
    pub secret_type: SecretType,

    pub data: BTreeMap<String, String>,

    pub secret_provider_id: Option<String>,
    pub path: Option<String>,
}

/// Names start with a letter, contain only letters, digits and single dashes
/// between segments, and are at least two characters long.
///
/// # Errors
///
/// Returns an error when the name validator cannot be built.
pub fn validate_name(name: &str) -> Result<bool> {
    let regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9]*([-]?[a-zA-Z0-9]+)+$")
        .map_err(|error| anyhow!("invalid secret name validator: {error}"))?;

    Ok(regex.is_match(name))
}

/// # Errors
///
/// Store failures are returned with their remote classification.
pub async fn get_secrets(
    state: &GatewayState,
    request: &GetSecretsRequest,
) -> Result<Vec<Secret>, ApiError> {
    let secrets = scope_secrets(state.store.as_ref(), &request.scope, request.tree)
        .await
        .map_err(|error| {
            ApiError::from_remote(error, format!("failed to get secrets of {}", request.scope))
        })?;

    if request.remove_overridden {
        return Ok(filter_overridden_secrets(secrets));
    }
    Ok(secrets)
}

/// # Errors
///
/// Non owners get a forbidden error, invalid names and incomplete external
/// secrets a bad request; store failures keep their remote classification.
pub async fn create_secret(
    state: &GatewayState,
    identity: &AuthIdentity,
    request: CreateSecretRequest,
) -> Result<Secret, ApiError> {
    authorize_secret_write(state, identity, &request.scope, &request.name).await?;
    let store_request = store_request(
        request.name,
        request.secret_type,
        request.data,
        request.secret_provider_id,
        request.path,
    )?;

    let scope = &request.scope;
    tracing::info!(scope = %scope, name = %store_request.name, "creating {} secret", scope.kind);
    let secret = state
        .store
        .create_secret(scope.kind, &scope.reference, &store_request)
        .await
        .map_err(|error| ApiError::from_remote(error, "failed to create secret"))?;
    tracing::info!(scope = %scope, name = %secret.name, id = %secret.id, "secret created");

    Ok(secret)
}

/// # Errors
///
/// Same as [`create_secret`].
pub async fn update_secret(
    state: &GatewayState,
    identity: &AuthIdentity,
    request: UpdateSecretRequest,
) -> Result<Secret, ApiError> {
    authorize_secret_write(state, identity, &request.scope, &request.name).await?;
    let store_request = store_request(
        request.name,
        request.secret_type,
        request.data,
        request.secret_provider_id,
        request.path,
    )?;

    let scope = &request.scope;
    tracing::info!(
        scope = %scope,
        secret_name = %request.secret_name,
        name = %store_request.name,
        "updating {} secret",
        scope.kind
    );
    let secret = state
        .store
        .update_secret(
            scope.kind,
            &scope.reference,
            &request.secret_name,
            &store_request,
        )
        .await
        .map_err(|error| ApiError::from_remote(error, "failed to update secret"))?;
    tracing::info!(scope = %scope, name = %secret.name, id = %secret.id, "secret updated");

    Ok(secret)
}

/// # Errors
///
/// Non owners get a forbidden error; store failures keep their remote classification.
pub async fn delete_secret(
    state: &GatewayState,
    identity: &AuthIdentity,
    scope: &SecretScope,
    name: &str,
) -> Result<(), ApiError> {
    ensure_variable_owner(state.authorizer.as_ref(), identity, scope).await?;

    tracing::info!(scope = %scope, name, "deleting {} secret", scope.kind);
    state
        .store
        .delete_secret(scope.kind, &scope.reference, name)
        .await
        .map_err(|error| ApiError::from_remote(error, "failed to delete secret"))?;
    tracing::info!(scope = %scope, name, "secret deleted");

    Ok(())
}

async fn authorize_secret_write(
    state: &GatewayState,
    identity: &AuthIdentity,
    scope: &SecretScope,
    name: &str,
) -> Result<(), ApiError> {
    ensure_variable_owner(state.authorizer.as_ref(), identity, scope).await?;

    let valid = validate_name(name).map_err(|error| {
        ApiError::wrap(ErrorKind::Internal, error, "failed to validate secret name")
    })?;
    if !valid {
        return Err(ApiError::bad_request(format!("invalid secret name {name:?}"))
            .with_code(ErrorCode::InvalidSecretName));
    }

    Ok(())
}

fn store_request(
    name: String,
    secret_type: SecretType,
    data: BTreeMap<String, String>,
    secret_provider_id: Option<String>,
    path: Option<String>,
) -> Result<CreateUpdateSecretRequest, ApiError> {
    match secret_type {
        SecretType::Internal => Ok(CreateUpdateSecretRequest {
            name,
            secret_type,
            data: Some(data),
            secret_provider_id: None,
            path: None,
        }),
        SecretType::External => {
            let provider = secret_provider_id.filter(|value| !value.trim().is_empty());
            let path = path.filter(|value| !value.trim().is_empty());
            let (Some(provider), Some(path)) = (provider, path) else {
                return Err(ApiError::bad_request(
                    "external secrets require a secret provider id and a path",
                ));
            };
            Ok(CreateUpdateSecretRequest {
                name,
                secret_type,
                data: None,
                secret_provider_id: Some(provider),
                path: Some(path),
            })
        }
    }
}

pub(super) async fn list_secrets(
    State(state): State<GatewayState>,
    Path((parent_kind, parent_ref)): Path<(String, String)>,
    Query(query): Query<SecretsQuery>,
) -> Result<Json<Vec<Secret>>, ApiError> {
    let request = GetSecretsRequest {
        scope: SecretScope::from_path(&parent_kind, &parent_ref)?,
        tree: query.tree(),
        remove_overridden: query.remove_overridden(),
    };

    Ok(Json(get_secrets(&state, &request).await?))
}

pub(super) async fn create_secret_handler(
    State(state): State<GatewayState>,
    identity: AuthIdentity,
    Path((parent_kind, parent_ref)): Path<(String, String)>,
    Json(body): Json<CreateUpdateSecretBody>,
) -> Result<(StatusCode, Json<Secret>), ApiError> {
    identity.require_authenticated()?;

    let request = CreateSecretRequest {
        scope: SecretScope::from_path(&parent_kind, &parent_ref)?,
        name: body.name,
        secret_type: body.secret_type,
        data: body.data,
        secret_provider_id: body.secret_provider_id,
        path: body.path,
    };

    let secret = create_secret(&state, &identity, request).await?;
    Ok((StatusCode::CREATED, Json(secret)))
}

pub(super) async fn update_secret_handler(
    State(state): State<GatewayState>,
    identity: AuthIdentity,
    Path((parent_kind, parent_ref, secret_name)): Path<(String, String, String)>,
    Json(body): Json<CreateUpdateSecretBody>,
) -> Result<Json<Secret>, ApiError> {
    identity.require_authenticated()?;

    let request = UpdateSecretRequest {
        scope: SecretScope::from_path(&parent_kind, &parent_ref)?,
        secret_name,
        name: body.name,
        secret_type: body.secret_type,
        data: body.data,
        secret_provider_id: body.secret_provider_id,
        path: body.path,
    };

    Ok(Json(update_secret(&state, &identity, request).await?))
}

pub(super) async fn delete_secret_handler(
    State(state): State<GatewayState>,
    identity: AuthIdentity,
    Path((parent_kind, parent_ref, secret_name)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    identity.require_authenticated()?;

    let scope = SecretScope::from_path(&parent_kind, &parent_ref)?;
    delete_secret(&state, &identity, &scope, &secret_name).await?;
    Ok(StatusCode::NO_CONTENT)
}
