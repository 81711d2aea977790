use std::error::Error as StdError;
use std::fmt::Write as _;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Classification shared by every error the gateway returns to a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotExist,
    AlreadyExists,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotExist => StatusCode::NOT_FOUND,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::BadRequest,
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotExist,
            StatusCode::CONFLICT => Self::AlreadyExists,
            _ => Self::Internal,
        }
    }
}

/// Machine readable detail attached to some errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidSecretName,
}

/// Failure reported by a remote collaborator (configstore, runservice).
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{message}")]
    Api { kind: ErrorKind, message: String },
    #[error("remote request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RemoteError {
    #[must_use]
    pub fn api(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Api {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_exist(message: impl Into<String>) -> Self {
        Self::api(ErrorKind::NotExist, message)
    }

    /// Classification carried by the remote side. Transport failures have
    /// none and are treated as internal.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { kind, .. } => *kind,
            Self::Transport(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    code: Option<ErrorCode>,
    dependency: bool,
    #[source]
    source: Option<BoxError>,
}

impl ApiError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            dependency: false,
            source: None,
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Wraps a lower level failure under `kind` with a short context message.
    #[must_use]
    pub fn wrap(kind: ErrorKind, error: impl Into<BoxError>, message: impl Into<String>) -> Self {
        Self {
            source: Some(error.into()),
            ..Self::new(kind, message)
        }
    }

    /// Remaps a collaborator failure, keeping the remote classification.
    #[must_use]
    pub fn from_remote(error: RemoteError, message: impl Into<String>) -> Self {
        Self {
            dependency: true,
            ..Self::wrap(error.kind(), error, message)
        }
    }

    /// Prefixes the message with more context, keeping kind and source.
    #[must_use]
    pub fn context(mut self, message: &str) -> Self {
        self.message = format!("{message}: {}", self.message);
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// True when the error was produced by a failing collaborator call.
    #[must_use]
    pub const fn is_dependency(&self) -> bool {
        self.dependency
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message returned to callers. Internal errors expose only their context
    /// message; the rest include the wrapped cause.
    #[must_use]
    pub fn public_message(&self) -> String {
        match (&self.source, self.kind) {
            (Some(source), kind) if kind != ErrorKind::Internal => {
                format!("{}: {source}", self.message)
            }
            _ => self.message.clone(),
        }
    }

    /// Message plus the full source chain, for server side logs.
    #[must_use]
    pub fn detailed_message(&self) -> String {
        let mut detailed = self.message.clone();
        let mut current = StdError::source(self);
        while let Some(cause) = current {
            let _ = write!(detailed, ": {cause}");
            current = cause.source();
        }
        detailed
    }
}

impl From<RemoteError> for ApiError {
    fn from(error: RemoteError) -> Self {
        Self {
            dependency: true,
            ..Self::new(error.kind(), error.to_string())
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.kind == ErrorKind::Internal {
            tracing::error!(
                dependency = self.dependency,
                error = %self.detailed_message(),
                "request failed"
            );
        } else {
            tracing::debug!(kind = ?self.kind, error = %self.detailed_message(), "request rejected");
        }

        let body = ErrorResponse {
            code: self.kind,
            message: self.public_message(),
            details: self
                .code
                .map(|code| vec![ErrorDetail { code }])
                .unwrap_or_default(),
        };

        (self.kind.status(), Json(body)).into_response()
    }
}
