use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use axum::body::Bytes;
use http::HeaderMap;

use crate::types::{LinkedAccount, RemoteSource, RemoteSourceType, WebhookData};

mod github;

pub use github::GitHubSource;

/// Raw webhook delivery as received by the gateway.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Provider client bound to one remote source and linked account.
pub trait GitSource: Send + Sync + fmt::Debug {
    /// Parses a delivery, verifying it against `secret`. `Ok(None)` means the
    /// delivery carries nothing that should trigger a run.
    ///
    /// # Errors
    ///
    /// Returns an error when the signature does not match or the payload is malformed.
    fn parse_webhook(&self, request: &WebhookRequest, secret: &str)
        -> Result<Option<WebhookData>>;
}

pub trait GitSourceFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when no client can be built for the remote source.
    fn git_source(
        &self,
        remote_source: &RemoteSource,
        user_name: &str,
        linked_account: &LinkedAccount,
    ) -> Result<Arc<dyn GitSource>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGitSourceFactory;

impl GitSourceFactory for DefaultGitSourceFactory {
    fn git_source(
        &self,
        remote_source: &RemoteSource,
        user_name: &str,
        linked_account: &LinkedAccount,
    ) -> Result<Arc<dyn GitSource>> {
        match remote_source.source_type {
            RemoteSourceType::Github => Ok(Arc::new(GitHubSource::new(
                remote_source,
                user_name,
                linked_account,
            ))),
            other => bail!(
                "unsupported remote source type {other:?} for remote source {:?}",
                remote_source.name
            ),
        }
    }
}
