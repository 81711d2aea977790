use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::types::CreateRunRequest;

#[async_trait]
pub trait RunCreator: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the run service rejects or cannot receive the request.
    async fn create_runs(&self, request: &CreateRunRequest) -> Result<()>;
}

/// Forwards run creation requests to the runservice over HTTP.
#[derive(Debug, Clone)]
pub struct RunserviceClient {
    base_url: String,
    http: reqwest::Client,
}

impl RunserviceClient {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn runs_url(&self) -> String {
        format!("{}/runs", self.base_url)
    }
}

#[async_trait]
impl RunCreator for RunserviceClient {
    async fn create_runs(&self, request: &CreateRunRequest) -> Result<()> {
        let response = self
            .http
            .post(self.runs_url())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("runservice returned {status}: {body}");
        }

        Ok(())
    }
}
