//! HTTP client for the model generation backend

use anyhow::{Context, Result};
use gearview_core::{parse_generate_response, Endpoint, GenerateRequest, GenerateResponse, ParamSet};
use serde::Serialize;
use std::time::Duration;

pub struct GenerationClient {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl GenerationClient {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, endpoint })
    }

    /// `POST /generate-model` with a free-text command
    pub async fn generate(&self, command: &str) -> Result<GenerateResponse> {
        self.post(self.endpoint.generate_url(), &GenerateRequest::new(command))
            .await
    }

    /// `POST /<part_type>` with a full parameter set
    pub async fn regenerate(&self, part_type: &str, params: &ParamSet) -> Result<GenerateResponse> {
        self.post(self.endpoint.part_url(part_type), params).await
    }

    async fn post<T: Serialize + ?Sized>(&self, url: String, body: &T) -> Result<GenerateResponse> {
        tracing::debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;

        let parsed = parse_generate_response(status, &text)?;
        Ok(parsed)
    }
}
