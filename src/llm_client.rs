use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One generation call's prompt and decoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop_sequences: Vec<String>,
    pub frequency_penalty: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Generation {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub generations: Vec<Generation>,
}

/// A text-generation backend.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse>;
}

#[derive(Debug, Serialize)]
struct CohereGenerateRequest<'a> {
    model: &'a str,
    #[serde(flatten)]
    request: &'a GenerationRequest,
}

/// Client for Cohere's `/v1/generate` endpoint.
#[derive(Clone)]
pub struct CohereClient {
    api_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl CohereClient {
    pub fn new(api_url: String, api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            api_url,
            api_key,
            model,
            client,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for CohereClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let url = format!("{}/v1/generate", self.api_url.trim_end_matches('/'));
        let body = CohereGenerateRequest {
            model: &self.model,
            request,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("Failed to send generation request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            anyhow::bail!("Generation API returned error {}: {}", status, body);
        }

        let completion: GenerationResponse = response
            .json()
            .await
            .context("Failed to parse generation response")?;

        if completion.generations.is_empty() {
            anyhow::bail!("Generation API returned no generations");
        }

        Ok(completion)
    }
}
