//! # HTTP Embedding Service
//!
//! Implementation of [`embedding::EmbeddingService`] against the embedding/similarity HTTP service:
//!
//! - `POST {base}/embedding` with `{"text", "lang"}` → `{"embedding": [f32]}`
//! - `POST {base}/similarity` with `{"embedding1", "embedding2"}` → `{"similarity": f32}`
//!
//! Every request has a bounded timeout. Transport failures and 5xx responses are retried with
//! exponential backoff; 4xx responses and malformed payloads fail immediately.
//!
//! ## Example
//!
//! ```rust,no_run
//! use embedding::{EmbeddingService, EnvEmbeddingConfig, Language};
//! use http_embedding::HttpEmbedding;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = HttpEmbedding::from_config(&EnvEmbeddingConfig::default())?;
//!     let embedding = service.embed("where is the office?", Language::En).await?;
//!     println!("Embedding dimension: {}", embedding.dimension());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use embedding::{
    Embedding, EmbeddingConfig, EmbeddingError, EmbeddingService, Language, SimilarityMode,
};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Client for the external embedding/similarity service.
#[derive(Debug, Clone)]
pub struct HttpEmbedding {
    client: Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
    similarity_mode: SimilarityMode,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    text: &'a str,
    lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct SimilarityRequest<'a> {
    embedding1: &'a [f32],
    embedding2: &'a [f32],
}

#[derive(Debug, Deserialize)]
struct SimilarityResponse {
    similarity: f32,
}

/// Outcome of a single HTTP attempt.
enum AttemptError {
    Retryable(String),
    Fatal(EmbeddingError),
}

impl HttpEmbedding {
    /// Builds a client from config (base URL, timeout, retry policy, similarity mode).
    pub fn from_config(config: &dyn EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EmbeddingError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.service_url().trim_end_matches('/').to_string(),
            max_retries: config.max_retries(),
            retry_backoff: config.retry_backoff(),
            similarity_mode: config.similarity_mode(),
        })
    }

    /// Returns the service base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, EmbeddingError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt: u32 = 0;
        loop {
            match self.try_post(&url, body).await {
                Ok(parsed) => return Ok(parsed),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(reason)) => {
                    if attempt >= self.max_retries {
                        return Err(EmbeddingError::Transport(format!(
                            "{} failed after {} attempt(s): {}",
                            path,
                            attempt + 1,
                            reason
                        )));
                    }
                    let delay = self
                        .retry_backoff
                        .saturating_mul(2u32.saturating_pow(attempt));
                    warn!(
                        path = %path,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "embedding service request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn try_post<B, R>(&self, url: &str, body: &B) -> Result<R, AttemptError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AttemptError::Retryable(format!("{}: {}", status, error_text)));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AttemptError::Fatal(status_error(status, &error_text)));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AttemptError::Fatal(EmbeddingError::Format(e.to_string())))
    }
}

fn status_error(status: StatusCode, body: &str) -> EmbeddingError {
    EmbeddingError::Transport(format!("embedding service error ({}): {}", status, body))
}

#[async_trait]
impl EmbeddingService for HttpEmbedding {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed(&self, text: &str, language: Language) -> Result<Embedding, EmbeddingError> {
        info!(lang = %language, "step: embedding request");

        let request = EmbeddingRequest {
            text,
            lang: language.code(),
        };
        let response: EmbeddingResponse = self.post_json("/embedding", &request).await?;
        let embedding = Embedding::new(response.embedding)?;

        info!(dimension = embedding.dimension(), "step: embedding done");
        Ok(embedding)
    }

    async fn similarity(&self, a: &Embedding, b: &Embedding) -> Result<f32, EmbeddingError> {
        if a.dimension() != b.dimension() {
            return Err(EmbeddingError::Format(format!(
                "dimension mismatch: {} vs {}",
                a.dimension(),
                b.dimension()
            )));
        }
        match self.similarity_mode {
            SimilarityMode::Local => Ok(embedding::cosine_similarity(a.as_slice(), b.as_slice())),
            SimilarityMode::Remote => {
                let request = SimilarityRequest {
                    embedding1: a.as_slice(),
                    embedding2: b.as_slice(),
                };
                let response: SimilarityResponse = self.post_json("/similarity", &request).await?;
                Ok(response.similarity)
            }
        }
    }
}
