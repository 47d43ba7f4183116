//! Answer-generation and embedding backends.
//!
//! The graph engine only sees the `AnswerGenerator` and `EmbeddingProvider`
//! traits. Backends are picked by `answer_generator()` / `embedding_provider()`
//! from the configured `LlmBackend` / `EmbeddingBackend`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

use crate::settings::{EmbeddingBackend, LlmBackend, Settings};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("malformed backend response: {0}")]
    BadResponse(String),
}

/// Produces text answers. Implementations own their own timeout/retry policy.
pub trait AnswerGenerator {
    fn name(&self) -> &str;

    fn answer(&self, prompt: &str) -> Result<String, ProviderError>;

    /// `context` is already assembled and budgeted by the caller.
    fn answer_with_context(&self, context: &str, prompt: &str) -> Result<String, ProviderError> {
        self.answer(&format!("{}\n\n{}", context, prompt))
    }
}

/// Turns text into a fixed-length vector.
pub trait EmbeddingProvider {
    fn name(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Known dimensionality, if the backend reports one up front.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

// ==================== Factories ====================

pub fn answer_generator(settings: &Settings) -> Result<Box<dyn AnswerGenerator>, ProviderError> {
    tracing::debug!(backend = settings.llm_backend.as_str(), "selecting answer generator");
    match settings.llm_backend {
        LlmBackend::Mock => Ok(Box::new(MockGenerator::new(settings.mock_response.clone()))),
        LlmBackend::Ollama => Ok(Box::new(OllamaClient::from_settings(settings)?)),
    }
}

pub fn embedding_provider(settings: &Settings) -> Result<Box<dyn EmbeddingProvider>, ProviderError> {
    tracing::debug!(backend = settings.embedding_backend.as_str(), "selecting embedding provider");
    match settings.embedding_backend {
        EmbeddingBackend::Mock => Ok(Box::new(MockEmbedder::new(settings.embedding_dim))),
        EmbeddingBackend::Ollama => Ok(Box::new(OllamaClient::from_settings(settings)?)),
    }
}

// ==================== Mock backends ====================

/// Deterministic generator that echoes what it was asked.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    response: String,
}

impl MockGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: response.into() }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new(crate::settings::DEFAULT_MOCK_RESPONSE)
    }
}

impl AnswerGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn answer(&self, prompt: &str) -> Result<String, ProviderError> {
        Ok(format!("{}\n\n[Prompt was]: {}", self.response, prompt))
    }

    fn answer_with_context(&self, context: &str, prompt: &str) -> Result<String, ProviderError> {
        Ok(format!(
            "{}\nUsing sources:\n{}\n\n[Prompt was]: {}",
            self.response, context, prompt
        ))
    }
}

/// Feature-hashed bag-of-words embedder. Same text, same vector.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dim: usize,
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl EmbeddingProvider for MockEmbedder {
    fn name(&self) -> &str {
        "mock"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vector = vec![0.0f32; self.dim];

        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase());

        for word in words {
            let digest = Sha256::digest(word.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dim as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-10 {
            for val in &mut vector {
                *val /= norm;
            }
        }

        Ok(vector)
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dim)
    }
}

// ==================== Ollama ====================

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Blocking client for a local Ollama server.
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: Url,
    model: String,
    embedding_model: String,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        embedding_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            model: model.into(),
            embedding_model: embedding_model.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ProviderError> {
        Self::new(
            &settings.ollama_url(),
            settings.ollama_model.clone(),
            settings.ollama_embedding_model.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: &Req,
    ) -> Result<Resp, ProviderError> {
        let url = self.base_url.join(endpoint)?;
        let response = self.client.post(url).json(request).send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        response
            .json()
            .map_err(|e| ProviderError::BadResponse(e.to_string()))
    }
}

impl AnswerGenerator for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn answer(&self, prompt: &str) -> Result<String, ProviderError> {
        tracing::debug!(model = %self.model, chars = prompt.len(), "ollama generate");
        let request = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response: OllamaGenerateResponse = self.post("api/generate", &request)?;
        Ok(response.response)
    }
}

impl EmbeddingProvider for OllamaClient {
    fn name(&self) -> &str {
        &self.embedding_model
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let request = OllamaEmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };
        let response: OllamaEmbeddingResponse = self.post("api/embeddings", &request)?;
        if response.embedding.is_empty() {
            return Err(ProviderError::BadResponse("empty embedding".to_string()));
        }
        Ok(response.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed("Loop fusion improves locality").unwrap();
        let b = embedder.embed("loop FUSION improves locality!").unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
    }

    #[test]
    fn test_mock_embedder_normalized() {
        let embedder = MockEmbedder::new(32);
        let v = embedder.embed("some words to embed").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_mock_embedder_empty_text_is_zero_vector() {
        let embedder = MockEmbedder::new(8);
        let v = embedder.embed("   ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(embedder.dimension(), Some(8));
    }

    #[test]
    fn test_mock_generator_echoes_prompt() {
        let generator = MockGenerator::new("[MOCK]");
        let answer = generator.answer("What is Halide?").unwrap();
        assert!(answer.starts_with("[MOCK]"));
        assert!(answer.contains("What is Halide?"));

        let with_context = generator.answer_with_context("- cited: text", "Why?").unwrap();
        assert!(with_context.contains("- cited: text"));
        assert!(with_context.contains("Why?"));
    }

    #[test]
    fn test_factories_follow_settings() {
        let settings = Settings::default();
        assert_eq!(answer_generator(&settings).unwrap().name(), "mock");
        assert_eq!(embedding_provider(&settings).unwrap().dimension(), Some(settings.embedding_dim));

        let mut ollama = Settings::default();
        ollama.llm_backend = LlmBackend::Ollama;
        ollama.ollama_model = "mistral".to_string();
        assert_eq!(answer_generator(&ollama).unwrap().name(), "mistral");
    }

    #[test]
    fn test_ollama_client_normalizes_base_url() {
        let client = OllamaClient::new("http://localhost:11434", "m", "e", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url.join("api/generate").unwrap().as_str(), "http://localhost:11434/api/generate");
        assert!(OllamaClient::new("not a url", "m", "e", Duration::from_secs(1)).is_err());
    }
}
