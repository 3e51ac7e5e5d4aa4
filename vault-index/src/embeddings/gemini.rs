//! Gemini embedding client (blocking)

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use crate::vector::EMBEDDING_DIMENSIONS;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-embedding-001";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Deserialize, Default)]
struct Values {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embedding: Values,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct BatchResponse {
    #[serde(default)]
    embeddings: Vec<Values>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ApiError>,
}

impl From<ApiError> for EmbeddingError {
    fn from(e: ApiError) -> Self {
        EmbeddingError::Api {
            code: e.code,
            message: e.message,
            status: e.status,
        }
    }
}

/// Embeds text through the Gemini `embedContent` / `batchEmbedContents`
/// endpoints. The API key is sent as the `key` query parameter.
pub struct GeminiEmbeddingClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiEmbeddingClient {
    /// A blank key is treated as no key.
    pub fn new(api_key: Option<String>) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_for<'a>(&self, text: &'a str) -> EmbedRequest<'a> {
        EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: [Part { text }],
            },
            output_dimensionality: EMBEDDING_DIMENSIONS,
        }
    }

    /// POST `body` to `{base}/models/{model}:{method}` and return the raw
    /// response text of a 2xx reply.
    fn post<T: Serialize>(&self, method: &str, body: &T) -> Result<String, EmbeddingError> {
        let key = self.api_key.as_deref().ok_or(EmbeddingError::MissingApiKey)?;
        let url = format!("{}/models/{}:{}", self.base_url, self.model, method);

        let resp = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .json(body)
            .send()?;
        let status = resp.status();
        let text = resp.text()?;

        if !status.is_success() {
            if let Ok(ErrorEnvelope { error: Some(err) }) = serde_json::from_str(&text) {
                return Err(err.into());
            }
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

fn check_vector(values: Vec<f32>) -> Result<Vec<f32>, EmbeddingError> {
    if values.is_empty() {
        return Err(EmbeddingError::EmptyEmbedding);
    }
    if values.len() != EMBEDDING_DIMENSIONS {
        return Err(EmbeddingError::Dimension {
            got: values.len(),
            want: EMBEDDING_DIMENSIONS,
        });
    }
    Ok(values)
}

impl EmbeddingProvider for GeminiEmbeddingClient {
    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = self.post("embedContent", &self.request_for(text))?;
        let parsed: EmbedResponse = serde_json::from_str(&body)?;
        if let Some(err) = parsed.error {
            return Err(err.into());
        }
        check_vector(parsed.embedding.values)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if !self.is_available() {
            return Err(EmbeddingError::MissingApiKey);
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = BatchRequest {
            requests: texts.iter().map(|t| self.request_for(t)).collect(),
        };
        let body = self.post("batchEmbedContents", &request)?;
        let parsed: BatchResponse = serde_json::from_str(&body)?;
        if let Some(err) = parsed.error {
            return Err(err.into());
        }
        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                requested: texts.len(),
                returned: parsed.embeddings.len(),
            });
        }

        log::debug!("[EMBED] Embedded batch of {}", texts.len());
        parsed
            .embeddings
            .into_iter()
            .map(|e| check_vector(e.values))
            .collect()
    }
}
