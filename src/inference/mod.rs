use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::InferenceConfig;

const GENERAL_TEMPERATURE: f32 = 0.7;
const CODE_TEMPERATURE: f32 = 0.2;

/// Request body for the inference server's `/api/generate`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationPayload {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerationOptions,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerationReply {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub model: String,
    pub response: String,
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("inference server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("inference response was not valid JSON: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Thin client for a locally hosted Ollama-compatible server.
pub struct InferenceService {
    client: reqwest::Client,
    config: InferenceConfig,
}

impl InferenceService {
    pub fn new(config: InferenceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// `"code"` picks the code model; anything else, including no mode, the general one.
    pub fn select_model(&self, mode: Option<&str>) -> &str {
        match mode {
            Some("code") => &self.config.code_model,
            _ => &self.config.general_model,
        }
    }

    pub fn payload_for(&self, prompt: &str, mode: Option<&str>) -> GenerationPayload {
        let model = self.select_model(mode).to_string();
        let temperature = if model == self.config.code_model {
            CODE_TEMPERATURE
        } else {
            GENERAL_TEMPERATURE
        };

        GenerationPayload {
            model,
            prompt: prompt.to_string(),
            stream: false,
            options: GenerationOptions { temperature },
        }
    }

    /// One buffered, non-streaming generation call. No retries.
    pub async fn generate(
        &self,
        prompt: &str,
        mode: Option<&str>,
    ) -> Result<Completion, InferenceError> {
        let payload = self.payload_for(prompt, mode);
        let url = format!("{}/api/generate", self.config.host);

        debug!(
            model = %payload.model,
            temperature = payload.options.temperature,
            prompt_chars = prompt.chars().count(),
            "sending generation request"
        );

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                error!(%url, ?err, "inference server unreachable");
                InferenceError::Request(err)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%url, %status, "inference server rejected request");
            return Err(InferenceError::Status { status, body });
        }

        let reply: GenerationReply = response.json().await.map_err(InferenceError::Decode)?;

        Ok(Completion {
            model: payload.model,
            response: reply.response.unwrap_or_default(),
        })
    }
}
