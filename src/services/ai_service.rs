use crate::error::GenerationError;
use crate::services::prompt_service::SYSTEM_PROMPT;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The external text-generation collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Sends one prompt and returns the raw completion text.
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationError>;
}

/// OpenAI-compatible chat completions client (Groq by default).
#[derive(Clone)]
pub struct AIService {
    client: Client,
    api_key: String,
    base_url: String,
    temperature: f32,
    timeout: Duration,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct RespChoiceMsg {
    content: Option<String>,
}

#[derive(Deserialize)]
struct RespChoice {
    message: RespChoiceMsg,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<RespChoice>,
}

impl AIService {
    pub fn new(
        api_key: String,
        base_url: String,
        temperature: f32,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature,
            timeout,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.timeout.as_secs())
        } else {
            GenerationError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl QuestionGenerator for AIService {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationError> {
        let req = Req {
            model,
            temperature: self.temperature,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        tracing::debug!(model, endpoint = %self.endpoint(), "Requesting question completion");

        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&req)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let body: Resp = res.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout.as_secs())
            } else {
                GenerationError::EmptyCompletion
            }
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyCompletion)
    }
}
