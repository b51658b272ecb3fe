/// Model Invocation Client: the single point of entry for all calls to the local model server.
///
/// ARCHITECTURAL RULE: No other module may talk to the model server directly.
/// Generation goes through `LlmClient::generate`, which owns the retry policy.
///
/// The wire protocol lives behind `ModelBackend`; `OllamaBackend` speaks the
/// Ollama chat API (`POST /api/chat`, `GET /api/tags`).
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::generation::GenerationResult;
use crate::retry::{retry, Backoff, Transient};

pub mod prompts;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    #[error("Model server unavailable: {0}")]
    Unavailable(String),

    #[error("Model server error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    #[error("Malformed model server response: {0}")]
    Malformed(String),
}

impl Transient for LlmError {
    fn is_transient(&self) -> bool {
        match self {
            LlmError::Unavailable(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::UnknownModel(_) | LlmError::Malformed(_) => false,
        }
    }
}

/// One logical "generate text" operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCall {
    pub model_id: String,
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
}

/// The wire-level seam to a text-generation server.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// One request, no retries. Returns the generated text (possibly empty).
    async fn complete(&self, call: &ModelCall) -> Result<String, LlmError>;

    async fn list_models(&self) -> Result<Vec<String>, LlmError>;

    async fn check_connection(&self) -> bool;
}

/// The model client used by generation. Cheap to clone.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn ModelBackend>,
    backoff: Backoff,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn ModelBackend>, backoff: Backoff) -> Self {
        Self { backend, backoff }
    }

    /// Generates text, retrying transient failures (server unreachable, 429, 5xx)
    /// up to `max_attempts` with exponential backoff. Permanent failures such as
    /// an unknown model id return on the first attempt.
    pub async fn generate(
        &self,
        call: &ModelCall,
        max_attempts: u32,
    ) -> Result<GenerationResult, LlmError> {
        let policy = self.backoff.with_attempts(max_attempts);
        let label = format!("Model call ({})", call.model_id);

        debug!(
            "Model call: model={}, temperature={:.2}, prompt_chars={}",
            call.model_id,
            call.temperature,
            call.prompt.len()
        );

        match retry(&policy, &label, |_| self.backend.complete(call)).await {
            Ok(done) => {
                debug!(
                    "Model call succeeded after {} attempt(s): output_chars={}",
                    done.attempts,
                    done.value.len()
                );
                Ok(GenerationResult {
                    text: done.value,
                    attempts: done.attempts,
                    succeeded: true,
                })
            }
            Err(exhausted) => {
                warn!(
                    "Model call gave up after {} attempt(s): {}",
                    exhausted.attempts, exhausted.error
                );
                Err(exhausted.error)
            }
        }
    }

    /// Models installed on the server, for the settings display only.
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        self.backend.list_models().await
    }

    pub async fn check_connection(&self) -> bool {
        self.backend.check_connection().await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ollama backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

pub struct OllamaBackend {
    client: Client,
    base_url: String,
}

impl OllamaBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        info!("Model backend: Ollama at {base_url}");
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    async fn complete(&self, call: &ModelCall) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = call.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &call.prompt,
        });

        let body = ChatRequest {
            model: &call.model_id,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: call.temperature,
            },
        };

        let response = self
            .client
            .post(self.api_url("chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error_status(status, &body, &call.model_id));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        parsed
            .message
            .map(|m| m.content)
            .ok_or_else(|| LlmError::Malformed("response has no message".to_string()))
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let response = self
            .client
            .get(self.api_url("tags"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn check_connection(&self) -> bool {
        match self
            .client
            .get(&self.base_url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Model server connection check failed: {e}");
                false
            }
        }
    }
}

/// Maps a non-2xx chat response to an error. Ollama answers 404 for models
/// that are not pulled.
fn classify_error_status(status: StatusCode, body: &str, model_id: &str) -> LlmError {
    let message = serde_json::from_str::<OllamaError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string());

    if status == StatusCode::NOT_FOUND && message.to_lowercase().contains("not found") {
        return LlmError::UnknownModel(model_id.to_string());
    }

    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted backends standing in for the model server.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays queued results in order; repeats the last one when the queue runs dry.
    pub struct ScriptedBackend {
        script: Mutex<VecDeque<Result<String, LlmError>>>,
        last: Mutex<Option<Result<String, LlmError>>>,
        pub calls: Mutex<Vec<ModelCall>>,
    }

    impl ScriptedBackend {
        pub fn new(script: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn always(result: Result<String, LlmError>) -> Arc<Self> {
            Self::new(vec![result])
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn recorded_calls(&self) -> Vec<ModelCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelBackend for ScriptedBackend {
        async fn complete(&self, call: &ModelCall) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(call.clone());
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            if let Some(result) = next {
                *last = Some(result);
            }
            last.clone()
                .unwrap_or_else(|| Err(LlmError::Unavailable("empty script".to_string())))
        }

        async fn list_models(&self) -> Result<Vec<String>, LlmError> {
            Ok(vec!["llama3:latest".to_string(), "qwen2.5:7b".to_string()])
        }

        async fn check_connection(&self) -> bool {
            true
        }
    }

    pub fn client(backend: Arc<ScriptedBackend>) -> LlmClient {
        LlmClient::new(backend, Backoff::default())
    }
}
