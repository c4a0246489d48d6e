use std::future::Future;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AssessorConfig;

use super::{AssessorError, ChatClient, ChatRequest};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
///
/// The single `complete` call is the assessor's only suspension point; the
/// request-level timeout bounds it so a stuck call degrades like any other
/// failure instead of stalling the batch.
#[derive(Debug)]
pub struct OpenAiChatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiChatClient {
    pub fn new(config: &AssessorConfig) -> Result<Self, AssessorError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(AssessorError::MissingApiKey)?;
        let timeout = config.timeout();
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout,
        })
    }
}

impl ChatClient for OpenAiChatClient {
    fn complete(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = Result<String, AssessorError>> + Send {
        async move {
            let payload = CompletionRequest {
                model: &self.model,
                messages: vec![
                    Message {
                        role: "system",
                        content: &request.system,
                    },
                    Message {
                        role: "user",
                        content: &request.user,
                    },
                ],
                temperature: request.temperature,
                response_format: request.json_mode.then_some(ResponseFormat {
                    kind: "json_object",
                }),
            };

            debug!(model = %self.model, "requesting eligibility assessment");

            let response = self
                .http
                .post(format!("{}/chat/completions", self.base_url))
                .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
                .json(&payload)
                .send()
                .await
                .map_err(|err| {
                    if err.is_timeout() {
                        AssessorError::Timeout(self.timeout)
                    } else {
                        AssessorError::Http(err)
                    }
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(AssessorError::Status(status.as_u16()));
            }

            let body: CompletionResponse = response.json().await?;
            body.choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|content| !content.trim().is_empty())
                .ok_or(AssessorError::EmptyResponse)
        }
    }
}
