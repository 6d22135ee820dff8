use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::retry::RetryPolicy;
use crate::state::question::DifficultyTier;

use super::{
    JudgeError, QuestionDraft, QuizJudge, Verdict,
    prompts::{EVALUATION_TEMPERATURE, GENERATION_TEMPERATURE, evaluation_prompt, question_prompt},
    reply::{parse_question, parse_verdict},
};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for the chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer token.
    pub api_key: String,
    /// Chat model name.
    pub model: String,
    /// Chat-completions URL.
    pub endpoint: String,
    /// Attempts per call, including the first.
    pub max_attempts: u32,
}

impl OpenAiConfig {
    /// Settings against the public OpenAI endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            max_attempts,
        }
    }
}

/// [`QuizJudge`] backed by OpenAI chat completions.
#[derive(Clone)]
pub struct OpenAiJudge {
    client: Client,
    api_key: Arc<str>,
    model: Arc<str>,
    endpoint: Arc<str>,
    policy: RetryPolicy,
}

impl OpenAiJudge {
    /// Build the HTTP client and retry policy.
    pub fn new(config: OpenAiConfig) -> Result<Self, JudgeError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| JudgeError::ClientBuilder { source })?;

        Ok(Self {
            client,
            api_key: Arc::from(config.api_key),
            model: Arc::from(config.model),
            endpoint: Arc::from(config.endpoint),
            policy: RetryPolicy::exponential(
                config.max_attempts,
                Duration::from_secs(1),
                Duration::from_secs(1),
            ),
        })
    }

    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, JudgeError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let response = self
            .client
            .post(self.endpoint.as_ref())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|source| JudgeError::Request { source })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, body, retry_after));
        }

        let payload: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|err| JudgeError::MalformedReply {
                    reason: err.to_string(),
                    raw: String::new(),
                })?;

        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(JudgeError::EmptyReply)?;
        debug!(model = %self.model, %content, "language model reply received");
        Ok(content)
    }
}

impl QuizJudge for OpenAiJudge {
    fn generate_question(
        &self,
        topic: String,
        tier: DifficultyTier,
    ) -> BoxFuture<'static, Result<QuestionDraft, JudgeError>> {
        let judge = self.clone();
        Box::pin(async move {
            let prompt = question_prompt(&topic, tier);
            debug!(%topic, difficulty = tier.prompt_label(), "requesting question");
            let (client, prompt) = (&judge, prompt.as_str());
            judge
                .policy
                .run("judge.generate_question", move || async move {
                    let content = client.complete(prompt, GENERATION_TEMPERATURE).await?;
                    parse_question(&content)
                })
                .await
        })
    }

    fn evaluate_answer(
        &self,
        question: String,
        intended_answer: String,
        answer: String,
    ) -> BoxFuture<'static, Result<Verdict, JudgeError>> {
        let judge = self.clone();
        Box::pin(async move {
            let prompt = evaluation_prompt(&question, &intended_answer, &answer);
            let (client, prompt) = (&judge, prompt.as_str());
            judge
                .policy
                .run("judge.evaluate_answer", move || async move {
                    let content = client.complete(prompt, EVALUATION_TEMPERATURE).await?;
                    parse_verdict(&content)
                })
                .await
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> JudgeError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return JudgeError::RateLimited { retry_after };
    }
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);
    JudgeError::Status { status, message }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Retryable;

    #[test]
    fn error_body_message_is_extracted() {
        let err = map_http_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Incorrect API key provided"}}"#.into(),
            None,
        );
        match err {
            JudgeError::Status { status, message } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rate_limit_keeps_retry_after() {
        let header = HeaderValue::from_static("12");
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            String::new(),
            parse_retry_after(Some(&header)),
        );
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));
    }

    #[test]
    fn completion_without_content_is_tolerated_by_decoder() {
        let payload: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(payload.choices[0].message.content.is_none());
    }
}
