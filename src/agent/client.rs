//! OpenAI-compatible chat completions client

use crate::agent::sse::{drain_lines, SseLine, StreamDelta};
use crate::agent::types::*;
use crate::config::OpenAiConfig;
use crate::error::{Error, Result};
use futures::StreamExt;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use std::pin::Pin;
use tracing::{debug, info, warn};

/// Stream of content deltas from a streaming completion
pub type ChatStream = Pin<Box<dyn futures::Stream<Item = Result<StreamDelta>> + Send>>;

/// OpenAI-compatible API client
#[derive(Clone)]
pub struct OpenAiClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();

        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
                .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(OpenAiClient { client, config })
    }

    /// Get the default model
    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Create a chat completion with the default model
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        self.chat_with_model(&self.config.default_model.clone(), messages, options)
            .await
    }

    /// Create a chat completion with a specific model
    pub async fn chat_with_model(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stop: options.stop,
            stream: Some(false),
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        debug!("Sending completion request: model={}", request.model);

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.json::<ChatCompletionResponse>().await?;

            if let Some(ref usage) = body.usage {
                info!(
                    "Completion response: model={}, tokens={}",
                    body.model, usage.total_tokens
                );
            }

            Ok(body)
        } else {
            Err(Self::map_error_status(
                status,
                response.text().await.unwrap_or_default(),
            ))
        }
    }

    /// Create a streaming chat completion, yielding content deltas as they
    /// arrive over SSE. Errors mid-stream surface as stream items; no retry.
    pub async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<ChatStream> {
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stop: options.stop,
            stream: Some(true),
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        debug!("Sending streaming request: model={}", request.model);

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Self::map_error_status(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }

        let (tx, rx) = futures::channel::mpsc::unbounded();
        let mut bytes = response.bytes_stream();

        tokio::spawn(async move {
            let mut buf = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.unbounded_send(Err(Error::Http(e)));
                        return;
                    }
                };
                buf.push_str(&String::from_utf8_lossy(&chunk));
                for event in drain_lines(&mut buf) {
                    match event {
                        SseLine::Done => return,
                        SseLine::Skip => {}
                        SseLine::Delta(delta) => {
                            if tx.unbounded_send(Ok(delta)).is_err() {
                                // Receiver dropped (user interrupted the render)
                                return;
                            }
                        }
                    }
                }
            }
            warn!("Stream ended without [DONE] terminator");
        });

        Ok(Box::pin(rx))
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models", self.config.base_url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status.is_success() {
            let body: ModelsResponse = response.json().await?;
            Ok(body.data)
        } else {
            Err(Self::map_error_status(
                status,
                response.text().await.unwrap_or_default(),
            ))
        }
    }

    fn map_error_status(status: reqwest::StatusCode, body: String) -> Error {
        match status.as_u16() {
            429 => {
                warn!("Rate limit exceeded: {}", body);
                Error::RateLimit(body)
            }
            401 => Error::Unauthorized("Invalid API key".to_string()),
            _ => Error::Provider(format!("API error ({}): {}", status, body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> OpenAiConfig {
        OpenAiConfig {
            api_key: SecretString::from("test-key"),
            default_model: "gpt-4o".to_string(),
            base_url: base_url.to_string(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = OpenAiClient::new(test_config("https://api.openai.com/v1"));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_chat_sends_model_and_bearer_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cmpl-1",
                "model": "gpt-4o",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "hi"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(&server.uri())).unwrap();
        let response = client
            .chat(vec![Message::user("hello")], GenerationOptions::precise())
            .await
            .unwrap();

        assert_eq!(response.choices[0].message.content, "hi");
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(&server.uri())).unwrap();
        let err = client
            .chat(vec![Message::user("hello")], GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RateLimit(_)));
    }

    #[tokio::test]
    async fn test_chat_stream_yields_all_deltas() {
        let server = MockServer::start().await;

        let body = concat!(
            "data: {\"id\":\"c1\",\"model\":\"gpt-4o\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
            "data: {\"id\":\"c1\",\"model\":\"gpt-4o\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n",
            "data: {\"id\":\"c1\",\"model\":\"gpt-4o\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(&server.uri())).unwrap();
        let mut stream = client
            .chat_stream("gpt-4o", vec![Message::user("hi")], GenerationOptions::default())
            .await
            .unwrap();

        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            text.push_str(&delta.unwrap().content);
        }

        assert_eq!(text, "Hello");
    }
}
