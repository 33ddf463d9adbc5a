// JSON-over-HTTP plumbing shared by the providers, with hooks around every payload
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Method, RequestBuilder, StatusCode};
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::provider::LlmError;

pub type JsonStream = Pin<Box<dyn Stream<Item = Result<Value, LlmError>> + Send>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited: {0}")]
    RateLimit(String),
    #[error("server returned {0}: {1}")]
    Unknown(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("stream error: {0}")]
    Stream(String),
}

/// Hooks called around every JSON payload exchanged with a model server
#[async_trait]
pub trait JsonHooks: Send + Sync {
    /// Called before sending JSON to the server
    async fn before_send(&self, method: &Method, url: &str, json: Value) -> Result<Value, LlmError> {
        Ok(json)
    }

    /// Called after receiving a complete JSON response
    async fn after_receive(&self, status: StatusCode, json: Value) -> Result<Value, LlmError> {
        Ok(json)
    }

    /// Called for each streamed JSON event
    async fn after_receive_stream(&self, json: Value) -> Result<Value, LlmError> {
        Ok(json)
    }
}

/// Default implementation with no hooks
pub struct NoHooks;

#[async_trait]
impl JsonHooks for NoHooks {}

/// Logs every request (method, url, pretty printed body) and optionally every response.
///
/// Streamed responses are newline-delimited JSON or SSE events which are not a
/// single JSON document, so they are logged event by event.
#[derive(Debug, Clone, Default)]
pub struct RequestLogger {
    pub log_responses: bool,
}

impl RequestLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(mut self, enable: bool) -> Self {
        self.log_responses = enable;
        self
    }
}

#[async_trait]
impl JsonHooks for RequestLogger {
    async fn before_send(&self, method: &Method, url: &str, json: Value) -> Result<Value, LlmError> {
        info!(target: "genai::http", "Request: {} {}", method, url);
        let pretty = serde_json::to_string_pretty(&json)?;
        info!(target: "genai::http", "Request Body: {}", pretty);
        Ok(json)
    }

    async fn after_receive(&self, status: StatusCode, json: Value) -> Result<Value, LlmError> {
        if self.log_responses {
            info!(target: "genai::http", "Response Status: {}", status);
            info!(target: "genai::http", "Response Body: {}", serde_json::to_string_pretty(&json)?);
        }
        Ok(json)
    }

    async fn after_receive_stream(&self, json: Value) -> Result<Value, LlmError> {
        if self.log_responses {
            debug!(target: "genai::http", "Response Event: {}", json);
        }
        Ok(json)
    }
}

/// Minimal JSON client bound to one base url
#[derive(Clone)]
pub struct JsonClient {
    pub http_client: reqwest::Client,
    pub base_url: String,
    pub api_key: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    hooks: Arc<dyn JsonHooks>,
}

impl fmt::Debug for JsonClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl JsonClient {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            headers: None,
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn set_hooks(&mut self, hooks: Arc<dyn JsonHooks>) {
        self.hooks = hooks;
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a request with authentication headers
    fn build_request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self.http_client.request(method, url);

        if let Some(api_key) = &self.api_key {
            if !api_key.is_empty() {
                request = request.bearer_auth(api_key);
            }
        }

        if let Some(headers) = &self.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        request
    }

    /// Check status code and handle errors
    async fn check_status_code(
        result: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<reqwest::Response, ApiError> {
        match result {
            Ok(response) => {
                if response.status().is_success() {
                    Ok(response)
                } else {
                    let status = response.status();
                    let error_text = response.text().await.unwrap_or_default();

                    match status.as_u16() {
                        400 => Err(ApiError::InvalidRequest(error_text)),
                        401 => Err(ApiError::Authentication(error_text)),
                        403 => Err(ApiError::Permission(error_text)),
                        404 => Err(ApiError::NotFound(error_text)),
                        429 => Err(ApiError::RateLimit(error_text)),
                        code => Err(ApiError::Unknown(code, error_text)),
                    }
                }
            }
            Err(error) => Err(ApiError::Transport(error.to_string())),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, LlmError> {
        let url = self.url(path);
        debug!(target: "genai::http", "GET {}", url);

        let result = self.build_request(Method::GET, &url).send().await;
        let response = Self::check_status_code(result).await?;
        let status = response.status();
        let json: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        let json = self.hooks.after_receive(status, json).await?;
        Ok(serde_json::from_value(json).map_err(|e| ApiError::Parse(e.to_string()))?)
    }

    /// POST a JSON body and decode the JSON answer, hooks applied on both sides
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, LlmError> {
        let url = self.url(path);
        let json = serde_json::to_value(body).map_err(|e| ApiError::Parse(e.to_string()))?;
        let json = self.hooks.before_send(&Method::POST, &url, json).await?;

        let result = self.build_request(Method::POST, &url).json(&json).send().await;
        let response = Self::check_status_code(result).await?;
        let status = response.status();

        let response_text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let response_json: Value = serde_json::from_str(&response_text)
            .map_err(|e| ApiError::Parse(format!("{}: {}", e, response_text)))?;

        let response_json = self.hooks.after_receive(status, response_json).await?;
        Ok(serde_json::from_value(response_json).map_err(|e| ApiError::Parse(e.to_string()))?)
    }

    /// POST a JSON body and read the answer as newline-delimited JSON objects
    pub async fn post_ndjson_stream<B: Serialize>(&self, path: &str, body: &B) -> Result<JsonStream, LlmError> {
        let url = self.url(path);
        let json = serde_json::to_value(body).map_err(|e| ApiError::Parse(e.to_string()))?;
        let json = self.hooks.before_send(&Method::POST, &url, json).await?;

        let result = self.build_request(Method::POST, &url).json(&json).send().await;
        let response = Self::check_status_code(result).await?;
        let hooks = self.hooks.clone();

        let stream = async_stream::stream! {
            let mut bytes = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => buffer.extend_from_slice(&chunk),
                    Err(e) => {
                        yield Err(Box::new(ApiError::Stream(e.to_string())) as LlmError);
                        return;
                    }
                }

                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    yield Self::decode_event(hooks.as_ref(), line).await;
                }
            }

            let rest = String::from_utf8_lossy(&buffer).trim().to_string();
            if !rest.is_empty() {
                yield Self::decode_event(hooks.as_ref(), &rest).await;
            }
        };

        Ok(Box::pin(stream))
    }

    /// POST a JSON body and read the answer as server-sent events, `[DONE]` ends the stream
    pub async fn post_sse_stream<B: Serialize>(&self, path: &str, body: &B) -> Result<JsonStream, LlmError> {
        let url = self.url(path);
        let json = serde_json::to_value(body).map_err(|e| ApiError::Parse(e.to_string()))?;
        let json = self.hooks.before_send(&Method::POST, &url, json).await?;

        let mut event_source = self
            .build_request(Method::POST, &url)
            .json(&json)
            .eventsource()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let hooks = self.hooks.clone();

        let stream = async_stream::stream! {
            while let Some(event) = event_source.next().await {
                match event {
                    Ok(Event::Open) => {}
                    Ok(Event::Message(message)) => {
                        if message.data == "[DONE]" {
                            break;
                        }
                        yield Self::decode_event(hooks.as_ref(), &message.data).await;
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(e) => {
                        yield Err(Box::new(ApiError::Stream(e.to_string())) as LlmError);
                        break;
                    }
                }
            }
            event_source.close();
        };

        Ok(Box::pin(stream))
    }

    async fn decode_event(hooks: &dyn JsonHooks, data: &str) -> Result<Value, LlmError> {
        let json: Value = serde_json::from_str(data)
            .map_err(|e| ApiError::Parse(format!("{}: {}", e, data)))?;
        hooks.after_receive_stream(json).await
    }
}
