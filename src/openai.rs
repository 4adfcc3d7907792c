//! Blocking client for OpenAI-compatible HTTP APIs.
//!
//! Shared by the remote embedding and chat collaborators. Requests are
//! retried with exponential backoff on 429, 5xx and transport errors.
//! The client is blocking: call it from a blocking thread, never from an
//! async task directly.

use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenAiError {
    #[error("API key variable {0} is not set")]
    MissingApiKey(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),

    #[error("Request to {endpoint} failed ({status}): {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

/// Retrying JSON client bound to one base URL and API key.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl OpenAiClient {
    /// Build a client, reading the API key from the environment variable
    /// named `api_key_env`.
    pub fn from_env(
        base_url: &str,
        api_key_env: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, OpenAiError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| OpenAiError::MissingApiKey(api_key_env.to_string()))?;
        Self::new(base_url, &api_key, timeout, max_retries)
    }

    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, OpenAiError> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|e| OpenAiError::Config(format!("invalid API key: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| OpenAiError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: max_retries.max(1),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST `body` as JSON to `path` and decode the JSON response.
    pub fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, OpenAiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let endpoint = self.endpoint(path);
        let mut attempt = 0u32;

        loop {
            match self.client.post(&endpoint).json(body).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json().map_err(|e| OpenAiError::Decode {
                            endpoint: endpoint.clone(),
                            reason: e.to_string(),
                        });
                    }

                    let body = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::warn!(
                            target: "collaborator",
                            "{endpoint} returned {status}, retry {attempt}/{}",
                            self.max_retries - 1
                        );
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(OpenAiError::Status {
                        endpoint,
                        status,
                        body,
                    });
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::warn!(
                            target: "collaborator",
                            "{endpoint} unreachable ({err}), retry {attempt}/{}",
                            self.max_retries - 1
                        );
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(OpenAiError::Transport {
                        endpoint,
                        source: err,
                    });
                }
            }
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

fn retry_backoff(attempt: u32) -> Duration {
    let capped = attempt.min(5);
    Duration::from_millis(500 * (1 << capped))
}
