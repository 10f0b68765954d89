//! Pooled HTTP transport bound to a base URL and bearer credential.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::errors::{ApiError, ClientError, DecodeError, TransportError, UsageError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared HTTP transport. Cloning is cheap; the underlying connection pool is
/// shared and safe for concurrent use across sessions.
#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| ClientError::Usage(UsageError::new("API key is not a valid header value")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|error| {
                ClientError::Transport(TransportError::new("build client", "", error.to_string()))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, enforcing the configured timeout, and turn any non-2xx
    /// status into an API error carrying the verbatim body.
    async fn send(
        &self,
        operation: &str,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<Response, ClientError> {
        let response = builder
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| {
                ClientError::Transport(TransportError::new(operation, path, error.to_string()))
            })?;
        self.check_status(operation, path, response).await
    }

    async fn check_status(
        &self,
        operation: &str,
        path: &str,
        response: Response,
    ) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(operation, path, status = status.as_u16(), "api error");
        Err(ClientError::Api(ApiError::new(
            operation,
            path,
            status.as_u16(),
            body,
        )))
    }

    async fn decode_json<T: DeserializeOwned>(
        operation: &str,
        path: &str,
        response: Response,
    ) -> Result<T, ClientError> {
        let body = response.text().await.map_err(|error| {
            ClientError::Transport(TransportError::new(operation, path, error.to_string()))
        })?;
        serde_json::from_str(&body).map_err(|error| {
            ClientError::Decode(DecodeError::new(
                operation,
                format!("invalid JSON response: {error}"),
            ))
        })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        tracing::debug!(operation, path, "GET");
        let builder = self.http.get(self.url(path)).query(query);
        let response = self.send(operation, path, builder).await?;
        Self::decode_json(operation, path, response).await
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ClientError> {
        tracing::debug!(operation, path, "POST");
        let builder = self.http.post(self.url(path)).json(body);
        let response = self.send(operation, path, builder).await?;
        Self::decode_json(operation, path, response).await
    }

    /// POST where only the status matters; the ack body is discarded.
    pub async fn post_ack(
        &self,
        operation: &str,
        path: &str,
        body: &impl Serialize,
    ) -> Result<(), ClientError> {
        tracing::debug!(operation, path, "POST");
        let builder = self.http.post(self.url(path)).json(body);
        self.send(operation, path, builder).await?;
        Ok(())
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ClientError> {
        tracing::debug!(operation, path, "POST multipart");
        let builder = self.http.post(self.url(path)).multipart(form);
        let response = self.send(operation, path, builder).await?;
        Self::decode_json(operation, path, response).await
    }

    pub async fn delete(&self, operation: &str, path: &str) -> Result<(), ClientError> {
        tracing::debug!(operation, path, "DELETE");
        let builder = self.http.request(Method::DELETE, self.url(path));
        self.send(operation, path, builder).await?;
        Ok(())
    }

    /// POST that returns the raw response for body streaming. The configured
    /// timeout bounds only the exchange up to the response head; total stream
    /// duration is the caller's to bound.
    pub async fn post_stream(
        &self,
        operation: &str,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Response, ClientError> {
        tracing::debug!(operation, path, "POST stream");
        let builder = self.http.post(self.url(path)).json(body);
        let response = tokio::time::timeout(self.request_timeout, builder.send())
            .await
            .map_err(|_| {
                ClientError::Transport(TransportError::new(
                    operation,
                    path,
                    "timed out waiting for response head",
                ))
            })?
            .map_err(|error| {
                ClientError::Transport(TransportError::new(operation, path, error.to_string()))
            })?;
        self.check_status(operation, path, response).await
    }
}
