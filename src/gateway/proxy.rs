//! Reverse proxy for the downstream service's path namespace

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DownstreamConfig;

/// Request headers copied onto the forwarded request
const FORWARDED_HEADERS: [header::HeaderName; 3] =
    [header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION];

/// Transport-level failure talking to the downstream service
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response from {url} is not JSON: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid method {0}")]
    Method(String),
}

/// Forwards `{prefix}/rest?query` to `{base_url}/rest?query` and relays the answer
pub struct ReverseProxy {
    client: Client,
    base_url: String,
    prefix: String,
    unavailable_message: String,
}

impl ReverseProxy {
    pub fn new(client: Client, config: &DownstreamConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            prefix: config.proxy_prefix.clone(),
            unavailable_message: config.unavailable_message(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Downstream URL for `uri`, or `None` when `uri` is outside the prefix
    pub fn target_url(&self, uri: &Uri) -> Option<String> {
        let rest = uri.path().strip_prefix(self.prefix.as_str())?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        let rest = if rest.is_empty() { "/" } else { rest };

        let mut url = format!("{}{}", self.base_url, rest);
        if let Some(query) = uri.query() {
            url.push('?');
            url.push_str(query);
        }
        Some(url)
    }

    /// Forward one request, converting every transport fault into a 503
    pub async fn handle(&self, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
        let Some(url) = self.target_url(&uri) else {
            return not_found();
        };

        match self.forward(method, url, &headers, body).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Downstream request failed");
                self.unavailable()
            }
        }
    }

    async fn forward(
        &self,
        method: Method,
        url: String,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, ProxyError> {
        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|_| ProxyError::Method(method.to_string()))?;

        debug!(method = %method, url = %url, "Forwarding request");

        let mut request = self.client.request(method, &url);
        for name in FORWARDED_HEADERS.iter() {
            if let Some(value) = headers.get(name) {
                request = request.header(name.as_str(), value.as_bytes());
            }
        }
        if !body.is_empty() {
            request = request.body(body.to_vec());
        }

        let response = request.send().await.map_err(|source| ProxyError::Transport {
            url: url.clone(),
            source,
        })?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let bytes = response.bytes().await.map_err(|source| ProxyError::Transport {
            url: url.clone(),
            source,
        })?;

        if bytes.is_empty() && status == StatusCode::NO_CONTENT {
            return Ok(status.into_response());
        }

        // Validate only; the received bytes are relayed untouched
        serde_json::from_slice::<serde::de::IgnoredAny>(&bytes)
            .map_err(|source| ProxyError::Malformed { url, source })?;

        let mut relayed = Response::new(Body::from(bytes));
        *relayed.status_mut() = status;
        relayed.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(relayed)
    }

    fn unavailable(&self) -> Response {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": self.unavailable_message })),
        )
            .into_response()
    }
}

fn not_found() -> Response {
    crate::error::AppError::NotFound("Not found".to_string()).into_response()
}
