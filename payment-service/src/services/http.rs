//! Shared plumbing for outbound JSON calls to peers and the provider.

use super::error::PaymentError;
use crate::config::HttpClientConfig;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Build a client with the configured request and connect timeouts.
pub fn build_client(config: &HttpClientConfig) -> Result<Client, PaymentError> {
    Client::builder()
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .build()
        .map_err(|e| PaymentError::Configuration(format!("failed to build HTTP client: {}", e)))
}

/// Turn a provider send result into a decoded body. Any 2xx is accepted.
///
/// Other statuses become upstream errors naming `endpoint`. The response body
/// is only logged at debug level and never carried in the error.
pub async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    sent: Result<Response, reqwest::Error>,
) -> Result<T, PaymentError> {
    read_json_if(endpoint, sent, |status| status.is_success()).await
}

/// Like [`read_json`], but peers must answer exactly 200.
pub async fn read_peer_json<T: DeserializeOwned>(
    endpoint: &str,
    sent: Result<Response, reqwest::Error>,
) -> Result<T, PaymentError> {
    read_json_if(endpoint, sent, |status| status == StatusCode::OK).await
}

async fn read_json_if<T: DeserializeOwned>(
    endpoint: &str,
    sent: Result<Response, reqwest::Error>,
    accepts: impl Fn(StatusCode) -> bool,
) -> Result<T, PaymentError> {
    let response = sent.map_err(|e| {
        tracing::error!(endpoint = %endpoint, error = %e, "Upstream request failed");
        PaymentError::upstream_transport(endpoint, e)
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PaymentError::upstream_transport(endpoint, e))?;

    if !accepts(status) {
        tracing::error!(endpoint = %endpoint, status = %status, "Upstream returned unexpected status");
        tracing::debug!(endpoint = %endpoint, body = %body, "Upstream error body");
        return Err(PaymentError::upstream_status(endpoint, status.as_u16()));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(endpoint = %endpoint, error = %e, "Failed to decode upstream response");
        PaymentError::Decoding {
            endpoint: endpoint.to_string(),
            source: e,
        }
    })
}
