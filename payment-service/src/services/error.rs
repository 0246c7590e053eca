use service_core::error::AppError;
use thiserror::Error;

/// Why an upstream (peer service or provider) call failed.
#[derive(Debug, Error)]
pub enum UpstreamFailure {
    #[error("status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("error in request, endpoint called: {endpoint} ({cause})")]
    Upstream {
        endpoint: String,
        #[source]
        cause: UpstreamFailure,
    },

    #[error("failed to decode response from {endpoint}: {source}")]
    Decoding {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("amount out of range: {0}")]
    Amount(String),

    #[error("persistence error: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl PaymentError {
    pub fn upstream_status(endpoint: impl Into<String>, status: u16) -> Self {
        PaymentError::Upstream {
            endpoint: endpoint.into(),
            cause: UpstreamFailure::Status(status),
        }
    }

    pub fn upstream_transport(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        PaymentError::Upstream {
            endpoint: endpoint.into(),
            cause: UpstreamFailure::Transport(source),
        }
    }

    pub fn upstream_rejected(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        PaymentError::Upstream {
            endpoint: endpoint.into(),
            cause: UpstreamFailure::Rejected(reason.into()),
        }
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "validation",
            PaymentError::NotFound(_) => "not_found",
            PaymentError::Upstream { .. } => "upstream",
            PaymentError::Decoding { .. } => "decoding",
            PaymentError::Configuration(_) => "configuration",
            PaymentError::Amount(_) => "amount",
            PaymentError::Persistence(_) => "persistence",
        }
    }
}

// Not-found is reported as 400 "Invalid resource", matching what existing
// webhook callers already handle.
impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation(msg) => AppError::bad_request("Validation failed", Some(msg)),
            PaymentError::NotFound(msg) => AppError::bad_request("Invalid resource", Some(msg)),
            PaymentError::Configuration(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
            PaymentError::Persistence(e) => AppError::DatabaseError(e),
            other => AppError::InternalError(anyhow::Error::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn upstream_error_names_endpoint() {
        let err = PaymentError::upstream_status("https://api.example.com/qrs", 500);
        assert_eq!(
            err.to_string(),
            "error in request, endpoint called: https://api.example.com/qrs (status 500)"
        );
        assert_eq!(err.kind(), "upstream");
    }

    #[test]
    fn http_status_mapping() {
        let cases = [
            (PaymentError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (PaymentError::NotFound("x".into()), StatusCode::BAD_REQUEST),
            (
                PaymentError::upstream_rejected("http://orders", "no lines"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PaymentError::Configuration("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PaymentError::Amount("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PaymentError::Persistence(anyhow::anyhow!("duplicate")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status_code(), expected);
        }
    }
}
