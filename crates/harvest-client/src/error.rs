//! Error types for the HTTP adapters.

use harvest_sync::SyncError;
use thiserror::Error;

/// Errors raised by the HTTP harvester and messenger.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure or timeout
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the remote end
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Endpoint URL could not be built
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ClientError {
    /// Report as a harvesting failure.
    pub fn into_harvest(self) -> SyncError {
        SyncError::Harvest(self.to_string())
    }

    /// Report as a dispatch failure.
    pub fn into_dispatch(self) -> SyncError {
        SyncError::Dispatch(self.to_string())
    }
}

/// Fail on non-success statuses, keeping the body for the error message.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

/// Decode a JSON body.
pub(crate) async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    response
        .json()
        .await
        .map_err(|e| ClientError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_sync_error() {
        let err = ClientError::Status {
            status: 503,
            body: "busy".to_string(),
        };
        match err.into_dispatch() {
            SyncError::Dispatch(message) => assert_eq!(message, "HTTP 503: busy"),
            other => panic!("unexpected {:?}", other),
        }

        let err = ClientError::Parse("missing field".to_string());
        assert!(matches!(err.into_harvest(), SyncError::Harvest(_)));
    }
}
