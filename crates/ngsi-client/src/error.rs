//! Client error types.

use ngsi_protocol::{NgsiError, ResponseError};
use thiserror::Error;

/// Result type alias using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors returned by [`NgsiClient`](crate::NgsiClient) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the response not received.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The broker answered with an error.
    #[error(transparent)]
    Ngsi(#[from] NgsiError),

    /// A success body did not match the expected shape.
    #[error("Invalid response body: {0}")]
    Body(#[from] serde_json::Error),

    /// A creation response did not say where the new resource lives.
    #[error("Missing Location header in {0} response")]
    MissingLocation(&'static str),
}

impl From<ResponseError> for ClientError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::Ngsi(e) => ClientError::Ngsi(e),
            ResponseError::Body(e) => ClientError::Body(e),
        }
    }
}

impl ClientError {
    /// The protocol error, when the broker answered with one.
    pub fn ngsi(&self) -> Option<&NgsiError> {
        match self {
            ClientError::Ngsi(e) => Some(e),
            _ => None,
        }
    }

    /// HTTP status of the broker's error answer.
    pub fn status_code(&self) -> Option<u16> {
        self.ngsi().map(NgsiError::status_code)
    }
}
