//! Error types for the innertube provider

use core_stream::ProviderError;
use thiserror::Error;

/// Innertube provider errors
#[derive(Error, Debug)]
pub enum InnertubeError {
    /// Transport failure reaching the endpoint
    #[error("Network error: {0}")]
    Network(String),

    /// API request returned an error status
    #[error("Innertube API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse the API response body
    #[error("Failed to parse API response: {0}")]
    ParseError(String),
}

/// Result type for innertube operations
pub type Result<T> = std::result::Result<T, InnertubeError>;

impl From<InnertubeError> for ProviderError {
    fn from(error: InnertubeError) -> Self {
        match error {
            InnertubeError::Network(msg) => ProviderError::Network(msg),
            InnertubeError::ApiError {
                status_code,
                message,
            } => ProviderError::Api {
                status: status_code,
                message,
            },
            InnertubeError::ParseError(msg) => ProviderError::Parse(msg),
        }
    }
}
